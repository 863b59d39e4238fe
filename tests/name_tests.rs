//! Unit tests for name normalization and validation

use eggns::error::EggnsError;
use eggns::name::{is_valid_name, normalize_name, MAX_NAME_LENGTH, MIN_NAME_LENGTH};

// ============================================================================
// ACCEPTED NAMES
// ============================================================================

/// What is tested: lowercase names with digits and hyphens are returned unchanged
/// Why: these are the canonical on-chain form
#[test]
fn test_valid_names_are_unchanged() {
    for name in ["alice", "bob-2", "a1b", "0xname", "my-long-name-123"] {
        assert_eq!(normalize_name(name).unwrap(), name);
    }
}

/// What is tested: surrounding whitespace is trimmed and letters are lowercased
/// Why: " Alice " and "alice" must address the same on-chain record
#[test]
fn test_names_are_trimmed_and_lowercased() {
    assert_eq!(normalize_name("  Alice ").unwrap(), "alice");
    assert_eq!(normalize_name("BOB-42").unwrap(), "bob-42");
}

/// What is tested: the length bounds are inclusive
/// Why: 3 and 32 characters are both valid names
#[test]
fn test_length_bounds_are_inclusive() {
    let shortest = "a".repeat(MIN_NAME_LENGTH);
    let longest = "a".repeat(MAX_NAME_LENGTH);
    assert!(is_valid_name(&shortest));
    assert!(is_valid_name(&longest));
}

// ============================================================================
// REJECTED NAMES
// ============================================================================

/// What is tested: names outside 3..=32 characters are rejected
/// Why: the registry only accepts names within these bounds
#[test]
fn test_length_out_of_bounds_rejected() {
    assert!(!is_valid_name(""));
    assert!(!is_valid_name("ab"));
    assert!(!is_valid_name(&"a".repeat(MAX_NAME_LENGTH + 1)));
    // Whitespace does not count towards the length
    assert!(!is_valid_name("  ab  "));
}

/// What is tested: characters outside [a-z0-9-] are rejected
/// Why: dots, underscores, spaces and non-ASCII letters are not part of the name alphabet
#[test]
fn test_invalid_characters_rejected() {
    for name in ["ali ce", "alice.eth", "ali_ce", "alicé", "al!ce"] {
        assert!(!is_valid_name(name), "{} should be rejected", name);
    }
}

/// What is tested: the error variant carries the raw input and a reason
/// Why: callers report the name as the user typed it
#[test]
fn test_error_carries_raw_name() {
    match normalize_name("Al.ice") {
        Err(EggnsError::InvalidNameFormat { name, reason }) => {
            assert_eq!(name, "Al.ice");
            assert!(reason.contains('.'));
        }
        other => panic!("expected InvalidNameFormat, got {:?}", other),
    }
}
