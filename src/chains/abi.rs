//! Solidity ABI encoding and decoding.
//!
//! Covers the types used by the registry and bridge contracts: address, uint, bool,
//! bytes32, bytes, string, fixed arrays of those, and `string[]` return values.
//! Encoding follows the standard head/tail layout; decoding reads 32-byte words.

use ethereum_types::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("Invalid hex data: {0}")]
    InvalidHex(String),
    #[error("Return data too short: need {needed} bytes, have {available}")]
    OutOfBounds { needed: usize, available: usize },
    #[error("Value does not fit: {0}")]
    Overflow(String),
    #[error("Invalid UTF-8 in string value")]
    InvalidUtf8,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

// ============================================================================
// SELECTORS AND ADDRESSES
// ============================================================================

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// First four bytes of keccak256 of the function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Event topic (0x-prefixed keccak256 of the event signature).
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

pub fn is_valid_address(value: &str) -> bool {
    parse_address(value).is_ok()
}

/// Parses a 0x-prefixed 20-byte hex address (any letter case).
pub fn parse_address(value: &str) -> Result<[u8; 20], AbiError> {
    let hex_part = value
        .strip_prefix("0x")
        .ok_or_else(|| AbiError::InvalidAddress(value.to_string()))?;
    if hex_part.len() != 40 {
        return Err(AbiError::InvalidAddress(value.to_string()));
    }
    let bytes = hex::decode(hex_part).map_err(|_| AbiError::InvalidAddress(value.to_string()))?;
    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes);
    Ok(address)
}

/// Lowercase 0x-prefixed form, used for all address comparisons.
pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

pub fn normalize_address(value: &str) -> Result<String, AbiError> {
    parse_address(value).map(|a| format_address(&a))
}

pub fn parse_bytes32(value: &str) -> Result<[u8; 32], AbiError> {
    let hex_part = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(hex_part).map_err(|e| AbiError::InvalidHex(e.to_string()))?;
    if bytes.len() != WORD {
        return Err(AbiError::InvalidHex(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes);
    Ok(word)
}

pub fn decode_hex(value: &str) -> Result<Vec<u8>, AbiError> {
    let hex_part = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(hex_part).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

// ============================================================================
// ENCODING
// ============================================================================

/// ABI value to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Uint(U256),
    Bool(bool),
    FixedBytes([u8; 32]),
    Bytes(Vec<u8>),
    String(String),
    /// `T[k]`
    FixedArray(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::Bytes(_) | Token::String(_) => true,
            Token::FixedArray(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    /// Bytes this token occupies in the head section.
    fn head_len(&self) -> usize {
        match self {
            Token::FixedArray(items) if !self.is_dynamic() => {
                items.iter().map(Token::head_len).sum()
            }
            _ => WORD,
        }
    }
}

pub fn uint_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn padded(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let rem = out.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

/// Static tokens encode in place; dynamic tokens produce their tail encoding.
fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Address(address) => {
            let mut word = vec![0u8; 12];
            word.extend_from_slice(address);
            word
        }
        Token::Uint(value) => uint_word(*value).to_vec(),
        Token::Bool(flag) => uint_word(U256::from(u8::from(*flag))).to_vec(),
        Token::FixedBytes(bytes) => bytes.to_vec(),
        Token::Bytes(bytes) => {
            let mut out = uint_word(U256::from(bytes.len())).to_vec();
            out.extend(padded(bytes));
            out
        }
        Token::String(s) => encode_token(&Token::Bytes(s.as_bytes().to_vec())),
        Token::FixedArray(items) if token.is_dynamic() => encode(items),
        Token::FixedArray(items) => items.iter().flat_map(encode_token).collect(),
    }
}

/// Encodes a tuple of tokens.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }

    head.extend(tail);
    head
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(tokens));
    data
}

// ============================================================================
// DECODING
// ============================================================================

/// Word-level reader over ABI-encoded return data or event data.
#[derive(Debug, Clone)]
pub struct AbiReader {
    data: Vec<u8>,
}

impl AbiReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_hex(value: &str) -> Result<Self, AbiError> {
        decode_hex(value).map(Self::new)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&[u8], AbiError> {
        let end = offset.checked_add(len).ok_or_else(|| {
            AbiError::Overflow(format!("offset {} + length {}", offset, len))
        })?;
        self.data.get(offset..end).ok_or(AbiError::OutOfBounds {
            needed: end,
            available: self.data.len(),
        })
    }

    fn word_at(&self, offset: usize) -> Result<&[u8], AbiError> {
        self.slice(offset, WORD)
    }

    fn usize_at(&self, offset: usize) -> Result<usize, AbiError> {
        let value = U256::from_big_endian(self.word_at(offset)?);
        if value > U256::from(u32::MAX) {
            return Err(AbiError::Overflow(value.to_string()));
        }
        Ok(value.low_u64() as usize)
    }

    /// Word `index` of the head section.
    pub fn word(&self, index: usize) -> Result<[u8; 32], AbiError> {
        let mut word = [0u8; 32];
        word.copy_from_slice(self.word_at(index * WORD)?);
        Ok(word)
    }

    pub fn uint(&self, index: usize) -> Result<U256, AbiError> {
        Ok(U256::from_big_endian(&self.word(index)?))
    }

    pub fn u32(&self, index: usize) -> Result<u32, AbiError> {
        let value = self.uint(index)?;
        if value > U256::from(u32::MAX) {
            return Err(AbiError::Overflow(value.to_string()));
        }
        Ok(value.low_u32())
    }

    pub fn u64(&self, index: usize) -> Result<u64, AbiError> {
        let value = self.uint(index)?;
        if value > U256::from(u64::MAX) {
            return Err(AbiError::Overflow(value.to_string()));
        }
        Ok(value.low_u64())
    }

    pub fn bool(&self, index: usize) -> Result<bool, AbiError> {
        Ok(!self.uint(index)?.is_zero())
    }

    pub fn address(&self, index: usize) -> Result<String, AbiError> {
        let word = self.word(index)?;
        let mut address = [0u8; 20];
        address.copy_from_slice(&word[12..]);
        Ok(format_address(&address))
    }

    pub fn bytes32(&self, index: usize) -> Result<String, AbiError> {
        Ok(format!("0x{}", hex::encode(self.word(index)?)))
    }

    fn bytes_at(&self, offset: usize) -> Result<Vec<u8>, AbiError> {
        let len = self.usize_at(offset)?;
        Ok(self.slice(offset + WORD, len)?.to_vec())
    }

    /// Dynamic `bytes` whose offset is stored at head word `index`.
    pub fn bytes(&self, index: usize) -> Result<Vec<u8>, AbiError> {
        let offset = self.usize_at(index * WORD)?;
        self.bytes_at(offset)
    }

    pub fn string(&self, index: usize) -> Result<String, AbiError> {
        String::from_utf8(self.bytes(index)?).map_err(|_| AbiError::InvalidUtf8)
    }

    /// Dynamic `string[]` whose offset is stored at head word `index`.
    pub fn string_array(&self, index: usize) -> Result<Vec<String>, AbiError> {
        let array_offset = self.usize_at(index * WORD)?;
        let count = self.usize_at(array_offset)?;
        let elements_start = array_offset + WORD;

        (0..count)
            .map(|i| {
                let element_offset = self.usize_at(elements_start + i * WORD)?;
                let bytes = self.bytes_at(elements_start + element_offset)?;
                String::from_utf8(bytes).map_err(|_| AbiError::InvalidUtf8)
            })
            .collect()
    }
}
