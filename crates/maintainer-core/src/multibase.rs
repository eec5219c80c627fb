//! Base58btc multibase encoding for key fingerprints and proof values.

use crate::error::{Error, Result};

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Multibase prefix for base58btc.
pub const BASE58_BTC_PREFIX: char = 'z';

/// Multicodec header for an Ed25519 public key.
pub const ED25519_PUB_HEADER: [u8; 2] = [0xed, 0x01];

/// Multicodec header for an Ed25519 private key.
pub const ED25519_PRIV_HEADER: [u8; 2] = [0x80, 0x26];

/// Encode bytes as plain base58btc (no multibase prefix).
pub fn base58_encode(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|&&b| b == 0).count();
    // log(256) / log(58) ~ 1.37
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);

    for &byte in &input[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('1').take(zeros));
    out.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize] as char));
    out
}

/// Decode plain base58btc.
pub fn base58_decode(input: &str) -> Result<Vec<u8>> {
    let zeros = input.bytes().take_while(|&b| b == b'1').count();
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());

    for c in input.bytes().skip(zeros) {
        let value = ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(|| Error::Key(format!("invalid base58 character {:?}", c as char)))?;
        let mut carry = value as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// Encode bytes as a `z`-prefixed multibase string.
pub fn encode(input: &[u8]) -> String {
    format!("{}{}", BASE58_BTC_PREFIX, base58_encode(input))
}

/// Decode a `z`-prefixed multibase string.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let body = input
        .strip_prefix(BASE58_BTC_PREFIX)
        .ok_or_else(|| Error::Key(format!("unsupported multibase prefix in {:?}", input)))?;
    base58_decode(body)
}

/// Fingerprint of an Ed25519 public key (`z6Mk...`).
pub fn ed25519_fingerprint(public_key: &[u8; 32]) -> String {
    let mut buf = Vec::with_capacity(34);
    buf.extend_from_slice(&ED25519_PUB_HEADER);
    buf.extend_from_slice(public_key);
    encode(&buf)
}
