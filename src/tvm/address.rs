//! TON address implementation
//!
//! Parses and formats internal (`addr_std`) addresses in both the raw
//! `workchain:hex` form and the 48-character user-friendly base64 form.

use crate::crc::CRC16;
use base64::Engine;
use std::fmt;
use thiserror::Error;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

/// User-friendly address length in bytes: tag, workchain, hash, crc16
const FRIENDLY_LEN: usize = 36;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid address `{address}`: {reason}")]
pub struct AddressError {
    pub address: String,
    pub reason: String,
}

impl AddressError {
    fn new(address: &str, reason: impl Into<String>) -> Self {
        Self {
            address: address.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Represents a TON blockchain address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    workchain: i8,
    hash_part: [u8; 32],
    is_bounceable: bool,
    is_test_only: bool,
}

impl Address {
    /// Creates a bounceable mainnet address from workchain and hash part
    pub fn new(workchain: i8, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
            is_bounceable: true,
            is_test_only: false,
        }
    }

    /// Workchain ID (-1 for masterchain, 0 for basechain)
    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    /// 32-byte account identifier
    pub fn hash_part(&self) -> &[u8; 32] {
        &self.hash_part
    }

    pub fn is_bounceable(&self) -> bool {
        self.is_bounceable
    }

    pub fn is_test_only(&self) -> bool {
        self.is_test_only
    }

    /// Returns a copy with the bounceable flag replaced
    pub fn with_bounceable(self, is_bounceable: bool) -> Self {
        Self {
            is_bounceable,
            ..self
        }
    }

    /// Returns a copy with the test-only flag replaced
    pub fn with_test_only(self, is_test_only: bool) -> Self {
        Self {
            is_test_only,
            ..self
        }
    }

    /// Parses an address from string (supports both raw and user-friendly formats)
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        if address.contains(':') {
            Self::from_raw(address)
        } else {
            Self::from_base64(address)
        }
    }

    /// Parses address from raw format: "workchain:hash"
    pub fn from_raw(address: &str) -> Result<Self, AddressError> {
        let (workchain, hash_hex) = address
            .split_once(':')
            .ok_or_else(|| AddressError::new(address, "expected `workchain:hash`"))?;

        let workchain = workchain
            .parse::<i8>()
            .map_err(|_| AddressError::new(address, "invalid workchain"))?;

        if hash_hex.len() != 64 {
            return Err(AddressError::new(address, "hash part must be 64 hex characters"));
        }

        let mut hash_part = [0u8; 32];
        hex::decode_to_slice(hash_hex, &mut hash_part)
            .map_err(|e| AddressError::new(address, format!("invalid hex: {e}")))?;

        Ok(Self::new(workchain, hash_part))
    }

    /// Parses address from base64 user-friendly format (url-safe or standard alphabet)
    pub fn from_base64(address: &str) -> Result<Self, AddressError> {
        if address.len() != 48 {
            return Err(AddressError::new(address, "expected 48 characters"));
        }

        let decoded = base64::engine::general_purpose::URL_SAFE
            .decode(address)
            .or_else(|_| base64::engine::general_purpose::STANDARD.decode(address))
            .map_err(|e| AddressError::new(address, format!("invalid base64: {e}")))?;

        if decoded.len() != FRIENDLY_LEN {
            return Err(AddressError::new(address, "invalid decoded length"));
        }

        let expected_crc = u16::from_be_bytes([decoded[34], decoded[35]]);
        if CRC16.checksum(&decoded[..34]) != expected_crc {
            return Err(AddressError::new(address, "checksum mismatch"));
        }

        let mut tag = decoded[0];
        let is_test_only = tag & TAG_TEST_ONLY != 0;
        tag &= !TAG_TEST_ONLY;

        let is_bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => return Err(AddressError::new(address, format!("unknown tag 0x{tag:02x}"))),
        };

        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&decoded[2..34]);

        Ok(Self {
            workchain: decoded[1] as i8,
            hash_part,
            is_bounceable,
            is_test_only,
        })
    }

    /// Formats as user-friendly base64 with explicit flags
    pub fn to_friendly(&self, url_safe: bool, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut data = Vec::with_capacity(FRIENDLY_LEN);
        data.push(tag);
        data.push(self.workchain as u8);
        data.extend_from_slice(&self.hash_part);
        data.extend_from_slice(&CRC16.checksum(&data).to_be_bytes());

        if url_safe {
            base64::engine::general_purpose::URL_SAFE.encode(&data)
        } else {
            base64::engine::general_purpose::STANDARD.encode(&data)
        }
    }

    /// Converts to raw format (workchain:hash)
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    /// Canonical user-friendly form: url-safe, with the address's own flags
    pub fn to_base64(&self) -> String {
        self.to_friendly(true, self.is_bounceable, self.is_test_only)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}
