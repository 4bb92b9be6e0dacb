use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::crypto::{hash_blake3, PublicKey};

/// Reasons a textual address is rejected. Each variant matches a distinct
/// historical validation rule, which the exception allowlist keys off.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Address \"{0}\" does not match the required format")]
    Format(String),

    #[error("Address \"{0}\" has leading zeros")]
    LeadingZero(String),

    #[error("Address \"{0}\" exceeds the maximum address range")]
    ExceedsUint64(String),
}

/// Account address: a 64-bit number rendered as `<digits>L`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Address(pub u64);

impl Address {
    /// Derive the address owned by a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = hash_blake3(public_key.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        Address(u64::from_le_bytes(head))
    }

    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_suffix('L')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| AddressError::Format(s.to_string()))?;

        if digits.len() > 1 && digits.starts_with('0') {
            return Err(AddressError::LeadingZero(s.to_string()));
        }

        digits
            .parse::<u64>()
            .map(Address)
            .map_err(|_| AddressError::ExceedsUint64(s.to_string()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}L)", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}L", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_parse_display_roundtrip() {
        let address: Address = "16313739661670634666L".parse().unwrap();
        assert_eq!(address.to_string(), "16313739661670634666L");
        assert_eq!("0L".parse::<Address>().unwrap(), Address(0));
    }

    #[test]
    fn test_parse_rejections() {
        assert!(matches!(
            "0123L".parse::<Address>(),
            Err(AddressError::LeadingZero(_))
        ));
        assert!(matches!(
            "18446744073709551616L".parse::<Address>(),
            Err(AddressError::ExceedsUint64(_))
        ));
        assert!(matches!("123".parse::<Address>(), Err(AddressError::Format(_))));
        assert!(matches!("L".parse::<Address>(), Err(AddressError::Format(_))));
        assert!(matches!("12a4L".parse::<Address>(), Err(AddressError::Format(_))));
    }

    #[test]
    fn test_derivation_is_stable() {
        let kp = KeyPair::generate();
        assert_eq!(
            Address::from_public_key(&kp.public),
            Address::from_public_key(&kp.public)
        );
    }
}
