use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Canonical bincode encoding. Transaction ids and signatures are computed
/// over these bytes, so every node must produce the same output.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    bincode::serialize(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Decode canonical bincode bytes
pub fn from_bytes<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, CoreError> {
    bincode::deserialize(bytes).map_err(|e| CoreError::Deserialization(e.to_string()))
}

/// Pretty JSON, used for configuration and transaction files
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

pub fn from_json<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, CoreError> {
    serde_json::from_str(json).map_err(|e| CoreError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Envelope {
        timestamp: u32,
        memo: Option<String>,
    }

    #[test]
    fn test_canonical_bytes_are_stable() {
        let value = Envelope {
            timestamp: 77,
            memo: Some("rent".to_string()),
        };

        assert_eq!(to_bytes(&value).unwrap(), to_bytes(&value.clone()).unwrap());
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let value = Envelope {
            timestamp: 77,
            memo: Some("rent".to_string()),
        };
        let bytes = to_bytes(&value).unwrap();

        let result: Result<Envelope, _> = from_bytes(&bytes[..bytes.len() - 2]);
        assert!(matches!(result, Err(CoreError::Deserialization(_))));
    }

    #[test]
    fn test_json_decode() {
        let decoded: Envelope = from_json(r#"{"timestamp":5,"memo":null}"#).unwrap();
        assert_eq!(
            decoded,
            Envelope {
                timestamp: 5,
                memo: None
            }
        );
    }
}
