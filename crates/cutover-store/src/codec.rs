//! JSON codec helpers shared by store consumers

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value for storage
///
/// # Errors
/// [`StoreError::Codec`] when serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a stored value
///
/// # Errors
/// [`StoreError::Codec`] when the stored text is malformed; callers
/// replace the value with defaults rather than migrating it.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let value = vec!["a".to_string(), "b".to_string()];
        let raw = encode(&value).unwrap();
        let back: Vec<String> = decode(&raw).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn malformed_input_is_a_codec_error() {
        let result: Result<Vec<String>, _> = decode("not json");
        assert!(matches!(result, Err(StoreError::Codec(_))));
    }
}
