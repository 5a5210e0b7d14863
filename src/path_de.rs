use serde::de::DeserializeOwned;

use crate::error::{CodecError, Result};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

fn located(err: serde_path_to_error::Error<serde_json::Error>) -> CodecError {
    let path = err.path().to_string();
    CodecError::GraphLoad(format!("at JSON path {path} → {}", err.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphDocument;

    #[test]
    fn reports_path_of_bad_record() {
        let src = r#"{"definitions": {"A": {"kind": "object", "properties": {"x": {"kind": "typeof", "name": "text"}}}}}"#;
        let err = from_str_with_path::<GraphDocument>(src).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("failed to load runtype graph: at JSON path definitions.A"), "{message}");
    }

    #[test]
    fn slice_and_str_agree() {
        let src = r#"{"definitions": {"N": {"kind": "nullish"}}}"#;
        let a = from_str_with_path::<GraphDocument>(src).unwrap();
        let b = from_slice_with_path::<GraphDocument>(src.as_bytes()).unwrap();
        assert_eq!(a.definitions.len(), b.definitions.len());
    }
}
