//! JSON encoding of graph documents.

use crate::document::GraphDocument;
use crate::error::SerdeError;

/// Encodes and decodes [`GraphDocument`]s as JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonFormat {
    /// Whether to pretty-print with indentation.
    pub pretty: bool,
}

impl JsonFormat {
    /// Creates a compact JSON format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pretty-printing JSON format.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Encodes a document.
    pub fn serialize(&self, document: &GraphDocument) -> Result<Vec<u8>, SerdeError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        Ok(bytes)
    }

    /// Decodes a document.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<GraphDocument, SerdeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockDocument;

    fn one_block() -> GraphDocument {
        GraphDocument {
            output_node_id: Some(0),
            blocks: vec![BlockDocument {
                class_name: "BoxBlock".into(),
                id: 0,
                name: "box".into(),
                properties: serde_json::Map::from_iter([(
                    "evaluateContext".to_string(),
                    serde_json::json!(false),
                )]),
                inputs: Vec::new(),
                outputs: Vec::new(),
            }],
            connections: Vec::new(),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let format = JsonFormat::new();
        let bytes = format.serialize(&one_block()).unwrap();
        let loaded = format.deserialize(&bytes).unwrap();
        assert_eq!(loaded, one_block());
    }

    #[test]
    fn test_json_pretty() {
        let compact = JsonFormat::new().serialize(&one_block()).unwrap();
        let pretty = JsonFormat::pretty().serialize(&one_block()).unwrap();
        assert!(pretty.len() > compact.len());
        assert_eq!(JsonFormat::pretty().deserialize(&pretty).unwrap(), one_block());
    }

    #[test]
    fn test_malformed_input() {
        let result = JsonFormat::new().deserialize(b"{ \"blocks\": [");
        assert!(matches!(result, Err(SerdeError::Json(_))));
    }
}
