//! JSON output formatting

use chrono::Utc;
use serde::Serialize;

/// Envelope for JSON output
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub data: T,
    pub meta: Metadata,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    /// When the output was produced (RFC3339)
    pub timestamp: String,
    pub version: String,
}

impl<T> JsonOutput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Pretty-printed JSON wrapped in the metadata envelope
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_carries_version() {
        let output = JsonOutput::new(vec!["com.example.app"]);

        assert_eq!(output.data, vec!["com.example.app"]);
        assert_eq!(output.meta.version, env!("CARGO_PKG_VERSION"));
        assert!(!output.meta.timestamp.is_empty());
    }

    #[test]
    fn test_format_json_wraps_data() {
        let value: serde_json::Value =
            serde_json::from_str(&format_json(&["a", "b"]).unwrap()).unwrap();

        assert_eq!(value["data"], serde_json::json!(["a", "b"]));
        assert!(value["meta"]["timestamp"].is_string());
    }

    #[test]
    fn test_format_json_empty() {
        let items: Vec<String> = vec![];
        assert!(format_json(&items).unwrap().contains("\"data\": []"));
    }
}
