//! Datasource model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A datasource definition.
///
/// `name` and `uid` are typed; every other field is kept verbatim so that an
/// exported definition can be posted back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    /// Display name, referenced by panels.
    pub name: String,
    /// Service-internal identifier.
    #[serde(default)]
    pub uid: String,
    /// Remaining definition fields.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Datasource {
    /// Serializes the definition for storage.
    ///
    /// # Errors
    ///
    /// Returns the serialization error.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, String> {
        serde_json::to_vec_pretty(self).map_err(|e| e.to_string())
    }
}

/// Outcome of `POST /api/datasources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceCreated {
    /// The datasource was created.
    Created {
        /// Name reported by the service.
        name: String,
    },
    /// A datasource with the same name already exists (HTTP 409).
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_keeps_unknown_fields() {
        let raw = r#"{"id": 3, "uid": "p1", "name": "Prometheus", "type": "prometheus", "url": "http://prom:9090"}"#;
        let ds: Datasource = serde_json::from_str(raw).unwrap();
        assert_eq!(ds.name, "Prometheus");
        assert_eq!(ds.uid, "p1");
        assert_eq!(ds.body["type"], "prometheus");

        let back: Value = serde_json::from_slice(&ds.to_bytes().unwrap()).unwrap();
        assert_eq!(back["url"], "http://prom:9090");
        assert_eq!(back["id"], 3);
    }
}
