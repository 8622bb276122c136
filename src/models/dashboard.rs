//! Dashboard document model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /api/dashboards/uid/<uid>`.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardEnvelope {
    /// The full dashboard document. Service metadata next to it is ignored.
    pub dashboard: Value,
}

/// Response of `POST /api/dashboards/db`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertedDashboard {
    /// Numeric id assigned by the service.
    #[serde(default)]
    pub id: Option<i64>,
    /// Identifier the dashboard was stored under.
    #[serde(default)]
    pub uid: String,
    /// Service-reported status, usually `success`.
    #[serde(default)]
    pub status: Option<String>,
    /// Stored version.
    #[serde(default)]
    pub version: Option<i64>,
}

/// An opaque dashboard document.
///
/// Wraps the JSON body and exposes only the handful of fields that backup and
/// restore touch: `title`, `uid`, `id` and panel `datasource` references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardDocument(Value);

impl DashboardDocument {
    /// Wraps a JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parses a stored document.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the bytes are not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, String> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if !value.is_object() {
            return Err("dashboard document is not a JSON object".to_string());
        }
        Ok(Self(value))
    }

    /// Serializes the document for storage.
    ///
    /// Object keys come out sorted, so an unchanged dashboard always produces
    /// the same bytes.
    ///
    /// # Errors
    ///
    /// Returns the serialization error.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, String> {
        serde_json::to_vec_pretty(&self.0).map_err(|e| e.to_string())
    }

    /// Returns the non-empty title, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.0
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    /// Returns the stored uid, if any.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.0.get("uid").and_then(Value::as_str)
    }

    /// Clears the numeric id and optionally assigns a new uid.
    ///
    /// The id is always cleared: numeric ids belong to the source instance and
    /// would collide with unrelated dashboards in the target.
    pub fn reset_identity(&mut self, new_uid: Option<String>) {
        if let Some(object) = self.0.as_object_mut() {
            object.insert("id".to_string(), Value::Null);
            if let Some(uid) = new_uid {
                object.insert("uid".to_string(), Value::String(uid));
            }
        }
    }

    /// Returns mutable references to every non-null panel `datasource` field.
    ///
    /// Covers top-level panels, panels nested in collapsed rows, and panels in
    /// the legacy `rows` layout.
    pub fn datasource_refs_mut(&mut self) -> Vec<&mut Value> {
        let mut refs = Vec::new();
        if let Some(object) = self.0.as_object_mut() {
            for (key, value) in object.iter_mut() {
                match key.as_str() {
                    "panels" => collect_panel_refs(value, &mut refs),
                    "rows" => collect_row_refs(value, &mut refs),
                    _ => {},
                }
            }
        }
        refs
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

fn collect_row_refs<'a>(rows: &'a mut Value, refs: &mut Vec<&'a mut Value>) {
    let Some(rows) = rows.as_array_mut() else {
        return;
    };
    for row in rows.iter_mut().filter_map(Value::as_object_mut) {
        if let Some(panels) = row.get_mut("panels") {
            collect_panel_refs(panels, refs);
        }
    }
}

fn collect_panel_refs<'a>(panels: &'a mut Value, refs: &mut Vec<&'a mut Value>) {
    let Some(panels) = panels.as_array_mut() else {
        return;
    };
    for panel in panels.iter_mut().filter_map(Value::as_object_mut) {
        collect_from_panel(panel, refs);
    }
}

fn collect_from_panel<'a>(panel: &'a mut Map<String, Value>, refs: &mut Vec<&'a mut Value>) {
    for (key, value) in panel.iter_mut() {
        match key.as_str() {
            "datasource" if !value.is_null() => refs.push(value),
            // Collapsed rows carry their children inline.
            "panels" => collect_panel_refs(value, refs),
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DashboardDocument {
        DashboardDocument::new(json!({
            "id": 42,
            "uid": "abc",
            "title": "CPU",
            "panels": [
                {"id": 1, "datasource": "Prometheus"},
                {"id": 2, "datasource": null},
                {"id": 3, "type": "row", "panels": [
                    {"id": 4, "datasource": {"type": "loki", "uid": "lk1"}}
                ]}
            ],
            "rows": [
                {"panels": [{"id": 5, "datasource": "P1"}, {"id": 6}]}
            ]
        }))
    }

    #[test]
    fn test_datasource_refs_cover_all_layouts() {
        let mut doc = sample();
        let refs = doc.datasource_refs_mut();
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn test_datasource_refs_are_writable() {
        let mut doc = sample();
        for reference in doc.datasource_refs_mut() {
            *reference = Value::Null;
        }
        assert!(doc.datasource_refs_mut().is_empty());
        assert_eq!(doc.as_value()["panels"][0]["datasource"], Value::Null);
        assert_eq!(doc.as_value()["rows"][0]["panels"][0]["datasource"], Value::Null);
    }

    #[test]
    fn test_reset_identity() {
        let mut doc = sample();
        doc.reset_identity(Some("fresh".to_string()));
        assert_eq!(doc.as_value()["id"], Value::Null);
        assert_eq!(doc.uid(), Some("fresh"));

        let mut kept = sample();
        kept.reset_identity(None);
        assert_eq!(kept.as_value()["id"], Value::Null);
        assert_eq!(kept.uid(), Some("abc"));
    }

    #[test]
    fn test_title_rejects_blank() {
        let doc = DashboardDocument::new(json!({"title": "  "}));
        assert!(doc.title().is_none());
        assert_eq!(sample().title(), Some("CPU"));
    }

    #[test]
    fn test_from_slice_requires_object() {
        assert!(DashboardDocument::from_slice(b"[1, 2]").is_err());
        assert!(DashboardDocument::from_slice(b"not json").is_err());
        assert!(DashboardDocument::from_slice(br#"{"title": "x"}"#).is_ok());
    }

    #[test]
    fn test_to_bytes_is_stable() {
        let doc = sample();
        assert_eq!(doc.to_bytes().unwrap(), doc.clone().to_bytes().unwrap());
    }
}
