//! Datasource reference resolution.
//!
//! Panels in an exported dashboard point at datasources by source-instance
//! uid. On import those references are rewritten to the display name the
//! target instance knows, or to `null` when no such datasource exists. A
//! `null` datasource makes the service fall back to its default, which is
//! better than a dangling reference.

use crate::client::DashboardApi;
use crate::models::DashboardDocument;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Built-in pseudo datasources, valid in every instance.
const BUILTIN_DATASOURCES: &[&str] = &[
    "-- Grafana --",
    "-- Mixed --",
    "-- Dashboard --",
    "grafana",
];

/// Object-form `type` used by built-in pseudo datasources.
const BUILTIN_TYPE: &str = "datasource";

/// What to do with one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Leave the reference as it is.
    Keep,
    /// Replace the reference with a datasource name.
    Rename(String),
    /// Replace the reference with `null`.
    Unresolved,
}

/// Counts from resolving one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// References left untouched.
    pub kept: usize,
    /// References rewritten to a datasource name.
    pub renamed: usize,
    /// References set to `null`.
    pub unresolved: usize,
}

/// Resolves panel datasource references against the target service.
///
/// Holds a per-run cache: each uid is looked up at most once, and the target's
/// datasource names are listed at most once.
pub struct DatasourceResolver<'a> {
    api: &'a dyn DashboardApi,
    by_uid: HashMap<String, Option<String>>,
    known_names: Option<HashSet<String>>,
}

impl<'a> DatasourceResolver<'a> {
    /// Creates a resolver with an empty cache.
    #[must_use]
    pub fn new(api: &'a dyn DashboardApi) -> Self {
        Self {
            api,
            by_uid: HashMap::new(),
            known_names: None,
        }
    }

    /// Rewrites every panel datasource reference in `document`.
    ///
    /// Never fails; references that cannot be resolved become `null`.
    pub fn resolve_document(&mut self, document: &mut DashboardDocument) -> ResolutionStats {
        let mut stats = ResolutionStats::default();
        for reference in document.datasource_refs_mut() {
            match self.resolve(reference) {
                Resolution::Keep => stats.kept += 1,
                Resolution::Rename(name) => {
                    *reference = Value::String(name);
                    stats.renamed += 1;
                },
                Resolution::Unresolved => {
                    *reference = Value::Null;
                    stats.unresolved += 1;
                },
            }
        }
        stats
    }

    /// Decides what to do with a single reference.
    pub fn resolve(&mut self, reference: &Value) -> Resolution {
        match reference {
            Value::Null => Resolution::Keep,
            Value::String(value) => {
                if is_passthrough(value) || self.is_known_name(value) {
                    Resolution::Keep
                } else {
                    self.rename_by_uid(value)
                }
            },
            Value::Object(object) => {
                if object.get("type").and_then(Value::as_str) == Some(BUILTIN_TYPE) {
                    return Resolution::Keep;
                }
                match object.get("uid").and_then(Value::as_str) {
                    Some(uid) if is_passthrough(uid) => Resolution::Keep,
                    Some(uid) => self.rename_by_uid(uid),
                    None => Resolution::Unresolved,
                }
            },
            _ => Resolution::Unresolved,
        }
    }

    fn rename_by_uid(&mut self, uid: &str) -> Resolution {
        let name = match self.by_uid.get(uid) {
            Some(cached) => cached.clone(),
            None => {
                let looked_up = self.lookup(uid);
                self.by_uid.insert(uid.to_string(), looked_up.clone());
                looked_up
            },
        };
        name.map_or(Resolution::Unresolved, Resolution::Rename)
    }

    fn lookup(&self, uid: &str) -> Option<String> {
        match self.api.get_datasource_by_uid(uid) {
            Ok(Some(datasource)) => Some(datasource.name),
            Ok(None) => {
                tracing::warn!(datasource_uid = uid, "unknown datasource, reference cleared");
                None
            },
            Err(e) => {
                tracing::warn!(
                    datasource_uid = uid,
                    error = %e,
                    "datasource lookup failed, reference cleared"
                );
                None
            },
        }
    }

    fn is_known_name(&mut self, value: &str) -> bool {
        let api = self.api;
        self.known_names
            .get_or_insert_with(|| match api.list_datasources() {
                Ok(datasources) => datasources.into_iter().map(|ds| ds.name).collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "could not list target datasources");
                    HashSet::new()
                },
            })
            .contains(value)
    }
}

/// Template variables and built-ins are valid as written.
fn is_passthrough(value: &str) -> bool {
    value.starts_with('$') || BUILTIN_DATASOURCES.contains(&value)
}
