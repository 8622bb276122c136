//! Key codec.
//!
//! Turns human-readable titles into object-store key segments and service
//! identifiers. Titles come straight from the dashboard service and may be
//! empty or contain path separators, so they are never used as keys verbatim.
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`sanitize_path_segment`] | `"Infra/Prod"` | `"Infra-Prod"` |
//! | [`derive_folder_identifier`] | `"Infra/Prod"` | `"infra-prod"` |
//! | [`derive_folder_identifier`] | `"3 Node Cluster"` | `"f-3-node-cluster"` |

/// Substitute for path separators and disallowed identifier characters.
const REPLACEMENT: char = '-';

/// Prefix for identifiers that would otherwise start with a digit.
const LEADING_DIGIT_MARKER: &str = "f-";

/// Placeholder used when a title is empty.
const EMPTY_PLACEHOLDER: &str = "untitled";

/// File extension of every stored document.
pub const DOCUMENT_EXTENSION: &str = ".json";

const fn is_path_separator(c: char) -> bool {
    matches!(c, '/' | '\\')
}

/// Replaces every path separator in `name` with `-`.
///
/// All other characters are preserved in order. Distinct titles can collide
/// (`"a/b"` and `"a-b"`); the object store keeps the last write.
#[must_use]
pub fn sanitize_path_segment(name: &str) -> String {
    if name.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    name.chars()
        .map(|c| if is_path_separator(c) { REPLACEMENT } else { c })
        .collect()
}

/// Derives the folder identifier used on import.
///
/// Lowercases the title, replaces everything outside `[a-z0-9_-]` with `-`,
/// and prepends `f-` when the result starts with a digit. The result depends
/// only on `title`, so repeated imports find the folder created earlier.
#[must_use]
pub fn derive_folder_identifier(title: &str) -> String {
    if title.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }

    let derived: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                REPLACEMENT
            }
        })
        .collect();

    if derived.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{LEADING_DIGIT_MARKER}{derived}")
    } else {
        derived
    }
}

/// Composes the key of a dashboard document.
#[must_use]
pub fn dashboard_key(namespace: &str, folder_title: &str, dashboard_title: &str) -> String {
    format!(
        "{}/{}/{}{DOCUMENT_EXTENSION}",
        namespace.trim_end_matches('/'),
        sanitize_path_segment(folder_title),
        sanitize_path_segment(dashboard_title)
    )
}

/// Composes the key of a datasource document.
#[must_use]
pub fn datasource_key(namespace: &str, name: &str) -> String {
    format!(
        "{}/{}{DOCUMENT_EXTENSION}",
        namespace.trim_end_matches('/'),
        sanitize_path_segment(name)
    )
}

/// Returns the listing prefix for a namespace.
#[must_use]
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}/", namespace.trim_end_matches('/'))
}

/// Splits a stored dashboard key into `(folder_title, filename)`.
///
/// Only the last two segments are used, so exports nested under a deeper
/// prefix still import. Segments are returned exactly as stored. Returns
/// `None` when the key has fewer than two non-empty segments.
#[must_use]
pub fn split_dashboard_key(key: &str) -> Option<(String, String)> {
    let mut segments = key.rsplit('/').filter(|s| !s.is_empty());
    let filename = segments.next()?;
    let folder = segments.next()?;
    Some((folder.to_string(), filename.to_string()))
}

/// Returns true if the key names a stored JSON document.
#[must_use]
pub fn is_document_key(key: &str) -> bool {
    key.ends_with(DOCUMENT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Infra/Prod", "Infra-Prod" ; "forward slash")]
    #[test_case("Infra\\Prod", "Infra-Prod" ; "backslash")]
    #[test_case("a//b", "a--b" ; "adjacent separators")]
    #[test_case("/", "-" ; "separator only")]
    #[test_case("Node Exporter Full", "Node Exporter Full" ; "spaces preserved")]
    #[test_case("", "untitled" ; "empty title")]
    fn test_sanitize_path_segment(input: &str, expected: &str) {
        assert_eq!(sanitize_path_segment(input), expected);
    }

    #[test_case("Infra/Prod", "infra-prod" ; "separator")]
    #[test_case("3 Node Cluster", "f-3-node-cluster" ; "leading digit")]
    #[test_case("already-fine_1", "already-fine_1" ; "allowed characters")]
    #[test_case("Ünïcode Boards", "-n-code-boards" ; "non ascii")]
    #[test_case("", "untitled" ; "empty title")]
    fn test_derive_folder_identifier(input: &str, expected: &str) {
        assert_eq!(derive_folder_identifier(input), expected);
    }

    #[test]
    fn test_derive_folder_identifier_idempotent() {
        let once = derive_folder_identifier("Kubernetes / Compute Resources");
        assert_eq!(derive_folder_identifier(&once), once);
    }

    #[test]
    fn test_dashboard_key_layout() {
        assert_eq!(
            dashboard_key("backups/dashboards/", "Infra/Prod", "CPU / Memory"),
            "backups/dashboards/Infra-Prod/CPU - Memory.json"
        );
    }

    #[test]
    fn test_datasource_key_layout() {
        assert_eq!(
            datasource_key("datasources", "Prometheus/EU"),
            "datasources/Prometheus-EU.json"
        );
    }

    #[test]
    fn test_split_dashboard_key() {
        let (folder, file) = split_dashboard_key("dashboards/Infra-Prod/CPU.json").unwrap();
        assert_eq!(folder, "Infra-Prod");
        assert_eq!(file, "CPU.json");

        let (folder, _) = split_dashboard_key("a/b/c/Team #Ops/x.json").unwrap();
        assert_eq!(folder, "Team #Ops");

        let (folder, file) = split_dashboard_key("dashboards/Load%20Tests/A.json").unwrap();
        assert_eq!(folder, "Load%20Tests");
        assert_eq!(file, "A.json");
        assert_eq!(derive_folder_identifier(&folder), "load-20tests");

        assert!(split_dashboard_key("orphan.json").is_none());
    }

    #[test]
    fn test_document_check() {
        assert!(is_document_key("datasources/Loki.json"));
        assert!(!is_document_key("datasources/README"));
    }
}
