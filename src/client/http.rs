//! Dashboard service REST client.

use super::{DashboardApi, Deadline, RemoteError, RemoteResult};
use crate::config::ServiceConfig;
use crate::models::{
    DashboardDocument, DashboardEnvelope, Datasource, DatasourceCreated, Folder, SearchHit,
    SearchHitKind, UpsertedDashboard,
};
use crate::{Error, Result};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// HTTP client configuration for the dashboard service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl HttpSettings {
    /// Reads timeouts from the service configuration.
    #[must_use]
    pub const fn from_config(config: &ServiceConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

/// Blocking client for the dashboard service.
///
/// Every request carries the same bearer token and JSON content headers. The
/// client is built once per process and reused for every call of a run.
pub struct HttpDashboardClient {
    /// Service root, e.g. `http://grafana:3000/`.
    base_url: Url,
    /// API token.
    token: SecretString,
    /// Overall run budget.
    deadline: Deadline,
    /// HTTP client with connection pooling.
    client: reqwest::blocking::Client,
}

impl HttpDashboardClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        token: SecretString,
        settings: HttpSettings,
        deadline: Deadline,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidInput(format!("service url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidInput(format!(
                "service url '{base_url}' cannot be used as a base"
            )));
        }

        Ok(Self {
            base_url,
            token,
            deadline,
            client: build_http_client(settings)?,
        })
    }

    /// Creates a client from the service section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the client cannot be built.
    pub fn from_config(config: &ServiceConfig, deadline: Deadline) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::InvalidInput("service token is not configured".to_string()))?;
        Self::new(&config.url, token, HttpSettings::from_config(config), deadline)
    }

    /// Builds an endpoint URL from path segments.
    ///
    /// Segments are percent-encoded, so identifiers taken from documents are
    /// safe to pass.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Checks the deadline, adds the bearer token and sends the request.
    fn send(&self, operation: &'static str, request: RequestBuilder) -> RemoteResult<Response> {
        self.deadline.check()?;

        request
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                let err = RemoteError::Network {
                    operation: operation.to_string(),
                    cause: format!("{kind}: {e}"),
                };
                tracing::error!(operation, error = %err, "dashboard service unreachable");
                err
            })
    }

    fn get(&self, operation: &'static str, segments: &[&str]) -> RemoteResult<Response> {
        self.send(operation, self.client.get(self.endpoint(segments)))
    }

    fn post(
        &self,
        operation: &'static str,
        segments: &[&str],
        body: &Value,
    ) -> RemoteResult<Response> {
        self.send(operation, self.client.post(self.endpoint(segments)).json(body))
    }
}

/// Rejects non-success statuses and decodes the body.
fn decode_json<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> RemoteResult<T> {
    let response = ensure_success(operation, response)?;
    response.json::<T>().map_err(|e| {
        let err = RemoteError::Decode {
            operation: operation.to_string(),
            cause: e.to_string(),
        };
        tracing::error!(operation, error = %err, "unexpected response body");
        err
    })
}

fn ensure_success(operation: &'static str, response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let err = RemoteError::Protocol {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    };
    tracing::error!(
        operation,
        status = status.as_u16(),
        error = %err,
        "dashboard service rejected request"
    );
    Err(err)
}

impl DashboardApi for HttpDashboardClient {
    fn search_folders(&self) -> RemoteResult<Vec<Folder>> {
        let response = self.get("search_folders", &["api", "search"])?;
        let hits: Vec<SearchHit> = decode_json("search_folders", response)?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.kind == SearchHitKind::Folder)
            .map(SearchHit::into_folder)
            .collect())
    }

    fn search_dashboards(&self, folder_id: i64) -> RemoteResult<Vec<SearchHit>> {
        let request = self
            .client
            .get(self.endpoint(&["api", "search"]))
            .query(&[("folderIds", folder_id)]);
        let response = self.send("search_dashboards", request)?;
        let hits: Vec<SearchHit> = decode_json("search_dashboards", response)?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.kind == SearchHitKind::Dashboard)
            .collect())
    }

    fn get_folder(&self, uid: &str) -> RemoteResult<Option<Folder>> {
        let response = self.get("get_folder", &["api", "folders", uid])?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(folder_uid = uid, "folder does not exist");
            return Ok(None);
        }
        decode_json("get_folder", response).map(Some)
    }

    fn create_folder(&self, uid: &str, title: &str) -> RemoteResult<Folder> {
        let body = json!({ "uid": uid, "title": title });
        let response = self.post("create_folder", &["api", "folders"], &body)?;
        let folder: Folder = decode_json("create_folder", response)?;
        tracing::info!(folder_uid = %folder.uid, folder_id = folder.id, title, "created folder");
        Ok(folder)
    }

    fn get_dashboard(&self, uid: &str) -> RemoteResult<DashboardEnvelope> {
        let response = self.get("get_dashboard", &["api", "dashboards", "uid", uid])?;
        decode_json("get_dashboard", response)
    }

    fn upsert_dashboard(
        &self,
        dashboard: &DashboardDocument,
        folder_id: i64,
        overwrite: bool,
    ) -> RemoteResult<UpsertedDashboard> {
        let body = json!({
            "dashboard": dashboard.as_value(),
            "overwrite": overwrite,
            "folderId": folder_id,
        });
        let response = self.post("upsert_dashboard", &["api", "dashboards", "db"], &body)?;
        let upserted: UpsertedDashboard = decode_json("upsert_dashboard", response)?;
        tracing::info!(
            dashboard_uid = %upserted.uid,
            folder_id,
            version = upserted.version,
            "upserted dashboard"
        );
        Ok(upserted)
    }

    fn list_datasources(&self) -> RemoteResult<Vec<Datasource>> {
        let response = self.get("list_datasources", &["api", "datasources"])?;
        decode_json("list_datasources", response)
    }

    fn get_datasource_by_uid(&self, uid: &str) -> RemoteResult<Option<Datasource>> {
        let response = self.get("get_datasource", &["api", "datasources", "uid", uid])?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(datasource_uid = uid, "datasource does not exist");
            return Ok(None);
        }
        decode_json("get_datasource", response).map(Some)
    }

    fn create_datasource(&self, definition: &Value) -> RemoteResult<DatasourceCreated> {
        let response = self.post("create_datasource", &["api", "datasources"], definition)?;
        if response.status() == StatusCode::CONFLICT {
            tracing::info!(
                name = definition.get("name").and_then(serde_json::Value::as_str),
                "datasource already exists"
            );
            return Ok(DatasourceCreated::AlreadyExists);
        }

        let created: Value = decode_json("create_datasource", response)?;
        let name = created
            .get("name")
            .or_else(|| definition.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        tracing::info!(name = %name, "created datasource");
        Ok(DatasourceCreated::Created { name })
    }
}

/// Builds a blocking HTTP client with configured timeouts.
fn build_http_client(settings: HttpSettings) -> Result<reqwest::blocking::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(format!("Dashvault/{}", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .pool_max_idle_per_host(4);
    if settings.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(settings.timeout_ms));
    }
    if settings.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(settings.connect_timeout_ms));
    }

    builder.build().map_err(|e| Error::OperationFailed {
        operation: "build_http_client".to_string(),
        cause: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Answers one request with a canned response.
    ///
    /// Returns the base URL and a receiver for the request line and headers.
    fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            tx.send(head).unwrap();
        });

        (format!("http://{addr}/"), rx)
    }

    fn client(base: &str, deadline: Deadline) -> HttpDashboardClient {
        HttpDashboardClient::new(
            base,
            SecretString::from("token".to_string()),
            HttpSettings {
                timeout_ms: 2_000,
                connect_timeout_ms: 500,
            },
            deadline,
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("http://grafana:3000", Deadline::none());
        assert_eq!(
            api.endpoint(&["api", "dashboards", "uid", "abc"]).as_str(),
            "http://grafana:3000/api/dashboards/uid/abc"
        );

        let api = client("http://host/grafana/", Deadline::none());
        assert_eq!(
            api.endpoint(&["api", "search"]).as_str(),
            "http://host/grafana/api/search"
        );
    }

    #[test]
    fn test_endpoint_encodes_identifiers() {
        let api = client("http://grafana:3000/", Deadline::none());
        let url = api.endpoint(&["api", "datasources", "uid", "Prom EU/1"]);
        assert_eq!(
            url.as_str(),
            "http://grafana:3000/api/datasources/uid/Prom%20EU%2F1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpDashboardClient::new(
            "not a url",
            SecretString::from("t".to_string()),
            HttpSettings::default(),
            Deadline::none(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_spent_deadline_skips_request() {
        let api = client("http://127.0.0.1:9", Deadline::after(Duration::ZERO));
        assert_eq!(api.search_folders(), Err(RemoteError::DeadlineExceeded));
    }

    #[test]
    fn test_get_folder_found_sends_bearer_token() {
        let (base, request) =
            serve_once("200 OK", r#"{"id": 7, "uid": "infra", "title": "Infra"}"#);
        let api = client(&base, Deadline::none());

        let folder = api.get_folder("infra").unwrap();
        assert_eq!(
            folder,
            Some(Folder {
                id: 7,
                uid: "infra".to_string(),
                title: "Infra".to_string(),
            })
        );

        let head = request.recv().unwrap();
        assert!(head.starts_with("GET /api/folders/infra HTTP/1.1"), "{head}");
        assert!(
            head.to_ascii_lowercase().contains("authorization: bearer token\r\n"),
            "{head}"
        );
    }

    #[test]
    fn test_get_folder_not_found_is_none() {
        let (base, _request) = serve_once("404 Not Found", r#"{"message": "folder not found"}"#);
        let api = client(&base, Deadline::none());
        assert_eq!(api.get_folder("missing").unwrap(), None);
    }

    #[test]
    fn test_get_datasource_not_found_is_none() {
        let (base, request) = serve_once("404 Not Found", r#"{"message": "not found"}"#);
        let api = client(&base, Deadline::none());

        assert_eq!(api.get_datasource_by_uid("gone").unwrap(), None);
        let head = request.recv().unwrap();
        assert!(head.starts_with("GET /api/datasources/uid/gone HTTP/1.1"), "{head}");
    }

    #[test]
    fn test_get_datasource_found() {
        let (base, _request) = serve_once(
            "200 OK",
            r#"{"id": 1, "uid": "prom-1", "name": "Prometheus", "type": "prometheus"}"#,
        );
        let api = client(&base, Deadline::none());

        let datasource = api.get_datasource_by_uid("prom-1").unwrap().unwrap();
        assert_eq!(datasource.name, "Prometheus");
        assert_eq!(datasource.body["type"], "prometheus");
    }

    #[test]
    fn test_server_error_is_protocol_error() {
        let (base, _request) = serve_once("500 Internal Server Error", r#"{"message": "boom"}"#);
        let api = client(&base, Deadline::none());

        let err = api.get_dashboard("cpu").unwrap_err();
        assert_eq!(
            err,
            RemoteError::Protocol {
                operation: "get_dashboard".to_string(),
                status: 500,
                body: r#"{"message": "boom"}"#.to_string(),
            }
        );
    }

    #[test]
    fn test_folder_lookup_server_error_is_not_none() {
        let (base, _request) = serve_once("503 Service Unavailable", "{}");
        let api = client(&base, Deadline::none());
        assert_eq!(api.get_folder("infra").unwrap_err().status(), Some(503));
    }

    #[test]
    fn test_create_datasource_conflict_is_already_exists() {
        let (base, request) = serve_once("409 Conflict", r#"{"message": "data source exists"}"#);
        let api = client(&base, Deadline::none());

        let outcome = api.create_datasource(&json!({"name": "Loki", "type": "loki"}));
        assert_eq!(outcome.unwrap(), DatasourceCreated::AlreadyExists);
        let head = request.recv().unwrap();
        assert!(head.starts_with("POST /api/datasources HTTP/1.1"), "{head}");
    }

    #[test]
    fn test_create_datasource_created() {
        let (base, _request) = serve_once(
            "200 OK",
            r#"{"id": 3, "message": "Datasource added", "name": "Loki"}"#,
        );
        let api = client(&base, Deadline::none());

        let outcome = api.create_datasource(&json!({"name": "Loki", "type": "loki"}));
        assert_eq!(
            outcome.unwrap(),
            DatasourceCreated::Created {
                name: "Loki".to_string()
            }
        );
    }

    #[test]
    fn test_search_folders_keeps_folder_hits() {
        let (base, _request) = serve_once(
            "200 OK",
            r#"[
                {"id": 1, "uid": "infra", "title": "Infra", "type": "dash-folder"},
                {"id": 2, "uid": "cpu", "title": "CPU", "type": "dash-db"}
            ]"#,
        );
        let api = client(&base, Deadline::none());

        let folders = api.search_folders().unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].uid, "infra");
    }

    #[test]
    fn test_unexpected_body_is_decode_error() {
        let (base, _request) = serve_once("200 OK", "not json");
        let api = client(&base, Deadline::none());
        assert!(matches!(
            api.list_datasources().unwrap_err(),
            RemoteError::Decode { .. }
        ));
    }

    #[test]
    fn test_unreachable_service_is_network_error() {
        let api = client("http://127.0.0.1:9", Deadline::none());
        let err = api.list_datasources().unwrap_err();
        assert!(matches!(err, RemoteError::Network { .. }), "{err}");
    }
}
