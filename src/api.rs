use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{QaError, QaResult};
use crate::models::{AuditLogEntry, Portfolio, PortfolioComment, PortfolioUpdate, QualityMetrics};

pub struct QaClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl QaClient {
    pub fn new(config: &Config) -> QaResult<Self> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        Ok(QaClient {
            http,
            base_url: config.api_base_url.clone(),
            token: config.api_token.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> QaResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QaError::Status {
                status: status.as_u16(),
                url: self.url(path),
            });
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| QaError::MalformedResponse(format!("{path}: response is not JSON: {e}")))
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> QaResult<Vec<T>> {
        tracing::debug!(path, "fetching list");
        let body = self.send(self.request(Method::GET, path), path).await?;
        unwrap_list(body, path)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
    ) -> QaResult<T> {
        let builder = self.request(method, path).json(payload);
        let body = self.send(builder, path).await?;
        unwrap_object(body, path)
    }

    pub async fn fetch_audit_trail(&self) -> QaResult<Vec<AuditLogEntry>> {
        self.get_list("/api/audit-trail").await
    }

    pub async fn fetch_portfolios(&self) -> QaResult<Vec<Portfolio>> {
        self.get_list("/quality/api/portfolios").await
    }

    pub async fn update_portfolio(
        &self,
        id: &str,
        update: &PortfolioUpdate,
    ) -> QaResult<Portfolio> {
        let path = format!("/quality/api/portfolios/{id}");
        tracing::info!(portfolio = id, status = %update.status, "updating portfolio");
        self.send_json(Method::PATCH, &path, update).await
    }

    /// Returns the stored comment, or `None` when the server answers with an empty body.
    pub async fn add_portfolio_comment(
        &self,
        id: &str,
        comment: &PortfolioComment,
    ) -> QaResult<Option<PortfolioComment>> {
        let path = format!("/quality/api/portfolios/{id}/comments");
        tracing::info!(portfolio = id, "posting portfolio comment");
        let builder = self.request(Method::POST, &path).json(comment);
        match self.send(builder, &path).await? {
            Value::Null => Ok(None),
            body => unwrap_object(body, &path).map(Some),
        }
    }

    pub async fn fetch_quality_metrics(&self) -> QaResult<QualityMetrics> {
        let path = "/api/quality-metrics";
        let body = self.send(self.request(Method::GET, path), path).await?;
        unwrap_object(body, path)
    }
}

/// Accepts a bare array or a `{results: [...]}` / `{data: [...]}` envelope.
/// Items that fail to deserialize are skipped.
pub fn unwrap_list<T: DeserializeOwned>(body: Value, source: &str) -> QaResult<Vec<T>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match ["results", "data"]
            .into_iter()
            .find_map(|key| match map.remove(key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }) {
            Some(items) => items,
            None => {
                return Err(QaError::MalformedResponse(format!(
                    "{source}: expected an array or a results/data envelope"
                )))
            }
        },
        other => {
            return Err(QaError::MalformedResponse(format!(
                "{source}: expected an array, got {}",
                kind_of(&other)
            )))
        }
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(source, index, "skipping malformed record: {e}");
                None
            }
        })
        .collect();

    tracing::debug!(source, total, kept = parsed.len(), "list unwrapped");
    Ok(parsed)
}

/// Accepts a bare object or one wrapped under `data`.
pub fn unwrap_object<T: DeserializeOwned>(body: Value, source: &str) -> QaResult<T> {
    let inner = match body {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner)
        .map_err(|e| QaError::MalformedResponse(format!("{source}: {e}")))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn unwraps_bare_array_and_envelopes() {
        let bare = json!([{"user": "Ana", "actionType": "login"}]);
        let results = json!({"results": [{"user": "Ana"}, {"user": "Ben"}]});
        let data = json!({"data": [{"user": "Cy"}]});

        assert_eq!(unwrap_list::<AuditLogEntry>(bare, "t").unwrap().len(), 1);
        assert_eq!(unwrap_list::<AuditLogEntry>(results, "t").unwrap().len(), 2);
        assert_eq!(unwrap_list::<AuditLogEntry>(data, "t").unwrap().len(), 1);
    }

    #[test]
    fn rejects_shapes_without_a_list() {
        let err = unwrap_list::<AuditLogEntry>(json!({"count": 3}), "t").unwrap_err();
        assert!(matches!(err, QaError::MalformedResponse(_)));
        let err = unwrap_list::<AuditLogEntry>(json!("nope"), "t").unwrap_err();
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn skips_malformed_items() {
        let body = json!([{"id": "P-1"}, {"learnerName": "no id"}, 7]);
        let portfolios = unwrap_list::<Portfolio>(body, "t").unwrap();
        assert_eq!(portfolios.len(), 1);
        assert_eq!(portfolios[0].id, "P-1");
    }

    #[test]
    fn unwraps_object_under_data() {
        let wrapped = json!({"data": {"totalAssessments": 12, "region": "north"}});
        let metrics: QualityMetrics = unwrap_object(wrapped, "t").unwrap();
        assert_eq!(metrics.total_assessments, Some(12));
        assert_eq!(metrics.extra.get("region"), Some(&json!("north")));

        let bare: QualityMetrics =
            unwrap_object(json!({"averagePassRate": 81.5}), "t").unwrap();
        assert_eq!(bare.average_pass_rate, Some(81.5));
    }

    /// Serves one canned HTTP response and hands back the raw request text.
    async fn serve_once(
        status_line: &str,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn test_config(base_url: String) -> Config {
        Config {
            api_base_url: base_url,
            api_token: Some("secret-token".to_string()),
            http_timeout: std::time::Duration::from_secs(5),
            role: None,
            reviewer: "Tester".to_string(),
            sampling_seed: None,
            log_level: "debug".to_string(),
        }
    }

    #[tokio::test]
    async fn fetches_audit_trail_with_bearer_token() {
        let (base, handle) = serve_once(
            "200 OK",
            r#"{"results":[{"user":"Ana","actionType":"verify",
                "timestamp":"2025-03-01T10:00:00Z"}]}"#,
        )
        .await;
        let client = QaClient::new(&test_config(base)).unwrap();

        let logs = client.fetch_audit_trail().await.unwrap();
        let request = handle.await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user.as_deref(), Some("Ana"));
        assert!(request.starts_with("GET /api/audit-trail"));
        assert!(request
            .to_lowercase()
            .contains("authorization: bearer secret-token"));
    }

    #[tokio::test]
    async fn patch_sends_status_body() {
        let (base, handle) = serve_once("200 OK", r#"{"id":"P-9","status":"verified"}"#).await;
        let client = QaClient::new(&test_config(base)).unwrap();

        let update = PortfolioUpdate {
            status: "verified".to_string(),
            feedback: None,
        };
        let portfolio = client.update_portfolio("P-9", &update).await.unwrap();
        let request = handle.await.unwrap();

        assert_eq!(portfolio.status.as_deref(), Some("verified"));
        assert!(request.starts_with("PATCH /quality/api/portfolios/P-9"));
        assert!(request.contains(r#"{"status":"verified"}"#));
    }

    #[tokio::test]
    async fn comment_accepts_empty_body() {
        let (base, handle) = serve_once("201 Created", "").await;
        let client = QaClient::new(&test_config(base)).unwrap();

        let comment = PortfolioComment {
            id: None,
            author: Some("Tester".to_string()),
            comment: "Evidence for unit 4 missing".to_string(),
            created_at: None,
        };
        let stored = client.add_portfolio_comment("P-2", &comment).await.unwrap();
        let request = handle.await.unwrap();

        assert!(stored.is_none());
        assert!(request.starts_with("POST /quality/api/portfolios/P-2/comments"));
        assert!(request.contains("Evidence for unit 4 missing"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (base, handle) = serve_once("503 Service Unavailable", "{}").await;
        let client = QaClient::new(&test_config(base)).unwrap();

        let err = client.fetch_portfolios().await.unwrap_err();
        handle.await.unwrap();

        assert!(matches!(err, QaError::Status { status: 503, .. }));
    }
}
