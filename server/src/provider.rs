use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::{
    error::ProviderError,
    models::{Cell, Row},
};

// ── Provider seam ──────────────────────────────────────────────────────────

/// Source of `[shortcut, destination]` rows.
///
/// The cache calls this at most once per TTL window. Implementations report
/// configuration, auth and network problems as errors; malformed rows are
/// returned untouched and filtered by the cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    async fn query(&self) -> Result<Vec<Row>, ProviderError>;
}

// ── Google Sheets ──────────────────────────────────────────────────────────

/// How the Sheets API request is authorised. Obtaining the credential is
/// somebody else's job; we only attach it.
#[derive(Debug, Clone, Default)]
pub enum SheetsAuth {
    /// OAuth access token sent as `Authorization: Bearer ...`.
    Bearer(String),
    /// API key sent as the `key` query parameter (public sheets only).
    ApiKey(String),
    #[default]
    None,
}

/// Reads columns A:B of a named sheet via the Sheets v4 `values.get` call.
pub struct SheetsProvider {
    client: reqwest::Client,
    api_base: Url,
    sheet_id: Option<String>,
    sheet_name: Option<String>,
    auth: SheetsAuth,
}

/// Subset of the `ValueRange` response we care about. `values` is omitted
/// entirely by the API when the range is empty.
#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsProvider {
    pub fn new(
        api_base: Url,
        sheet_id: Option<String>,
        sheet_name: Option<String>,
        auth: SheetsAuth,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base,
            sheet_id,
            sheet_name,
            auth,
        })
    }

    /// `{api_base}/v4/spreadsheets/{id}/values/{sheet}!A:B`
    fn values_url(&self, sheet_id: &str, sheet_name: &str) -> Result<Url, ProviderError> {
        let range = format!("{sheet_name}!A:B");

        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidApiBase(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", sheet_id, "values", range.as_str()]);

        if let SheetsAuth::ApiKey(key) = &self.auth {
            url.query_pairs_mut().append_pair("key", key);
        }

        Ok(url)
    }
}

#[async_trait]
impl Provider for SheetsProvider {
    async fn query(&self) -> Result<Vec<Row>, ProviderError> {
        let sheet_id = self
            .sheet_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::MissingConfig("GOOGLE_SHEET_ID"))?;
        let sheet_name = self
            .sheet_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::MissingConfig("SHEET_NAME"))?;

        let url = self.values_url(sheet_id, sheet_name)?;

        let mut req = self.client.get(url);
        if let SheetsAuth::Bearer(token) = &self.auth {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let range: ValueRange = resp.json().await?;
        tracing::info!("queried {} rows", range.values.len());

        Ok(into_rows(range.values))
    }
}

fn into_rows(values: Vec<Vec<serde_json::Value>>) -> Vec<Row> {
    values
        .into_iter()
        .map(|row| row.into_iter().map(Cell::from).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn provider(base: &str, id: Option<&str>, name: Option<&str>, auth: SheetsAuth) -> SheetsProvider {
        SheetsProvider::new(
            Url::parse(base).unwrap(),
            id.map(str::to_owned),
            name.map(str::to_owned),
            auth,
            Duration::from_secs(2),
        )
        .unwrap()
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn spawn_fake_sheets(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_missing_sheet_id_is_config_error() {
        let p = provider("http://127.0.0.1:9", None, Some("Links"), SheetsAuth::None);
        let err = p.query().await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingConfig("GOOGLE_SHEET_ID")));
        assert_eq!(err.to_string(), "GOOGLE_SHEET_ID not set");
    }

    #[tokio::test]
    async fn test_missing_sheet_name_is_config_error() {
        let p = provider("http://127.0.0.1:9", Some("abc"), Some(""), SheetsAuth::None);
        let err = p.query().await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingConfig("SHEET_NAME")));
    }

    #[test]
    fn test_values_url_encodes_range_and_key() {
        let p = provider(
            "https://sheets.googleapis.com/",
            Some("sheet123"),
            Some("My Links"),
            SheetsAuth::ApiKey("k1".into()),
        );
        let url = p.values_url("sheet123", "My Links").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/My%20Links!A:B?key=k1"
        );
    }

    #[tokio::test]
    async fn test_non_hierarchical_api_base_fails_the_query() {
        let p = provider(
            "mailto:sheets@example.com",
            Some("abc"),
            Some("Links"),
            SheetsAuth::None,
        );
        let err = p.query().await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidApiBase(ref base) if base == "mailto:sheets@example.com"));
    }

    #[test]
    fn test_into_rows_keeps_non_strings_as_other() {
        let rows = into_rows(vec![
            vec![json!("go"), json!("https://example.com")],
            vec![json!(42), json!(null)],
        ]);
        assert_eq!(rows[0][0], Cell::Text("go".into()));
        assert_eq!(rows[1][0], Cell::Other(json!(42)));
        assert_eq!(rows[1][1], Cell::Other(json!(null)));
    }

    #[tokio::test]
    async fn test_query_reads_values_with_bearer_token() {
        let router = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                if auth != "Bearer tok" {
                    return Json(json!({ "error": "unauthorised" }));
                }
                Json(json!({
                    "range": "Links!A1:B2",
                    "values": [["go", "https://example.com"], ["docs"]]
                }))
            }),
        );
        let base = spawn_fake_sheets(router).await;

        let p = provider(&base, Some("abc"), Some("Links"), SheetsAuth::Bearer("tok".into()));
        let rows = p.query().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Cell::from("go"), Cell::from("https://example.com")]);
        assert_eq!(rows[1], vec![Cell::from("docs")]);
    }

    #[tokio::test]
    async fn test_query_empty_range_has_no_rows() {
        let router = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("key").map(String::as_str), Some("k1"));
                Json(json!({ "range": "Links!A1:B1" }))
            }),
        );
        let base = spawn_fake_sheets(router).await;

        let p = provider(&base, Some("abc"), Some("Links"), SheetsAuth::ApiKey("k1".into()));
        assert!(p.query().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_non_success_status_is_error() {
        let router = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            get(|| async { (axum::http::StatusCode::FORBIDDEN, "permission denied") }),
        );
        let base = spawn_fake_sheets(router).await;

        let p = provider(&base, Some("abc"), Some("Links"), SheetsAuth::None);
        match p.query().await.unwrap_err() {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "permission denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
