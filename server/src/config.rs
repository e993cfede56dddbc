use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

use crate::provider::SheetsAuth;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "localhost" or "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Spreadsheet holding the shortcut table. Left optional so a missing
    /// value surfaces as a 500 on each request instead of a startup failure.
    pub sheet_id: Option<String>,

    /// Sheet (tab) name; columns A:B are read from it.
    pub sheet_name: Option<String>,

    /// Credential attached to Sheets API requests
    pub auth: SheetsAuth,

    /// Sheets API root, overridable for testing against a local server
    pub sheets_api_base: Url,

    /// How long a fetched shortcut table is served before re-querying
    pub cache_ttl: Duration,

    /// Upper bound on a single Sheets API round-trip
    pub provider_timeout: Duration,
}

impl AppConfig {
    /// `host:port`, with IPv6 hosts bracketed so the result stays parsable.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let port = non_empty("PORT")
            .unwrap_or_else(|| "8080".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let cache_ttl = non_empty("CACHE_TTL_SECS")
            .unwrap_or_else(|| "5".into())
            .parse::<u64>()
            .context("CACHE_TTL_SECS must be a whole number of seconds")?;

        let provider_timeout = non_empty("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".into())
            .parse::<u64>()
            .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?;

        let sheets_api_base = non_empty("SHEETS_API_BASE")
            .unwrap_or_else(|| "https://sheets.googleapis.com".into());
        let sheets_api_base = Url::parse(&sheets_api_base)
            .with_context(|| format!("SHEETS_API_BASE is not a valid URL: {sheets_api_base}"))?;

        // A bearer token wins over an API key when both are present.
        let auth = match (non_empty("GOOGLE_ACCESS_TOKEN"), non_empty("GOOGLE_API_KEY")) {
            (Some(token), _) => SheetsAuth::Bearer(token),
            (None, Some(key)) => SheetsAuth::ApiKey(key),
            (None, None) => SheetsAuth::None,
        };

        Ok(Self {
            host: non_empty("LISTEN_ADDR").unwrap_or_else(|| "localhost".into()),
            port,
            sheet_id: non_empty("GOOGLE_SHEET_ID"),
            sheet_name: non_empty("SHEET_NAME"),
            auth,
            sheets_api_base,
            cache_ttl: Duration::from_secs(cache_ttl),
            provider_timeout: Duration::from_secs(provider_timeout),
        })
    }
}
