use crate::{error::ProviderError, resolver, AppState};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use url::Url;

/// Outcome of resolving one request. Turned into exactly one response.
#[derive(Debug)]
pub enum Resolution {
    Found(Url),
    NotFound,
    Failed(ProviderError),
}

impl IntoResponse for Resolution {
    fn into_response(self) -> Response {
        match self {
            Resolution::Found(url) => (
                StatusCode::MOVED_PERMANENTLY,
                [(header::LOCATION, url.as_str())],
            )
                .into_response(),
            Resolution::NotFound => (StatusCode::NOT_FOUND, "shortcut not found").into_response(),
            Resolution::Failed(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to find redirect: {e}"),
            )
                .into_response(),
        }
    }
}

/// ANY /*
///
/// Resolve the request path against the shortcut table and answer with a
/// 301 to the destination, a 404 if nothing matches, or a 500 if the
/// shortcut table could not be loaded.
pub async fn redirect(State(state): State<Arc<AppState>>, uri: Uri) -> Resolution {
    match resolver::resolve(&state.cache, uri.path(), uri.query()).await {
        Ok(Some(url)) => {
            tracing::info!("redirecting={:?} to={:?}", uri.to_string(), url.as_str());
            Resolution::Found(url)
        }
        Ok(None) => {
            tracing::debug!("no shortcut for {:?}", uri.path());
            Resolution::NotFound
        }
        Err(e) => {
            tracing::error!("failed to find redirect for {:?}: {}", uri.path(), e);
            Resolution::Failed(e)
        }
    }
}
