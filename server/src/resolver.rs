use percent_encoding::percent_decode_str;
use url::{form_urlencoded, Url};

use crate::{cache::ShortcutCache, error::ProviderError};

/// Find the destination for a request path, longest shortcut first.
///
/// `/a/b/c` is tried as `a/b/c`, then `a/b`, then `a`. The segments that
/// did not take part in the match are appended to the destination path and
/// the request's query pairs are added to the destination's own.
///
/// `Ok(None)` means no prefix of the path is a known shortcut.
pub async fn resolve(
    cache: &ShortcutCache,
    path: &str,
    query: Option<&str>,
) -> Result<Option<Url>, ProviderError> {
    let path = path.strip_prefix('/').unwrap_or(path);

    let mut segments: Vec<&str> = path.split('/').collect();
    let mut discarded: Vec<&str> = Vec::new();

    // Only the full path goes through `get`: one refresh attempt per request,
    // shorter prefixes just read the mapping.
    let mut found = cache.get(&lookup_key(&segments.join("/"))).await?;

    while found.is_none() {
        let Some(last) = segments.pop() else {
            break;
        };
        discarded.insert(0, last);

        if segments.is_empty() {
            break;
        }
        found = cache.lookup(&lookup_key(&segments.join("/"))).await;
    }

    Ok(found.map(|base| prep_redirect(base, &discarded.join("/"), query)))
}

/// Shortcuts are stored lowercased and unescaped.
fn lookup_key(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().to_lowercase()
}

/// Attach the unmatched path suffix and forward the request query.
pub fn prep_redirect(mut base: Url, add_path: &str, query: Option<&str>) -> Url {
    if !add_path.is_empty() {
        let mut path = base.path().to_owned();
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(add_path);
        base.set_path(&path);
    }

    let mut pairs: Vec<(String, String)> = base.query_pairs().into_owned().collect();
    if let Some(query) = query {
        pairs.extend(form_urlencoded::parse(query.as_bytes()).into_owned());
    }

    if pairs.is_empty() {
        base.set_query(None);
    } else {
        base.query_pairs_mut().clear().extend_pairs(pairs);
    }

    base
}
