//! Builds the log-in URL that sends a user back to where they were going.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Only same-site paths are followed after logging in, and never the log-in
/// page itself.
fn is_safe_redirect_path(path_and_query: &str) -> bool {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return false;
    }

    let path = path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path);

    path != endpoints::LOG_IN_VIEW && path != endpoints::LOG_IN_API
}

/// Reduce `raw_url` to a safe path and query.
///
/// Returns `None` for absolute URLs, protocol relative URLs and the log-in
/// page.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    safe_path_and_query(&uri)
}

fn safe_path_and_query(uri: &Uri) -> Option<String> {
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_path(path_and_query).then(|| path_and_query.to_owned())
}

/// The log-in page URL with the page `request` was for as the redirect target.
///
/// HTMX requests to the API are sent back to the page that made them, found in
/// the `HX-Current-URL` header.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let target = if request.uri().path().starts_with("/api") {
        hx_current_page(request)?
    } else {
        normalize_redirect_url(request.uri().path_and_query()?.as_str())?
    };

    build_log_in_redirect_url_from_target(&target)
}

/// The log-in page URL with `target` as the redirect target.
pub fn build_log_in_redirect_url_from_target(target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", target)]) {
        Ok(query) => Some(format!("{}?{query}", endpoints::LOG_IN_VIEW)),
        Err(error) => {
            tracing::error!("could not encode redirect URL {target}: {error}");
            None
        }
    }
}

fn hx_current_page(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("missing HX-Request header for {}", request.uri().path());
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("missing HX-Current-URL header for {}", request.uri().path());
        return None;
    };

    // HX-Current-URL is a full URL, so only the path and query are kept.
    let page = current_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| safe_path_and_query(&uri));

    if page.is_none() {
        tracing::warn!("invalid HX-Current-URL header value: {current_url}");
    }

    page
}
