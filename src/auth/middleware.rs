//! Middleware that checks the auth cookie, keeps the session alive and sends
//! logged out users to the log-in page.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::Duration;

use crate::{
    AppState,
    auth::{
        Role, UserID,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    timezone::get_local_offset,
};

/// How long a session is kept alive after each request.
const SESSION_EXTENSION: Duration = Duration::minutes(5);

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// The logged in user, taken from the auth cookie.
///
/// Route handlers behind [auth_guard] or [auth_guard_hx] can receive it with
/// `Extension(current_user): Extension<CurrentUser>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentUser {
    pub id: UserID,
    pub role: Role,
}

impl CurrentUser {
    /// Whether the user is a parent.
    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }
}

async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        tracing::warn!(
            "could not build a redirect URL for {}, falling back to the home page",
            request.uri().path()
        );

        build_log_in_redirect_url_from_target(endpoints::ROOT)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("invalid timezone {}, redirecting to log in page", state.local_timezone);
        return get_redirect(&log_in_redirect_url);
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("could not get cookie jar: {error:?}, redirecting to log in page");
            return get_redirect(&log_in_redirect_url);
        }
    };

    let current_user = match get_token_from_cookies(&jar) {
        Ok(token) => CurrentUser {
            id: token.user_id,
            role: token.role,
        },
        Err(error) => {
            tracing::debug!("rejecting request to {}: {error}", parts.uri.path());
            return get_redirect(&log_in_redirect_url);
        }
    };

    parts.extensions.insert(current_user);
    let response = next.run(Request::from_parts(parts, body)).await;

    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(
        jar.clone(),
        SESSION_EXTENSION,
        local_offset,
    ) {
        Ok(updated_jar) => updated_jar,
        Err(error) => {
            tracing::error!("could not extend auth cookie: {error}, keeping the old cookie");
            jar
        }
    };

    for (key, value) in jar.into_response().headers() {
        if key == SET_COOKIE {
            parts.headers.append(key, value.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

/// Middleware for pages: passes the [CurrentUser] on to the handler if the
/// auth cookie is valid, otherwise redirects to the log-in page.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware for HTMX endpoints: like [auth_guard], but redirects with the
/// `HX-Redirect` header so HTMX loads the log-in page.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
