//! The log-in page and the handler for log-in requests.
//!
//! Parents and children log in the same way, with their email and password.
//! Where they land afterwards depends on their role.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    app_state::create_cookie_key,
    auth::{
        DEFAULT_COOKIE_DURATION, Role, credentials::verify_credentials, invalidate_auth_cookie,
        redirect::normalize_redirect_url, set_auth_cookie,
    },
    endpoints,
    html::{base, labelled_input, log_in_register, password_input, submit_button},
    timezone::get_local_offset,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect email or password.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

const FOOTER_LINK_STYLE: &str = "font-semibold leading-6 text-blue-600 hover:text-blue-500 \
    dark:text-blue-500 dark:hover:text-blue-400";

fn log_in_form(email: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (labelled_input("email", "Email", "email", email, None))
            (password_input("", 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            (submit_button("Log in"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "
                a href=(endpoints::FORGOT_PASSWORD_VIEW) tabindex="0" class=(FOOTER_LINK_STYLE)
                {
                    "Reset it here"
                }
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "New here? Register as a "
                a href=(endpoints::REGISTER_PARENT_VIEW) tabindex="0" class=(FOOTER_LINK_STYLE)
                {
                    "parent"
                }
                " or a "
                a href=(endpoints::REGISTER_CHILD_VIEW) tabindex="0" class=(FOOTER_LINK_STYLE)
                {
                    "child"
                }
                "."
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    let redirect_url = raw_url.and_then(normalize_redirect_url);

    if let (None, Some(raw_url)) = (&redirect_url, raw_url) {
        tracing::warn!("invalid redirect URL from {source}: {raw_url}");
    }

    redirect_url
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = log_in_register("Log in to your account", &log_in_form);

    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LoginState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(
        cookie_secret: &str,
        local_timezone: &str,
        db_connection: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection,
        }
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The password is not validated here since it is only compared against the
/// stored hash.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub email: String,

    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// `Some` means checked, whatever the string value.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

/// The page a user lands on after logging in, if they were not on their way
/// somewhere else.
pub fn landing_page(role: Role) -> &'static str {
    match role {
        Role::Parent => endpoints::DASHBOARD_VIEW,
        Role::Child => endpoints::HOME_VIEW,
    }
}

/// Handler for log-in requests via the POST method.
///
/// On success the auth cookie is set and the client is redirected to the
/// requested page, or the user's landing page. Otherwise the form is returned
/// with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let render_error =
        |message: &str| log_in_form(&user_data.email, Some(message), redirect_url).into_response();

    let verify_result = match state.db_connection.lock() {
        Ok(connection) => verify_credentials(&user_data.email, &user_data.password, &*connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    let user = match verify_result {
        Ok(user) => user,
        Err(Error::InvalidCredentials) => {
            tracing::info!("failed log-in attempt for {}", user_data.email);
            return render_error(INVALID_CREDENTIALS_ERROR_MSG);
        }
        Err(error) => {
            tracing::error!("unhandled error while verifying credentials: {error}");
            return render_error(INTERNAL_ERROR_MSG);
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let redirect_url = redirect_url.unwrap_or(landing_page(user.role));

    match set_auth_cookie(jar.clone(), user.id, user.role, cookie_duration, local_offset) {
        Ok(updated_jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(redirect_url.to_owned()),
            updated_jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not set auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}
