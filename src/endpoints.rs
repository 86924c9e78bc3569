//! The URIs of pages and API endpoints.
//!
//! For endpoints that take a parameter, e.g., '/children/{child_id}', use [format_endpoint].

/// The root route which redirects to the dashboard, home or log in page.
pub const ROOT: &str = "/";
/// The landing page for parents: a summary of their children.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for managing a single child.
pub const CHILD_VIEW: &str = "/children/{child_id}";
/// The landing page for children: their own balance and history.
pub const HOME_VIEW: &str = "/home";
/// The page for registering a parent account.
pub const REGISTER_PARENT_VIEW: &str = "/register/parent";
/// The page for registering a child account.
pub const REGISTER_CHILD_VIEW: &str = "/register/child";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for instructions for resetting a password.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for creating a parent account.
pub const REGISTER_PARENT_API: &str = "/api/register/parent";
/// The route for creating a child account.
pub const REGISTER_CHILD_API: &str = "/api/register/child";
/// The route for changing a child's allowance.
pub const ALLOWANCE_API: &str = "/api/children/{child_id}/allowance";
/// The route for recording extra earnings for a child.
pub const EARNINGS_API: &str = "/api/children/{child_id}/earnings";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/children/{child_id}', '{child_id}' is
/// the parameter.
///
/// If no parameter is found in `endpoint_path`, the original `endpoint_path`
/// is returned.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
