//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::PrivateCookieJar;
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_forgot_password_page, get_log_in_page, get_log_out,
        get_register_child_page, get_register_parent_page, get_token_from_cookies, landing_page,
        post_log_in, register_child, register_parent,
    },
    child::{add_earnings_endpoint, get_child_page, update_allowance_endpoint},
    dashboard::get_dashboard_page,
    endpoints,
    home::get_home_page,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_PARENT_VIEW, get(get_register_parent_page))
        .route(endpoints::REGISTER_CHILD_VIEW, get(get_register_child_page))
        .route(endpoints::REGISTER_PARENT_API, post(register_parent))
        .route(endpoints::REGISTER_CHILD_API, post(register_child))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::HOME_VIEW, get(get_home_page))
        .route(endpoints::CHILD_VIEW, get(get_child_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::ALLOWANCE_API, post(update_allowance_endpoint))
            .route(endpoints::EARNINGS_API, post(add_earnings_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the landing page for the logged in user's
/// role, or to the log-in page.
async fn get_index_page(jar: PrivateCookieJar) -> Redirect {
    match get_token_from_cookies(&jar) {
        Ok(token) => Redirect::to(landing_page(token.role)),
        Err(_) => Redirect::to(endpoints::LOG_IN_VIEW),
    }
}
