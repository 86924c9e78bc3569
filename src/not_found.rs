//! The 404 page.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// Renders the page shown for unknown routes and missing resources.
pub struct NotFoundError;

impl NotFoundError {
    pub fn into_html(self) -> Html<String> {
        Html(
            error_view(
                "Not Found",
                "404",
                "Page not found.",
                "Sorry, we can't find that page. Check the link or go back home.",
            )
            .into_string(),
        )
    }
}

impl IntoResponse for NotFoundError {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, self.into_html()).into_response()
    }
}

/// Fallback handler for routes that do not exist.
pub async fn get_404_not_found() -> Response {
    NotFoundError.into_response()
}
