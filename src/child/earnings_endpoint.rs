//! Defines the endpoint for recording extra earnings, e.g. pocket money for chores.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use serde::Deserialize;

use crate::{
    Error,
    allowance::{add_earnings, reconcile_allowance},
    amount::parse_amount,
    auth::{CurrentUser, UserID},
    child::page::{ChildState, get_child_for_parent},
    endpoints::{self, format_endpoint},
    timezone::get_local_date,
};

/// The form data for recording extra earnings.
#[derive(Debug, Deserialize)]
pub struct EarningsForm {
    /// The amount earned in dollars.
    pub amount: String,
    /// What the money was earned for.
    #[serde(default)]
    pub description: String,
}

/// A route handler for adding extra earnings to a child's balance, redirects
/// to the child's page on success.
pub async fn add_earnings_endpoint(
    State(state): State<ChildState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(child_id): Path<i64>,
    Form(form): Form<EarningsForm>,
) -> Response {
    let amount = match parse_amount(&form.amount) {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let Some(today) = get_local_date(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    // Pay any allowance due first so the history stays in date order.
    let result = get_child_for_parent(current_user, UserID::new(child_id), &connection)
        .and_then(|child| {
            reconcile_allowance(child.id, today, &connection)?;
            add_earnings(child.id, amount, &form.description, today, &connection)
        });

    if let Err(error) = result {
        tracing::error!("could not add earnings for child {child_id}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(format_endpoint(endpoints::CHILD_VIEW, child_id)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
