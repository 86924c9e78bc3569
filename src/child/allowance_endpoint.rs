//! Defines the endpoint for changing a child's allowance.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::{
    Error,
    allowance::update_allowance,
    amount::parse_amount,
    auth::{CurrentUser, UserID},
    child::{AllowanceSettings, page::ChildState, page::get_child_for_parent},
    endpoints::{self, format_endpoint},
    timezone::get_local_date,
};

/// The form data for changing a child's allowance.
///
/// Fields are kept as strings so that bad input is reported as an alert
/// rather than a bare 422 response.
#[derive(Debug, Deserialize)]
pub struct AllowanceForm {
    /// The amount paid each month in dollars.
    pub monthly_allowance: String,
    /// The day of the month the allowance is paid on.
    pub allowance_day: String,
    /// The date after which the allowance starts, formatted as YYYY-MM-DD.
    /// Blank pauses the allowance.
    #[serde(default)]
    pub start_date: String,
}

impl AllowanceForm {
    fn parse(&self) -> Result<AllowanceSettings, Error> {
        let monthly_allowance = parse_amount(&self.monthly_allowance)?;

        let allowance_day = self
            .allowance_day
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::InvalidAllowanceDay(0))?;

        let start_date = match self.start_date.trim() {
            "" => None,
            raw_date => Some(parse_date(raw_date)?),
        };

        AllowanceSettings::new(monthly_allowance, allowance_day, start_date)
    }
}

fn parse_date(raw_date: &str) -> Result<Date, Error> {
    Date::parse(raw_date, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDate(raw_date.to_owned()))
}

/// A route handler for changing a child's allowance and paying anything
/// that has become due, redirects to the child's page on success.
pub async fn update_allowance_endpoint(
    State(state): State<ChildState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(child_id): Path<i64>,
    Form(form): Form<AllowanceForm>,
) -> Response {
    let settings = match form.parse() {
        Ok(settings) => settings,
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

    let result = get_child_for_parent(current_user, UserID::new(child_id), &connection)
        .and_then(|child| update_allowance(child.id, settings, today, &connection));

    if let Err(error) = result {
        tracing::error!("could not update allowance for child {child_id}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(format_endpoint(endpoints::CHILD_VIEW, child_id)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
