//! The child's landing page: their own balance, allowance and recent history.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    allowance::{get_earnings_history, reconcile_allowance},
    auth::{CurrentUser, Role},
    child::{Child, get_child, history_table, stat_card},
    endpoints,
    html::{CARD_STYLE, PAGE_CONTAINER_STYLE, base, format_currency},
    ledger::LedgerEntry,
    navigation::NavBar,
    timezone::get_local_date,
};

/// How many ledger entries are shown on the home page.
const RECENT_HISTORY_LENGTH: usize = 20;

/// The state needed for the home page.
#[derive(Debug, Clone)]
pub struct HomeState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for HomeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

fn allowance_summary(child: &Child) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { "Allowance" }

            @match child.allowance_start_date {
                Some(_) => {
                    p class="text-lg" data-allowance
                    {
                        (format_currency(child.monthly_allowance))
                        " on day " (child.allowance_day.get()) " of each month"
                    }
                }
                None => {
                    p class="text-lg" data-allowance { "No allowance yet" }
                }
            }
        }
    }
}

fn home_view(child: &Child, history: &[LedgerEntry]) -> Markup {
    let nav_bar = NavBar::new(endpoints::HOME_VIEW, Role::Child).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Hi " (child.name) "!" }

                div class="grid grid-cols-1 gap-4 sm:grid-cols-2"
                {
                    (stat_card("Balance", &format_currency(child.balance)))
                    (allowance_summary(child))
                }

                h2 class="text-xl font-bold" { "Recent history" }
                (history_table(history))
            }
        }
    };

    base("My Piggybank", &[], &content)
}

/// Display the logged in child's balance and recent history.
///
/// Parents are sent to their dashboard instead.
pub async fn get_home_page(
    State(state): State<HomeState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    if current_user.is_parent() {
        return Ok(Redirect::to(endpoints::DASHBOARD_VIEW).into_response());
    }

    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    reconcile_allowance(current_user.id, today, &connection)?;
    let child = get_child(current_user.id, &connection)?;
    let mut history = get_earnings_history(child.id, &connection)?;
    history.truncate(RECENT_HISTORY_LENGTH);

    Ok(home_view(&child, &history).into_response())
}
