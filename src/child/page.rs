//! The page where a parent manages one child's allowance and earnings.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    allowance::{get_earnings_history, reconcile_allowance},
    auth::{CurrentUser, Role, UserID, get_user_by_id},
    child::{Child, get_child, get_child_for_user},
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, CARD_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        dollar_input_styles, format_currency, submit_button,
    },
    ledger::LedgerEntry,
    navigation::NavBar,
    timezone::get_local_date,
};

/// The state needed by the child page and the endpoints that change a child.
#[derive(Debug, Clone)]
pub struct ChildState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChildState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Get the child with `child_id` if `current_user` is their parent.
///
/// # Errors
/// Returns:
/// - [Error::Forbidden] if `current_user` is a child.
/// - [Error::NotFound] if the child does not exist or belongs to another parent.
pub(super) fn get_child_for_parent(
    current_user: CurrentUser,
    child_id: UserID,
    connection: &Connection,
) -> Result<Child, Error> {
    if !current_user.is_parent() {
        return Err(Error::Forbidden);
    }

    let parent = get_user_by_id(current_user.id, connection)?;

    get_child_for_user(child_id, &parent, connection)
}

/// A table of ledger entries, newest first.
///
/// Shared with the child's own home page.
pub fn history_table(entries: &[LedgerEntry]) -> Markup {
    html! {
        div class="relative w-full overflow-x-auto shadow-md rounded"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Kind" }
                        th scope="col" class="px-6 py-4 text-right" { "Amount" }
                    }
                }

                tbody
                {
                    @for entry in entries {
                        tr class=(TABLE_ROW_STYLE) data-entry-id=(entry.id)
                        {
                            td class=(TABLE_CELL_STYLE) { (entry.date) }
                            td class=(TABLE_CELL_STYLE) { (entry.description) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                span class=(BADGE_STYLE) { (entry.kind) }
                            }
                            td class="px-6 py-4 text-right" { (format_currency(entry.amount)) }
                        }
                    }

                    @if entries.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="4" class="px-6 py-4 text-center"
                            {
                                "Nothing has been paid in yet."
                            }
                        }
                    }
                }
            }
        }
    }
}

/// A headline figure, such as the balance.
pub fn stat_card(label: &str, value: &str) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class="text-3xl font-bold" data-stat=(label) { (value) }
        }
    }
}

fn allowance_form(child: &Child) -> Markup {
    let endpoint = format_endpoint(endpoints::ALLOWANCE_API, child.id.as_i64());
    let start_date = child
        .allowance_start_date
        .map(|date| date.to_string())
        .unwrap_or_default();

    html! {
        form
            hx-post=(endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Allowance" }

            div
            {
                label for="monthly_allowance" class=(FORM_LABEL_STYLE) { "Monthly allowance" }
                div class="input-wrapper w-full"
                {
                    input
                        type="number"
                        name="monthly_allowance"
                        id="monthly_allowance"
                        min="0"
                        step="0.01"
                        required
                        value=(child.monthly_allowance)
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="allowance_day" class=(FORM_LABEL_STYLE) { "Day of the month it is paid" }
                input
                    type="number"
                    name="allowance_day"
                    id="allowance_day"
                    min="1"
                    max="31"
                    step="1"
                    required
                    value=(child.allowance_day.get())
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "Pay allowance after" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=(start_date)
                    class=(FORM_TEXT_INPUT_STYLE);
                p class="mt-1 text-sm text-gray-500 dark:text-gray-400"
                {
                    "Leave blank to pause the allowance. Changing the amount does not
                    change payments that have already been made."
                }
            }

            (submit_button("Save allowance"))
        }
    }
}

fn earnings_form(child: &Child) -> Markup {
    let endpoint = format_endpoint(endpoints::EARNINGS_API, child.id.as_i64());

    html! {
        form
            hx-post=(endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Extra earnings" }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                div class="input-wrapper w-full"
                {
                    input
                        type="number"
                        name="amount"
                        id="amount"
                        min="0.01"
                        step="0.01"
                        required
                        placeholder="0.00"
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "What was it for?" }
                input
                    type="text"
                    name="description"
                    id="description"
                    placeholder="Mowing the lawn"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button
                type="submit"
                class="w-full px-4 py-2 bg-green-600 hover:bg-green-700 text-white rounded"
            {
                "Add earnings"
            }
        }
    }
}

fn child_view(child: &Child, history: &[LedgerEntry]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CHILD_VIEW, Role::Parent).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-6"
            {
                h1 class="text-2xl font-bold" { (child.name) }

                div class="grid grid-cols-1 gap-4 sm:grid-cols-2"
                {
                    (stat_card("Balance", &format_currency(child.balance)))
                    (stat_card("Monthly allowance", &format_currency(child.monthly_allowance)))
                }

                div class="grid grid-cols-1 gap-6 lg:grid-cols-2"
                {
                    div class=(FORM_CONTAINER_STYLE) { (allowance_form(child)) }
                    div class=(FORM_CONTAINER_STYLE) { (earnings_form(child)) }
                }

                h2 class="text-xl font-bold" { "History" }
                (history_table(history))
            }
        }
    };

    base(&child.name, &[dollar_input_styles()], &content)
}

/// Display a child's balance, allowance settings and history to their parent.
///
/// Any allowance that has fallen due is paid before the page is rendered.
pub async fn get_child_page(
    State(state): State<ChildState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(child_id): Path<i64>,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let child = get_child_for_parent(current_user, UserID::new(child_id), &connection)?;
    reconcile_allowance(child.id, today, &connection)?;
    let child = get_child(child.id, &connection)?;
    let history = get_earnings_history(child.id, &connection)?;

    Ok(child_view(&child, &history).into_response())
}
