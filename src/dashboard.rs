//! The parent's landing page: a summary of each of their children.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    AppState, Error,
    allowance::{get_child_snapshot, reconcile_allowance},
    auth::{CurrentUser, Role, get_user_by_id},
    child::{ChildSnapshot, get_children_for_parent, stat_card},
    endpoints::{self, format_endpoint},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, link,
    },
    navigation::NavBar,
    timezone::get_local_date,
};

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

fn children_table(children: &[ChildSnapshot]) -> Markup {
    html! {
        div class="relative w-full overflow-x-auto shadow-md rounded"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                        th scope="col" class="px-6 py-4 text-right" { "Balance" }
                        th scope="col" class="px-6 py-4 text-right" { "Monthly allowance" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Paid on day" }
                    }
                }

                tbody
                {
                    @for child in children {
                        tr class=(TABLE_ROW_STYLE) data-child-id=(child.id)
                        {
                            th scope="row" class="px-6 py-4 font-medium text-gray-900 dark:text-white"
                            {
                                a
                                    href=(format_endpoint(endpoints::CHILD_VIEW, child.id.as_i64()))
                                    class=(LINK_STYLE)
                                {
                                    (child.name)
                                }
                            }
                            td class="px-6 py-4 text-right" { (format_currency(child.balance)) }
                            td class="px-6 py-4 text-right"
                            {
                                (format_currency(child.monthly_allowance))
                            }
                            td class=(TABLE_CELL_STYLE)
                            {
                                @if child.allowance_start_date.is_some() {
                                    (child.allowance_day.get())
                                } @else {
                                    "Paused"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn dashboard_view(children: &[ChildSnapshot], total_balance: Decimal) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, Role::Parent).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Dashboard" }

                @if children.is_empty() {
                    p
                    {
                        "No children have been registered yet. Ask your child to "
                        (link(endpoints::REGISTER_CHILD_VIEW, "create an account"))
                        " with your email address."
                    }
                } @else {
                    (stat_card("Total saved", &format_currency(total_balance)))
                    (children_table(children))
                }
            }
        }
    };

    base("Dashboard", &[], &content)
}

/// Display the logged in parent's children with their balances.
///
/// Any allowance that has fallen due is paid before the page is rendered.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    if !current_user.is_parent() {
        return Err(Error::Forbidden);
    }

    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let parent = get_user_by_id(current_user.id, &connection)?;

    let children = get_children_for_parent(&parent.email, &connection)?
        .into_iter()
        .map(|child| {
            reconcile_allowance(child.id, today, &connection)?;
            get_child_snapshot(child.id, &connection)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let total_balance = children
        .iter()
        .try_fold(Decimal::ZERO, |total, child| total.checked_add(child.balance))
        .ok_or_else(|| Error::InvalidAmount("the total balance is too large".to_owned()))?;

    Ok(dashboard_view(&children, total_balance).into_response())
}

#[cfg(test)]
mod dashboard_route_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use rust_decimal::Decimal;
    use scraper::{ElementRef, Selector};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        allowance::{add_earnings, update_allowance},
        auth::{CurrentUser, Role},
        child::{
            AllowanceSettings,
            test_utils::{PARENT_EMAIL, get_test_connection, must_create_child, must_create_parent},
        },
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
    };

    use super::{DashboardState, get_dashboard_page};

    fn cell_text(row: &ElementRef<'_>, index: usize) -> String {
        row.select(&Selector::parse("th, td").unwrap())
            .nth(index)
            .unwrap_or_else(|| panic!("no cell {index}"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[tokio::test]
    async fn lists_own_children_with_reconciled_balances() {
        let connection = get_test_connection();
        let parent = must_create_parent(PARENT_EMAIL, &connection);
        must_create_parent("other@example.com", &connection);
        let alice = must_create_child("Alice", PARENT_EMAIL, &connection);
        let bob = must_create_child("Bob", PARENT_EMAIL, &connection);
        must_create_child("Carol", "other@example.com", &connection);

        let today = OffsetDateTime::now_utc().date();
        add_earnings(bob.id, Decimal::new(550, 2), "chores", today, &connection).unwrap();
        // Set Alice's allowance as of yesterday so today's payment is only made by the page.
        let settings = AllowanceSettings::new(
            Decimal::from(10),
            today.day().into(),
            Some(today - Duration::days(1)),
        )
        .unwrap();
        update_allowance(alice.id, settings, today - Duration::days(1), &connection).unwrap();

        let state = DashboardState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_dashboard_page(
            State(state),
            Extension(CurrentUser {
                id: parent.id,
                role: Role::Parent,
            }),
        )
        .await
        .unwrap();

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let rows: Vec<_> = document
            .select(&Selector::parse("tr[data-child-id]").unwrap())
            .collect();
        assert_eq!(rows.len(), 2, "want only the parent's own children");

        assert_eq!(cell_text(&rows[0], 0), "Alice");
        assert_eq!(cell_text(&rows[0], 1), "$10.00");
        assert_eq!(cell_text(&rows[0], 2), "$10.00");
        assert_eq!(cell_text(&rows[0], 3), today.day().to_string());

        assert_eq!(cell_text(&rows[1], 0), "Bob");
        assert_eq!(cell_text(&rows[1], 1), "$5.50");
        assert_eq!(cell_text(&rows[1], 3), "Paused");

        let link = rows[0]
            .select(&Selector::parse("a").unwrap())
            .next()
            .expect("no link to child page");
        assert_eq!(
            link.value().attr("href"),
            Some(format!("/children/{}", alice.id).as_str())
        );
    }

    #[tokio::test]
    async fn shows_prompt_without_children() {
        let connection = get_test_connection();
        let parent = must_create_parent(PARENT_EMAIL, &connection);
        let state = DashboardState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_dashboard_page(
            State(state),
            Extension(CurrentUser {
                id: parent.id,
                role: Role::Parent,
            }),
        )
        .await
        .unwrap();

        let document = parse_html_document(response).await;
        let register_link = document
            .select(&Selector::parse("main a[href='/register/child']").unwrap())
            .count();
        assert_eq!(register_link, 1);
    }

    #[tokio::test]
    async fn total_overflow_is_an_error() {
        let connection = get_test_connection();
        let parent = must_create_parent(PARENT_EMAIL, &connection);
        let today = OffsetDateTime::now_utc().date();
        for name in ["Alice", "Bob"] {
            let child = must_create_child(name, PARENT_EMAIL, &connection);
            add_earnings(child.id, Decimal::MAX, "jackpot", today, &connection).unwrap();
        }
        let db_connection = Arc::new(Mutex::new(connection));
        let state = DashboardState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: db_connection.clone(),
        };

        let result = get_dashboard_page(
            State(state),
            Extension(CurrentUser {
                id: parent.id,
                role: Role::Parent,
            }),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        assert!(db_connection.lock().is_ok(), "database lock should not be poisoned");
    }

    #[tokio::test]
    async fn child_is_forbidden() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);
        let state = DashboardState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let result = get_dashboard_page(
            State(state),
            Extension(CurrentUser {
                id: child.id,
                role: Role::Child,
            }),
        )
        .await;

        assert_eq!(result.unwrap_err(), Error::Forbidden);
    }
}
