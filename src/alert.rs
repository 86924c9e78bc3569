//! Alerts shown at the bottom of the page when an HTMX request fails.

use axum::response::Html;
use maud::{Markup, html};

/// An alert message, swapped into `#alert-container` by HTMX.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Error { message: String, details: String },
}

impl Alert {
    fn into_markup(self) -> Markup {
        let Alert::Error { message, details } = self;

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    role="alert"
                    class="flex items-start gap-3 p-4 rounded-lg shadow border \
                        text-red-800 bg-red-50 border-red-300 \
                        dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
                {
                    div class="flex-1"
                    {
                        p class="font-semibold" { (message) }

                        @if !details.is_empty() {
                            p class="text-sm mt-1" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        class="ms-auto font-bold"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "×"
                    }
                }
            }
        }
    }

    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Html<String> {
        Html(self.into_markup().into_string())
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::Alert;

    #[test]
    fn renders_message_and_details() {
        let alert = Alert::Error {
            message: "Invalid amount".to_owned(),
            details: "Enter a positive amount.".to_owned(),
        };

        let fragment = Html::parse_fragment(&alert.into_html().0);

        let paragraphs: Vec<String> = fragment
            .select(&Selector::parse("div[role=alert] p").unwrap())
            .map(|p| p.text().collect())
            .collect();
        assert_eq!(paragraphs, ["Invalid amount", "Enter a positive amount."]);
    }

    #[test]
    fn omits_empty_details() {
        let alert = Alert::Error {
            message: "Something went wrong".to_owned(),
            details: String::new(),
        };

        let fragment = Html::parse_fragment(&alert.into_html().0);

        let count = fragment.select(&Selector::parse("p").unwrap()).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn swaps_into_alert_container() {
        let alert = Alert::Error {
            message: "Oops".to_owned(),
            details: String::new(),
        };

        let fragment = Html::parse_fragment(&alert.into_html().0);

        let container = fragment
            .select(&Selector::parse("#alert-container").unwrap())
            .next()
            .expect("alert container missing");
        assert_eq!(container.value().attr("hx-swap-oob"), Some("true"));
    }
}
