//! Explains how to reset a forgotten password.
//!
//! There is no email delivery, so passwords are reset by whoever runs the
//! server with the `reset_password` program.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

use crate::{
    endpoints,
    html::{base, link, log_in_register},
};

fn forgot_password_content() -> Markup {
    let instructions = html! {
        div class="space-y-4 text-gray-900 dark:text-white"
        {
            p class="text-justify"
            {
                "Ask the person who runs Piggybank to reset it for you. They can do
                this from the directory the server runs in with:"
            }

            pre class="p-3 overflow-x-auto text-sm rounded bg-gray-100 dark:bg-gray-700"
            {
                code { "reset_password --db-path <database file> --email <your email>" }
            }

            p class="text-justify"
            {
                "Parents can reset the password of their children the same way, using the
                email the child registered with."
            }

            p { (link(endpoints::LOG_IN_VIEW, "Back to log in")) }
        }
    };

    base(
        "Forgot Password",
        &[],
        &log_in_register("Forgot your password?", &instructions),
    )
}

/// Renders a page describing how the user's password can be reset.
pub async fn get_forgot_password_page() -> Response {
    forgot_password_content().into_response()
}
