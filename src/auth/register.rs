//! The registration pages for parents and children.
//!
//! A child registers with their parent's email, which links the child to the
//! parent. The parent must already have an account.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{
        NewUser, PasswordHash, Role, User, ValidatedPassword, create_user, get_user_by_email,
        normalize_email, password::PASSWORD_MIN_LENGTH,
    },
    child::create_child,
    endpoints,
    html::{
        FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, labelled_input,
        log_in_register, password_input, submit_button,
    },
};

const PARENT_NOT_FOUND_MSG: &str = "No parent has registered with that email.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered in a registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// For a child, the email of their parent. Ignored for parents.
    pub related_email: Option<String>,
}

/// Error messages to show next to the fields of the registration form.
#[derive(Debug, Default)]
struct FieldErrors {
    name: Option<String>,
    email: Option<String>,
    related_email: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
}

fn confirm_password_input(error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label for="confirm-password" class=(FORM_LABEL_STYLE) { "Confirm Password" }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(PASSWORD_MIN_LENGTH)
                autofocus[error_message.is_some()];

            @if let Some(error_message) = error_message
            {
                p class=(FORM_ERROR_STYLE) { (error_message) }
            }
        }
    }
}

fn registration_form(role: Role, form: &RegisterForm, errors: &FieldErrors) -> Markup {
    let endpoint = match role {
        Role::Parent => endpoints::REGISTER_PARENT_API,
        Role::Child => endpoints::REGISTER_CHILD_API,
    };

    html! {
        form
            hx-post=(endpoint)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (labelled_input("name", "Name", "text", &form.name, errors.name.as_deref()))
            (labelled_input("email", "Email", "email", &form.email, errors.email.as_deref()))

            @if role == Role::Child {
                (labelled_input(
                    "related_email",
                    "Parent's email",
                    "email",
                    form.related_email.as_deref().unwrap_or_default(),
                    errors.related_email.as_deref(),
                ))
            }

            (password_input("", PASSWORD_MIN_LENGTH, errors.password.as_deref()))
            (confirm_password_input(errors.confirm_password.as_deref()))

            (submit_button("Create account"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

fn registration_page(role: Role) -> Response {
    let title = match role {
        Role::Parent => "Create a parent account",
        Role::Child => "Create a child account",
    };
    let form = registration_form(role, &RegisterForm::default(), &FieldErrors::default());

    base("Register", &[], &log_in_register(title, &form)).into_response()
}

/// Display the registration page for parents.
pub async fn get_register_parent_page() -> Response {
    registration_page(Role::Parent)
}

/// Display the registration page for children.
pub async fn get_register_child_page() -> Response {
    registration_page(Role::Child)
}

/// Create a parent account and redirect to the log-in page.
pub async fn register_parent(
    State(state): State<RegistrationState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    register(Role::Parent, &state, form)
}

/// Create a child account linked to an existing parent and redirect to the
/// log-in page.
pub async fn register_child(
    State(state): State<RegistrationState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    register(Role::Child, &state, form)
}

fn register(role: Role, state: &RegistrationState, form: RegisterForm) -> Response {
    let render_errors =
        |errors: FieldErrors| registration_form(role, &form, &errors).into_response();

    let name = form.name.trim();
    if name.is_empty() {
        return render_errors(FieldErrors {
            name: Some(Error::EmptyName.to_string()),
            ..Default::default()
        });
    }

    let email = match normalize_email(&form.email) {
        Ok(email) => email,
        Err(error) => {
            return render_errors(FieldErrors {
                email: Some(error.to_string()),
                ..Default::default()
            });
        }
    };

    let parent_email = match role {
        Role::Parent => None,
        Role::Child => match normalize_email(form.related_email.as_deref().unwrap_or_default()) {
            Ok(parent_email) => Some(parent_email),
            Err(error) => {
                return render_errors(FieldErrors {
                    related_email: Some(error.to_string()),
                    ..Default::default()
                });
            }
        },
    };

    let validated_password = match ValidatedPassword::new(&form.password, &[name, email.as_str()]) {
        Ok(password) => password,
        Err(error) => {
            return render_errors(FieldErrors {
                password: Some(error.to_string()),
                ..Default::default()
            });
        }
    };

    if form.password != form.confirm_password {
        return render_errors(FieldErrors {
            confirm_password: Some("Passwords do not match".to_owned()),
            ..Default::default()
        });
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return render_errors(FieldErrors {
                password: Some(INTERNAL_ERROR_MSG.to_owned()),
                ..Default::default()
            });
        }
    };

    let new_user = NewUser {
        name: name.to_owned(),
        email,
        role,
        password_hash,
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => insert_account(new_user, parent_email.as_deref(), &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(user) => {
            tracing::info!("registered {} account for {}", user.role.as_str(), user.email);
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(Error::DuplicateEmail) => render_errors(FieldErrors {
            email: Some(Error::DuplicateEmail.to_string()),
            ..Default::default()
        }),
        Err(Error::NotFound) => render_errors(FieldErrors {
            related_email: Some(PARENT_NOT_FOUND_MSG.to_owned()),
            ..Default::default()
        }),
        Err(error) => {
            tracing::error!("an unhandled error occurred while registering a user: {error}");
            render_errors(FieldErrors {
                email: Some(INTERNAL_ERROR_MSG.to_owned()),
                ..Default::default()
            })
        }
    }
}

/// Insert the user and, for a child, their child record in one transaction.
///
/// # Errors
/// Returns [Error::NotFound] if `parent_email` does not belong to a parent.
fn insert_account(
    new_user: NewUser,
    parent_email: Option<&str>,
    connection: &Connection,
) -> Result<User, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    if let Some(parent_email) = parent_email {
        let parent = get_user_by_email(parent_email, &transaction)?;
        if parent.role != Role::Parent {
            return Err(Error::NotFound);
        }
    }

    let user = create_user(new_user, &transaction)?;

    if let Some(parent_email) = parent_email {
        create_child(&user, parent_email, &transaction)?;
    }

    transaction.commit()?;

    Ok(user)
}
