use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rust_decimal::Decimal;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use piggybank_rs::{
    allowance::update_allowance,
    auth::{NewUser, PasswordHash, Role, ValidatedPassword, create_user},
    child::{AllowanceSettings, create_child},
    initialize_db,
};

const PARENT_EMAIL: &str = "parent@example.com";
const CHILD_EMAIL: &str = "child@example.com";
const PASSWORD: &str = "test";

/// A utility for creating a test database for the piggybank_rs server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test users...");

    let new_user = |name: &str, email: &str, role| -> Result<NewUser, Box<dyn Error>> {
        Ok(NewUser {
            name: name.to_owned(),
            email: email.to_owned(),
            role,
            password_hash: PasswordHash::new(
                ValidatedPassword::new_unchecked(PASSWORD),
                PasswordHash::DEFAULT_COST,
            )?,
        })
    };

    create_user(new_user("Test Parent", PARENT_EMAIL, Role::Parent)?, &conn)?;
    let child_user = create_user(new_user("Test Child", CHILD_EMAIL, Role::Child)?, &conn)?;
    let child = create_child(&child_user, PARENT_EMAIL, &conn)?;

    println!("Setting up an allowance for the last six months...");

    let today = OffsetDateTime::now_utc().date();
    let settings = AllowanceSettings::new(
        Decimal::from(10),
        1,
        Some(today - Duration::days(6 * 30)),
    )?;
    let reconciliation = update_allowance(child.id, settings, today, &conn)?;

    println!(
        "Success! Log in as {PARENT_EMAIL} or {CHILD_EMAIL} with the password \"{PASSWORD}\". \
        The child has been paid {} allowance(s) and has a balance of ${}.",
        reconciliation.entries.len(),
        reconciliation.balance
    );

    Ok(())
}
