use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    amount::{get_decimal, to_sql_text},
    auth::{Role, User, UserID},
};

/// The day of the month on which a child's allowance is paid.
///
/// Days past the end of a short month are paid on the last day of that month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AllowanceDay(u8);

impl AllowanceDay {
    /// Create an allowance day, checking that it is between 1 and 31.
    ///
    /// # Errors
    /// Returns [Error::InvalidAllowanceDay] if `day` is not between 1 and 31.
    pub fn new(day: i64) -> Result<Self, Error> {
        match u8::try_from(day) {
            Ok(day) if (1..=31).contains(&day) => Ok(Self(day)),
            _ => Err(Error::InvalidAllowanceDay(day)),
        }
    }

    /// The day of the month as a number between 1 and 31.
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for AllowanceDay {
    fn default() -> Self {
        Self(1)
    }
}

/// The parameters that control how a child's monthly allowance is paid.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowanceSettings {
    /// The amount paid each month.
    pub monthly_allowance: Decimal,
    /// The day of the month the allowance is paid on.
    pub allowance_day: AllowanceDay,
    /// The date the allowance starts accruing from. No allowance is paid
    /// while this is `None`.
    pub start_date: Option<Date>,
}

impl AllowanceSettings {
    /// Validate and create allowance settings.
    ///
    /// # Errors
    /// Returns:
    /// - [Error::InvalidAmount] if `monthly_allowance` is negative.
    /// - [Error::InvalidAllowanceDay] if `allowance_day` is not between 1 and 31.
    pub fn new(
        monthly_allowance: Decimal,
        allowance_day: i64,
        start_date: Option<Date>,
    ) -> Result<Self, Error> {
        if monthly_allowance.is_sign_negative() && !monthly_allowance.is_zero() {
            return Err(Error::InvalidAmount(format!(
                "the monthly allowance cannot be negative, got {monthly_allowance}"
            )));
        }

        Ok(Self {
            monthly_allowance,
            allowance_day: AllowanceDay::new(allowance_day)?,
            start_date,
        })
    }
}

/// A child and the state of their allowance.
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    /// The child's user ID.
    pub id: UserID,
    /// The child's display name.
    pub name: String,
    /// The email of the parent that manages this child.
    pub parent_email: String,
    /// The amount paid each month.
    pub monthly_allowance: Decimal,
    /// The day of the month the allowance is paid on.
    pub allowance_day: AllowanceDay,
    /// The date the allowance starts accruing from.
    pub allowance_start_date: Option<Date>,
    /// The running total of the child's ledger.
    pub balance: Decimal,
}

/// The summary of a child shown on the dashboard and home pages.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSnapshot {
    pub id: UserID,
    pub name: String,
    pub balance: Decimal,
    pub monthly_allowance: Decimal,
    pub allowance_day: AllowanceDay,
    pub allowance_start_date: Option<Date>,
}

impl From<Child> for ChildSnapshot {
    fn from(child: Child) -> Self {
        Self {
            id: child.id,
            name: child.name,
            balance: child.balance,
            monthly_allowance: child.monthly_allowance,
            allowance_day: child.allowance_day,
            allowance_start_date: child.allowance_start_date,
        }
    }
}

pub fn create_child_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS child (
            id INTEGER PRIMARY KEY REFERENCES user(id),
            parent_email TEXT NOT NULL,
            monthly_allowance TEXT NOT NULL DEFAULT '0',
            allowance_day INTEGER NOT NULL DEFAULT 1 CHECK (allowance_day BETWEEN 1 AND 31),
            allowance_start_date TEXT,
            balance TEXT NOT NULL DEFAULT '0'
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_child_parent_email ON child(parent_email)",
        (),
    )?;

    Ok(())
}

/// Add the child record for `user`, linking them to the parent with `parent_email`.
///
/// The child starts with a zero balance and no allowance.
///
/// # Errors
/// Returns [Error::Forbidden] if `user` is not a child, or [Error::SqlError]
/// if the child record could not be inserted.
pub fn create_child(user: &User, parent_email: &str, connection: &Connection) -> Result<Child, Error> {
    if user.role != Role::Child {
        return Err(Error::Forbidden);
    }

    connection.execute(
        "INSERT INTO child (id, parent_email) VALUES (?1, ?2)",
        (user.id.as_i64(), parent_email),
    )?;

    Ok(Child {
        id: user.id,
        name: user.name.clone(),
        parent_email: parent_email.to_owned(),
        monthly_allowance: Decimal::ZERO,
        allowance_day: AllowanceDay::default(),
        allowance_start_date: None,
        balance: Decimal::ZERO,
    })
}

const SELECT_CHILD: &str = "SELECT child.id, user.name, child.parent_email, \
    child.monthly_allowance, child.allowance_day, child.allowance_start_date, child.balance \
    FROM child INNER JOIN user ON user.id = child.id";

fn map_row_to_child(row: &Row) -> Result<Child, rusqlite::Error> {
    let raw_day: i64 = row.get(4)?;
    let allowance_day = AllowanceDay::new(raw_day).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Integer,
            Box::new(error),
        )
    })?;

    Ok(Child {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        parent_email: row.get(2)?,
        monthly_allowance: get_decimal(row, 3)?,
        allowance_day,
        allowance_start_date: row.get(5)?,
        balance: get_decimal(row, 6)?,
    })
}

/// Get the child with `child_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no child with `child_id`.
pub fn get_child(child_id: UserID, connection: &Connection) -> Result<Child, Error> {
    connection
        .prepare(&format!("{SELECT_CHILD} WHERE child.id = :id"))?
        .query_row(&[(":id", &child_id.as_i64())], map_row_to_child)
        .map_err(|error| error.into())
}

/// Get the children registered to the parent with `parent_email`, ordered by name.
pub fn get_children_for_parent(
    parent_email: &str,
    connection: &Connection,
) -> Result<Vec<Child>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CHILD} WHERE child.parent_email = :parent_email ORDER BY user.name, child.id"
        ))?
        .query_map(&[(":parent_email", &parent_email)], map_row_to_child)?
        .map(|maybe_child| maybe_child.map_err(Error::from))
        .collect()
}

/// Get the child with `child_id` on behalf of `user`.
///
/// Parents may only see their own children and children may only see themselves.
///
/// # Errors
/// Returns [Error::NotFound] if the child does not exist or `user` may not see them.
pub fn get_child_for_user(
    child_id: UserID,
    user: &User,
    connection: &Connection,
) -> Result<Child, Error> {
    let child = get_child(child_id, connection)?;

    let can_view = match user.role {
        Role::Parent => child.parent_email == user.email,
        Role::Child => child.id == user.id,
    };

    if can_view { Ok(child) } else { Err(Error::NotFound) }
}

/// Store new allowance settings for the child with `child_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no child with `child_id`.
pub fn set_allowance_settings(
    child_id: UserID,
    settings: &AllowanceSettings,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE child SET monthly_allowance = ?1, allowance_day = ?2, allowance_start_date = ?3
        WHERE id = ?4",
        (
            to_sql_text(settings.monthly_allowance),
            settings.allowance_day.get(),
            settings.start_date,
            child_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Add `amount` to the cached balance of the child with `child_id` and return
/// the new balance.
///
/// Callers should run this in the same transaction as the ledger insert so
/// that the balance and the ledger stay in step.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if there is no child with `child_id`.
/// - [Error::InvalidAmount] if the new balance is too large to represent.
pub fn increment_balance(
    child_id: UserID,
    amount: Decimal,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let balance = connection.query_row(
        "SELECT balance FROM child WHERE id = ?1",
        (child_id.as_i64(),),
        |row| get_decimal(row, 0),
    )?;

    let new_balance = balance.checked_add(amount).ok_or_else(|| {
        Error::InvalidAmount(format!("adding {amount} to the balance of {balance} overflows"))
    })?;

    connection.execute(
        "UPDATE child SET balance = ?1 WHERE id = ?2",
        (to_sql_text(new_balance), child_id.as_i64()),
    )?;

    Ok(new_balance)
}

/// Get the name, balance and allowance of the child with `child_id`.
///
/// This does not pay any missed allowance, use
/// [reconcile_allowance](crate::allowance::reconcile_allowance) first for an
/// up to date balance.
///
/// # Errors
/// Returns [Error::NotFound] if there is no child with `child_id`.
pub fn get_child_snapshot(child_id: UserID, connection: &Connection) -> Result<ChildSnapshot, Error> {
    get_child(child_id, connection).map(ChildSnapshot::from)
}




#[cfg(test)]
mod child_query_tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error,
        auth::{UserID, get_user_by_id},
        child::{
            AllowanceSettings, create_child, get_child, get_child_for_user,
            get_children_for_parent, increment_balance, set_allowance_settings,
        },
    };

    use super::test_utils::{
        PARENT_EMAIL, get_test_connection, must_create_child, must_create_parent,
    };

    #[test]
    fn new_child_has_zero_balance_and_no_allowance() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);

        let child = must_create_child("Alice", PARENT_EMAIL, &connection);

        let got = get_child(child.id, &connection).unwrap();
        assert_eq!(got, child);
        assert_eq!(got.balance, Decimal::ZERO);
        assert_eq!(got.allowance_start_date, None);
    }

    #[test]
    fn create_child_rejects_parent_user() {
        let connection = get_test_connection();
        let parent = must_create_parent(PARENT_EMAIL, &connection);

        let result = create_child(&parent, PARENT_EMAIL, &connection);

        assert_eq!(result, Err(Error::Forbidden));
    }

    #[test]
    fn get_child_fails_for_missing_child() {
        let connection = get_test_connection();

        assert_eq!(get_child(UserID::new(99), &connection), Err(Error::NotFound));
    }

    #[test]
    fn get_child_fails_for_parent_id() {
        let connection = get_test_connection();
        let parent = must_create_parent(PARENT_EMAIL, &connection);

        assert_eq!(get_child(parent.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn children_are_filtered_by_parent() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        must_create_parent("other@example.com", &connection);
        let bob = must_create_child("Bob", PARENT_EMAIL, &connection);
        let alice = must_create_child("Alice", PARENT_EMAIL, &connection);
        must_create_child("Carol", "other@example.com", &connection);

        let children = get_children_for_parent(PARENT_EMAIL, &connection).unwrap();

        assert_eq!(children, vec![alice, bob]);
    }

    #[test]
    fn other_parents_cannot_see_child() {
        let connection = get_test_connection();
        let parent = must_create_parent(PARENT_EMAIL, &connection);
        let other_parent = must_create_parent("other@example.com", &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);

        assert_eq!(
            get_child_for_user(child.id, &parent, &connection),
            Ok(child.clone())
        );
        assert_eq!(
            get_child_for_user(child.id, &other_parent, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn children_can_only_see_themselves() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let alice = must_create_child("Alice", PARENT_EMAIL, &connection);
        let bob = must_create_child("Bob", PARENT_EMAIL, &connection);
        let alice_user = get_user_by_id(alice.id, &connection).unwrap();

        assert_eq!(
            get_child_for_user(alice.id, &alice_user, &connection),
            Ok(alice)
        );
        assert_eq!(
            get_child_for_user(bob.id, &alice_user, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn set_allowance_settings_persists_values() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);
        let settings =
            AllowanceSettings::new(Decimal::new(1050, 2), 31, Some(date!(2023 - 01 - 15))).unwrap();

        set_allowance_settings(child.id, &settings, &connection).unwrap();

        let got = get_child(child.id, &connection).unwrap();
        assert_eq!(got.monthly_allowance, Decimal::new(105, 1));
        assert_eq!(got.allowance_day, settings.allowance_day);
        assert_eq!(got.allowance_start_date, Some(date!(2023 - 01 - 15)));
    }

    #[test]
    fn set_allowance_settings_fails_for_missing_child() {
        let connection = get_test_connection();
        let settings = AllowanceSettings::new(Decimal::TEN, 1, None).unwrap();

        let result = set_allowance_settings(UserID::new(42), &settings, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn increment_balance_adds_exactly() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);

        increment_balance(child.id, Decimal::new(1, 1), &connection).unwrap();
        let balance = increment_balance(child.id, Decimal::new(2, 1), &connection).unwrap();

        assert_eq!(balance, Decimal::new(3, 1));
        assert_eq!(get_child(child.id, &connection).unwrap().balance, Decimal::new(3, 1));
    }
}
