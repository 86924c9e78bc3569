//! The token stored in the private auth cookie.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::{Role, UserID};

mod expiry_format {
    //! Serializes the expiry as "2021-01-01 00:00:00.0 +00:00:00".
    //!
    //! The default format for [time::OffsetDateTime] writes midnight with a
    //! single digit hour, which it then fails to parse.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    const EXPIRY_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S: Serializer>(
        expires_at: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let formatted = expires_at
            .format(EXPIRY_FORMAT)
            .map_err(serde::ser::Error::custom)?;

        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;

        OffsetDateTime::parse(&raw, EXPIRY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Identifies a logged in user and when their session ends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: UserID,
    pub role: Role,
    #[serde(with = "expiry_format")]
    pub expires_at: OffsetDateTime,
}
