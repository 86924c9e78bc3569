//! Stores the session [Token] in an encrypted, private cookie.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    auth::{Role, UserID, token::Token},
};

/// The name of the cookie that holds the serialized [Token].
pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Add an auth cookie to the cookie jar, indicating that a user is logged in.
///
/// The cookie expires `duration` from now. The expiry is stored in the
/// token with `local_offset` so it reads correctly in the logs.
///
/// # Errors
/// Returns [Error::InvalidDateFormat] if the expiry overflows or the token
/// cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    role: Role,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = OffsetDateTime::now_utc()
        .to_offset(local_offset)
        .checked_add(duration)
        .ok_or_else(|| Error::InvalidDateFormat(format!("now + {duration} overflowed")))?;

    let token = Token {
        user_id,
        role,
        expires_at,
    };

    set_token_cookie(jar, &token)
}

fn set_token_cookie(jar: PrivateCookieJar, token: &Token) -> Result<PrivateCookieJar, Error> {
    let value =
        serde_json::to_string(token).map_err(|error| Error::InvalidDateFormat(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, value))
            .path("/")
            .expires(token.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Overwrite the auth cookie with an expired one so the browser deletes it.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Push the expiry of the auth cookie out to at least `duration` from now.
///
/// Sessions that already last longer, e.g. "remember me" log-ins, are left
/// alone.
///
/// # Errors
/// The cookie jar is not modified if an error is returned.
///
/// Returns:
/// - [Error::CookieMissing] if there is no auth cookie.
/// - [Error::InvalidToken] if the auth cookie cannot be decoded.
/// - [Error::InvalidDateFormat] if the new expiry overflows.
pub fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = decode_token(&jar)?;

    let new_expiry = OffsetDateTime::now_utc()
        .to_offset(local_offset)
        .checked_add(duration)
        .ok_or_else(|| Error::InvalidDateFormat(format!("now + {duration} overflowed")))?;

    let token = Token {
        expires_at: max(token.expires_at, new_expiry),
        ..token
    };

    set_token_cookie(jar, &token)
}

/// Get the session token from the auth cookie.
///
/// # Errors
/// Returns:
/// - [Error::CookieMissing] if there is no auth cookie.
/// - [Error::InvalidToken] if the auth cookie cannot be decoded or has expired.
pub fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let token = decode_token(jar)?;

    if token.expires_at <= OffsetDateTime::now_utc() {
        return Err(Error::InvalidToken(format!(
            "token expired at {}",
            token.expires_at
        )));
    }

    Ok(token)
}

fn decode_token(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;

    serde_json::from_str(cookie.value_trimmed())
        .map_err(|error| Error::InvalidToken(error.to_string()))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime, UtcOffset};

    use crate::{
        Error,
        auth::{Role, UserID, token::Token},
    };

    use super::{
        COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
        get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie, set_token_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"piggybank-cookie-tests");
        PrivateCookieJar::new(Key::from(&hash))
    }

    fn must_set_cookie(duration: Duration) -> PrivateCookieJar {
        set_auth_cookie(
            get_jar(),
            UserID::new(7),
            Role::Child,
            duration,
            UtcOffset::UTC,
        )
        .unwrap()
    }

    #[test]
    fn set_cookie_stores_user_and_role() {
        let jar = must_set_cookie(DEFAULT_COOKIE_DURATION);

        let token = get_token_from_cookies(&jar).unwrap();

        assert_eq!(token.user_id, UserID::new(7));
        assert_eq!(token.role, Role::Child);
    }

    #[test]
    fn set_cookie_has_secure_attributes() {
        let jar = must_set_cookie(DEFAULT_COOKIE_DURATION);

        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn set_cookie_expiry_matches_duration() {
        let before = OffsetDateTime::now_utc();

        let jar = must_set_cookie(Duration::minutes(10));

        let token = get_token_from_cookies(&jar).unwrap();
        let expires_in = token.expires_at - before;
        assert!(
            expires_in >= Duration::minutes(10) && expires_in < Duration::minutes(11),
            "got expiry {expires_in} from now, want 10 minutes"
        );
    }

    #[test]
    fn get_token_fails_without_cookie() {
        let result = get_token_from_cookies(&get_jar());

        assert_eq!(result, Err(Error::CookieMissing));
    }

    #[test]
    fn get_token_fails_for_garbage_cookie() {
        let jar = get_jar().add(Cookie::new(COOKIE_TOKEN, "not json"));

        let result = get_token_from_cookies(&jar);

        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[test]
    fn get_token_fails_for_expired_token() {
        let token = Token {
            user_id: UserID::new(1),
            role: Role::Parent,
            expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
        };
        let jar = set_token_cookie(get_jar(), &token).unwrap();

        let result = get_token_from_cookies(&jar);

        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[test]
    fn invalidate_cookie_deletes_token() {
        let jar = must_set_cookie(DEFAULT_COOKIE_DURATION);

        let jar = invalidate_auth_cookie(jar);

        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert!(get_token_from_cookies(&jar).is_err());
    }

    #[test]
    fn extend_cookie_pushes_out_short_expiry() {
        let jar = must_set_cookie(Duration::seconds(30));

        let jar =
            extend_auth_cookie_duration_if_needed(jar, Duration::minutes(5), UtcOffset::UTC)
                .unwrap();

        let token = get_token_from_cookies(&jar).unwrap();
        assert!(token.expires_at - OffsetDateTime::now_utc() > Duration::minutes(4));
    }

    #[test]
    fn extend_cookie_keeps_longer_expiry() {
        let jar = must_set_cookie(Duration::days(7));
        let want = get_token_from_cookies(&jar).unwrap().expires_at;

        let jar =
            extend_auth_cookie_duration_if_needed(jar, Duration::minutes(5), UtcOffset::UTC)
                .unwrap();

        let got = get_token_from_cookies(&jar).unwrap().expires_at;
        assert_eq!(got, want);
    }

    #[test]
    fn extend_cookie_fails_without_cookie() {
        let result =
            extend_auth_cookie_duration_if_needed(get_jar(), Duration::minutes(5), UtcOffset::UTC);

        assert!(matches!(result, Err(Error::CookieMissing)));
    }
}
