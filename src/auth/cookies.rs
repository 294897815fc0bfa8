//! Cookie transport for the token pair: httpOnly + secure on both cookies,
//! max-age matching the token lifetime.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration as CookieDuration;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn token_cookie(name: &'static str, token: &str, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, token.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(CookieDuration::seconds(max_age.as_secs() as i64))
        .build()
}

pub fn access_cookie(token: &str, max_age: Duration) -> Cookie<'static> {
    token_cookie(ACCESS_COOKIE, token, max_age)
}

pub fn refresh_cookie(token: &str, max_age: Duration) -> Cookie<'static> {
    token_cookie(REFRESH_COOKIE, token, max_age)
}

fn clear_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, String::new()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(CookieDuration::ZERO)
        .build()
}

pub fn clear_access_cookie() -> Cookie<'static> {
    clear_cookie(ACCESS_COOKIE)
}

pub fn clear_refresh_cookie() -> Cookie<'static> {
    clear_cookie(REFRESH_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cookies_are_http_only_and_secure() {
        let c = access_cookie("tok", Duration::from_secs(300));
        assert_eq!(c.name(), "accessToken");
        assert_eq!(c.value(), "tok");
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.max_age(), Some(CookieDuration::seconds(300)));
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        let c = clear_refresh_cookie();
        assert_eq!(c.name(), "refreshToken");
        assert!(c.value().is_empty());
        assert_eq!(c.max_age(), Some(CookieDuration::ZERO));
    }
}
