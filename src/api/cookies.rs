use axum::http::{HeaderMap, HeaderValue, header};
use time::OffsetDateTime;
use tower_sessions::cookie::{Cookie, SameSite};

use crate::config::{AuthConfig, ServerConfig};
use crate::db::repositories::refresh_token::RefreshToken;

/// Builds and reads the `HttpOnly` cookie carrying the refresh token.
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    name: String,
    path: String,
    secure: bool,
}

impl RefreshCookie {
    #[must_use]
    pub fn new(auth: &AuthConfig, server: &ServerConfig) -> Self {
        Self {
            name: auth.refresh_cookie_name.clone(),
            path: auth.refresh_cookie_path.clone(),
            secure: server.secure_cookies,
        }
    }

    /// Remember-me tokens get an `Expires` attribute matching the token,
    /// others are session cookies.
    #[must_use]
    pub fn issue(&self, token: &RefreshToken) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), token.token.clone()))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict);

        if token.remember_me
            && let Ok(expires) = OffsetDateTime::from_unix_timestamp(token.expires_at.timestamp())
        {
            builder = builder.expires(expires);
        }

        builder.build()
    }

    #[must_use]
    pub fn clear(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), String::new()))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(time::Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    /// Returns the refresh token from the request's `Cookie` headers.
    #[must_use]
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

pub fn header_value(cookie: &Cookie<'_>) -> Option<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn cookies() -> RefreshCookie {
        RefreshCookie::new(&AuthConfig::default(), &ServerConfig::default())
    }

    fn token(remember_me: bool) -> RefreshToken {
        RefreshToken {
            id: 1,
            token: "abc123".to_string(),
            user_id: 1,
            remember_me,
            expires_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
            created_at: Utc::now() - Duration::minutes(1),
        }
    }

    #[test]
    fn remember_me_cookie_carries_expiry() {
        let header = cookies().issue(&token(true)).to_string();
        assert!(header.starts_with("REFRESH_TOKEN=abc123"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Strict"));
        assert!(header.contains("Secure"));
        assert!(header.contains("Path=/api/auth/token"));
        assert!(header.contains("Expires=Wed, 02 Jan 2030 03:04:05 GMT"));
    }

    #[test]
    fn plain_login_gets_session_cookie() {
        let header = cookies().issue(&token(false)).to_string();
        assert!(!header.contains("Expires"));
        assert!(!header.contains("Max-Age"));
    }

    #[test]
    fn insecure_cookies_for_local_dev() {
        let server = ServerConfig {
            secure_cookies: false,
            ..ServerConfig::default()
        };
        let header = RefreshCookie::new(&AuthConfig::default(), &server)
            .issue(&token(false))
            .to_string();
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let header = cookies().clear().to_string();
        assert!(header.starts_with("REFRESH_TOKEN=;"));
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("Path=/api/auth/token"));
    }

    #[test]
    fn reads_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; REFRESH_TOKEN=deadbeef; lang=en"),
        );
        assert_eq!(cookies().read(&headers).as_deref(), Some("deadbeef"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("REFRESH_TOKEN="));
        assert!(cookies().read(&empty).is_none());
        assert!(cookies().read(&HeaderMap::new()).is_none());
    }
}
