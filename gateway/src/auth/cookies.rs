//! Session and CSRF cookie construction.
//!
//! `SameSite=None` on both cookies: the portal frontend is served from a
//! different origin than the gateway. The session cookie gets the
//! `__Secure-` name prefix only when secure cookies are enabled, since
//! browsers reject the prefix on non-Secure cookies.

use axum::http::{header, HeaderMap};

/// Cookie name base for the application.
pub const APP_COOKIE_BASE: &str = "bunda";

/// Value of a named cookie on the request, if present.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie_str in cookie_header.split(';') {
        if let Ok(cookie) = cookie::Cookie::parse(cookie_str.trim()) {
            if cookie.name() == name {
                return Some(cookie.value().to_string());
            }
        }
    }

    None
}

/// Name of the signed session cookie.
pub fn session_cookie_name(secure: bool) -> String {
    if secure {
        format!("__Secure-{}.session-token", APP_COOKIE_BASE)
    } else {
        format!("{}.session-token", APP_COOKIE_BASE)
    }
}

/// Name of the CSRF cookie. Readable by frontend scripts, hence no prefix
/// and no HttpOnly.
pub fn csrf_cookie_name() -> String {
    format!("{}.csrf-token", APP_COOKIE_BASE)
}

/// `Set-Cookie` value carrying the signed session artifact.
pub fn build_session_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=None; Max-Age={}{}",
        name, value, max_age_secs, secure_attr
    )
}

/// `Set-Cookie` value for the CSRF token.
pub fn build_csrf_cookie(value: &str, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; SameSite=None{}",
        csrf_cookie_name(),
        value,
        secure_attr
    )
}

/// `Set-Cookie` value that expires a cookie immediately.
pub fn build_removal_cookie(name: &str, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!(
        "{}=; Path=/; HttpOnly; SameSite=None; Max-Age=0{}",
        name, secure_attr
    )
}
