//! Session identity for HTTP requests.
//!
//! The id is read from the `x-qalab-session` header, then the `qalab_session`
//! cookie. Requests carrying neither get a fresh ephemeral id, and the
//! response hands it back as a cookie so the browser keeps using it.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-qalab-session";
pub const SESSION_COOKIE: &str = "qalab_session";

const MAX_SESSION_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub id: String,
    /// True when the id was minted for this request.
    pub fresh: bool,
}

impl SessionId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let from_header = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| is_valid_id(v));

        let from_cookie = || {
            headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, value)| *name == SESSION_COOKIE && is_valid_id(value))
                .map(|(_, value)| value)
        };

        match from_header.or_else(from_cookie) {
            Some(id) => Self {
                id: id.to_string(),
                fresh: false,
            },
            None => Self::ephemeral(),
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fresh: true,
        }
    }

    /// `Set-Cookie` value for a freshly minted session.
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.fresh {
            return None;
        }
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, self.id
        ))
        .ok()
    }

    /// Attach the session cookie to `response` when the session is new.
    pub fn apply(&self, mut response: Response) -> Response {
        if let Some(cookie) = self.set_cookie() {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        response
    }
}

// Printable ASCII with no separators, so the id is safe to echo in a cookie.
fn is_valid_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SESSION_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b';' | b',' | b'"' | b'\\'))
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
