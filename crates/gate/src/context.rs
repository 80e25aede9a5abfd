use std::borrow::Cow;

use http::header::{COOKIE, REFERER, USER_AGENT};
use http::{HeaderMap, HeaderValue};

/// Read access to the request fields the gate looks at.
///
/// Hosts implement this over whatever request type they carry. A header that
/// is present must come back as `Some`, whatever bytes it holds; only a
/// missing header is `None`.
pub trait RequestMetadata {
    fn user_agent(&self) -> Option<Cow<'_, str>>;
    fn referer(&self) -> Option<Cow<'_, str>>;
    /// `Cookie` header values, in order. HTTP/2 may split cookies across
    /// several headers.
    fn cookie_headers(&self) -> Vec<Cow<'_, str>>;
}

/// Header bytes as text. Bytes that are not UTF-8 become U+FFFD, so
/// substring checks still see the rest of the value.
fn header_text(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

impl RequestMetadata for HeaderMap {
    fn user_agent(&self) -> Option<Cow<'_, str>> {
        self.get(USER_AGENT).map(header_text)
    }

    fn referer(&self) -> Option<Cow<'_, str>> {
        self.get(REFERER).map(header_text)
    }

    fn cookie_headers(&self) -> Vec<Cow<'_, str>> {
        self.get_all(COOKIE).iter().map(header_text).collect()
    }
}

/// Request-scoped input to [`crate::AccessGate::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundRequestContext {
    /// Empty when the header is absent.
    pub user_agent: String,
    pub referer: Option<String>,
    pub has_challenge_cookie: bool,
}

impl InboundRequestContext {
    pub fn new(
        user_agent: impl Into<String>,
        referer: Option<impl Into<String>>,
        has_challenge_cookie: bool,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            referer: referer.map(Into::into),
            has_challenge_cookie,
        }
    }
}
