use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Response, StatusCode};

/// A response the host must send in place of the protected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

impl GateResponse {
    pub(crate) fn text(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            headers: vec![
                (
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
                (CACHE_CONTROL, HeaderValue::from_static("no-store")),
            ],
            body: Bytes::from(message.to_owned()),
        }
    }

    /// 412 Precondition Failed with the marker header and the cookie script.
    pub(crate) fn challenge(marker: (HeaderName, HeaderValue), script: String) -> Self {
        Self {
            status: StatusCode::PRECONDITION_FAILED,
            headers: vec![
                marker,
                (
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                ),
                (CACHE_CONTROL, HeaderValue::from_static("no-store")),
            ],
            body: Bytes::from(script),
        }
    }

    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Convert into an `http::Response` for hosts built on the `http` types.
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}
