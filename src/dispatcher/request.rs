use super::core::HeaderVec;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use http::Method;
use serde_json::Value;
use std::sync::Arc;

/// An inbound HTTP request as handed over by the transport.
///
/// Header names are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Taken from `x-request-id` when it carries a ULID, generated otherwise
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Query string without the leading `?`
    pub raw_query: Option<String>,
    pub headers: HeaderVec,
    pub body: Option<String>,
}

impl MockRequest {
    /// Start a request for `uri` (`/pets?limit=10`); the query is split off.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, raw_query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path,
            raw_query,
            headers: HeaderVec::new(),
            body: None,
        }
    }

    /// Append a header. Repeated names are kept as separate entries.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == REQUEST_ID_HEADER {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as the request body, defaulting `content-type` to JSON.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        let req = if self.get_header("content-type").is_none() {
            self.with_header("content-type", "application/json")
        } else {
            self
        };
        req.with_body(body.to_string())
    }

    /// First value of a header (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, in arrival order.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// Decoded query pairs in order, repeated keys included.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.raw_query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cookies from every `cookie` header.
    #[must_use]
    pub fn cookies(&self) -> HeaderVec {
        self.header_values("cookie")
            .into_iter()
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let name = parts.next()?.trim();
                if name.is_empty() {
                    return None;
                }
                let value = parts.next().unwrap_or("").trim();
                Some((Arc::from(name), value.to_string()))
            })
            .collect()
    }

    /// Last value of a cookie
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uri_is_split() {
        let req = MockRequest::new(Method::GET, "/pets?limit=10&tag=a%20b&tag=c");
        assert_eq!(req.path, "/pets");
        assert_eq!(req.raw_query.as_deref(), Some("limit=10&tag=a%20b&tag=c"));
        assert_eq!(
            req.query_pairs(),
            vec![
                ("limit".to_string(), "10".to_string()),
                ("tag".to_string(), "a b".to_string()),
                ("tag".to_string(), "c".to_string()),
            ]
        );
        assert!(MockRequest::new(Method::GET, "/pets").query_pairs().is_empty());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = MockRequest::new(Method::GET, "/")
            .with_header("X-Trace", "a")
            .with_header("x-trace", "b");
        assert_eq!(req.get_header("x-TRACE"), Some("a"));
        assert_eq!(req.header_values("X-Trace"), vec!["a", "b"]);
    }

    #[test]
    fn test_cookies() {
        let req = MockRequest::new(Method::GET, "/")
            .with_header("Cookie", "session=abc; theme=dark")
            .with_header("Cookie", "session=xyz");
        let cookies = req.cookies();
        assert_eq!(cookies.len(), 3);
        assert_eq!(req.get_cookie("theme").as_deref(), Some("dark"));
        assert_eq!(req.get_cookie("session").as_deref(), Some("xyz"));
        assert!(req.get_cookie("missing").is_none());
    }

    #[test]
    fn test_with_json_sets_content_type_once() {
        let req = MockRequest::new(Method::POST, "/pets").with_json(&json!({ "name": "Rex" }));
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"Rex"}"#));

        let req = MockRequest::new(Method::POST, "/pets")
            .with_header("Content-Type", "application/merge-patch+json")
            .with_json(&json!({}));
        assert_eq!(req.header_values("content-type").len(), 1);
    }

    #[test]
    fn test_request_id_header_is_honoured() {
        let id = RequestId::new();
        let req = MockRequest::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(req.request_id, id);
    }
}
