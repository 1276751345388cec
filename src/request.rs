// request.rs

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound HTTP/1.1 request.
///
/// Headers keep insertion order. `Content-Length` is only ever derived from
/// the body that is actually attached, so the two cannot drift apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl UploadRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Append a header. Setting an existing name again replaces its value in place.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    /// Attach the body, recording its type and exact length.
    pub fn body(mut self, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        self.set_header("Content-Type".into(), content_type.into());
        self.set_header("Content-Length".into(), body.len().to_string());
        self.body = body;
        self
    }

    fn set_header(&mut self, name: String, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub(crate) fn ensure_header_first(&mut self, name: &str, value: &str) {
        if !self.has_header(name) {
            self.headers.insert(0, (name.into(), value.into()));
        }
    }

    pub(crate) fn ensure_header_last(&mut self, name: &str, value: &str) {
        if !self.has_header(name) {
            self.headers.push((name.into(), value.into()));
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header_value(name).is_some()
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Request line, headers and the blank line, ready for the wire.
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.1\r\n", self.method, self.path);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Everything that goes on the wire for this request, head then body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_without_body_still_ends_head() {
        let req = UploadRequest::get("/api/time/")
            .header("Host", "10.0.0.2")
            .header("Connection", "close");
        assert_eq!(
            req.to_bytes(),
            b"GET /api/time/ HTTP/1.1\r\nHost: 10.0.0.2\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn content_length_follows_body() {
        let req = UploadRequest::post("/api/data/")
            .header("Content-Length", "999")
            .body("application/json", b"{\"a\":1}".to_vec());
        assert_eq!(req.header_value("content-length"), Some("7"));
        assert_eq!(req.header_value("Content-Type"), Some("application/json"));
        // replaced in place, not duplicated
        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.headers()[0].0, "Content-Length");
    }

    #[test]
    fn headers_keep_insertion_order() {
        let mut req = UploadRequest::post("/x")
            .header("X-B", "2")
            .body("text/plain", b"hi".to_vec());
        req.ensure_header_first("Host", "h");
        req.ensure_header_last("Connection", "close");
        req.ensure_header_first("host", "other");

        let names: Vec<_> = req.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["Host", "X-B", "Content-Type", "Content-Length", "Connection"]
        );
        let wire = String::from_utf8(req.to_bytes()).unwrap();
        assert!(wire.starts_with("POST /x HTTP/1.1\r\nHost: h\r\n"));
        assert!(wire.ends_with("Connection: close\r\n\r\nhi"));
    }
}

// EOF
