// response.rs

const HEAD_END: &[u8] = b"\r\n\r\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone, Debug)]
struct Head {
    version: String,
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
    len: usize,
    content_length: Option<usize>,
}

/// Collects response bytes as they arrive and notices when a response with a
/// `Content-Length` is complete, so the reader does not have to wait for the
/// peer to close.
#[derive(Debug, Default)]
pub struct ResponseParser {
    buf: Vec<u8>,
    scanned: usize,
    head: Option<Head>,
    // head is there but not HTTP, everything is read until close
    malformed: bool,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        if self.head.is_some() || self.malformed {
            return;
        }

        let from = self.scanned.saturating_sub(HEAD_END.len() - 1);
        match find(&self.buf[from..], HEAD_END) {
            Some(pos) => {
                let len = from + pos + HEAD_END.len();
                match parse_head(&self.buf[..len]) {
                    Some(head) => self.head = Some(head),
                    None => self.malformed = true,
                }
            }
            None => self.scanned = self.buf.len(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.head.as_ref().map(|h| h.status)
    }

    /// True once the head is in and the announced body length has arrived.
    pub fn is_complete(&self) -> bool {
        match &self.head {
            Some(Head {
                len,
                content_length: Some(cl),
                ..
            }) => self.buf.len() >= len + cl,
            _ => false,
        }
    }

    /// Hand back the raw bytes and, if the head parsed, the response.
    pub fn finish(self) -> (Vec<u8>, Option<HttpResponse>) {
        let response = self.head.map(|head| {
            let mut body = self.buf[head.len..].to_vec();
            if let Some(cl) = head.content_length {
                body.truncate(cl);
            }
            HttpResponse {
                version: head.version,
                status: head.status,
                reason: head.reason,
                headers: head.headers,
                body,
            }
        });
        (self.buf, response)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_head(bytes: &[u8]) -> Option<Head> {
    let text = std::str::from_utf8(bytes).ok()?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next()?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/1.") {
        return None;
    }
    let status = parts.next()?;
    if status.len() != 3 {
        return None;
    }
    let status = status.parse::<u16>().ok()?;
    let reason = parts.next().unwrap_or_default();

    let mut headers = Vec::new();
    let mut content_length = None;
    let mut chunked = false;
    for line in lines.filter(|l| !l.is_empty()) {
        let (name, value) = line.split_once(':')?;
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse::<usize>().ok()?);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.to_ascii_lowercase().contains("chunked");
        }
        headers.push((name.to_string(), value.to_string()));
    }

    Some(Head {
        version: version.to_string(),
        status,
        reason: reason.to_string(),
        headers,
        len: bytes.len(),
        // chunked bodies are not decoded, they are read until close
        content_length: if chunked { None } else { content_length },
    })
}


// EOF
