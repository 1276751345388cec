// transport.rs

use std::{borrow::Cow, fmt};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::*;

const BUFSZ: usize = 512;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Writing,
    Reading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Writing => f.write_str("writing request"),
            Stage::Reading => f.write_str("reading response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("connection to {addr} failed: {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out while {stage}")]
    Timeout { stage: Stage },

    #[error("io error while {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    #[error("response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
}

/// A byte-stream socket factory, one fresh stream per exchange.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    /// Where we connect to, for logs and errors.
    fn peer(&self) -> &str;

    async fn connect(&self) -> io::Result<Self::Stream>;
}

#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.server_addr())
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn peer(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(self.addr.as_str()).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Outcome of one exchange that made it through the socket.
///
/// Status codes are not judged here, that is up to the caller.
#[derive(Clone, Debug)]
pub struct ExchangeResult {
    pub raw: Vec<u8>,
    pub response: Option<HttpResponse>,
}

impl ExchangeResult {
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    pub fn is_success(&self) -> bool {
        self.response.as_ref().is_some_and(HttpResponse::is_success)
    }

    /// Response body if the head parsed, otherwise everything we got.
    pub fn body(&self) -> &[u8] {
        match &self.response {
            Some(r) => &r.body,
            None => &self.raw,
        }
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }
}

/// Minimal HTTP/1.1 client: one connection per request, `Connection: close`.
pub struct Transport<C> {
    connector: C,
    host: String,
    connect_timeout: Duration,
    exchange_timeout: Duration,
    max_response_bytes: usize,
    cnt: AtomicU32,
}

impl<C: Connector> Transport<C> {
    pub fn new(connector: C, config: &NodeConfig) -> Self {
        let host = match config.server_port {
            80 => config.server_host.clone(),
            port => format!("{}:{port}", config.server_host),
        };
        Self {
            connector,
            host,
            connect_timeout: config.connect_timeout(),
            exchange_timeout: config.exchange_timeout(),
            max_response_bytes: config.max_response_bytes,
            cnt: AtomicU32::new(0),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open, send, drain, close. Exactly one connect attempt, no retries.
    pub async fn perform_exchange(
        &self,
        mut request: UploadRequest,
    ) -> Result<ExchangeResult, ExchangeError> {
        let cnt = self.cnt.fetch_add(1, Ordering::Relaxed);
        request.ensure_header_first("Host", &self.host);
        request.ensure_header_last("Connection", "close");

        let addr = self.connector.peer().to_string();
        debug!(
            "#{cnt} {} {} -> {addr} ({} body bytes)",
            request.method(),
            request.path(),
            request.body_bytes().len()
        );

        let mut stream = match timeout(self.connect_timeout, self.connector.connect()).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ExchangeError::ConnectionFailed { addr, source }),
            Err(_) => {
                return Err(ExchangeError::ConnectionFailed {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
        };

        let mut stage = Stage::Writing;
        let res = timeout(
            self.exchange_timeout,
            exchange(&mut stream, &request, self.max_response_bytes, &mut stage),
        )
        .await;

        // we always hang up, whatever happened above
        if timeout(SHUTDOWN_GRACE, stream.shutdown()).await.is_err() {
            debug!("#{cnt} shutdown did not finish, dropping socket");
        }
        drop(stream);

        let (raw, response) = match res {
            Ok(res) => res?,
            Err(_) => return Err(ExchangeError::Timeout { stage }),
        };
        debug!(
            "#{cnt} got {} bytes, status {:?}",
            raw.len(),
            response.as_ref().map(|r| r.status)
        );
        Ok(ExchangeResult { raw, response })
    }
}

async fn exchange<S>(
    stream: &mut S,
    request: &UploadRequest,
    limit: usize,
    stage: &mut Stage,
) -> Result<(Vec<u8>, Option<HttpResponse>), ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // the whole head goes out before the first body byte
    stream
        .write_all(&request.head_bytes())
        .await
        .map_err(write_failed)?;
    stream
        .write_all(request.body_bytes())
        .await
        .map_err(write_failed)?;
    stream.flush().await.map_err(write_failed)?;

    *stage = Stage::Reading;
    let mut parser = ResponseParser::new();
    let mut buf = [0; BUFSZ];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            // peers that reset right after answering still gave us an answer
            Err(e) if !parser.is_empty() => {
                debug!("read ended with {e} after {} bytes", parser.len());
                0
            }
            Err(source) => {
                return Err(ExchangeError::Io {
                    stage: Stage::Reading,
                    source,
                })
            }
        };
        if n == 0 {
            break;
        }

        parser.push(&buf[..n]);
        if parser.len() > limit {
            return Err(ExchangeError::ResponseTooLarge { limit });
        }
        if parser.is_complete() {
            break;
        }
    }
    Ok(parser.finish())
}

fn write_failed(source: io::Error) -> ExchangeError {
    ExchangeError::Io {
        stage: Stage::Writing,
        source,
    }
}


// EOF
