use bytes::{Buf, BytesMut};
use http::header::{CONTENT_LENGTH, EXPECT, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum HttpProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Incomplete request")]
    IncompleteRequest,
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    Empty,
    Length(usize),
    Chunked,
}

/// Parsed request line and headers
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RequestHead {
    fn framing(&self) -> Result<BodyFraming, HttpProtocolError> {
        let chunked = self
            .headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .last()
            .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(BodyFraming::Chunked);
        }

        match self.headers.get(CONTENT_LENGTH) {
            None => Ok(BodyFraming::Empty),
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .map(BodyFraming::Length)
                .ok_or_else(|| {
                    HttpProtocolError::InvalidRequest(format!("bad Content-Length: {value:?}"))
                }),
        }
    }

    fn expects_continue(&self) -> bool {
        self.headers
            .get(EXPECT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("100-continue"))
    }
}

/// Reads from `stream` until a full request head has arrived.
///
/// Returns the head and whatever bytes followed it (the start of the body).
pub async fn read_head(
    stream: &mut TcpStream,
    max_head_size: usize,
) -> Result<(RequestHead, BytesMut), HttpProtocolError> {
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);

    loop {
        buffer.reserve(READ_CHUNK);
        if stream.read_buf(&mut buffer).await? == 0 {
            return Err(HttpProtocolError::IncompleteRequest);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let parsed_len = match req.parse(&buffer) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => {
                if buffer.len() > max_head_size {
                    return Err(HttpProtocolError::HeadTooLarge(max_head_size));
                }
                continue;
            }
            Err(e) => {
                return Err(HttpProtocolError::HttpParse(format!(
                    "Failed to parse headers: {e}"
                )));
            }
        };

        if parsed_len > max_head_size {
            return Err(HttpProtocolError::HeadTooLarge(max_head_size));
        }

        let method = req
            .method
            .map(|m| Method::from_bytes(m.as_bytes()))
            .transpose()
            .map_err(|e| HttpProtocolError::InvalidRequest(e.to_string()))?
            .ok_or_else(|| HttpProtocolError::InvalidRequest("missing method".to_string()))?;
        let path = req.path.unwrap_or("/").to_string();

        let mut header_map = HeaderMap::with_capacity(req.headers.len());
        for header in req.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|e| HttpProtocolError::InvalidRequest(e.to_string()))?;
            let value = HeaderValue::from_bytes(header.value)
                .map_err(|e| HttpProtocolError::InvalidRequest(e.to_string()))?;
            header_map.append(name, value);
        }

        buffer.advance(parsed_len);
        let head = RequestHead {
            method,
            path,
            headers: header_map,
        };
        return Ok((head, buffer));
    }
}

/// An accepted request whose body has not been read yet.
///
/// Owns the connection; exactly one response is written on it before it is
/// closed.
#[derive(Debug)]
pub struct IncomingRequest {
    pub head: RequestHead,
    pub peer: SocketAddr,
    stream: TcpStream,
    buffered: BytesMut,
}

impl IncomingRequest {
    pub fn new(head: RequestHead, buffered: BytesMut, stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            head,
            peer,
            stream,
            buffered,
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn content_type(&self) -> Option<&str> {
        self.head
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Reads the complete body, honouring `Content-Length` or chunked framing
    pub async fn read_body(&mut self, max_body_size: usize) -> Result<Vec<u8>, HttpProtocolError> {
        let framing = self.head.framing()?;
        if framing != BodyFraming::Empty
            && self.head.expects_continue()
            && self.buffered.is_empty()
        {
            self.stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
            self.stream.flush().await?;
        }

        match framing {
            BodyFraming::Empty => Ok(Vec::new()),
            BodyFraming::Length(len) => {
                if len > max_body_size {
                    return Err(HttpProtocolError::BodyTooLarge(max_body_size));
                }
                while self.buffered.len() < len {
                    self.fill().await?;
                }
                Ok(self.buffered.split_to(len).to_vec())
            }
            BodyFraming::Chunked => self.read_chunked(max_body_size).await,
        }
    }

    async fn read_chunked(&mut self, max_body_size: usize) -> Result<Vec<u8>, HttpProtocolError> {
        let mut body = Vec::new();

        loop {
            let (consumed, size) = match httparse::parse_chunk_size(&self.buffered) {
                Ok(httparse::Status::Complete(found)) => found,
                Ok(httparse::Status::Partial) => {
                    self.fill().await?;
                    continue;
                }
                Err(_) => {
                    return Err(HttpProtocolError::HttpParse("invalid chunk size".to_string()));
                }
            };

            let size = usize::try_from(size)
                .ok()
                .filter(|s| body.len().saturating_add(*s) <= max_body_size)
                .ok_or(HttpProtocolError::BodyTooLarge(max_body_size))?;

            if size == 0 {
                self.buffered.advance(consumed);
                self.skip_trailers().await?;
                return Ok(body);
            }

            while self.buffered.len() < consumed + size + 2 {
                self.fill().await?;
            }
            body.extend_from_slice(&self.buffered[consumed..consumed + size]);
            if &self.buffered[consumed + size..consumed + size + 2] != b"\r\n" {
                return Err(HttpProtocolError::HttpParse(
                    "chunk not terminated by CRLF".to_string(),
                ));
            }
            self.buffered.advance(consumed + size + 2);
        }
    }

    async fn skip_trailers(&mut self) -> Result<(), HttpProtocolError> {
        loop {
            match self.buffered.windows(2).position(|w| w == b"\r\n") {
                Some(0) => {
                    self.buffered.advance(2);
                    return Ok(());
                }
                Some(end) => self.buffered.advance(end + 2),
                None => self.fill().await?,
            }
        }
    }

    async fn fill(&mut self) -> Result<(), HttpProtocolError> {
        self.buffered.reserve(READ_CHUNK);
        if self.stream.read_buf(&mut self.buffered).await? == 0 {
            return Err(HttpProtocolError::IncompleteRequest);
        }
        Ok(())
    }

    pub async fn write_response(
        &mut self,
        response: &EchoResponse,
        server_name: Option<&str>,
    ) -> Result<(), HttpProtocolError> {
        let encoded = response.encode(server_name);
        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shuts the connection down; errors are irrelevant at this point
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// A complete response to one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl EchoResponse {
    pub const TEXT: &'static str = "text/plain; charset=utf-8";
    pub const JSON: &'static str = "application/json";

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Self::TEXT,
            body: body.into(),
        }
    }

    /// Serializes status line, headers and body; `Content-Length` counts UTF-8 bytes
    pub fn encode(&self, server_name: Option<&str>) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or(""),
            self.content_type,
            self.body.len(),
        );
        if let Some(name) = server_name {
            head.push_str(&format!("Server: {name}\r\n"));
        }
        head.push_str("\r\n");

        let mut encoded = head.into_bytes();
        encoded.extend_from_slice(self.body.as_bytes());
        encoded
    }
}

/// Answers a connection that never became an accepted request, then closes it
pub async fn reject(stream: &mut TcpStream, response: &EchoResponse, server_name: Option<&str>) {
    let _ = stream.write_all(&response.encode(server_name)).await;
    let _ = stream.shutdown().await;
}
