use std::io;

use httparse::Status;
use log::{debug, info};
use socks5::Dialer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

const MAX_HEAD_LEN: usize = 64 * 1024;
const MAX_BODY_LEN: usize = 64 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported scheme {0:?}, only http is supported")]
    UnsupportedScheme(String),
    #[error("url has no host")]
    MissingHost,
    #[error(transparent)]
    Dial(#[from] socks5::Error),
    #[error("http: {0}")]
    Io(#[from] io::Error),
    #[error("http: {0}")]
    Http(&'static str),
    #[error("http: stopped after {0} redirects")]
    TooManyRedirects(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// GETs `url` through the SOCKS5 server at `proxy`, following up to
/// `MAX_REDIRECTS` redirects. Each hop is a fresh dial.
pub async fn fetch(dialer: &Dialer, proxy: &str, url: &str) -> Result<Response, FetchError> {
    let mut url = Url::parse(url)?;
    let mut redirects = 0;

    loop {
        let response = fetch_once(dialer, proxy, &url).await?;
        let location = match &response.location {
            Some(location) if is_redirect(response.status) => location,
            _ => return Ok(response),
        };

        if redirects == MAX_REDIRECTS {
            return Err(FetchError::TooManyRedirects(redirects));
        }
        redirects += 1;

        let next = url.join(location)?;
        debug!("http: {} redirected to {}", url, next);
        url = next;
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

async fn fetch_once(dialer: &Dialer, proxy: &str, url: &Url) -> Result<Response, FetchError> {
    if url.scheme() != "http" {
        return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(FetchError::MissingHost)?;
    let port = url.port_or_known_default().unwrap_or(80);
    let target = format!("{}:{}", host, port);
    let host_header = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    info!("GET {} via {}", url, proxy);
    let mut stream = dialer.dial(proxy, &target).await?;
    get(&mut stream, &host_header, &path).await
}

/// Sends a `GET` on an established stream and reads the full response.
/// Uses HTTP/1.0 with `Connection: close` so the body is either
/// length-delimited or runs to end of stream.
pub async fn get<S>(stream: &mut S, host: &str, path: &str) -> Result<Response, FetchError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: socksdial/{}\r\nConnection: close\r\n\r\n",
        path,
        host,
        env!("CARGO_PKG_VERSION")
    );
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut buf = vec![0u8; 4096];
    let mut len = 0;

    loop {
        if len == buf.len() {
            if buf.len() >= MAX_HEAD_LEN {
                return Err(FetchError::Http("response header too large"));
            }
            buf.resize(buf.len() * 2, 0);
        }

        let size = stream.read(&mut buf[len..]).await?;
        if size == 0 {
            return Err(FetchError::Http("server closed before response header"));
        }
        len += size;

        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers);

        match resp.parse(&buf[0..len]) {
            Ok(Status::Complete(offset)) => {
                let status = resp.code.unwrap_or_default();
                let content_length = content_length(resp.headers)?;
                let location = header(resp.headers, "location")
                    .map(|v| String::from_utf8_lossy(v).trim().to_string());
                debug!("http: status {} content-length {:?}", status, content_length);

                buf.truncate(len);
                let body = buf.split_off(offset);
                let body = read_body(stream, body, content_length).await?;
                return Ok(Response {
                    status,
                    location,
                    body,
                });
            }
            Ok(Status::Partial) => continue,
            Err(_) => return Err(FetchError::Http("malformed response header")),
        }
    }
}

fn header<'h>(headers: &[httparse::Header<'h>], name: &str) -> Option<&'h [u8]> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value)
}

fn content_length(headers: &[httparse::Header]) -> Result<Option<usize>, FetchError> {
    let Some(value) = header(headers, "content-length") else {
        return Ok(None);
    };

    let length = std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or(FetchError::Http("invalid content-length"))?;
    if length > MAX_BODY_LEN as u64 {
        return Err(FetchError::Http("content-length too large"));
    }
    Ok(Some(length as usize))
}

async fn read_body<S>(
    stream: &mut S,
    mut body: Vec<u8>,
    content_length: Option<usize>,
) -> Result<Vec<u8>, FetchError>
where
    S: AsyncRead + Unpin,
{
    match content_length {
        Some(length) if body.len() >= length => {
            body.truncate(length);
        }
        Some(length) => {
            let remaining = (length - body.len()) as u64;
            stream.take(remaining).read_to_end(&mut body).await?;
            if body.len() < length {
                return Err(FetchError::Http("body shorter than content-length"));
            }
        }
        None => {
            let remaining = MAX_BODY_LEN.saturating_sub(body.len()) as u64 + 1;
            stream.take(remaining).read_to_end(&mut body).await?;
            if body.len() > MAX_BODY_LEN {
                return Err(FetchError::Http("body too large"));
            }
        }
    }
    Ok(body)
}
