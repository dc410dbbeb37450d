use std::io::Result;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One request/reply round trip.
///
/// Writes all of `request`, then reads until `expected` bytes have arrived or
/// the peer closes. Returns whatever was received, which may be shorter than
/// `expected`; the caller decides whether that is acceptable. Never reads
/// beyond `expected`, so anything the peer sends after the reply stays in the
/// stream.
pub async fn exchange<S>(stream: &mut S, request: &[u8], expected: usize) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = vec![0u8; expected];
    let mut len = 0;

    while len < expected {
        let size = stream.read(&mut response[len..]).await?;
        if size == 0 {
            trace!("socks5: peer closed after {} of {} bytes", len, expected);
            break;
        }
        len += size;
    }

    response.truncate(len);
    Ok(response)
}
