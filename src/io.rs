//! # Deadline-Bounded Framed I/O
//!
//! `transfer()` reads or writes exactly `len` bytes over a TCP stream or
//! fails. Every call carries an absolute deadline computed once at the
//! caller's boundary (`Instant::now() + Req.timeout`);
//! `tokio::time::timeout` enforces it against the remaining budget on each
//! call rather than a hand-rolled `select` + non-blocking retry loop,
//! since tokio's reactor already does non-blocking readiness
//! multiplexing under the hood. Interruption by signals is a non-issue
//! here: there is no signal-based retry logic to get wrong, because
//! tokio's I/O never returns `EINTR` to this layer.

use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::QperfError;

/// Apply the `sock_buf_size` parameter as the socket's send and receive
/// buffer size. `0` means "leave the OS
/// default alone". Borrows the stream's raw fd through `socket2` rather
/// than taking ownership, since `tokio::net::TcpStream` already owns and
/// will close it; `into_raw_fd()` on the temporary `Socket` hands it
/// back without closing it.
pub fn apply_sock_buf_size(stream: &TcpStream, size: u64) -> Result<(), QperfError> {
    if size == 0 {
        return Ok(());
    }
    let sock = unsafe { socket2::Socket::from_raw_fd(stream.as_raw_fd()) };
    let result = sock.set_send_buffer_size(size as usize).and_then(|_| sock.set_recv_buffer_size(size as usize));
    let _ = sock.into_raw_fd();
    result.map_err(|e| QperfError::System { context: "setting socket buffer size".into(), source: e })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Transfer exactly `buf.len()` bytes in `direction`, failing if `deadline`
/// passes first. On read, a clean peer shutdown (EOF before `buf` is full)
/// is reported as `PeerClosed`; any other I/O error is `IOError`; running
/// out of time is `Timeout`. Never returns a partial transfer as success.
pub async fn transfer(
    direction: Direction,
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Instant,
) -> Result<(), QperfError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(QperfError::Timeout("framed I/O deadline already passed".into()));
    }

    let fut = async {
        match direction {
            Direction::Read => stream.read_exact(buf).await.map(|_| ()),
            Direction::Write => stream.write_all(buf).await,
        }
    };

    match tokio::time::timeout(remaining, fut).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Err(QperfError::Protocol("peer closed connection".into()))
            } else {
                Err(QperfError::System {
                    context: format!("framed {:?}", direction),
                    source: e,
                })
            }
        }
        Err(_) => Err(QperfError::Timeout(format!("framed {:?}", direction))),
    }
}

/// Compute an absolute deadline `timeout_secs` seconds from now. Used at
/// the start of each logical operation (sync, exchange) that may involve
/// more than one `transfer()` call sharing the same budget.
pub fn deadline_from_now(timeout_secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(timeout_secs)
}

/// Read exactly `len` bytes within the deadline, returning the buffer.
pub async fn read_exact_within(
    stream: &mut TcpStream,
    len: usize,
    deadline: Instant,
) -> Result<Vec<u8>, QperfError> {
    let mut buf = vec![0u8; len];
    transfer(Direction::Read, stream, &mut buf, deadline).await?;
    Ok(buf)
}

/// Write the full buffer within the deadline.
pub async fn write_all_within(
    stream: &mut TcpStream,
    buf: &[u8],
    deadline: Instant,
) -> Result<(), QperfError> {
    let mut owned = buf.to_vec();
    transfer(Direction::Write, stream, &mut owned, deadline).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn full_transfer_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let deadline = deadline_from_now(5);
            let data = read_exact_within(&mut sock, 4, deadline).await.unwrap();
            assert_eq!(data, vec![1, 2, 3, 4]);
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let deadline = deadline_from_now(5);
        write_all_within(&mut client, &[1, 2, 3, 4], deadline)
            .await
            .unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn read_past_deadline_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (mut sock, _) = listener.accept().await.unwrap();

        let deadline = Instant::now() + Duration::from_millis(50);
        let result = read_exact_within(&mut sock, 4, deadline).await;
        assert!(matches!(result, Err(QperfError::Timeout(_))));
    }

    #[tokio::test]
    async fn peer_close_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            drop(sock);
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        server.await.unwrap();
        // Give the peer's FIN a moment to arrive.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let deadline = deadline_from_now(5);
        let result = read_exact_within(&mut client, 4, deadline).await;
        assert!(result.is_err());
    }
}
