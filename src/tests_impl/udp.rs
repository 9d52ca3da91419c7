//! # UDP Bandwidth/Latency Tests
//!
//! Unlike the TCP collaborators, these need a second socket: the server
//! binds a `UdpSocket` on `req.port`; the client derives the server's
//! address from the already-connected control `TcpStream`'s peer IP
//! combined with that same port (see DESIGN.md for why UDP is built
//! fresh rather than adapted from an existing transport).
//! `flip` is not honored for UDP: a receive-only socket has no
//! rendezvous to learn a send target without first hearing from its
//! peer, so the bandwidth test is always client-sends/server-receives
//! and the latency test is always client-initiates/server-echoes.

use std::time::Instant;

use async_trait::async_trait;
use tokio::net::{TcpStream, UdpSocket};

use crate::error::QperfError;
use crate::io::deadline_from_now;
use crate::params::{ParIndex, ParValue, ParamTable};
use crate::registry::Test;
use crate::runtime::Runtime;

const DEFAULT_BW_MSG_SIZE: u64 = 65536;
const DEFAULT_LAT_MSG_SIZE: u64 = 100;
const DEFAULT_UDP_PORT: u32 = 19766;

fn touch(buf: &[u8]) {
    let mut acc: u8 = 0;
    for &b in buf {
        acc ^= std::hint::black_box(b);
    }
    std::hint::black_box(acc);
}

async fn connect_client_socket(rt: &Runtime, stream: &TcpStream) -> Result<UdpSocket, QperfError> {
    let peer_ip = stream
        .peer_addr()
        .map_err(|e| QperfError::System { context: "reading control stream peer address".into(), source: e })?
        .ip();
    let sock = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .map_err(|e| QperfError::System { context: "binding udp client socket".into(), source: e })?;
    sock.connect((peer_ip, rt.req.port as u16))
        .await
        .map_err(|e| QperfError::System { context: "connecting udp client socket".into(), source: e })?;
    Ok(sock)
}

async fn bind_server_socket(rt: &Runtime) -> Result<UdpSocket, QperfError> {
    UdpSocket::bind(("0.0.0.0", rt.req.port as u16))
        .await
        .map_err(|e| QperfError::System { context: format!("binding udp port {}", rt.req.port), source: e })
}

async fn recv_within(sock: &UdpSocket, buf: &mut [u8], deadline: Instant) -> Result<usize, QperfError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(QperfError::Timeout("udp recv deadline already passed".into()));
    }
    match tokio::time::timeout(remaining, sock.recv(buf)).await {
        Ok(Ok(n)) => Ok(n),
        Ok(Err(e)) => Err(QperfError::System { context: "udp recv".into(), source: e }),
        Err(_) => Err(QperfError::Timeout("udp recv".into())),
    }
}

async fn recv_from_within(
    sock: &UdpSocket,
    buf: &mut [u8],
    deadline: Instant,
) -> Result<(usize, std::net::SocketAddr), QperfError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(QperfError::Timeout("udp recv deadline already passed".into()));
    }
    match tokio::time::timeout(remaining, sock.recv_from(buf)).await {
        Ok(Ok(pair)) => Ok(pair),
        Ok(Err(e)) => Err(QperfError::System { context: "udp recv".into(), source: e }),
        Err(_) => Err(QperfError::Timeout("udp recv".into())),
    }
}

async fn udp_send_loop(rt: &mut Runtime, sock: &UdpSocket) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let buf = vec![0u8; msg_size];
    let mut sent = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || sent < rt.req.no_msgs) {
        sock.send(&buf).await.map_err(|e| QperfError::System { context: "udp send".into(), source: e })?;
        sent += 1;
        bytes += msg_size as u64;
    }
    rt.local_stat.s.no_bytes += bytes;
    rt.local_stat.s.no_msgs += sent;
    Ok(())
}

async fn udp_recv_loop(rt: &mut Runtime, sock: &UdpSocket) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let touch_enabled = rt.req.access_recv != 0;
    let mut buf = vec![0u8; msg_size];
    let mut received = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || received < rt.req.no_msgs) {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        match recv_from_within(sock, &mut buf, deadline).await {
            Ok((n, _addr)) => {
                if touch_enabled {
                    touch(&buf[..n]);
                }
                received += 1;
                bytes += n as u64;
            }
            Err(e) if e.is_timeout() && rt.finished.is_set() => break,
            Err(e) => return Err(e),
        }
    }
    rt.local_stat.r.no_bytes += bytes;
    rt.local_stat.r.no_msgs += received;
    Ok(())
}

async fn udp_ping_pong_client(rt: &mut Runtime, sock: &UdpSocket) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let out = vec![0u8; msg_size];
    let mut buf = vec![0u8; msg_size];
    let touch_enabled = rt.req.access_recv != 0;
    let mut round_trips = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || round_trips < rt.req.no_msgs) {
        sock.send(&out).await.map_err(|e| QperfError::System { context: "udp send".into(), source: e })?;
        let deadline = deadline_from_now(rt.req.timeout as u64);
        let n = recv_within(sock, &mut buf, deadline).await?;
        if touch_enabled {
            touch(&buf[..n]);
        }
        round_trips += 1;
        bytes += n as u64;
    }
    rt.local_stat.s.no_bytes += bytes;
    rt.local_stat.s.no_msgs += round_trips;
    rt.local_stat.r.no_bytes += bytes;
    rt.local_stat.r.no_msgs += round_trips;
    Ok(())
}

async fn udp_ping_pong_server(rt: &mut Runtime, sock: &UdpSocket) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let touch_enabled = rt.req.access_recv != 0;
    let mut buf = vec![0u8; msg_size];
    let mut round_trips = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || round_trips < rt.req.no_msgs) {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        let (n, peer) = match recv_from_within(sock, &mut buf, deadline).await {
            Ok(pair) => pair,
            Err(e) if e.is_timeout() && rt.finished.is_set() => break,
            Err(e) => return Err(e),
        };
        if touch_enabled {
            touch(&buf[..n]);
        }
        sock.send_to(&buf[..n], peer).await.map_err(|e| QperfError::System { context: "udp send".into(), source: e })?;
        round_trips += 1;
        bytes += n as u64;
    }
    rt.local_stat.r.no_bytes += bytes;
    rt.local_stat.r.no_msgs += round_trips;
    rt.local_stat.s.no_bytes += bytes;
    rt.local_stat.s.no_msgs += round_trips;
    Ok(())
}

pub struct UdpBwTest;

#[async_trait]
impl Test for UdpBwTest {
    fn apply_defaults(&self, table: &mut ParamTable) -> Result<(), QperfError> {
        table.set_internal(ParIndex::LMsgSize, ParValue::Size(DEFAULT_BW_MSG_SIZE))?;
        table.set_internal(ParIndex::RMsgSize, ParValue::Size(DEFAULT_BW_MSG_SIZE))?;
        table.set_internal(ParIndex::LPort, ParValue::U32(DEFAULT_UDP_PORT))?;
        table.set_internal(ParIndex::RPort, ParValue::U32(DEFAULT_UDP_PORT))
    }

    async fn client(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        let sock = connect_client_socket(rt, stream).await?;
        udp_send_loop(rt, &sock).await
    }

    async fn server(&self, rt: &mut Runtime, _stream: &mut TcpStream) -> Result<(), QperfError> {
        let sock = bind_server_socket(rt).await?;
        udp_recv_loop(rt, &sock).await
    }
}

pub struct UdpLatTest;

#[async_trait]
impl Test for UdpLatTest {
    fn apply_defaults(&self, table: &mut ParamTable) -> Result<(), QperfError> {
        table.set_internal(ParIndex::LMsgSize, ParValue::Size(DEFAULT_LAT_MSG_SIZE))?;
        table.set_internal(ParIndex::RMsgSize, ParValue::Size(DEFAULT_LAT_MSG_SIZE))?;
        table.set_internal(ParIndex::LPort, ParValue::U32(DEFAULT_UDP_PORT))?;
        table.set_internal(ParIndex::RPort, ParValue::U32(DEFAULT_UDP_PORT))
    }

    async fn client(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        let sock = connect_client_socket(rt, stream).await?;
        udp_ping_pong_client(rt, &sock).await
    }

    async fn server(&self, rt: &mut Runtime, _stream: &mut TcpStream) -> Result<(), QperfError> {
        let sock = bind_server_socket(rt).await?;
        udp_ping_pong_server(rt, &sock).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Settings;
    use crate::params::ParamTable;
    use crate::request::{Req, VER_INC, VER_MAJ, VER_MIN};
    use crate::runtime::Role;
    use tokio::net::TcpListener;

    fn req_with(msg_size: u64, no_msgs: u64, port: u32) -> Req {
        Req {
            ver_maj: VER_MAJ,
            ver_min: VER_MIN,
            ver_inc: VER_INC,
            req_index: 4,
            flip: 0,
            access_recv: 1,
            affinity: 0,
            poll_mode: 0,
            port,
            rd_atomic: 0,
            timeout: 5,
            msg_size,
            mtu_size: 1500,
            no_msgs,
            sock_buf_size: 0,
            time: 0,
            id: String::new(),
        }
    }

    /// Control connection only used by the client to learn the peer's
    /// IP; the UDP traffic runs over its own sockets.
    async fn loopback_control_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let client = TcpStream::connect(addr).await.unwrap();
        let server = accept.await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn bandwidth_test_moves_bounded_datagram_count() {
        let (client_ctrl, _server_ctrl) = loopback_control_pair().await;
        let udp_port = { UdpSocket::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap().port() as u32 };

        let server_req = req_with(256, 5, udp_port);
        let server = tokio::spawn(async move {
            let mut rt = Runtime::new(Role::Server, ParamTable::new(), server_req, &Settings::default());
            let sock = bind_server_socket(&rt).await.unwrap();
            udp_recv_loop(&mut rt, &sock).await.unwrap();
            rt
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut client_rt =
            Runtime::new(Role::Client, ParamTable::new(), req_with(256, 5, udp_port), &Settings::default());
        let sock = connect_client_socket(&client_rt, &client_ctrl).await.unwrap();
        udp_send_loop(&mut client_rt, &sock).await.unwrap();

        let server_rt = server.await.unwrap();
        assert_eq!(client_rt.local_stat.s.no_msgs, 5);
        assert_eq!(server_rt.local_stat.r.no_msgs, 5);
        assert_eq!(server_rt.local_stat.r.no_bytes, 5 * 256);
    }
}
