//! # TCP Bandwidth/Latency Tests
//!
//! Both tests reuse the already-open control `TcpStream` directly rather
//! than opening a second connection: the bandwidth test floods
//! fixed-size messages in one direction until `Finished` fires or
//! `no_msgs` is reached, the latency test round-trips one message at a
//! time. `flip` swaps which side sends; `access_recv` touches every
//! received byte.

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::QperfError;
use crate::io::{deadline_from_now, read_exact_within, write_all_within};
use crate::params::{ParIndex, ParValue, ParamTable};
use crate::registry::Test;
use crate::runtime::Runtime;

const DEFAULT_BW_MSG_SIZE: u64 = 65536;
const DEFAULT_LAT_MSG_SIZE: u64 = 100;

/// Touch every byte of a just-received buffer to fault its pages in
/// before the timer stops. `black_box` keeps the optimizer from eliding
/// the read.
fn touch(buf: &[u8]) {
    let mut acc: u8 = 0;
    for &b in buf {
        acc ^= std::hint::black_box(b);
    }
    std::hint::black_box(acc);
}

async fn send_loop(rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let buf = vec![0u8; msg_size];
    let mut sent = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || sent < rt.req.no_msgs) {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        write_all_within(stream, &buf, deadline).await?;
        sent += 1;
        bytes += msg_size as u64;
    }
    rt.local_stat.s.no_bytes += bytes;
    rt.local_stat.s.no_msgs += sent;
    Ok(())
}

async fn recv_loop(rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let touch_enabled = rt.req.access_recv != 0;
    let mut received = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || received < rt.req.no_msgs) {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        let buf = read_exact_within(stream, msg_size, deadline).await?;
        if touch_enabled {
            touch(&buf);
        }
        received += 1;
        bytes += msg_size as u64;
    }
    rt.local_stat.r.no_bytes += bytes;
    rt.local_stat.r.no_msgs += received;
    Ok(())
}

async fn ping_pong_client(rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let out = vec![0u8; msg_size];
    let touch_enabled = rt.req.access_recv != 0;
    let mut round_trips = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || round_trips < rt.req.no_msgs) {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        write_all_within(stream, &out, deadline).await?;
        let back = read_exact_within(stream, msg_size, deadline).await?;
        if touch_enabled {
            touch(&back);
        }
        round_trips += 1;
        bytes += msg_size as u64;
    }
    rt.local_stat.s.no_bytes += bytes;
    rt.local_stat.s.no_msgs += round_trips;
    rt.local_stat.r.no_bytes += bytes;
    rt.local_stat.r.no_msgs += round_trips;
    Ok(())
}

async fn ping_pong_server(rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
    let msg_size = rt.req.msg_size.max(1) as usize;
    let touch_enabled = rt.req.access_recv != 0;
    let mut round_trips = 0u64;
    let mut bytes = 0u64;
    while !rt.finished.is_set() && (rt.req.no_msgs == 0 || round_trips < rt.req.no_msgs) {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        let buf = read_exact_within(stream, msg_size, deadline).await?;
        if touch_enabled {
            touch(&buf);
        }
        write_all_within(stream, &buf, deadline).await?;
        round_trips += 1;
        bytes += msg_size as u64;
    }
    rt.local_stat.r.no_bytes += bytes;
    rt.local_stat.r.no_msgs += round_trips;
    rt.local_stat.s.no_bytes += bytes;
    rt.local_stat.s.no_msgs += round_trips;
    Ok(())
}

pub struct TcpBwTest;

#[async_trait]
impl Test for TcpBwTest {
    fn apply_defaults(&self, table: &mut ParamTable) -> Result<(), QperfError> {
        table.set_internal(ParIndex::LMsgSize, ParValue::Size(DEFAULT_BW_MSG_SIZE))?;
        table.set_internal(ParIndex::RMsgSize, ParValue::Size(DEFAULT_BW_MSG_SIZE))
    }

    async fn client(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        if rt.req.flip == 0 {
            send_loop(rt, stream).await
        } else {
            recv_loop(rt, stream).await
        }
    }

    async fn server(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        if rt.req.flip == 0 {
            recv_loop(rt, stream).await
        } else {
            send_loop(rt, stream).await
        }
    }
}

pub struct TcpLatTest;

#[async_trait]
impl Test for TcpLatTest {
    fn apply_defaults(&self, table: &mut ParamTable) -> Result<(), QperfError> {
        table.set_internal(ParIndex::LMsgSize, ParValue::Size(DEFAULT_LAT_MSG_SIZE))?;
        table.set_internal(ParIndex::RMsgSize, ParValue::Size(DEFAULT_LAT_MSG_SIZE))
    }

    async fn client(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        ping_pong_client(rt, stream).await
    }

    async fn server(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        ping_pong_server(rt, stream).await
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

    fn req_with(msg_size: u64, no_msgs: u64, flip: u32) -> Req {
        Req {
            ver_maj: VER_MAJ,
            ver_min: VER_MIN,
            ver_inc: VER_INC,
            req_index: 2,
            flip,
            access_recv: 1,
            affinity: 0,
            poll_mode: 0,
            port: 0,
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

    #[tokio::test]
    async fn bandwidth_test_moves_bounded_message_count() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut rt = Runtime::new(Role::Server, ParamTable::new(), req_with(256, 5, 0), &Settings::default());
            TcpBwTest.server(&mut rt, &mut sock).await.unwrap();
            rt
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut client_rt = Runtime::new(Role::Client, ParamTable::new(), req_with(256, 5, 0), &Settings::default());
        TcpBwTest.client(&mut client_rt, &mut client).await.unwrap();

        let server_rt = server.await.unwrap();
        assert_eq!(client_rt.local_stat.s.no_msgs, 5);
        assert_eq!(client_rt.local_stat.s.no_bytes, 5 * 256);
        assert_eq!(server_rt.local_stat.r.no_msgs, 5);
        assert_eq!(server_rt.local_stat.r.no_bytes, 5 * 256);
    }

    #[tokio::test]
    async fn latency_test_round_trips_bounded_message_count() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut rt = Runtime::new(Role::Server, ParamTable::new(), req_with(64, 3, 0), &Settings::default());
            TcpLatTest.server(&mut rt, &mut sock).await.unwrap();
            rt
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut client_rt = Runtime::new(Role::Client, ParamTable::new(), req_with(64, 3, 0), &Settings::default());
        TcpLatTest.client(&mut client_rt, &mut client).await.unwrap();

        let server_rt = server.await.unwrap();
        assert_eq!(client_rt.local_stat.s.no_msgs, 3);
        assert_eq!(server_rt.local_stat.r.no_msgs, 3);
    }

    #[test]
    fn apply_defaults_only_fills_unset_slots() {
        let mut table = ParamTable::new();
        table.set_size("--msg_size", ParIndex::LMsgSize, 4096).unwrap();
        TcpBwTest.apply_defaults(&mut table).unwrap();
        assert_eq!(table.peek(ParIndex::LMsgSize).unwrap().as_u64(), 4096);
        assert_eq!(table.peek(ParIndex::RMsgSize).unwrap().as_u64(), DEFAULT_BW_MSG_SIZE);
    }
}
