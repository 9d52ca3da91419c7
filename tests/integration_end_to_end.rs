//! End-to-end coverage of every registered test over real loopback
//! sockets: a server task runs `protocol::serve` while the test body
//! drives `protocol::client_run` against it, following the exact setup
//! sequence `main.rs` uses (apply test defaults, then client defaults,
//! then build the outgoing `Req` from the remote slots).

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use qperf::calc::derive_res;
use qperf::cli::Settings;
use qperf::params::{ParIndex, ParamTable};
use qperf::registry::Registry;
use qperf::report::{build_report, Measure};
use qperf::request::{Req, VER_INC, VER_MAJ};

static NEXT_PORT: AtomicU32 = AtomicU32::new(29100);

fn next_port() -> u32 {
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Spawn a server on its own port, build the client-side `Req` the way
/// `main.rs` does, and run one client test to completion.
async fn run_case(test_name: &str, port: u32) -> qperf::Runtime {
    let server_registry = Registry::standard();
    tokio::spawn(async move {
        let _ = qperf::protocol::serve(port, 5, &server_registry).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut table = ParamTable::new();
    table.set_u32("--port", ParIndex::LPort, port).unwrap();
    table.set_u32("--port", ParIndex::RPort, port).unwrap();
    table.set_duration("--time", ParIndex::LTime, 1).unwrap();
    table.set_duration("--time", ParIndex::RTime, 1).unwrap();

    let registry = Registry::standard();
    let test_index = registry.index_of(test_name).expect("known test name");
    let test = registry.get(test_index).unwrap().clone();

    test.apply_defaults(&mut table).unwrap();
    Req::apply_client_defaults(&mut table).unwrap();
    let req = Req::from_remote_slots(&mut table, test_index as u32, test_name);

    let settings = Settings { wait_secs: Some(2), ..Settings::default() };
    qperf::protocol::client_run("127.0.0.1", req, table, settings, Some(2), &test, test_name)
        .await
        .unwrap_or_else(|e| panic!("{} run against a freshly started server failed: {}", test_name, e))
}

#[tokio::test]
async fn conf_test_reports_both_sides_configuration() {
    let rt = run_case("conf", next_port()).await;
    assert!(rt.successful);
    assert!(!rt.show.is_empty());
    let rendered = rt.show.place_show();
    assert!(rendered.contains("loc_node"));
    assert!(rendered.contains("rem_node"));
    assert!(rendered.contains("loc_qperf"));
}

#[tokio::test]
async fn quit_test_completes_handshake_only() {
    let rt = run_case("quit", next_port()).await;
    assert!(rt.successful);
    assert!(rt.show.is_empty());
}

#[tokio::test]
async fn tcp_bandwidth_end_to_end_reports_results() {
    let mut rt = run_case("tcp_bw", next_port()).await;
    assert!(rt.successful);
    assert!(rt.local_stat.s.no_bytes > 0);

    let remote = rt.peer_stat.clone().unwrap();
    let res = derive_res(&rt.local_stat, &remote).expect("a full tick window elapsed");
    build_report(&mut rt, Measure::Bandwidth, &res);
    let rendered = rt.show.place_show();
    assert!(rendered.contains("bw"));
}

#[tokio::test]
async fn tcp_latency_end_to_end_reports_results() {
    let mut rt = run_case("tcp_lat", next_port()).await;
    assert!(rt.successful);
    assert!(rt.local_stat.s.no_msgs > 0);

    let remote = rt.peer_stat.clone().unwrap();
    let res = derive_res(&rt.local_stat, &remote).expect("a full tick window elapsed");
    build_report(&mut rt, Measure::Latency, &res);
    let rendered = rt.show.place_show();
    assert!(rendered.contains("latency"));
}

#[tokio::test]
async fn udp_bandwidth_end_to_end_reports_results() {
    let mut rt = run_case("udp_bw", next_port()).await;
    assert!(rt.successful);
    assert!(rt.local_stat.s.no_bytes > 0);

    let remote = rt.peer_stat.clone().unwrap();
    let res = derive_res(&rt.local_stat, &remote).expect("a full tick window elapsed");
    build_report(&mut rt, Measure::Bandwidth, &res);
    let rendered = rt.show.place_show();
    assert!(rendered.contains("bw"));
}

/// A request whose (major, minor) doesn't match the server's is rejected
/// and the connection is closed, but the server's accept loop keeps
/// running: a well-formed request against the same port right after
/// still completes normally.
#[tokio::test]
async fn version_mismatch_is_rejected_and_server_keeps_accepting() {
    let port = next_port();
    let server_registry = Registry::standard();
    tokio::spawn(async move {
        let _ = qperf::protocol::serve(port, 5, &server_registry).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let registry = Registry::standard();
    let quit_index = registry.index_of("quit").unwrap() as u32;

    let bad_req = Req {
        ver_maj: VER_MAJ,
        ver_min: 99,
        ver_inc: VER_INC,
        req_index: quit_index,
        flip: 0,
        access_recv: 0,
        affinity: 0,
        poll_mode: 0,
        port: 0,
        rd_atomic: 0,
        timeout: 5,
        msg_size: 0,
        mtu_size: 0,
        no_msgs: 0,
        sock_buf_size: 0,
        time: 1,
        id: String::new(),
    };

    let mut bad_stream = TcpStream::connect(("127.0.0.1", port as u16)).await.unwrap();
    {
        use tokio::io::AsyncWriteExt;
        bad_stream.write_all(&bad_req.encode()).await.unwrap();
    }
    // The server closes the connection after rejecting the version rather
    // than syncing; reading from it should observe EOF (0 bytes), not a
    // sync token.
    let mut buf = [0u8; 4];
    let n = bad_stream.read(&mut buf).await.unwrap_or(0);
    assert_eq!(n, 0);
    drop(bad_stream);

    // The same still-running server accepts a fresh, well-formed request
    // on the very next connection.
    let mut table = ParamTable::new();
    table.set_u32("--port", ParIndex::LPort, port).unwrap();
    table.set_u32("--port", ParIndex::RPort, port).unwrap();
    table.set_duration("--time", ParIndex::LTime, 1).unwrap();
    table.set_duration("--time", ParIndex::RTime, 1).unwrap();
    let test = registry.get(quit_index as usize).unwrap().clone();
    test.apply_defaults(&mut table).unwrap();
    Req::apply_client_defaults(&mut table).unwrap();
    let req = Req::from_remote_slots(&mut table, quit_index, "quit");
    let settings = Settings { wait_secs: Some(2), ..Settings::default() };
    let rt = qperf::protocol::client_run("127.0.0.1", req, table, settings, Some(2), &test, "quit")
        .await
        .expect("server keeps accepting after a rejected version mismatch");
    assert!(rt.successful);
}

#[tokio::test]
async fn udp_latency_end_to_end_reports_results() {
    let mut rt = run_case("udp_lat", next_port()).await;
    assert!(rt.successful);
    assert!(rt.local_stat.s.no_msgs > 0);

    let remote = rt.peer_stat.clone().unwrap();
    let res = derive_res(&rt.local_stat, &remote).expect("a full tick window elapsed");
    build_report(&mut rt, Measure::Latency, &res);
    let rendered = rt.show.place_show();
    assert!(rendered.contains("latency"));
}
