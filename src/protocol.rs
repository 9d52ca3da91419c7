//! # Control Protocol
//!
//! The request/synchronize/exchange sequence every test runs through,
//! plus the server's accept loop and the client's connect sequence.
//! No `fork`: the server awaits one connection's full
//! request→sync→test→exchange cycle before calling `accept` again,
//! which keeps only one active client at a time without needing
//! `waitpid` to reap forked children.

use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::error::QperfError;
use crate::io::{apply_sock_buf_size, deadline_from_now, read_exact_within, write_all_within};
use crate::registry::Registry;
use crate::request::{Req, REQ_SIZE};
use crate::runtime::{Role, Runtime};
use crate::stats::STAT_SIZE;

const SYNC_TOKEN: &[u8; 4] = b"SyN\0";

/// Two-phase exchange of the literal `"SyN\0"` token. Client sends then
/// receives; server receives then sends.
pub async fn sync_as_client(stream: &mut TcpStream, timeout_secs: u32) -> Result<(), QperfError> {
    let deadline = deadline_from_now(timeout_secs as u64);
    write_all_within(stream, SYNC_TOKEN, deadline).await?;
    let echoed = read_exact_within(stream, SYNC_TOKEN.len(), deadline).await?;
    check_sync(&echoed)
}

pub async fn sync_as_server(stream: &mut TcpStream, timeout_secs: u32) -> Result<(), QperfError> {
    let deadline = deadline_from_now(timeout_secs as u64);
    let received = read_exact_within(stream, SYNC_TOKEN.len(), deadline).await?;
    check_sync(&received)?;
    write_all_within(stream, SYNC_TOKEN, deadline).await
}

fn check_sync(data: &[u8]) -> Result<(), QperfError> {
    if data == SYNC_TOKEN {
        Ok(())
    } else {
        Err(QperfError::Protocol("sync failure: data does not match".to_string()))
    }
}

/// After both sides stop timing, swap full encoded `Stat`s and sync
/// once more to confirm loop exit. Client receives then syncs; server
/// sends then syncs.
pub async fn exchange_results_as_client(
    rt: &mut Runtime,
    stream: &mut TcpStream,
    timeout_secs: u32,
) -> Result<(), QperfError> {
    let deadline = deadline_from_now(timeout_secs as u64);
    let buf = read_exact_within(stream, STAT_SIZE, deadline).await?;
    rt.peer_stat = Some(crate::stats::Stat::decode(&buf)?);
    sync_as_client(stream, timeout_secs).await
}

pub async fn exchange_results_as_server(
    rt: &mut Runtime,
    stream: &mut TcpStream,
    timeout_secs: u32,
) -> Result<(), QperfError> {
    let deadline = deadline_from_now(timeout_secs as u64);
    write_all_within(stream, &rt.local_stat.encode(), deadline).await?;
    sync_as_server(stream, timeout_secs).await
}

/// Connect to `server_name:port`, retrying once per second while within
/// `wait_secs` if given, then frame-send the encoded `Req`.
pub async fn client_connect_and_send(
    server_name: &str,
    port: u32,
    req: &Req,
    wait_secs: Option<u32>,
    timeout_secs: u32,
) -> Result<TcpStream, QperfError> {
    let addr = format!("{}:{}", server_name, port);
    let budget = wait_secs.unwrap_or(0);
    let mut elapsed = 0u32;

    let mut stream = loop {
        match TcpStream::connect(&addr).await {
            Ok(s) => break s,
            Err(e) => {
                if elapsed >= budget {
                    return Err(QperfError::System { context: format!("connecting to {}", addr), source: e });
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
                elapsed += 1;
            }
        }
    };

    let deadline = deadline_from_now(timeout_secs as u64);
    write_all_within(&mut stream, &req.encode(), deadline).await?;
    Ok(stream)
}

/// Accept connections one at a time forever. Each connection runs its
/// whole request→sync→test→exchange cycle to completion (awaited, not
/// spawned) before the loop calls `accept` again.
pub async fn serve(listen_port: u32, server_timeout: u32, registry: &Registry) -> Result<(), QperfError> {
    let listener = TcpListener::bind(("0.0.0.0", listen_port as u16))
        .await
        .map_err(|e| QperfError::System { context: format!("binding port {}", listen_port), source: e })?;
    info!(port = listen_port, "qperf server listening");

    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed, continuing");
                continue;
            }
        };
        info!(%peer, "accepted connection");

        if let Err(e) = serve_one(&mut stream, server_timeout, registry).await {
            warn!(%peer, error = %e, "connection ended with an error");
        }
    }
}

async fn serve_one(
    stream: &mut TcpStream,
    server_timeout: u32,
    registry: &Registry,
) -> Result<(), QperfError> {
    let deadline = deadline_from_now(server_timeout as u64);
    let buf = read_exact_within(stream, REQ_SIZE, deadline).await?;
    let req = Req::decode(&buf)?;

    if !req.version_compatible() {
        warn!(
            "upgrade client from {} to {}",
            req.version_string(),
            Req::local_version_string()
        );
        return Err(QperfError::Protocol("version mismatch".to_string()));
    }

    let test = registry.get(req.req_index as usize).ok_or_else(|| {
        QperfError::Protocol(format!("bad request index: {}", req.req_index))
    })?;

    let table = crate::params::ParamTable::new();
    let settings = crate::cli::Settings::default();
    let mut rt = Runtime::new(Role::Server, table, req, &settings);
    if let Some(core_id) = crate::affinity::core_for_index(rt.req.affinity) {
        crate::affinity::pin_current_thread(core_id);
    }
    apply_sock_buf_size(stream, rt.req.sock_buf_size)?;

    sync_as_server(stream, server_timeout).await?;
    start_test_timing(&mut rt)?;

    let test_result = test.server(&mut rt, stream).await;
    rt.local_stat.time_e = crate::timing::get_times()?;
    if test_result.is_err() {
        rt.successful = false;
    }
    test_result?;

    let outcome = exchange_results_as_server(&mut rt, stream, server_timeout).await;
    rt.table.warn_unused(registry.name_at(rt.req.req_index as usize).unwrap_or("unknown"));
    outcome
}

/// Snapshot `no_cpus`/`no_ticks`/`time_s` and arm the deadline timer.
/// Shared by both the client and server sides so the window they both
/// start counts from right after the sync barrier completes.
fn start_test_timing(rt: &mut Runtime) -> Result<(), QperfError> {
    rt.local_stat.no_cpus = crate::timing::cpu_count();
    rt.local_stat.no_ticks = crate::timing::ticks_per_second();
    rt.local_stat.time_s = crate::timing::get_times()?;
    let (finished, _handle) = crate::timing::start_timing(rt.req.time);
    rt.finished = finished;
    Ok(())
}

/// Run one client-side test end to end: connect, send the request,
/// sync, run the timed test body, stop timing, exchange `Stat`s, and
/// combine counters. Returns the populated `Runtime` for the caller
/// (`main.rs`) to feed into the results calculator and presentation
/// layer.
pub async fn client_run(
    server_name: &str,
    req: Req,
    table: crate::params::ParamTable,
    settings: crate::cli::Settings,
    wait_secs: Option<u32>,
    test: &std::sync::Arc<dyn crate::registry::Test>,
    test_name: &str,
) -> Result<Runtime, QperfError> {
    let port = req.port;
    let timeout = req.timeout;
    let mut rt = Runtime::new(Role::Client, table, req, &settings);

    if let Some(core_id) = crate::affinity::core_for_index(rt.req.affinity) {
        crate::affinity::pin_current_thread(core_id);
    }

    let mut stream = client_connect_and_send(server_name, port, &rt.req, wait_secs, timeout).await?;
    apply_sock_buf_size(&stream, rt.req.sock_buf_size)?;

    if let Err(e) = sync_as_client(&mut stream, timeout).await {
        rt.successful = false;
        return Err(e);
    }
    start_test_timing(&mut rt)?;

    if let Err(e) = test.client(&mut rt, &mut stream).await {
        rt.successful = false;
        rt.local_stat.time_e = crate::timing::get_times().unwrap_or(rt.local_stat.time_s);
        rt.table.warn_unused(test_name);
        return Err(e);
    }
    rt.local_stat.time_e = crate::timing::get_times()?;

    if let Err(e) = exchange_results_as_client(&mut rt, &mut stream, timeout).await {
        rt.successful = false;
        rt.table.warn_unused(test_name);
        return Err(e);
    }

    if let Some(peer) = rt.peer_stat.clone() {
        rt.local_stat.combine_with_peer(&peer);
    }

    rt.table.warn_unused(test_name);
    Ok(rt)
}
