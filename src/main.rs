//! # qperf Entry Point
//!
//! Parses argv against the option table in `cli.rs`, then either serves
//! forever (no client-side option/argument was seen) or runs exactly one
//! client-side test and prints its report before exiting: parse options,
//! decide client-vs-server from what was seen, then dispatch.

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::{filter::LevelFilter, prelude::*, Layer};

use qperf::cli::{parse_args, Mode, Settings};
use qperf::logging::ColorizedFormatter;
use qperf::params::ParamTable;
use qperf::registry::Registry;
use qperf::report::{build_report, Measure};
use qperf::request::Req;
use qperf::{calc, protocol};

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut table = ParamTable::new();

    let parsed = match parse_args(&argv, &mut table) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("qperf: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let verbosity = parsed
        .settings
        .verbose_conf
        .max(parsed.settings.verbose_stat)
        .max(parsed.settings.verbose_time)
        .max(parsed.settings.verbose_used);
    let _log_guard = init_logging(parsed.settings.debug, verbosity, parsed.settings.log_file.as_deref());

    match parsed.mode {
        Mode::Help(topic) => {
            print_help(&topic);
            ExitCode::SUCCESS
        }
        Mode::Version => {
            println!("qperf {}", Req::local_version_string());
            ExitCode::SUCCESS
        }
        Mode::Server { listen_port } => run_server(listen_port, parsed.settings.server_timeout),
        Mode::Client { server_name, test_name } => run_client(server_name, test_name, table, parsed.settings),
    }
}

/// Debug mode gets every span; `-v`/`-vv` step `DEBUG` in; plain runs
/// stay at `INFO`. Colorized, level-less output goes to stderr so a
/// client's report (printed to stdout) stays machine-parseable. With
/// `--log_file <path>`, a second uncolored layer also writes daily-rolling
/// files at that path; the returned guard must be held for the rest of
/// `main` or the non-blocking file writer is torn down immediately.
fn init_logging(debug: bool, verbosity: u32, log_file: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = if debug {
        LevelFilter::TRACE
    } else if verbosity >= 1 {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let (file_layer, guard) = match log_file {
        None | Some("stderr") => (None, None),
        Some(path_str) => {
            let log_path = std::path::Path::new(path_str);
            let log_dir = log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let log_filename = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("qperf.log"));
            let appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(level)
                .boxed();
            (Some(layer), Some(guard))
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .event_format(ColorizedFormatter)
                .with_filter(level),
        )
        .with(file_layer)
        .init();

    guard
}

fn print_help(topic: &str) {
    let registry = Registry::standard();
    println!("usage: qperf [options] [server [test]]");
    println!();
    println!("available tests: {}", registry.names().join(", "));
    if topic != "main" {
        println!();
        println!("no detailed help is available for '{}'", topic);
    }
}

fn run_server(listen_port: u32, server_timeout: u32) -> ExitCode {
    let registry = Registry::standard();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("qperf: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(protocol::serve(listen_port, server_timeout, &registry)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server exited: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_client(server_name: String, test_name: String, mut table: ParamTable, settings: Settings) -> ExitCode {
    let registry = Registry::standard();
    let test_index = match registry.index_of(&test_name) {
        Some(i) => i,
        None => {
            eprintln!("qperf: unknown test '{}'", test_name);
            return ExitCode::FAILURE;
        }
    };
    let test = registry.get(test_index).expect("index_of guarantees get succeeds").clone();

    if let Err(e) = test.apply_defaults(&mut table) {
        eprintln!("qperf: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = Req::apply_client_defaults(&mut table) {
        eprintln!("qperf: {}", e);
        return ExitCode::FAILURE;
    }
    let req = Req::from_remote_slots(&mut table, test_index as u32, &test_name);
    let wait_secs = settings.wait_secs;

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("qperf: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(protocol::client_run(
        &server_name,
        req,
        table,
        settings,
        wait_secs,
        &test,
        &test_name,
    ));

    match outcome {
        Ok(mut rt) => {
            if rt.successful {
                if let Some(measure) = measure_for(&test_name) {
                    let remote = rt.peer_stat.clone().unwrap_or_default();
                    match calc::derive_res(&rt.local_stat, &remote) {
                        Some(res) => build_report(&mut rt, measure, &res),
                        None => rt.successful = false,
                    }
                }
            }
            if !rt.show.is_empty() {
                print!("{}", rt.show.place_show());
            }
            if rt.successful {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `conf`/`quit` build their own report rows directly in `client()`;
/// only the measured transports get a headline/used/cost/rest report on
/// top of that.
fn measure_for(test_name: &str) -> Option<Measure> {
    match test_name {
        "tcp_bw" | "udp_bw" => Some(Measure::Bandwidth),
        "tcp_lat" | "udp_lat" => Some(Measure::Latency),
        _ => None,
    }
}
