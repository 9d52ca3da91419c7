//! # Command-Line Interface
//!
//! The option grammar is positional-and-flag mixed (bare hostname, bare
//! test name, flags interleaved anywhere) and doesn't fit a declarative
//! derive-style parser, so this walks `argv` token by token against a
//! static option table. See DESIGN.md for why `clap` was dropped in
//! favour of this.

use crate::error::QperfError;
use crate::params::{ParIndex, ParamTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    /// Next token parses as an unsigned integer; stored as-is in both
    /// declared slots.
    Long,
    /// Next token parses with `k/m/g` (decimal) or `K/M/G` (binary)
    /// size suffixes.
    Size,
    /// Next token parses with `s/m/h/d` time suffixes into seconds.
    Time,
    /// Next token is copied verbatim (bounded by `STRSIZE`).
    Str,
    Help,
    Version,
    Misc(Misc),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Misc {
    Verbose,
    VeryVerbose,
    VerboseConf,
    VerboseStat,
    VerboseTime,
    VerboseUsed,
    VerboseMoreConf,
    VerboseMoreStat,
    VerboseMoreTime,
    VerboseMoreUsed,
    UnifyUnits,
    UnifyNodes,
    Wait,
    Debug,
    Precision,
    ListenPort,
    ServerTimeout,
    LogFile,
    Host,
}

/// One row of the static option table: a long name, whether it's valid
/// when running as a server, the handler kind, and up to two parameter
/// slots the handler fans a value out to.
struct OptionRow {
    name: &'static str,
    server_valid: bool,
    handler: Handler,
    slots: &'static [ParIndex],
}

const OPTIONS: &[OptionRow] = &[
    OptionRow { name: "--msg_size", server_valid: false, handler: Handler::Size, slots: &[ParIndex::LMsgSize, ParIndex::RMsgSize] },
    OptionRow { name: "--loc_msg_size", server_valid: false, handler: Handler::Size, slots: &[ParIndex::LMsgSize] },
    OptionRow { name: "--rem_msg_size", server_valid: false, handler: Handler::Size, slots: &[ParIndex::RMsgSize] },
    OptionRow { name: "--mtu_size", server_valid: false, handler: Handler::Size, slots: &[ParIndex::LMtuSize, ParIndex::RMtuSize] },
    OptionRow { name: "--sock_buf_size", server_valid: false, handler: Handler::Size, slots: &[ParIndex::LSockBufSize, ParIndex::RSockBufSize] },
    OptionRow { name: "--no_msgs", server_valid: false, handler: Handler::Long, slots: &[ParIndex::LNoMsgs, ParIndex::RNoMsgs] },
    OptionRow { name: "--time", server_valid: false, handler: Handler::Time, slots: &[ParIndex::LTime, ParIndex::RTime] },
    OptionRow { name: "--timeout", server_valid: false, handler: Handler::Time, slots: &[ParIndex::LTimeout, ParIndex::RTimeout] },
    OptionRow { name: "--port", server_valid: true, handler: Handler::Long, slots: &[ParIndex::LPort, ParIndex::RPort] },
    OptionRow { name: "--affinity", server_valid: false, handler: Handler::Long, slots: &[ParIndex::LAffinity, ParIndex::RAffinity] },
    OptionRow { name: "--poll_mode", server_valid: false, handler: Handler::Long, slots: &[ParIndex::LPoll, ParIndex::RPoll] },
    OptionRow { name: "--rd_atomic", server_valid: false, handler: Handler::Long, slots: &[ParIndex::LRdAtomic, ParIndex::RRdAtomic] },
    OptionRow { name: "--access_recv", server_valid: false, handler: Handler::Long, slots: &[ParIndex::LAccessRecv, ParIndex::RAccessRecv] },
    OptionRow { name: "--flip", server_valid: false, handler: Handler::Long, slots: &[ParIndex::LFlip, ParIndex::RFlip] },
    OptionRow { name: "--id", server_valid: false, handler: Handler::Str, slots: &[ParIndex::LId, ParIndex::RId] },
    OptionRow { name: "--rate", server_valid: false, handler: Handler::Str, slots: &[ParIndex::LRate, ParIndex::RRate] },
    OptionRow { name: "-v", server_valid: true, handler: Handler::Misc(Misc::Verbose), slots: &[] },
    OptionRow { name: "--verbose", server_valid: true, handler: Handler::Misc(Misc::Verbose), slots: &[] },
    OptionRow { name: "-vv", server_valid: true, handler: Handler::Misc(Misc::VeryVerbose), slots: &[] },
    OptionRow { name: "--verbose_more", server_valid: true, handler: Handler::Misc(Misc::VeryVerbose), slots: &[] },
    OptionRow { name: "-vc", server_valid: false, handler: Handler::Misc(Misc::VerboseConf), slots: &[] },
    OptionRow { name: "--verbose_conf", server_valid: false, handler: Handler::Misc(Misc::VerboseConf), slots: &[] },
    OptionRow { name: "-vs", server_valid: false, handler: Handler::Misc(Misc::VerboseStat), slots: &[] },
    OptionRow { name: "--verbose_stat", server_valid: false, handler: Handler::Misc(Misc::VerboseStat), slots: &[] },
    OptionRow { name: "-vt", server_valid: false, handler: Handler::Misc(Misc::VerboseTime), slots: &[] },
    OptionRow { name: "--verbose_time", server_valid: false, handler: Handler::Misc(Misc::VerboseTime), slots: &[] },
    OptionRow { name: "-vu", server_valid: false, handler: Handler::Misc(Misc::VerboseUsed), slots: &[] },
    OptionRow { name: "--verbose_used", server_valid: false, handler: Handler::Misc(Misc::VerboseUsed), slots: &[] },
    OptionRow { name: "-vC", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreConf), slots: &[] },
    OptionRow { name: "--verbose_more_conf", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreConf), slots: &[] },
    OptionRow { name: "-vS", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreStat), slots: &[] },
    OptionRow { name: "--verbose_more_stat", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreStat), slots: &[] },
    OptionRow { name: "-vT", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreTime), slots: &[] },
    OptionRow { name: "--verbose_more_time", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreTime), slots: &[] },
    OptionRow { name: "-vU", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreUsed), slots: &[] },
    OptionRow { name: "--verbose_more_used", server_valid: false, handler: Handler::Misc(Misc::VerboseMoreUsed), slots: &[] },
    OptionRow { name: "-u", server_valid: true, handler: Handler::Misc(Misc::UnifyUnits), slots: &[] },
    OptionRow { name: "--unify_units", server_valid: true, handler: Handler::Misc(Misc::UnifyUnits), slots: &[] },
    OptionRow { name: "-U", server_valid: false, handler: Handler::Misc(Misc::UnifyNodes), slots: &[] },
    OptionRow { name: "--unify_nodes", server_valid: false, handler: Handler::Misc(Misc::UnifyNodes), slots: &[] },
    OptionRow { name: "-H", server_valid: false, handler: Handler::Misc(Misc::Host), slots: &[] },
    OptionRow { name: "--host", server_valid: false, handler: Handler::Misc(Misc::Host), slots: &[] },
    OptionRow { name: "-W", server_valid: false, handler: Handler::Misc(Misc::Wait), slots: &[] },
    OptionRow { name: "--wait", server_valid: false, handler: Handler::Misc(Misc::Wait), slots: &[] },
    OptionRow { name: "-D", server_valid: true, handler: Handler::Misc(Misc::Debug), slots: &[] },
    OptionRow { name: "--debug", server_valid: true, handler: Handler::Misc(Misc::Debug), slots: &[] },
    OptionRow { name: "-e", server_valid: false, handler: Handler::Misc(Misc::Precision), slots: &[] },
    OptionRow { name: "--precision", server_valid: false, handler: Handler::Misc(Misc::Precision), slots: &[] },
    OptionRow { name: "-lp", server_valid: true, handler: Handler::Misc(Misc::ListenPort), slots: &[] },
    OptionRow { name: "--listen_port", server_valid: true, handler: Handler::Misc(Misc::ListenPort), slots: &[] },
    OptionRow { name: "-st", server_valid: true, handler: Handler::Misc(Misc::ServerTimeout), slots: &[] },
    OptionRow { name: "--server_timeout", server_valid: true, handler: Handler::Misc(Misc::ServerTimeout), slots: &[] },
    OptionRow { name: "--log_file", server_valid: true, handler: Handler::Misc(Misc::LogFile), slots: &[] },
    OptionRow { name: "-h", server_valid: true, handler: Handler::Help, slots: &[] },
    OptionRow { name: "--help", server_valid: true, handler: Handler::Help, slots: &[] },
    OptionRow { name: "-V", server_valid: true, handler: Handler::Version, slots: &[] },
    OptionRow { name: "--version", server_valid: true, handler: Handler::Version, slots: &[] },
];

/// What `parse_args` decided to do; `main.rs` matches on this.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Server { listen_port: u32 },
    Client { server_name: String, test_name: String },
    Help(String),
    Version,
}

/// Mutable accumulator for the `misc` toggles; everything else lands
/// directly in the `ParamTable`.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Four independent counters, each 0/1/2: `-vc`/`-vC` etc. set one
    /// at a time, `-v`/`-vv` set all four together.
    pub verbose_conf: u32,
    pub verbose_stat: u32,
    pub verbose_time: u32,
    pub verbose_used: u32,
    pub unify_units: bool,
    /// Forces the `loc_`/`rem_` pairing in totals even when traffic was
    /// one-directional; suppresses the `send_*`/`recv_*` collapse.
    pub unify_nodes: bool,
    pub wait_secs: Option<u32>,
    pub debug: bool,
    pub precision: u32,
    pub listen_port: u32,
    pub server_timeout: u32,
    /// Diagnostic channel destination. `None` means stderr only;
    /// `Some("stderr")` is the same thing spelled explicitly;
    /// `Some(path)` adds a daily-rolling file sink at `path`.
    pub log_file: Option<String>,
    /// Server name set via `-H`/`--host`, merged with the bare
    /// positional hostname token if both are given the latter wins.
    pub host: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose_conf: 0,
            verbose_stat: 0,
            verbose_time: 0,
            verbose_used: 0,
            unify_units: false,
            unify_nodes: false,
            wait_secs: None,
            debug: false,
            precision: 3,
            listen_port: 19765,
            server_timeout: 5,
            log_file: None,
            host: None,
        }
    }
}

pub struct ParsedArgs {
    pub mode: Mode,
    pub settings: Settings,
}

/// Walk `argv` left to right. The first bare (non-`-`) token is the
/// server hostname; the second is a test name, which triggers client
/// mode immediately once both are seen.
pub fn parse_args(argv: &[String], table: &mut ParamTable) -> Result<ParsedArgs, QperfError> {
    let mut settings = Settings::default();
    let mut test_name: Option<String> = None;
    let mut saw_non_server_option = false;

    let mut i = 0;
    while i < argv.len() {
        let tok = &argv[i];
        if let Some(stripped) = tok.strip_prefix('-') {
            if stripped.is_empty() {
                return Err(QperfError::Usage(format!("unknown option: {}", tok)));
            }
            let row = OPTIONS
                .iter()
                .find(|o| o.name == tok)
                .ok_or_else(|| QperfError::Usage(format!("unknown option: {}", tok)))?;
            if !row.server_valid {
                saw_non_server_option = true;
            }
            i += 1;
            match row.handler {
                Handler::Help => {
                    let topic = argv.get(i).cloned().unwrap_or_else(|| "main".to_string());
                    return Ok(ParsedArgs { mode: Mode::Help(topic), settings });
                }
                Handler::Version => {
                    return Ok(ParsedArgs { mode: Mode::Version, settings });
                }
                _ => {
                    i = apply_handler(row, argv, i, table, &mut settings)?;
                }
            }
        } else if settings.host.is_none() {
            settings.host = Some(tok.clone());
            saw_non_server_option = true;
            i += 1;
        } else if test_name.is_none() {
            test_name = Some(tok.clone());
            i += 1;
        } else {
            return Err(QperfError::Usage(format!("unexpected argument: {}", tok)));
        }
    }

    let is_client = saw_non_server_option || settings.host.is_some() || test_name.is_some();

    if !is_client {
        return Ok(ParsedArgs { mode: Mode::Server { listen_port: settings.listen_port }, settings });
    }

    let server_name = settings.host.clone();
    match (server_name, test_name) {
        (Some(server_name), Some(test_name)) => {
            Ok(ParsedArgs { mode: Mode::Client { server_name, test_name }, settings })
        }
        _ => Err(QperfError::Usage(
            "Do you want to be a client or server?".to_string(),
        )),
    }
}

fn apply_handler(
    row: &OptionRow,
    argv: &[String],
    mut i: usize,
    table: &mut ParamTable,
    settings: &mut Settings,
) -> Result<usize, QperfError> {
    let take_arg = |i: usize| -> Result<&String, QperfError> {
        argv.get(i).ok_or_else(|| QperfError::Usage(format!("{} requires an argument", row.name)))
    };

    match row.handler {
        Handler::Long => {
            let raw = take_arg(i)?;
            let value: u32 = raw
                .parse()
                .map_err(|_| QperfError::Usage(format!("{}: expected an integer, got {}", row.name, raw)))?;
            for slot in row.slots {
                table.set_u32(row.name, *slot, value)?;
            }
            i += 1;
        }
        Handler::Size => {
            let raw = take_arg(i)?;
            let value = parse_size(raw)?;
            for slot in row.slots {
                table.set_size(row.name, *slot, value)?;
            }
            i += 1;
        }
        Handler::Time => {
            let raw = take_arg(i)?;
            let value = parse_time(raw)?;
            for slot in row.slots {
                table.set_duration(row.name, *slot, value)?;
            }
            i += 1;
        }
        Handler::Str => {
            let raw = take_arg(i)?;
            if raw.len() >= crate::request::STRSIZE {
                return Err(QperfError::Usage(format!(
                    "{}: value too long (max {} bytes)",
                    row.name,
                    crate::request::STRSIZE - 1
                )));
            }
            for slot in row.slots {
                table.set_str(row.name, *slot, raw)?;
            }
            i += 1;
        }
        Handler::Help | Handler::Version => unreachable!("handled by the caller before dispatch"),
        Handler::Misc(misc) => match misc {
            Misc::Verbose => {
                settings.verbose_conf = settings.verbose_conf.max(1);
                settings.verbose_stat = settings.verbose_stat.max(1);
                settings.verbose_time = settings.verbose_time.max(1);
                settings.verbose_used = settings.verbose_used.max(1);
            }
            Misc::VeryVerbose => {
                settings.verbose_conf = settings.verbose_conf.max(2);
                settings.verbose_stat = settings.verbose_stat.max(2);
                settings.verbose_time = settings.verbose_time.max(2);
                settings.verbose_used = settings.verbose_used.max(2);
            }
            Misc::VerboseConf => settings.verbose_conf = settings.verbose_conf.max(1),
            Misc::VerboseStat => settings.verbose_stat = settings.verbose_stat.max(1),
            Misc::VerboseTime => settings.verbose_time = settings.verbose_time.max(1),
            Misc::VerboseUsed => settings.verbose_used = settings.verbose_used.max(1),
            Misc::VerboseMoreConf => settings.verbose_conf = settings.verbose_conf.max(2),
            Misc::VerboseMoreStat => settings.verbose_stat = settings.verbose_stat.max(2),
            Misc::VerboseMoreTime => settings.verbose_time = settings.verbose_time.max(2),
            Misc::VerboseMoreUsed => settings.verbose_used = settings.verbose_used.max(2),
            Misc::UnifyUnits => settings.unify_units = true,
            Misc::UnifyNodes => settings.unify_nodes = true,
            Misc::Host => {
                let raw = take_arg(i)?;
                if raw.len() >= crate::request::STRSIZE {
                    return Err(QperfError::Usage(format!(
                        "{}: value too long (max {} bytes)",
                        row.name,
                        crate::request::STRSIZE - 1
                    )));
                }
                settings.host = Some(raw.clone());
                i += 1;
            }
            Misc::Debug => settings.debug = true,
            Misc::Wait => {
                let raw = take_arg(i)?;
                settings.wait_secs = Some(
                    raw.parse()
                        .map_err(|_| QperfError::Usage(format!("--wait: expected an integer, got {}", raw)))?,
                );
                i += 1;
            }
            Misc::Precision => {
                let raw = take_arg(i)?;
                settings.precision = raw
                    .parse()
                    .map_err(|_| QperfError::Usage(format!("{}: expected an integer, got {}", row.name, raw)))?;
                i += 1;
            }
            Misc::ListenPort => {
                let raw = take_arg(i)?;
                settings.listen_port = raw
                    .parse()
                    .map_err(|_| QperfError::Usage(format!("{}: expected an integer, got {}", row.name, raw)))?;
                i += 1;
            }
            Misc::ServerTimeout => {
                let raw = take_arg(i)?;
                settings.server_timeout = raw
                    .parse()
                    .map_err(|_| QperfError::Usage(format!("{}: expected an integer, got {}", row.name, raw)))?;
                i += 1;
            }
            Misc::LogFile => {
                let raw = take_arg(i)?;
                settings.log_file = Some(raw.clone());
                i += 1;
            }
        },
    }
    Ok(i)
}

/// `<number>[k|m|g|K|M|G|kb|mb|gb|kib|mib|gib]`. Single-letter lowercase
/// and the `kb`/`mb`/`gb` long forms are decimal (1e3/1e6/1e9);
/// single-letter uppercase and `kib`/`mib`/`gib` are binary
/// (1024/1024²/1024³). No suffix is bytes. Floating point is accepted
/// and the result truncated. Longer suffixes are matched before shorter
/// ones so `"1gb"` isn't mistaken for a bare `"1g"` with a trailing
/// `"b"` left over.
fn parse_size(raw: &str) -> Result<u64, QperfError> {
    const SUFFIXES: &[(&str, f64)] = &[
        ("kib", 1024.0),
        ("mib", 1024.0 * 1024.0),
        ("gib", 1024.0 * 1024.0 * 1024.0),
        ("kb", 1_000.0),
        ("mb", 1_000_000.0),
        ("gb", 1_000_000_000.0),
        ("K", 1024.0),
        ("M", 1024.0 * 1024.0),
        ("G", 1024.0 * 1024.0 * 1024.0),
        ("k", 1_000.0),
        ("m", 1_000_000.0),
        ("g", 1_000_000_000.0),
    ];
    let (number_part, multiplier) = SUFFIXES
        .iter()
        .find(|(suffix, _)| raw.len() > suffix.len() && raw.ends_with(suffix))
        .map(|(suffix, mult)| (&raw[..raw.len() - suffix.len()], *mult))
        .unwrap_or((raw, 1.0));
    let value: f64 = number_part
        .parse()
        .map_err(|_| QperfError::Usage(format!("invalid size: {}", raw)))?;
    Ok((value * multiplier) as u64)
}

/// `<number>[s|S|m|M|h|H|d|D]`. No suffix is seconds.
fn parse_time(raw: &str) -> Result<u64, QperfError> {
    let (number_part, multiplier) = match raw.chars().last() {
        Some('s') | Some('S') => (&raw[..raw.len() - 1], 1u64),
        Some('m') | Some('M') => (&raw[..raw.len() - 1], 60),
        Some('h') | Some('H') => (&raw[..raw.len() - 1], 3600),
        Some('d') | Some('D') => (&raw[..raw.len() - 1], 86400),
        _ => (raw, 1),
    };
    let value: f64 = number_part
        .parse()
        .map_err(|_| QperfError::Usage(format!("invalid time: {}", raw)))?;
    Ok((value * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_selects_server_mode() {
        let mut table = ParamTable::new();
        let parsed = parse_args(&[], &mut table).unwrap();
        assert!(matches!(parsed.mode, Mode::Server { .. }));
    }

    #[test]
    fn host_and_test_selects_client_mode() {
        let mut table = ParamTable::new();
        let argv = vec!["host-a".to_string(), "tcp_bw".to_string()];
        let parsed = parse_args(&argv, &mut table).unwrap();
        match parsed.mode {
            Mode::Client { server_name, test_name } => {
                assert_eq!(server_name, "host-a");
                assert_eq!(test_name, "tcp_bw");
            }
            _ => panic!("expected client mode"),
        }
    }

    #[test]
    fn host_without_test_is_ambiguous() {
        let mut table = ParamTable::new();
        let argv = vec!["host-a".to_string()];
        let err = parse_args(&argv, &mut table).unwrap_err();
        assert!(matches!(err, QperfError::Usage(_)));
    }

    #[test]
    fn size_suffix_mixed_decimal_and_binary_forms() {
        assert_eq!(parse_size("1k").unwrap(), 1000);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1.5G").unwrap(), 1_610_612_736);
        assert_eq!(parse_size("1gb").unwrap(), 1_000_000_000);
        assert_eq!(parse_size("1gib").unwrap(), 1_073_741_824);
    }

    #[test]
    fn size_suffix_parses_binary_and_decimal() {
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("1m").unwrap(), 1_000_000);
        assert_eq!(parse_size("65536").unwrap(), 65536);
    }

    #[test]
    fn time_suffix_parses_minutes() {
        assert_eq!(parse_time("2m").unwrap(), 120);
        assert_eq!(parse_time("5").unwrap(), 5);
    }

    #[test]
    fn msg_size_option_fans_out_to_both_slots() {
        let mut table = ParamTable::new();
        let argv = vec!["--msg_size".to_string(), "4096".to_string(), "host-a".to_string(), "tcp_bw".to_string()];
        parse_args(&argv, &mut table).unwrap();
        assert_eq!(table.peek(ParIndex::LMsgSize).unwrap().as_u64(), 4096);
        assert_eq!(table.peek(ParIndex::RMsgSize).unwrap().as_u64(), 4096);
    }

    #[test]
    fn log_file_option_is_captured_in_settings() {
        let mut table = ParamTable::new();
        let argv = vec!["--log_file".to_string(), "/tmp/qperf.log".to_string(), "host-a".to_string(), "tcp_bw".to_string()];
        let parsed = parse_args(&argv, &mut table).unwrap();
        assert_eq!(parsed.settings.log_file.as_deref(), Some("/tmp/qperf.log"));
    }

    #[test]
    fn loc_prefixed_option_assigns_single_slot() {
        let mut table = ParamTable::new();
        let argv = vec!["--loc_msg_size".to_string(), "4096".to_string(), "host-a".to_string(), "tcp_bw".to_string()];
        parse_args(&argv, &mut table).unwrap();
        assert!(table.is_set(ParIndex::LMsgSize).unwrap());
        assert!(!table.is_set(ParIndex::RMsgSize).unwrap());
    }

    #[test]
    fn host_option_sets_server_name_without_a_positional_token() {
        let mut table = ParamTable::new();
        let argv = vec!["--host".to_string(), "host-a".to_string(), "tcp_bw".to_string()];
        let parsed = parse_args(&argv, &mut table).unwrap();
        match parsed.mode {
            Mode::Client { server_name, test_name } => {
                assert_eq!(server_name, "host-a");
                assert_eq!(test_name, "tcp_bw");
            }
            _ => panic!("expected client mode"),
        }
    }

    #[test]
    fn short_aliases_parse_like_their_long_forms() {
        let mut table = ParamTable::new();
        let argv = vec![
            "-lp".to_string(),
            "20000".to_string(),
            "-st".to_string(),
            "10".to_string(),
            "-W".to_string(),
            "3".to_string(),
            "host-a".to_string(),
            "tcp_bw".to_string(),
        ];
        let parsed = parse_args(&argv, &mut table).unwrap();
        assert_eq!(parsed.settings.listen_port, 20000);
        assert_eq!(parsed.settings.server_timeout, 10);
        assert_eq!(parsed.settings.wait_secs, Some(3));
    }

    #[test]
    fn per_category_verbose_flags_set_only_their_own_counter() {
        let mut table = ParamTable::new();
        let argv = vec!["-vs".to_string(), "-vT".to_string(), "host-a".to_string(), "tcp_bw".to_string()];
        let parsed = parse_args(&argv, &mut table).unwrap();
        assert_eq!(parsed.settings.verbose_stat, 1);
        assert_eq!(parsed.settings.verbose_time, 2);
        assert_eq!(parsed.settings.verbose_conf, 0);
        assert_eq!(parsed.settings.verbose_used, 0);
    }

    #[test]
    fn unify_nodes_flag_is_captured_in_settings() {
        let mut table = ParamTable::new();
        let argv = vec!["--unify_nodes".to_string(), "host-a".to_string(), "tcp_bw".to_string()];
        let parsed = parse_args(&argv, &mut table).unwrap();
        assert!(parsed.settings.unify_nodes);
    }
}
