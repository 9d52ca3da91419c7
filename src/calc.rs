//! # Results Calculator
//!
//! Turns a pair of post-combination `Stat`s into the derived numbers a
//! test reports: real/CPU time, per-category CPU utilisation fractions,
//! latency, messaging rate, send/receive bandwidth, and send/receive
//! cost. Pure arithmetic over already-gathered counters; no I/O.

use crate::stats::Stat;

/// Per-side derived time and CPU-utilisation summary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Resn {
    pub time_real: f64,
    pub time_cpu: f64,
    pub frac_total: f64,
    pub frac_user: f64,
    pub frac_intr: f64,
    pub frac_kernel: f64,
    pub frac_idle: f64,
    pub frac_iowait: f64,
}

/// The full computed result of one test run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Res {
    pub l: Resn,
    pub r: Resn,
    pub latency: Option<f64>,
    pub msg_rate: Option<f64>,
    pub send_bw: Option<f64>,
    pub recv_bw: Option<f64>,
    pub send_cost: Option<f64>,
    pub recv_cost: Option<f64>,
}

/// CPU tick categories, matching `stats::T_N`'s index order.
const REAL: usize = 0;
const USER: usize = 1;
const NICE: usize = 2;
const KERNEL: usize = 3;
const IDLE: usize = 4;
const IOWAIT: usize = 5;
const IRQ: usize = 6;
const SOFTIRQ: usize = 7;
const STEAL: usize = 8;

/// Derive one side's `Resn` from its raw tick snapshots and the process
/// tick rate. Division by a zero real-tick delta yields all-zero
/// fractions rather than a panic or `NaN` propagating into the report.
pub fn derive_resn(stat: &Stat) -> Resn {
    let ticks = stat.no_ticks.max(1) as f64;
    let delta = |cat: usize| (stat.time_e[cat] as i64 - stat.time_s[cat] as i64).max(0) as f64;

    let real_delta = delta(REAL);
    let time_real = real_delta / ticks;

    let cpu_delta =
        delta(USER) + delta(NICE) + delta(KERNEL) + delta(IOWAIT) + delta(IRQ) + delta(SOFTIRQ) + delta(STEAL);
    let time_cpu = cpu_delta / ticks;

    if real_delta <= 0.0 {
        return Resn { time_real, time_cpu, ..Resn::default() };
    }

    Resn {
        time_real,
        time_cpu,
        frac_total: cpu_delta / real_delta,
        frac_user: (delta(USER) + delta(NICE)) / real_delta,
        frac_intr: (delta(IRQ) + delta(SOFTIRQ)) / real_delta,
        frac_kernel: delta(KERNEL) / real_delta,
        frac_idle: delta(IDLE) / real_delta,
        frac_iowait: delta(IOWAIT) / real_delta,
    }
}

/// Derive the full `Res` from both sides' (already combined) `Stat`s.
/// Returns `None` if either side's real time is zero, aborting the
/// derivation — this happens when a test ends before any timing window
/// elapsed, e.g. an immediate sync failure.
pub fn derive_res(local: &Stat, remote: &Stat) -> Option<Res> {
    let l = derive_resn(local);
    let r = derive_resn(remote);

    if l.time_real == 0.0 || r.time_real == 0.0 {
        return None;
    }

    let no_msgs = local.r.no_msgs + remote.r.no_msgs;
    let latency = if no_msgs > 0 {
        Some(l.time_real / no_msgs as f64)
    } else {
        None
    };

    let loc_time = l.time_real;
    let rem_time = r.time_real;
    let mid_time = (loc_time + rem_time) / 2.0;

    let msg_rate = rate_like(local.r.no_msgs, remote.r.no_msgs, loc_time, rem_time, mid_time);
    let send_bw = rate_like(local.s.no_bytes, remote.s.no_bytes, loc_time, rem_time, mid_time);
    let recv_bw = rate_like(local.r.no_bytes, remote.r.no_bytes, loc_time, rem_time, mid_time);

    let gb = 1_000_000_000.0;
    let send_cost = if local.s.no_bytes > 0 && local.r.no_bytes == 0 && remote.s.no_bytes == 0 {
        Some(l.time_cpu * gb / local.s.no_bytes as f64)
    } else if remote.s.no_bytes > 0 && remote.r.no_bytes == 0 && local.s.no_bytes == 0 {
        Some(r.time_cpu * gb / remote.s.no_bytes as f64)
    } else {
        None
    };
    let recv_cost = if remote.r.no_bytes > 0 && remote.s.no_bytes == 0 && local.r.no_bytes == 0 {
        Some(r.time_cpu * gb / remote.r.no_bytes as f64)
    } else if local.r.no_bytes > 0 && local.s.no_bytes == 0 && remote.r.no_bytes == 0 {
        Some(l.time_cpu * gb / local.r.no_bytes as f64)
    } else {
        None
    };

    Some(Res { l, r, latency, msg_rate, send_bw, recv_bw, send_cost, recv_cost })
}

/// Shared shape of the messaging-rate/bandwidth rules: if only one side
/// produced nonzero activity, divide by the *other* side's real time; if
/// both did, sum and divide by the midpoint time.
fn rate_like(loc_count: u64, rem_count: u64, loc_time: f64, rem_time: f64, mid_time: f64) -> Option<f64> {
    match (loc_count > 0, rem_count > 0) {
        (false, false) => None,
        (true, false) => Some(loc_count as f64 / rem_time),
        (false, true) => Some(rem_count as f64 / loc_time),
        (true, true) => Some((loc_count + rem_count) as f64 / mid_time),
    }
}
