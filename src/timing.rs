//! # Timing Engine
//!
//! Wall-clock bounding of a test plus paired start/end snapshots of CPU
//! tick counters. There are no blocking syscalls here that a signal
//! could interrupt; a `tokio::time::sleep` task sets `Finished` exactly
//! once when the deadline passes.
//!
//! Tick snapshot (`get_times`) re-reads `/proc/stat`'s `cpu` line from a
//! reopened file on each call rather than a persistent seekable fd
//! shared across tasks — cheap relative to a test's multi-second
//! duration, and it sidesteps sharing a raw fd across the timer task and
//! the test body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::QperfError;
use crate::stats::T_N;

/// Shared between the timer task and the test body. The test body polls
/// it to know when to stop sending/receiving; any message sent or
/// received after it flips is excluded from counters.
#[derive(Clone)]
pub struct Finished(Arc<AtomicBool>);

impl Finished {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed)
    }
}

impl Default for Finished {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticks per second, read once via `sysconf(_SC_CLK_TCK)`. Every qperf
/// process uses one value for the lifetime of the run.
pub fn ticks_per_second() -> u32 {
    let rc = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if rc <= 0 {
        100
    } else {
        rc as u32
    }
}

pub fn cpu_count() -> u32 {
    num_cpus::get() as u32
}

/// Snapshot `[real, user, nice, kernel, idle, iowait, irq, softirq,
/// steal]` tick counts. `real` comes from the monotonic tick clock
/// (`times()`-equivalent); the rest come from `/proc/stat`'s `cpu` line.
/// Missing trailing fields zero-fill (older kernels report fewer
/// columns).
pub fn get_times() -> Result<[u64; T_N], QperfError> {
    let mut times = [0u64; T_N];
    times[0] = real_ticks()?;

    let stat = std::fs::read_to_string("/proc/stat")
        .map_err(|e| QperfError::System { context: "reading /proc/stat".into(), source: e })?;
    let first_line = stat.lines().next().ok_or_else(|| {
        QperfError::Protocol("/proc/stat is empty".to_string())
    })?;
    let mut fields = first_line.split_whitespace();
    let label = fields.next().unwrap_or("");
    if label != "cpu" {
        return Err(QperfError::Protocol(
            "/proc/stat did not start with a cpu line".to_string(),
        ));
    }
    for slot in times[1..].iter_mut() {
        *slot = fields.next().and_then(|f| f.parse::<u64>().ok()).unwrap_or(0);
    }
    Ok(times)
}

/// Monotonic tick count since boot, used as the `real` category.
/// `libc::times` wraps the `times(2)` syscall without unsafe buffer
/// management beyond the single FFI call.
fn real_ticks() -> Result<u64, QperfError> {
    let mut tms: libc::tms = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::times(&mut tms) };
    if rc == -1 {
        return Err(QperfError::System {
            context: "times(2)".into(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(rc as u64)
}

/// Snapshot start ticks, then spawn the deadline task. `stop_timing`
/// (called by the test body once it notices `Finished`) is expected to
/// snapshot the end ticks itself; the timer task's only job is flipping
/// the flag so a test loop bounded purely by "keep sending until told
/// to stop" has something to poll.
///
/// `seconds == 0` means the test is bounded by `no_msgs` instead of a
/// duration (the client only defaults `--time` when `--no_msgs` was left
/// unset); no task is spawned and `Finished` never flips on its own, same
/// as the original's `start_timing` returning early without arming the
/// interval timer when `seconds` is zero.
pub fn start_timing(seconds: u32) -> (Finished, Option<tokio::task::JoinHandle<()>>) {
    let finished = Finished::new();
    if seconds == 0 {
        return (finished, None);
    }
    let handle = {
        let finished = finished.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds as u64)).await;
            finished.set();
        })
    };
    (finished, Some(handle))
}
