//! # CPU Affinity
//!
//! Thin wrapper over `core_affinity` for pinning the process to a
//! requested logical CPU. qperf's test bodies run on the current task
//! rather than a dedicated thread, so this just resolves a requested
//! core index and pins the calling OS thread directly.

use tracing::warn;

/// `0` means "no affinity requested" for the `affinity` parameter;
/// anything else is a 1-based core index.
pub fn core_for_index(affinity: u32) -> Option<usize> {
    if affinity == 0 {
        None
    } else {
        Some((affinity - 1) as usize)
    }
}

pub fn pin_current_thread(core_id: usize) {
    match core_affinity::get_core_ids() {
        Some(core_ids) => match core_ids.get(core_id) {
            Some(id) => {
                if !core_affinity::set_for_current(*id) {
                    warn!(core_id, "failed to set CPU affinity");
                }
            }
            None => warn!(core_id, available = core_ids.len(), "requested core out of range"),
        },
        None => warn!("CPU affinity not supported on this platform"),
    }
}
