//! # Statistics Model
//!
//! `UStat` is a (bytes, messages, errors) triple for one direction of a
//! transport. `Stat` bundles four of them (local send/receive, and what
//! the peer reported about its own send/receive) together with CPU tick
//! snapshots from `timing.rs`. Both are wire records that follow the
//! same encode/decode discipline as `Req`.

use crate::error::QperfError;
use crate::wire::{Cursor, Reader};

/// Tick-count categories read from `/proc/stat`'s `cpu` line, in order:
/// real (wall), user, nice, kernel (system), idle, iowait, irq, softirq,
/// steal.
pub const T_N: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UStat {
    pub no_bytes: u64,
    pub no_msgs: u64,
    pub no_errs: u64,
}

const USTAT_SIZE: usize = 24;

impl UStat {
    pub fn encode(&self, c: &mut Cursor<'_>) {
        c.enc_int(self.no_bytes, 8);
        c.enc_int(self.no_msgs, 8);
        c.enc_int(self.no_errs, 8);
    }

    pub fn decode(r: &mut Reader<'_>) -> UStat {
        UStat {
            no_bytes: r.dec_int(8),
            no_msgs: r.dec_int(8),
            no_errs: r.dec_int(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub no_cpus: u32,
    pub no_ticks: u32,
    pub max_cqes: u32,
    pub time_s: [u64; T_N],
    pub time_e: [u64; T_N],
    pub s: UStat,
    pub r: UStat,
    pub rem_s: UStat,
    pub rem_r: UStat,
}

pub const STAT_SIZE: usize = 4 + 4 + 4 + (T_N * 8) + (T_N * 8) + (USTAT_SIZE * 4);

impl Default for Stat {
    fn default() -> Self {
        Self {
            no_cpus: 0,
            no_ticks: 0,
            max_cqes: 0,
            time_s: [0; T_N],
            time_e: [0; T_N],
            s: UStat::default(),
            r: UStat::default(),
            rem_s: UStat::default(),
            rem_r: UStat::default(),
        }
    }
}

impl Stat {
    pub fn encode(&self) -> [u8; STAT_SIZE] {
        let mut buf = [0u8; STAT_SIZE];
        let mut c = Cursor::new(&mut buf);
        c.enc_int(self.no_cpus as u64, 4);
        c.enc_int(self.no_ticks as u64, 4);
        c.enc_int(self.max_cqes as u64, 4);
        for t in &self.time_s {
            c.enc_int(*t, 8);
        }
        for t in &self.time_e {
            c.enc_int(*t, 8);
        }
        self.s.encode(&mut c);
        self.r.encode(&mut c);
        self.rem_s.encode(&mut c);
        self.rem_r.encode(&mut c);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Stat, QperfError> {
        if buf.len() != STAT_SIZE {
            return Err(QperfError::Protocol(format!(
                "malformed stat record: expected {} bytes, got {}",
                STAT_SIZE,
                buf.len()
            )));
        }
        let mut r = Reader::new(buf);
        let no_cpus = r.dec_int(4) as u32;
        let no_ticks = r.dec_int(4) as u32;
        let max_cqes = r.dec_int(4) as u32;
        let mut time_s = [0u64; T_N];
        for slot in &mut time_s {
            *slot = r.dec_int(8);
        }
        let mut time_e = [0u64; T_N];
        for slot in &mut time_e {
            *slot = r.dec_int(8);
        }
        Ok(Stat {
            no_cpus,
            no_ticks,
            max_cqes,
            time_s,
            time_e,
            s: UStat::decode(&mut r),
            r: UStat::decode(&mut r),
            rem_s: UStat::decode(&mut r),
            rem_r: UStat::decode(&mut r),
        })
    }

    /// Fold the peer's self-reported send/receive counts into this
    /// side's local counts: lets a transport that can only observe
    /// traffic from one side still report symmetric totals once both
    /// `Stat`s have been exchanged.
    pub fn combine_with_peer(&mut self, peer: &Stat) {
        self.s.no_bytes += peer.rem_s.no_bytes;
        self.s.no_msgs += peer.rem_s.no_msgs;
        self.s.no_errs += peer.rem_s.no_errs;
        self.r.no_bytes += peer.rem_r.no_bytes;
        self.r.no_msgs += peer.rem_r.no_msgs;
        self.r.no_errs += peer.rem_r.no_errs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Stat {
        Stat {
            no_cpus: 8,
            no_ticks: 100,
            max_cqes: 0,
            time_s: [1, 2, 3, 4, 5, 6, 7, 8, 9],
            time_e: [10, 20, 30, 40, 50, 60, 70, 80, 90],
            s: UStat { no_bytes: 1000, no_msgs: 10, no_errs: 0 },
            r: UStat { no_bytes: 0, no_msgs: 0, no_errs: 0 },
            rem_s: UStat { no_bytes: 0, no_msgs: 0, no_errs: 0 },
            rem_r: UStat { no_bytes: 1000, no_msgs: 10, no_errs: 0 },
        }
    }

    #[test]
    fn round_trip_matches_bit_for_bit() {
        let stat = sample();
        let decoded = Stat::decode(&stat.encode()).unwrap();
        assert_eq!(stat, decoded);
    }

    #[test]
    fn combine_adds_peer_reported_counts() {
        let mut local = sample();
        let peer = sample();
        let original_send_bytes = local.s.no_bytes;
        local.combine_with_peer(&peer);
        assert_eq!(local.s.no_bytes, original_send_bytes + peer.rem_s.no_bytes);
        assert_eq!(local.r.no_bytes, sample().r.no_bytes + peer.rem_r.no_bytes);
    }

    #[test]
    fn wrong_length_buffer_is_rejected() {
        let err = Stat::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, QperfError::Protocol(_)));
    }
}
