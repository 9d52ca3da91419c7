//! # Request Record
//!
//! `Req` is the fixed-layout bundle the client sends immediately after
//! connecting: protocol version, test selector, and the parameter values
//! the server side needs. Field order and widths are the wire contract;
//! adding, removing, or reordering a field is a protocol version bump,
//! not a patch.

use crate::error::QperfError;
use crate::params::{ParIndex, ParValue, ParamTable};
use crate::wire::{Cursor, Reader};

/// Length of every fixed string field on the wire (`id`, and the four
/// `conf`-test strings in `Conf`).
pub const STRSIZE: usize = 64;

pub const VER_MAJ: u32 = 0;
pub const VER_MIN: u32 = 2;
pub const VER_INC: u32 = 0;

/// Width, in bytes, of each `Req` field in on-wire order. 1 byte per
/// version component (never expected to exceed 255), 4 bytes for the
/// selector and the small integer parameters, 8 bytes for the
/// size/count parameters that must hold multi-gigabyte transfers.
const FIELD_WIDTHS: &[usize] = &[
    1, 1, 1, // ver_maj, ver_min, ver_inc
    4, // req_index
    4, // flip
    4, // access_recv
    4, // affinity
    4, // poll_mode
    4, // port
    4, // rd_atomic
    4, // timeout
    8, // msg_size
    8, // mtu_size
    8, // no_msgs
    8, // sock_buf_size
    4, // time
    STRSIZE as usize, // id
];

pub const REQ_SIZE: usize = {
    let mut total = 0;
    let mut i = 0;
    while i < FIELD_WIDTHS.len() {
        total += FIELD_WIDTHS[i];
        i += 1;
    }
    total
};

#[derive(Debug, Clone, PartialEq)]
pub struct Req {
    pub ver_maj: u32,
    pub ver_min: u32,
    pub ver_inc: u32,
    pub req_index: u32,
    pub flip: u32,
    pub access_recv: u32,
    pub affinity: u32,
    pub poll_mode: u32,
    pub port: u32,
    pub rd_atomic: u32,
    pub timeout: u32,
    pub msg_size: u64,
    pub mtu_size: u64,
    pub no_msgs: u64,
    pub sock_buf_size: u64,
    pub time: u32,
    pub id: String,
}

impl Req {
    pub fn encode(&self) -> [u8; REQ_SIZE] {
        let mut buf = [0u8; REQ_SIZE];
        let mut c = Cursor::new(&mut buf);
        c.enc_int(self.ver_maj as u64, FIELD_WIDTHS[0]);
        c.enc_int(self.ver_min as u64, FIELD_WIDTHS[1]);
        c.enc_int(self.ver_inc as u64, FIELD_WIDTHS[2]);
        c.enc_int(self.req_index as u64, FIELD_WIDTHS[3]);
        c.enc_int(self.flip as u64, FIELD_WIDTHS[4]);
        c.enc_int(self.access_recv as u64, FIELD_WIDTHS[5]);
        c.enc_int(self.affinity as u64, FIELD_WIDTHS[6]);
        c.enc_int(self.poll_mode as u64, FIELD_WIDTHS[7]);
        c.enc_int(self.port as u64, FIELD_WIDTHS[8]);
        c.enc_int(self.rd_atomic as u64, FIELD_WIDTHS[9]);
        c.enc_int(self.timeout as u64, FIELD_WIDTHS[10]);
        c.enc_int(self.msg_size, FIELD_WIDTHS[11]);
        c.enc_int(self.mtu_size, FIELD_WIDTHS[12]);
        c.enc_int(self.no_msgs, FIELD_WIDTHS[13]);
        c.enc_int(self.sock_buf_size, FIELD_WIDTHS[14]);
        c.enc_int(self.time as u64, FIELD_WIDTHS[15]);
        c.enc_str(&self.id, FIELD_WIDTHS[16]);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Req, QperfError> {
        if buf.len() != REQ_SIZE {
            return Err(QperfError::Protocol(format!(
                "malformed request: expected {} bytes, got {}",
                REQ_SIZE,
                buf.len()
            )));
        }
        let mut r = Reader::new(buf);
        Ok(Req {
            ver_maj: r.dec_int(FIELD_WIDTHS[0]) as u32,
            ver_min: r.dec_int(FIELD_WIDTHS[1]) as u32,
            ver_inc: r.dec_int(FIELD_WIDTHS[2]) as u32,
            req_index: r.dec_int(FIELD_WIDTHS[3]) as u32,
            flip: r.dec_int(FIELD_WIDTHS[4]) as u32,
            access_recv: r.dec_int(FIELD_WIDTHS[5]) as u32,
            affinity: r.dec_int(FIELD_WIDTHS[6]) as u32,
            poll_mode: r.dec_int(FIELD_WIDTHS[7]) as u32,
            port: r.dec_int(FIELD_WIDTHS[8]) as u32,
            rd_atomic: r.dec_int(FIELD_WIDTHS[9]) as u32,
            timeout: r.dec_int(FIELD_WIDTHS[10]) as u32,
            msg_size: r.dec_int(FIELD_WIDTHS[11]),
            mtu_size: r.dec_int(FIELD_WIDTHS[12]),
            no_msgs: r.dec_int(FIELD_WIDTHS[13]),
            sock_buf_size: r.dec_int(FIELD_WIDTHS[14]),
            time: r.dec_int(FIELD_WIDTHS[15]) as u32,
            id: r.dec_str(FIELD_WIDTHS[16]),
        })
    }

    /// (major, minor) equality is the version gate; `ver_inc` is
    /// informational only.
    pub fn version_compatible(&self) -> bool {
        self.ver_maj == VER_MAJ && self.ver_min == VER_MIN
    }

    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.ver_maj, self.ver_min, self.ver_inc)
    }

    pub fn local_version_string() -> String {
        format!("{}.{}.{}", VER_MAJ, VER_MIN, VER_INC)
    }

    /// Seed the handful of parameters every client run needs regardless
    /// of which test is selected, run once before any test's own
    /// `apply_defaults` and before `from_remote_slots` builds the
    /// outgoing `Req`. A duration test (`--time`) and a
    /// count test (`--no_msgs`) are mutually exclusive stopping
    /// conditions: only default the duration when the user didn't pick
    /// a message count instead.
    pub fn apply_client_defaults(table: &mut ParamTable) -> Result<(), QperfError> {
        if !table.is_set(ParIndex::LNoMsgs)? && !table.is_set(ParIndex::RNoMsgs)? {
            table.set_internal(ParIndex::LTime, ParValue::Duration(2))?;
            table.set_internal(ParIndex::RTime, ParValue::Duration(2))?;
        }
        table.set_internal(ParIndex::LTimeout, ParValue::Duration(5))?;
        table.set_internal(ParIndex::RTimeout, ParValue::Duration(5))?;
        table.mark_used(ParIndex::LAffinity)?;
        table.mark_used(ParIndex::RAffinity)?;
        table.mark_used(ParIndex::LTime)?;
        table.mark_used(ParIndex::RTime)?;
        Ok(())
    }

    /// Assemble the outgoing `Req` from the remote (`R_*`) slots of the
    /// parameter table: the client sends what the *server* needs, which
    /// is exactly the parameter values tagged for the remote side.
    pub fn from_remote_slots(table: &mut ParamTable, test_index: u32, test_name: &str) -> Req {
        Req {
            ver_maj: VER_MAJ,
            ver_min: VER_MIN,
            ver_inc: VER_INC,
            req_index: test_index,
            flip: table.get(ParIndex::RFlip).unwrap().as_u32(),
            access_recv: table.get(ParIndex::RAccessRecv).unwrap().as_u32(),
            affinity: table.get(ParIndex::RAffinity).unwrap().as_u32(),
            poll_mode: table.get(ParIndex::RPoll).unwrap().as_u32(),
            port: table.get(ParIndex::RPort).unwrap().as_u32(),
            rd_atomic: table.get(ParIndex::RRdAtomic).unwrap().as_u32(),
            timeout: table.get(ParIndex::RTimeout).unwrap().as_u32() as u32,
            msg_size: table.get(ParIndex::RMsgSize).unwrap().as_u64(),
            mtu_size: table.get(ParIndex::RMtuSize).unwrap().as_u64(),
            no_msgs: table.get(ParIndex::RNoMsgs).unwrap().as_u64(),
            sock_buf_size: table.get(ParIndex::RSockBufSize).unwrap().as_u64(),
            time: table.get(ParIndex::RTime).unwrap().as_u32() as u32,
            id: {
                let _ = test_name;
                table.get(ParIndex::RId).unwrap().as_str().to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Req {
        Req {
            ver_maj: VER_MAJ,
            ver_min: VER_MIN,
            ver_inc: VER_INC,
            req_index: 3,
            flip: 0,
            access_recv: 1,
            affinity: 0,
            poll_mode: 0,
            port: 19765,
            rd_atomic: 0,
            timeout: 5,
            msg_size: 65536,
            mtu_size: 1500,
            no_msgs: 0,
            sock_buf_size: 212992,
            time: 2,
            id: "host-a".to_string(),
        }
    }

    #[test]
    fn round_trip_matches_bit_for_bit() {
        let req = sample();
        let decoded = Req::decode(&req.encode()).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn version_mismatch_is_detected() {
        let mut req = sample();
        req.ver_min = VER_MIN + 1;
        assert!(!req.version_compatible());
    }

    #[test]
    fn wrong_length_buffer_is_rejected() {
        let err = Req::decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, QperfError::Protocol(_)));
    }

    #[test]
    fn client_defaults_skip_time_when_no_msgs_is_set() {
        let mut table = ParamTable::new();
        table.set_u32("--no_msgs", ParIndex::LNoMsgs, 1000).unwrap();
        Req::apply_client_defaults(&mut table).unwrap();
        assert_eq!(table.peek(ParIndex::LTime).unwrap().as_u64(), 0);
        assert_eq!(table.peek(ParIndex::LTimeout).unwrap().as_u64(), 5);
    }

    #[test]
    fn client_defaults_fill_time_when_unset() {
        let mut table = ParamTable::new();
        Req::apply_client_defaults(&mut table).unwrap();
        assert_eq!(table.peek(ParIndex::LTime).unwrap().as_u64(), 2);
        assert_eq!(table.peek(ParIndex::RTime).unwrap().as_u64(), 2);
    }
}
