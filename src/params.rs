//! # Parameter Table
//!
//! A declarative catalogue of the logical parameters qperf tests consult,
//! each with a local (this-host) and remote (peer) slot: a single table
//! of structs with explicit local/remote pairing rather than the
//! parallel-array layout a C enum-indexed table would use.

use crate::error::QperfError;
use std::fmt;

/// Every logical parameter qperf's CLI surface and wire protocol know
/// about. Declared in local/remote pairs so index arithmetic (`idx ^ 1`
/// flips local↔remote) stays simple and the enum's declaration order
/// doubles as the stable wire-contract order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParIndex {
    LMsgSize = 0,
    RMsgSize = 1,
    LMtuSize = 2,
    RMtuSize = 3,
    LSockBufSize = 4,
    RSockBufSize = 5,
    LNoMsgs = 6,
    RNoMsgs = 7,
    LPort = 8,
    RPort = 9,
    LAffinity = 10,
    RAffinity = 11,
    LPoll = 12,
    RPoll = 13,
    LAccessRecv = 14,
    RAccessRecv = 15,
    LFlip = 16,
    RFlip = 17,
    LRdAtomic = 18,
    RRdAtomic = 19,
    LTime = 20,
    RTime = 21,
    LTimeout = 22,
    RTimeout = 23,
    LId = 24,
    RId = 25,
    LRate = 26,
    RRate = 27,
}

pub const PAR_COUNT: usize = 28;

impl ParIndex {
    pub const ALL: [ParIndex; PAR_COUNT] = [
        ParIndex::LMsgSize,
        ParIndex::RMsgSize,
        ParIndex::LMtuSize,
        ParIndex::RMtuSize,
        ParIndex::LSockBufSize,
        ParIndex::RSockBufSize,
        ParIndex::LNoMsgs,
        ParIndex::RNoMsgs,
        ParIndex::LPort,
        ParIndex::RPort,
        ParIndex::LAffinity,
        ParIndex::RAffinity,
        ParIndex::LPoll,
        ParIndex::RPoll,
        ParIndex::LAccessRecv,
        ParIndex::RAccessRecv,
        ParIndex::LFlip,
        ParIndex::RFlip,
        ParIndex::LRdAtomic,
        ParIndex::RRdAtomic,
        ParIndex::LTime,
        ParIndex::RTime,
        ParIndex::LTimeout,
        ParIndex::RTimeout,
        ParIndex::LId,
        ParIndex::RId,
        ParIndex::LRate,
        ParIndex::RRate,
    ];

    pub fn as_usize(self) -> usize {
        self as usize
    }

    /// The other slot (local↔remote) of the same logical parameter.
    pub fn counterpart(self) -> ParIndex {
        ParIndex::ALL[self.as_usize() ^ 1]
    }

    pub fn is_local(self) -> bool {
        self.as_usize() % 2 == 0
    }

    /// CLI-facing name without the `loc_`/`rem_` prefix, used in warning
    /// messages ("warning: --msg_size set but not used...").
    pub fn base_name(self) -> &'static str {
        match self {
            ParIndex::LMsgSize | ParIndex::RMsgSize => "msg_size",
            ParIndex::LMtuSize | ParIndex::RMtuSize => "mtu_size",
            ParIndex::LSockBufSize | ParIndex::RSockBufSize => "sock_buf_size",
            ParIndex::LNoMsgs | ParIndex::RNoMsgs => "no_msgs",
            ParIndex::LPort | ParIndex::RPort => "port",
            ParIndex::LAffinity | ParIndex::RAffinity => "affinity",
            ParIndex::LPoll | ParIndex::RPoll => "poll",
            ParIndex::LAccessRecv | ParIndex::RAccessRecv => "access_recv",
            ParIndex::LFlip | ParIndex::RFlip => "flip",
            ParIndex::LRdAtomic | ParIndex::RRdAtomic => "rd_atomic",
            ParIndex::LTime | ParIndex::RTime => "time",
            ParIndex::LTimeout | ParIndex::RTimeout => "timeout",
            ParIndex::LId | ParIndex::RId => "id",
            ParIndex::LRate | ParIndex::RRate => "rate",
        }
    }

    pub fn kind(self) -> ParKind {
        match self {
            ParIndex::LMsgSize
            | ParIndex::RMsgSize
            | ParIndex::LMtuSize
            | ParIndex::RMtuSize
            | ParIndex::LSockBufSize
            | ParIndex::RSockBufSize => ParKind::Size,
            ParIndex::LTime | ParIndex::RTime | ParIndex::LTimeout | ParIndex::RTimeout => {
                ParKind::Duration
            }
            ParIndex::LId | ParIndex::RId | ParIndex::LRate | ParIndex::RRate => ParKind::Str,
            _ => ParKind::U32,
        }
    }
}

impl fmt::Display for ParIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.is_local() { "loc_" } else { "rem_" }, self.base_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParKind {
    U32,
    Size,
    Duration,
    Str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParValue {
    U32(u32),
    /// Bytes.
    Size(u64),
    /// Seconds.
    Duration(u64),
    Str(String),
}

impl ParValue {
    fn default_for(kind: ParKind) -> ParValue {
        match kind {
            ParKind::U32 => ParValue::U32(0),
            ParKind::Size => ParValue::Size(0),
            ParKind::Duration => ParValue::Duration(0),
            ParKind::Str => ParValue::Str(String::new()),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            ParValue::U32(v) => *v,
            ParValue::Size(v) => *v as u32,
            ParValue::Duration(v) => *v as u32,
            ParValue::Str(_) => 0,
        }
    }

    pub fn as_u64(&self) -> u64 {
        match self {
            ParValue::U32(v) => *v as u64,
            ParValue::Size(v) => *v,
            ParValue::Duration(v) => *v,
            ParValue::Str(_) => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ParValue::Str(s) => s.as_str(),
            _ => "",
        }
    }
}

/// A single physical slot: one local or remote instance of a logical
/// parameter.
#[derive(Debug, Clone)]
pub struct Slot {
    pub index: ParIndex,
    pub value: ParValue,
    pub set: bool,
    pub used: bool,
    pub inuse: bool,
    pub name: Option<String>,
}

impl Slot {
    fn new(index: ParIndex) -> Self {
        Self {
            index,
            value: ParValue::default_for(index.kind()),
            set: false,
            used: false,
            inuse: false,
            name: None,
        }
    }
}

/// The full catalogue, stored in index order. `lookup` validates the
/// invariant that `entry.index == i` — a cheap, load-bearing assertion
/// against the table silently drifting out of sync with `ParIndex`.
pub struct ParamTable {
    slots: Vec<Slot>,
}

impl Default for ParamTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamTable {
    pub fn new() -> Self {
        let slots = ParIndex::ALL.iter().map(|&idx| Slot::new(idx)).collect();
        Self { slots }
    }

    fn lookup(&self, index: ParIndex) -> Result<&Slot, QperfError> {
        let slot = &self.slots[index.as_usize()];
        if slot.index.as_usize() != index.as_usize() {
            return Err(QperfError::Internal(format!(
                "parameter catalogue out of order at index {}",
                index.as_usize()
            )));
        }
        Ok(slot)
    }

    fn lookup_mut(&mut self, index: ParIndex) -> Result<&mut Slot, QperfError> {
        let i = index.as_usize();
        if self.slots[i].index.as_usize() != i {
            return Err(QperfError::Internal(format!(
                "parameter catalogue out of order at index {}",
                i
            )));
        }
        Ok(&mut self.slots[i])
    }

    /// First user-level assignment wins; a repeated `--name` is silently
    /// ignored.
    pub fn set_u32(&mut self, name: &str, index: ParIndex, value: u32) -> Result<(), QperfError> {
        let slot = self.lookup_mut(index)?;
        if slot.name.is_some() {
            return Ok(());
        }
        slot.value = ParValue::U32(value);
        slot.name = Some(name.to_string());
        slot.set = true;
        Ok(())
    }

    pub fn set_size(&mut self, name: &str, index: ParIndex, value: u64) -> Result<(), QperfError> {
        let slot = self.lookup_mut(index)?;
        if slot.name.is_some() {
            return Ok(());
        }
        slot.value = ParValue::Size(value);
        slot.name = Some(name.to_string());
        slot.set = true;
        Ok(())
    }

    pub fn set_duration(
        &mut self,
        name: &str,
        index: ParIndex,
        value: u64,
    ) -> Result<(), QperfError> {
        let slot = self.lookup_mut(index)?;
        if slot.name.is_some() {
            return Ok(());
        }
        slot.value = ParValue::Duration(value);
        slot.name = Some(name.to_string());
        slot.set = true;
        Ok(())
    }

    pub fn set_str(&mut self, name: &str, index: ParIndex, value: &str) -> Result<(), QperfError> {
        let slot = self.lookup_mut(index)?;
        if slot.name.is_some() {
            return Ok(());
        }
        slot.value = ParValue::Str(value.to_string());
        slot.name = Some(name.to_string());
        slot.set = true;
        Ok(())
    }

    /// Set a default without marking the slot as user-specified; used by
    /// test bodies and the client startup sequence to seed values that
    /// must not trigger an "unused option" warning.
    pub fn set_internal(&mut self, index: ParIndex, value: ParValue) -> Result<(), QperfError> {
        let slot = self.lookup_mut(index)?;
        slot.used = true;
        slot.inuse = true;
        if slot.name.is_some() {
            return Ok(());
        }
        slot.value = value;
        Ok(())
    }

    pub fn mark_used(&mut self, index: ParIndex) -> Result<(), QperfError> {
        let slot = self.lookup_mut(index)?;
        slot.used = true;
        slot.inuse = true;
        Ok(())
    }

    pub fn is_set(&self, index: ParIndex) -> Result<bool, QperfError> {
        Ok(self.lookup(index)?.name.is_some())
    }

    pub fn get(&mut self, index: ParIndex) -> Result<ParValue, QperfError> {
        self.mark_used(index)?;
        Ok(self.lookup(index)?.value.clone())
    }

    pub fn peek(&self, index: ParIndex) -> Result<ParValue, QperfError> {
        Ok(self.lookup(index)?.value.clone())
    }

    /// Reset `used`/`inuse` for every slot. Called at the start of each
    /// client test.
    pub fn reset_usage(&mut self) {
        for slot in &mut self.slots {
            slot.used = false;
            slot.inuse = false;
        }
    }

    /// Emit a warning for each slot the user set but the test never
    /// consulted, then clear the duplicate `set` flag on any later slot
    /// sharing the same CLI name so a paired `loc_*`/`rem_*` fan-out isn't
    /// warned about twice.
    pub fn warn_unused(&mut self, test_name: &str) {
        let mut already_warned_names: Vec<String> = Vec::new();
        for i in 0..self.slots.len() {
            let (set, used, name) = {
                let s = &self.slots[i];
                (s.set, s.used, s.name.clone())
            };
            if set && !used {
                if let Some(name) = &name {
                    if !already_warned_names.contains(name) {
                        tracing::warn!("warning: {} set but not used in test {}", name, test_name);
                        already_warned_names.push(name.clone());
                    }
                    for later in &mut self.slots[i + 1..] {
                        if later.name.as_deref() == Some(name.as_str()) {
                            later.set = false;
                        }
                    }
                }
            }
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}
