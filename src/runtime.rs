//! # Runtime Context
//!
//! `Req`, `Res`, `LStat`, `Finished`, `ShowTable`, and the parameter
//! catalogue collected into one explicit struct passed to every
//! component instead of held as process-wide globals. Only `Finished`
//! needs atomic semantics; everything else here is plain owned state
//! because there's exactly one `Runtime` per process and no signal
//! handler reaching into it from outside the async task tree.

use crate::cli::Settings;
use crate::params::ParamTable;
use crate::presentation::{DisplaySettings, ShowTable};
use crate::request::Req;
use crate::stats::Stat;
use crate::timing::Finished;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

pub struct Runtime {
    pub role: Role,
    pub table: ParamTable,
    pub req: Req,
    pub local_stat: Stat,
    pub peer_stat: Option<Stat>,
    pub finished: Finished,
    pub display: DisplaySettings,
    pub show: ShowTable,
    pub successful: bool,
}

impl Runtime {
    pub fn new(role: Role, table: ParamTable, req: Req, settings: &Settings) -> Self {
        Self {
            role,
            table,
            req,
            local_stat: Stat::default(),
            peer_stat: None,
            finished: Finished::new(),
            display: DisplaySettings {
                verbose_conf: settings.verbose_conf,
                verbose_stat: settings.verbose_stat,
                verbose_time: settings.verbose_time,
                verbose_used: settings.verbose_used,
                debug: settings.debug,
                unify_units: settings.unify_units,
                unify_nodes: settings.unify_nodes,
                precision: settings.precision,
            },
            show: ShowTable::new(),
            successful: true,
        }
    }

    /// Reset per-test mutable state. Called once per accepted connection
    /// on the server, and once per client invocation: clears per-slot
    /// usage tracking and gives the test a fresh `Finished`/`successful`.
    pub fn reset_for_test(&mut self) {
        self.table.reset_usage();
        self.finished = Finished::new();
        self.successful = true;
        self.local_stat = Stat::default();
        self.peer_stat = None;
    }
}
