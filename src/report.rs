//! # Result Report
//!
//! Assembles a finished test's derived `Res` and the two sides' `Stat`s
//! into the row set a client prints: the test's headline measurement,
//! the parameter-usage listing, CPU/time/byte totals, and send/recv
//! cost.

use crate::calc::Res;
use crate::params::ParKind;
use crate::presentation::{
    view_band, view_cost, view_cpus, view_long, view_rate, view_size, view_strn, view_time, DisplaySettings, ShowTable,
};
use crate::runtime::Runtime;
use crate::stats::Stat;

/// Which headline row(s) a test contributes: latency-only, bandwidth
/// with a single combined rate, or separate send/recv rates for a
/// bidirectional bandwidth test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Latency,
    Bandwidth,
    BandwidthSr,
}

/// Build the full report into `rt.show`. No-op if the test did not
/// finish successfully: nothing is shown on failure.
pub fn build_report(rt: &mut Runtime, measure: Measure, res: &Res) {
    if !rt.successful {
        return;
    }
    let local = rt.local_stat.clone();
    let remote = rt.peer_stat.clone().unwrap_or_default();

    show_headline(&mut rt.show, &rt.display, measure, res);
    show_used(&rt.table, &mut rt.show, &rt.display);
    if let Some(v) = res.send_cost {
        view_cost(&mut rt.show, &rt.display, 't', "", "send_cost", v);
    }
    if let Some(v) = res.recv_cost {
        view_cost(&mut rt.show, &rt.display, 't', "", "recv_cost", v);
    }
    show_rest(&mut rt.show, &rt.display, res, &local, &remote);
}

fn show_headline(show: &mut ShowTable, display: &DisplaySettings, measure: Measure, res: &Res) {
    match measure {
        Measure::Latency => {
            if let Some(v) = res.latency {
                view_time(show, display, 'a', "", "latency", v);
            }
            if let Some(v) = res.msg_rate {
                view_rate(show, display, 's', "", "msg_rate", v);
            }
        }
        Measure::Bandwidth => {
            if let Some(v) = res.recv_bw {
                view_band(show, display, 'a', "", "bw", v);
            }
            if let Some(v) = res.msg_rate {
                view_rate(show, display, 's', "", "msg_rate", v);
            }
        }
        Measure::BandwidthSr => {
            if let Some(v) = res.send_bw {
                view_band(show, display, 'a', "", "send_bw", v);
            }
            if let Some(v) = res.recv_bw {
                view_band(show, display, 'a', "", "recv_bw", v);
            }
            if let Some(v) = res.msg_rate {
                view_rate(show, display, 's', "", "msg_rate", v);
            }
        }
    }
}

/// One row (or a `loc_`/`rem_` pair when the two sides differ) per
/// parameter the test consulted, gated on verbosity and on whether the
/// user actually set it.
fn show_used(table: &crate::params::ParamTable, show: &mut ShowTable, display: &DisplaySettings) {
    if display.verbose_used < 1 {
        return;
    }
    let slots = table.slots();
    let mut i = 0;
    while i + 1 < slots.len() {
        let l = &slots[i];
        let r = &slots[i + 1];
        i += 2;
        if !l.inuse && !r.inuse {
            continue;
        }
        if display.verbose_used < 2 && !l.set && !r.set {
            continue;
        }
        let name = l.index.base_name();
        match l.index.kind() {
            ParKind::U32 => {
                let (lv, rv) = (l.value.as_u32() as i64, r.value.as_u32() as i64);
                if lv == rv {
                    view_long(show, display, 'u', "", name, lv);
                } else {
                    view_long(show, display, 'u', "loc_", name, lv);
                    view_long(show, display, 'u', "rem_", name, rv);
                }
            }
            ParKind::Size => {
                let (lv, rv) = (l.value.as_u64(), r.value.as_u64());
                if lv == rv {
                    view_size(show, display, 'u', "", name, lv);
                } else {
                    view_size(show, display, 'u', "loc_", name, lv);
                    view_size(show, display, 'u', "rem_", name, rv);
                }
            }
            ParKind::Duration => {
                let (lv, rv) = (l.value.as_u64() as f64, r.value.as_u64() as f64);
                if lv == rv {
                    view_time(show, display, 'u', "", name, lv);
                } else {
                    view_time(show, display, 'u', "loc_", name, lv);
                    view_time(show, display, 'u', "rem_", name, rv);
                }
            }
            ParKind::Str => {
                let (lv, rv) = (l.value.as_str(), r.value.as_str());
                if lv == rv {
                    view_strn(show, display, 'u', "", name, lv);
                } else {
                    view_strn(show, display, 'u', "loc_", name, lv);
                    view_strn(show, display, 'u', "rem_", name, rv);
                }
            }
        }
    }
}

/// CPU/time/byte totals. When exactly one side only sent and the other
/// only received (and vice versa has no cross-traffic), shown as
/// `send_*`/`recv_*`; otherwise as a symmetric `loc_*`/`rem_*` pair.
/// `unify_nodes` forces the `loc_`/`rem_` pairing unconditionally, even
/// when traffic was one-directional.
fn show_rest(show: &mut ShowTable, display: &DisplaySettings, res: &Res, local: &Stat, remote: &Stat) {
    let (ls, lr) = (local.s.no_bytes, local.r.no_bytes);
    let (rs, rr) = (remote.s.no_bytes, remote.r.no_bytes);

    if !display.unify_nodes && ls > 0 && rs == 0 && rr > 0 && lr == 0 {
        show_side_pair(show, display, "send", &res.l, local, "recv", &res.r, remote);
    } else if !display.unify_nodes && rs > 0 && ls == 0 && lr > 0 && rr == 0 {
        show_side_pair(show, display, "send", &res.r, remote, "recv", &res.l, local);
    } else {
        show_side_pair(show, display, "loc", &res.l, local, "rem", &res.r, remote);
    }
}

#[allow(clippy::too_many_arguments)]
fn show_side_pair(
    show: &mut ShowTable,
    display: &DisplaySettings,
    a_label: &str,
    a_res: &crate::calc::Resn,
    a_stat: &Stat,
    b_label: &str,
    b_res: &crate::calc::Resn,
    b_stat: &Stat,
) {
    show_side(show, display, a_label, a_res, a_stat);
    show_side(show, display, b_label, b_res, b_stat);
}

fn show_side(show: &mut ShowTable, display: &DisplaySettings, label: &str, resn: &crate::calc::Resn, stat: &Stat) {
    let srmode = label == "send" || label == "recv";
    view_cpus(show, display, 't', "", &format!("{}_cpus_used", label), resn.frac_total);
    view_cpus(show, display, 'T', "", &format!("{}_cpus_user", label), resn.frac_user);
    view_cpus(show, display, 'T', "", &format!("{}_cpus_intr", label), resn.frac_intr);
    view_cpus(show, display, 'T', "", &format!("{}_cpus_kernel", label), resn.frac_kernel);
    view_cpus(show, display, 'T', "", &format!("{}_cpus_iowait", label), resn.frac_iowait);
    view_time(show, display, 'T', "", &format!("{}_real_time", label), resn.time_real);
    view_time(show, display, 'T', "", &format!("{}_cpu_time", label), resn.time_cpu);

    if srmode {
        let (errs, bytes, msgs) = if label == "send" {
            (stat.s.no_errs, stat.s.no_bytes, stat.s.no_msgs)
        } else {
            (stat.r.no_errs, stat.r.no_bytes, stat.r.no_msgs)
        };
        view_long(show, display, 'S', "", &format!("{}_errors", label), errs as i64);
        view_size(show, display, 'S', "", &format!("{}_bytes", label), bytes);
        view_long(show, display, 'S', "", &format!("{}_msgs", label), msgs as i64);
        view_long(show, display, 'S', "", &format!("{}_max_cqe", label), stat.max_cqes as i64);
    } else {
        view_long(show, display, 'S', "", &format!("{}_send_errors", label), stat.s.no_errs as i64);
        view_long(show, display, 'S', "", &format!("{}_recv_errors", label), stat.r.no_errs as i64);
        view_size(show, display, 'S', "", &format!("{}_send_bytes", label), stat.s.no_bytes);
        view_size(show, display, 'S', "", &format!("{}_recv_bytes", label), stat.r.no_bytes);
        view_long(show, display, 'S', "", &format!("{}_send_msgs", label), stat.s.no_msgs as i64);
        view_long(show, display, 'S', "", &format!("{}_recv_msgs", label), stat.r.no_msgs as i64);
        view_long(show, display, 'S', "", &format!("{}_max_cqe", label), stat.max_cqes as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::Resn;
    use crate::cli::Settings;
    use crate::params::ParamTable;
    use crate::request::{Req, VER_INC, VER_MAJ, VER_MIN};
    use crate::runtime::Role;

    fn base_req() -> Req {
        Req {
            ver_maj: VER_MAJ,
            ver_min: VER_MIN,
            ver_inc: VER_INC,
            req_index: 2,
            flip: 0,
            access_recv: 0,
            affinity: 0,
            poll_mode: 0,
            port: 0,
            rd_atomic: 0,
            timeout: 5,
            msg_size: 1024,
            mtu_size: 1500,
            no_msgs: 10,
            sock_buf_size: 0,
            time: 0,
            id: String::new(),
        }
    }

    #[test]
    fn unsuccessful_run_produces_no_rows() {
        let mut rt = Runtime::new(Role::Client, ParamTable::new(), base_req(), &Settings::default());
        rt.successful = false;
        let res = Res::default();
        build_report(&mut rt, Measure::Latency, &res);
        assert!(rt.show.is_empty());
    }

    #[test]
    fn bandwidth_report_shows_headline_and_totals() {
        let mut rt = Runtime::new(Role::Client, ParamTable::new(), base_req(), &Settings::default());
        rt.local_stat.s.no_bytes = 100_000;
        rt.local_stat.s.no_msgs = 10;
        let res = Res {
            l: Resn { time_real: 1.0, time_cpu: 0.5, frac_total: 0.5, ..Resn::default() },
            r: Resn { time_real: 1.0, ..Resn::default() },
            recv_bw: Some(100_000.0),
            msg_rate: Some(10.0),
            ..Res::default()
        };
        build_report(&mut rt, Measure::Bandwidth, &res);
        assert!(!rt.show.is_empty());
        let rendered = rt.show.place_show();
        assert!(rendered.contains("bw"));
    }

    #[test]
    fn srmode_detected_for_one_directional_traffic() {
        let mut local = Stat::default();
        local.s.no_bytes = 1000;
        local.s.no_msgs = 1;
        let mut remote = Stat::default();
        remote.r.no_bytes = 1000;
        remote.r.no_msgs = 1;

        let mut show = ShowTable::new();
        let display = DisplaySettings { verbose_used: 2, ..DisplaySettings::default() };
        let res = Res { l: Resn { time_real: 1.0, ..Resn::default() }, r: Resn { time_real: 1.0, ..Resn::default() }, ..Res::default() };
        show_rest(&mut show, &display, &res, &local, &remote);
        let rendered = show.place_show();
        assert!(rendered.contains("send_bytes"));
        assert!(rendered.contains("recv_bytes"));
    }

    #[test]
    fn unify_nodes_forces_loc_rem_pairing_even_for_one_directional_traffic() {
        let mut local = Stat::default();
        local.s.no_bytes = 1000;
        local.s.no_msgs = 1;
        let mut remote = Stat::default();
        remote.r.no_bytes = 1000;
        remote.r.no_msgs = 1;

        let mut show = ShowTable::new();
        let display = DisplaySettings { verbose_used: 2, unify_nodes: true, ..DisplaySettings::default() };
        let res = Res { l: Resn { time_real: 1.0, ..Resn::default() }, r: Resn { time_real: 1.0, ..Resn::default() }, ..Res::default() };
        show_rest(&mut show, &display, &res, &local, &remote);
        let rendered = show.place_show();
        assert!(rendered.contains("loc_send_bytes"));
        assert!(rendered.contains("rem_send_bytes"));
    }
}
