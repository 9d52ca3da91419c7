//! # `conf` Test
//!
//! Reports the server's configuration back to the client: node name,
//! CPU model, OS release, and this build's qperf version, each a
//! `STRSIZE`-long null-padded string in the `Configuration` wire record
//! this test alone uses.

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::QperfError;
use crate::io::{deadline_from_now, read_exact_within, write_all_within};
use crate::registry::Test;
use crate::request::{Req, STRSIZE};
use crate::runtime::Runtime;
use crate::wire::{Cursor, Reader};

const CONF_SIZE: usize = STRSIZE * 4;

struct Conf {
    node: String,
    cpu: String,
    os: String,
    qperf: String,
}

impl Conf {
    fn encode(&self) -> [u8; CONF_SIZE] {
        let mut buf = [0u8; CONF_SIZE];
        let mut c = Cursor::new(&mut buf);
        c.enc_str(&self.node, STRSIZE);
        c.enc_str(&self.cpu, STRSIZE);
        c.enc_str(&self.os, STRSIZE);
        c.enc_str(&self.qperf, STRSIZE);
        buf
    }

    fn decode(buf: &[u8]) -> Conf {
        let mut r = Reader::new(buf);
        Conf {
            node: r.dec_str(STRSIZE),
            cpu: r.dec_str(STRSIZE),
            os: r.dec_str(STRSIZE),
            qperf: r.dec_str(STRSIZE),
        }
    }

    fn gather() -> Conf {
        Conf {
            node: hostname(),
            cpu: cpu_model(),
            os: os_release(),
            qperf: Req::local_version_string(),
        }
    }
}

fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn cpu_model() -> String {
    std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split(':').nth(1))
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn os_release() -> String {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return "unknown".to_string();
    }
    let sysname = cstr_field(&uts.sysname);
    let release = cstr_field(&uts.release);
    format!("{} {}", sysname, release)
}

fn cstr_field(field: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = field.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub struct ConfTest;

#[async_trait]
impl Test for ConfTest {
    async fn client(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        let deadline = deadline_from_now(rt.req.timeout as u64);
        let buf = read_exact_within(stream, CONF_SIZE, deadline).await?;
        let rem = Conf::decode(&buf);
        let loc = Conf::gather();

        for (prefix, conf) in [("loc_", loc), ("rem_", rem)] {
            rt.show.place_any(crate::presentation::Gate::Always, 1.0, &rt.display, Some(prefix), "node", None, conf.node, None);
            rt.show.place_any(crate::presentation::Gate::Always, 1.0, &rt.display, Some(prefix), "cpu", None, conf.cpu, None);
            rt.show.place_any(crate::presentation::Gate::Always, 1.0, &rt.display, Some(prefix), "os", None, conf.os, None);
            rt.show.place_any(crate::presentation::Gate::Always, 1.0, &rt.display, Some(prefix), "qperf", None, conf.qperf, None);
        }
        Ok(())
    }

    async fn server(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError> {
        let conf = Conf::gather();
        let deadline = deadline_from_now(rt.req.timeout as u64);
        write_all_within(stream, &conf.encode(), deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conf_round_trips() {
        let conf = Conf { node: "host-a".into(), cpu: "Some CPU".into(), os: "Linux 6.1".into(), qperf: "0.2.0".into() };
        let decoded = Conf::decode(&conf.encode());
        assert_eq!(decoded.node, "host-a");
        assert_eq!(decoded.cpu, "Some CPU");
        assert_eq!(decoded.os, "Linux 6.1");
        assert_eq!(decoded.qperf, "0.2.0");
    }

    #[test]
    fn gather_never_panics() {
        let conf = Conf::gather();
        assert!(!conf.node.is_empty());
    }
}
