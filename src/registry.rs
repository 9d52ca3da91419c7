//! # Transport Dispatch
//!
//! A table pairs test name → `client`/`server` behavior. Each entry is
//! an `Arc<dyn Test>` trait object (`#[async_trait]`) rather than a bare
//! function pointer, since a test body often needs to close over
//! mechanism-specific state, like a bound UDP socket address, that a
//! plain `fn` can't carry. The
//! registry is ordered; the wire's test selector is the zero-based
//! index into it, and the server rejects out-of-range indices.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::QperfError;
use crate::params::ParamTable;
use crate::runtime::Runtime;

#[async_trait]
pub trait Test: Send + Sync {
    /// Seed any parameter slots this test needs a non-zero default for
    /// (e.g. a message size or a data-plane port) before the client's
    /// outgoing `Req` is built. Runs after CLI parsing, so an explicit
    /// `--msg_size` always wins (`set_internal` only fills unset slots).
    fn apply_defaults(&self, _table: &mut ParamTable) -> Result<(), QperfError> {
        Ok(())
    }

    async fn client(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError>;
    async fn server(&self, rt: &mut Runtime, stream: &mut TcpStream) -> Result<(), QperfError>;
}

pub struct TestEntry {
    pub name: &'static str,
    pub test: Arc<dyn Test>,
}

pub struct Registry {
    entries: Vec<TestEntry>,
}

impl Registry {
    pub fn standard() -> Registry {
        use crate::tests_impl::{conf::ConfTest, quit::QuitTest, tcp::TcpBwTest, tcp::TcpLatTest, udp::UdpBwTest, udp::UdpLatTest};
        Registry {
            entries: vec![
                TestEntry { name: "conf", test: Arc::new(ConfTest) },
                TestEntry { name: "quit", test: Arc::new(QuitTest) },
                TestEntry { name: "tcp_bw", test: Arc::new(TcpBwTest) },
                TestEntry { name: "tcp_lat", test: Arc::new(TcpLatTest) },
                TestEntry { name: "udp_bw", test: Arc::new(UdpBwTest) },
                TestEntry { name: "udp_lat", test: Arc::new(UdpLatTest) },
            ],
        }
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Test>> {
        self.entries.get(index).map(|e| &e.test)
    }

    pub fn name_at(&self, index: usize) -> Option<&'static str> {
        self.entries.get(index).map(|e| e.name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_knows_every_shipped_test() {
        let registry = Registry::standard();
        for name in ["conf", "quit", "tcp_bw", "tcp_lat", "udp_bw", "udp_lat"] {
            assert!(registry.index_of(name).is_some(), "missing test {}", name);
        }
    }

    #[test]
    fn index_of_matches_get() {
        let registry = Registry::standard();
        let idx = registry.index_of("tcp_bw").unwrap();
        assert!(registry.get(idx).is_some());
    }

    #[test]
    fn out_of_range_index_is_none() {
        let registry = Registry::standard();
        assert!(registry.get(999).is_none());
    }
}
