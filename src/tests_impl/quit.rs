//! # `quit` Test
//!
//! Exercises connection setup and teardown only: no data is exchanged
//! beyond the sync barrier and result swap the control protocol already
//! performs. Useful as a smoke test of the request/sync/exchange
//! sequence without a transport in the loop.

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::QperfError;
use crate::registry::Test;
use crate::runtime::Runtime;

pub struct QuitTest;

#[async_trait]
impl Test for QuitTest {
    async fn client(&self, _rt: &mut Runtime, _stream: &mut TcpStream) -> Result<(), QperfError> {
        Ok(())
    }

    async fn server(&self, _rt: &mut Runtime, _stream: &mut TcpStream) -> Result<(), QperfError> {
        Ok(())
    }
}
