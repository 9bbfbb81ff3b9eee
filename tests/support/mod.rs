//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::TcpListener;
use std::path::Path;

use harvester_core::ledger::{Ledger, NewRecord, SqliteLedger};
use wiremock::MockServer;

/// Env var that turns "cannot bind a localhost socket" from a skip into a failure.
pub const REQUIRE_SOCKET_TESTS_VAR: &str = "HARVESTER_REQUIRE_SOCKET_TESTS";

fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_SOCKET_TESTS_VAR)
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a wiremock server, or returns `None` when the sandbox forbids
/// binding localhost sockets.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let location = std::panic::Location::caller();
    async move {
        if TcpListener::bind("127.0.0.1:0").is_ok() {
            return Some(MockServer::start().await);
        }
        let message = format!(
            "[socket-bound-test] cannot bind localhost socket at {}:{}",
            location.file(),
            location.line()
        );
        assert!(
            !socket_tests_required(),
            "{message}. Set {REQUIRE_SOCKET_TESTS_VAR}=0 to allow local skip behavior."
        );
        eprintln!("{message}. Skipping test. Set {REQUIRE_SOCKET_TESTS_VAR}=1 to fail-fast instead.");
        None
    }
}

/// Binds a mock server or returns early from the enclosing test.
macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = support::start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

/// Creates a durable ledger at `path` holding `(url, filename)` records.
pub async fn seed_ledger(path: &Path, records: &[(String, &str)]) -> SqliteLedger {
    let ledger = SqliteLedger::open(path).await.unwrap();
    let new: Vec<NewRecord> = records
        .iter()
        .map(|(url, filename)| NewRecord::new(url.clone(), *filename))
        .collect();
    ledger.insert_batch(&new).await.unwrap();
    ledger
}
