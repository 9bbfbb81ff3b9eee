use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_SOCKET_TESTS_VAR: &str = "HARVESTER_REQUIRE_SOCKET_TESTS";

fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_SOCKET_TESTS_VAR)
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock server, or returns `None` after printing a skip notice when
/// localhost sockets cannot be bound in this environment.
#[track_caller]
pub(crate) fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
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
        if socket_tests_required() {
            panic!("{message}. Set {REQUIRE_SOCKET_TESTS_VAR}=0 to allow local skip behavior.");
        }
        eprintln!("{message}. Skipping test.");
        None
    }
}
