use crate::config::Config;
use crate::error::Error;
use crate::lambda::LambdaClient;
use crate::run;
use crate::wait::Clock;
use httptest::{cycle, matchers::*, responders::*, Expectation, Server};
use serde_json::json;
use std::cell::Cell;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;

const TOKEN: &str = "test-token";

fn test_config(github_output: Option<PathBuf>, wait_for_boot: bool) -> Config {
    Config {
        token: TOKEN.to_string(),
        instance_type_name: "gpu_1x_a100".to_string(),
        region_name: "us-west-1".to_string(),
        ssh_key_names: vec!["ci-key".to_string()],
        file_system_names: Vec::new(),
        name: "ci-runner".to_string(),
        wait_for_boot,
        boot_timeout: Duration::from_secs(300),
        github_output,
    }
}

fn client_for(server: &Server) -> LambdaClient {
    let base_url = Url::parse(&server.url_str("/")).unwrap();
    LambdaClient::new(base_url, TOKEN).unwrap()
}

fn launch_expectation() -> Expectation {
    Expectation::matching(all_of![
        request::method_path("POST", "/instance-operations/launch"),
        request::headers(contains(("authorization", "Bearer test-token"))),
        request::body(json_decoded(eq(json!({
            "instance_type_name": "gpu_1x_a100",
            "region_name": "us-west-1",
            "ssh_key_names": ["ci-key"],
            "file_system_names": [],
            "name": "ci-runner",
        })))),
    ])
    .respond_with(json_encoded(json!({"data": {"instance_ids": ["abc123"]}})))
}

/// Advances only when asked to sleep, so boot polling finishes instantly.
struct FakeClock {
    start: Instant,
    advanced: Cell<Duration>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            advanced: Cell::new(Duration::ZERO),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.advanced.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advanced.set(self.advanced.get() + duration);
    }
}

#[test]
fn launch_writes_pipeline_output() {
    let server = Server::run();
    server.expect(launch_expectation());
    let tempdir = TempDir::new().unwrap();
    let output_path = tempdir.path().join("github_output");
    let config = test_config(Some(output_path.clone()), false);
    run(&config, &client_for(&server), &FakeClock::new()).unwrap();
    assert_eq!(
        "instance_id=abc123\n",
        std::fs::read_to_string(&output_path).unwrap()
    );
}

#[test]
/// assert that a failed launch surfaces the provider's error fields and writes no output line
fn launch_error_is_fatal_and_writes_nothing() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/instance-operations/launch"))
            .respond_with(status_code(404).body(
                r#"{"error": {"code": "global/object-does-not-exist", "message": "Not found"}}"#,
            )),
    );
    let tempdir = TempDir::new().unwrap();
    let output_path = tempdir.path().join("github_output");
    let config = test_config(Some(output_path.clone()), false);
    let err = run(&config, &client_for(&server), &FakeClock::new()).unwrap_err();
    match &err {
        Error::Api {
            status,
            code,
            message,
            suggestion,
            ..
        } => {
            assert_eq!(404, status.as_u16());
            assert_eq!("global/object-does-not-exist", code);
            assert_eq!("Not found", message);
            assert_eq!("No suggestion available", suggestion);
        }
        other => panic!("expected an API error, got {:?}", other),
    }
    assert!(!output_path.exists());
}

#[test]
/// assert that an error payload with no fields at all still renders the generic fallbacks
fn launch_error_with_empty_body_uses_fallbacks() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/instance-operations/launch"))
            .respond_with(status_code(500).body("")),
    );
    let config = test_config(None, false);
    let err = run(&config, &client_for(&server), &FakeClock::new()).unwrap_err();
    match &err {
        Error::Api { code, message, .. } => {
            assert_eq!("global/unknown", code);
            assert_eq!("An unknown error occurred", message);
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[test]
fn missing_output_destination_is_fatal() {
    let server = Server::run();
    server.expect(launch_expectation());
    let config = test_config(None, false);
    let err = run(&config, &client_for(&server), &FakeClock::new()).unwrap_err();
    match &err {
        Error::Environment { var } => assert_eq!("GITHUB_OUTPUT", var),
        other => panic!("expected a missing GITHUB_OUTPUT error, got {:?}", other),
    }
}

#[test]
fn empty_instance_id_list_is_fatal() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/instance-operations/launch"))
            .respond_with(json_encoded(json!({"data": {"instance_ids": []}}))),
    );
    let tempdir = TempDir::new().unwrap();
    let output_path = tempdir.path().join("github_output");
    let config = test_config(Some(output_path.clone()), false);
    let err = run(&config, &client_for(&server), &FakeClock::new()).unwrap_err();
    match &err {
        Error::NoInstances => {}
        other => panic!("expected a no-instances error, got {:?}", other),
    }
    assert!(!output_path.exists());
}

#[test]
fn waits_for_boot_when_opted_in() {
    let server = Server::run();
    server.expect(launch_expectation());
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/instances/abc123"),
            request::headers(contains(("authorization", "Bearer test-token"))),
        ])
        .times(3)
        .respond_with(cycle![
            json_encoded(json!({"data": {"status": "booting"}})),
            json_encoded(json!({"data": {"status": "booting"}})),
            json_encoded(json!({"data": {"status": "active"}})),
        ]),
    );
    let tempdir = TempDir::new().unwrap();
    let output_path = tempdir.path().join("github_output");
    let config = test_config(Some(output_path), true);
    let clock = FakeClock::new();
    run(&config, &client_for(&server), &clock).unwrap();
    // two poll intervals passed before the instance left `booting`
    assert_eq!(10, clock.advanced.get().as_secs());
}

#[test]
/// assert that the status endpoint is never hit when boot waiting is not opted in
fn no_wait_makes_no_status_calls() {
    let server = Server::run();
    server.expect(launch_expectation());
    server.expect(
        Expectation::matching(request::method("GET"))
            .times(0)
            .respond_with(status_code(200)),
    );
    let tempdir = TempDir::new().unwrap();
    let output_path = tempdir.path().join("github_output");
    let config = test_config(Some(output_path), false);
    run(&config, &client_for(&server), &FakeClock::new()).unwrap();
}
