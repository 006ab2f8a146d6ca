use std::process::Command;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Runs the binary with a clean environment for the delivery settings.
async fn run_cli(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_sentry-delivery"))
            .args(args)
            .env_remove("RUST_LOG")
            .env_remove("SENTRY_DSN")
            .env_remove("SENTRY_BACKGROUND_WORKER_THREADS")
            .env_remove("LOG_LEVEL")
            .env_remove("LOG_FORMAT")
            .env_remove("CONFIG_FILE")
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_logs_stay_off_stdout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/42/envelope/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_cli(vec![
        "--dsn".to_string(),
        format!("http://12345@{}/42", server.address()),
        "--log-format".to_string(),
        "json".to_string(),
        "--log-level".to_string(),
        "debug".to_string(),
        "--message".to_string(),
        "from the command line".to_string(),
    ])
    .await;

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {stdout}");
    assert_eq!(lines[0].len(), 32);
    assert!(lines[0].chars().all(|c| c.is_ascii_hexdigit()));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Sentry HTTP Transport connecting to"));
    assert!(stderr.lines().any(|line| line.starts_with('{')));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_event_exits_with_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).insert_header("x-sentry-error", "error_in_header"))
        .mount(&server)
        .await;

    let output = run_cli(vec![
        "--dsn".to_string(),
        format!("http://12345@{}/42", server.address()),
    ])
    .await;

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8(output.stderr).unwrap().contains("error_in_header"));
}
