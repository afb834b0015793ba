//! End-to-end functional tests for the `job-search` binary.
//!
//! These tests invoke the binary as a subprocess with a temporary config
//! directory and, where a search runs, a mock Anthropic HTTP server:
//!   CLI binary → credential store → settings → provider (mock) → rendered output
//!
//! No real API keys are needed.

use std::path::Path;
use std::process::{Output, Stdio};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Mock Anthropic API server
// ---------------------------------------------------------------------------

/// Start a mock server answering a single request with `status` and `body`.
/// Returns the base URL and a receiver for the request body it saw.
async fn start_mock_anthropic(status: u16, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let status_line = match status {
        200 => "200 OK",
        401 => "401 Unauthorized",
        _ => "500 Internal Server Error",
    };
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let request_body = read_request(&mut stream).await;
        let _ = tx.send(request_body);

        let resp = format!(
            "HTTP/1.1 {status_line}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            body.len(),
            body
        );
        let _ = stream.write_all(resp.as_bytes()).await;
        let _ = stream.shutdown().await;
    });

    (format!("http://127.0.0.1:{port}"), rx)
}

/// Read the full HTTP request from the stream (headers + body), return the body.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::with_capacity(16384);
    let mut tmp = [0u8; 8192];

    loop {
        let n = stream.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&tmp[..n]);

        if let Some(header_end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..header_end]);
            let content_length = headers
                .lines()
                .find(|l| l.to_lowercase().starts_with("content-length:"))
                .and_then(|l| l.split(':').nth(1))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let body_start = header_end + 4;
            while buf.len() < body_start + content_length {
                let n = stream.read(&mut tmp).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&tmp[..n]);
            }
            return String::from_utf8_lossy(&buf[body_start..]).to_string();
        }
    }
}

/// Find the position of `\r\n\r\n` in a buffer.
fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn text_response(texts: &[&str]) -> String {
    let mut content = vec![serde_json::json!({
        "type": "server_tool_use",
        "id": "srvtoolu_01",
        "name": "web_search",
        "input": {"query": "software engineer jobs Remote"}
    })];
    content.push(serde_json::json!({
        "type": "web_search_tool_result",
        "tool_use_id": "srvtoolu_01",
        "content": []
    }));
    for text in texts {
        content.push(serde_json::json!({"type": "text", "text": text}));
    }
    serde_json::json!({
        "model": "claude-sonnet-4-20250514",
        "content": content,
        "usage": {"input_tokens": 100, "output_tokens": 50, "server_tool_use": {"web_search_requests": 1}},
        "stop_reason": "end_turn"
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Get the path to the built `job-search` binary.
fn job_search_bin() -> String {
    env!("CARGO_BIN_EXE_job-search").to_string()
}

/// Run the binary with `args`, feeding `stdin`, isolated to `config_dir`.
async fn run_cli(config_dir: &Path, base_url: Option<&str>, args: &[&str], stdin: &str) -> Output {
    let mut cmd = Command::new(job_search_bin());
    cmd.args(args)
        .env("JOB_SEARCH_HOME", config_dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    match base_url {
        Some(url) => cmd.env("ANTHROPIC_BASE_URL", url),
        None => cmd.env("ANTHROPIC_BASE_URL", "http://127.0.0.1:9"),
    };

    let mut child = cmd.spawn().unwrap();
    let mut child_stdin = child.stdin.take().unwrap();
    child_stdin.write_all(stdin.as_bytes()).await.unwrap();
    drop(child_stdin);
    child.wait_with_output().await.unwrap()
}

fn save_key(config_dir: &Path, key: &str) {
    std::fs::create_dir_all(config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        serde_json::json!({"api_key": key}).to_string(),
    )
    .unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn help_prints_usage_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    for flag in ["--help", "-h"] {
        let output = run_cli(dir.path(), None, &[flag], "").await;
        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("--save-key"), "help missing --save-key:\n{out}");
        assert!(out.contains("--reset-key"));
        assert!(out.contains("Examples:"));
    }
}

#[tokio::test]
async fn unknown_argument_is_reported_with_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), None, &["--bogus"], "").await;
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Unknown argument: --bogus"));
    assert!(out.contains("Use --help"));
}

#[tokio::test]
async fn conflicting_flags_are_reported_with_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    for args in [
        &["--save-key", "--reset-key"][..],
        &["--reset-key", "--reset-key"][..],
        &["--save-key=yes"][..],
    ] {
        let output = run_cli(dir.path(), None, args, "").await;
        assert_eq!(output.status.code(), Some(0), "{args:?}: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("Unknown argument: "), "{args:?}: {out}");
        assert!(out.contains("Use --help"));
    }
    assert!(!dir.path().join("config.json").exists());
}

#[tokio::test]
async fn save_key_then_reset_key() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("state");

    let output = run_cli(&config_dir, None, &["--save-key"], "sk-ant-e2e\n").await;
    assert!(output.status.success(), "save failed: {}", stderr(&output));
    let raw = std::fs::read_to_string(config_dir.join("config.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["api_key"], "sk-ant-e2e");

    let output = run_cli(&config_dir, None, &["--reset-key"], "").await;
    assert!(output.status.success());
    assert!(stdout(&output).contains("API key removed successfully!"));
    assert!(!config_dir.join("config.json").exists());

    let output = run_cli(&config_dir, None, &["--reset-key"], "").await;
    assert!(output.status.success());
    assert!(stdout(&output).contains("No API key found to remove."));
}

#[tokio::test]
async fn save_key_with_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), None, &["--save-key"], "\n").await;
    assert!(output.status.success());
    assert!(stdout(&output).contains("No API key entered."));
    assert!(!dir.path().join("config.json").exists());
}

#[tokio::test]
async fn search_prints_text_between_separators() {
    let dir = tempfile::tempdir().unwrap();
    save_key(dir.path(), "sk-ant-e2e");
    let (url, request) =
        start_mock_anthropic(200, text_response(&["Job A details", "Job B details"])).await;

    let output = run_cli(dir.path(), Some(&url), &[], "software engineer\nRemote\nn\n").await;
    assert!(
        output.status.success(),
        "search failed (exit {:?}):\n{}",
        output.status.code(),
        stderr(&output)
    );

    let sep = "=".repeat(80);
    assert_eq!(
        stdout(&output),
        format!("{sep}\nJob A details\nJob B details\n{sep}\n")
    );
    assert!(stderr(&output).contains("Thank you for using Job Search Tool!"));

    let sent: serde_json::Value = serde_json::from_str(&request.await.unwrap()).unwrap();
    assert_eq!(sent["max_tokens"], 4000);
    assert_eq!(sent["tools"][0]["type"], "web_search_20250305");
    let prompt = sent["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("software engineer"));
    assert!(prompt.contains("Remote"));
}

#[tokio::test]
async fn search_without_text_prints_no_results() {
    let dir = tempfile::tempdir().unwrap();
    save_key(dir.path(), "sk-ant-e2e");
    let (url, _request) = start_mock_anthropic(200, text_response(&[])).await;

    let output = run_cli(dir.path(), Some(&url), &[], "software engineer\nRemote\nn\n").await;
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("No results found."));
    assert!(!out.contains("===="));
    let err = stderr(&output);
    assert!(!err.contains("WARN"), "no-results search should not log warnings:\n{err}");
}

#[tokio::test]
async fn invalid_key_exits_one_with_reset_hint() {
    let dir = tempfile::tempdir().unwrap();
    save_key(dir.path(), "sk-ant-bad");
    let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
    let (url, _request) = start_mock_anthropic(401, body.into()).await;

    let output = run_cli(dir.path(), Some(&url), &[], "software engineer\nRemote\n").await;
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Invalid API key"), "{err}");
    assert!(err.contains("--reset-key"));
}

#[tokio::test]
async fn server_error_exits_one_without_reset_hint() {
    let dir = tempfile::tempdir().unwrap();
    save_key(dir.path(), "sk-ant-e2e");
    let (url, _request) = start_mock_anthropic(500, r#"{"error":"internal"}"#.into()).await;

    let output = run_cli(dir.path(), Some(&url), &[], "software engineer\nRemote\n").await;
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error: API error (500)"), "{err}");
    assert!(!err.contains("Caused by"));
    assert!(!err.contains("--reset-key"));
}

#[tokio::test]
async fn missing_location_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    save_key(dir.path(), "sk-ant-e2e");

    let output = run_cli(dir.path(), None, &[], "software engineer\n\n").await;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Both keywords and location are required!"));
    assert!(stdout(&output).is_empty());
}

#[tokio::test]
async fn missing_key_prompts_and_saves_before_searching() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _request) = start_mock_anthropic(200, text_response(&["Job A details"])).await;

    let output = run_cli(
        dir.path(),
        Some(&url),
        &[],
        "sk-ant-prompted\nsoftware engineer\nRemote\nn\n",
    )
    .await;
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("No API key found"));
    assert!(stdout(&output).contains("Job A details"));

    let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(raw.contains("sk-ant-prompted"));
}

#[tokio::test]
async fn missing_key_and_no_input_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), None, &[], "\n").await;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("API key is required"));
}
