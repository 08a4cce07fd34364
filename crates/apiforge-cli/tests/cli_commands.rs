// crates/apiforge-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: End-to-end runs of the apiforge binary.
// Purpose: Validate exit codes and output for every subcommand.
// ============================================================================

//! CLI command tests for apiforge.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::thread;

use serde_json::Value;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const ORDERS: &str = r#"[{
    "pageName": "Orders",
    "folder": "shop",
    "baseRoute": "/orders",
    "cases": [{
        "methodName": "createOrder",
        "description": "creates an order",
        "method": "POST",
        "data": {"sku": "A-1", "quantity": 2},
        "expectStatus": 201,
        "requiredFields": [{"name": "sku", "expectStatus": 422}]
    }]
}]"#;

fn cli_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_apiforge"))
}

/// Writes a quiet config and the given definitions into `dir`.
fn workspace(dir: &Path, definitions: &str) -> (PathBuf, PathBuf) {
    let config = dir.join("apiforge.toml");
    fs::write(&config, "[logging]\nsink = \"none\"\n").unwrap();
    let input = dir.join("defs.json");
    fs::write(&input, definitions).unwrap();
    (config, input)
}

fn run_cli(config: &Path, args: &[&str]) -> Output {
    Command::new(cli_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("run apiforge")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Serves `count` requests: 422 when the body lacks `sku`, else 201.
fn orders_server(count: usize) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        for _ in 0 .. count {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let response = if parsed.get("sku").is_some() {
                Response::from_string(r#"{"id":1}"#).with_status_code(201)
            } else {
                Response::from_string(r#"{"message":"sku.required"}"#).with_status_code(422)
            };
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), handle)
}

// ============================================================================
// SECTION: Validate and Expand
// ============================================================================

#[test]
fn validate_accepts_well_formed_definitions() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, input) = workspace(dir.path(), ORDERS);
    let output = run_cli(&config, &["validate", "--input", input.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "1 definition(s) valid\n");
    Ok(())
}

#[test]
fn validate_lists_every_violation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, input) = workspace(
        dir.path(),
        r#"[{"pageName": "Bad", "baseRoute": "", "cases": [
            {"methodName": "", "description": "", "expectStatus": 99}
        ]}]"#,
    );
    let output = run_cli(&config, &["validate", "--input", input.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("schema validation failed"), "{stderr}");
    assert!(stderr.contains("baseRoute"), "{stderr}");
    assert!(stderr.contains("methodName"), "{stderr}");
    assert!(stderr.contains("expectStatus"), "{stderr}");
    Ok(())
}

#[test]
fn expand_prints_matrix_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, input) = workspace(dir.path(), ORDERS);
    let output = run_cli(&config, &["expand", "--input", input.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    let matrix: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(matrix[0]["pageName"], "Orders");
    let cases = matrix[0]["cases"].as_array().unwrap();
    assert_eq!(cases.len(), 2);

    let output =
        run_cli(&config, &["expand", "--input", input.to_str().unwrap(), "--page", "Nope"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("no definition named `Nope`"));
    Ok(())
}

// ============================================================================
// SECTION: Generate
// ============================================================================

#[test]
fn generate_writes_then_check_detects_drift() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, input) = workspace(dir.path(), ORDERS);
    let out = dir.path().join("generated");
    let base = ["generate", "--input", input.to_str().unwrap(), "--output", out.to_str().unwrap()];

    let output = run_cli(&config, &base);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(stdout_of(&output).matches("wrote ").count(), 3);
    let client = out.join("shop").join("Orders.client.rs");
    assert!(client.is_file());

    let mut check = base.to_vec();
    check.push("--check");
    let output = run_cli(&config, &check);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "Orders: up to date\n");

    fs::write(&client, "// edited\n")?;
    let output = run_cli(&config, &check);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("drift detected for"));
    assert_eq!(fs::read_to_string(&client)?, "// edited\n");
    Ok(())
}

#[test]
fn generate_skips_rejected_definitions_and_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mixed = format!(
        "[{}, {}]",
        r#"{"pageName": "Broken", "baseRoute": "", "cases": []}"#,
        ORDERS.trim().trim_start_matches('[').trim_end_matches(']')
    );
    let (config, input) = workspace(dir.path(), &mixed);
    let out = dir.path().join("generated");
    let output = run_cli(&config, &[
        "generate",
        "--input",
        input.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("Broken"));
    assert!(out.join("shop").join("Orders.test.rs").is_file());
    assert!(!out.join("Broken").exists());
    Ok(())
}

// ============================================================================
// SECTION: Run
// ============================================================================

#[test]
fn run_executes_matrix_against_endpoint() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, input) = workspace(dir.path(), ORDERS);
    let (base_url, handle) = orders_server(2);
    let output =
        run_cli(&config, &["run", "--input", input.to_str().unwrap(), "--base-url", &base_url]);
    handle.join().unwrap();
    assert!(output.status.success(), "{}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("PASS Orders::createOrder\n"), "{stdout}");
    assert!(stdout.contains("PASS Orders::createOrderMissingFieldSku\n"), "{stdout}");
    assert!(stdout.ends_with("2 passed, 0 failed\n"), "{stdout}");
    Ok(())
}

#[test]
fn run_without_base_url_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, input) = workspace(dir.path(), ORDERS);
    let output = Command::new(cli_binary())
        .arg("--config")
        .arg(&config)
        .args(["run", "--input", input.to_str().unwrap()])
        .env_remove("APIFORGE_BASE_URL")
        .output()?;
    assert!(!output.status.success());
    assert!(stderr_of(&output).starts_with("error: "));
    Ok(())
}

// ============================================================================
// SECTION: Scaffold
// ============================================================================

#[test]
fn scaffold_writes_valid_definition_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (config, _) = workspace(dir.path(), "[]");
    let issue = dir.path().join("issue.json");
    fs::write(&issue, r#"{"key": "API-42", "title": "List invoices", "type": "Story"}"#)?;
    let target = dir.path().join("invoices.json");
    let args =
        ["scaffold", "--issue", issue.to_str().unwrap(), "--output", target.to_str().unwrap()];

    let output = run_cli(&config, &args);
    assert!(output.status.success(), "{}", stderr_of(&output));
    let definition: Value = serde_json::from_str(&fs::read_to_string(&target)?)?;
    assert_eq!(definition["pageName"], "ListInvoices");
    assert_eq!(definition["folder"], "API-42");

    let output = run_cli(&config, &["validate", "--input", target.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr_of(&output));

    let output = run_cli(&config, &args);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("refusing to overwrite"));
    Ok(())
}
