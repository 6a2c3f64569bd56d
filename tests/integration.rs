use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use docs_agent::manifest::Manifest;

const CONFIG_ENV: &[&str] = &[
    "OLLAMA_URL",
    "CHAT_MODEL",
    "EMBEDDING_MODEL",
    "OLLAMA_USERNAME",
    "OLLAMA_PASSWORD",
    "CHROMADB_DIR",
    "MAX_TOKENS",
    "SYSTEM_PROMPT",
    "DOCS_AGENT_LOG",
];

fn docs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docs"))
}

fn global_config(root: &Path) -> PathBuf {
    root.join("global").join("config.toml")
}

fn docs_command(root: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(docs_binary());
    cmd.current_dir(root)
        .arg("--non-interactive")
        .arg("--global-config")
        .arg(global_config(root))
        .args(args);
    for key in CONFIG_ENV {
        cmd.env_remove(key);
    }
    cmd
}

fn run(mut cmd: Command) -> (String, String, bool) {
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docs binary at {:?}: {}", docs_binary(), e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_docs(root: &Path, args: &[&str]) -> (String, String, bool) {
    run(docs_command(root, args))
}

fn write_doc(root: &Path, name: &str, content: &str) -> String {
    let path = root.join("files").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_init_creates_layout() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_docs(tmp.path(), &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("created:"));
    assert!(stdout.contains("ok"));

    let docs = tmp.path().join(".docs");
    assert!(docs.join("config.toml").is_file());
    assert!(docs.join("elements.toml").is_file());
    assert!(docs.join("chromadb").is_dir());
}

#[test]
fn test_init_idempotent() {
    let tmp = TempDir::new().unwrap();
    let (_, _, first) = run_docs(tmp.path(), &["init"]);
    assert!(first, "First init failed");

    let (stdout, _, second) = run_docs(tmp.path(), &["init"]);
    assert!(second, "Second init failed (not idempotent)");
    assert!(stdout.contains("already initialized"));
}

#[test]
fn test_init_into_directory() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_docs(tmp.path(), &["init", "project"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(tmp.path().join("project/.docs/elements.toml").is_file());
    assert!(!tmp.path().join(".docs").exists());
}

#[test]
fn test_add_from_local_file() {
    let tmp = TempDir::new().unwrap();
    let doc = write_doc(tmp.path(), "sample.md", "Sample documentation text.");

    run_docs(tmp.path(), &["init"]);
    let (stdout, stderr, success) = run_docs(tmp.path(), &["add", "sample_tool", &doc]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("added: 1"));
    assert!(stdout.contains("elements stored: 1"));

    let entries = Manifest::for_project(tmp.path()).read().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries["sample_tool"].version, doc);
    assert_eq!(entries["sample_tool"].content, "Sample documentation text.");
    assert!(tmp.path().join(".docs/chromadb/collections.sqlite").is_file());
}

#[test]
fn test_add_without_version_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_docs(tmp.path(), &["add", "lonely_tool"]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("skipped: 1"));
    assert!(stderr.contains("No version specified"));
    assert!(Manifest::for_project(tmp.path()).read().unwrap().is_empty());
}

#[test]
fn test_add_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("files").join("missing.md");
    let (stdout, _, success) = run_docs(
        tmp.path(),
        &["add", "broken_tool", missing.to_str().unwrap()],
    );
    assert!(!success, "add of a missing file should fail");
    assert!(stdout.contains("failed: 1"));
}

#[test]
fn test_add_requires_arguments() {
    let tmp = TempDir::new().unwrap();
    let (_, _, success) = run_docs(tmp.path(), &["add"]);
    assert!(!success);
}

#[test]
fn test_update_force_refreshes_timestamp() {
    let tmp = TempDir::new().unwrap();
    let doc = write_doc(tmp.path(), "tool.md", "Version one notes.");
    run_docs(tmp.path(), &["add", "toolX", &doc]);
    let before = Manifest::for_project(tmp.path()).read().unwrap()["toolX"].clone();

    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(&doc, "Version one notes, revised.").unwrap();

    let (stdout, stderr, success) = run_docs(tmp.path(), &["update", "--force"]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("updated: 1"));

    let after = Manifest::for_project(tmp.path()).read().unwrap()["toolX"].clone();
    assert_eq!(after.version, before.version);
    assert_ne!(after.updated_at, before.updated_at);
    assert_eq!(after.content, "Version one notes, revised.");
}

#[test]
fn test_update_without_force_keeps_current_elements() {
    let tmp = TempDir::new().unwrap();
    let doc = write_doc(tmp.path(), "tool.md", "Notes.");
    run_docs(tmp.path(), &["add", "toolY", &doc]);

    let (stdout, stderr, success) = run_docs(tmp.path(), &["update"]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("updated: 0"));
    assert!(stdout.contains("up to date: 1"));
}

#[test]
fn test_pull_is_an_alias_for_update() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_docs(tmp.path(), &["pull"]);
    assert!(success, "pull failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("updated: 0"));
}

#[test]
fn test_config_default_and_runtime_set() {
    let tmp = TempDir::new().unwrap();

    let (stdout, _, success) = run_docs(tmp.path(), &["config", "MAX_TOKENS"]);
    assert!(success);
    assert!(stdout.contains("MAX_TOKENS = 4096 (defined in: default)"));

    let (stdout, _, success) = run_docs(tmp.path(), &["config", "MAX_TOKENS", "2048"]);
    assert!(success);
    assert!(stdout.contains("MAX_TOKENS = 2048 (defined in: set at runtime)"));

    let (stdout, _, success) = run_docs(tmp.path(), &["config", "MAX_TOKENS"]);
    assert!(success);
    assert!(stdout.contains("MAX_TOKENS = 2048 (defined in: local config file)"));
}

#[test]
fn test_config_env_overrides_local_file() {
    let tmp = TempDir::new().unwrap();
    run_docs(tmp.path(), &["config", "MAX_TOKENS", "2048"]);

    let mut cmd = docs_command(tmp.path(), &["config", "MAX_TOKENS"]);
    cmd.env("MAX_TOKENS", "1000");
    let (stdout, _, success) = run(cmd);
    assert!(success);
    assert!(stdout.contains("MAX_TOKENS = 1000 (defined in: environment variable)"));
}

#[test]
fn test_config_reads_global_file() {
    let tmp = TempDir::new().unwrap();
    let global = global_config(tmp.path());
    fs::create_dir_all(global.parent().unwrap()).unwrap();
    fs::write(&global, "CHAT_MODEL = \"global-model\"\n").unwrap();

    let (stdout, _, success) = run_docs(tmp.path(), &["config", "CHAT_MODEL"]);
    assert!(success);
    assert!(stdout.contains("CHAT_MODEL = global-model (defined in: global config file)"));
}

#[test]
fn test_config_unknown_option() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, success) = run_docs(tmp.path(), &["config", "NOT_A_SETTING"]);
    assert!(success);
    assert!(stdout.contains("NOT_A_SETTING is not set"));
}

#[test]
fn test_silent_suppresses_output() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, success) = run_docs(tmp.path(), &["--silent", "config", "MAX_TOKENS"]);
    assert!(success);
    assert!(stdout.is_empty());
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_docs(tmp.path(), &["frobnicate"]);
    assert!(!success);
    assert!(stderr.contains("frobnicate"));
}
