//! Tests for AgentLibrary config directory scanning.

use std::fs;
use tempfile::TempDir;

use reversi_arena::{AgentConfig, AgentLibrary};

/// Writes one agent TOML file into the temporary directory.
fn make_agent_toml(dir: &TempDir, filename: &str, id: &str, name: &str) {
    let content = format!(
        r#"id = "{id}"
name = "{name}"
command = ["echo", "test"]
description = "{name} plays reversi"
"#
    );
    fs::write(dir.path().join(filename), content).expect("Failed to write TOML");
}

#[test]
fn test_scan_loads_valid_configs() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "agent_a.toml", "a", "AgentA");
    make_agent_toml(&dir, "agent_b.toml", "b", "AgentB");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    assert_eq!(library.len(), 2);
}

#[test]
fn test_scan_sorted_by_id() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "1.toml", "zebra", "Zebra");
    make_agent_toml(&dir, "2.toml", "apple", "Apple");
    make_agent_toml(&dir, "3.toml", "mango", "Mango");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    let ids: Vec<&str> = library.agents().iter().map(|a| a.id().as_str()).collect();
    assert_eq!(ids, ["apple", "mango", "zebra"]);
}

#[test]
fn test_scan_skips_non_toml_files() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "valid.toml", "valid", "ValidAgent");
    fs::write(dir.path().join("notes.txt"), "not a config").expect("Write failed");
    fs::write(dir.path().join("config.json"), "{}").expect("Write failed");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    assert_eq!(library.len(), 1);
    assert_eq!(library.agents()[0].name(), "ValidAgent");
}

#[test]
fn test_scan_skips_invalid_toml() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "good.toml", "good", "GoodAgent");
    fs::write(dir.path().join("bad.toml"), "this is not valid toml !!!@@@").expect("Write failed");

    let library = AgentLibrary::scan(dir.path()).expect("Scan should succeed despite bad file");
    assert_eq!(library.len(), 1);
    assert_eq!(library.agents()[0].name(), "GoodAgent");
}

#[test]
fn test_scan_skips_empty_command() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "good.toml", "good", "GoodAgent");
    fs::write(
        dir.path().join("empty.toml"),
        "id = \"empty\"\nname = \"Empty\"\ncommand = []\n",
    )
    .expect("Write failed");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    assert_eq!(library.len(), 1);
    assert!(library.get("empty").is_none());
}

#[test]
fn test_scan_first_file_wins_on_duplicate_id() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "a.toml", "same", "First");
    make_agent_toml(&dir, "b.toml", "same", "Second");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    assert_eq!(library.len(), 1);
    assert_eq!(library.get("same").expect("agent missing").name(), "First");
}

#[test]
fn test_scan_empty_directory_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let result = AgentLibrary::scan(dir.path());
    assert!(result.is_err(), "Empty directory should return error");
}

#[test]
fn test_scan_nonexistent_directory_fails() {
    let result = AgentLibrary::scan("/this/path/does/not/exist/at/all");
    assert!(result.is_err());
}

#[test]
fn test_scan_file_path_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let file_path = dir.path().join("a_file.toml");
    fs::write(&file_path, "id = \"x\"\nname = \"X\"\ncommand = [\"echo\"]\n").expect("Write failed");

    let result = AgentLibrary::scan(&file_path);
    assert!(result.is_err(), "File path should return error");
}

#[test]
fn test_get_by_id() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "alpha.toml", "alpha", "Alpha");
    make_agent_toml(&dir, "beta.toml", "beta", "Beta");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    let found = library.get("alpha").expect("alpha should be loaded");
    assert_eq!(found.name(), "Alpha");
    assert!(library.get("gamma").is_none());
}

#[test]
fn test_summaries_expose_public_fields() {
    let library = AgentLibrary::from_configs(vec![AgentConfig::new(
        "greedy".to_string(),
        "Greedy Player".to_string(),
        vec!["greedy_agent".to_string()],
        "Takes the most discs".to_string(),
    )]);

    let summaries = library.summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, "greedy");
    assert_eq!(summaries[0].name, "Greedy Player");
    assert_eq!(summaries[0].description, "Takes the most discs");
}

#[test]
fn test_description_defaults_to_empty() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("bare.toml"),
        "id = \"bare\"\nname = \"Bare\"\ncommand = [\"bare_agent\", \"--fast\"]\n",
    )
    .expect("Write failed");

    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    let agent = library.get("bare").expect("bare should be loaded");
    assert_eq!(agent.description(), "");
    assert_eq!(agent.command(), &vec!["bare_agent".to_string(), "--fast".to_string()]);
}

#[test]
fn test_scan_repository_agents_directory() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("agents");
    let library = AgentLibrary::scan(&dir).expect("Repository agents should load");
    assert!(library.get("greedy").is_some());
}

#[test]
fn test_is_empty() {
    assert!(AgentLibrary::default().is_empty());
    let dir = TempDir::new().expect("Failed to create temp dir");
    make_agent_toml(&dir, "agent.toml", "some", "SomeAgent");
    let library = AgentLibrary::scan(dir.path()).expect("Scan failed");
    assert!(!library.is_empty());
}
