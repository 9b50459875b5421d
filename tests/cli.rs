use assert_cmd::Command;
use predicates::prelude::*;

const PROXY_VARS: &[&str] = &[
    "ALL_PROXY",
    "all_proxy",
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
];

fn pubpages() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("pubpages")?;
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    for var in PROXY_VARS {
        cmd.env_remove(var);
    }
    Ok(cmd)
}

#[test]
fn config_prints_effective_settings() -> Result<(), Box<dyn std::error::Error>> {
    let output = pubpages()?
        .args(["config", "--min-year", "2016", "-p", "Alex Saywell", "--dedupe"])
        .output()?;
    assert!(output.status.success());

    let cfg: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(cfg["min_year"], 2016);
    assert_eq!(cfg["people"], serde_json::json!(["Alex Saywell"]));
    assert_eq!(cfg["affiliation"], "Nottingham");
    assert_eq!(cfg["dedupe"], true);
    assert!(cfg["proxy"].is_null());
    Ok(())
}

#[test]
fn config_file_is_loaded() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("recent.json");
    std::fs::write(
        &path,
        r#"{"people": ["Peter Beton", "James Sharp"], "min_year": 2016, "output_dir": "recent"}"#,
    )?;

    let output = pubpages()?
        .arg("config")
        .arg("--config")
        .arg(&path)
        .output()?;
    assert!(output.status.success());
    let cfg: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(cfg["people"], serde_json::json!(["Peter Beton", "James Sharp"]));
    assert_eq!(cfg["output_dir"], "recent");
    assert_eq!(cfg["base_url"], "https://scholar.google.com");
    Ok(())
}

#[test]
fn missing_config_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    pubpages()?
        .args(["config", "--config", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
    Ok(())
}

#[test]
fn blank_person_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    pubpages()?
        .args(["build", "--no-progress", "--person", "Alex Saywell", "--person", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("person #2 has an empty name"));
    Ok(())
}

#[test]
fn invalid_proxy_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    pubpages()?
        .args(["resolve", "--proxy", "not a proxy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid proxy URL"));
    Ok(())
}

#[test]
fn unreachable_provider_aborts_without_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = pubpages()?
        .args([
            "build",
            "--no-progress",
            "--base-url",
            "http://127.0.0.1:9",
            "--timeout",
            "5",
            "-p",
            "Alex Saywell",
        ])
        .arg("--output-dir")
        .arg(dir.path())
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(
        stderr.contains("author search failed for query \"Alex Saywell, Nottingham\""),
        "stderr did not name the failing query. stderr=\n{}",
        stderr
    );
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn shipped_configs_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("configs");
    let mut loaded = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let output = pubpages()?
            .arg("config")
            .arg("--config")
            .arg(&path)
            .output()?;
        assert!(
            output.status.success(),
            "{} did not load. stderr=\n{}",
            path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
        let cfg: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(cfg["affiliation"], "Nottingham");
        loaded.push(cfg["min_year"].as_i64());
    }
    loaded.sort();
    assert_eq!(loaded, vec![Some(1990), Some(2016)]);
    Ok(())
}
