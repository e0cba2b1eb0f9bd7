use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn fragtoy(root: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fragtoy"));
    command
        .env("FRAGTOY_CONFIG_DIR", root.join("config"))
        .env("FRAGTOY_DATA_DIR", root.join("data"))
        .env("FRAGTOY_ASSETS_DIR", root.join("assets"))
        .env_remove("RUST_LOG");
    command
}

#[test]
fn where_reports_overridden_directories_and_assets() {
    let root = TempDir::new().unwrap();
    let assets = root.path().join("assets");
    fs::create_dir_all(&assets).unwrap();
    fs::write(assets.join("default.fs"), "void main() {}").unwrap();

    let output = fragtoy(root.path())
        .arg("where")
        .output()
        .expect("failed to run fragtoy where");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Config dir: {}", root.path().join("config").display())));
    assert!(stdout.contains(&format!("Data dir: {}", root.path().join("data").display())));
    assert!(stdout.contains("(not present)"));
    assert!(stdout.contains(&format!(
        "Screenshot dir: {}",
        root.path().join("data/screenshots").display()
    )));
    assert!(stdout.contains(&format!("Shader: {}", assets.join("default.fs").display())));
}

#[test]
fn where_applies_config_file() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("fragtoy.toml"),
        "screenshot_dir = \"/srv/shots\"\n",
    )
    .unwrap();

    let output = fragtoy(root.path())
        .arg("where")
        .output()
        .expect("failed to run fragtoy where");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Screenshot dir: /srv/shots"));
    assert!(!stdout.contains("(not present)"));
}

#[test]
fn malformed_config_file_fails_startup() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("fragtoy.toml"), "window_size = 12\n").unwrap();

    let output = fragtoy(root.path())
        .arg("where")
        .output()
        .expect("failed to run fragtoy where");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse config file"));
}
