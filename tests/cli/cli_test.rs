//! Offline subcommands run against a temporary runtime directory.

use std::path::Path;

use assert_cmd::Command;

fn postcraft(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("postcraft").expect("binary should build");
    cmd.arg("--home").arg(home);
    cmd.env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env("RUST_LOG", "error");
    cmd
}

fn stdout(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf-8 stdout")
}

#[test]
fn init_lays_out_the_runtime_directory() {
    let home = tempfile::tempdir().expect("temp dir");

    let out = stdout(postcraft(home.path()).arg("init"));
    assert!(out.contains("config.toml"));
    assert!(out.contains("postcraft voice set"));

    let config = std::fs::read_to_string(home.path().join("config.toml")).expect("config written");
    assert!(config.contains("[models]"));
    assert!(home.path().join(".env").exists());
    assert!(home.path().join("data").is_dir());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(home.path().join(".env"))
            .expect("env metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn init_keeps_existing_files() {
    let home = tempfile::tempdir().expect("temp dir");
    std::fs::write(home.path().join("config.toml"), "# mine\n").expect("write config");

    let out = stdout(postcraft(home.path()).arg("init"));
    assert!(out.contains("config exists"));
    assert_eq!(
        std::fs::read_to_string(home.path().join("config.toml")).expect("config"),
        "# mine\n"
    );
}

#[test]
fn voice_set_then_show() {
    let home = tempfile::tempdir().expect("temp dir");
    let doc = home.path().join("voice.md");
    std::fs::write(&doc, "  Calm and kind, with a dry wit.\n\n").expect("write doc");

    let out = stdout(postcraft(home.path()).arg("voice").arg("set").arg(&doc));
    assert!(out.contains("brand voice updated: 7 words"));

    let out = stdout(postcraft(home.path()).args(["voice", "show"]));
    assert_eq!(out.trim_end(), "Calm and kind, with a dry wit.");
}

#[test]
fn voice_show_without_a_voice_fails() {
    let home = tempfile::tempdir().expect("temp dir");
    let output = postcraft(home.path())
        .args(["voice", "show"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8 stderr");
    assert!(stderr.contains("brand voice not found"));
}

#[test]
fn prefs_with_no_history() {
    let home = tempfile::tempdir().expect("temp dir");
    let out = stdout(postcraft(home.path()).arg("prefs"));
    assert_eq!(out.trim(), "No approved posts yet.");
}

#[test]
fn generate_without_config_fails() {
    let home = tempfile::tempdir().expect("temp dir");
    let output = postcraft(home.path())
        .args(["generate", "morning", "routines"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8 stderr");
    assert!(stderr.contains("postcraft init"));
}

#[test]
fn calendar_rejects_out_of_range_size() {
    let home = tempfile::tempdir().expect("temp dir");
    postcraft(home.path())
        .args(["calendar", "9"])
        .assert()
        .failure();
}
