use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Scratch directory with a config pointing the session file inside it and
/// the API at a closed port.
fn sandbox(name: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("birdia-cli-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let session = dir.join("session.json");
    let conf = dir.join("birdia.conf");
    std::fs::write(
        &conf,
        format!(
            "API_URL=http://127.0.0.1:9/v1\nSESSION_PATH={}\n",
            session.display()
        ),
    )
    .unwrap();
    (conf, session)
}

fn birdia(conf: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_birdia"))
        .args(args)
        .env("BIRDIA_CONFIG", conf)
        .env_remove("BIRDIA_API_URL")
        .env_remove("BIRDIA_PASSWORD")
        .output()
        .expect("failed to execute birdia")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_birdia"))
        .arg("--help")
        .output()
        .expect("failed to execute birdia");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "got:\n{stdout}");
    assert!(stdout.contains("analyze"));
    assert!(stdout.contains("admin"));
}

#[test]
fn version_flag_works() {
    let output = Command::new(env!("CARGO_BIN_EXE_birdia"))
        .arg("--version")
        .output()
        .expect("failed to execute birdia");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("birdia "));
}

#[test]
fn whoami_requires_login() {
    let (conf, _) = sandbox("whoami");
    let output = birdia(&conf, &["whoami"]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("not logged in"), "got:\n{err}");
}

#[test]
fn whoami_shows_researcher_menu() {
    let (conf, session) = sandbox("researcher-menu");
    std::fs::write(&session, r#"{"token":"x","role_id":"1","userName":"Ana"}"#).unwrap();

    let output = birdia(&conf, &["whoami"]);
    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Ana"));
    assert!(stdout.contains("analyze"));
    assert!(!stdout.contains("admin dashboard"));
}

#[test]
fn admin_commands_refuse_researchers() {
    let (conf, session) = sandbox("researcher-admin");
    std::fs::write(&session, r#"{"token":"x","role_id":"1","userName":"Ana"}"#).unwrap();

    let output = birdia(&conf, &["admin", "users"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("administrator"), "got:\n{err}");
}

#[test]
fn idle_expired_session_is_dropped() {
    let (conf, session) = sandbox("idle");
    std::fs::write(
        &session,
        r#"{"token":"x","role_id":"0","userName":"Root","last_active":"2000-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let output = birdia(&conf, &["whoami"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not logged in"));
    assert!(!session.exists(), "expired session file should be removed");
}

#[test]
fn logout_clears_session_file() {
    let (conf, session) = sandbox("logout");
    std::fs::write(&session, r#"{"token":"x","role_id":"0","userName":"Root"}"#).unwrap();

    let output = birdia(&conf, &["logout"]);
    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert!(!session.exists());
}

#[test]
fn record_seconds_requires_record() {
    let (conf, _) = sandbox("seconds");
    let output = birdia(&conf, &["analyze", "--seconds", "5"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--record"));
}
