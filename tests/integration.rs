use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mwi_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mwi");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"assume_yes = true

[data]
location = "{}/data"

[crawl]
parallel_connections = 2
"#,
        root.display()
    );
    let config_path = root.join("mwi.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run_mwi(config_path: &Path, args: &[&str]) -> (String, String, i32) {
    let binary = mwi_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mwi binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

#[test]
fn db_setup_succeeds_and_is_repeatable() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, code) = run_mwi(&config_path, &["db", "setup"]);
    assert_eq!(code, 1, "setup failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("setup complete"));

    let (_, _, code) = run_mwi(&config_path, &["db", "setup"]);
    assert_eq!(code, 1);
}

#[test]
fn land_lifecycle() {
    let (_tmp, config_path) = setup_test_env();
    run_mwi(&config_path, &["db", "setup"]);

    let (stdout, _, code) = run_mwi(
        &config_path,
        &[
            "land", "create", "--name", "asthme", "--desc", "Asthme et air", "--lang", "fr",
        ],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("created"));

    // Duplicate creation fails with exit code 0.
    let (_, _, code) = run_mwi(&config_path, &["land", "create", "--name", "asthme"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_mwi(
        &config_path,
        &["land", "addterm", "--land", "asthme", "--terms", "asthme, pollution"],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("2 terms"));

    let (stdout, _, code) = run_mwi(
        &config_path,
        &[
            "land",
            "addurl",
            "--land",
            "asthme",
            "--urls",
            "https://example.com/un, https://example.com/deux",
        ],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("2 URLs added"));

    let (stdout, _, code) = run_mwi(&config_path, &["land", "list"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("asthme"));
    assert!(stdout.contains("2 terms"));
    assert!(stdout.contains("2 expressions"));
    assert!(stdout.contains("2 remaining to crawl"));

    let (stdout, _, code) = run_mwi(&config_path, &["land", "delete", "--name", "asthme"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("deleted"));

    let (stdout, _, _) = run_mwi(&config_path, &["land", "list"]);
    assert!(stdout.contains("No land created"));
}

#[test]
fn addurl_from_file() {
    let (tmp, config_path) = setup_test_env();
    run_mwi(&config_path, &["db", "setup"]);
    run_mwi(&config_path, &["land", "create", "--name", "presse"]);

    let url_file = tmp.path().join("urls.txt");
    fs::write(
        &url_file,
        "https://example.com/a\nhttps://example.com/b\nnot a url\n",
    )
    .unwrap();

    let (stdout, _, code) = run_mwi(
        &config_path,
        &[
            "land",
            "addurl",
            "--land",
            "presse",
            "--path",
            url_file.to_str().unwrap(),
        ],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("2 URLs added"));
}

#[test]
fn unknown_land_fails_with_exit_zero() {
    let (_tmp, config_path) = setup_test_env();
    run_mwi(&config_path, &["db", "setup"]);

    let (_, stderr, code) = run_mwi(
        &config_path,
        &["land", "addterm", "--land", "missing", "--terms", "x"],
    );
    assert_eq!(code, 0);
    assert!(stderr.contains("not found"));

    let (_, _, code) = run_mwi(&config_path, &["land", "crawl", "--name", "missing"]);
    assert_eq!(code, 0);
}

#[test]
fn addurl_requires_urls_or_path() {
    let (_tmp, config_path) = setup_test_env();
    run_mwi(&config_path, &["db", "setup"]);
    run_mwi(&config_path, &["land", "create", "--name", "vide"]);

    let (_, stderr, code) = run_mwi(&config_path, &["land", "addurl", "--land", "vide"]);
    assert_eq!(code, 0);
    assert!(stderr.contains("--urls or --path"));
}

#[test]
fn heuristic_update_runs_on_empty_store() {
    let (_tmp, config_path) = setup_test_env();
    run_mwi(&config_path, &["db", "setup"]);

    let (stdout, _, code) = run_mwi(&config_path, &["heuristic", "update"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("0 domain reference(s) updated"));
}
