use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn wisdom_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("wisdom");
    path
}

fn setup_test_env(backend: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let store_path = match backend {
        "sqlite" => root.join("data").join("wisdom.sqlite"),
        _ => root.join("data"),
    };

    let config_content = format!(
        r#"[store]
backend = "{}"
path = "{}"

[embedding]
provider = "disabled"

[dedup]
proverb_threshold = 0.85
life_lesson_threshold = 0.80

[server]
bind = "127.0.0.1:8501"
"#,
        backend,
        store_path.display()
    );

    let config_path = config_dir.join("wisdom.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_wisdom(config_path: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let binary = wisdom_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run wisdom binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

#[test]
fn test_init_creates_store() {
    let (tmp, config_path) = setup_test_env("json");

    let (stdout, stderr, code) = run_wisdom(&config_path, &["init"]);
    assert_eq!(code, Some(0), "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").is_dir());

    let (_, _, code) = run_wisdom(&config_path, &["init"]);
    assert_eq!(code, Some(0), "Second init failed (not idempotent)");
}

#[test]
fn test_submit_then_browse() {
    let (tmp, config_path) = setup_test_env("json");

    let (stdout, stderr, code) = run_wisdom(
        &config_path,
        &[
            "submit",
            "proverb",
            "  కష్టే ఫలి  ",
            "--language",
            "telugu",
            "--region",
            "Andhra Pradesh",
        ],
    );
    assert_eq!(code, Some(0), "submit failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("saved"));

    let raw = fs::read_to_string(tmp.path().join("data").join("proverbs.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored[0]["text"], "కష్టే ఫలి");
    assert_eq!(stored[0]["language"], "Telugu");
    assert_eq!(stored[0]["contributor"], "Anonymous");
    assert_eq!(stored[0]["type"], "Proverb");

    let (stdout, _, code) = run_wisdom(&config_path, &["browse", "proverbs"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("Proverb: కష్టే ఫలి"));
    assert!(stdout.contains("Region: Andhra Pradesh"));
    assert!(stdout.contains("Contributed By: Anonymous on "));
}

#[test]
fn test_blank_submission_is_rejected() {
    let (tmp, config_path) = setup_test_env("json");

    let (_, stderr, code) = run_wisdom(&config_path, &["submit", "life-lesson", "   "]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("please enter the text"));
    assert!(!tmp.path().join("data").join("life_lessons.json").exists());
}

#[test]
fn test_disabled_model_never_blocks() {
    let (_tmp, config_path) = setup_test_env("json");

    for _ in 0..2 {
        let (stdout, stderr, code) =
            run_wisdom(&config_path, &["submit", "proverb", "Hard work pays off."]);
        assert_eq!(code, Some(0), "stdout={}, stderr={}", stdout, stderr);
    }

    let (_, stderr, _) = run_wisdom(&config_path, &["check", "proverb", "Hard work pays off."]);
    assert!(stderr.contains("model unavailable"), "stderr={}", stderr);

    let (stdout, _, _) = run_wisdom(&config_path, &["browse", "proverb", "--json"]);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(items.as_array().unwrap().len(), 2);
}

#[test]
fn test_browse_empty_categories() {
    let (_tmp, config_path) = setup_test_env("json");

    let (stdout, _, code) = run_wisdom(&config_path, &["browse"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("No proverbs submitted yet."));
    assert!(stdout.contains("No life lessons submitted yet."));
}

#[test]
fn test_export_csv_to_file() {
    let (tmp, config_path) = setup_test_env("json");

    run_wisdom(
        &config_path,
        &["submit", "life-lesson", "Listen first, then speak.", "--contributor", "Ravi"],
    );

    let out = tmp.path().join("out").join("lessons.csv");
    let (_, stderr, code) = run_wisdom(
        &config_path,
        &["export", "life-lesson", "--output", out.to_str().unwrap()],
    );
    assert_eq!(code, Some(0), "export failed: {}", stderr);

    let csv = fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,timestamp,language,region_hint,contributor,text,type"
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",Ravi,\"Listen first, then speak.\",Life Lesson"));
}

#[test]
fn test_export_empty_category() {
    let (_tmp, config_path) = setup_test_env("json");

    let (stdout, stderr, code) = run_wisdom(&config_path, &["export", "proverb"]);
    assert_eq!(code, Some(0));
    assert!(stderr.contains("No proverbs to download yet."));
    assert!(stdout.is_empty(), "stdout should carry export data only: {}", stdout);
}

#[test]
fn test_corrupt_store_is_not_overwritten() {
    let (tmp, config_path) = setup_test_env("json");
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("proverbs.json"), "[{broken").unwrap();

    let (_, stderr, code) = run_wisdom(&config_path, &["submit", "proverb", "New one."]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("could not save proverbs"), "stderr={}", stderr);
    assert_eq!(
        fs::read_to_string(data.join("proverbs.json")).unwrap(),
        "[{broken"
    );
}

#[test]
fn test_sqlite_backend() {
    let (_tmp, config_path) = setup_test_env("sqlite");

    let (_, stderr, code) = run_wisdom(&config_path, &["init"]);
    assert_eq!(code, Some(0), "init failed: {}", stderr);

    run_wisdom(&config_path, &["submit", "proverb", "first"]);
    run_wisdom(&config_path, &["submit", "proverb", "second"]);

    let (stdout, _, code) = run_wisdom(&config_path, &["export", "proverb", "--format", "json"]);
    assert_eq!(code, Some(0));
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let texts: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[test]
fn test_languages_and_model_status() {
    let (_tmp, config_path) = setup_test_env("json");

    let (stdout, _, code) = run_wisdom(&config_path, &["languages"]);
    assert_eq!(code, Some(0));
    assert!(stdout.lines().any(|l| l == "Telugu"));
    assert_eq!(stdout.lines().last(), Some("Other (Please Specify)"));

    let (stdout, _, code) = run_wisdom(&config_path, &["model"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("unavailable"));
    assert!(stdout.contains("disabled"));
}

#[test]
fn test_invalid_config_fails() {
    let (tmp, _) = setup_test_env("json");
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(&bad, "[dedup]\nproverb_threshold = 1.5\n").unwrap();

    let (_, stderr, code) = run_wisdom(&bad, &["browse"]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("proverb_threshold"), "stderr={}", stderr);
}
