use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env(backend: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Collector output from two runs a week apart. The second run re-collects
    // the same creative under a freshly signed URL.
    let batches_dir = root.join("batches");
    fs::create_dir_all(&batches_dir).unwrap();
    fs::write(
        batches_dir.join("20240101_090000_shoes.json"),
        r#"{
  "query": "shoes",
  "collected_at": "2024-01-01T09:00:00",
  "count": 3,
  "source": "playwright_scraping",
  "ads": [
    {"page_name": "Acme", "ad_text": "Fast shoes", "image_urls": ["https://cdn.example/a/img123.jpg?sig=X"]},
    {"page_name": "Beta", "ad_text": ["Comfy", "Cheap"], "image_urls": ["https://cdn.example/a/img456.png"]},
    {"page_name": "Ghost", "ad_text": "No picture", "image_urls": []}
  ]
}"#,
    )
    .unwrap();
    fs::write(
        batches_dir.join("20240108_090000_shoes.json"),
        r#"{
  "keyword": "shoes",
  "collected_at": "2024-01-08T09:00:00",
  "ads": [
    {"page_name": "Acme", "ad_text": "Fast shoes", "image_urls": ["https://cdn.example/b/img123.jpg?sig=Y"]},
    {"page_name": null, "ad_text": "Mystery", "image_urls": ["https://cdn.example/a/img789.jpg"]}
  ]
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[store]
backend = "{backend}"

[json]
raw_dir = "{root}/data/raw"
keywords_file = "{root}/data/keywords.json"
highlights_file = "{root}/data/highlights.json"

[db]
path = "{root}/data/adshelf.sqlite"

[server]
bind = "127.0.0.1:8599"

[dashboard]
page_size = 70
"#,
        backend = backend,
        root = root.display()
    );

    let config_path = config_dir.join("adshelf.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_adshelf(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_adshelf"))
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run adshelf binary: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn import_fixtures(tmp: &TempDir, config_path: &Path) {
    let batches = tmp.path().join("batches");
    let (stdout, stderr, success) =
        run_adshelf(config_path, &["import", batches.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("batches saved: 2"), "got: {}", stdout);
}

fn query_json(config_path: &Path, extra: &[&str]) -> serde_json::Value {
    let mut args = vec!["query", "--json"];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_adshelf(config_path, &args);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_init_idempotent_both_backends() {
    for backend in ["json", "sqlite"] {
        let (_tmp, config_path) = setup_test_env(backend);
        let (stdout, stderr, success) = run_adshelf(&config_path, &["init"]);
        assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
        assert!(stdout.contains("initialized"));
        let (_, _, again) = run_adshelf(&config_path, &["init"]);
        assert!(again, "second init failed for {}", backend);
    }
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_adshelf(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}

#[test]
fn test_import_then_query_dedups_and_drops_invalid() {
    for backend in ["json", "sqlite"] {
        let (tmp, config_path) = setup_test_env(backend);
        run_adshelf(&config_path, &["init"]);
        import_fixtures(&tmp, &config_path);

        let resp = query_json(&config_path, &[]);
        assert_eq!(resp["keyword"], "shoes", "backend {}", backend);
        // img123 twice collapses to one; Ghost has no image.
        assert_eq!(resp["total_count"], 3, "backend {}", backend);
        assert_eq!(
            resp["available_advertisers"],
            serde_json::json!(["Acme", "Beta", "Unknown"])
        );

        // Earliest collection of img123 is the one kept.
        let items = resp["page_items"].as_array().unwrap();
        let acme = items.iter().find(|i| i["page_name"] == "Acme").unwrap();
        assert_eq!(acme["collected_at"], "2024-01-01T09:00:00");
    }
}

#[test]
fn test_query_filters() {
    let (tmp, config_path) = setup_test_env("json");
    run_adshelf(&config_path, &["init"]);
    import_fixtures(&tmp, &config_path);

    let none = query_json(&config_path, &["--no-advertisers"]);
    assert_eq!(none["total_count"], 0);
    assert_eq!(none["advertiser_selection"], "none");

    let beta = query_json(&config_path, &["--advertiser", "Beta"]);
    assert_eq!(beta["total_count"], 1);

    let late = query_json(&config_path, &["--from", "2024-01-05"]);
    assert_eq!(late["total_count"], 1);

    let paged = query_json(&config_path, &["--page-size", "2", "--page", "2"]);
    assert_eq!(paged["page_count"], 2);
    assert_eq!(paged["page_items"].as_array().unwrap().len(), 1);
}

#[test]
fn test_keywords_lifecycle() {
    let (_tmp, config_path) = setup_test_env("sqlite");
    run_adshelf(&config_path, &["init"]);

    let (stdout, _, success) = run_adshelf(&config_path, &["keywords", "add", "  bags  "]);
    assert!(success);
    assert!(stdout.contains("Added keyword: bags"));

    let (stdout, _, _) = run_adshelf(&config_path, &["keywords", "add", "bags"]);
    assert!(stdout.contains("already registered"));

    let (stdout, _, _) = run_adshelf(&config_path, &["keywords", "list"]);
    assert!(stdout.contains("bags"));
    assert!(stdout.contains("KR"));
    assert!(stdout.contains("enabled"));

    let (_, _, success) = run_adshelf(&config_path, &["keywords", "disable", "bags"]);
    assert!(success);
    let (stdout, _, _) = run_adshelf(&config_path, &["keywords", "list"]);
    assert!(stdout.contains("disabled"));

    let (_, _, success) = run_adshelf(&config_path, &["keywords", "enable", "missing"]);
    assert!(!success);

    let (_, _, success) = run_adshelf(&config_path, &["keywords", "add", "   "]);
    assert!(!success);
}

#[test]
fn test_registered_keyword_leads_sidebar() {
    let (tmp, config_path) = setup_test_env("json");
    run_adshelf(&config_path, &["init"]);
    import_fixtures(&tmp, &config_path);
    run_adshelf(&config_path, &["keywords", "add", "bags"]);

    let resp = query_json(&config_path, &[]);
    assert_eq!(resp["keywords"], serde_json::json!(["bags", "shoes"]));
    assert_eq!(resp["keyword"], "bags");
    assert_eq!(resp["total_count"], 0);
}

#[test]
fn test_highlight_lifecycle() {
    for backend in ["json", "sqlite"] {
        let (tmp, config_path) = setup_test_env(backend);
        run_adshelf(&config_path, &["init"]);
        import_fixtures(&tmp, &config_path);

        let (stdout, stderr, success) = run_adshelf(
            &config_path,
            &["highlight", "add", "https://cdn.example/z/img123.jpg?sig=Q"],
        );
        assert!(success, "highlight add failed: {} {}", stdout, stderr);
        assert!(stdout.contains("Highlighted: img123"));

        let (stdout, _, _) = run_adshelf(&config_path, &["highlight", "add", "img123"]);
        assert!(stdout.contains("Already highlighted"));

        let resp = query_json(&config_path, &["--highlights"]);
        assert_eq!(resp["total_count"], 1, "backend {}", backend);
        assert_eq!(resp["available_keywords"], serde_json::json!(["shoes"]));

        let (_, _, success) = run_adshelf(&config_path, &["highlight", "add", "nothing-here"]);
        assert!(!success);

        let (stdout, _, _) = run_adshelf(&config_path, &["highlight", "remove", "img123"]);
        assert!(stdout.contains("Removed highlight"));
        let (stdout, _, _) = run_adshelf(&config_path, &["highlight", "list"]);
        assert!(stdout.contains("No highlights"));
    }
}

#[test]
fn test_delete_ad_removes_every_copy() {
    for backend in ["json", "sqlite"] {
        let (tmp, config_path) = setup_test_env(backend);
        run_adshelf(&config_path, &["init"]);
        import_fixtures(&tmp, &config_path);

        let (stdout, _, success) = run_adshelf(&config_path, &["delete-ad", "img123"]);
        assert!(success);
        assert!(stdout.contains("Deleted 2 record(s)"), "backend {}: {}", backend, stdout);

        let resp = query_json(&config_path, &[]);
        assert_eq!(resp["total_count"], 2);

        let (stdout, _, _) = run_adshelf(&config_path, &["delete-ad", "img123"]);
        assert!(stdout.contains("No ad with identity"));
    }
}

#[test]
fn test_collect_without_collector_fails() {
    let (_tmp, config_path) = setup_test_env("json");
    let (_, stderr, success) = run_adshelf(&config_path, &["collect", "shoes"]);
    assert!(!success);
    assert!(stderr.contains("[collector]"));
}
