//! Runs the `eval` binary against a pool file.

use std::process::Command;

use pretty_assertions::assert_eq;

const POOL: &str = r#"[
  {"intent_id": "s1", "user_id": "seller", "post_type": "supply",
   "category": "product", "raw_query": "Selling iPhone 13 in Whitefield for 45k",
   "location_name": "Whitefield", "created_at": "2026-01-01T00:00:00Z"}
]"#;

#[test]
fn test_json_format_keeps_stdout_parseable() {
    let pool = std::env::temp_dir().join(format!("eval-pool-{}.json", std::process::id()));
    std::fs::write(&pool, POOL).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_eval"))
        .args(["match", "--pool"])
        .arg(&pool)
        .args(["--text", "Looking for iPhone 13 under 50k", "--category", "product"])
        .args(["--format", "json"])
        .env("RUST_LOG", "debug")
        .output()
        .unwrap();
    std::fs::remove_file(&pool).ok();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(parsed.is_array());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.contains("Loaded 1 intents"), true);
}
