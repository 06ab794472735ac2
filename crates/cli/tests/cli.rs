use assert_cmd::Command;

fn shelf() -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.env("SHELF_CONFIG_DIR", std::env::temp_dir().join("shelf-cli-no-config"))
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let output = shelf().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["serve", "migrate", "import", "providers"] {
        assert!(stdout.contains(command), "missing {command} in help:\n{stdout}");
    }
}

#[test]
fn migrate_reports_applied_migrations() {
    let output = shelf()
        .args(["migrate", "--database-url", "sqlite::memory:"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("3 migrations applied"));
}

#[test]
fn import_counts_created_duplicate_and_invalid_books() {
    let file = std::env::temp_dir().join(format!("shelf-import-{}.json", std::process::id()));
    std::fs::write(
        &file,
        serde_json::json!([
            { "title": "The Great Gatsby", "author": "F. Scott Fitzgerald", "isbn": "9780743273565" },
            { "title": "Gatsby again", "author": "F. Scott Fitzgerald", "isbn": "978-0-7432-7356-5" },
            { "title": "", "author": "Nobody" }
        ])
        .to_string(),
    )
    .unwrap();

    let output = shelf()
        .args(["import", "--database-url", "sqlite::memory:", "--file"])
        .arg(&file)
        .output()
        .unwrap();
    std::fs::remove_file(&file).ok();
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout.find('{').unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    assert_eq!(report["created"], 1);
    assert_eq!(report["duplicates"], 1);
    assert_eq!(report["invalid"], 1);
}

#[test]
fn import_rejects_non_array_file() {
    let file = std::env::temp_dir().join(format!("shelf-bad-{}.json", std::process::id()));
    std::fs::write(&file, r#"{"title": "not an array"}"#).unwrap();

    let output = shelf()
        .args(["import", "--database-url", "sqlite::memory:", "--file"])
        .arg(&file)
        .output()
        .unwrap();
    std::fs::remove_file(&file).ok();
    assert!(!output.status.success());
}
