use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

fn finshell_cmd(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("finshell"));
    cmd.env("FINSHELL_HOME", home.path());
    cmd
}

fn run_ok_out(home: &tempfile::TempDir, args: &[&str]) -> String {
    let mut cmd = finshell_cmd(home);
    cmd.args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).expect("utf8 stdout")
}

fn created_id(out: &str) -> String {
    out.lines()
        .find_map(|l| l.strip_prefix("ID: "))
        .expect("id line")
        .to_string()
}

fn seed(home: &tempfile::TempDir) {
    let account = created_id(&run_ok_out(home, &["account", "create", "Checking"]));
    let salary = created_id(&run_ok_out(
        home,
        &["category", "create", "Salary", "--type", "income"],
    ));
    let rent = created_id(&run_ok_out(
        home,
        &["category", "create", "Rent", "--type", "expense"],
    ));
    run_ok_out(home, &["add-income", &account, &salary, "1000", "-m", "pay"]);
    run_ok_out(home, &["add-expense", &account, &rent, "200"]);
}

#[test]
fn json_round_trip_preserves_entity_counts() {
    let source = tempfile::tempdir().expect("tempdir");
    seed(&source);

    let file = source.path().join("export.json");
    let file_arg = file.to_str().expect("path");
    run_ok_out(&source, &["export", "json", "--out", file_arg]);

    let json = fs::read_to_string(&file).expect("read export");
    assert!(json.contains("\"accountName\": \"Checking\""));
    assert!(json.contains("\"categoryName\": \"Salary\""));

    let target = tempfile::tempdir().expect("tempdir");
    let report = run_ok_out(&target, &["import", "json", file_arg]);
    assert!(report.contains("Imported 1 accounts, 2 categories, 2 operations (0 rows skipped)"));

    let accounts = run_ok_out(&target, &["account", "list"]);
    assert!(accounts.contains("Checking"));
    let ops = run_ok_out(&target, &["op", "list"]);
    assert_eq!(ops.lines().count(), 2);
}

#[test]
fn table_round_trip_preserves_entity_counts() {
    let source = tempfile::tempdir().expect("tempdir");
    seed(&source);

    let file = source.path().join("export.txt");
    let file_arg = file.to_str().expect("path");
    run_ok_out(&source, &["export", "table", "--out", file_arg]);

    let text = fs::read_to_string(&file).expect("read export");
    assert!(text.contains("== ACCOUNTS =="));
    assert!(text.contains("== OPERATIONS =="));

    let target = tempfile::tempdir().expect("tempdir");
    let report = run_ok_out(&target, &["import", "table", file_arg]);
    assert!(report.contains("Imported 1 accounts, 2 categories, 2 operations (0 rows skipped)"));
}

#[test]
fn selective_export_drops_sections() {
    let home = tempfile::tempdir().expect("tempdir");
    seed(&home);

    let file = home.path().join("partial.json");
    let file_arg = file.to_str().expect("path");
    run_ok_out(
        &home,
        &["export", "json", "--out", file_arg, "--no-operations"],
    );

    let json = fs::read_to_string(&file).expect("read export");
    assert!(json.contains("\"accounts\""));
    assert!(json.contains("\"categories\""));
    assert!(!json.contains("\"operations\""));
}

#[test]
fn rows_with_unresolved_names_are_skipped_with_a_count() {
    let home = tempfile::tempdir().expect("tempdir");
    let file = home.path().join("partial.json");
    fs::write(
        &file,
        r#"{
            "accounts": [{"name": "Wallet", "balance": "100"}],
            "categories": [{"name": "Tips", "type": "INCOME"}],
            "operations": [
                {"type": "INCOME", "amount": "25", "date": "2024-03-01T10:00:00",
                 "accountName": "Wallet", "categoryName": "Tips"},
                {"type": "INCOME", "amount": "10", "date": "2024-03-02T10:00:00",
                 "accountName": "Nobody", "categoryName": "Tips"}
            ]
        }"#,
    )
    .expect("write import file");

    let report = run_ok_out(&home, &["import", "json", file.to_str().expect("path")]);
    assert!(report.contains("Imported 1 accounts, 1 categories, 1 operations (1 rows skipped)"));

    let balance = run_ok_out(&home, &["balance"]);
    assert!(balance.contains("Total balance: 125"));
}
