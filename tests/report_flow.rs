use assert_cmd::prelude::*;
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

fn seed_spending(home: &tempfile::TempDir) -> String {
    let account = created_id(&run_ok_out(home, &["account", "create", "Checking"]));
    let salary = created_id(&run_ok_out(
        home,
        &["category", "create", "Salary", "--type", "income"],
    ));
    let food = created_id(&run_ok_out(
        home,
        &["category", "create", "Food", "--type", "expense"],
    ));
    let gas = created_id(&run_ok_out(
        home,
        &["category", "create", "Gas", "--type", "expense"],
    ));

    run_ok_out(home, &["add-income", &account, &salary, "1000"]);
    run_ok_out(home, &["add-expense", &account, &food, "300"]);
    run_ok_out(home, &["add-expense", &account, &gas, "100"]);
    account
}

#[test]
fn expenses_by_category_totals_and_orders() {
    let home = tempfile::tempdir().expect("tempdir");
    seed_spending(&home);

    let out = run_ok_out(&home, &["report", "expenses-by-category"]);
    assert!(out.contains("EXPENSES BY CATEGORY"));
    assert!(out.contains("| Food"));
    assert!(out.contains("$300"));
    assert!(out.contains("| Gas"));
    assert!(out.contains("$100"));
    assert!(out.contains("| TOTAL"));
    assert!(out.contains("$400"));

    // Largest category first.
    let food = out.find("Food").expect("food row");
    let gas = out.find("Gas").expect("gas row");
    assert!(food < gas);
}

#[test]
fn income_by_category_omits_spending() {
    let home = tempfile::tempdir().expect("tempdir");
    seed_spending(&home);

    let out = run_ok_out(&home, &["report", "income-by-category"]);
    assert!(out.contains("| Salary"));
    assert!(out.contains("$1000"));
    assert!(!out.contains("Food"));
}

#[test]
fn top_report_truncates_to_the_limit() {
    let home = tempfile::tempdir().expect("tempdir");
    seed_spending(&home);

    let out = run_ok_out(&home, &["report", "top", "--limit", "1"]);
    assert!(out.contains("| Food"));
    assert!(!out.contains("| Gas"));
}

#[test]
fn categories_report_zero_fills_unused_categories() {
    let home = tempfile::tempdir().expect("tempdir");
    seed_spending(&home);
    run_ok_out(&home, &["category", "create", "Misc", "--type", "expense"]);

    let out = run_ok_out(&home, &["report", "categories", "expense"]);
    assert!(out.contains("| Misc"));
    assert!(out.contains("$0"));

    // Zero rows sort to the bottom.
    let gas = out.find("| Gas").expect("gas row");
    let misc = out.find("| Misc").expect("misc row");
    assert!(gas < misc);
}

#[test]
fn empty_report_prints_placeholder() {
    let home = tempfile::tempdir().expect("tempdir");
    let out = run_ok_out(&home, &["report", "expenses-by-category"]);
    assert!(out.contains("No data available for the report."));
}

#[test]
fn trend_reports_one_labelled_bucket_per_month() {
    let home = tempfile::tempdir().expect("tempdir");
    seed_spending(&home);

    let out = run_ok_out(&home, &["report", "trend", "--months", "3", "--type", "income"]);
    assert!(out.contains("MONTHLY INCOME"));
    // One row per month plus header and separator.
    assert_eq!(out.lines().filter(|l| l.starts_with('|')).count(), 5);

    let current = chrono::Local::now().format("%b %Y").to_string();
    assert!(out.contains(&current));
    assert!(out.contains("$1000"));
}
