mod analytics;
mod cli;
mod config;
mod db;
mod domain;
mod error;
mod export;
mod factory;
mod import;
mod ledger;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs;

use crate::analytics::TrendKind;
use crate::cli::{
    AccountCmd, AddOperationArgs, CategoryCmd, Cli, Command, ExportArgs, ImportArgs, IoFormat,
    OpCmd, ReportCmd,
};
use crate::config::{app_paths, now_local};
use crate::db::Db;
use crate::domain::{Operation, OperationType, TABLE_DATETIME_FORMAT, parse_datetime};
use crate::export::ExportSelection;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = app_paths(cli.home.clone())?;
    let mut db = Db::open(&paths)?;

    match cli.command {
        Command::Account(args) => handle_account(&mut db, args.cmd),
        Command::Category(args) => handle_category(&mut db, args.cmd),
        Command::AddIncome(args) => handle_add(&mut db, OperationType::Income, args),
        Command::AddExpense(args) => handle_add(&mut db, OperationType::Expense, args),
        Command::Op(args) => handle_op(&mut db, args.cmd),
        Command::Balance => {
            println!("Total balance: {}", ledger::total_balance(&db)?.round_dp(2));
            Ok(())
        }
        Command::Report(args) => handle_report(&db, args.cmd),
        Command::Export(args) => handle_export(&db, args),
        Command::Import(args) => handle_import(&mut db, args),
    }
}

fn handle_account(db: &mut Db, cmd: AccountCmd) -> Result<()> {
    match cmd {
        AccountCmd::Create {
            name,
            balance,
            password,
            phone,
            card,
        } => {
            let account = match (password, card) {
                (Some(password), Some(card)) => ledger::create_account_with_details(
                    db,
                    &name,
                    balance,
                    &password,
                    phone.as_deref(),
                    &card,
                )?,
                _ => ledger::create_account(db, &name, balance)?,
            };
            println!("Created account\n{}", account.detailed());
        }
        AccountCmd::List { min_balance } => {
            let accounts = ledger::list_accounts(db, min_balance)?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                for account in accounts {
                    println!("{} | {}", account.id, account.summary_line());
                }
            }
        }
        AccountCmd::Get { id } => {
            println!("{}", ledger::get_account(db, id)?.detailed());
        }
        AccountCmd::Find { name } => match ledger::get_account_by_name(db, &name)? {
            Some(account) => println!("{}", account.detailed()),
            None => println!("No account named '{name}'"),
        },
        AccountCmd::Rename { id, name } => {
            let account = ledger::rename_account(db, id, &name)?;
            println!("Renamed account: {}", account.summary_line());
        }
        AccountCmd::Delete { id } => {
            if ledger::delete_account(db, id)? {
                println!("Deleted account {id} and all of its operations");
            } else {
                println!("Account {id} not found");
            }
        }
        AccountCmd::Recalculate { id } => {
            let account = ledger::recalculate_balance(db, id)?;
            println!("Recalculated: {}", account.summary_line());
        }
        AccountCmd::Summary { id, from, to } => {
            let account = ledger::get_account(db, id)?;
            let summary = ledger::balance_summary(db, id, from, to)?;
            println!("{}", analytics::render_account_summary(&account, &summary, from, to));
        }
    }
    Ok(())
}

fn handle_category(db: &mut Db, cmd: CategoryCmd) -> Result<()> {
    match cmd {
        CategoryCmd::Create { name, op_type } => {
            let category = ledger::create_category(db, &name, op_type)?;
            println!("Created category\n{}", category.detailed());
        }
        CategoryCmd::List { op_type } => {
            let categories = ledger::list_categories(db, op_type)?;
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                for category in categories {
                    println!("{} | {}", category.id, category.summary_line());
                }
            }
        }
        CategoryCmd::Get { id } => {
            println!("{}", ledger::get_category(db, id)?.detailed());
        }
        CategoryCmd::Rename { id, name } => {
            let category = ledger::rename_category(db, id, &name)?;
            println!("Renamed category: {}", category.summary_line());
        }
        CategoryCmd::Delete { id } => {
            if ledger::delete_category(db, id)? {
                println!("Deleted category {id}");
            } else {
                println!("Category {id} not deleted: missing or still referenced by operations");
            }
        }
    }
    Ok(())
}

fn handle_add(db: &mut Db, op_type: OperationType, args: AddOperationArgs) -> Result<()> {
    let date = match &args.date {
        Some(raw) => parse_datetime(raw).ok_or_else(|| anyhow!("Unparseable date '{raw}'"))?,
        None => now_local(),
    };

    let operation = ledger::create_operation(
        db,
        op_type,
        args.account_id,
        args.category_id,
        args.amount,
        date,
        args.note.as_deref(),
    )?;
    let account = ledger::get_account(db, operation.account_id)?;

    println!("Recorded {}", operation_line(&operation));
    println!("{}", account.summary_line());
    Ok(())
}

fn handle_op(db: &mut Db, cmd: OpCmd) -> Result<()> {
    match cmd {
        OpCmd::List {
            account,
            from,
            to,
            day,
            month,
            op_type,
            by_day,
        } => {
            let range = from.zip(to);

            if by_day {
                let (from, to) = range.context("--by-day requires --from and --to")?;
                let grouped = ledger::operations_grouped_by_day(db, from, to)?;
                if grouped.is_empty() {
                    println!("No operations found.");
                }
                for (day, ops) in grouped {
                    println!("== {day} ==");
                    for op in ops {
                        println!("{}", operation_line(&op));
                    }
                }
                return Ok(());
            }

            let mut ops = if let Some(day) = day {
                ledger::operations_on_day(db, day)?
            } else if let Some(month) = &month {
                let (year, month) = parse_month(month)?;
                ledger::operations_by_month(db, year, month)?
            } else {
                match (account, range) {
                    (Some(id), Some((from, to))) => {
                        ledger::account_operations_in_range(db, id, from, to)?
                    }
                    (Some(id), None) => match op_type {
                        Some(OperationType::Income) => ledger::account_income_operations(db, id)?,
                        _ => ledger::account_operations(db, id)?,
                    },
                    (None, Some((from, to))) => ledger::operations_in_range(db, from, to)?,
                    (None, None) => match op_type {
                        Some(t) => ledger::operations_by_type(db, t)?,
                        None => ledger::list_operations(db)?,
                    },
                }
            };
            if day.is_some() || month.is_some() {
                if let Some(id) = account {
                    ops.retain(|op| op.account_id == id);
                }
            }
            if let Some(t) = op_type {
                ops.retain(|op| op.op_type == t);
            }

            if ops.is_empty() {
                println!("No operations found.");
            }
            for op in ops {
                println!("{}", operation_line(&op));
            }
        }
        OpCmd::Get { id } => {
            let details = ledger::operation_details(db, id)?;
            let op = &details.operation;
            println!(
                "ID: {}\nType: {}\nAccount: {}\nCategory: {}\nAmount: {}\nDate: {}\nDescription: {}",
                op.id,
                op.op_type,
                details.account_name,
                details.category_name,
                op.amount.round_dp(2),
                op.date.format(TABLE_DATETIME_FORMAT),
                op.description.as_deref().unwrap_or("-"),
            );
        }
        OpCmd::Delete { id } => {
            if ledger::delete_operation(db, id)? {
                println!("Deleted operation {id}; account balance restored");
            } else {
                println!("Operation {id} not found");
            }
        }
        OpCmd::Describe { id, text } => {
            let operation = ledger::update_operation_description(db, id, Some(&text))?;
            println!("Updated {}", operation_line(&operation));
        }
    }
    Ok(())
}

fn handle_report(db: &Db, cmd: ReportCmd) -> Result<()> {
    match cmd {
        ReportCmd::ExpensesByCategory => {
            let data = ledger::spending_by_category(db)?;
            println!("{}", analytics::render_category_report(&data, "EXPENSES BY CATEGORY"));
        }
        ReportCmd::IncomeByCategory => {
            let data = ledger::income_by_category(db)?;
            println!("{}", analytics::render_category_report(&data, "INCOME BY CATEGORY"));
        }
        ReportCmd::Categories { op_type } => {
            let data: Vec<(String, rust_decimal::Decimal)> =
                ledger::categories_sorted_by_amount(db, op_type)?
                    .into_iter()
                    .map(|s| (s.category.name, s.amount))
                    .collect();
            let title = format!("CATEGORIES: {op_type}");
            println!("{}", analytics::render_category_report(&data, &title));
        }
        ReportCmd::Trend { months, kind } => {
            let trend = analytics::monthly_trend(db, months, kind)?;
            let title = match kind {
                TrendKind::Income => "MONTHLY INCOME",
                TrendKind::Expense => "MONTHLY EXPENSES",
                TrendKind::Net => "MONTHLY NET CHANGE",
            };
            println!("{}", analytics::render_trend(&trend, title));
        }
        ReportCmd::Top { limit } => {
            let data = analytics::top_spending_categories(db, limit)?;
            println!("{}", analytics::render_category_report(&data, "TOP SPENDING CATEGORIES"));
        }
    }
    Ok(())
}

fn handle_export(db: &Db, args: ExportArgs) -> Result<()> {
    let selection = ExportSelection {
        accounts: !args.no_accounts,
        categories: !args.no_categories,
        operations: !args.no_operations,
    };

    let text = match args.format {
        IoFormat::Json => export::export_json(db, selection)?,
        IoFormat::Table => export::export_table(db, selection)?,
    };

    fs::write(&args.out, text)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    println!("Exported to {}", args.out.display());
    Ok(())
}

fn handle_import(db: &mut Db, args: ImportArgs) -> Result<()> {
    let input = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let report = match args.format {
        IoFormat::Json => import::import_json(db, &input)?,
        IoFormat::Table => import::import_table(db, &input)?,
    };

    println!("{report}");
    Ok(())
}

fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let (year, month) = raw
        .split_once('-')
        .ok_or_else(|| anyhow!("Month must look like YYYY-MM"))?;
    Ok((
        year.parse().with_context(|| format!("Invalid year in '{raw}'"))?,
        month.parse().with_context(|| format!("Invalid month in '{raw}'"))?,
    ))
}

fn operation_line(op: &Operation) -> String {
    let mut line = format!(
        "{} | {} | {} {}",
        op.id,
        op.date.format(TABLE_DATETIME_FORMAT),
        op.op_type,
        op.amount.round_dp(2),
    );
    if let Some(desc) = &op.description {
        line.push_str(" | ");
        line.push_str(desc);
    }
    line
}
