use crate::analytics::TrendKind;
use crate::domain::OperationType;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "finshell")]
#[command(about = "Personal finance ledger with categorized operations and reports", long_about = None)]
pub struct Cli {
    /// Override finshell home directory (data subdir will be created inside it).
    #[arg(long, env = "FINSHELL_HOME")]
    pub home: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Account(AccountArgs),
    Category(CategoryArgs),

    AddIncome(AddOperationArgs),
    AddExpense(AddOperationArgs),
    Op(OpArgs),

    /// Total balance across all accounts.
    Balance,
    Report(ReportArgs),

    Export(ExportArgs),
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub cmd: AccountCmd,
}

#[derive(Debug, Subcommand)]
pub enum AccountCmd {
    Create {
        name: String,
        #[arg(long, default_value = "0")]
        balance: Decimal,
        /// Opens the account with credentials; stored hashed.
        #[arg(long, requires = "card")]
        password: Option<String>,
        #[arg(long, requires = "password")]
        phone: Option<String>,
        /// 16-digit card number, shown masked afterwards.
        #[arg(long, requires = "password")]
        card: Option<String>,
    },
    List {
        #[arg(long)]
        min_balance: Option<Decimal>,
    },
    Get {
        id: Uuid,
    },
    /// Looks an account up by its display name.
    Find {
        name: String,
    },
    Rename {
        id: Uuid,
        name: String,
    },
    Delete {
        id: Uuid,
    },
    /// Recomputes the balance from the account's operations.
    Recalculate {
        id: Uuid,
    },
    /// Income/expense/net totals for the account over a date range.
    Summary {
        id: Uuid,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

#[derive(Debug, Args)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub cmd: CategoryCmd,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCmd {
    Create {
        name: String,
        #[arg(long = "type")]
        op_type: OperationType,
    },
    List {
        #[arg(long = "type")]
        op_type: Option<OperationType>,
    },
    Get {
        id: Uuid,
    },
    Rename {
        id: Uuid,
        name: String,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Debug, Args)]
pub struct AddOperationArgs {
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,

    /// Operation date; defaults to now. Accepts `YYYY-MM-DD` or
    /// `YYYY-MM-DDTHH:MM:SS`.
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long, short = 'm', alias = "note")]
    pub note: Option<String>,
}

#[derive(Debug, Args)]
pub struct OpArgs {
    #[command(subcommand)]
    pub cmd: OpCmd,
}

#[derive(Debug, Subcommand)]
pub enum OpCmd {
    List {
        #[arg(long)]
        account: Option<Uuid>,
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        /// Operations on a single calendar day.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        day: Option<NaiveDate>,
        /// Operations within a calendar month.
        #[arg(long, value_name = "YYYY-MM", conflicts_with_all = ["from", "to", "day"])]
        month: Option<String>,
        #[arg(long = "type")]
        op_type: Option<OperationType>,
        /// Group the listing by calendar day.
        #[arg(long)]
        by_day: bool,
    },
    Get {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
    /// Replaces the operation's description.
    Describe {
        id: Uuid,
        text: String,
    },
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub cmd: ReportCmd,
}

#[derive(Debug, Subcommand)]
pub enum ReportCmd {
    ExpensesByCategory,
    IncomeByCategory,
    /// All categories of a type with their totals, largest first.
    Categories {
        op_type: OperationType,
    },
    Trend {
        #[arg(long, default_value_t = 6)]
        months: u32,
        #[arg(long = "type", default_value = "net")]
        kind: TrendKind,
    },
    Top {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum IoFormat {
    Json,
    Table,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    pub format: IoFormat,

    #[arg(long)]
    pub out: std::path::PathBuf,

    #[arg(long)]
    pub no_accounts: bool,
    #[arg(long)]
    pub no_categories: bool,
    #[arg(long)]
    pub no_operations: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub format: IoFormat,
    pub file: std::path::PathBuf,
}
