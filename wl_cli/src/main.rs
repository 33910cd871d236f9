//! Command-line front end for the wager ledger.
//!
//! Each invocation connects to PostgreSQL, runs one ledger operation against
//! one account and exits.

mod config;
mod logging;

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use rust_decimal::Decimal;
use wager_ledger::{
    AccountId, Database, LedgerError, LedgerManager, OutcomeSource, UniformOutcome, WagerResolver,
};

use crate::config::CliConfig;

const HELP: &str = "\
Mutate account balances in the wager ledger

USAGE:
  wl_cli [OPTIONS] <COMMAND>

COMMANDS:
  open                         Open a new account with a zero balance
  balance   <ID>               Print the committed balance of an account
  deposit   <ID> <AMOUNT>      Credit an account
  withdraw  <ID> <AMOUNT>      Debit an account if funds allow
  wager     <ID> <STAKE>       Place a wager; the outcome is drawn from [-STAKE, 2 * STAKE)

OPTIONS:
  --db-url     URL             Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help                   Print help information

ENVIRONMENT:
  DATABASE_URL                 PostgreSQL connection string
  DB_LOCK_TIMEOUT_MS           Row lock wait before giving up  [default: 3000]
  WAGER_SEED                   Fixed seed for wager outcomes
  RUST_LOG                     Log filter  [default: info,sqlx=warn]
  (See .env file for all configuration options)
";

#[derive(Debug, PartialEq)]
enum Command {
    Open,
    Balance(AccountId),
    Deposit(AccountId, Decimal),
    Withdraw(AccountId, Decimal),
    Wager(AccountId, Decimal),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::Balance(_) => "balance",
            Command::Deposit(..) => "deposit",
            Command::Withdraw(..) => "withdraw",
            Command::Wager(..) => "wager",
        }
    }
}

#[derive(Debug)]
struct Args {
    database_url: Option<String>,
    command: Command,
}

fn parse_args(mut pargs: Arguments) -> Result<Args, Error> {
    let database_url = pargs.opt_value_from_str("--db-url")?;

    let command = match pargs.subcommand()?.as_deref() {
        Some("open") => Command::Open,
        Some("balance") => Command::Balance(pargs.free_from_str()?),
        Some("deposit") => Command::Deposit(pargs.free_from_str()?, pargs.free_from_str()?),
        Some("withdraw") => Command::Withdraw(pargs.free_from_str()?, pargs.free_from_str()?),
        Some("wager") => Command::Wager(pargs.free_from_str()?, pargs.free_from_str()?),
        Some(other) => anyhow::bail!("Unknown command '{other}'. See --help"),
        None => anyhow::bail!("Missing command. See --help"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {}", join_os(&remaining));
    }

    Ok(Args {
        database_url,
        command,
    })
}

fn join_os(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exit status for a failed operation
///
/// Declines and bad input are distinct from infrastructure failures so
/// scripts can tell a retryable error apart.
fn exit_code(err: &LedgerError) -> u8 {
    match err {
        LedgerError::InvalidAmount(_) => 2,
        LedgerError::InsufficientFunds { .. }
        | LedgerError::SettlementConflict { .. }
        | LedgerError::BalanceOverflow { .. } => 3,
        LedgerError::AccountNotFound(_) => 4,
        LedgerError::OutcomeOutOfRange { .. } => 70,
        LedgerError::TransactionFailure(_) => 75,
    }
}

async fn run(
    command: &Command,
    ledger: &LedgerManager,
    resolver: &WagerResolver,
) -> Result<String, LedgerError> {
    match *command {
        Command::Open => {
            let account = ledger.open_account().await?;
            Ok(format!("account {} opened, balance {}", account.id, account.balance))
        }
        Command::Balance(id) => {
            let account = ledger.balance(id).await?;
            Ok(format!("account {}, balance {}", account.id, account.balance))
        }
        Command::Deposit(id, amount) => {
            let balance = ledger.deposit_funds(id, amount).await?;
            logging::log_mutation("deposit", id, &format!("+{amount}"), &balance.to_string());
            Ok(format!("deposited {amount}, balance {balance}"))
        }
        Command::Withdraw(id, amount) => {
            let balance = ledger.withdraw_funds(id, amount).await?;
            logging::log_mutation("withdraw", id, &format!("-{amount}"), &balance.to_string());
            Ok(format!("withdrew {amount}, balance {balance}"))
        }
        Command::Wager(id, stake) => {
            let outcome = resolver.place_wager(id, stake).await?;
            logging::log_mutation(
                "wager",
                id,
                &outcome.delta().to_string(),
                &outcome.balance.to_string(),
            );
            Ok(format!(
                "{} {}, balance {}",
                outcome.result, outcome.magnitude, outcome.balance
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = parse_args(pargs)?;

    // Catching signals for exit. An interrupted transaction is rolled back
    // by the database when the connection drops.
    set_handler(|| std::process::exit(130))?;

    logging::init();

    let config = CliConfig::from_env(args.database_url)?;
    config.validate()?;

    // An unreachable database is as retryable as a failed transaction
    let db = match Database::new(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to connect to database: {e}");
            return Ok(report_failure("connect", &LedgerError::from(e)));
        }
    };
    info!("Database connected successfully");

    let ledger = LedgerManager::new(Arc::new(db.balance_repository(&config.database)?));
    let outcomes: Arc<dyn OutcomeSource> = match config.wager_seed {
        Some(seed) => {
            info!("Drawing wager outcomes from fixed seed {seed}");
            Arc::new(UniformOutcome::from_seed(seed))
        }
        None => Arc::new(UniformOutcome::new()),
    };
    let resolver = WagerResolver::new(ledger.clone(), outcomes);

    let start = Instant::now();
    let result = run(&args.command, &ledger, &resolver).await;
    logging::log_performance(
        args.command.name(),
        start.elapsed().as_millis() as u64,
        None,
    );

    db.close().await;

    match result {
        Ok(summary) => {
            println!("{summary}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report_failure(args.command.name(), &err)),
    }
}

fn report_failure(operation: &str, err: &LedgerError) -> ExitCode {
    log::warn!("{operation} failed: {err}");
    eprintln!("error: {}", err.client_message());
    ExitCode::from(exit_code(err))
}
