use cashledger::application::dispatch::invoke;
use cashledger::application::engine::LedgerEngine;
use cashledger::config::LedgerConfig;
use cashledger::domain::ports::StoreBox;
use cashledger::infrastructure::in_memory::InMemoryStore;
use cashledger::interfaces::csv::invocation_reader::InvocationReader;
use cashledger::logging::init_logging;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log filter, e.g. `info` or `cashledger=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Seed the ledger before running if it has not been seeded yet
    #[arg(long)]
    seed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single operation and print its payload
    Invoke {
        function: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run every invocation listed in a CSV script (`function,arg,...` per line)
    Run { script: PathBuf },
}

impl Cli {
    fn ledger_config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::load(path).into_diagnostic()?,
            None => LedgerConfig::default(),
        };
        if let Some(db_path) = &self.db_path {
            config.db_path = Some(db_path.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.log_json |= self.log_json;
        config.seed_on_open |= self.seed;
        Ok(config)
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(config: &LedgerConfig) -> Result<StoreBox> {
    use cashledger::infrastructure::rocksdb::RocksDBStore;

    match &config.db_path {
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(config: &LedgerConfig) -> Result<StoreBox> {
    if config.db_path.is_some() {
        miette::bail!("--db-path requires a build with the `storage-rocksdb` feature");
    }
    Ok(Box::new(InMemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.ledger_config()?;
    init_logging(&config);

    let engine = LedgerEngine::new(open_store(&config)?);
    if config.seed_on_open && !engine.is_seeded().await.into_diagnostic()? {
        engine.init_ledger().await.into_diagnostic()?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Invoke { function, args } => {
            let payload = invoke(&engine, &function, &args).await.into_diagnostic()?;
            out.write_all(&payload).into_diagnostic()?;
            writeln!(out).into_diagnostic()?;
        }
        Command::Run { script } => {
            let file = File::open(script).into_diagnostic()?;
            let reader = InvocationReader::new(file);
            for request in reader.invocations() {
                match request {
                    Ok(request) => match invoke(&engine, &request.function, &request.args).await {
                        Ok(payload) => {
                            out.write_all(&payload).into_diagnostic()?;
                            writeln!(out).into_diagnostic()?;
                        }
                        Err(e) => {
                            eprintln!("Error invoking {}: {}", request.function, e);
                        }
                    },
                    Err(e) => {
                        eprintln!("Error reading invocation: {}", e);
                    }
                }
            }
        }
    }

    Ok(())
}
