use crate::utils::run_until_ctrl_c;
use clap::{value_parser, Parser, Subcommand};

pub mod args;
pub mod commands;

/// The main Corvus CLI interface
#[derive(Debug, Parser)]
#[command(author, version, about = "Corvus", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[clap(subcommand)]
    command: Commands,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Cli {
    /// Get the log level based on the verbosity level
    pub fn get_log_level(&self) -> String {
        match self.verbosity {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .into()
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Predict the counterfactual address of a smart account
    #[command(name = "predict-address")]
    PredictAddress(commands::PredictAddressCommand),

    /// Encode calls into the call data of a smart account
    #[command(name = "encode-calls")]
    EncodeCalls(commands::EncodeCallsCommand),

    /// Send a user operation and wait until it is included
    #[command(name = "send")]
    Send(Box<commands::SendCommand>),

    /// Fetch the receipt of a user operation
    #[command(name = "receipt")]
    Receipt(commands::ReceiptCommand),

    /// Fetch a user operation by its hash
    #[command(name = "user-operation")]
    UserOperation(commands::UserOperationCommand),

    /// Create wallet for signing user operations
    #[command(name = "create-wallet")]
    CreateWallet(commands::CreateWalletCommand),
}

pub fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    let rust_log = match std::env::var("RUST_LOG") {
        Ok(val) => format!("{val},corvus={}", cli.get_log_level()),
        Err(_) => format!("corvus={}", cli.get_log_level()),
    };
    std::env::set_var("RUST_LOG", rust_log);
    tracing_subscriber::fmt::init();

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let task = async move {
        match cli.command {
            Commands::PredictAddress(command) => command.execute(),
            Commands::EncodeCalls(command) => command.execute(),
            Commands::Send(command) => command.execute().await,
            Commands::Receipt(command) => command.execute().await,
            Commands::UserOperation(command) => command.execute().await,
            Commands::CreateWallet(command) => command.execute(),
        }
    };

    rt.block_on(run_until_ctrl_c(task))
}
