use clap::{Args, Parser, Subcommand};

/// ussd: run the Sarafu menu over a terminal or inspect stored user data.
#[derive(Parser, Debug)]
#[command(name = "ussd", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    pub log_level: String,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive one session from stdin, one line per turn
    Interactive(InteractiveArgs),

    /// Print every stored data field of a session
    Dump(DumpArgs),
}

/// Where user data and session snapshots live.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Directory of the durable store (in-memory if unset)
    #[arg(long, global = true, env = "STORE_DIR")]
    pub store_dir: Option<String>,
}

/// Arguments for the `interactive` subcommand.
#[derive(Parser, Debug)]
pub struct InteractiveArgs {
    /// Session identifier, usually the caller's phone number
    #[arg(long, env = "SESSION_ID")]
    pub session_id: String,

    /// Maximum rendered bytes per screen
    #[arg(long, default_value = "160", env = "OUTPUT_SIZE")]
    pub output_size: usize,

    /// Log path and flags after every turn
    #[arg(long, env = "ENGINE_DEBUG")]
    pub engine_debug: bool,

    /// Base URL of the custodial API (fake service if unset)
    #[arg(long, env = "CUSTODIAL_URL")]
    pub custodial_url: Option<String>,

    /// Base URL of the data API (defaults to the custodial URL)
    #[arg(long, env = "DATA_URL")]
    pub data_url: Option<String>,

    /// Language for sessions that never picked one (eng, swa)
    #[arg(long, default_value = "eng", env = "DEFAULT_LANGUAGE")]
    pub language: String,

    /// Treat an empty line as a request to start over at the root menu
    #[arg(long, env = "RESET_ON_EMPTY_INPUT")]
    pub reset_on_empty_input: bool,
}

/// Arguments for the `dump` subcommand.
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Session identifier whose data to print
    #[arg(long, env = "SESSION_ID")]
    pub session_id: String,
}
