// src/cli/mod.rs - CLI definition (clap derive)

pub mod send;
pub mod status;
pub mod watch;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::CostPeriod;
use crate::realtime::Scope;

#[derive(Parser)]
#[command(name = "dojo", about = "Command-line client for a Dojo server", version)]
pub struct Cli {
    /// Server base URL (overrides server.base_url from config)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the server is reachable and healthy
    Health,
    /// Show server version, features and limits
    Info,
    /// List sessions
    Sessions,
    /// Send a message to a session and print the streamed reply
    Send {
        /// Session id
        session: String,
        /// Message text (joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
        /// Disable tool use for this reply
        #[arg(long)]
        no_tools: bool,
    },
    /// Print live updates until interrupted
    Watch {
        /// "providers", "tools", or a session id
        target: String,
    },
    /// Show usage statistics
    Usage {
        /// Also show the cost breakdown for a period
        #[arg(long, value_enum)]
        costs: Option<PeriodArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Month,
}

impl From<PeriodArg> for CostPeriod {
    fn from(p: PeriodArg) -> Self {
        match p {
            PeriodArg::Day => CostPeriod::Day,
            PeriodArg::Week => CostPeriod::Week,
            PeriodArg::Month => CostPeriod::Month,
        }
    }
}

/// Map a `watch` target to its subscription scope.
pub fn parse_scope(target: &str) -> Scope {
    match target {
        "providers" => Scope::Providers,
        "tools" => Scope::Tools,
        id => Scope::Session(id.strip_prefix("sessions/").unwrap_or(id).to_string()),
    }
}
