use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "da-watchdog", version, about = "Multi-endpoint RPC data-availability monitor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample on a timer and serve the HTTP/WebSocket API
    Serve {
        /// Override bind address, e.g. 0.0.0.0:3001
        #[arg(long)]
        addr: Option<String>,
    },
    /// Run sampling rounds back to back and print each result as JSON
    Sample {
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },
}
