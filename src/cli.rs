use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "llm-playground",
    about = "Tune sampling parameters and chat with an LLM playground backend"
)]
pub struct Cli {
    /// Backend base URL (overrides config and LLM_PLAYGROUND_BACKEND)
    #[arg(long, global = true)]
    pub backend: Option<String>,
    /// Model id to start with
    #[arg(long, global = true)]
    pub model: Option<String>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one message and print the reply
    Ask {
        message: String,
        /// Sampling temperature (0-2)
        #[arg(long)]
        temperature: Option<f64>,
        /// Maximum tokens to generate (256-4096)
        #[arg(long)]
        max_tokens: Option<u32>,
        /// System prompt for the exchange
        #[arg(long)]
        system: Option<String>,
    },
    /// List the models the backend routes
    Models,
    /// Check backend health
    Health,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file if none exists
    Init,
}
