use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ardan")]
#[command(about = "Ardan blockchain node", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new account key file
    GenerateKey {
        /// Account name; the key is written to `<out>/<name>.ecdsa`
        #[arg(short, long)]
        name: String,

        /// Directory to write the key file into
        #[arg(short, long, default_value = "zblock/accounts")]
        out: PathBuf,
    },
}
