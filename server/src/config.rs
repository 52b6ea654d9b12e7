//! Command-line configuration.
//!
//! Mirrors the shape of `kv-cli/src/server/config.rs`'s `clap`-derived args
//! struct, deriving `serde::Deserialize` too so the same struct could in
//! principle be loaded from a config file — though only the CLI-flag path
//! is exercised, since the original C server takes a single `-p <port>`
//! flag and nothing resembling a config file format.

use clap::Parser;
use serde_derive::Deserialize;

#[derive(Parser, Debug, Deserialize)]
#[command(name = "mvkv-server", about = "A transactional, in-memory key-value store")]
pub struct Config {
    /// TCP port to listen on.
    #[arg(short = 'p', long)]
    pub port: u16,

    /// Log verbosity: trace, debug, info, warn, or error.
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,

    /// Directory for the server's rotating log file. No store state is
    /// ever written here — this is logging only.
    #[arg(short = 'd', long, default_value = "./.mvkv")]
    pub data_dir: String,

    /// Dump the parsed configuration before starting.
    #[arg(long)]
    pub debug: bool,
}
