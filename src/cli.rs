use std::path::PathBuf;

use clap::Parser;

/// Symbolic path exploration and constraint solving over a small imperative
/// language.
#[derive(Debug, Parser)]
#[command(name = "sympath", version, about)]
pub struct Cli {
    /// Source file to analyze.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Maximum path depth per enumeration round.
    #[arg(short = 'd', long = "depth")]
    pub depth: Option<u32>,

    /// Maximum number of distinct paths reported per function.
    #[arg(short = 't', long = "tries")]
    pub tries: Option<u32>,

    /// Maximum visits per CFG node during enumeration (also the number of
    /// enumeration rounds).
    #[arg(short = 'r', long = "iter")]
    pub iter: Option<u32>,

    /// Restrict analysis to one function; otherwise every function is
    /// analyzed in declaration order.
    #[arg(short, long = "func")]
    pub func: Option<String>,

    /// Enable the call-constant recheck pass.
    #[arg(short, long = "constant", default_value_t = 1)]
    pub constant: u8,

    /// Path to a TOML config file overriding the built-in defaults.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}
