use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "paycountdown")]
#[command(about = "Count down to a payment order's expiry")]
pub struct CliArgs {
    /// Order creation time: RFC 3339, "YYYY-MM-DD HH:MM:SS" (local) or Unix milliseconds [default: now]
    #[arg(long)]
    pub created: Option<String>,

    /// Timeout expression such as 15m, 2h, 1d or 1c (overrides config)
    #[arg(long, short = 't')]
    pub timeout_express: Option<String>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the total timeout in seconds and exit
    #[arg(long)]
    pub check: bool,
}
