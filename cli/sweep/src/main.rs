//! cloud-sweep CLI
//!
//! Stale object cleanup for Tencent COS and Aliyun OSS.

use clap::Parser;
use cs_cli_common::init_logging;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for listings
    init_logging(cli.log_level, cli.log_file.as_deref())?;

    if let Some(stats) = run::execute(cli).await? {
        if stats.total() > 0 {
            run::report(&stats);
        }
        if stats.has_failures() {
            std::process::exit(4); // Partial failure
        }
    }

    Ok(())
}
