use std::process;
use clap::Parser;

use rss_shelf::cli::commands::describe_error;
use rss_shelf::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        eprintln!("{}", describe_error(&e));
        process::exit(1);
    }
}
