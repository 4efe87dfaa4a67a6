use clap::Parser;
use self_corrected_rag::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Query(args) => cli::query::run(args).await,
        Command::Interactive(args) => cli::interactive::run(args).await,
        Command::Serve(args) => cli::serve::run(args).await,
        Command::Metrics(args) => cli::metrics::run(args).await,
    }
}
