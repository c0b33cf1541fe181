use clap::Parser;
use sitescribe_cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!("{:#}", err);
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
