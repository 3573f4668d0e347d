use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    a2ui_cli::Cli::parse().run().await
}
