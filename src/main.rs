use anyhow::Result;
use clap::Parser;
use mcq_book_tools::cli::Cli;
use mcq_book_tools::utils::logging;
use mcq_book_tools::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // .env 中的 API key 等
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref())?;

    logging::init(cli.verbose || config.verbose_logging);

    cli.run(config).await
}
