mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use zipbox::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    zipbox::observability::init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load_with(cli.config)?;

    match cli.command {
        Commands::Server(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            config.scheduler.autostart |= args.autostart;
            zipbox::api::run(config).await?
        }
    }

    Ok(())
}
