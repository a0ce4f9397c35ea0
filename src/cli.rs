use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipbox")]
#[command(about = "Bundle remote files into downloadable zip archives", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $ZIPBOX_CONFIG or config/zipbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to, overrides server.bind_addr
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Start the scheduler immediately instead of waiting for /tasks/start-all
    #[arg(long)]
    pub autostart: bool,
}
