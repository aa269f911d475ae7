use clap::Parser;
use dw_cli::cli::{Cli, Commands};
use dw_cli::{logging, poll, serve};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let result = match cli.command {
		Commands::Serve(args) => serve::run(args).await,
		Commands::Poll(args) => poll::run(args).await,
	};

	if let Err(err) = result {
		error!(target = "dw", error = %err, "command failed");
		std::process::exit(1);
	}
}
