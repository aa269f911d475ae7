use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dw")]
#[command(about = "domwire - server-pushed DOM instructions over polling")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the demo action server over HTTP
	Serve(ServeArgs),

	/// Poll a server and print the instructions it sends
	Poll(PollArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
	/// Address to listen on
	#[arg(long, default_value = "127.0.0.1:8080")]
	pub bind: SocketAddr,

	/// JSON server config file
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Idle seconds before a session is swept
	#[arg(long)]
	pub lifetime_secs: Option<u64>,

	/// Ask clients to repeat every action
	#[arg(long)]
	pub repeat: bool,

	/// Turn on client-side logging in replies
	#[arg(long)]
	pub client_logging: bool,

	/// Floor added to every poll interval (ms)
	#[arg(long)]
	pub min_interval_ms: Option<u64>,

	/// Fixed poll interval instead of the load-based policy (ms)
	#[arg(long)]
	pub interval_ms: Option<u64>,

	/// Include the session record in replies
	#[arg(long)]
	pub expose_session: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PollArgs {
	/// Server endpoint
	#[arg(default_value = "http://127.0.0.1:8080/")]
	pub url: String,

	/// First action to send
	#[arg(short, long, default_value = "ping")]
	pub action: String,

	/// JSON data for the first action
	#[arg(short, long)]
	pub data: Option<String>,

	/// Stop after this many requests
	#[arg(short = 'n', long, default_value = "5")]
	pub count: u64,

	/// Base retry delay (ms)
	#[arg(long, default_value = "2500")]
	pub retry_pace_ms: u64,

	/// Per-request timeout (ms)
	#[arg(long, default_value = "10000")]
	pub timeout_ms: u64,
}
