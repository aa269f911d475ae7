//! `dw serve`: the action server behind an HTTP endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::extract::{ConnectInfo, State};
use axum::routing::post;
use axum::{Json, Router};
use dw_protocol::{Envelope, PollRequest};
use dw_server::{IntervalPolicy, Server, ServerConfig};
use tracing::info;

use crate::cli::ServeArgs;
use crate::demo::demo_router;

/// Config file (if any) with command-line flags layered on top.
pub fn server_config(args: &ServeArgs) -> Result<ServerConfig> {
	let mut config = match &args.config {
		Some(path) => ServerConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => ServerConfig::default(),
	};
	if let Some(secs) = args.lifetime_secs {
		config.session_lifetime_secs = secs;
	}
	if let Some(ms) = args.min_interval_ms {
		config.min_update_interval_ms = ms;
	}
	config.repeat |= args.repeat;
	config.verbose |= args.client_logging;
	config.expose_session |= args.expose_session;
	Ok(config)
}

pub fn build_server(args: &ServeArgs) -> Result<Server> {
	let config = server_config(args)?;
	let mut builder = Server::builder(config).router(demo_router());
	if let Some(ms) = args.interval_ms {
		builder = builder.policy(IntervalPolicy::fixed(ms));
	}
	Ok(builder.build())
}

/// `POST /` with a JSON [`PollRequest`] body.
pub fn app(server: Arc<Server>) -> Router {
	Router::new().route("/", post(poll)).with_state(server)
}

async fn poll(
	State(server): State<Arc<Server>>,
	ConnectInfo(peer): ConnectInfo<SocketAddr>,
	Json(request): Json<PollRequest>,
) -> Json<Envelope> {
	Json(server.handle(request, &peer.ip().to_string()).await)
}

pub async fn run(args: ServeArgs) -> Result<()> {
	let server = Arc::new(build_server(&args)?);
	let listener = tokio::net::TcpListener::bind(args.bind)
		.await
		.with_context(|| format!("failed to bind {}", args.bind))?;
	let addr = listener.local_addr()?;

	info!(target = "dw", addr = %addr, "listening");
	println!("Serving domwire actions on http://{addr}/");
	println!("Press Ctrl+C to stop.");

	axum::serve(listener, app(server).into_make_service_with_connect_info::<SocketAddr>())
		.await
		.context("server error")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;
	use std::io::Write;

	use crate::cli::{Cli, Commands};

	fn serve_args(argv: &[&str]) -> ServeArgs {
		let mut full = vec!["dw", "serve"];
		full.extend_from_slice(argv);
		match Cli::parse_from(full).command {
			Commands::Serve(args) => args,
			Commands::Poll(_) => unreachable!(),
		}
	}

	#[test]
	fn flags_override_config_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{"sessionLifetimeSecs": 5, "minUpdateIntervalMs": 100}}"#).unwrap();
		let path = file.path().to_str().unwrap().to_string();

		let config = server_config(&serve_args(&["--config", &path, "--lifetime-secs", "90", "--repeat"])).unwrap();

		assert_eq!(config.session_lifetime_secs, 90);
		assert_eq!(config.min_update_interval_ms, 100);
		assert!(config.repeat);
		assert!(!config.verbose);
	}

	#[test]
	fn bad_config_file_names_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "not json").unwrap();
		let path = file.path().to_str().unwrap().to_string();

		let err = server_config(&serve_args(&["--config", &path])).unwrap_err();
		assert!(format!("{err:#}").contains(&path));
	}
}
