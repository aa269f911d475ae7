use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dw_cli::cli::ServeArgs;
use dw_cli::http::HttpTransport;
use dw_cli::poll::PrintDom;
use dw_cli::serve::{app, build_server};
use dw_client::{ClientConfig, Completion, Connection, Dispatcher, Transport, TransportError};
use dw_protocol::PollRequest;

fn args() -> ServeArgs {
	ServeArgs {
		bind: "127.0.0.1:0".parse().unwrap(),
		config: None,
		lifetime_secs: None,
		repeat: false,
		client_logging: false,
		min_interval_ms: None,
		interval_ms: Some(20),
		expose_session: false,
	}
}

async fn spawn_server() -> SocketAddr {
	let server = Arc::new(build_server(&args()).unwrap());
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app(server).into_make_service_with_connect_info::<SocketAddr>())
			.await
			.unwrap();
	});
	addr
}

#[tokio::test]
async fn clock_repeats_over_http_with_stable_key() {
	let addr = spawn_server().await;
	let mut transport = HttpTransport::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
	let mut conn = Connection::new(ClientConfig::default(), Dispatcher::standard());
	let mut dom = PrintDom::quiet();

	let completion = conn.send(&mut transport, &mut dom, "clock", None).await;
	assert_eq!(
		completion,
		Completion::Repeat {
			delay: Duration::from_millis(20)
		}
	);
	let key = conn.session_key().map(str::to_string).unwrap();
	assert!(dom.lines()[0].starts_with("#clock .text("));

	conn.run_until(&mut transport, &mut dom, Some(3)).await;
	assert_eq!(conn.send_count(), 3);
	assert_eq!(conn.session_key(), Some(key.as_str()));
	assert_eq!(conn.tries(), 0);
}

#[tokio::test]
async fn echo_is_forced_every_time() {
	let addr = spawn_server().await;
	let mut transport = HttpTransport::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
	let mut conn = Connection::new(ClientConfig::default(), Dispatcher::standard());
	let mut dom = PrintDom::quiet();

	for _ in 0..2 {
		let completion = conn.send(&mut transport, &mut dom, "echo", Some(serde_json::json!("hi"))).await;
		assert_eq!(completion, Completion::Idle);
	}
	let echoed = conn.log().entries().filter(|entry| *entry == "hi").count();
	assert_eq!(echoed, 2);
}

#[tokio::test]
async fn unknown_path_maps_to_status_error() {
	let addr = spawn_server().await;
	let mut transport = HttpTransport::new(format!("http://{addr}/missing"), Duration::from_secs(5)).unwrap();

	let outcome = transport.send(PollRequest::new("ping")).await;
	assert_eq!(outcome, Err(TransportError::Status(404)));
}

#[tokio::test]
async fn refused_connection_schedules_retry() {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let mut transport = HttpTransport::new(format!("http://{addr}/"), Duration::from_secs(1)).unwrap();
	let mut conn = Connection::new(ClientConfig::default(), Dispatcher::standard());
	let mut dom = PrintDom::quiet();

	let completion = conn.send(&mut transport, &mut dom, "ping", None).await;
	assert_eq!(
		completion,
		Completion::Retry {
			attempt: 1,
			delay: Duration::from_millis(2_500)
		}
	);
}
