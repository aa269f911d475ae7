//! `dw poll`: a terminal stand-in for a polling page.
//!
//! Instructions are applied to a [`PrintDom`], which has no elements of its
//! own: every selector matches a single placeholder named after it, and every
//! mutation is printed.

use std::time::Duration;

use anyhow::{Context as _, Result};
use dw_client::{ClientConfig, Connection, Dispatcher, Dom, TraversalOp, render};
use serde_json::Value;

use crate::cli::PollArgs;
use crate::http::HttpTransport;

/// Prints mutations and collects them as lines.
#[derive(Debug, Default)]
pub struct PrintDom {
	lines: Vec<String>,
	quiet: bool,
}

impl PrintDom {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records without printing.
	pub fn quiet() -> Self {
		Self {
			lines: Vec::new(),
			quiet: true,
		}
	}

	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	fn emit(&mut self, line: String) {
		if !self.quiet {
			println!("{line}");
		}
		self.lines.push(line);
	}
}

impl Dom for PrintDom {
	type Elements = String;

	fn query(&mut self, selector: &str) -> String {
		selector.to_string()
	}

	fn is_empty(&self, elements: &String) -> bool {
		elements.is_empty()
	}

	fn set_attribute(&mut self, elements: &String, name: &str, value: &Value) {
		self.emit(format!("{elements} [{name}] = {}", render(value)));
	}

	fn set_property(&mut self, elements: &String, name: &str, value: &Value) {
		self.emit(format!("{elements} .{name} = {}", render(value)));
	}

	fn call(&mut self, elements: &String, method: &str, args: &[Value]) {
		let args: Vec<String> = args.iter().map(Value::to_string).collect();
		self.emit(format!("{elements} .{method}({})", args.join(", ")));
	}

	fn set_field(&mut self, elements: &String, name: &str, value: &Value) {
		self.emit(format!("{elements} .{name} := {}", render(value)));
	}

	fn traverse(&mut self, elements: &String, op: TraversalOp, argument: Option<&Value>) -> String {
		match argument {
			Some(argument) => format!("{elements} > {op}({argument})"),
			None => format!("{elements} > {op}()"),
		}
	}

	fn alert(&mut self, message: &str) {
		self.emit(format!("alert: {message}"));
	}
}

pub fn client_config(args: &PollArgs) -> ClientConfig {
	ClientConfig {
		retry_pace_ms: args.retry_pace_ms,
		..ClientConfig::default()
	}
}

pub async fn run(args: PollArgs) -> Result<()> {
	let data = args
		.data
		.as_deref()
		.map(serde_json::from_str::<Value>)
		.transpose()
		.context("--data is not valid JSON")?;

	let mut transport = HttpTransport::new(&args.url, Duration::from_millis(args.timeout_ms))?;
	let mut conn = Connection::new(client_config(&args), Dispatcher::standard());
	let mut dom = PrintDom::new();

	conn.send(&mut transport, &mut dom, &args.action, data).await;
	conn.run_until(&mut transport, &mut dom, Some(args.count)).await;

	println!(
		"{} requests, session {}",
		conn.send_count(),
		conn.session_key().unwrap_or("none")
	);
	Ok(())
}
