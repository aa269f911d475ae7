//! The per-connection transport loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dw_protocol::{Envelope, PollRequest};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::dom::Dom;
use crate::error::TransportError;
use crate::log::ActionLog;
use crate::scheduler::{PendingSend, Scheduler};
use crate::transport::Transport;

/// Where one action sits in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
	Idle,
	Sending,
	Scheduled,
	Retrying,
}

/// What a finished round trip left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
	/// The server asked for a repeat after `delay`.
	Repeat { delay: Duration },
	/// Keep-alive re-ping after the fallback delay.
	Fallback { delay: Duration },
	Idle,
	/// Failure number `attempt`; retry after `delay`.
	Retry { attempt: u32, delay: Duration },
}

/// One logical connection to a server.
///
/// Holds the session key, counters, action log, timers and dispatcher.
/// Nothing is global, so several connections can share a process.
pub struct Connection<D: Dom> {
	config: ClientConfig,
	dispatcher: Dispatcher<D>,
	clock: Arc<dyn Clock>,
	scheduler: Scheduler,
	log: ActionLog,
	session_key: Option<String>,
	send_count: u64,
	tries: u32,
	states: HashMap<String, ActionState>,
}

impl<D: Dom> Connection<D> {
	pub fn new(config: ClientConfig, dispatcher: Dispatcher<D>) -> Self {
		Self::with_clock(config, dispatcher, Arc::new(SystemClock::default()))
	}

	pub fn with_clock(config: ClientConfig, mut dispatcher: Dispatcher<D>, clock: Arc<dyn Clock>) -> Self {
		dispatcher.set_depth_limit(config.depth_limit);
		let log = ActionLog::new(config.log_max, config.logging);
		Self {
			config,
			dispatcher,
			clock,
			scheduler: Scheduler::new(),
			log,
			session_key: None,
			send_count: 0,
			tries: 0,
			states: HashMap::new(),
		}
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub fn session_key(&self) -> Option<&str> {
		self.session_key.as_deref()
	}

	pub fn send_count(&self) -> u64 {
		self.send_count
	}

	/// Consecutive failures since the last successful reply.
	pub fn tries(&self) -> u32 {
		self.tries
	}

	pub fn logging(&self) -> bool {
		self.log.logging()
	}

	pub fn log(&self) -> &ActionLog {
		&self.log
	}

	pub fn log_mut(&mut self) -> &mut ActionLog {
		&mut self.log
	}

	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	pub fn dispatcher(&self) -> &Dispatcher<D> {
		&self.dispatcher
	}

	pub fn state(&self, action: &str) -> ActionState {
		self.states.get(action).copied().unwrap_or(ActionState::Idle)
	}

	/// Cancels the action's pending timer, leaving it idle.
	pub fn cancel(&mut self, action: &str) -> bool {
		self.set_state(action, ActionState::Idle);
		self.scheduler.cancel(action)
	}

	/// Builds the request for `action` and marks it in flight.
	///
	/// A stale timer for the same action is dropped. Configured default
	/// data replaces provided data; a send without data stays without.
	pub fn begin(&mut self, action: &str, data: Option<Value>) -> PollRequest {
		self.send_count += 1;
		self.scheduler.cancel(action);
		self.set_state(action, ActionState::Sending);

		let data = match data {
			Some(data) => Some(self.config.default_data.get(action).cloned().unwrap_or(data)),
			None => None,
		};

		let request = PollRequest::new(action).with_key(self.session_key.clone()).with_data(data);
		self.log.record(format!("Send #{}", self.send_count), false);
		self.log
			.record(format!("Session Key: {}", self.session_key.as_deref().unwrap_or("none")), false);
		self.log.record(
			format!("Sending: {}", serde_json::to_string(&request).unwrap_or_default()),
			false,
		);
		debug!(target = "dw.transport", action, send = self.send_count, "sending");
		request
	}

	/// Feeds a transport outcome for `action` back into the loop.
	///
	/// `data` is the data originally passed to [`begin`](Self::begin); it is
	/// what repeats and retries resend.
	pub fn complete(
		&mut self,
		dom: &mut D,
		action: &str,
		data: Option<Value>,
		outcome: Result<Value, TransportError>,
	) -> Completion {
		let body = match outcome {
			Ok(body) => body,
			Err(error) => return self.fail(action, data, error),
		};
		let envelope = match Envelope::from_value(body) {
			Ok(envelope) => envelope,
			Err(error) => return self.fail(action, data, TransportError::Malformed(error.to_string())),
		};

		if self.tries > 0 {
			self.log
				.record(format!("Connection reestablished after {} tries", self.tries), true);
			self.tries = 0;
		}

		if let Some(verbose) = envelope.verbose {
			self.log.set_logging(verbose);
		}
		self.log.record(
			format!("Data Returned: {}", serde_json::to_string(&envelope).unwrap_or_default()),
			false,
		);
		if let Some(key) = envelope.key {
			if self.session_key.as_deref() != Some(key.as_str()) {
				debug!(target = "dw.transport", key = %key, "adopted session key");
			}
			self.session_key = Some(key);
		}
		if let Some(elapsed) = envelope.elapsed_secs {
			self.log.record(format!("Server execution time: {elapsed}s"), false);
		}
		if let Some(instructions) = &envelope.instructions {
			self.dispatcher.apply(dom, &mut self.log, instructions);
		}

		let now = self.clock.now();
		let send = PendingSend {
			action: action.to_string(),
			data,
		};
		match (envelope.repeat, envelope.interval_ms) {
			(Some(true), Some(interval)) => {
				let delay = Duration::from_millis(interval);
				self.scheduler.schedule(now, delay, send);
				self.set_state(action, ActionState::Scheduled);
				Completion::Repeat { delay }
			}
			_ if action == self.config.ping_action => {
				let delay = self.config.ping_fallback();
				self.scheduler.schedule(now, delay, send);
				self.set_state(action, ActionState::Scheduled);
				Completion::Fallback { delay }
			}
			_ => {
				self.set_state(action, ActionState::Idle);
				Completion::Idle
			}
		}
	}

	/// One full round trip.
	pub async fn send<T>(&mut self, transport: &mut T, dom: &mut D, action: &str, data: Option<Value>) -> Completion
	where
		T: Transport + ?Sized,
	{
		let request = self.begin(action, data.clone());
		let started = Instant::now();
		let outcome = transport.send(request).await;
		self.log
			.record(format!("Client execution time: {:?}", started.elapsed()), false);
		self.complete(dom, action, data, outcome)
	}

	/// Sends the keep-alive action once, starting the poll loop.
	pub async fn init<T>(&mut self, transport: &mut T, dom: &mut D, data: Option<Value>) -> Completion
	where
		T: Transport + ?Sized,
	{
		let ping = self.config.ping_action.clone();
		self.send(transport, dom, &ping, data).await
	}

	/// Runs every timer due on the connection's clock. Returns how many
	/// sends went out.
	pub async fn tick<T>(&mut self, transport: &mut T, dom: &mut D) -> usize
	where
		T: Transport + ?Sized,
	{
		let due = self.scheduler.take_due(self.clock.now());
		let count = due.len();
		for PendingSend { action, data } in due {
			self.send(transport, dom, &action, data).await;
		}
		count
	}

	/// Sleeps until each next timer and fires it.
	///
	/// Stops once `max_sends` total sends have gone out, or when no timer
	/// remains.
	pub async fn run_until<T>(&mut self, transport: &mut T, dom: &mut D, max_sends: Option<u64>)
	where
		T: Transport + ?Sized,
	{
		loop {
			if max_sends.is_some_and(|limit| self.send_count >= limit) {
				debug!(target = "dw.transport", sends = self.send_count, "send budget reached");
				return;
			}
			let Some(due) = self.scheduler.next_due() else {
				debug!(target = "dw.transport", "no timers left");
				return;
			};
			let now = self.clock.now();
			if due > now {
				tokio::time::sleep(due - now).await;
			}
			self.tick(transport, dom).await;
		}
	}

	fn fail(&mut self, action: &str, data: Option<Value>, error: TransportError) -> Completion {
		self.tries += 1;
		self.scheduler.cancel(action);

		warn!(target = "dw.transport", action, attempt = self.tries, error = %error, "request failed");
		self.log
			.record(format!("Error connecting, retry number {}: {error}", self.tries), true);

		let delay = self.config.retry_delay(self.tries);
		let send = PendingSend {
			action: action.to_string(),
			data,
		};
		self.scheduler.schedule(self.clock.now(), delay, send);
		self.set_state(action, ActionState::Retrying);
		Completion::Retry {
			attempt: self.tries,
			delay,
		}
	}

	fn set_state(&mut self, action: &str, state: ActionState) {
		self.states.insert(action.to_string(), state);
	}
}
