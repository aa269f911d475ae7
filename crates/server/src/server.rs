//! One request, one reconciliation cycle.
//!
//! # Cycle
//!
//! 1. Lock the requested session key (serializes concurrent polls per key)
//! 2. Load or create the session and touch it
//! 3. Sweep idle sessions, sparing the current one
//! 4. Route the action; the handler queues changes on a [`Context`]
//! 5. Diff the batch against the session baseline and commit it
//! 6. Build the [`Envelope`] and write the session back
//!
//! Nothing is produced after the envelope.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dw_protocol::{Envelope, PollRequest};
use parking_lot::Mutex;
use rand::thread_rng;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::context::Context;
use crate::interval::{IntervalPolicy, LoadSource, ProcLoadAvg};
use crate::reconcile::diff_and_commit;
use crate::router::Router;
use crate::session::{MemoryBackend, SessionBackend, SessionStore};

/// Per-key async locks held across a full request cycle.
///
/// An entry lives only while some request holds or awaits it; the last
/// one out removes it in [`release`](Self::release).
#[derive(Default)]
struct KeyLocks {
	locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
	async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
		let lock = Arc::clone(self.locks.lock().entry(key.to_string()).or_default());
		lock.lock_owned().await
	}

	fn release(&self, key: &str, guard: OwnedMutexGuard<()>) {
		let mut locks = self.locks.lock();
		drop(guard);
		if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
			locks.remove(key);
		}
	}

	fn len(&self) -> usize {
		self.locks.lock().len()
	}
}

/// Protocol server over a session backend.
pub struct Server<B = MemoryBackend> {
	config: ServerConfig,
	router: Router,
	store: Mutex<SessionStore<B>>,
	locks: KeyLocks,
	load: Box<dyn LoadSource>,
	policy: IntervalPolicy,
}

impl Server<MemoryBackend> {
	pub fn new(config: ServerConfig, router: Router) -> Self {
		ServerBuilder::new(config).router(router).build()
	}

	pub fn builder(config: ServerConfig) -> ServerBuilder<MemoryBackend> {
		ServerBuilder::new(config)
	}
}

impl<B: SessionBackend> Server<B> {
	pub fn config(&self) -> &ServerConfig {
		&self.config
	}

	/// Number of stored sessions.
	pub fn session_count(&self) -> usize {
		self.store.lock().backend().keys().len()
	}

	pub fn has_session(&self, key: &str) -> bool {
		self.store.lock().contains(key)
	}

	/// Runs one request cycle for `client` (an address or other identity
	/// used to derive new session keys).
	pub async fn handle(&self, request: PollRequest, client: &str) -> Envelope {
		let started = Instant::now();
		let requested = request.session_key().map(str::to_string);
		let guard = match &requested {
			Some(key) => Some(self.locks.acquire(key).await),
			None => None,
		};

		let mut session = {
			let mut store = self.store.lock();
			let session = store.get_or_create(requested.as_deref(), client);
			store.sweep(session.key());
			session
		};

		let PollRequest { action, data, .. } = request;
		let mut ctx = Context::new(&mut session, &self.config);
		self.router.dispatch(action.as_deref(), data, &mut ctx);
		let (batch, directives) = ctx.finish();

		let queued = batch.len();
		let diff = diff_and_commit(&mut session, batch);
		let interval = directives
			.update_interval
			.unwrap_or_else(|| self.policy.sample(self.load.sample(), &mut thread_rng()));

		info!(
			target = "dw.server",
			action = action.as_deref().unwrap_or(""),
			key = session.key(),
			queued,
			sent = diff.len(),
			"request reconciled"
		);

		let envelope = Envelope {
			instructions: Some(diff),
			repeat: Some(directives.repeat),
			interval_ms: Some(interval + directives.min_update_interval),
			key: Some(session.key().to_string()),
			elapsed_secs: Some(round4(started.elapsed().as_secs_f64())),
			verbose: Some(directives.verbose),
			session: self.config.expose_session.then(|| session.record().clone()),
		};

		self.store.lock().commit(session);
		if let (Some(key), Some(guard)) = (requested, guard) {
			self.locks.release(&key, guard);
		}
		debug!(target = "dw.server", elapsed = ?started.elapsed(), "envelope ready");
		envelope
	}
}

fn round4(secs: f64) -> f64 {
	(secs * 10_000.0).round() / 10_000.0
}

/// Assembles a [`Server`] with non-default collaborators.
pub struct ServerBuilder<B> {
	config: ServerConfig,
	router: Router,
	backend: B,
	clock: Arc<dyn Clock>,
	load: Box<dyn LoadSource>,
	policy: IntervalPolicy,
}

impl ServerBuilder<MemoryBackend> {
	pub fn new(config: ServerConfig) -> Self {
		Self {
			config,
			router: Router::new(),
			backend: MemoryBackend::new(),
			clock: Arc::new(SystemClock),
			load: Box::new(ProcLoadAvg::default()),
			policy: IntervalPolicy::default(),
		}
	}
}

impl<B: SessionBackend> ServerBuilder<B> {
	pub fn router(mut self, router: Router) -> Self {
		self.router = router;
		self
	}

	pub fn backend<B2: SessionBackend>(self, backend: B2) -> ServerBuilder<B2> {
		ServerBuilder {
			config: self.config,
			router: self.router,
			backend,
			clock: self.clock,
			load: self.load,
			policy: self.policy,
		}
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn load_source(mut self, load: impl LoadSource + 'static) -> Self {
		self.load = Box::new(load);
		self
	}

	pub fn policy(mut self, policy: IntervalPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn build(self) -> Server<B> {
		let lifetime = self.config.session_lifetime();
		Server {
			store: Mutex::new(SessionStore::new(self.backend, lifetime, self.clock)),
			config: self.config,
			router: self.router,
			locks: KeyLocks::default(),
			load: self.load,
			policy: self.policy,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::interval::StaticLoad;

	#[test]
	fn elapsed_is_rounded_to_four_places() {
		assert_eq!(round4(0.123_456), 0.1235);
		assert_eq!(round4(2.0), 2.0);
	}

	#[tokio::test]
	async fn key_locks_serialize_same_key() {
		let locks = Arc::new(KeyLocks::default());
		let first = locks.acquire("S1").await;

		let contender = {
			let locks = Arc::clone(&locks);
			tokio::spawn(async move {
				let _guard = locks.acquire("S1").await;
			})
		};
		tokio::task::yield_now().await;
		assert!(!contender.is_finished());

		let _other = locks.acquire("S2").await;
		drop(first);
		contender.await.unwrap();
	}

	#[tokio::test]
	async fn released_locks_leave_no_entries() {
		let locks = Arc::new(KeyLocks::default());
		let first = locks.acquire("S1").await;

		let contender = {
			let locks = Arc::clone(&locks);
			tokio::spawn(async move {
				let guard = locks.acquire("S1").await;
				locks.release("S1", guard);
			})
		};
		tokio::task::yield_now().await;

		locks.release("S1", first);
		assert_eq!(locks.len(), 1, "entry stays while a waiter holds it");
		contender.await.unwrap();
		assert_eq!(locks.len(), 0);
	}

	#[tokio::test]
	async fn unknown_keys_do_not_accumulate_locks() {
		let server = Server::builder(ServerConfig::default())
			.load_source(StaticLoad(0.5))
			.policy(IntervalPolicy::fixed(1_000))
			.build();

		for n in 0..200 {
			let request = PollRequest::new("ping").with_key(Some(format!("forged-{n}")));
			let envelope = server.handle(request, "127.0.0.1").await;
			assert_ne!(envelope.key.as_deref(), Some(format!("forged-{n}").as_str()));
		}
		assert_eq!(server.session_count(), 200);
		assert_eq!(server.locks.len(), 0);
	}

	#[tokio::test]
	async fn interval_includes_floor() {
		let config = ServerConfig {
			min_update_interval_ms: 500,
			..Default::default()
		};
		let server = Server::builder(config)
			.load_source(StaticLoad(0.5))
			.policy(IntervalPolicy::fixed(1_000))
			.build();

		let envelope = server.handle(PollRequest::new("ping"), "127.0.0.1").await;
		assert_eq!(envelope.interval_ms, Some(1_500));
	}
}
