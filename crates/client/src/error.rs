use thiserror::Error;

/// Errors raised while configuring a client.
///
/// Applying instructions never fails; unresolvable names fall through to
/// raw field assignment and missing targets are logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("alias `{alias}` points at unknown utility `{target}`")]
	UnknownAlias { alias: String, target: String },

	#[error("`{0}` is not a traversal operation")]
	NotTraversal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a poll produced no usable reply. Every variant leads to a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	#[error("network error: {0}")]
	Network(String),

	#[error("server answered with HTTP {0}")]
	Status(u16),

	#[error("reply is not a JSON object: {0}")]
	Malformed(String),
}
