//! Error types for server setup.
//!
//! Request handling itself never fails: unknown actions, missing sessions,
//! and corrupt session records all degrade to a valid reply.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("invalid configuration in {}: {message}", path.display())]
	Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
