//! # Coffer Console
//!
//! The user-facing side of Coffer: a headless [`Console`] that tracks what
//! the user sees, and the `coffer` command-line tool built on it.
//!
//! The console reads the signed-in identity from a
//! [`SessionProvider`](coffer_session::SessionProvider), and lists or writes
//! objects through a [`Gateway`](coffer_storage::Gateway) using credentials
//! fetched fresh for every operation. Each operation reports its progress as
//! an [`OperationStatus`].
//!
//! ## Usage
//!
//! ```bash
//! export COFFER_CREDENTIALS_URL=https://example.com/credentials
//! coffer --bucket photos list
//! coffer --bucket photos upload
//! coffer shell
//! ```
//!
//! ## Shell commands
//!
//! - `bucket <name>` - Set the bucket
//! - `list` / `retry` - List the bucket
//! - `upload` - Write a test object and list again
//! - `refresh` - Fetch the identity again
//! - `sign-out` / `sign-in` - End or resume the session
//! - `show` - Print the current state
//! - `quit` - Leave the shell

mod cli;
pub use cli::*;

pub mod config;
pub use config::{Config, ConfigError, IssuerConfig};

mod console;
pub use console::*;

pub mod logging;

mod render;

pub mod shell;

mod status;
pub use status::*;
