//! Rate-limited credential gate for the Storyloom pipeline.
//!
//! [`CredentialGate`] hands out one of N credentials in round-robin order,
//! enforcing a per-credential cooldown and taking credentials out of rotation
//! when the remote service reports quota exhaustion.
//!
//! # Example
//!
//! ```
//! use storyloom_rate_limit::{CredentialGate, GateConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = CredentialGate::new(vec!["key-one".into(), "key-two".into()], GateConfig::default())?;
//! let first = gate.acquire().await;
//! let second = gate.acquire().await;
//! assert_ne!(first.slot(), second.slot());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod gate;

pub use config::{GateConfig, credentials_from_env, credentials_from_lookup};
pub use gate::{CredentialGate, CredentialStats, GateStats};
