//! # Reinhardt Session Registry
//!
//! In-process session management for server-side applications.
//!
//! The registry issues opaque session identifiers, keeps arbitrary per-client
//! state for each of them, and reclaims idle sessions with a background
//! sweeper. Expiration is sliding: every lookup of a known identifier pushes
//! its expiry to `now + timeout`.
//!
//! ## Features
//!
//! - **Secure identifiers**: 128 bits from the operating system CSPRNG,
//!   rendered as 32 lowercase hex characters
//! - **Sliding expiration**: configurable idle timeout, 5 minutes by default
//! - **Background sweeper**: a cancellable Tokio task evicting expired sessions
//! - **Lifecycle hooks**: one start hook and one end hook per registry
//! - **Cookie contract**: helpers reading the `SessionId` cookie and building
//!   the matching `Set-Cookie` headers
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use http::HeaderMap;
//! use reinhardt_session_registry::{SessionRegistry, SessionRegistryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SessionRegistry::new(SessionRegistryConfig::new(Duration::from_secs(10)));
//! registry.on_start(|session| tracing::info!(session_id = %session.id(), "started"));
//! registry.on_end(|session| tracing::info!(session_id = %session.id(), "ended"));
//!
//! // Request without a cookie: a new session is created
//! let session = registry.session_for_request(&HeaderMap::new())?;
//! session.set("alice")?;
//!
//! let mut response_headers = HeaderMap::new();
//! registry.attach_session_cookie(&mut response_headers, &session)?;
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cookie;
pub mod error;
mod hooks;
pub mod id;
pub mod registry;
pub mod session;
mod sweeper;

pub use config::{SessionRegistryConfig, SessionSettings};
pub use error::{Result, SessionError};
pub use hooks::SessionHook;
pub use id::{EntropySource, OsEntropy};
pub use registry::SessionRegistry;
pub use session::Session;
