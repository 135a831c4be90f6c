//! Session identifier generation
//!
//! Identifiers are 16 bytes drawn from a cryptographically strong source,
//! rendered as 32 lowercase hexadecimal characters. There is no fallback to a
//! weaker generator: a failing source surfaces as [`SessionError::RandomSource`].

use crate::error::{Result, SessionError};

/// Number of random bytes per identifier
pub const SESSION_ID_BYTES: usize = 16;

/// Length of the rendered identifier
pub const SESSION_ID_LEN: usize = SESSION_ID_BYTES * 2;

/// Source of identifier entropy
///
/// The registry draws from [`OsEntropy`] unless another source is installed,
/// which is mostly useful for failure injection in tests.
pub trait EntropySource: Send + Sync {
	/// Fill `buf` entirely with random bytes
	fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
	fn fill(&self, buf: &mut [u8]) -> Result<()> {
		getrandom::getrandom(buf).map_err(SessionError::from)
	}
}

/// Generate a fresh session identifier
///
/// # Examples
///
/// ```
/// use reinhardt_session_registry::id::{generate_session_id, OsEntropy, SESSION_ID_LEN};
///
/// let id = generate_session_id(&OsEntropy).unwrap();
/// assert_eq!(id.len(), SESSION_ID_LEN);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
/// ```
pub fn generate_session_id(source: &dyn EntropySource) -> Result<String> {
	let mut bytes = [0u8; SESSION_ID_BYTES];
	source.fill(&mut bytes)?;
	Ok(hex::encode(bytes))
}
