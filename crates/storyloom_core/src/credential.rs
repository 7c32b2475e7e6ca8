//! Credentials handed out by the gate.

use std::fmt;

/// One rotation slot for calling a rate-limited external service.
///
/// `Debug` and `Display` never print the full key.
///
/// # Examples
///
/// ```
/// use storyloom_core::Credential;
///
/// let credential = Credential::new(0, "AIzaSyExampleKey123");
/// assert_eq!(credential.preview(), "AIzaSyEx...");
/// assert!(!format!("{:?}", credential).contains("Key123"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    slot: usize,
    key: String,
}

impl Credential {
    /// Create a credential for a rotation slot.
    pub fn new(slot: usize, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    /// Zero-based rotation slot.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The secret key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// First eight characters of the key followed by `...`.
    pub fn preview(&self) -> String {
        let head: String = self.key.chars().take(8).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("slot", &self.slot)
            .field("key", &self.preview())
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credential #{} ({})", self.slot + 1, self.preview())
    }
}
