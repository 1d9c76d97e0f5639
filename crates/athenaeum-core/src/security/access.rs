//! Hashed admin secret and bounded login attempts

use crate::error::{Error, Result};
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::Argon2;
use serde::Serialize;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Environment variable holding the admin secret
pub const ADMIN_CODE_ENV: &str = "ATHENAEUM_ADMIN_CODE";

/// Wrong guesses allowed before an admin login fails closed
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Development-only secret used when the environment provides none
const INSECURE_FALLBACK_CODE: &str = "LibraryAdmin123";

/// Where the admin secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SecretOrigin {
    Environment,
    InsecureFallback,
}

/// The raw admin secret, wiped from memory on drop
pub struct AdminSecret {
    value: Zeroizing<String>,
    origin: SecretOrigin,
}

impl AdminSecret {
    /// Read the secret from `ATHENAEUM_ADMIN_CODE`
    pub fn from_env() -> Self {
        Self::from_lookup(std::env::var(ADMIN_CODE_ENV).ok())
    }

    /// Build from an optional configured value; blank counts as absent
    pub fn from_lookup(value: Option<String>) -> Self {
        match value.map(Zeroizing::new) {
            Some(value) if !value.trim().is_empty() => Self {
                value,
                origin: SecretOrigin::Environment,
            },
            _ => Self {
                value: Zeroizing::new(INSECURE_FALLBACK_CODE.to_string()),
                origin: SecretOrigin::InsecureFallback,
            },
        }
    }

    pub fn origin(&self) -> SecretOrigin {
        self.origin
    }

    pub fn is_insecure(&self) -> bool {
        self.origin == SecretOrigin::InsecureFallback
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSecret")
            .field("value", &"[REDACTED]")
            .field("origin", &self.origin)
            .finish()
    }
}

/// One answer from whoever is typing the secret
pub enum SecretPrompt {
    Candidate(Zeroizing<String>),
    Cancel,
}

/// Supplies candidate secrets, one per attempt
pub trait SecretSource {
    /// `attempt` starts at 1; `remaining` counts this attempt
    fn request(&mut self, attempt: u32, remaining: u32) -> Result<SecretPrompt>;
}

/// How an admin login ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Authentication {
    Granted,
    Cancelled,
    Exhausted,
}

impl Authentication {
    pub fn granted(self) -> bool {
        self == Authentication::Granted
    }

    /// Turn anything but `Granted` into an auth error
    pub fn require_granted(self) -> Result<()> {
        match self {
            Authentication::Granted => Ok(()),
            Authentication::Cancelled => {
                Err(Error::AuthenticationFailed("login cancelled".to_string()))
            }
            Authentication::Exhausted => {
                Err(Error::AuthenticationFailed("too many failed attempts".to_string()))
            }
        }
    }
}

/// Holds the PHC-formatted hash of the admin secret for the process
/// lifetime. The plaintext is dropped as soon as it has been hashed.
pub struct AccessControl {
    reference: String,
    origin: SecretOrigin,
}

impl AccessControl {
    pub fn new(secret: AdminSecret) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let reference = Argon2::default()
            .hash_password(secret.value.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("Failed to hash admin secret: {}", e)))?
            .to_string();

        if secret.is_insecure() {
            warn!(
                env = ADMIN_CODE_ENV,
                "Admin secret not configured; using the insecure development fallback"
            );
        }

        Ok(Self {
            reference,
            origin: secret.origin,
        })
    }

    pub fn origin(&self) -> SecretOrigin {
        self.origin
    }

    /// Check a candidate against the stored hash
    pub fn verify(&self, candidate: &str) -> bool {
        match PasswordHash::new(&self.reference) {
            Ok(parsed) => Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Ask `source` for the secret until it matches, the caller cancels, or
    /// `max_attempts` wrong guesses have been made
    pub fn authenticate<S>(&self, source: &mut S, max_attempts: u32) -> Result<Authentication>
    where
        S: SecretSource + ?Sized,
    {
        for attempt in 1..=max_attempts {
            let remaining = max_attempts - attempt + 1;
            match source.request(attempt, remaining)? {
                SecretPrompt::Cancel => {
                    debug!(attempt, "Admin login cancelled");
                    return Ok(Authentication::Cancelled);
                }
                SecretPrompt::Candidate(candidate) => {
                    if self.verify(&candidate) {
                        debug!(attempt, "Admin login granted");
                        return Ok(Authentication::Granted);
                    }
                    debug!(attempt, remaining = remaining - 1, "Admin secret rejected");
                }
            }
        }

        warn!(max_attempts, "Admin login failed after maximum attempts");
        Ok(Authentication::Exhausted)
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl").field("origin", &self.origin).finish()
    }
}
