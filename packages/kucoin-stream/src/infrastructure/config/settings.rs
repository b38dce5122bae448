//! Client Configuration Settings
//!
//! Credentials and option types for the stream client. The SDK never signs
//! requests itself (signing belongs to the external transport collaborator);
//! credentials presence only gates registration of private streams.

use std::time::Duration;

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A credential component was empty.
    #[error("credential field `{0}` cannot be empty")]
    EmptyCredential(&'static str),

    /// A required environment variable was missing.
    #[error("environment variable `{0}` not set")]
    MissingEnvVar(&'static str),
}

/// KuCoin API credentials.
///
/// The `Debug` implementation redacts all components for safe logging.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    api_passphrase: String,
}

impl Credentials {
    /// Create new credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if any component is empty.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_passphrase: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();
        let api_passphrase = api_passphrase.into();

        if api_key.is_empty() {
            return Err(ConfigError::EmptyCredential("api_key"));
        }
        if api_secret.is_empty() {
            return Err(ConfigError::EmptyCredential("api_secret"));
        }
        if api_passphrase.is_empty() {
            return Err(ConfigError::EmptyCredential("api_passphrase"));
        }

        Ok(Self {
            api_key,
            api_secret,
            api_passphrase,
        })
    }

    /// Create credentials from `KUCOIN_KEY`, `KUCOIN_SECRET`, and
    /// `KUCOIN_PASSPHRASE` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            std::env::var("KUCOIN_KEY").map_err(|_| ConfigError::MissingEnvVar("KUCOIN_KEY"))?;
        let api_secret = std::env::var("KUCOIN_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("KUCOIN_SECRET"))?;
        let api_passphrase = std::env::var("KUCOIN_PASSPHRASE")
            .map_err(|_| ConfigError::MissingEnvVar("KUCOIN_PASSPHRASE"))?;

        Self::new(api_key, api_secret, api_passphrase)
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Get the API passphrase.
    #[must_use]
    pub fn api_passphrase(&self) -> &str {
        &self.api_passphrase
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("api_passphrase", &"[REDACTED]")
            .finish()
    }
}

/// Stream client options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API credentials; required only for private streams.
    pub credentials: Option<Credentials>,

    /// How long to wait for the server to acknowledge a subscribe or
    /// unsubscribe request.
    pub ack_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            credentials: None,
            ack_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientOptions {
    /// Options with credentials configured.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
