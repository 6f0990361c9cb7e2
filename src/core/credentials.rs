use keyring::Entry;
use std::error::Error;
use std::fmt;
use tracing::debug;

const KEYRING_SERVICE: &str = "charchat";
const KEYRING_USER: &str = "api-key";

/// Environment variables consulted for the API key, in priority order.
pub const API_KEY_ENV_VARS: &[&str] = &["CHARCHAT_API_KEY", "GROQ_API_KEY"];

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors mean the credential backend was temporarily
/// unavailable (a locked keychain, a missing secret service). Permanent
/// errors surface the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

#[derive(Debug)]
pub enum CredentialError {
    /// No key in the environment or the keyring.
    Missing,
    Keyring(KeyringAccessError),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Missing => write!(
                f,
                "No API key found. Set {} or run `charchat auth`.",
                API_KEY_ENV_VARS.join(" or ")
            ),
            CredentialError::Keyring(err) => write!(f, "Keyring access failed: {err}"),
        }
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialError::Missing => None,
            CredentialError::Keyring(err) => Some(err),
        }
    }
}

impl From<KeyringAccessError> for CredentialError {
    fn from(err: KeyringAccessError) -> Self {
        CredentialError::Keyring(err)
    }
}

/// Where a resolved key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Env(&'static str),
    Keyring,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Env(var) => write!(f, "environment ({var})"),
            KeySource::Keyring => write!(f, "system keyring"),
        }
    }
}

/// Resolves the API key from the environment, then the system keyring.
pub fn resolve_api_key() -> Result<(String, KeySource), CredentialError> {
    resolve_api_key_with(|var| std::env::var(var).ok(), read_keyring_key)
}

/// Resolution with injectable lookups.
///
/// Blank values are skipped. A recoverable keyring failure is treated as
/// "no key stored" so the caller reports the missing key instead.
pub fn resolve_api_key_with<E, K>(env: E, keyring: K) -> Result<(String, KeySource), CredentialError>
where
    E: Fn(&str) -> Option<String>,
    K: FnOnce() -> Result<Option<String>, KeyringAccessError>,
{
    for var in API_KEY_ENV_VARS {
        if let Some(value) = env(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok((trimmed.to_string(), KeySource::Env(var)));
            }
        }
    }

    match keyring() {
        Ok(Some(key)) if !key.trim().is_empty() => Ok((key.trim().to_string(), KeySource::Keyring)),
        Ok(_) => Err(CredentialError::Missing),
        Err(err) if err.is_recoverable() => {
            debug!(error = %err, "Keyring unavailable; treating API key as missing");
            Err(CredentialError::Missing)
        }
        Err(err) => Err(err.into()),
    }
}

fn keyring_entry() -> Result<Entry, KeyringAccessError> {
    Ok(Entry::new(KEYRING_SERVICE, KEYRING_USER)?)
}

fn read_keyring_key() -> Result<Option<String>, KeyringAccessError> {
    match keyring_entry()?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn store_api_key(key: &str) -> Result<(), KeyringAccessError> {
    keyring_entry()?.set_password(key.trim())?;
    Ok(())
}

/// Removes the stored key. Returns false when nothing was stored.
pub fn delete_api_key() -> Result<bool, KeyringAccessError> {
    match keyring_entry()?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(err.into()),
    }
}
