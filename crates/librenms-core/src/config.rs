//! Settings and credential resolution.
//!
//! Settings come from `LIBRENMS_*` environment variables. The URL and token
//! fall back, field by field, to `~/.config/librenms/credentials.json` when
//! the environment does not supply them. Resolution never fails; missing
//! credentials are logged and surface later when the client connects.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

const URL_VAR: &str = "LIBRENMS_URL";
const TOKEN_VAR: &str = "LIBRENMS_TOKEN";
const TRANSPORT_VAR: &str = "LIBRENMS_TRANSPORT";
const LOG_LEVEL_VAR: &str = "LIBRENMS_LOG_LEVEL";

const DEFAULT_TRANSPORT: &str = "stdio";
const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Credentials file location, relative to the home directory
const CREDENTIALS_DIR: &str = ".config/librenms";
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: String,
    pub token: String,
    pub transport: String,
    pub log_level: String,
}

/// Resolved connection credentials. A field is `Some` only when a
/// non-empty value was found.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Shape of `credentials.json`. Fields are kept untyped so a mistyped
/// `url` does not discard a usable `token` and vice versa.
#[derive(Debug, Default, Deserialize)]
struct CredentialFile {
    url: Option<Value>,
    token: Option<Value>,
}

#[derive(Error, Debug)]
enum CredentialFileError {
    #[error("could not read file: {0}")]
    Read(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            transport: DEFAULT_TRANSPORT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .field("transport", &self.transport)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("token", &self.token.as_deref().map(redact))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Take a string field from the credentials file, warning on other types.
fn file_field(path: &Path, field: &str, value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => non_empty(Some(s)),
        Some(Value::Null) | None => None,
        Some(other) => {
            warn!(
                path = %path.display(),
                field = field,
                value = %other,
                "Ignoring non-string field in LibreNMS credentials file"
            );
            None
        }
    }
}

impl Credentials {
    /// Both URL and token are present
    pub fn is_complete(&self) -> bool {
        self.url.is_some() && self.token.is_some()
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            url: var(URL_VAR).unwrap_or(defaults.url),
            token: var(TOKEN_VAR).unwrap_or(defaults.token),
            transport: var(TRANSPORT_VAR).unwrap_or(defaults.transport),
            log_level: var(LOG_LEVEL_VAR).unwrap_or(defaults.log_level),
        }
    }

    /// `~/.config/librenms/credentials.json`, if a home directory exists.
    pub fn credentials_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CREDENTIALS_DIR).join(CREDENTIALS_FILE))
    }

    /// Resolve credentials from the environment, then the credentials file.
    pub fn load_credentials(&self) -> Credentials {
        self.load_credentials_from(Self::credentials_path().as_deref())
    }

    /// Resolve credentials using `path` as the fallback file.
    ///
    /// The file is only consulted when the environment is missing the URL or
    /// the token, and only fills the fields the environment left empty.
    pub fn load_credentials_from(&self, path: Option<&Path>) -> Credentials {
        let mut creds = Credentials {
            url: non_empty(Some(self.url.clone())),
            token: non_empty(Some(self.token.clone())),
        };

        if creds.is_complete() {
            info!("Using LibreNMS credentials from environment variables");
            return creds;
        }

        if let Some(path) = path {
            match read_credential_file(path) {
                Ok(Some(file)) => {
                    if creds.url.is_none() {
                        creds.url = file_field(path, "url", file.url);
                    }
                    if creds.token.is_none() {
                        creds.token = file_field(path, "token", file.token);
                    }
                    info!(path = %path.display(), "Loaded LibreNMS credentials from file");
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load LibreNMS credentials file");
                }
            }
        }

        if !creds.is_complete() {
            let shown = path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("~/{}/{}", CREDENTIALS_DIR, CREDENTIALS_FILE));
            warn!(
                "No LibreNMS credentials configured. Set {}/{} env vars or create {}",
                URL_VAR, TOKEN_VAR, shown
            );
        }

        creds
    }

    /// Tracing filter directive for `log_level`.
    ///
    /// Accepts Python-style level names; anything unrecognised maps to `info`.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" | "CRITICAL" | "FATAL" => "error",
            _ => "info",
        }
    }
}

/// Read the credentials file. A missing file is `Ok(None)`.
fn read_credential_file(path: &Path) -> Result<Option<CredentialFile>, CredentialFileError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

// ============================================================================
// Tests
// ============================================================================
