use crate::core::dropbox::{BACKEND_NAME, TOKEN_KEY};
use crate::domain::model::StorageOpts;
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "server.toml";

/// Server configuration file holding the store selection.
///
/// ```toml
/// [store]
/// backend = "DROPBOX"
///
/// [store.options]
/// token = "${DROPBOX_TOKEN}"
/// page_size = "1000"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub store: StoreSection,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    pub backend: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: BACKEND_NAME.to_string(),
            options: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for StoreSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options: BTreeMap<&str, &str> = self
            .options
            .iter()
            .map(|(k, v)| {
                let shown = if k == TOKEN_KEY { "<redacted>" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("StoreSection")
            .field("backend", &self.backend)
            .field("options", &options)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses the file after replacing `${VAR}` references with the
    /// environment's values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| StoreError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| StoreError::ConfigError {
            message: format!("bad substitution pattern: {}", e),
        })?;

        let mut missing = Vec::new();
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.push(var_name.to_string());
                String::new()
            })
        });

        if !missing.is_empty() {
            return Err(StoreError::ConfigError {
                message: format!("environment variables not set: {}", missing.join(", ")),
            });
        }
        Ok(result.into_owned())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| StoreError::ConfigError {
            message: format!("TOML serialization error: {}", e),
        })
    }

    /// Writes the file readable by the owner only; it holds a credential.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Wrote server configuration to {}", path.display());
        Ok(())
    }

    pub fn set_store(&mut self, backend: &str, options: BTreeMap<String, String>) {
        self.store.backend = backend.to_string();
        self.store.options = options;
    }

    /// Points the store at Dropbox with `token`. Other options survive when
    /// the file already selected Dropbox; a different backend's options are
    /// dropped.
    pub fn set_dropbox_token(&mut self, token: String) {
        let mut options = if self.store.backend == BACKEND_NAME {
            std::mem::take(&mut self.store.options)
        } else {
            BTreeMap::new()
        };
        options.insert(TOKEN_KEY.to_string(), token);
        self.set_store(BACKEND_NAME, options);
    }

    pub fn backend(&self) -> &str {
        &self.store.backend
    }

    pub fn storage_opts(&self) -> StorageOpts {
        StorageOpts {
            opts: self
                .store
                .options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("store.backend", &self.store.backend)
    }
}
