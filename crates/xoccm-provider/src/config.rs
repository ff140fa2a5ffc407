//! Cloud config file
//!
//! ```yaml
//! url: https://xo.example.com
//! insecure: false
//! token: "..."          # or username + password
//! ```

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use xoccm_common::Error;

/// Xen Orchestra connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct XoConfig {
    /// Base URL of the Xen Orchestra instance (http or https)
    #[serde(default)]
    pub url: String,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    /// Account name, used together with `password`
    #[serde(default)]
    pub username: String,
    /// Account password
    #[serde(default)]
    pub password: String,
    /// Authentication token, exclusive with username/password
    #[serde(default)]
    pub token: String,
}

impl XoConfig {
    /// Parse and validate a config document
    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let cfg: XoConfig = serde_yaml::from_reader(reader)
            .map_err(|e| Error::config(format!("invalid cloud config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::config(format!("error reading {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    /// Check authentication and URL settings
    pub fn validate(&self) -> Result<(), Error> {
        if !self.username.is_empty() && !self.password.is_empty() {
            if !self.token.is_empty() {
                return Err(Error::config(
                    "token is not allowed when username and password are set",
                ));
            }
        } else if self.token.is_empty() {
            return Err(Error::config(
                "either token or username/password are required for authentication",
            ));
        }

        if !self.url.starts_with("http") {
            return Err(Error::config("url is required"));
        }

        Ok(())
    }
}
