use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::device::Protocol;
use crate::{Error, Result};

/// Connection settings for the device API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            protocol: Protocol::default(),
            port: None,
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub protocol: Option<Protocol>,
    pub port: Option<u16>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-user settings file, e.g. `~/.config/snoopconf/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snoopconf").join("config"))
}

impl Settings {
    /// Load settings from the standard locations, then `explicit` if given,
    /// then `SNOOPCONF_*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("protocol", "http")?
            .set_default("timeout_secs", default_timeout_secs())?
            .set_default("accept_invalid_certs", false)?
            .add_source(File::with_name("/etc/snoopconf/config").required(false));

        if let Some(path) = user_config_path() {
            builder = builder.add_source(File::from(path).required(false));
        }

        if let Some(path) = explicit {
            debug!("loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(Environment::with_prefix("SNOOPCONF").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.username.is_some() {
            self.username = overrides.username;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
        if let Some(protocol) = overrides.protocol {
            self.protocol = protocol;
        }
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        self
    }

    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, _) => Err(Error::Config("no username configured".to_string())),
            (_, None) => Err(Error::Config("no password configured".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn write_config(extension: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_explicit_toml_file() {
        let file = write_config(
            ".toml",
            "username = \"admin\"\npassword = \"secret\"\nprotocol = \"https\"\ntimeout_secs = 5\n",
        );
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.protocol, Protocol::Https);
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(
            settings.credentials().unwrap(),
            Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_yaml_file() {
        let file = write_config(".yaml", "username: ops\nport: 8443\naccept_invalid_certs: true\n");
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.username.as_deref(), Some("ops"));
        assert_eq!(settings.port, Some(8443));
        assert!(settings.accept_invalid_certs);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/snoopconf.toml")));
        assert_matches!(result, Err(Error::Config(_)));
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings {
            username: Some("file".to_string()),
            ..Default::default()
        }
        .with_overrides(Overrides {
            username: Some("cli".to_string()),
            password: Some("pw".to_string()),
            protocol: Some(Protocol::Https),
            port: None,
        });
        assert_eq!(settings.username.as_deref(), Some("cli"));
        assert_eq!(settings.protocol, Protocol::Https);
        assert_eq!(settings.port, None);
        assert!(settings.credentials().is_ok());
    }

    #[test]
    fn test_missing_password() {
        let settings = Settings {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        assert_matches!(settings.credentials(), Err(Error::Config(msg)) if msg.contains("password"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
