use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The HTTP stack backing the device client could not be constructed.
    #[error("device client unavailable: {0}")]
    #[diagnostic(code(snoopconf::missing_dependency))]
    MissingDependency(String),

    /// The device rejected the command sequence. The message is the device's own.
    #[error("{0}")]
    #[diagnostic(code(snoopconf::apply))]
    Apply(String),

    #[error("could not resolve device address {host:?}: {reason}")]
    #[diagnostic(code(snoopconf::resolution))]
    Resolution { host: String, reason: String },

    #[error("device request failed: {0}")]
    #[diagnostic(code(snoopconf::transport))]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from device: {0}")]
    #[diagnostic(code(snoopconf::response))]
    Response(String),

    #[error("invalid value {value:?} for {param}: {reason}")]
    #[diagnostic(code(snoopconf::invalid_value))]
    InvalidValue {
        param: String,
        value: String,
        reason: String,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(snoopconf::config), help("check the config file and SNOOPCONF_* variables"))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(snoopconf::json))]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
