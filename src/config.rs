use std::env;
use std::str::FromStr;

use crate::error::Error;
use crate::severity::Level;

/// The verbosity threshold.
pub const VERBOSITY_ENV: &str = "LOG_PREFIX_V";
/// `text` or `json`.
pub const FORMAT_ENV: &str = "LOG_PREFIX_FORMAT";
/// `true` or `false`.
pub const EXIT_ON_FATAL_ENV: &str = "LOG_PREFIX_EXIT_ON_FATAL";
/// An `env_logger` filter, like `info,my_crate=debug`.
pub const FILTER_ENV: &str = "RUST_LOG";

/// How lines are written by the logger installed with `init`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            _ => Err(Error::InvalidConfig {
                key: FORMAT_ENV,
                value: s.to_owned(),
            }),
        }
    }
}

/**
Configuration for `init`.

Missing fields take their defaults when deserializing.
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loggers gated above this level don't write info, warning or error lines.
    pub verbosity: Level,
    pub format: Format,
    /// Exit the process after writing a fatal line.
    pub exit_on_fatal: bool,
    /// An `env_logger` filter. Everything at info and above is written if there isn't one.
    pub filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: Level(0),
            format: Format::Text,
            exit_on_fatal: true,
            filter: None,
        }
    }
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /**
    Read configuration from a lookup function.

    Variables that aren't set keep their defaults.
    */
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(verbosity) = lookup(VERBOSITY_ENV) {
            let level = verbosity.trim().parse::<i32>().map_err(|_| Error::InvalidConfig {
                key: VERBOSITY_ENV,
                value: verbosity.clone(),
            })?;

            config.verbosity = Level(level);
        }

        if let Some(format) = lookup(FORMAT_ENV) {
            config.format = format.parse()?;
        }

        if let Some(exit) = lookup(EXIT_ON_FATAL_ENV) {
            config.exit_on_fatal = exit.trim().parse().map_err(|_| Error::InvalidConfig {
                key: EXIT_ON_FATAL_ENV,
                value: exit.clone(),
            })?;
        }

        config.filter = lookup(FILTER_ENV).filter(|filter| !filter.trim().is_empty());

        Ok(config)
    }
}
