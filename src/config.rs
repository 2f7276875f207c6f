use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use log::info;

/// Runtime configuration, loaded from environment variables with defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the server binds on.
    pub port: u16,

    /// Directory holding the JSON collection files.
    pub data_dir: PathBuf,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// Recognized variables:
    /// * `PORT` - listen port (default 5000, matching the frontend's default)
    /// * `DATA_DIR` - storage directory (default `database`)
    pub fn load() -> Self {
        Config {
            port: try_load("PORT", "5000"),
            data_dir: PathBuf::from(try_load::<String>("DATA_DIR", "database")),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => panic!("Invalid {key} value {raw:?}: {e}"),
    }
}
