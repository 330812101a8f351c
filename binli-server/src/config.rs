//! Server settings read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `BINLI_HOST` | `0.0.0.0` |
//! | `BINLI_PORT` | `8080` |
//! | `BINLI_FEED_CAPACITY` | `64` |
//!
//! Log filtering is controlled separately through `RUST_LOG`.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use binli_store_memory::DEFAULT_FEED_CAPACITY;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 8080;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// A configuration variable held an unusable value.
pub enum ConfigError {
    /// The value could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value found.
        value: String,
        /// Why the value was refused.
        reason: String,
    },
}

/// Settings for one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Per-subscriber buffer of the change feed.
    pub feed_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a variable that is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a variable that is set but unparsable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = parse_var(&lookup, "BINLI_HOST")?.unwrap_or(DEFAULT_HOST);
        let port = parse_var(&lookup, "BINLI_PORT")?.unwrap_or(DEFAULT_PORT);
        let feed_capacity = parse_var::<usize, _>(&lookup, "BINLI_FEED_CAPACITY")?
            .unwrap_or(DEFAULT_FEED_CAPACITY);

        if feed_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "BINLI_FEED_CAPACITY",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            host,
            port,
            feed_capacity,
        })
    }

    /// Socket address to listen on.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|err: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: err.to_string(),
        })
}
