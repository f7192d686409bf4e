use std::str::FromStr;

use thiserror::Error;

/// What an exit time equal to the entry time means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameTimeExit {
    /// Book the slot for a full 24 hours.
    FullDay,
    /// Refuse the request as an empty interval.
    Reject,
}

impl FromStr for SameTimeExit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full_day" | "fullday" | "next_day" => Ok(SameTimeExit::FullDay),
            "reject" => Ok(SameTimeExit::Reject),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    /// A user may not hold two reservations that overlap in time, on any slots.
    pub one_booking_per_user: bool,
    pub same_time_exit: SameTimeExit,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            one_booking_per_user: true,
            same_time_exit: SameTimeExit::FullDay,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub policy: BookingPolicy,
}

impl Config {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()` first
    /// to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let max_connections = parse_or(&lookup, "DATABASE_POOL_SIZE", 10u32)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DATABASE_POOL_SIZE",
                value: "0".to_string(),
            });
        }

        let one_booking_per_user = match lookup("ONE_BOOKING_PER_USER") {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid {
                var: "ONE_BOOKING_PER_USER",
                value: raw,
            })?,
        };

        let same_time_exit = match lookup("SAME_TIME_EXIT") {
            None => SameTimeExit::FullDay,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "SAME_TIME_EXIT",
                value: raw,
            })?,
        };

        Ok(Config {
            database_url,
            host,
            port,
            max_connections,
            policy: BookingPolicy {
                one_booking_per_user,
                same_time_exit,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
