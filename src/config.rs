use std::{
    env,
    fmt::Display,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use anyhow::{Context, Result};
use tracing::{info, warn};

const DEFAULT_SESSION_DAYS: i64 = 30;
const MAX_SESSION_DAYS: i64 = 3650;

pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub session_days: i64,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            session_secret: required("SESSION_SECRET")?,
            host: try_load("HOST", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: try_load("PORT", 3001),
            upload_dir: PathBuf::from(try_load("UPLOAD_DIR", String::from("static/uploads"))),
            session_days: checked_session_days(try_load("SESSION_DAYS", DEFAULT_SESSION_DAYS)),
        })
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn session_lifetime(&self) -> time::Duration {
        time::Duration::days(self.session_days)
    }
}

/// Session lifetimes outside 1..=3650 days fall back to the default.
fn checked_session_days(days: i64) -> i64 {
    if (1..=MAX_SESSION_DAYS).contains(&days) {
        return days;
    }
    warn!(
        "SESSION_DAYS {days} outside 1..={MAX_SESSION_DAYS}, using default: {DEFAULT_SESSION_DAYS}"
    );
    DEFAULT_SESSION_DAYS
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_values_fall_back_to_default() {
        env::set_var("INKWELL_TEST_PORT", "not-a-port");
        assert_eq!(try_load("INKWELL_TEST_PORT", 3001_u16), 3001);
        env::set_var("INKWELL_TEST_PORT", "8080");
        assert_eq!(try_load("INKWELL_TEST_PORT", 3001_u16), 8080);
    }

    #[test]
    fn session_days_stay_within_range() {
        assert_eq!(checked_session_days(7), 7);
        assert_eq!(checked_session_days(MAX_SESSION_DAYS), MAX_SESSION_DAYS);
        assert_eq!(checked_session_days(0), DEFAULT_SESSION_DAYS);
        assert_eq!(checked_session_days(-3), DEFAULT_SESSION_DAYS);
        assert_eq!(checked_session_days(100_000_000), DEFAULT_SESSION_DAYS);
    }

    #[test]
    fn missing_required_value_is_an_error() {
        assert!(required("INKWELL_TEST_SURELY_UNSET").is_err());
    }
}
