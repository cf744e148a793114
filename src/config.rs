use crate::practicum::{self, EmptyHomeworks};
use snafu::{ensure, ResultExt, Snafu};
use std::{env, time::Duration};

const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub retry_period: Duration,
    pub empty_homeworks: EmptyHomeworks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_period: DEFAULT_RETRY_PERIOD,
            empty_homeworks: EmptyHomeworks::default(),
        }
    }
}

impl Config {
    pub fn from_environment() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(period) = var("RETRY_PERIOD") {
            let secs: u64 = period
                .trim()
                .parse()
                .context(InvalidRetryPeriod { period: &*period })?;
            ensure!(secs > 0, ZeroRetryPeriod);
            config.retry_period = Duration::from_secs(secs);
        }

        if let Some(policy) = var("EMPTY_HOMEWORKS") {
            config.empty_homeworks = policy
                .trim()
                .parse::<EmptyHomeworks>()
                .context(InvalidEmptyHomeworks)?;
        }

        Ok(config)
    }
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("RETRY_PERIOD {} is not a number of seconds", period))]
    InvalidRetryPeriod {
        source: std::num::ParseIntError,
        period: String,
    },

    #[snafu(display("RETRY_PERIOD must be at least one second"))]
    ZeroRetryPeriod,

    #[snafu(display("EMPTY_HOMEWORKS is invalid"))]
    InvalidEmptyHomeworks { source: practicum::Error },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<_, _> = pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_poll_every_ten_minutes() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.retry_period, Duration::from_secs(600));
        assert_eq!(config.empty_homeworks, EmptyHomeworks::Ignore);
    }

    #[test]
    fn overrides_are_read() {
        let config = from_pairs(&[("RETRY_PERIOD", "30"), ("EMPTY_HOMEWORKS", "error")]).unwrap();
        assert_eq!(config.retry_period, Duration::from_secs(30));
        assert_eq!(config.empty_homeworks, EmptyHomeworks::Error);
    }

    #[test]
    fn bad_values_are_rejected() {
        let e = from_pairs(&[("RETRY_PERIOD", "ten")]).unwrap_err();
        assert!(matches!(e, Error::InvalidRetryPeriod { .. }), "{:?}", e);

        let e = from_pairs(&[("RETRY_PERIOD", "0")]).unwrap_err();
        assert!(matches!(e, Error::ZeroRetryPeriod), "{:?}", e);

        let e = from_pairs(&[("EMPTY_HOMEWORKS", "maybe")]).unwrap_err();
        assert!(matches!(e, Error::InvalidEmptyHomeworks { .. }), "{:?}", e);
    }
}
