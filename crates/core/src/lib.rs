pub mod analysis;
pub mod domain;
pub mod ingest;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_DATA_PROVIDER_BASE_URL: &str =
        "https://query1.finance.yahoo.com/v8/finance/chart";

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub data_provider_base_url: Option<String>,
        pub data_provider_timeout_secs: Option<u64>,
        pub data_provider_retries: Option<u32>,
        pub data_provider_user_agent: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            Ok(Self {
                data_provider_base_url: non_empty_var(&lookup, "DATA_PROVIDER_BASE_URL"),
                data_provider_timeout_secs: parse_var(&lookup, "DATA_PROVIDER_TIMEOUT_SECS")?,
                data_provider_retries: parse_var(&lookup, "DATA_PROVIDER_RETRIES")?,
                data_provider_user_agent: non_empty_var(&lookup, "DATA_PROVIDER_USER_AGENT"),
                sentry_dsn: non_empty_var(&lookup, "SENTRY_DSN"),
            })
        }

        pub fn data_provider_base_url(&self) -> &str {
            self.data_provider_base_url
                .as_deref()
                .unwrap_or(DEFAULT_DATA_PROVIDER_BASE_URL)
        }
    }

    pub(crate) fn non_empty_var(
        lookup: &impl Fn(&str) -> Option<String>,
        key: &str,
    ) -> Option<String> {
        lookup(key).filter(|s| !s.trim().is_empty())
    }

    pub(crate) fn parse_var<T>(
        lookup: &impl Fn(&str) -> Option<String>,
        key: &str,
    ) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(lookup, key)
            .map(|s| s.trim().parse::<T>())
            .transpose()
            .with_context(|| format!("{key} is not valid"))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<&str, &str> = pairs.iter().copied().collect();
            move |key| map.get(key).map(|v| v.to_string())
        }

        #[test]
        fn reads_provider_settings() {
            let settings = Settings::from_lookup(lookup(&[
                ("DATA_PROVIDER_BASE_URL", "http://localhost:9000/chart"),
                ("DATA_PROVIDER_TIMEOUT_SECS", " 5 "),
                ("DATA_PROVIDER_RETRIES", "3"),
                ("SENTRY_DSN", "  "),
            ]))
            .unwrap();

            assert_eq!(settings.data_provider_base_url(), "http://localhost:9000/chart");
            assert_eq!(settings.data_provider_timeout_secs, Some(5));
            assert_eq!(settings.data_provider_retries, Some(3));
            assert!(settings.sentry_dsn.is_none());
        }

        #[test]
        fn falls_back_to_default_base_url() {
            let settings = Settings::from_lookup(lookup(&[])).unwrap();
            assert_eq!(settings.data_provider_base_url(), DEFAULT_DATA_PROVIDER_BASE_URL);
        }

        #[test]
        fn rejects_unparsable_retries() {
            let err = Settings::from_lookup(lookup(&[("DATA_PROVIDER_RETRIES", "many")]))
                .unwrap_err();
            assert!(err.to_string().contains("DATA_PROVIDER_RETRIES"));
        }
    }
}
