use crate::version::REASON_MAX_LEN;

/// Versioning configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersioningConfig {
    /// Url recorded when there is no ambient request (console, jobs).
    pub console_url: Option<String>,
    /// Reasons longer than this many characters are truncated.
    pub reason_max_len: usize,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            console_url: None,
            reason_max_len: REASON_MAX_LEN,
        }
    }
}

impl VersioningConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `VERSIONING_CONSOLE_URL`    | unset   |
    /// | `VERSIONING_REASON_MAX_LEN` | `100`   |
    ///
    /// An unparsable length falls back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let console_url = lookup("VERSIONING_CONSOLE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let reason_max_len = match lookup("VERSIONING_REASON_MAX_LEN") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(len) if len <= REASON_MAX_LEN => len,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        max = REASON_MAX_LEN,
                        "Invalid VERSIONING_REASON_MAX_LEN, using default"
                    );
                    REASON_MAX_LEN
                }
            },
            None => REASON_MAX_LEN,
        };

        Self {
            console_url,
            reason_max_len,
        }
    }
}
