//! Scraper configuration.
//!
//! [`ScraperConfig`] is a typed, validated structure. It is changed through a
//! fixed surface only: builder methods before use, or a [`ConfigPatch`]
//! applied with [`ScraperConfig::apply`].

mod proxy;

pub use proxy::{ProxyMap, ProxySettings};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Prefix of the environment variables read by [`ScraperConfig::from_env`].
pub const ENV_PREFIX: &str = "SCRAPER_";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `min_delay` exceeds `max_delay`.
    #[error("min_delay ({min}) cannot be greater than max_delay ({max})")]
    DelayRange {
        /// Lower bound in seconds.
        min: f64,
        /// Upper bound in seconds.
        max: f64,
    },

    /// A delay bound is negative or not finite.
    #[error("Delay bounds must be finite and non-negative, got {0}")]
    InvalidDelay(f64),

    /// Window narrower than 640 pixels.
    #[error("Window size must be at least 640 pixels, got {0}")]
    WindowSize(u32),

    /// Language code with non-letter characters.
    #[error("Language code must contain only letters, got '{0}'")]
    Language(String),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// The variable name.
        key: String,
        /// The raw value.
        value: String,
    },
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/74.0.3729.169 Safari/537.3"
        .to_string()
}

fn default_arguments() -> Vec<String> {
    vec![
        "--ignore-certificate-errors".to_string(),
        "--ignore-ssl-errors=yes".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
    ]
}

/// Browser and run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Run the browser without a window.
    pub headless: bool,
    /// Proxy URL handed to the browser.
    pub proxy: Option<String>,
    /// Browser profile name.
    pub profile: Option<String>,
    /// Use a lightweight profile.
    pub tiny_profile: bool,
    /// Skip image loading.
    pub block_images: bool,
    /// Skip image and stylesheet loading.
    pub block_images_and_css: bool,
    /// Wait for the full page load on navigation.
    pub wait_for_complete_page_load: bool,
    /// User agent string.
    pub user_agent: String,
    /// Browser language.
    pub lang: String,
    /// Beep when the browser opens.
    pub beep: bool,
    /// Window width in pixels.
    pub window_size: u32,
    /// Lower bound of the politeness delay between items, in seconds.
    pub min_delay: f64,
    /// Upper bound of the politeness delay between items, in seconds.
    pub max_delay: f64,
    /// Browser extensions to load.
    pub extensions: Vec<String>,
    /// Extra browser command-line arguments.
    pub arguments: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: false,
            proxy: None,
            profile: None,
            tiny_profile: false,
            block_images: true,
            block_images_and_css: false,
            wait_for_complete_page_load: true,
            user_agent: default_user_agent(),
            lang: "en".to_string(),
            beep: false,
            window_size: 1920,
            min_delay: 1.0,
            max_delay: 2.0,
            extensions: Vec::new(),
            arguments: default_arguments(),
        }
    }
}

impl ScraperConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets headless mode.
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Sets the proxy URL.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the politeness delay bounds in seconds.
    #[must_use]
    pub fn with_delay(mut self, min: f64, max: f64) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Checks every field constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for bound in [self.min_delay, self.max_delay] {
            if !bound.is_finite() || bound < 0.0 {
                return Err(ConfigError::InvalidDelay(bound));
            }
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::DelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.window_size < 640 {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if self.lang.is_empty() || !self.lang.chars().all(char::is_alphabetic) {
            return Err(ConfigError::Language(self.lang.clone()));
        }
        Ok(())
    }

    /// Applies a patch. On error the configuration is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the patched configuration.
    pub fn apply(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Politeness delay bounds as durations.
    #[must_use]
    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs_f64(self.min_delay.max(0.0)),
            Duration::from_secs_f64(self.max_delay.max(0.0)),
        )
    }

    /// Loads defaults overridden by `SCRAPER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit variable list.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid.
    pub fn from_env_map<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut patch = ConfigPatch::default();
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            patch.set_from_str(&field.to_ascii_lowercase(), key, value)?;
        }

        let mut config = Self::default();
        config.apply(patch)?;
        Ok(config)
    }
}

/// A partial update to a [`ScraperConfig`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    /// See [`ScraperConfig::headless`].
    pub headless: Option<bool>,
    /// See [`ScraperConfig::proxy`].
    pub proxy: Option<String>,
    /// See [`ScraperConfig::profile`].
    pub profile: Option<String>,
    /// See [`ScraperConfig::tiny_profile`].
    pub tiny_profile: Option<bool>,
    /// See [`ScraperConfig::block_images`].
    pub block_images: Option<bool>,
    /// See [`ScraperConfig::block_images_and_css`].
    pub block_images_and_css: Option<bool>,
    /// See [`ScraperConfig::wait_for_complete_page_load`].
    pub wait_for_complete_page_load: Option<bool>,
    /// See [`ScraperConfig::user_agent`].
    pub user_agent: Option<String>,
    /// See [`ScraperConfig::lang`].
    pub lang: Option<String>,
    /// See [`ScraperConfig::beep`].
    pub beep: Option<bool>,
    /// See [`ScraperConfig::window_size`].
    pub window_size: Option<u32>,
    /// See [`ScraperConfig::min_delay`].
    pub min_delay: Option<f64>,
    /// See [`ScraperConfig::max_delay`].
    pub max_delay: Option<f64>,
    /// See [`ScraperConfig::extensions`].
    pub extensions: Option<Vec<String>>,
    /// See [`ScraperConfig::arguments`].
    pub arguments: Option<Vec<String>>,
}

impl ConfigPatch {
    fn apply_to(self, config: &mut ScraperConfig) {
        if let Some(v) = self.headless {
            config.headless = v;
        }
        if let Some(v) = self.proxy {
            config.proxy = Some(v);
        }
        if let Some(v) = self.profile {
            config.profile = Some(v);
        }
        if let Some(v) = self.tiny_profile {
            config.tiny_profile = v;
        }
        if let Some(v) = self.block_images {
            config.block_images = v;
        }
        if let Some(v) = self.block_images_and_css {
            config.block_images_and_css = v;
        }
        if let Some(v) = self.wait_for_complete_page_load {
            config.wait_for_complete_page_load = v;
        }
        if let Some(v) = self.user_agent {
            config.user_agent = v;
        }
        if let Some(v) = self.lang {
            config.lang = v;
        }
        if let Some(v) = self.beep {
            config.beep = v;
        }
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.min_delay {
            config.min_delay = v;
        }
        if let Some(v) = self.max_delay {
            config.max_delay = v;
        }
        if let Some(v) = self.extensions {
            config.extensions = v;
        }
        if let Some(v) = self.arguments {
            config.arguments = v;
        }
    }

    fn set_from_str(&mut self, field: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let flag = || parse_bool(value).ok_or_else(invalid);
        let list = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        };

        match field {
            "headless" => self.headless = Some(flag()?),
            "proxy" => self.proxy = Some(value.to_string()),
            "profile" => self.profile = Some(value.to_string()),
            "tiny_profile" => self.tiny_profile = Some(flag()?),
            "block_images" => self.block_images = Some(flag()?),
            "block_images_and_css" => self.block_images_and_css = Some(flag()?),
            "wait_for_complete_page_load" => self.wait_for_complete_page_load = Some(flag()?),
            "user_agent" => self.user_agent = Some(value.to_string()),
            "lang" => self.lang = Some(value.to_string()),
            "beep" => self.beep = Some(flag()?),
            "window_size" => self.window_size = Some(value.parse().map_err(|_| invalid())?),
            "min_delay" => self.min_delay = Some(value.parse().map_err(|_| invalid())?),
            "max_delay" => self.max_delay = Some(value.parse().map_err(|_| invalid())?),
            "extensions" => self.extensions = Some(list()),
            "arguments" => self.arguments = Some(list()),
            _ => tracing::warn!(key = %key, "Unknown configuration key"),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
