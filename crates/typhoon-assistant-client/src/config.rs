//! Client configuration types.
//!
//! This module defines the settings for talking to the assistant backend.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the assistant client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend API (e.g., `http://localhost:8000/api`).
    #[serde(default = "ClientConfig::default_api_base_url")]
    pub api_base_url: String,

    /// Overall request timeout in seconds, including the streamed body.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Connection timeout in seconds.
    #[serde(default = "ClientConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Model selector sent with each question.
    #[serde(default = "ClientConfig::default_model")]
    pub default_model: String,

    /// Whether deep-thinking (reasoning) mode is on by default.
    #[serde(default)]
    pub deep_thinking: bool,

    /// Rows from the bottom that still count as "at the bottom" for auto-follow.
    #[serde(default = "ClientConfig::default_follow_threshold")]
    pub follow_threshold_rows: usize,
}

impl ClientConfig {
    fn default_api_base_url() -> String {
        "http://localhost:8000/api".to_string()
    }

    const fn default_request_timeout() -> u64 {
        120 // 2 minutes
    }

    const fn default_connect_timeout() -> u64 {
        10
    }

    fn default_model() -> String {
        "deepseek-chat".to_string()
    }

    const fn default_follow_threshold() -> usize {
        3
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
            default_model: Self::default_model(),
            deep_thinking: false,
            follow_threshold_rows: Self::default_follow_threshold(),
        }
    }
}
