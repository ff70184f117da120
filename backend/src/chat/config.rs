//! Chat widget configuration
//!
//! Centralized timings, personas and outbound targets for the chat session.

use serde::Serialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default proxy endpoint used by the session's remote client
pub const DEFAULT_CHAT_ENDPOINT: &str = "http://127.0.0.1:8080/api/chat";

/// Errors raised by [`ChatConfig::validate`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No agent persona configured
    #[error("at least one agent name is required")]
    NoAgentNames,

    /// A duration that must be positive is zero
    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),

    /// Reconnect delay bounds are inverted
    #[error("reconnect delay min ({min:?}) exceeds max ({max:?})")]
    InvertedReconnectDelay {
        /// Configured lower bound
        min: Duration,
        /// Configured upper bound
        max: Duration,
    },

    /// The rating prompt needs at least one level
    #[error("rating_levels must be > 0")]
    NoRatingLevels,

    /// An endpoint or URL is empty
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Configuration of a chat widget instance
#[derive(Debug, Clone, Serialize)]
pub struct ChatConfig {
    /// Personas randomly assigned to sessions
    pub agent_names: Vec<String>,
    /// Idle time before the nudge message
    pub inactivity_timeout: Duration,
    /// Idle time after the nudge before the session is closed
    pub close_timeout: Duration,
    /// Time after start before the widget opens on its own
    pub proactive_timeout: Duration,
    /// Lower bound of the simulated agent-assignment delay
    pub reconnect_delay_min: Duration,
    /// Upper bound of the simulated agent-assignment delay
    pub reconnect_delay_max: Duration,
    /// Delay between a purchase hand-off and the rating prompt
    pub rating_delay: Duration,
    /// Number of selectable rating levels
    pub rating_levels: u8,
    /// Pause before retrying a transient channel failure
    pub retry_delay: Duration,
    /// Proxy endpoint the remote client posts to
    pub endpoint: String,
    /// WhatsApp number (international format, digits only)
    pub whatsapp_phone: String,
    /// External complaint form
    pub complaint_form_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            agent_names: ["Sofía", "Carlos", "Ana", "Miguel", "Laura"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            inactivity_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(60),
            proactive_timeout: Duration::from_secs(12),
            reconnect_delay_min: Duration::from_secs(10),
            reconnect_delay_max: Duration::from_secs(60),
            rating_delay: Duration::from_secs(4),
            rating_levels: 5,
            retry_delay: Duration::from_millis(350),
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            whatsapp_phone: "529811579841".to_string(),
            complaint_form_url: "https://forms.gle/YYwdiPqcGQZUSMug7".to_string(),
        }
    }
}

impl ChatConfig {
    /// Defaults overridden by `CHAT_ENDPOINT` and `WHATSAPP_PHONE` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = env::var("CHAT_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(phone) = env::var("WHATSAPP_PHONE") {
            config.whatsapp_phone = phone;
        }
        config
    }

    /// Check the configuration for values the session cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_names.is_empty() {
            return Err(ConfigError::NoAgentNames);
        }
        if self.inactivity_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("inactivity_timeout"));
        }
        if self.close_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("close_timeout"));
        }
        if self.reconnect_delay_min > self.reconnect_delay_max {
            return Err(ConfigError::InvertedReconnectDelay {
                min: self.reconnect_delay_min,
                max: self.reconnect_delay_max,
            });
        }
        if self.rating_levels == 0 {
            return Err(ConfigError::NoRatingLevels);
        }
        if self.endpoint.is_empty() {
            return Err(ConfigError::Empty("endpoint"));
        }
        if self.complaint_form_url.is_empty() {
            return Err(ConfigError::Empty("complaint_form_url"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_is_valid() {
        let config = ChatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent_names.len(), 5);
        assert_eq!(config.inactivity_timeout, Duration::from_secs(30));
        assert_eq!(config.close_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_inverted_delay() {
        let config = ChatConfig {
            reconnect_delay_min: Duration::from_secs(5),
            reconnect_delay_max: Duration::from_secs(1),
            ..ChatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedReconnectDelay { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_agents() {
        let config = ChatConfig {
            agent_names: Vec::new(),
            ..ChatConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoAgentNames));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ChatConfig {
            close_timeout: Duration::ZERO,
            ..ChatConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("close_timeout"))
        );
    }

    #[test]
    #[serial]
    fn test_from_env_endpoint_override() {
        env::set_var("CHAT_ENDPOINT", "http://proxy.test/api/chat");
        let config = ChatConfig::from_env();
        env::remove_var("CHAT_ENDPOINT");
        assert_eq!(config.endpoint, "http://proxy.test/api/chat");
    }
}
