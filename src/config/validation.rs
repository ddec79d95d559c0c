use super::*;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &GatewayConfig) -> ConfigResult<()> {
        Self::validate_server_settings(config)?;
        Self::validate_upstream(config)?;
        Self::validate_markers(config)?;
        Ok(())
    }

    fn validate_server_settings(config: &GatewayConfig) -> ConfigResult<()> {
        if config.host.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            });
        }
        if config.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }
        if config.history_max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_max_turns".to_string(),
                value: "0".to_string(),
                reason: "at least one turn must be retained".to_string(),
            });
        }
        if config.context_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "context_window".to_string(),
                value: "0".to_string(),
                reason: "the model needs at least one context message".to_string(),
            });
        }
        if config.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tokens".to_string(),
                value: "0".to_string(),
                reason: "generation budget must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    fn validate_upstream(config: &GatewayConfig) -> ConfigResult<()> {
        if config.upstream_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "upstream_url".to_string(),
            });
        }
        if !config.upstream_url.starts_with("http://")
            && !config.upstream_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "upstream_url".to_string(),
                value: config.upstream_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        Ok(())
    }

    fn validate_markers(config: &GatewayConfig) -> ConfigResult<()> {
        if config.reasoning_open_tag.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "reasoning_open_tag".to_string(),
            });
        }
        if config.reasoning_close_tag.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "reasoning_close_tag".to_string(),
            });
        }
        if config.reasoning_open_tag == config.reasoning_close_tag {
            return Err(ConfigError::InvalidValue {
                field: "reasoning_close_tag".to_string(),
                value: config.reasoning_close_tag.clone(),
                reason: "open and close markers must differ".to_string(),
            });
        }
        Ok(())
    }
}
