use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("max_file_bytes must be greater than zero when set")]
    ZeroFileLimit,

    #[error("download_prefix must start and end with '/': {0}")]
    InvalidDownloadPrefix(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_scheduler(config)?;
    validate_fetch(config)?;
    validate_archive(config)?;
    Ok(())
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::Zero { field });
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    non_zero("server.max_payload_bytes", config.server.max_payload_bytes.as_u64())?;
    non_zero("server.max_files_per_task", config.server.max_files_per_task as u64)
}

fn validate_scheduler(config: &Config) -> Result<(), ValidationError> {
    non_zero("scheduler.poll_interval_ms", config.scheduler.poll_interval_ms)?;
    non_zero("scheduler.gate_timeout_secs", config.scheduler.gate_timeout_secs)
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    non_zero("fetch.connect_timeout_secs", config.fetch.connect_timeout_secs)?;
    non_zero("fetch.request_timeout_secs", config.fetch.request_timeout_secs)?;

    if config.fetch.max_file_bytes.is_some_and(|limit| limit.as_u64() == 0) {
        return Err(ValidationError::ZeroFileLimit);
    }

    Ok(())
}

fn validate_archive(config: &Config) -> Result<(), ValidationError> {
    let prefix = &config.archive.download_prefix;
    if !prefix.starts_with('/') || !prefix.ends_with('/') {
        return Err(ValidationError::InvalidDownloadPrefix(prefix.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = Config::default();
        config.scheduler.poll_interval_ms = 0;

        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Zero { field: "scheduler.poll_interval_ms" }
        ));
    }

    #[test]
    fn test_zero_files_per_task() {
        let mut config = Config::default();
        config.server.max_files_per_task = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_file_limit() {
        let mut config = Config::default();
        config.fetch.max_file_bytes = Some(ByteSize(0));
        assert!(matches!(validate(&config), Err(ValidationError::ZeroFileLimit)));
    }

    #[test]
    fn test_download_prefix_shape() {
        let mut config = Config::default();
        config.archive.download_prefix = "download".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidDownloadPrefix(_))
        ));
    }
}
