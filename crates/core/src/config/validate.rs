use super::{types::Config, ConfigError};

/// Longest packaging window accepted, in seconds.
pub const MAX_PACKAGING_WINDOW_SECS: u64 = 6 * 60 * 60;

/// Validate configuration
/// Currently validates:
/// - Merchant id is not blank
/// - Server port is not 0
/// - Tick interval and channel buffers are positive
/// - Adherence bands are strictly ascending
/// - Packaging window is between one second and six hours
/// - Reconnect backoff bounds are ordered
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.merchant.id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "merchant.id cannot be empty".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.desk.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "desk.tick_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.desk.command_buffer == 0 || config.desk.event_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "desk buffers must be greater than 0".to_string(),
        ));
    }

    let sla = &config.sla;
    if !(sla.excellent_max_mins < sla.good_max_mins && sla.good_max_mins < sla.warning_max_mins)
    {
        return Err(ConfigError::ValidationError(format!(
            "sla bands must be ascending (excellent {} < good {} < warning {})",
            sla.excellent_max_mins, sla.good_max_mins, sla.warning_max_mins
        )));
    }

    if sla.packaging_window_secs == 0 || sla.packaging_window_secs > MAX_PACKAGING_WINDOW_SECS {
        return Err(ConfigError::ValidationError(format!(
            "sla.packaging_window_secs must be in 1..={}, got {}",
            MAX_PACKAGING_WINDOW_SECS, sla.packaging_window_secs
        )));
    }

    if config.ingest.reconnect_initial_ms == 0
        || config.ingest.reconnect_initial_ms > config.ingest.reconnect_max_ms
    {
        return Err(ConfigError::ValidationError(
            "ingest.reconnect_initial_ms must be in 1..=reconnect_max_ms".to_string(),
        ));
    }

    Ok(())
}
