use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Default model used for every generation call.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-preview";

/// Default origin of the Gemini REST API.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("DNALENS_ENV", "development"))?;

    let bind_addr = or_default("DNALENS_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("DNALENS_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("DNALENS_LOG_LEVEL", "info");

    let gemini_api_key = lookup("GEMINI_API_KEY")
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());
    let gemini_model = or_default("DNALENS_GEMINI_MODEL", DEFAULT_GEMINI_MODEL);
    let gemini_base_url = or_default("DNALENS_GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL);

    let request_timeout_secs = parse_u64("DNALENS_REQUEST_TIMEOUT_SECS", "300")?;
    let download_timeout_secs = parse_u64("DNALENS_DOWNLOAD_TIMEOUT_SECS", "60")?;
    let poll_interval_ms = parse_u64("DNALENS_POLL_INTERVAL_MS", "2000")?;
    if poll_interval_ms == 0 {
        return Err(invalid(
            "DNALENS_POLL_INTERVAL_MS",
            "must be at least 1".to_string(),
        ));
    }
    let poll_timeout_secs = parse_u64("DNALENS_POLL_TIMEOUT_SECS", "900")?;

    let top_n = parse_usize("DNALENS_TOP_N", "10")?;
    if top_n == 0 {
        return Err(invalid("DNALENS_TOP_N", "must be at least 1".to_string()));
    }

    let profile_path = PathBuf::from(or_default("DNALENS_PROFILE_PATH", "./winning_dna.json"));
    let data_dir = PathBuf::from(or_default("DNALENS_DATA_DIR", "./data"));
    let temp_dir = lookup("DNALENS_TEMP_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let max_upload_mb = parse_usize("DNALENS_MAX_UPLOAD_MB", "512")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        gemini_api_key,
        gemini_model,
        gemini_base_url,
        request_timeout_secs,
        download_timeout_secs,
        poll_interval_ms,
        poll_timeout_secs,
        top_n,
        profile_path,
        data_dir,
        temp_dir,
        max_upload_mb,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DNALENS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
