//! Tracing subscriber setup for the binary.

/// Environment variable that overrides `--log-level` with a full filter directive.
pub const LOG_ENV: &str = "CANDLEBT_LOG";

/// Install a global `fmt` subscriber writing to stderr.
///
/// `log_format` is `text` or `json`. Calling this twice is harmless; the
/// second call keeps the first subscriber.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let format = log_format.trim().to_lowercase();
    let installed = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
        other => return Err(format!("unknown log format '{other}' (expected text or json)")),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_format() {
        let err = init_tracing("info", "xml").unwrap_err();
        assert!(err.contains("xml"));
    }

    #[test]
    fn repeated_init_is_ok() {
        assert!(init_tracing("warn", "text").is_ok());
        assert!(init_tracing("warn", "json").is_ok());
    }
}
