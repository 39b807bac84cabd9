//! INI file configuration adapter.

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| BacktestError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// Empty configuration; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[store]
backend = sqlite
path = data/candles.db

[backtest]
exchange = binance
symbol = BTCUSDT
interval = 1h
start_date = 2023-01-01

[psar]
initial_af = 0.02
max_af = 0.2

[sma]
fast_period = 9
slow_period = 26
"#;

    #[test]
    fn reads_strings_and_numbers() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("store", "path"),
            Some("data/candles.db".to_string())
        );
        assert_eq!(adapter.get_int("sma", "slow_period", 0), 26);
        assert_eq!(adapter.get_double("psar", "max_af", 0.0), 0.2);
    }

    #[test]
    fn missing_values_fall_back() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "end_date"), None);
        assert_eq!(adapter.get_double("psar", "increment", 0.02), 0.02);
        assert_eq!(adapter.get_int("store", "pool_size", 4), 4);
    }

    #[test]
    fn non_numeric_falls_back() {
        let adapter = FileConfigAdapter::from_string("[sma]\nfast_period = nine\n").unwrap();
        assert_eq!(adapter.get_int("sma", "fast_period", 9), 9);
        assert_eq!(adapter.get_double("sma", "fast_period", 1.5), 1.5);
    }

    #[test]
    fn bool_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[x]\na = yes\nb = Off\nc = maybe\n").unwrap();
        assert!(adapter.get_bool("x", "a", false));
        assert!(!adapter.get_bool("x", "b", true));
        assert!(adapter.get_bool("x", "c", true));
    }

    #[test]
    fn require_string_reports_missing_and_blank() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nsymbol =   \n").unwrap();
        let err = adapter.require_string("backtest", "symbol").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { ref key, .. } if key == "symbol"));
        assert!(adapter.require_string("backtest", "exchange").is_err());

        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.require_string("backtest", "exchange").unwrap(), "binance");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("backtest", "symbol"), None);
        assert_eq!(adapter.get_int("sma", "fast_period", 9), 9);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("backtest", "interval"), Some("1h".into()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/candlebt.ini").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigParse { ref file, .. } if file.contains("candlebt.ini")));
    }
}
