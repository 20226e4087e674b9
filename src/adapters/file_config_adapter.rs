//! INI file configuration adapter.

use configparser::ini::Ini;
use std::path::Path;

use crate::domain::error::StockscopeError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockscopeError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|reason| StockscopeError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StockscopeError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| StockscopeError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { config })
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
        match self.config.get(section, key).as_deref() {
            Some(v) => match v.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
bars_dir = /var/lib/stockscope/bars

[prediction]
model = ensemble
horizon_days = 30
train_fraction = 0.8
with_calendar = yes

[portfolio]
ledger_file = data/portfolio.csv
"#;

    #[test]
    fn reads_all_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();

        assert_eq!(
            adapter.get_string("data", "bars_dir"),
            Some("/var/lib/stockscope/bars".to_string())
        );
        assert_eq!(
            adapter.get_string("prediction", "model"),
            Some("ensemble".to_string())
        );
        assert_eq!(adapter.get_int("prediction", "horizon_days", 0), 30);
        assert_eq!(adapter.get_double("prediction", "train_fraction", 0.0), 0.8);
        assert!(adapter.get_bool("prediction", "with_calendar", false));
        assert_eq!(
            adapter.get_string("portfolio", "ledger_file"),
            Some("data/portfolio.csv".to_string())
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[prediction]\n").unwrap();
        assert_eq!(adapter.get_string("prediction", "model"), None);
        assert_eq!(adapter.get_int("prediction", "horizon_days", 30), 30);
        assert_eq!(adapter.get_double("prediction", "train_fraction", 0.8), 0.8);
        assert!(!adapter.get_bool("prediction", "with_calendar", false));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[prediction]\nhorizon_days = soon\n").unwrap();
        assert_eq!(adapter.get_int("prediction", "horizon_days", 30), 30);
        assert_eq!(adapter.get_double("prediction", "horizon_days", 1.5), 1.5);
    }

    #[test]
    fn bool_synonyms() {
        let adapter = FileConfigAdapter::from_string(
            "[flags]\na = true\nb = ON\nc = 0\nd = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("flags", "a", false));
        assert!(adapter.get_bool("flags", "b", false));
        assert!(!adapter.get_bool("flags", "c", true));
        assert!(adapter.get_bool("flags", "d", true));
    }

    #[test]
    fn require_string_reports_missing_key() {
        let adapter = FileConfigAdapter::from_string("[data]\n").unwrap();
        let err = adapter.require_string("data", "bars_dir").unwrap_err();
        assert!(matches!(err, StockscopeError::ConfigMissing { .. }));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("prediction", "model"),
            Some("ensemble".to_string())
        );
    }

    #[test]
    fn from_file_missing_path_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/stockscope.ini").unwrap_err();
        assert!(matches!(err, StockscopeError::ConfigParse { .. }));
    }
}
