//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive. Values come back as raw
//! strings; typed parsing happens where the settings are built.

use crate::domain::error::FlowtraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FlowtraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| FlowtraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, FlowtraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| FlowtraderError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// An adapter with no sections; every lookup yields `None`.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
dir = data/raw
symbol = 2337.TW

[backtest]
initial_capital = 1000000
commission_rate = 0.001425
liquidate_at_end = yes

[strategy]
name = mfi_hunter
mfi_period = 16
buy_threshold = 35
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "symbol"), Some("2337.TW".to_string()));
        assert_eq!(adapter.get_string("strategy", "name"), Some("mfi_hunter".to_string()));
        assert_eq!(adapter.get_string("strategy", "mfi_period"), Some("16".to_string()));
        assert_eq!(adapter.get_string("backtest", "liquidate_at_end"), Some("yes".to_string()));
    }

    #[test]
    fn keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[Strategy]\nMFI_Period = 14\n").unwrap();
        assert_eq!(adapter.get_string("strategy", "mfi_period"), Some("14".to_string()));
    }

    #[test]
    fn missing_keys_are_none() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn values_are_trimmed_raw_strings() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nbuy_threshold =   low  \n").unwrap();
        assert_eq!(adapter.get_string("strategy", "buy_threshold"), Some("low".to_string()));
    }

    #[test]
    fn empty_adapter_has_no_values() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("data", "symbol"), None);
        assert_eq!(adapter.get_string("strategy", "mfi_period"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("data", "dir"), Some("data/raw".to_string()));
    }

    #[test]
    fn from_file_missing_file_is_config_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/flowtrader.ini").unwrap_err();
        assert!(matches!(err, FlowtraderError::ConfigParse { .. }));
        assert!(err.is_config());
        assert!(err.to_string().contains("flowtrader.ini"));
    }
}
