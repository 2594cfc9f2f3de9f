//! INI file configuration adapter.

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_string(&content).map_err(|reason| EngineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    fn parse<T: std::str::FromStr>(
        &self,
        section: &str,
        key: &str,
        kind: &str,
    ) -> Result<Option<T>, EngineError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                EngineError::invalid(section, key, format!("expected {}, got '{}'", kind, raw))
            }),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, EngineError> {
        self.parse(section, key, "an integer")
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, EngineError> {
        self.parse(section, key, "a number")
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, EngineError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => Self::parse_bool(&raw).map(Some).ok_or_else(|| {
                EngineError::invalid(section, key, format!("expected a boolean, got '{}'", raw))
            }),
        }
    }

    fn has_section(&self, section: &str) -> bool {
        self.config
            .sections()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(section))
    }
}
