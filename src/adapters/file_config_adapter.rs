//! INI file configuration adapter.

use crate::domain::error::ScalperError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
    source: String,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScalperError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Ini::new();
        config
            .read(content)
            .map_err(|reason| ScalperError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self {
            config,
            source: path.display().to_string(),
        })
    }

    pub fn from_string(content: &str) -> Result<Self, ScalperError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ScalperError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self {
            config,
            source: "<string>".to_string(),
        })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn source(&self) -> String {
        self.source.clone()
    }
}
