//! Where the service description comes from.

use std::path::{Path, PathBuf};

use eventsync_core::config::ConfigFormat;

/// Source of the service description document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file on disk. TOML when the extension is `.toml`, JSON otherwise.
    File(PathBuf),
    /// A JSON document passed inline, usually through `EVENTSYNC_CONFIG`.
    Inline(String),
}

impl ConfigSource {
    pub fn format(&self) -> ConfigFormat {
        match self {
            ConfigSource::File(path) => format_for_path(path),
            ConfigSource::Inline(_) => ConfigFormat::Json,
        }
    }

    /// Read the raw document.
    pub fn read(&self) -> std::io::Result<String> {
        match self {
            ConfigSource::File(path) => std::fs::read_to_string(path),
            ConfigSource::Inline(raw) => Ok(raw.clone()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Inline(_) => "EVENTSYNC_CONFIG".to_string(),
        }
    }
}

fn format_for_path(path: &Path) -> ConfigFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
        _ => ConfigFormat::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        let cases = [
            ("service.toml", ConfigFormat::Toml),
            ("/etc/eventsync/SERVICE.TOML", ConfigFormat::Toml),
            ("service.json", ConfigFormat::Json),
            ("service", ConfigFormat::Json),
        ];
        for (path, expected) in cases {
            assert_eq!(ConfigSource::File(path.into()).format(), expected, "{path}");
        }
        assert_eq!(
            ConfigSource::Inline("{}".to_string()).format(),
            ConfigFormat::Json
        );
    }

    #[test]
    fn test_inline_source_reads_itself() {
        let source = ConfigSource::Inline("{\"serviceName\":\"a\"}".to_string());
        assert_eq!(source.read().unwrap(), "{\"serviceName\":\"a\"}");
        assert_eq!(source.describe(), "EVENTSYNC_CONFIG");
    }
}
