//! Persist a [`Config`] tree to a re-loadable file

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{Config, ConfigError, ConfigValue, Result};

/// Writes one configuration to one file.
///
/// Both the filename and the config may be supplied up front or per call;
/// per-call values take precedence and do not replace the stored ones.
#[derive(Debug, Clone, Default)]
pub struct ConfigWriter {
    filename: Option<PathBuf>,
    config: Option<Config>,
    exclusive_lock: bool,
}

impl ConfigWriter {
    pub fn new() -> Self {
        ConfigWriter::default()
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Write through a temporary sibling and rename it into place
    pub fn with_exclusive_lock(mut self, exclusive_lock: bool) -> Self {
        self.exclusive_lock = exclusive_lock;
        self
    }

    pub fn set_filename(&mut self, filename: impl Into<PathBuf>) {
        self.filename = Some(filename.into());
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = Some(config);
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Write the stored config to the stored filename
    pub fn write(&self) -> Result<()> {
        self.write_with(None, None)
    }

    /// Write, overriding the stored filename and/or config for this call
    pub fn write_with(&self, filename: Option<&Path>, config: Option<&Config>) -> Result<()> {
        let path = filename
            .or(self.filename.as_deref())
            .ok_or(ConfigError::NoFilename)?;
        let config = config.or(self.config.as_ref()).ok_or(ConfigError::NoConfig)?;

        let rendered = render(config)?;

        if self.exclusive_lock {
            write_replacing(path, &rendered)?;
        } else {
            fs::write(path, rendered.as_bytes()).map_err(|source| not_writable(path, source))?;
        }

        debug!(
            path = %path.display(),
            entries = config.len(),
            exclusive = self.exclusive_lock,
            "Wrote config"
        );
        Ok(())
    }
}

/// Serialized form of `config`, exactly as [`ConfigWriter`] persists it.
///
/// NaN and infinities are refused: JSON has no spelling for them and they
/// would come back as `null`.
pub fn render(config: &Config) -> Result<String> {
    check_finite(config, "")?;
    let mut text = serde_json::to_string_pretty(config)?;
    text.push('\n');
    Ok(text)
}

fn check_finite(config: &Config, prefix: &str) -> Result<()> {
    for (key, value) in config.iter() {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            ConfigValue::Float(f) if !f.is_finite() => {
                return Err(ConfigError::NonFiniteFloat { key: path })
            }
            ConfigValue::Section(section) => check_finite(section, &path)?,
            _ => {}
        }
    }
    Ok(())
}

fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|source| not_writable(path, source))?;
    temp.write_all(contents.as_bytes())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|source| not_writable(path, source))?;
    temp.persist(path)
        .map_err(|err| not_writable(path, err.error))?;
    Ok(())
}

fn not_writable(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::NotWritable {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_is_checked_before_config() {
        let err = ConfigWriter::new().write().unwrap_err();
        assert!(matches!(err, ConfigError::NoFilename));
    }

    #[test]
    fn test_override_does_not_stick() {
        let dir = tempfile::tempdir().unwrap();
        let stored = dir.path().join("stored.json");
        let other = dir.path().join("other.json");

        let writer = ConfigWriter::new()
            .with_filename(&stored)
            .with_config(Config::new().with("test", "foo"));

        writer.write_with(Some(&other), None).unwrap();
        assert!(other.exists());
        assert!(!stored.exists());
        assert_eq!(writer.filename(), Some(stored.as_path()));
    }

    #[test]
    fn test_non_finite_floats_are_refused() {
        let nested = Config::new().with("db", Config::new().with("ratio", f64::NAN));
        let err = render(&nested).unwrap_err();
        assert!(matches!(err, ConfigError::NonFiniteFloat { ref key } if key == "db.ratio"));

        assert!(render(&Config::new().with("limit", f64::INFINITY)).is_err());
        assert!(render(&Config::new().with("limit", f64::MAX)).is_ok());
    }

    #[test]
    fn test_render_is_pretty_json() {
        let text = render(&Config::new().with("test", "foo")).unwrap();
        assert_eq!(text, "{\n  \"test\": \"foo\"\n}\n");
    }
}
