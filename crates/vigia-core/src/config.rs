//! Daemon configuration types.
//!
//! Configuration is validated at load time, with defaults matching the
//! fixed locations the daemon has always used.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::error::{DaemonError, Result};

/// Top-level configuration for the daemon and its service loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VigiaConfig {
    /// Pid file recording the running daemon.
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// Replacement for fd 0 (opened read-only).
    #[serde(default = "default_null")]
    pub stdin: PathBuf,

    /// Replacement for fd 1 (opened for append).
    #[serde(default = "default_log_file")]
    pub stdout: PathBuf,

    /// Replacement for fd 2 (opened for append).
    #[serde(default = "default_log_file")]
    pub stderr: PathBuf,

    /// HTTP service loop settings.
    #[serde(default)]
    pub serve: ServeConfig,
}

fn default_pid_file() -> PathBuf {
    PathBuf::from("/tmp/daemon.pid")
}

fn default_null() -> PathBuf {
    PathBuf::from("/dev/null")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/tmp/daemon.log")
}

impl Default for VigiaConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            stdin: default_null(),
            stdout: default_log_file(),
            stderr: default_log_file(),
            serve: ServeConfig::default(),
        }
    }
}

impl VigiaConfig {
    /// Validates the configuration.
    ///
    /// The daemon changes its working directory to `/` before it opens any of
    /// these paths, so relative paths are refused outright.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        require_absolute("pid_file", &self.pid_file)?;
        require_absolute("stdin", &self.stdin)?;
        require_absolute("stdout", &self.stdout)?;
        require_absolute("stderr", &self.stderr)?;
        self.serve.validate()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DaemonError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DaemonError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Static-file HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Directory served over HTTP.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Address to bind.
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_root() -> PathBuf {
    PathBuf::from("/home")
}

const fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ServeConfig {
    /// Socket address the server listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Validates the serve settings.
    ///
    /// # Errors
    /// Returns an error if the root is relative or the port is zero.
    pub fn validate(&self) -> Result<()> {
        require_absolute("serve.root", &self.root)?;
        if self.port == 0 {
            return Err(DaemonError::config("serve.port must be greater than 0"));
        }
        Ok(())
    }
}

fn require_absolute(field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(DaemonError::config(format!("{field} cannot be empty")));
    }
    if !path.is_absolute() {
        return Err(DaemonError::config(format!(
            "{field} must be an absolute path, got {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_locations() {
        let config = VigiaConfig::default();
        assert_eq!(config.pid_file, Path::new("/tmp/daemon.pid"));
        assert_eq!(config.stdin, Path::new("/dev/null"));
        assert_eq!(config.stdout, Path::new("/tmp/daemon.log"));
        assert_eq!(config.stderr, Path::new("/tmp/daemon.log"));
        assert_eq!(config.serve.root, Path::new("/home"));
        assert_eq!(config.serve.addr().to_string(), "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = VigiaConfig::from_toml("").unwrap();
        assert_eq!(config, VigiaConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = VigiaConfig::from_toml(
            r#"
            pid_file = "/run/vigia.pid"
            stderr = "/var/log/vigia.err"

            [serve]
            root = "/srv/www"
            bind = "127.0.0.1"
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.pid_file, Path::new("/run/vigia.pid"));
        assert_eq!(config.stdout, Path::new("/tmp/daemon.log"));
        assert_eq!(config.stderr, Path::new("/var/log/vigia.err"));
        assert_eq!(config.serve.root, Path::new("/srv/www"));
        assert_eq!(config.serve.addr().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn test_relative_pid_file_rejected() {
        let err = VigiaConfig::from_toml(r#"pid_file = "daemon.pid""#).unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
        assert!(err.to_string().contains("pid_file"));
    }

    #[test]
    fn test_empty_stdout_rejected() {
        let config = VigiaConfig {
            stdout: PathBuf::new(),
            ..VigiaConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stdout cannot be empty"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = VigiaConfig::from_toml("[serve]\nport = 0\n").unwrap_err();
        assert!(err.to_string().contains("serve.port"));
    }

    #[test]
    fn test_relative_root_rejected() {
        let err = VigiaConfig::from_toml("[serve]\nroot = \"public\"\n").unwrap_err();
        assert!(err.to_string().contains("serve.root"));
    }

    #[test]
    fn test_unparsable_toml_is_config_error() {
        let err = VigiaConfig::from_toml("pid_file = [").unwrap_err();
        assert!(err.to_string().starts_with("configuration error: failed to parse"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VigiaConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigia.toml");
        std::fs::write(&path, "[serve]\nport = 8181\n").unwrap();

        let config = VigiaConfig::load(&path).unwrap();
        assert_eq!(config.serve.port, 8181);
    }
}
