//! Configuration file management for summerjob.
//!
//! Provides a TOML-based config file at `~/.config/summerjob/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use summerjob_core::adoration::{AdjacencyConfig, DEFAULT_WINDOW_MINUTES, NeighborDedup};
use summerjob_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub adoration: AdorationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdorationSection {
    /// Gap in minutes within which two slots count as adjacent.
    #[serde(default = "default_window")]
    pub neighbor_window_minutes: i64,
    /// Collapse neighbors by worker ID instead of by name.
    #[serde(default)]
    pub dedup_by_identity: bool,
}

fn default_window() -> i64 {
    DEFAULT_WINDOW_MINUTES
}

impl Default for AdorationSection {
    fn default() -> Self {
        Self {
            neighbor_window_minutes: DEFAULT_WINDOW_MINUTES,
            dedup_by_identity: false,
        }
    }
}

impl AdorationSection {
    pub fn adjacency(&self) -> AdjacencyConfig {
        AdjacencyConfig {
            window_minutes: self.neighbor_window_minutes.max(0),
            dedup: if self.dedup_by_identity {
                NeighborDedup::ByIdentity
            } else {
                NeighborDedup::ByName
            },
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the summerjob config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/summerjob` or
/// `~/.config/summerjob`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("summerjob");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("summerjob")
}

/// Return the path to the summerjob config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The URL may embed a password.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct SummerJobConfig {
    pub db_config: DbConfig,
    pub adjacency: AdjacencyConfig,
}

impl SummerJobConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `SUMMERJOB_DATABASE_URL` env > `config_file.database.url` > `DbConfig::DEFAULT_URL`
    /// - Adoration neighbors: `[adoration]` section of the config file, else defaults
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("SUMMERJOB_DATABASE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let mut db_config = DbConfig::from_env();
        db_config.database_url = db_url;

        let adjacency = file_config
            .as_ref()
            .map(|cfg| cfg.adoration.adjacency())
            .unwrap_or_default();

        Ok(Self {
            db_config,
            adjacency,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point `XDG_CONFIG_HOME` at a fresh temp dir for the duration of `f`.
    fn with_config_home<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let out = f(tmp.path());

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        out
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        with_config_home(|home| {
            let original = ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://testhost:5432/testdb".to_string(),
                },
                adoration: AdorationSection {
                    neighbor_window_minutes: 30,
                    dedup_by_identity: true,
                },
            };
            save_config(&original).unwrap();
            assert!(home.join("summerjob/config.toml").is_file());

            let loaded = load_config().unwrap();
            assert_eq!(loaded.database.url, original.database.url);
            assert_eq!(loaded.adoration.neighbor_window_minutes, 30);
            assert!(loaded.adoration.dedup_by_identity);
        });
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        with_config_home(|_| {
            let cfg = ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://user:secret@db:5432/summerjob".to_string(),
                },
                adoration: AdorationSection::default(),
            };
            save_config(&cfg).unwrap();

            let meta = std::fs::metadata(config_path()).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        });
    }

    #[test]
    fn adoration_section_is_optional() {
        let cfg: ConfigFile = toml::from_str("[database]\nurl = \"postgresql://x/y\"\n").unwrap();
        assert_eq!(cfg.adoration.adjacency(), AdjacencyConfig::default());

        let cfg: ConfigFile = toml::from_str(
            "[database]\nurl = \"postgresql://x/y\"\n[adoration]\ndedup_by_identity = true\n",
        )
        .unwrap();
        let adjacency = cfg.adoration.adjacency();
        assert_eq!(adjacency.window_minutes, DEFAULT_WINDOW_MINUTES);
        assert_eq!(adjacency.dedup, NeighborDedup::ByIdentity);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();

        unsafe { std::env::set_var("SUMMERJOB_DATABASE_URL", "postgresql://env:5432/envdb") };
        let config = SummerJobConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
        unsafe { std::env::remove_var("SUMMERJOB_DATABASE_URL") };
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        with_config_home(|_| {
            save_config(&ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://file:5432/filedb".to_string(),
                },
                adoration: AdorationSection::default(),
            })
            .unwrap();

            unsafe { std::env::set_var("SUMMERJOB_DATABASE_URL", "postgresql://env:5432/envdb") };
            let config = SummerJobConfig::resolve(None).unwrap();
            unsafe { std::env::remove_var("SUMMERJOB_DATABASE_URL") };

            assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");

            let config = SummerJobConfig::resolve(None).unwrap();
            assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
        });
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        with_config_home(|_| {
            unsafe { std::env::remove_var("SUMMERJOB_DATABASE_URL") };
            let config = SummerJobConfig::resolve(None).unwrap();
            assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
            assert_eq!(config.adjacency, AdjacencyConfig::default());
        });
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("summerjob/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
