//! CLI argument definitions for the Socratic mentor application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Socratic mentor: a guiding-question chat for student project groups.
#[derive(Parser, Debug)]
#[command(name = "socratic-mentor", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the conversation database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open an interactive chat for a student group.
    Chat {
        /// Group identifier.
        #[arg(short = 'g', long = "group")]
        group: String,

        /// Project name shown to the mentor.
        #[arg(short = 'p', long = "project", default_value = "")]
        project: String,

        /// Project milestone; repeat for several.
        #[arg(short = 'm', long = "milestone")]
        milestones: Vec<String>,
    },

    /// Read-only view of a group's conversation, for teachers.
    Observe {
        /// Group identifier.
        #[arg(short = 'g', long = "group")]
        group: String,

        /// Keep polling for new messages until interrupted.
        #[arg(short = 'f', long = "follow")]
        follow: bool,

        /// Polling interval in seconds when following.
        #[arg(long = "interval-secs", default_value_t = 2)]
        interval_secs: u64,
    },

    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long = "force")]
        force: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SOCRATIC_MENTOR_CONFIG env var > ~/.socratic-mentor/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SOCRATIC_MENTOR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> PathBuf {
        match self.data_dir {
            Some(ref p) => p.clone(),
            None => expand_home(config_data_dir),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        return home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest);
    }
    PathBuf::from(path)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".socratic-mentor").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_command() {
        let args = CliArgs::parse_from([
            "socratic-mentor",
            "chat",
            "--group",
            "grupo-4",
            "--project",
            "Huerto",
            "-m",
            "Investigar",
            "-m",
            "Prototipo",
        ]);
        match args.command {
            Command::Chat {
                group,
                project,
                milestones,
            } => {
                assert_eq!(group, "grupo-4");
                assert_eq!(project, "Huerto");
                assert_eq!(milestones, vec!["Investigar", "Prototipo"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from([
            "socratic-mentor",
            "observe",
            "-g",
            "grupo-4",
            "--follow",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.resolve_log_level("info"), "debug");
        assert!(matches!(
            args.command,
            Command::Observe {
                follow: true,
                interval_secs: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_config_flag_wins() {
        let args = CliArgs::parse_from(["socratic-mentor", "-c", "/tmp/m.toml", "init-config"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/m.toml"));
    }

    #[test]
    fn test_data_dir_override() {
        let args = CliArgs::parse_from(["socratic-mentor", "--data-dir", "/srv/m", "init-config"]);
        assert_eq!(args.resolve_data_dir("~/.socratic-mentor/data"), PathBuf::from("/srv/m"));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/lib/mentor"), PathBuf::from("/var/lib/mentor"));
    }
}
