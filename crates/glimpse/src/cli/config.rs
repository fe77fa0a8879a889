//! The `glimpse config` command for configuration management.

use clap::{Args, Subcommand};
use glimpse_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration (environment overrides applied)
    Show {
        /// Print the session secret instead of redacting it
        #[arg(long)]
        reveal_secret: bool,
    },

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

const REDACTED: &str = "<redacted>";

/// Execute the config command.
pub async fn execute(args: ConfigArgs, mut config: Config) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { reveal_secret } => {
            config.apply_env_overrides();
            if !reveal_secret {
                redact(&mut config);
            }
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::default().to_toml()?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
            println!("Set session.secret (or GLIMPSE_SESSION_SECRET) before serving.");
        }
    }

    Ok(())
}

fn redact(config: &mut Config) {
    config.session.secret = REDACTED.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_redacts_secret() {
        let mut config = Config::default();
        config.session.secret = "hunter2".into();
        redact(&mut config);

        let toml = config.to_toml().unwrap();
        assert!(!toml.contains("hunter2"));
        assert!(toml.contains(REDACTED));
    }
}
