//! The `glimpse serve` command.

use std::path::PathBuf;

use clap::Args;
use glimpse_core::Config;

use crate::server;

/// Arguments for the `serve` command.
///
/// Flags override the config file; the database URL and session secret can
/// also come from the environment.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Account database URL (e.g. sqlite://glimpse.db)
    #[arg(long, env = "GLIMPSE_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Secret used to sign session cookies
    #[arg(long, env = "GLIMPSE_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Directory uploaded images are saved to
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Directory holding the backbone, decoder and tokenizer
    #[arg(long)]
    pub model_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Layer command-line values over the loaded configuration.
    pub fn apply_to(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(secret) = self.session_secret {
            config.session.secret = secret;
        }
        if let Some(dir) = self.upload_dir {
            config.server.upload_dir = dir;
        }
        if let Some(dir) = self.model_dir {
            config.general.model_dir = dir;
        }
    }
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    config.apply_env_overrides();
    args.apply_to(&mut config);
    config.validate()?;

    if config.session.uses_default_secret() {
        tracing::warn!(
            "Using the built-in session secret. Set GLIMPSE_SESSION_SECRET or session.secret \
             before exposing this server."
        );
    }

    server::run(config).await
}
