use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::api;
use crate::config::{AppConfig, Settings};
use crate::utils;

#[derive(Parser)]
#[clap(name = "portal")]
#[clap(version = version_string())]
#[clap(subcommand_required = true, arg_required_else_help = true)]
pub struct App {
    #[clap(subcommand)]
    cmd: Cmd,
}

impl App {
    /// `dotenv_path` is the `.env` file loaded on startup, if any.
    pub fn run(self, dotenv_path: Option<PathBuf>) -> Result<()> {
        self.cmd.run(dotenv_path)
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Start service.
    Run(CmdRun),

    /// Print the default service config.
    GenConfig,
}

impl Cmd {
    fn run(self, dotenv_path: Option<PathBuf>) -> Result<()> {
        match self {
            Cmd::Run(cmd) => cmd.run(dotenv_path),
            Cmd::GenConfig => {
                let config = serde_json::to_string_pretty(&AppConfig::default())?;
                println!("{config}");
                Ok(())
            }
        }
    }
}

#[derive(Parser)]
struct CmdRun {
    /// Path to the service config.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to the logger config.
    #[clap(short, long)]
    logger_config: Option<PathBuf>,
}

impl CmdRun {
    fn run(self, dotenv_path: Option<PathBuf>) -> Result<()> {
        let config: AppConfig = match self.config.as_ref() {
            Some(path) => {
                utils::serde::load_json_from_file(path).context("failed to load service config")?
            }
            None => AppConfig::default(),
        };

        // Fail before anything is started if the LMS is not configured.
        let settings = Settings::from_env().context("invalid LMS settings")?;

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(utils::signal::run_or_terminate(
                self.run_impl(config, settings, dotenv_path),
            ))
    }

    async fn run_impl(
        self,
        config: AppConfig,
        settings: Settings,
        dotenv_path: Option<PathBuf>,
    ) -> Result<()> {
        utils::logger::init_logger(&config.logger, self.logger_config)?;
        utils::logger::set_abort_with_tracing();

        if let Some(path) = dotenv_path {
            tracing::info!(path = %path.display(), "loaded environment file");
        }

        api::http_service(config, settings).await?;

        std::future::pending::<()>().await;

        Ok(())
    }
}

fn version_string() -> &'static str {
    static STRING: OnceLock<String> = OnceLock::new();
    STRING.get_or_init(|| format!("(release {PORTAL_VERSION}) (rustc {RUSTC_VERSION})"))
}

static PORTAL_VERSION: &str = env!("PORTAL_VERSION");
static RUSTC_VERSION: &str = env!("PORTAL_RUSTC_VERSION");
