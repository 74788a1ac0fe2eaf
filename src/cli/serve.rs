//! `perplan serve`: run the distribution server.

use crate::cli::CliConfig;
use crate::server;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Directory holding the published version and packages
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// URL clients use to reach this server
    #[arg(long, value_name = "URL")]
    public_url: Option<String>,

    /// Version to report before the first upload
    #[arg(long, value_name = "V")]
    initial_version: Option<String>,
}

impl ServeCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut config = cli.load_global().await?.server;
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }
        if let Some(url) = self.public_url {
            config.public_url = url;
        }
        if let Some(version) = self.initial_version {
            config.initial_version = version;
        }

        if cli.log_level.is_some() {
            println!(
                "{} on {} (public URL {})",
                "PERPLAN update server".green().bold(),
                config.bind,
                config.public_url
            );
        }
        server::serve(&config).await
    }
}
