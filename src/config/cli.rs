use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "portal-plugins")]
#[command(about = "PagerDuty service cache and TechDocs backend plugins")]
pub struct ServerArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override server.bind_address
    #[arg(long)]
    pub bind: Option<String>,

    /// Override pagerduty.api_token
    #[arg(long)]
    pub api_token: Option<String>,

    /// Override pagerduty.poll_interval_ms
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Override pagerduty.max_pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl ServerArgs {
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(token) = &self.api_token {
            config.pagerduty.api_token = Some(token.clone());
        }
        if let Some(interval) = self.poll_interval_ms {
            config.pagerduty.poll_interval_ms = interval;
        }
        if let Some(max_pages) = self.max_pages {
            config.pagerduty.max_pages = max_pages;
        }
    }
}
