use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visual_engine::VisualPolicyView;

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub policy: VisualPolicyView,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/visualcheck.yaml > ~/.config/visualcheck/config.yaml
            let local_config = PathBuf::from("config/visualcheck.yaml");
            if local_config.exists() {
                local_config
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("visualcheck");
                path.push("config.yaml");
                path
            }
        }
    };

    if !config_path.exists() {
        warn!(path = %config_path.display(), "Config file not found, using default visual policy");
        return Ok(LoadedConfig {
            policy: VisualPolicyView::default(),
            path: config_path,
        });
    }

    let content = fs::read_to_string(&config_path)
        .await
        .context("Failed to read config file")?;
    let policy: VisualPolicyView =
        serde_yaml::from_str(&content).context("Failed to parse config file")?;
    // reject a bad default DPR before any capture runs
    policy
        .default_parameters()
        .validate()
        .with_context(|| format!("Invalid visual policy in {}", config_path.display()))?;

    info!(
        path = %config_path.display(),
        strategy = %policy.strategy,
        baseline_dir = %policy.baseline_dir.display(),
        "Loaded visual policy"
    );
    Ok(LoadedConfig {
        policy,
        path: config_path,
    })
}
