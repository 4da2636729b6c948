//! ConfigBridge - Copy Dota 2 configs between Steam accounts and archives
//!
//! Main entry point for the command line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and load settings from `ConfigBridge Data/`
//!    (`ConfigBridge Settings.yaml`, then `CONFIGBRIDGE_SETTINGS__*` overrides)
//! 2. Initialize logging -> logs/configbridge.<date>
//! 3. Create a multi-thread tokio runtime
//! 4. For account commands: probe connectivity and load accounts concurrently
//! 5. Run the command through [`BridgeController`]
//! 6. Log the metrics summary and shut the runtime down
//!
//! # Examples
//!
//! ```text
//! configbridge list
//! configbridge export --account 12345678
//! configbridge import --target 87654321 --from-file dota2_config_Friend.cbd2
//! configbridge import --target 87654321 --from-account 12345678
//! ```

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{ArgGroup, Parser, Subcommand};
use configbridge::logging::{LOG_PREFIX, setup_logging};
use configbridge::services::TransferError;
use configbridge::{
    APP_NAME, BridgeController, ConfigManager, ImportRequest, Metrics, StateManager, UserConfig,
    VERSION,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "configbridge", version, about = "Copy Dota 2 configs between Steam accounts")]
struct Cli {
    /// Directory holding "ConfigBridge Settings.yaml"
    #[arg(long, global = true, default_value = "ConfigBridge Data")]
    config_dir: Utf8PathBuf,

    /// Use this Steam userdata directory instead of the platform defaults
    #[arg(long, global = true)]
    userdata: Option<Utf8PathBuf>,

    /// Debug-level logging
    #[arg(long, global = true)]
    debug: bool,

    /// Skip avatar downloads
    #[arg(long, global = true)]
    no_avatars: bool,

    /// Skip the connectivity check
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List accounts with Dota 2 configs
    List,

    /// Replace an account's configs with another account's or an archive's
    #[command(group(ArgGroup::new("source").required(true).args(["from_account", "from_file"])))]
    Import {
        /// Account receiving the configs
        #[arg(long)]
        target: String,

        /// Account to copy from
        #[arg(long)]
        from_account: Option<String>,

        /// Archive (.cbd2 or .zip) to copy from
        #[arg(long)]
        from_file: Option<Utf8PathBuf>,
    },

    /// Package an account's configs into an archive
    Export {
        #[arg(long)]
        account: String,

        /// Output file (default: dota2_config_<name>.cbd2)
        #[arg(long)]
        output: Option<Utf8PathBuf>,
    },

    /// Show an archive's metadata
    Inspect { archive: Utf8PathBuf },

    /// Print the effective settings
    Settings {
        /// Write the settings file with defaults filled in. Command line and
        /// environment overrides are not saved.
        #[arg(long)]
        write: bool,
    },
}

impl Command {
    fn needs_accounts(&self) -> bool {
        matches!(
            self,
            Command::List | Command::Import { .. } | Command::Export { .. }
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let mut settings = config_manager.load_settings()?;
    if let Some(root) = &cli.userdata {
        settings.steam_userdata_paths = vec![root.clone()];
    }
    settings.debug_mode |= cli.debug;

    let _log_guard = setup_logging(&settings.log_dir, LOG_PREFIX, settings.debug_mode, settings.debug_mode)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("configbridge-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let metrics = Arc::new(Metrics::new());
    let controller = BridgeController::new(
        Arc::new(StateManager::new()),
        Arc::new(settings),
        Arc::clone(&metrics),
    )
    .with_avatars(!cli.no_avatars);

    let result = runtime.block_on(run(&cli, &controller, &config_manager));

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }

    metrics.log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}

async fn run(cli: &Cli, controller: &BridgeController, config_manager: &ConfigManager) -> Result<()> {
    if cli.command.needs_accounts() {
        if cli.offline {
            controller.load_accounts().await?;
        } else {
            let (online, loaded) = tokio::join!(controller.check_connectivity(), controller.load_accounts());
            loaded?;
            if !online {
                eprintln!("Warning: no internet connection, avatars unavailable");
            }
        }
    }

    match &cli.command {
        Command::List => print_accounts(controller),

        Command::Import {
            target,
            from_account,
            from_file,
        } => {
            let request = match (from_account, from_file) {
                (Some(id), _) => ImportRequest::FromAccount(id.clone()),
                (None, Some(path)) => ImportRequest::FromFile(path.clone()),
                (None, None) => anyhow::bail!("An import source is required"),
            };

            match controller.import(target, request).await {
                Ok(report) => {
                    println!(
                        "Config imported: {} file(s) in {} folder(s)",
                        report.files_copied,
                        report.replaced.len()
                    );
                    Ok(())
                }
                Err(e) => Err(explain(e)),
            }
        }

        Command::Export { account, output } => {
            let report = controller
                .export(account, output.clone())
                .await
                .map_err(explain)?;
            println!(
                "Config exported to {} ({} file(s))",
                report.destination, report.files_written
            );
            Ok(())
        }

        Command::Inspect { archive } => {
            match controller.inspect(archive.clone()).await.map_err(explain)? {
                Some(metadata) => {
                    println!("Exported by:  {} ({})", metadata.exported_by, metadata.account_id);
                    println!("Export date:  {}", metadata.export_date);
                    println!("Version:      {}", metadata.exporter_version);
                }
                None => println!("{} has no metadata", archive),
            }
            Ok(())
        }

        Command::Settings { write } => {
            let user_config = UserConfig {
                settings: controller.settings().clone(),
            };
            print!("{}", serde_yaml_ng::to_string(&user_config)?);
            if *write {
                config_manager.write_file_settings()?;
                println!("Saved to {}", config_manager.settings_path());
            }
            Ok(())
        }
    }
}

fn print_accounts(controller: &BridgeController) -> Result<()> {
    let state = controller.state().snapshot();
    println!("{}", state.accounts_summary());

    for account in &state.accounts {
        let avatar = account
            .avatar_path
            .as_ref()
            .map(|p| p.as_str())
            .unwrap_or("-");
        println!(
            "{:<12} {:<24} {:<28} {}",
            account.id, account.display_name, avatar, account.root_path
        );
    }
    Ok(())
}

/// Friendlier text for the transfer failures users can act on.
fn explain(error: anyhow::Error) -> anyhow::Error {
    let hint = match error.downcast_ref::<TransferError>() {
        Some(TransferError::InvalidArchive { path, .. }) => {
            Some(format!("{} is not a valid ConfigBridge archive", path))
        }
        Some(TransferError::NoConfigFiles(path)) => {
            Some(format!("Nothing to transfer: no config files in {}", path))
        }
        _ => None,
    };

    match hint {
        Some(hint) => error.context(hint),
        None => error,
    }
}
