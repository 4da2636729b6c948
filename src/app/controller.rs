// Bridge Controller - Coordinates state, settings and the services
//
// The controller is the single owner of state writes. It:
// - runs the connectivity probe and the two-phase account load
// - runs imports and exports on blocking tasks, one at a time
// - applies every result to the StateManager on the calling task
// - records metrics for each operation

use crate::metrics::Metrics;
use crate::models::{AccountRecord, ArchiveMetadata, BridgeSettings, Operation};
use crate::services::{
    AccountLoader, AvatarFetcher, BundleLayout, ExportReport, ImportSource, TransferError,
    TransferReport, check_connectivity, default_export_file_name, export_config, import_config,
    read_archive_metadata,
};
use crate::state::{StateChange, StateManager};
use anyhow::{Context, Result, anyhow, bail};
use camino::Utf8PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Where an import takes its configs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRequest {
    /// Another discovered account, by id
    FromAccount(String),

    /// An exported archive on disk
    FromFile(Utf8PathBuf),
}

/// Front-end agnostic controller over [`StateManager`] and the services.
///
/// # Example
/// ```ignore
/// let controller = BridgeController::new(state_manager, settings, metrics);
/// controller.load_accounts().await?;
/// controller
///     .import(&target_id, ImportRequest::FromAccount(source_id))
///     .await?;
/// ```
pub struct BridgeController {
    state_manager: Arc<StateManager>,
    settings: Arc<BridgeSettings>,
    layout: BundleLayout,
    metrics: Arc<Metrics>,
    fetch_avatars: bool,
}

impl BridgeController {
    pub fn new(
        state_manager: Arc<StateManager>,
        settings: Arc<BridgeSettings>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let layout = BundleLayout::from_settings(&settings);
        Self {
            state_manager,
            settings,
            layout,
            metrics,
            fetch_avatars: true,
        }
    }

    /// Enable or disable avatar downloads during [`load_accounts`](Self::load_accounts).
    pub fn with_avatars(mut self, enabled: bool) -> Self {
        self.fetch_avatars = enabled;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state_manager
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    fn apply(&self, changes: Vec<StateChange>) {
        for change in &changes {
            tracing::debug!("State change: {:?}", change);
        }
        if !changes.is_empty() {
            self.metrics.record_state_update();
        }
    }

    /// Probe connectivity and record the result. Never fails.
    pub async fn check_connectivity(&self) -> bool {
        let online = check_connectivity(
            &self.settings.connectivity_url,
            self.settings.connectivity_timeout(),
        )
        .await;

        self.apply(self.state_manager.set_online(online));
        online
    }

    /// Discover and enrich accounts, then publish them to the state.
    ///
    /// # Returns
    /// The number of accounts found (zero is not an error)
    pub async fn load_accounts(&self) -> Result<usize> {
        self.begin(Operation::LoadAccounts)?;

        let mut loader = AccountLoader::new(Arc::clone(&self.settings), Arc::clone(&self.metrics));
        if self.fetch_avatars {
            match AvatarFetcher::new(&self.settings) {
                Ok(fetcher) => loader = loader.with_avatars(Arc::new(fetcher)),
                Err(e) => tracing::warn!("Avatars disabled: {:#}", e),
            }
        }

        let loaded = match loader.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.apply(self.state_manager.finish_operation(Err(format!("{:#}", e))));
                return Err(e);
            }
        };

        let count = loaded.accounts.len();
        self.apply(self.state_manager.set_accounts(loaded));

        let summary = self.state_manager.read(|s| s.accounts_summary());
        self.apply(self.state_manager.finish_operation(Ok(summary)));

        Ok(count)
    }

    /// Look up a loaded account by id.
    pub fn account(&self, account_id: &str) -> Result<AccountRecord> {
        self.state_manager
            .read(|s| s.find_account(account_id).cloned())
            .ok_or_else(|| anyhow!("Unknown account: {}", account_id))
    }

    /// Replace `target_id`'s configs with those from `request`.
    pub async fn import(&self, target_id: &str, request: ImportRequest) -> Result<TransferReport> {
        let target = self.account(target_id)?;

        let source = match request {
            ImportRequest::FromAccount(source_id) => {
                if source_id == target.id {
                    bail!("Cannot import account {} into itself", source_id);
                }
                let source_root = self.state_manager.read(|s| {
                    s.import_sources_for(&target.id)
                        .into_iter()
                        .find(|a| a.id == source_id)
                        .map(|a| a.root_path.clone())
                });
                ImportSource::Account(
                    source_root.ok_or_else(|| anyhow!("Unknown account: {}", source_id))?,
                )
            }
            ImportRequest::FromFile(path) => ImportSource::Archive(path),
        };

        self.begin(Operation::Import)?;
        self.apply(self.state_manager.select_account(Some(&target.id)));
        tracing::info!("Importing into {} ({}) from {}", target.display_name, target.id, source.path());

        let layout = self.layout.clone();
        let target_root = target.root_path.clone();
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || import_config(&target_root, &source, &layout))
            .await
            .context("Import task failed");

        let result = flatten(result);
        self.metrics.record_import(result.is_ok(), started.elapsed());

        self.finish(result, |report| {
            format!(
                "Config imported into {} ({} file(s))",
                target.display_name, report.files_copied
            )
        })
    }

    /// Export `account_id`'s configs to `destination`, or to the default
    /// file name in the working directory.
    pub async fn export(
        &self,
        account_id: &str,
        destination: Option<Utf8PathBuf>,
    ) -> Result<ExportReport> {
        let account = self.account(account_id)?;
        let destination = destination
            .unwrap_or_else(|| Utf8PathBuf::from(default_export_file_name(&account.display_name)));

        self.begin(Operation::Export)?;
        self.apply(self.state_manager.select_account(Some(&account.id)));

        let metadata = ArchiveMetadata::new(&account.display_name, &account.id);
        let layout = self.layout.clone();
        let account_root = account.root_path.clone();
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            export_config(&account_root, &destination, &metadata, &layout)
        })
        .await
        .context("Export task failed");

        let result = flatten(result);
        self.metrics.record_export(result.is_ok(), started.elapsed());

        self.finish(result, |report| format!("Config exported to {}", report.destination))
    }

    /// Read an archive's metadata without touching any account.
    pub async fn inspect(&self, archive: Utf8PathBuf) -> Result<Option<ArchiveMetadata>> {
        let metadata = tokio::task::spawn_blocking(move || read_archive_metadata(&archive))
            .await
            .context("Inspect task failed")??;
        Ok(metadata)
    }

    fn begin(&self, operation: Operation) -> Result<()> {
        if !self.state_manager.try_begin_operation(operation) {
            bail!("Another operation is already running");
        }
        self.apply(vec![StateChange::OperationStarted { operation }]);
        Ok(())
    }

    fn finish<T>(&self, result: Result<T>, describe: impl FnOnce(&T) -> String) -> Result<T> {
        let outcome = match &result {
            Ok(value) => Ok(describe(value)),
            Err(e) => Err(format!("{:#}", e)),
        };
        self.apply(self.state_manager.finish_operation(outcome));
        result
    }
}

fn flatten<T>(joined: Result<Result<T, TransferError>>) -> Result<T> {
    joined?.map_err(anyhow::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> BridgeController {
        let settings = BridgeSettings::with_userdata_root("/definitely/not/steam/userdata");
        BridgeController::new(
            Arc::new(StateManager::new()),
            Arc::new(settings),
            Arc::new(Metrics::new()),
        )
        .with_avatars(false)
    }

    #[tokio::test]
    async fn test_load_without_steam() {
        let controller = controller();

        let count = controller.load_accounts().await.unwrap();

        assert_eq!(count, 0);
        let state = controller.state().snapshot();
        assert!(state.accounts_loaded);
        assert!(!state.is_busy());
        assert_eq!(state.status_message, "Steam folder not found");
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let controller = controller();
        controller.load_accounts().await.unwrap();

        let err = controller
            .export("12345", Some(Utf8PathBuf::from("out.cbd2")))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unknown account"));
        assert!(!controller.state().read(|s| s.is_busy()));
    }

    #[tokio::test]
    async fn test_state_updates_counted_once_per_batch() {
        let metrics = Arc::new(Metrics::new());
        let controller = BridgeController::new(
            Arc::new(StateManager::new()),
            Arc::new(BridgeSettings::with_userdata_root("/definitely/not/steam/userdata")),
            Arc::clone(&metrics),
        )
        .with_avatars(false);

        controller.load_accounts().await.unwrap();

        // started, accounts loaded, finished
        assert_eq!(
            metrics
                .state_updates
                .load(std::sync::atomic::Ordering::Relaxed),
            3
        );
    }

    #[tokio::test]
    async fn test_busy_controller_rejects_operation() {
        let controller = controller();
        controller.state().try_begin_operation(Operation::Export);

        assert!(controller.load_accounts().await.is_err());
    }
}
