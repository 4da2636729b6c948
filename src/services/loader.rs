//! Two-phase account loading.
//!
//! 1. Discovery runs on a blocking task and yields immutable
//!    [`DiscoveredAccount`]s.
//! 2. Each account gets its own task that reads the save file and downloads
//!    the avatar, then sends an [`AccountEnrichment`] back over a channel.
//!
//! The caller awaits [`AccountLoader::load`], which joins every task
//! (successes and failures alike) before merging the results into
//! [`AccountRecord`]s. Tasks share nothing mutable; a failed or panicked
//! task only costs its own account its name and avatar.

use crate::metrics::Metrics;
use crate::models::{AccountEnrichment, AccountRecord, BridgeSettings, DiscoveredAccount};
use crate::services::avatar::AvatarFetcher;
use crate::services::discovery::discover_accounts;
use crate::services::save_file::{AccountProfile, read_profile};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result of one load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedAccounts {
    pub userdata_root: Option<Utf8PathBuf>,
    pub accounts: Vec<AccountRecord>,
}

#[derive(Clone)]
pub struct AccountLoader {
    settings: Arc<BridgeSettings>,
    fetcher: Option<Arc<AvatarFetcher>>,
    metrics: Arc<Metrics>,
}

impl AccountLoader {
    /// Loader without avatar downloads.
    pub fn new(settings: Arc<BridgeSettings>, metrics: Arc<Metrics>) -> Self {
        Self {
            settings,
            fetcher: None,
            metrics,
        }
    }

    pub fn with_avatars(mut self, fetcher: Arc<AvatarFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Discover accounts and enrich them concurrently.
    pub async fn load(&self) -> Result<LoadedAccounts> {
        let settings = Arc::clone(&self.settings);
        let discovery = tokio::task::spawn_blocking(move || discover_accounts(&settings))
            .await
            .context("Account discovery task failed")?;

        self.metrics
            .record_accounts_discovered(discovery.accounts.len());

        let enrichments = self.enrich_all(&discovery.accounts).await;
        let accounts = merge(discovery.accounts, enrichments);

        tracing::info!("Loaded {} account(s)", accounts.len());

        Ok(LoadedAccounts {
            userdata_root: discovery.userdata_root,
            accounts,
        })
    }

    /// Run one enrichment task per account and collect every result.
    pub async fn enrich_all(&self, accounts: &[DiscoveredAccount]) -> Vec<AccountEnrichment> {
        if accounts.is_empty() {
            return Vec::new();
        }

        // capacity covers every send, so no task blocks before the join
        let (tx, mut rx) = mpsc::channel(accounts.len());
        let mut tasks = Vec::with_capacity(accounts.len());

        for account in accounts {
            let tx = tx.clone();
            let account = account.clone();
            let settings = Arc::clone(&self.settings);
            let fetcher = self.fetcher.clone();
            let metrics = Arc::clone(&self.metrics);

            let task = tokio::spawn(async move {
                let enrichment =
                    enrich_account(account, &settings, fetcher.as_deref(), &metrics).await;
                let _ = tx.send(enrichment).await;
            });
            tasks.push(task);
        }
        drop(tx);

        // wait for every task, failed ones included
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("Account loader task failed: {}", e);
            }
        }

        let mut enrichments = Vec::with_capacity(accounts.len());
        while let Some(enrichment) = rx.recv().await {
            enrichments.push(enrichment);
        }
        enrichments
    }
}

/// Save-file lookup plus avatar download for one account.
pub async fn enrich_account(
    account: DiscoveredAccount,
    settings: &BridgeSettings,
    fetcher: Option<&AvatarFetcher>,
    metrics: &Metrics,
) -> AccountEnrichment {
    let save_file = account.save_file.clone();
    let id = account.id.clone();
    let profile = tokio::task::spawn_blocking(move || read_profile(&save_file, &id))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Save file task for {} failed: {}", account.id, e);
            AccountProfile::fallback(&account.id)
        });

    let avatar_path = match (fetcher, profile.avatar_id.as_deref()) {
        (Some(fetcher), Some(hash)) => {
            let url = settings.avatar_url(hash);
            let path = fetcher.fetch(url.as_deref(), &account.id).await;
            metrics.record_avatar(path.is_some());
            path
        }
        _ => None,
    };

    AccountEnrichment {
        id: account.id,
        display_name: profile.display_name,
        avatar_path,
    }
}

/// Merge enrichments into records, keeping discovery order.
pub fn merge(
    accounts: Vec<DiscoveredAccount>,
    enrichments: Vec<AccountEnrichment>,
) -> Vec<AccountRecord> {
    let mut by_id: HashMap<String, AccountEnrichment> = enrichments
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();

    accounts
        .into_iter()
        .map(|account| {
            let enrichment = by_id.remove(&account.id);
            AccountRecord::merge(account, enrichment)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(id: &str) -> DiscoveredAccount {
        DiscoveredAccount {
            id: id.to_string(),
            config_root: Utf8PathBuf::from(format!("/userdata/{}/570", id)),
            save_file: Utf8PathBuf::from(format!("/userdata/{}/config/localconfig.vdf", id)),
        }
    }

    #[test]
    fn test_merge_keeps_discovery_order() {
        let accounts = vec![discovered("1"), discovered("2"), discovered("3")];
        let enrichments = vec![
            AccountEnrichment {
                id: "3".to_string(),
                display_name: "Three".to_string(),
                avatar_path: None,
            },
            AccountEnrichment {
                id: "1".to_string(),
                display_name: "One".to_string(),
                avatar_path: None,
            },
        ];

        let records = merge(accounts, enrichments);
        let names: Vec<_> = records.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["One", "User 2", "Three"]);
    }

    #[tokio::test]
    async fn test_enrich_without_save_file_falls_back() {
        let metrics = Metrics::new();
        let enrichment = enrich_account(
            discovered("77"),
            &BridgeSettings::default(),
            None,
            &metrics,
        )
        .await;

        assert_eq!(enrichment.display_name, "User 77");
        assert_eq!(enrichment.avatar_path, None);
    }
}
