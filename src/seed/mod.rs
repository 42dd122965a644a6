pub mod data;

pub use data::*;

use log::{error, info};
use thiserror::Error;

use crate::config::SeedConfig;
use crate::model::{ActingIdentity, Manager, NewTracker, SecurityContext, Tracker};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to create manager '{name}': {source}")]
    Manager {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to create tracker '{customer_name}' for manager '{manager}': {source}")]
    Tracker {
        manager: String,
        customer_name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read seed plan {path}: {source}")]
    PlanIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed plan {path}: {source}")]
    PlanFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SeedError {
    /// The store failure behind this error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            SeedError::Manager { source, .. } | SeedError::Tracker { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// What a successful seed run persisted, in creation order
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub managers: Vec<Manager>,
    pub trackers: Vec<Tracker>,
}

/// Populates an empty store with managers and the trackers they own.
///
/// Managers are created first. Then, for each manager in order, the seeder
/// acts as that manager and creates its trackers, so every tracker is written
/// under its owner's identity. The identity is cleared when the run ends,
/// whether it succeeded or not.
///
/// There is no rollback: a failure leaves whatever was already written. The
/// run is not idempotent either; a second run against the same store fails on
/// the first duplicate manager name. Call it once at startup, before the
/// server accepts requests.
pub struct Seeder<'a, S: Store + ?Sized> {
    store: &'a S,
    plan: SeedPlan,
    context: SecurityContext,
}

impl<'a, S: Store + ?Sized> Seeder<'a, S> {
    pub fn new(store: &'a S, plan: SeedPlan) -> Self {
        Self {
            store,
            plan,
            context: SecurityContext::new(),
        }
    }

    pub fn with_reference_data(store: &'a S) -> Self {
        Self::new(store, SeedPlan::reference())
    }

    pub fn plan(&self) -> &SeedPlan {
        &self.plan
    }

    /// The identity trackers are currently written as
    pub fn acting_identity(&self) -> Option<&ActingIdentity> {
        self.context.current()
    }

    pub async fn run(&mut self) -> Result<SeedReport, SeedError> {
        let result = self.seed().await;
        self.context.clear();

        match &result {
            Ok(report) => info!(
                "Seeded {} managers and {} trackers",
                report.managers.len(),
                report.trackers.len()
            ),
            Err(e) => error!("Seeding aborted: {}", e),
        }

        result
    }

    async fn seed(&mut self) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();

        for seed_manager in &self.plan.managers {
            let manager = self
                .store
                .save_manager(seed_manager.new_manager())
                .await
                .map_err(|source| SeedError::Manager {
                    name: seed_manager.name.clone(),
                    source,
                })?;
            report.managers.push(manager);
        }

        for (manager, seed_manager) in report.managers.iter().zip(&self.plan.managers) {
            self.context.set_identity(ActingIdentity::impersonate(manager));
            info!(
                "Seeding {} trackers as '{}'",
                seed_manager.trackers.len(),
                manager.name
            );

            for seed_tracker in &seed_manager.trackers {
                let tracker = NewTracker::owned_by(
                    manager,
                    seed_tracker.customer_name.clone(),
                    seed_tracker.product_name.clone(),
                    seed_tracker.current_status.clone(),
                );

                let saved = match self.context.current() {
                    Some(acting) => self.store.save_tracker(acting, tracker).await,
                    None => Err(StoreError::Unauthenticated),
                }
                .map_err(|source| SeedError::Tracker {
                    manager: manager.name.clone(),
                    customer_name: seed_tracker.customer_name.clone(),
                    source,
                })?;
                report.trackers.push(saved);
            }
        }

        Ok(report)
    }
}

/// Startup hook: seed the store when enabled in configuration.
/// Returns `None` when seeding is disabled.
pub async fn load_seed_data<S: Store + ?Sized>(
    store: &S,
    config: &SeedConfig,
) -> Result<Option<SeedReport>, SeedError> {
    if !config.enabled {
        return Ok(None);
    }

    let plan = match &config.plan_path {
        Some(path) => {
            info!("Loading seed plan from {}", path);
            SeedPlan::from_file(path)?
        }
        None => SeedPlan::reference(),
    };

    Seeder::new(store, plan).run().await.map(Some)
}
