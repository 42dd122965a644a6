use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::model::{
    ActingIdentity, Id, Manager, NewManager, NewTracker, Page, PageRequest, Tracker,
    TrackerChanges,
};
use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::{authorize_owner, check_version, ManagerStore, TrackerStore};

#[derive(Debug, Default)]
struct Tables {
    managers: BTreeMap<Id, Manager>,
    trackers: BTreeMap<Id, Tracker>,
    next_manager_id: Id,
    next_tracker_id: Id,
}

/// Process-local store with the same constraints as the PostgreSQL schema.
/// Ids are assigned sequentially from 1 per table.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ManagerStore for InMemoryStore {
    async fn save_manager(&self, manager: NewManager) -> StoreResult<Manager> {
        let mut tables = self.tables.write();

        if tables.managers.values().any(|m| m.name == manager.name) {
            return Err(StoreError::DuplicateManager(manager.name));
        }

        tables.next_manager_id += 1;
        let saved = Manager {
            id: tables.next_manager_id,
            password_hash: manager.password_hash(),
            name: manager.name,
            roles: manager.roles,
        };
        tables.managers.insert(saved.id, saved.clone());

        Ok(saved)
    }

    async fn find_manager(&self, id: Id) -> StoreResult<Option<Manager>> {
        Ok(self.tables.read().managers.get(&id).cloned())
    }

    async fn find_manager_by_name(&self, name: &str) -> StoreResult<Option<Manager>> {
        Ok(self
            .tables
            .read()
            .managers
            .values()
            .find(|m| m.name == name)
            .cloned())
    }

    async fn list_managers(&self) -> StoreResult<Vec<Manager>> {
        Ok(self.tables.read().managers.values().cloned().collect())
    }

    async fn count_managers(&self) -> StoreResult<u64> {
        Ok(self.tables.read().managers.len() as u64)
    }
}

#[async_trait::async_trait]
impl TrackerStore for InMemoryStore {
    async fn save_tracker(
        &self,
        acting: &ActingIdentity,
        tracker: NewTracker,
    ) -> StoreResult<Tracker> {
        authorize_owner(acting, &tracker.manager)?;

        let mut tables = self.tables.write();

        // Foreign key on trackers.manager_id
        match tables.managers.get(&tracker.manager.id) {
            Some(owner) if owner.name == tracker.manager.name => {}
            _ => return Err(StoreError::ManagerNotFound(tracker.manager.id)),
        }

        tables.next_tracker_id += 1;
        let now = Utc::now();
        let saved = Tracker {
            id: tables.next_tracker_id,
            customer_name: tracker.customer_name,
            product_name: tracker.product_name,
            current_status: tracker.current_status,
            manager: tracker.manager,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        tables.trackers.insert(saved.id, saved.clone());

        Ok(saved)
    }

    async fn find_tracker(&self, id: Id) -> StoreResult<Option<Tracker>> {
        Ok(self.tables.read().trackers.get(&id).cloned())
    }

    async fn list_trackers(&self, request: PageRequest) -> StoreResult<Page<Tracker>> {
        let request = request.normalized();
        let tables = self.tables.read();

        let items = tables
            .trackers
            .values()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, request, tables.trackers.len() as u64))
    }

    async fn count_trackers(&self) -> StoreResult<u64> {
        Ok(self.tables.read().trackers.len() as u64)
    }

    async fn update_tracker(
        &self,
        acting: &ActingIdentity,
        id: Id,
        expected_version: Option<i64>,
        changes: TrackerChanges,
    ) -> StoreResult<Tracker> {
        let mut tables = self.tables.write();
        let tracker = tables
            .trackers
            .get_mut(&id)
            .ok_or(StoreError::TrackerNotFound(id))?;

        authorize_owner(acting, &tracker.manager)?;
        check_version(id, expected_version, tracker.version)?;

        tracker.apply(changes);
        Ok(tracker.clone())
    }

    async fn delete_tracker(&self, acting: &ActingIdentity, id: Id) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let tracker = tables
            .trackers
            .get(&id)
            .ok_or(StoreError::TrackerNotFound(id))?;

        authorize_owner(acting, &tracker.manager)?;

        tables.trackers.remove(&id);
        Ok(())
    }
}
