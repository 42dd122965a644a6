use crate::model::{
    ActingIdentity, Id, Manager, ManagerRef, NewManager, NewTracker, Page, PageRequest, Tracker,
    TrackerChanges, ROLE_MANAGER,
};
use crate::store::error::{StoreError, StoreResult};

#[async_trait::async_trait]
pub trait ManagerStore: Send + Sync {
    /// Persist a manager; names are unique
    async fn save_manager(&self, manager: NewManager) -> StoreResult<Manager>;
    async fn find_manager(&self, id: Id) -> StoreResult<Option<Manager>>;
    async fn find_manager_by_name(&self, name: &str) -> StoreResult<Option<Manager>>;
    async fn list_managers(&self) -> StoreResult<Vec<Manager>>;
    async fn count_managers(&self) -> StoreResult<u64>;
}

/// Tracker persistence. Every write names the identity it is performed as;
/// implementations run [`authorize_owner`] before touching storage.
#[async_trait::async_trait]
pub trait TrackerStore: Send + Sync {
    async fn save_tracker(&self, acting: &ActingIdentity, tracker: NewTracker)
        -> StoreResult<Tracker>;
    async fn find_tracker(&self, id: Id) -> StoreResult<Option<Tracker>>;
    async fn list_trackers(&self, request: PageRequest) -> StoreResult<Page<Tracker>>;
    async fn count_trackers(&self) -> StoreResult<u64>;
    /// Apply `changes` if the caller owns the tracker and, when given,
    /// `expected_version` still matches
    async fn update_tracker(
        &self,
        acting: &ActingIdentity,
        id: Id,
        expected_version: Option<i64>,
        changes: TrackerChanges,
    ) -> StoreResult<Tracker>;
    async fn delete_tracker(&self, acting: &ActingIdentity, id: Id) -> StoreResult<()>;
}

pub trait Store: ManagerStore + TrackerStore + Send + Sync {}
impl<T: ManagerStore + TrackerStore + Send + Sync> Store for T {}

/// Ownership hook for tracker writes: the acting identity must be a manager
/// and must be the tracker's owner.
pub fn authorize_owner(acting: &ActingIdentity, owner: &ManagerRef) -> StoreResult<()> {
    if !acting.has_role(ROLE_MANAGER) || acting.login != owner.name {
        return Err(StoreError::Forbidden {
            login: acting.login.clone(),
            owner: owner.name.clone(),
        });
    }
    Ok(())
}

/// Optimistic locking check shared by the store implementations
pub fn check_version(id: Id, expected: Option<i64>, actual: i64) -> StoreResult<()> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::VersionConflict {
            id,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
