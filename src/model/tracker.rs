use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Id, Manager, ManagerRef};

/// A customer engagement owned by exactly one manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: Id,
    pub customer_name: String,
    pub product_name: String,
    /// Free-form status label, not validated
    pub current_status: String,
    pub manager: ManagerRef,
    /// Bumped on every successful update, exposed as the ETag
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tracker attributes before the store assigns an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTracker {
    pub customer_name: String,
    pub product_name: String,
    pub current_status: String,
    pub manager: ManagerRef,
}

impl NewTracker {
    pub fn new(
        manager: ManagerRef,
        customer_name: impl Into<String>,
        product_name: impl Into<String>,
        current_status: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            product_name: product_name.into(),
            current_status: current_status.into(),
            manager,
        }
    }

    pub fn owned_by(
        manager: &Manager,
        customer_name: impl Into<String>,
        product_name: impl Into<String>,
        current_status: impl Into<String>,
    ) -> Self {
        Self::new(
            ManagerRef::from(manager),
            customer_name,
            product_name,
            current_status,
        )
    }
}

/// Editable tracker fields. The owner never changes through an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerChanges {
    pub customer_name: String,
    pub product_name: String,
    pub current_status: String,
}

impl Tracker {
    pub(crate) fn apply(&mut self, changes: TrackerChanges) {
        self.customer_name = changes.customer_name;
        self.product_name = changes.product_name;
        self.current_status = changes.current_status;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Quoted version, suitable for `ETag` / `If-Match` headers
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.version)
    }
}
