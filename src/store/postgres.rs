use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::model::{
    ActingIdentity, Id, Manager, ManagerRef, NewManager, NewTracker, Page, PageRequest, Tracker,
    TrackerChanges,
};
use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::{authorize_owner, check_version, ManagerStore, TrackerStore};

const TRACKER_COLUMNS: &str = r#"
    t.id, t.customer_name, t.product_name, t.current_status, t.version,
    t.created_at, t.updated_at, m.id AS manager_id, m.name AS manager_name
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_tracker(&self, id: Id) -> StoreResult<Option<Tracker>> {
        let sql = format!(
            "SELECT {} FROM trackers t JOIN managers m ON m.id = t.manager_id WHERE t.id = $1",
            TRACKER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| tracker_from_row(&row)))
    }
}

fn manager_from_row(row: &PgRow) -> Manager {
    Manager {
        id: row.get("id"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        roles: row.get("roles"),
    }
}

fn tracker_from_row(row: &PgRow) -> Tracker {
    Tracker {
        id: row.get("id"),
        customer_name: row.get("customer_name"),
        product_name: row.get("product_name"),
        current_status: row.get("current_status"),
        manager: ManagerRef {
            id: row.get("manager_id"),
            name: row.get("manager_name"),
        },
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait::async_trait]
impl ManagerStore for PostgresStore {
    async fn save_manager(&self, manager: NewManager) -> StoreResult<Manager> {
        let row = sqlx::query(
            r#"
            INSERT INTO managers (name, password_hash, roles)
            VALUES ($1, $2, $3)
            RETURNING id, name, password_hash, roles
            "#,
        )
        .bind(&manager.name)
        .bind(manager.password_hash())
        .bind(&manager.roles)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::DuplicateManager(manager.name.clone())
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(manager_from_row(&row))
    }

    async fn find_manager(&self, id: Id) -> StoreResult<Option<Manager>> {
        let row = sqlx::query("SELECT id, name, password_hash, roles FROM managers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| manager_from_row(&row)))
    }

    async fn find_manager_by_name(&self, name: &str) -> StoreResult<Option<Manager>> {
        let row =
            sqlx::query("SELECT id, name, password_hash, roles FROM managers WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|row| manager_from_row(&row)))
    }

    async fn list_managers(&self) -> StoreResult<Vec<Manager>> {
        let rows = sqlx::query("SELECT id, name, password_hash, roles FROM managers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(manager_from_row).collect())
    }

    async fn count_managers(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM managers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait::async_trait]
impl TrackerStore for PostgresStore {
    async fn save_tracker(
        &self,
        acting: &ActingIdentity,
        tracker: NewTracker,
    ) -> StoreResult<Tracker> {
        authorize_owner(acting, &tracker.manager)?;

        // The owner reference must name an existing manager by id and name
        let owner_id: Option<Id> =
            sqlx::query_scalar("SELECT id FROM managers WHERE id = $1 AND name = $2")
                .bind(tracker.manager.id)
                .bind(&tracker.manager.name)
                .fetch_optional(&self.pool)
                .await?;
        if owner_id.is_none() {
            return Err(StoreError::ManagerNotFound(tracker.manager.id));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO trackers (customer_name, product_name, current_status, manager_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, customer_name, product_name, current_status, version, created_at, updated_at
            "#,
        )
        .bind(&tracker.customer_name)
        .bind(&tracker.product_name)
        .bind(&tracker.current_status)
        .bind(tracker.manager.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                StoreError::ManagerNotFound(tracker.manager.id)
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(Tracker {
            id: row.get("id"),
            customer_name: row.get("customer_name"),
            product_name: row.get("product_name"),
            current_status: row.get("current_status"),
            manager: tracker.manager,
            version: row.get("version"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn find_tracker(&self, id: Id) -> StoreResult<Option<Tracker>> {
        self.fetch_tracker(id).await
    }

    async fn list_trackers(&self, request: PageRequest) -> StoreResult<Page<Tracker>> {
        let request = request.normalized();
        let sql = format!(
            "SELECT {} FROM trackers t JOIN managers m ON m.id = t.manager_id ORDER BY t.id LIMIT $1 OFFSET $2",
            TRACKER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(request.size))
            .bind(request.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let total = self.count_trackers().await?;
        Ok(Page::new(
            rows.iter().map(tracker_from_row).collect(),
            request,
            total,
        ))
    }

    async fn count_trackers(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trackers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn update_tracker(
        &self,
        acting: &ActingIdentity,
        id: Id,
        expected_version: Option<i64>,
        changes: TrackerChanges,
    ) -> StoreResult<Tracker> {
        let current = self
            .fetch_tracker(id)
            .await?
            .ok_or(StoreError::TrackerNotFound(id))?;

        authorize_owner(acting, &current.manager)?;
        check_version(id, expected_version, current.version)?;

        // Guard on the version we read so a concurrent writer turns into a conflict
        let result = sqlx::query(
            r#"
            UPDATE trackers
            SET customer_name = $1, product_name = $2, current_status = $3,
                version = version + 1, updated_at = NOW()
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(&changes.customer_name)
        .bind(&changes.product_name)
        .bind(&changes.current_status)
        .bind(id)
        .bind(current.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual = self
                .fetch_tracker(id)
                .await?
                .ok_or(StoreError::TrackerNotFound(id))?
                .version;
            return Err(StoreError::VersionConflict {
                id,
                expected: current.version,
                actual,
            });
        }

        self.fetch_tracker(id)
            .await?
            .ok_or(StoreError::TrackerNotFound(id))
    }

    async fn delete_tracker(&self, acting: &ActingIdentity, id: Id) -> StoreResult<()> {
        let current = self
            .fetch_tracker(id)
            .await?
            .ok_or(StoreError::TrackerNotFound(id))?;

        authorize_owner(acting, &current.manager)?;

        let result = sqlx::query("DELETE FROM trackers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::TrackerNotFound(id));
        }
        Ok(())
    }
}
