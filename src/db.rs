use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, info};

use crate::models::{AddResult, ClassId, GymClass, MemberId, NewGymClass, RemoveResult};
use crate::settings::Settings;
use crate::store::{BookingStore, ClassCatalog, ClassUpdateError, MemberDirectory, StoreError};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const CLASS_COLUMNS: &str =
    "id, name, start_time, duration_seconds, description, capacity, version";

/// SQLite-backed class catalog, member directory and booking store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(settings: &Settings) -> Result<Self, StoreError> {
        let in_memory = settings.database_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(&settings.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(settings.db_timeout())
            .journal_mode(if in_memory {
                SqliteJournalMode::Memory
            } else {
                SqliteJournalMode::Wal
            });

        // Every connection to `:memory:` opens its own database, so keep
        // exactly one alive for the lifetime of the pool.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.db_max_connections)
        };

        let pool = pool_options
            .acquire_timeout(settings.db_timeout())
            .connect_with(options)
            .await?;

        info!(url = %settings.database_url, "connected to database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Records a member id issued by the identity system. Repeated calls are
    /// no-ops.
    pub async fn register_member(&self, id: &MemberId) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO members (id) VALUES (?1) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_classes(&self) -> Result<Vec<GymClass>, StoreError> {
        let classes = sqlx::query_as::<_, GymClass>(&format!(
            "SELECT {CLASS_COLUMNS} FROM gym_classes ORDER BY start_time, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(classes)
    }

    pub async fn create_class(&self, class: &NewGymClass) -> Result<GymClass, StoreError> {
        let id = sqlx::query(
            r#"
            INSERT INTO gym_classes
                (name, start_time, duration_seconds, description, capacity, version)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            "#,
        )
        .bind(&class.name)
        .bind(class.start_time)
        .bind(class.duration.num_seconds())
        .bind(&class.description)
        .bind(class.capacity)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!(class_id = id, name = %class.name, "class created");
        Ok(GymClass {
            id: ClassId(id),
            name: class.name.clone(),
            start_time: class.start_time,
            duration_seconds: class.duration.num_seconds(),
            description: class.description.clone(),
            capacity: class.capacity,
            version: 1,
        })
    }

    /// Overwrites a class if `expected_version` still matches the stored row.
    pub async fn update_class(
        &self,
        id: ClassId,
        expected_version: i64,
        class: &NewGymClass,
    ) -> Result<GymClass, ClassUpdateError> {
        let updated = sqlx::query(
            r#"
            UPDATE gym_classes
            SET name = ?1,
                start_time = ?2,
                duration_seconds = ?3,
                description = ?4,
                capacity = ?5,
                version = version + 1
            WHERE id = ?6 AND version = ?7
            "#,
        )
        .bind(&class.name)
        .bind(class.start_time)
        .bind(class.duration.num_seconds())
        .bind(&class.description)
        .bind(class.capacity)
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?
        .rows_affected();

        if updated == 0 {
            return match self.find_class(id).await? {
                Some(_) => Err(ClassUpdateError::Conflict),
                None => Err(ClassUpdateError::NotFound),
            };
        }

        debug!(class_id = %id, version = expected_version + 1, "class updated");
        Ok(GymClass {
            id,
            name: class.name.clone(),
            start_time: class.start_time,
            duration_seconds: class.duration.num_seconds(),
            description: class.description.clone(),
            capacity: class.capacity,
            version: expected_version + 1,
        })
    }

    /// Deletes a class; its bookings go with it through `ON DELETE CASCADE`.
    pub async fn delete_class(&self, id: ClassId) -> Result<bool, StoreError> {
        let deleted = sqlx::query("DELETE FROM gym_classes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted > 0 {
            debug!(class_id = %id, "class deleted");
        }
        Ok(deleted > 0)
    }

    pub async fn attendees(&self, class: ClassId) -> Result<Vec<MemberId>, StoreError> {
        let members = sqlx::query_scalar::<_, MemberId>(
            "SELECT member_id FROM bookings WHERE class_id = ?1 ORDER BY booked_at, member_id",
        )
        .bind(class)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn classes_for_member(&self, member: &MemberId) -> Result<Vec<GymClass>, StoreError> {
        let classes = sqlx::query_as::<_, GymClass>(
            r#"
            SELECT c.id, c.name, c.start_time, c.duration_seconds, c.description,
                   c.capacity, c.version
            FROM gym_classes c
            JOIN bookings b ON b.class_id = c.id
            WHERE b.member_id = ?1
            ORDER BY c.start_time, c.id
            "#,
        )
        .bind(member)
        .fetch_all(&self.pool)
        .await?;
        Ok(classes)
    }
}

#[async_trait]
impl ClassCatalog for SqliteStore {
    async fn find_class(&self, id: ClassId) -> Result<Option<GymClass>, StoreError> {
        let class = sqlx::query_as::<_, GymClass>(&format!(
            "SELECT {CLASS_COLUMNS} FROM gym_classes WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(class)
    }
}

#[async_trait]
impl MemberDirectory for SqliteStore {
    async fn member_exists(&self, id: &MemberId) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM members WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn exists(&self, member: &MemberId, class: ClassId) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM bookings WHERE member_id = ?1 AND class_id = ?2",
        )
        .bind(member)
        .bind(class)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn try_add(&self, member: &MemberId, class: ClassId) -> Result<AddResult, StoreError> {
        // The capacity check and the insert are one statement. When the pair
        // is already booked the insert is still attempted so the primary key
        // reports it, which keeps "full" and "already booked" apart.
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (member_id, class_id, booked_at)
            SELECT ?1, ?2, ?3
            WHERE EXISTS (SELECT 1 FROM bookings WHERE member_id = ?1 AND class_id = ?2)
               OR (SELECT capacity FROM gym_classes WHERE id = ?2) IS NULL
               OR (SELECT COUNT(*) FROM bookings WHERE class_id = ?2)
                  < (SELECT capacity FROM gym_classes WHERE id = ?2)
            "#,
        )
        .bind(member)
        .bind(class)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(AddResult::Inserted),
            Ok(_) => Ok(AddResult::ClassFull),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(member_id = %member, class_id = %class, "booking already present");
                Ok(AddResult::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn try_remove(
        &self,
        member: &MemberId,
        class: ClassId,
    ) -> Result<RemoveResult, StoreError> {
        let deleted = sqlx::query("DELETE FROM bookings WHERE member_id = ?1 AND class_id = ?2")
            .bind(member)
            .bind(class)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(if deleted == 1 {
            RemoveResult::Removed
        } else {
            RemoveResult::NotFound
        })
    }
}
