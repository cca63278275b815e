//! libSQL persistence for builder records (offline mode).
//!
//! The [`Storage`] struct wraps a local libSQL database holding the
//! `builders` directory table and the batch `runs` history.
//!
//! Composite fields are stored as JSON text; `van_types` is stored as the
//! comma-joined scalar the directory app reads. Absent values are `NULL`.

mod migrations;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use vanbuilder_shared::{BuilderRecord, PhotoAsset, Result, VanBuilderError};

const BUILDER_COLUMNS: &str = "id, name, website, address, city, state, zip, phone, email, lat, lng,
     description, van_types, amenities, services, social_media, photos, content_hash, updated_at";

/// A builder row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBuilder {
    pub id: String,
    pub record: BuilderRecord,
    pub content_hash: String,
    pub updated_at: String,
}

/// Where finished records go.
#[async_trait(?Send)]
pub trait RecordStore {
    /// Exact lookup by [`BuilderRecord::normalized_name`].
    async fn find_by_normalized_name(&self, key: &str) -> Result<Option<StoredBuilder>>;

    /// Insert, or replace the row with the same normalized name.
    async fn upsert(&self, record: &BuilderRecord) -> Result<()>;
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> VanBuilderError {
    VanBuilderError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| VanBuilderError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for listing only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VanBuilderError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        VanBuilderError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(VanBuilderError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Builder operations
    // -----------------------------------------------------------------------

    /// All builders, ordered by state then name.
    pub async fn list_builders(&self) -> Result<Vec<StoredBuilder>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {BUILDER_COLUMNS} FROM builders ORDER BY state, name"),
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_builder(&row)?);
        }
        Ok(results)
    }

    /// Number of stored builders.
    pub async fn count_builders(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM builders", params![])
            .await
            .map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => row.get::<i64>(0).map(|n| n.max(0) as u64).map_err(storage_err),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Run history
    // -----------------------------------------------------------------------

    /// Record the start of a batch run. Returns the run ID.
    pub async fn insert_run(&self, input: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, input, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), input, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a run finished and store its serialized report.
    pub async fn finish_run(&self, run_id: &str, report_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, report_json = ?2 WHERE id = ?3",
                params![now.as_str(), report_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Stored report of a finished run.
    pub async fn run_report(&self, run_id: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT report_json FROM runs WHERE id = ?1", params![run_id])
            .await
            .map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<String>(0).ok()),
            None => Ok(None),
        }
    }
}

#[async_trait(?Send)]
impl RecordStore for Storage {
    async fn find_by_normalized_name(&self, key: &str) -> Result<Option<StoredBuilder>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {BUILDER_COLUMNS} FROM builders WHERE normalized_name = ?1"),
                params![key],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_builder(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(name = %record.name))]
    async fn upsert(&self, record: &BuilderRecord) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let id = Uuid::now_v7().to_string();
        let hash = record.content_hash();

        self.conn
            .execute(
                "INSERT INTO builders (id, normalized_name, name, website, address, city, state, zip,
                    phone, email, lat, lng, description, van_types, amenities, services,
                    social_media, photos, content_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21)
                 ON CONFLICT(normalized_name) DO UPDATE SET
                   name = excluded.name,
                   website = excluded.website,
                   address = excluded.address,
                   city = excluded.city,
                   state = excluded.state,
                   zip = excluded.zip,
                   phone = excluded.phone,
                   email = excluded.email,
                   lat = excluded.lat,
                   lng = excluded.lng,
                   description = excluded.description,
                   van_types = excluded.van_types,
                   amenities = excluded.amenities,
                   services = excluded.services,
                   social_media = excluded.social_media,
                   photos = excluded.photos,
                   content_hash = excluded.content_hash,
                   updated_at = excluded.updated_at",
                params![
                    id.as_str(),
                    record.normalized_name(),
                    record.name.as_str(),
                    record.website.as_str(),
                    record.address.as_deref(),
                    record.city.as_deref(),
                    record.state.as_str(),
                    record.zip.as_deref(),
                    record.phone.as_deref(),
                    record.email.as_deref(),
                    record.lat,
                    record.lng,
                    record.description.as_deref(),
                    record.van_types_display(),
                    to_json(&record.amenities)?,
                    to_json(&record.services)?,
                    to_json(&record.social_media)?,
                    to_json(&record.photos)?,
                    hash.as_str(),
                    now.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;

        debug!(hash = %hash, "builder upserted");
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(storage_err)
}

fn from_json<T: DeserializeOwned + Default>(raw: Option<String>) -> Result<T> {
    match raw {
        Some(s) if !s.trim().is_empty() => serde_json::from_str(&s)
            .map_err(|e| VanBuilderError::Storage(format!("invalid JSON column: {e}"))),
        _ => Ok(T::default()),
    }
}

fn row_to_builder(row: &libsql::Row) -> Result<StoredBuilder> {
    let van_types = row
        .get::<String>(12)
        .ok()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let social_media: BTreeMap<String, String> = from_json(row.get::<String>(15).ok())?;
    let photos: Vec<PhotoAsset> = from_json(row.get::<String>(16).ok())?;

    let record = BuilderRecord {
        name: row.get::<String>(1).map_err(storage_err)?,
        website: row.get::<String>(2).map_err(storage_err)?,
        address: row.get::<String>(3).ok(),
        city: row.get::<String>(4).ok(),
        state: row.get::<String>(5).map_err(storage_err)?,
        zip: row.get::<String>(6).ok(),
        phone: row.get::<String>(7).ok(),
        email: row.get::<String>(8).ok(),
        lat: row.get::<f64>(9).ok(),
        lng: row.get::<f64>(10).ok(),
        description: row.get::<String>(11).ok(),
        van_types,
        amenities: from_json(row.get::<String>(13).ok())?,
        services: from_json(row.get::<String>(14).ok())?,
        social_media,
        photos,
    };

    Ok(StoredBuilder {
        id: row.get::<String>(0).map_err(storage_err)?,
        record,
        content_hash: row.get::<String>(17).map_err(storage_err)?,
        updated_at: row.get::<String>(18).map_err(storage_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("vb_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn scenario_a() -> BuilderRecord {
        let mut record = BuilderRecord::new("Example Van Co", "https://example-van.test/", "CA");
        record.phone = Some("(619) 812-1903".into());
        record.email = Some("contact@example-van.test".into());
        record.address = Some("9393 Trade Pl".into());
        record.city = Some("San Diego".into());
        record.van_types = vec!["Mercedes Sprinter".into(), "Ford Transit".into()];
        record.amenities = vec!["Solar Power".into()];
        record
            .social_media
            .insert("instagram".into(), "https://instagram.com/examplevan".into());
        record.photos.push(PhotoAsset {
            url: "https://example-van.test/gallery/1.jpg".into(),
            alt: "Sprinter build".into(),
            caption: String::new(),
        });
        record.lat = Some(32.8327);
        record.lng = Some(-117.1401);
        record
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn upsert_and_find_round_trip() {
        let storage = test_storage().await;
        let record = scenario_a();
        storage.upsert(&record).await.expect("upsert");

        let found = storage
            .find_by_normalized_name("example van co")
            .await
            .expect("find")
            .expect("row exists");
        assert_eq!(found.record, record);
        assert_eq!(found.content_hash, record.content_hash());
    }

    #[tokio::test]
    async fn absent_fields_stay_null() {
        let storage = test_storage().await;
        let record = BuilderRecord::new("Desert Camper Vans", "https://desert.test/", "AZ");
        storage.upsert(&record).await.unwrap();

        let found = storage
            .find_by_normalized_name("desert camper vans")
            .await
            .unwrap()
            .unwrap();
        assert!(found.record.city.is_none());
        assert!(found.record.lat.is_none());
        assert!(found.record.van_types.is_empty());
        assert!(found.record.photos.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_same_normalized_name() {
        let storage = test_storage().await;
        storage.upsert(&scenario_a()).await.unwrap();

        let mut renamed = scenario_a();
        renamed.name = "Example Van Co.".into();
        renamed.phone = None;
        storage.upsert(&renamed).await.unwrap();

        assert_eq!(storage.count_builders().await.unwrap(), 1);
        let found = storage
            .find_by_normalized_name("example van co")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.record.name, "Example Van Co.");
        assert!(found.record.phone.is_none());
    }

    #[tokio::test]
    async fn list_orders_by_state() {
        let storage = test_storage().await;
        storage.upsert(&scenario_a()).await.unwrap();
        storage
            .upsert(&BuilderRecord::new("Desert Camper Vans", "https://desert.test/", "AZ"))
            .await
            .unwrap();

        let all = storage.list_builders().await.unwrap();
        let states: Vec<&str> = all.iter().map(|b| b.record.state.as_str()).collect();
        assert_eq!(states, vec!["AZ", "CA"]);
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let storage = test_storage().await;
        let run_id = storage.insert_run("targets.csv").await.expect("insert run");
        assert!(!run_id.is_empty());
        assert!(storage.run_report(&run_id).await.unwrap().is_none());

        storage
            .finish_run(&run_id, r#"{"success": 1}"#)
            .await
            .expect("finish run");
        let report = storage.run_report(&run_id).await.unwrap();
        assert!(report.unwrap().contains("success"));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("vb_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.upsert(&scenario_a()).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_builders().await.unwrap().len(), 1);
        let result = ro.upsert(&scenario_a()).await;
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
