//! SQLite index plus vault of stored tracks.
//!
//! The `tracks` table keys each track by the SHA-256 of its file and keeps
//! its summary, so a rendering over stored tracks never has to parse a
//! file just to learn its extents.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, warn};
use track_common::{GeekError, GeekResult, GeoBounds, TimeSpan, ValueRange};
use track_library::{hash_file, ParseMode, TrackDescriptor, TrackSource, TrackSummary};

use crate::query::TrackQuery;
use crate::vault::Vault;

pub const DATABASE_FILE: &str = "tracklibrary.db";
pub const VAULT_DIR: &str = "vault";
pub const SCHEMA_VERSION: i64 = 2;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    content_hash TEXT PRIMARY KEY,
    path TEXT NOT NULL,
    length_2d REAL NOT NULL,
    length_3d REAL NOT NULL,
    min_elevation REAL,
    max_elevation REAL,
    min_latitude REAL NOT NULL,
    max_latitude REAL NOT NULL,
    min_longitude REAL NOT NULL,
    max_longitude REAL NOT NULL,
    min_speed REAL,
    max_speed REAL,
    -- Unix milliseconds
    min_time INTEGER NOT NULL,
    max_time INTEGER NOT NULL,
    added_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tracks_min_time ON tracks(min_time);
CREATE TABLE IF NOT EXISTS library (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

const TRACK_COLUMNS: &str = "content_hash, path, length_2d, length_3d, \
     min_elevation, max_elevation, min_latitude, max_latitude, \
     min_longitude, max_longitude, min_speed, max_speed, min_time, max_time";

type TrackRow = (
    String,
    String,
    f64,
    f64,
    Option<f64>,
    Option<f64>,
    f64,
    f64,
    f64,
    f64,
    Option<f64>,
    Option<f64>,
    i64,
    i64,
);

/// Result of [`TrackStore::import`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(String),
    /// A file with the same bytes was already stored.
    AlreadyStored(String),
}

impl ImportOutcome {
    pub fn hash(&self) -> &str {
        match self {
            ImportOutcome::Imported(hash) | ImportOutcome::AlreadyStored(hash) => hash,
        }
    }
}

/// Persistent, content-addressed track library.
#[derive(Debug, Clone)]
pub struct TrackStore {
    root: PathBuf,
    vault: Vault,
    pool: SqlitePool,
}

impl TrackStore {
    /// Open (or create) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> GeekResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        let vault = Vault::create(root.join(VAULT_DIR))?;

        let options = SqliteConnectOptions::new()
            .filename(root.join(DATABASE_FILE))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| GeekError::Database(format!("Connection failed: {}", e)))?;

        let store = Self { root, vault, pool };
        store.init_schema().await?;

        info!(root = %store.root.display(), "Opened track store");
        Ok(store)
    }

    async fn init_schema(&self) -> GeekResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| GeekError::Database(format!("Migration failed: {}", e)))?;
            }
        }

        sqlx::query("INSERT OR IGNORE INTO library (key, value) VALUES ('schema_version', ?)")
            .bind(SCHEMA_VERSION.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| GeekError::Database(format!("Migration failed: {}", e)))?;

        let version = self.schema_version().await?;
        if version != SCHEMA_VERSION {
            return Err(GeekError::Database(format!(
                "Store at {} has schema version {}, expected {}",
                self.root.display(),
                version,
                SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    /// Schema version recorded in the `library` table.
    pub async fn schema_version(&self) -> GeekResult<i64> {
        let (value,): (String,) =
            sqlx::query_as("SELECT value FROM library WHERE key = 'schema_version'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| GeekError::Database(format!("Query failed: {}", e)))?;
        value
            .parse()
            .map_err(|_| GeekError::Database(format!("Invalid schema version '{}'", value)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Absolute vault path for `hash`.
    pub fn vault_path(&self, hash: &str) -> GeekResult<PathBuf> {
        self.vault.path(hash)
    }

    /// `<hash[0:3]>/<hash[3:]>.gpx`.
    pub fn relative_vault_path(&self, hash: &str) -> GeekResult<PathBuf> {
        Vault::relative_path(hash)
    }

    /// Index a track whose file already lives inside the vault.
    pub async fn put(&self, descriptor: &TrackDescriptor) -> GeekResult<()> {
        let relative = self.vault.relativize(&descriptor.path())?;
        let hash = descriptor.content_hash()?.to_string();
        let summary = descriptor.summary()?;
        let relative = relative.to_string_lossy().into_owned();

        sqlx::query(
            r#"
            INSERT INTO tracks (
                content_hash, path, length_2d, length_3d,
                min_elevation, max_elevation,
                min_latitude, max_latitude, min_longitude, max_longitude,
                min_speed, max_speed, min_time, max_time, added_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&hash)
        .bind(&relative)
        .bind(summary.length_2d)
        .bind(summary.length_3d)
        .bind(summary.elevation.map(|e| e.min))
        .bind(summary.elevation.map(|e| e.max))
        .bind(summary.bounds.min_latitude)
        .bind(summary.bounds.max_latitude)
        .bind(summary.bounds.min_longitude)
        .bind(summary.bounds.max_longitude)
        .bind(summary.speed().map(|s| s.min))
        .bind(summary.max_speed)
        .bind(summary.time.start.timestamp_millis())
        .bind(summary.time.end.timestamp_millis())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .map_or(false, |db| db.is_unique_violation());
            if duplicate {
                GeekError::DuplicateTrack(hash.clone())
            } else {
                GeekError::Database(format!("Insert failed: {}", e))
            }
        })?;

        debug!(hash = %hash, path = %relative, "Stored track");
        Ok(())
    }

    /// Descriptor for a stored hash.
    pub async fn get(&self, hash: &str) -> GeekResult<TrackDescriptor> {
        let sql = format!("SELECT {} FROM tracks WHERE content_hash = ?", TRACK_COLUMNS);
        let row: Option<TrackRow> = sqlx::query_as(&sql)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GeekError::Database(format!("Query failed: {}", e)))?;

        match row {
            Some(row) => self.descriptor_from_row(row),
            None => Err(GeekError::NotFound(hash.to_string())),
        }
    }

    pub async fn contains(&self, hash: &str) -> GeekResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tracks WHERE content_hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GeekError::Database(format!("Query failed: {}", e)))?;
        Ok(row.is_some())
    }

    pub async fn count(&self) -> GeekResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GeekError::Database(format!("Query failed: {}", e)))?;
        Ok(count.max(0) as u64)
    }

    /// Stored tracks matching every condition of `query`, oldest first.
    ///
    /// A row whose column is NULL never satisfies a range on that column.
    pub async fn query(&self, query: &TrackQuery) -> GeekResult<Vec<TrackDescriptor>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM tracks WHERE 1 = 1", TRACK_COLUMNS));

        for (field, range) in query.ranges() {
            if let Some(min) = range.min {
                builder
                    .push(" AND ")
                    .push(field.column())
                    .push(" >= ")
                    .push_bind(min);
            }
            if let Some(max) = range.max {
                builder
                    .push(" AND ")
                    .push(field.column())
                    .push(" <= ")
                    .push_bind(max);
            }
        }
        if let Some(needle) = query.substring() {
            builder
                .push(" AND instr(path, ")
                .push_bind(needle.to_string())
                .push(") > 0");
        }
        builder.push(" ORDER BY min_time ASC, content_hash ASC");

        let rows: Vec<TrackRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GeekError::Database(format!("Query failed: {}", e)))?;

        let descriptors = rows
            .into_iter()
            .filter(|row| query.matches_path(&row.1))
            .map(|row| self.descriptor_from_row(row))
            .collect::<GeekResult<Vec<_>>>()?;

        debug!(matched = descriptors.len(), "Queried track store");
        Ok(descriptors)
    }

    /// Copy a GPX file into the vault and index it.
    ///
    /// Importing bytes that are already stored is a no-op. A file that
    /// cannot be summarized is removed from the vault again.
    pub async fn import(&self, path: &Path) -> GeekResult<ImportOutcome> {
        let hash = hash_file(path)?;
        if self.contains(&hash).await? {
            debug!(path = %path.display(), hash = %hash, "Track already stored");
            return Ok(ImportOutcome::AlreadyStored(hash));
        }

        let stored = self.vault.store(path, &hash)?;
        let source = TrackSource::Vault {
            root: self.vault.root().to_path_buf(),
            relative: Vault::relative_path(&hash)?,
        };
        let descriptor = TrackDescriptor::open_source(source, ParseMode::Streaming)?;

        let result = match descriptor.summary() {
            Ok(_) => self.put(&descriptor).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(path = %path.display(), hash = %hash, "Imported track");
                Ok(ImportOutcome::Imported(hash))
            }
            Err(GeekError::DuplicateTrack(_)) => Ok(ImportOutcome::AlreadyStored(hash)),
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&stored).await {
                    warn!(path = %stored.display(), error = %remove_err, "Failed to remove vault copy");
                }
                Err(match e {
                    GeekError::Track { message, .. } => GeekError::track(path, message),
                    other => other,
                })
            }
        }
    }

    fn descriptor_from_row(&self, row: TrackRow) -> GeekResult<TrackDescriptor> {
        let (
            hash,
            relative,
            length_2d,
            length_3d,
            min_elevation,
            max_elevation,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            _min_speed,
            max_speed,
            min_time,
            max_time,
        ) = row;

        let elevation = match (min_elevation, max_elevation) {
            (Some(min), Some(max)) => Some(ValueRange::new(min, max)),
            _ => None,
        };
        let summary = TrackSummary {
            bounds: GeoBounds::new(min_lat, max_lat, min_lon, max_lon),
            elevation,
            max_speed,
            time: TimeSpan::new(timestamp(&hash, min_time)?, timestamp(&hash, max_time)?),
            length_2d,
            length_3d,
        };
        let source = TrackSource::Vault {
            root: self.vault.root().to_path_buf(),
            relative: PathBuf::from(relative),
        };
        Ok(TrackDescriptor::from_stored(source, hash, summary))
    }
}

fn timestamp(hash: &str, millis: i64) -> GeekResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        GeekError::Database(format!("Track {} has invalid timestamp {}", hash, millis))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{
        corner_track, elevation_track, point, reference_time, temp_test_dir, untimed_track,
        GpxBuilder,
    };
    use crate::query::{FieldRange, TrackField};

    #[tokio::test]
    async fn test_open_creates_layout() {
        let dir = temp_test_dir();
        let root = dir.path().join("library");
        let store = TrackStore::open(&root).await.unwrap();

        assert!(root.join(DATABASE_FILE).is_file());
        assert!(root.join(VAULT_DIR).is_dir());
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
        assert_eq!(store.count().await.unwrap(), 0);

        // Reopening keeps the schema
        drop(store);
        let reopened = TrackStore::open(&root).await.unwrap();
        assert_eq!(reopened.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_import_and_get() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let source = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "a.gpx");

        let outcome = store.import(&source).await.unwrap();
        let hash = outcome.hash().to_string();
        assert!(matches!(outcome, ImportOutcome::Imported(_)));
        assert!(store.contains(&hash).await.unwrap());
        assert!(store.vault().verify(&hash).unwrap());

        let descriptor = store.get(&hash).await.unwrap();
        assert_eq!(descriptor.path(), store.vault_path(&hash).unwrap());
        assert_eq!(
            descriptor.summary().unwrap().bounds,
            GeoBounds::new(0.0, 1.0, 0.0, 1.0)
        );
        assert_eq!(descriptor.parsed().unwrap().point_count(), 2);

        let again = store.import(&source).await.unwrap();
        assert_eq!(again, ImportOutcome::AlreadyStored(hash));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_summary_round_trips_through_row() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let source = elevation_track(50.0, 80.0).write_to(dir.path(), "hill.gpx");
        let original = TrackDescriptor::open(&source, ParseMode::Streaming).unwrap();

        let hash = store.import(&source).await.unwrap().hash().to_string();
        let stored = store.get(&hash).await.unwrap();
        assert_eq!(stored.summary().unwrap(), original.summary().unwrap());
    }

    #[tokio::test]
    async fn test_sub_second_times_survive_storage() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let t0 = reference_time() + chrono::Duration::milliseconds(250);
        let source = GpxBuilder::new()
            .segment([
                point(51.0, -1.0).at(t0),
                point(51.001, -1.0).at(t0 + chrono::Duration::milliseconds(1_500)),
            ])
            .write_to(dir.path(), "quick.gpx");

        let hash = store.import(&source).await.unwrap().hash().to_string();
        let stored = store.get(&hash).await.unwrap();
        let time = stored.summary().unwrap().time;
        assert_eq!(time.start, t0);
        assert_eq!(time.end, t0 + chrono::Duration::milliseconds(1_500));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path()).await.unwrap();
        let err = store.get("abcdef").await.unwrap_err();
        assert!(matches!(err, GeekError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_put_outside_vault() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let loose = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "loose.gpx");
        let descriptor = TrackDescriptor::open(&loose, ParseMode::Streaming).unwrap();

        let err = store.put(&descriptor).await.unwrap_err();
        assert!(matches!(err, GeekError::VaultMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_duplicate() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let source = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "a.gpx");
        let hash = store.import(&source).await.unwrap().hash().to_string();

        let descriptor =
            TrackDescriptor::open(store.vault_path(&hash).unwrap(), ParseMode::Streaming).unwrap();
        let err = store.put(&descriptor).await.unwrap_err();
        assert!(matches!(err, GeekError::DuplicateTrack(h) if h == hash));
    }

    #[tokio::test]
    async fn test_import_invalid_track_leaves_no_copy() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let untimed = untimed_track().write_to(dir.path(), "untimed.gpx");
        let hash = hash_file(&untimed).unwrap();

        let err = store.import(&untimed).await.unwrap_err();
        assert!(err.is_per_track());
        assert!(!store.vault_path(&hash).unwrap().exists());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_min_elevation() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let low = elevation_track(50.0, 60.0).write_to(dir.path(), "low.gpx");
        let high = elevation_track(500.0, 600.0).write_to(dir.path(), "high.gpx");
        let flat = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "flat.gpx");
        let low_hash = store.import(&low).await.unwrap().hash().to_string();
        store.import(&high).await.unwrap();
        store.import(&flat).await.unwrap();

        let query = TrackQuery::new().range(TrackField::MinElevation, ValueRange::new(0.0, 100.0));
        let found = store.query(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content_hash().unwrap(), low_hash);

        let all = store.query(&TrackQuery::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_query_path_and_open_ends() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let a = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "a.gpx");
        let b = corner_track(5.0, 5.0, 6.0, 6.0).write_to(dir.path(), "b.gpx");
        let a_hash = store.import(&a).await.unwrap().hash().to_string();
        store.import(&b).await.unwrap();

        let north = TrackQuery::new().range(TrackField::MinLatitude, FieldRange::new(Some(5.0), None));
        assert_eq!(store.query(&north).await.unwrap().len(), 1);

        let by_prefix = TrackQuery::new().path_contains(&a_hash[..3]);
        let found = store.query(&by_prefix).await.unwrap();
        assert!(found.iter().any(|d| d.content_hash().unwrap() == a_hash));

        let by_regex = TrackQuery::new()
            .path_matches(&format!("^{}/", &a_hash[..3]))
            .unwrap();
        let found = store.query(&by_regex).await.unwrap();
        assert!(found.iter().all(|d| d.content_hash().unwrap().starts_with(&a_hash[..3])));
        assert!(!found.is_empty());
    }

    #[tokio::test]
    async fn test_query_for_overrides_matches_library_filter() {
        let dir = temp_test_dir();
        let store = TrackStore::open(dir.path().join("library")).await.unwrap();
        let inside = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "inside.gpx");
        let outside = corner_track(10.0, 10.0, 11.0, 11.0).write_to(dir.path(), "outside.gpx");
        let inside_hash = store.import(&inside).await.unwrap().hash().to_string();
        store.import(&outside).await.unwrap();

        let overrides = track_library::BoundsOverrides {
            latitude: Some(ValueRange::new(1.0, 2.0)),
            ..Default::default()
        };
        let found = store.query(&TrackQuery::for_overrides(&overrides)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content_hash().unwrap(), inside_hash);
    }
}
