//! `SQLite` implementation of [`MetricsStore`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use motiontrigger_app::ports::MetricsStore;
use motiontrigger_domain::error::TriggerError;
use motiontrigger_domain::id::DeviceId;
use motiontrigger_domain::metrics::{Metrics, Status, SwitchLevel};
use motiontrigger_domain::time::now;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Metrics`].
struct Wrapper(Metrics);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Metrics> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let level: String = row.try_get("level")?;
        let triggered: bool = row.try_get("triggered")?;
        let timeout: Option<String> = row.try_get("timeout")?;
        let icon: String = row.try_get("icon")?;
        let title: String = row.try_get("title")?;
        let probe_title: String = row.try_get("probe_title")?;

        let level: SwitchLevel = level
            .parse()
            .map_err(|err: String| sqlx::Error::Decode(err.into()))?;
        let icon: Status = icon
            .parse()
            .map_err(|err: String| sqlx::Error::Decode(err.into()))?;
        let timeout = timeout
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.to_utc())
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))
            })
            .transpose()?;

        Ok(Self(Metrics {
            device_id: DeviceId::new(device_id),
            level,
            triggered,
            timeout,
            icon,
            title,
            probe_title,
        }))
    }
}

const UPSERT: &str = "INSERT INTO virtual_device_metrics \
     (device_id, level, triggered, timeout, icon, title, probe_title, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
     ON CONFLICT (device_id) DO UPDATE SET \
     level = excluded.level, triggered = excluded.triggered, timeout = excluded.timeout, \
     icon = excluded.icon, title = excluded.title, probe_title = excluded.probe_title, \
     updated_at = excluded.updated_at";
const SELECT_BY_ID: &str = "SELECT * FROM virtual_device_metrics WHERE device_id = ?";

/// `SQLite`-backed metrics store.
pub struct SqliteMetricsStore {
    pool: SqlitePool,
}

impl SqliteMetricsStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MetricsStore for SqliteMetricsStore {
    fn load(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Metrics>, TriggerError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(device_id)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn save(&self, metrics: &Metrics) -> impl Future<Output = Result<(), TriggerError>> + Send {
        let pool = self.pool.clone();
        let metrics = metrics.clone();
        async move {
            sqlx::query(UPSERT)
                .bind(metrics.device_id.as_str())
                .bind(metrics.level.as_str())
                .bind(metrics.triggered)
                .bind(metrics.timeout.map(|ts| ts.to_rfc3339()))
                .bind(metrics.icon.as_str())
                .bind(&metrics.title)
                .bind(&metrics.probe_title)
                .bind(now().to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}
