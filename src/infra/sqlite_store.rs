use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::app::ports::EventStore;
use crate::constants::MAX_STATIONS_PER_EVENT;
use crate::domain::{Event, StoredEvent};
use crate::error::StorageError;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS rayos (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        time    INTEGER,
        lat     REAL,
        lon     REAL,
        alt     REAL,
        pol,
        mds,
        mcg,
        status,
        region,
        delay,
        lonc,
        latc,
        fecha   TEXT NOT NULL,
        hora    TEXT NOT NULL,
        pais    TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS estaciones (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        idRayo      INTEGER NOT NULL REFERENCES rayos(id),
        sta,
        tiempoRelat,
        lat,
        lon,
        alt,
        status
    );
"#;

const INSERT_EVENT: &str = "INSERT INTO rayos (time, lat, lon, alt, pol, mds, mcg, status, region, delay, lonc, latc, fecha, hora, pais)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const INSERT_STATION: &str = "INSERT INTO estaciones (idRayo, sta, tiempoRelat, lat, lon, alt, status)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// SQLite-backed store. A fresh connection is opened for every strike and
/// dropped when the write finishes, successful or not.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create `rayos` and `estaciones` if they are missing.
    pub fn init_schema(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn open(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }
}

impl EventStore for SqliteStore {
    #[instrument(skip(self, event), fields(stations = event.stations.len()))]
    fn persist(&self, event: &Event) -> Result<StoredEvent, StorageError> {
        let mut conn = self.open()?;
        // Dropping an uncommitted transaction rolls it back
        let tx = conn.transaction()?;

        tx.execute(
            INSERT_EVENT,
            params![
                event.time,
                event.lat,
                event.lon,
                event.alt,
                sql_value(&event.pol),
                sql_value(&event.mds),
                sql_value(&event.mcg),
                sql_value(&event.status),
                sql_value(&event.region),
                sql_value(&event.delay),
                sql_value(&event.lonc),
                sql_value(&event.latc),
                event.fecha,
                event.hora,
                event.pais,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let mut written = 0;
        {
            let mut stmt = tx.prepare(INSERT_STATION)?;
            for station in event.stations.iter().take(MAX_STATIONS_PER_EVENT) {
                stmt.execute(params![
                    id,
                    sql_value(&station.sta),
                    sql_value(&station.time),
                    sql_value(&station.lat),
                    sql_value(&station.lon),
                    sql_value(&station.alt),
                    sql_value(&station.status),
                ])?;
                written += 1;
            }
        }

        tx.commit()?;
        debug!("Stored strike {} ({} stations)", id, written);
        Ok(StoredEvent {
            id,
            stations: written,
        })
    }
}

/// Map a JSON scalar onto the closest SQLite storage class. Arrays and
/// objects are stored as their JSON text.
pub fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Station;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (SqliteStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("rayos.db"));
        store.init_schema().unwrap();
        (store, dir)
    }

    fn station(sta: i64) -> Station {
        Station {
            sta: json!(sta),
            time: json!(sta * 100),
            lat: json!(40.0),
            lon: json!(-3.0),
            alt: json!(0),
            status: json!(0),
        }
    }

    fn event(stations: Vec<Station>) -> Event {
        Event {
            time: Some(1_700_000_000_000_000_000),
            lat: Some(40.4),
            lon: Some(-3.7),
            alt: Some(0.0),
            pol: json!(0),
            mds: json!(12),
            mcg: json!(200),
            status: json!(1),
            region: json!(1),
            delay: json!(3.1),
            lonc: json!(2),
            latc: json!(1),
            fecha: "2023-11-14".to_string(),
            hora: "23:13:20".to_string(),
            pais: "Madrid".to_string(),
            stations,
        }
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        store
            .open()
            .unwrap()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_persist_links_stations_to_event() {
        let (store, _dir) = store();
        let stored = store.persist(&event(vec![station(1), station(2)])).unwrap();
        assert_eq!(stored.stations, 2);
        let id = stored.id;

        let conn = store.open().unwrap();
        let (fecha, pais, mds): (String, String, i64) = conn
            .query_row("SELECT fecha, pais, mds FROM rayos WHERE id = ?1", [id], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!((fecha.as_str(), pais.as_str(), mds), ("2023-11-14", "Madrid", 12));

        let linked: i64 = conn
            .query_row("SELECT COUNT(*) FROM estaciones WHERE idRayo = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(linked, 2);
    }

    #[test]
    fn test_only_first_five_stations_written_in_order() {
        let (store, _dir) = store();
        let stations = (1..=7).map(station).collect();
        let stored = store.persist(&event(stations)).unwrap();
        assert_eq!(stored.stations, 5);
        let id = stored.id;

        let conn = store.open().unwrap();
        let mut stmt = conn
            .prepare("SELECT sta, tiempoRelat FROM estaciones WHERE idRayo = ?1 ORDER BY id")
            .unwrap();
        let rows: Vec<(i64, i64)> = stmt
            .query_map([id], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(rows, vec![(1, 100), (2, 200), (3, 300), (4, 400), (5, 500)]);
    }

    #[test]
    fn test_failed_station_insert_commits_nothing() {
        let (store, _dir) = store();
        store
            .open()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_station BEFORE INSERT ON estaciones
                 WHEN NEW.sta = 3 BEGIN SELECT RAISE(ABORT, 'station rejected'); END;",
            )
            .unwrap();

        let err = store.persist(&event((1..=4).map(station).collect())).unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
        assert_eq!(count(&store, "rayos"), 0);
        assert_eq!(count(&store, "estaciones"), 0);

        // A later strike still goes through on a fresh connection
        store.persist(&event(vec![station(1)])).unwrap();
        assert_eq!(count(&store, "rayos"), 1);
    }

    #[test]
    fn test_missing_schema_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("empty.db"));
        assert!(store.persist(&event(Vec::new())).is_err());
    }

    #[test]
    fn test_event_ids_increase() {
        let (store, _dir) = store();
        let first = store.persist(&event(Vec::new())).unwrap().id;
        let second = store.persist(&event(Vec::new())).unwrap().id;
        assert!(second > first);
    }

    #[test]
    fn test_sql_value_mapping() {
        assert_eq!(sql_value(&json!(null)), SqlValue::Null);
        assert_eq!(sql_value(&json!(true)), SqlValue::Integer(1));
        assert_eq!(sql_value(&json!(-7)), SqlValue::Integer(-7));
        assert_eq!(sql_value(&json!(2.5)), SqlValue::Real(2.5));
        assert_eq!(sql_value(&json!("x")), SqlValue::Text("x".to_string()));
        assert_eq!(sql_value(&json!([1, 2])), SqlValue::Text("[1,2]".to_string()));
    }
}
