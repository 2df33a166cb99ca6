//! SQLite-backed track store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::{
    ArtworkFetchState, ContentLocation, SessionState, Track, TrackError, TrackKey, TrackPayload,
    TrackQuery, TrackSort, TrackStats, TrackStore, UpsertResult,
};

const TRACK_COLUMNS: &str = "track_id, display_name, category, description, short_description,
    artist_name, content_advisory_rating, price_minor_units, rental_price_minor_units,
    hd_price_minor_units, currency_code, remote_artwork, track_view_url, preview_url,
    release_date, local_artwork, fetch_state, first_seen_at, last_seen_at, seen_count";

const SESSION_SELECTED: &str = "selected_track_id";
const SESSION_LAST_ACTIVE: &str = "last_active";

/// SQLite-backed track store.
pub struct SqliteTrackStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackStore {
    /// Create a new SQLite store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TrackError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, TrackError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TrackError> {
        conn.execute_batch(
            r#"
            -- One row per unique iTunes trackId
            CREATE TABLE IF NOT EXISTS tracks (
                track_id INTEGER PRIMARY KEY,
                display_name TEXT,
                category TEXT,
                description TEXT,
                short_description TEXT,
                artist_name TEXT,
                content_advisory_rating TEXT,
                price_minor_units INTEGER,
                rental_price_minor_units INTEGER,
                hd_price_minor_units INTEGER,
                currency_code TEXT,
                remote_artwork TEXT,
                track_view_url TEXT,
                preview_url TEXT,
                release_date TEXT,
                local_artwork TEXT,
                fetch_state TEXT NOT NULL DEFAULT 'idle',
                first_seen_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL,
                seen_count INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_tracks_display_name ON tracks(display_name COLLATE NOCASE);
            CREATE INDEX IF NOT EXISTS idx_tracks_fetch_state ON tracks(fetch_state);

            -- Small key/value table for the last selection and activity
            CREATE TABLE IF NOT EXISTS session_state (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TrackError> {
        self.conn
            .lock()
            .map_err(|_| TrackError::Database("connection mutex poisoned".to_string()))
    }

    fn load_track(conn: &Connection, key: TrackKey) -> Result<Option<Track>, TrackError> {
        let sql = format!("SELECT {} FROM tracks WHERE track_id = ?", TRACK_COLUMNS);
        let track = conn
            .query_row(&sql, params![key.value()], Self::row_to_track)
            .optional()?;
        Ok(track)
    }

    fn exists(conn: &Connection, key: TrackKey) -> Result<bool, TrackError> {
        let found = conn
            .query_row(
                "SELECT 1 FROM tracks WHERE track_id = ?",
                params![key.value()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Run a conditional fetch-state update and return the track if a row changed.
    fn transition(
        &self,
        key: TrackKey,
        sql: &str,
        location: Option<&ContentLocation>,
    ) -> Result<Option<Track>, TrackError> {
        let conn = self.lock()?;
        let changed = match location {
            Some(location) => conn.execute(sql, params![key.value(), location.as_str()])?,
            None => conn.execute(sql, params![key.value()])?,
        };

        if changed == 0 {
            return Ok(None);
        }
        Self::load_track(&conn, key)
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        let release_date: Option<String> = row.get(14)?;
        let local_artwork: Option<String> = row.get(15)?;
        let fetch_state: String = row.get(16)?;
        let first_seen_str: String = row.get(17)?;
        let last_seen_str: String = row.get(18)?;

        Ok(Track {
            key: TrackKey::new(row.get(0)?),
            display_name: row.get(1)?,
            category: row.get(2)?,
            description: row.get(3)?,
            short_description: row.get(4)?,
            artist_name: row.get(5)?,
            content_advisory_rating: row.get(6)?,
            price_minor_units: row.get(7)?,
            rental_price_minor_units: row.get(8)?,
            hd_price_minor_units: row.get(9)?,
            currency_code: row.get(10)?,
            remote_artwork: row.get(11)?,
            track_view_url: row.get(12)?,
            preview_url: row.get(13)?,
            release_date: release_date.as_deref().and_then(parse_time),
            local_artwork: local_artwork.map(ContentLocation::new),
            fetch_state: ArtworkFetchState::from_db(&fetch_state),
            first_seen_at: parse_time(&first_seen_str).unwrap_or_else(Utc::now),
            last_seen_at: parse_time(&last_seen_str).unwrap_or_else(Utc::now),
            seen_count: row.get(19)?,
        })
    }

    fn read_session_value(conn: &Connection, name: &str) -> Result<Option<String>, TrackError> {
        let value = conn
            .query_row(
                "SELECT value FROM session_state WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_session_value(conn: &Connection, name: &str, value: &str) -> Result<(), TrackError> {
        conn.execute(
            "INSERT INTO session_state (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    // Fixed precision keeps the TEXT column lexicographically ordered.
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Case- and diacritic-insensitive form of `text`: NFD, combining marks
/// removed, lowercased.
fn fold_for_match(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn order_clause(sort: TrackSort) -> &'static str {
    match sort {
        TrackSort::NameAsc => {
            "ORDER BY display_name IS NULL, display_name COLLATE NOCASE ASC, track_id ASC"
        }
        TrackSort::NameDesc => {
            "ORDER BY display_name IS NULL, display_name COLLATE NOCASE DESC, track_id ASC"
        }
        TrackSort::LastSeenDesc => "ORDER BY last_seen_at DESC, track_id ASC",
    }
}

impl TrackStore for SqliteTrackStore {
    fn upsert(&self, payload: &TrackPayload) -> Result<UpsertResult, TrackError> {
        let conn = self.lock()?;
        let now_str = format_time(&Utc::now());
        let release_date = payload.release_date.as_ref().map(format_time);
        let created = !Self::exists(&conn, payload.key)?;

        let sql = if created {
            "INSERT INTO tracks (track_id, display_name, category, description, short_description,
                artist_name, content_advisory_rating, price_minor_units, rental_price_minor_units,
                hd_price_minor_units, currency_code, remote_artwork, track_view_url, preview_url,
                release_date, first_seen_at, last_seen_at, seen_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16, 1)"
        } else {
            // Merge: absent payload fields keep the stored value.
            "UPDATE tracks SET
                display_name = COALESCE(?2, display_name),
                category = COALESCE(?3, category),
                description = COALESCE(?4, description),
                short_description = COALESCE(?5, short_description),
                artist_name = COALESCE(?6, artist_name),
                content_advisory_rating = COALESCE(?7, content_advisory_rating),
                price_minor_units = COALESCE(?8, price_minor_units),
                rental_price_minor_units = COALESCE(?9, rental_price_minor_units),
                hd_price_minor_units = COALESCE(?10, hd_price_minor_units),
                currency_code = COALESCE(?11, currency_code),
                remote_artwork = COALESCE(?12, remote_artwork),
                track_view_url = COALESCE(?13, track_view_url),
                preview_url = COALESCE(?14, preview_url),
                release_date = COALESCE(?15, release_date),
                last_seen_at = ?16,
                seen_count = seen_count + 1
             WHERE track_id = ?1"
        };

        conn.execute(
            sql,
            params![
                payload.key.value(),
                &payload.display_name,
                &payload.category,
                &payload.description,
                &payload.short_description,
                &payload.artist_name,
                &payload.content_advisory_rating,
                payload.price_minor_units,
                payload.rental_price_minor_units,
                payload.hd_price_minor_units,
                &payload.currency_code,
                &payload.remote_artwork,
                &payload.track_view_url,
                &payload.preview_url,
                &release_date,
                &now_str,
            ],
        )?;

        let track = Self::load_track(&conn, payload.key)?.ok_or_else(|| {
            TrackError::Database(format!("track {} vanished during upsert", payload.key))
        })?;

        Ok(UpsertResult { track, created })
    }

    fn get(&self, key: TrackKey) -> Result<Option<Track>, TrackError> {
        let conn = self.lock()?;
        Self::load_track(&conn, key)
    }

    fn query(&self, query: &TrackQuery) -> Result<Vec<Track>, TrackError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM tracks {}",
            TRACK_COLUMNS,
            order_clause(query.sort)
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_track)?;

        // Filtering happens here rather than with LIKE: SQLite only folds
        // ASCII case, and search terms must not be treated as patterns.
        let needle = query.filter.as_deref().map(fold_for_match);
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        let mut results = Vec::new();
        for row in rows {
            if results.len() >= limit {
                break;
            }
            let track = row?;
            let matches = match (&needle, &track.display_name) {
                (None, _) => true,
                (Some(needle), Some(name)) => fold_for_match(name).contains(needle.as_str()),
                (Some(_), None) => false,
            };
            if matches {
                results.push(track);
            }
        }

        Ok(results)
    }

    fn count(&self) -> Result<u64, TrackError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn stats(&self) -> Result<TrackStats, TrackError> {
        let conn = self.lock()?;

        let (total, cached, failed, in_flight, oldest, newest) = conn.query_row(
            "SELECT COUNT(*),
                    SUM(CASE WHEN local_artwork IS NOT NULL THEN 1 ELSE 0 END),
                    SUM(CASE WHEN fetch_state = 'failed' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN fetch_state = 'in_flight' THEN 1 ELSE 0 END),
                    MIN(first_seen_at),
                    MAX(last_seen_at)
             FROM tracks",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )?;

        Ok(TrackStats {
            total_tracks: total as u64,
            cached_artwork: cached.unwrap_or(0) as u64,
            failed_artwork: failed.unwrap_or(0) as u64,
            in_flight: in_flight.unwrap_or(0) as u64,
            oldest_seen: oldest.as_deref().and_then(parse_time),
            newest_seen: newest.as_deref().and_then(parse_time),
        })
    }

    fn remove(&self, key: TrackKey) -> Result<(), TrackError> {
        let conn = self.lock()?;
        let rows_affected =
            conn.execute("DELETE FROM tracks WHERE track_id = ?", params![key.value()])?;

        if rows_affected == 0 {
            return Err(TrackError::NotFound(key));
        }

        Ok(())
    }

    fn begin_fetch(&self, key: TrackKey) -> Result<Option<Track>, TrackError> {
        self.transition(
            key,
            "UPDATE tracks SET fetch_state = 'in_flight'
             WHERE track_id = ?1
               AND remote_artwork IS NOT NULL
               AND local_artwork IS NULL
               AND fetch_state != 'in_flight'",
            None,
        )
    }

    fn complete_fetch(
        &self,
        key: TrackKey,
        location: &ContentLocation,
    ) -> Result<Option<Track>, TrackError> {
        self.transition(
            key,
            "UPDATE tracks SET local_artwork = ?2, fetch_state = 'idle'
             WHERE track_id = ?1 AND local_artwork IS NULL",
            Some(location),
        )
    }

    fn fail_fetch(&self, key: TrackKey) -> Result<Option<Track>, TrackError> {
        self.transition(
            key,
            "UPDATE tracks SET fetch_state = 'failed'
             WHERE track_id = ?1 AND fetch_state = 'in_flight'",
            None,
        )
    }

    fn release_fetch(&self, key: TrackKey) -> Result<Option<Track>, TrackError> {
        self.transition(
            key,
            "UPDATE tracks SET fetch_state = 'idle'
             WHERE track_id = ?1 AND fetch_state = 'in_flight'",
            None,
        )
    }

    fn reset_in_flight(&self) -> Result<usize, TrackError> {
        let conn = self.lock()?;
        let reset = conn.execute(
            "UPDATE tracks SET fetch_state = 'idle' WHERE fetch_state = 'in_flight'",
            [],
        )?;
        Ok(reset)
    }

    fn referenced_locations(&self) -> Result<Vec<ContentLocation>, TrackError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT local_artwork FROM tracks WHERE local_artwork IS NOT NULL")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut locations = Vec::new();
        for row in rows {
            locations.push(ContentLocation::new(row?));
        }
        Ok(locations)
    }

    fn session(&self) -> Result<SessionState, TrackError> {
        let conn = self.lock()?;

        let selected = Self::read_session_value(&conn, SESSION_SELECTED)?
            .and_then(|v| v.parse::<i64>().ok())
            .map(TrackKey::new);
        let last_active =
            Self::read_session_value(&conn, SESSION_LAST_ACTIVE)?.and_then(|v| parse_time(&v));

        Ok(SessionState {
            selected,
            last_active,
        })
    }

    fn select(&self, key: TrackKey) -> Result<(), TrackError> {
        let conn = self.lock()?;
        if !Self::exists(&conn, key)? {
            return Err(TrackError::NotFound(key));
        }
        Self::write_session_value(&conn, SESSION_SELECTED, &key.to_string())
    }

    fn touch_last_active(&self) -> Result<DateTime<Utc>, TrackError> {
        let conn = self.lock()?;
        let now = Utc::now();
        Self::write_session_value(&conn, SESSION_LAST_ACTIVE, &format_time(&now))?;
        Ok(now)
    }
}
