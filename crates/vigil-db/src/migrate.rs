//! Schema migrations.
//!
//! A migration is one plain SQL file under `migrations/`, applied in
//! filename order (`001_...`, `002_...`). Everything above the
//! `-- migrate:down` marker is the apply script, everything below it the
//! revert script; the `-- migrate:up` header is just a comment to the
//! server. Whole scripts run as-is through the simple query protocol, so
//! there is no statement splitting here. Applied files are recorded by
//! name in `_vigil_migrations`.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::info;

use crate::DbError;

const DOWN_MARKER: &str = "-- migrate:down";

/// One parsed migration file.
#[derive(Debug, Clone)]
pub struct Migration {
    /// File stem, e.g. `001_core_schema`; doubles as the ledger key.
    pub name: String,
    up: String,
    down: String,
}

impl Migration {
    fn parse(name: &str, text: &str) -> Result<Self, DbError> {
        let (up, down) = match text.split_once(DOWN_MARKER) {
            Some((up, down)) => (up, down),
            None => (text, ""),
        };

        if !has_statements(up) {
            return Err(DbError::BadMigration {
                file: name.to_string(),
                reason: "no SQL above the down marker",
            });
        }

        Ok(Self {
            name: name.to_string(),
            up: up.to_string(),
            down: down.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, DbError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| DbError::BadMigration {
                file: path.display().to_string(),
                reason: "unreadable file name",
            })?
            .to_string();
        let text = fs::read_to_string(path)?;
        Self::parse(&name, &text)
    }

    /// Whether the file carries a revert script.
    pub fn reversible(&self) -> bool {
        has_statements(&self.down)
    }
}

fn has_statements(sql: &str) -> bool {
    sql.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"))
}

/// The crate's own migration directory.
pub fn migrations_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

/// All `.sql` files in `dir`, sorted by filename.
pub fn load_migrations(dir: &Path) -> Result<Vec<Migration>, DbError> {
    let mut migrations = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("sql") {
            migrations.push(Migration::from_file(&path)?);
        }
    }
    migrations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(migrations)
}

/// Apply every migration not yet in the ledger; returns the names run, in
/// order.
pub async fn apply_pending(pool: &PgPool, dir: &Path) -> Result<Vec<String>, DbError> {
    ensure_ledger(pool).await?;
    let applied = applied_names(pool).await?;

    let mut ran = Vec::new();
    for migration in load_migrations(dir)? {
        if applied.contains(&migration.name) {
            continue;
        }
        info!(name = %migration.name, "applying migration");
        sqlx::raw_sql(&migration.up).execute(pool).await?;
        sqlx::query("INSERT INTO _vigil_migrations (name) VALUES ($1)")
            .bind(&migration.name)
            .execute(pool)
            .await?;
        ran.push(migration.name);
    }
    Ok(ran)
}

/// Revert the most recently applied migration, if any.
pub async fn revert_last(pool: &PgPool, dir: &Path) -> Result<Option<String>, DbError> {
    ensure_ledger(pool).await?;

    let last = sqlx::query("SELECT name FROM _vigil_migrations ORDER BY name DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    let Some(name) = last.map(|row| row.get::<String, _>("name")) else {
        return Ok(None);
    };

    let migration = load_migrations(dir)?
        .into_iter()
        .find(|m| m.name == name)
        .ok_or_else(|| DbError::BadMigration {
            file: name.clone(),
            reason: "applied migration is missing on disk",
        })?;
    if !migration.reversible() {
        return Err(DbError::BadMigration {
            file: name,
            reason: "no SQL below the down marker",
        });
    }

    info!(name = %migration.name, "reverting migration");
    sqlx::raw_sql(&migration.down).execute(pool).await?;
    sqlx::query("DELETE FROM _vigil_migrations WHERE name = $1")
        .bind(&migration.name)
        .execute(pool)
        .await?;

    Ok(Some(migration.name))
}

/// One row of `ledger`: a known migration and when it ran, if it did.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub name: String,
    pub run_at: Option<DateTime<Utc>>,
}

/// Disk and ledger merged: pending files carry no timestamp, applied files
/// carry theirs, and applied names whose file has since vanished are kept
/// so the drift is visible.
pub async fn ledger(pool: &PgPool, dir: &Path) -> Result<Vec<LedgerEntry>, DbError> {
    ensure_ledger(pool).await?;

    let rows = sqlx::query("SELECT name, run_at FROM _vigil_migrations")
        .fetch_all(pool)
        .await?;
    let mut applied: BTreeMap<String, DateTime<Utc>> = rows
        .into_iter()
        .map(|row| (row.get("name"), row.get("run_at")))
        .collect();

    let mut entries: Vec<LedgerEntry> = load_migrations(dir)?
        .into_iter()
        .map(|migration| {
            let run_at = applied.remove(&migration.name);
            LedgerEntry {
                name: migration.name,
                run_at,
            }
        })
        .collect();
    entries.extend(
        applied
            .into_iter()
            .map(|(name, run_at)| LedgerEntry {
                name,
                run_at: Some(run_at),
            }),
    );
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

async fn ensure_ledger(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _vigil_migrations (
            name TEXT PRIMARY KEY,
            run_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn applied_names(pool: &PgPool) -> Result<HashSet<String>, DbError> {
    let rows = sqlx::query("SELECT name FROM _vigil_migrations")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|row| row.get("name")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_the_down_marker() {
        let text = "-- migrate:up\nCREATE TABLE a (id INT);\n-- migrate:down\nDROP TABLE a;\n";
        let migration = Migration::parse("001_a", text).unwrap();
        assert!(migration.up.contains("CREATE TABLE a"));
        assert!(!migration.up.contains("DROP TABLE"));
        assert!(migration.down.contains("DROP TABLE a"));
        assert!(migration.reversible());
    }

    #[test]
    fn a_file_without_a_down_marker_is_irreversible() {
        let migration = Migration::parse("002_b", "CREATE TABLE b (id INT);\n").unwrap();
        assert!(!migration.reversible());
    }

    #[test]
    fn comment_only_files_are_rejected() {
        let result = Migration::parse("003_c", "-- nothing here\n\n-- migrate:down\n");
        assert!(matches!(
            result,
            Err(DbError::BadMigration {
                reason: "no SQL above the down marker",
                ..
            })
        ));
    }

    #[test]
    fn shipped_migrations_load_in_filename_order() {
        let migrations = load_migrations(&migrations_dir()).unwrap();
        assert!(!migrations.is_empty());
        assert_eq!(migrations[0].name, "001_core_schema");
        assert!(migrations[0].reversible());

        let names: Vec<&str> = migrations.iter().map(|m| m.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
