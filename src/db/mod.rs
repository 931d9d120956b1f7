// Catalog storage (SQLite via sqlx): creatures, moves, and the links between them.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreatureRecord {
    pub id: i64,
    pub name: String,
    pub type1: String,
    pub type2: Option<String>,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub special_attack: i32,
    pub special_defense: i32,
    pub speed: i32,
    pub artwork_url: Option<String>,
}

impl CreatureRecord {
    /// Declared types, primary first.
    pub fn types(&self) -> Vec<&str> {
        std::iter::once(self.type1.as_str())
            .chain(self.type2.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MoveRecord {
    pub id: i64,
    pub name: String,
    pub power: i32,
    #[serde(rename = "type")]
    pub move_type: String,
    pub description: Option<String>,
}

/// Persistence contract used by the synchronizer and the move selector.
///
/// A miss is `Ok(None)`, never an error. Every insert is idempotent: writing
/// a row whose key already exists is a no-op reported as `Ok(false)`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn creature_by_id(&self, id: i64) -> Result<Option<CreatureRecord>, StoreError>;

    /// Lookup by lowercase name.
    async fn creature_by_name(&self, name: &str) -> Result<Option<CreatureRecord>, StoreError>;

    async fn insert_creature(&self, creature: &CreatureRecord) -> Result<bool, StoreError>;

    /// Insert a creature and its move links atomically. Either both land or
    /// neither does. If the creature already exists nothing is written and
    /// the result is `Ok(false)`; its existing links are left alone.
    async fn insert_creature_with_links(
        &self,
        creature: &CreatureRecord,
        move_ids: &[i64],
    ) -> Result<bool, StoreError>;

    async fn move_by_id(&self, id: i64) -> Result<Option<MoveRecord>, StoreError>;

    async fn insert_move(&self, mv: &MoveRecord) -> Result<bool, StoreError>;

    async fn insert_link(&self, creature_id: i64, move_id: i64) -> Result<bool, StoreError>;

    async fn moves_for_creature(&self, creature_id: i64) -> Result<Vec<MoveRecord>, StoreError>;

    async fn list_creatures(&self) -> Result<Vec<CreatureRecord>, StoreError>;
}

const CREATURE_COLUMNS: &str = "id, name, type1, type2, hp, attack, defense, special_attack, special_defense, speed, artwork_url";

const INSERT_LINK: &str =
    "INSERT INTO pokemon_moves (pokemon_id, move_id) VALUES (?, ?) ON CONFLICT DO NOTHING";

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn insert_creature_query(creature: &CreatureRecord) -> SqliteQuery<'_> {
    sqlx::query(
        "INSERT INTO pokedex (id, name, type1, type2, hp, attack, defense, special_attack, special_defense, speed, artwork_url) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(creature.id)
    .bind(creature.name.to_lowercase())
    .bind(creature.type1.to_lowercase())
    .bind(creature.type2.as_ref().map(|t| t.to_lowercase()))
    .bind(creature.hp)
    .bind(creature.attack)
    .bind(creature.defense)
    .bind(creature.special_attack)
    .bind(creature.special_defense)
    .bind(creature.speed)
    .bind(&creature.artwork_url)
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect(database_url, 5).await
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pokedex (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                type1 TEXT NOT NULL,
                type2 TEXT,
                hp INTEGER NOT NULL,
                attack INTEGER NOT NULL,
                defense INTEGER NOT NULL,
                special_attack INTEGER NOT NULL,
                special_defense INTEGER NOT NULL,
                speed INTEGER NOT NULL,
                artwork_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moves (
                move_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                power INTEGER NOT NULL DEFAULT 0,
                type TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pokemon_moves (
                pokemon_id INTEGER NOT NULL REFERENCES pokedex(id) ON DELETE CASCADE,
                move_id INTEGER NOT NULL REFERENCES moves(move_id) ON DELETE CASCADE,
                PRIMARY KEY (pokemon_id, move_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of stored creatures.
    pub async fn count_creatures(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pokedex")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CatalogStore for Database {
    // ── Creatures ─────────────────────────────────────────────────────

    async fn creature_by_id(&self, id: i64) -> Result<Option<CreatureRecord>, StoreError> {
        let row = sqlx::query_as::<_, CreatureRecord>(&format!(
            "SELECT {CREATURE_COLUMNS} FROM pokedex WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn creature_by_name(&self, name: &str) -> Result<Option<CreatureRecord>, StoreError> {
        let row = sqlx::query_as::<_, CreatureRecord>(&format!(
            "SELECT {CREATURE_COLUMNS} FROM pokedex WHERE name = ?"
        ))
        .bind(name.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_creature(&self, creature: &CreatureRecord) -> Result<bool, StoreError> {
        let result = insert_creature_query(creature).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_creature_with_links(
        &self,
        creature: &CreatureRecord,
        move_ids: &[i64],
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = insert_creature_query(creature).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for move_id in move_ids {
            sqlx::query(INSERT_LINK)
                .bind(creature.id)
                .bind(*move_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_creatures(&self) -> Result<Vec<CreatureRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CreatureRecord>(&format!(
            "SELECT {CREATURE_COLUMNS} FROM pokedex ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Moves ─────────────────────────────────────────────────────────

    async fn move_by_id(&self, id: i64) -> Result<Option<MoveRecord>, StoreError> {
        let row = sqlx::query_as::<_, MoveRecord>(
            "SELECT move_id AS id, name, power, type AS move_type, description FROM moves WHERE move_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_move(&self, mv: &MoveRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO moves (move_id, name, power, type, description) VALUES (?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(mv.id)
        .bind(&mv.name)
        .bind(mv.power)
        .bind(mv.move_type.to_lowercase())
        .bind(&mv.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Links ─────────────────────────────────────────────────────────

    async fn insert_link(&self, creature_id: i64, move_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(INSERT_LINK)
            .bind(creature_id)
            .bind(move_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn moves_for_creature(&self, creature_id: i64) -> Result<Vec<MoveRecord>, StoreError> {
        let rows = sqlx::query_as::<_, MoveRecord>(
            "SELECT m.move_id AS id, m.name, m.power, m.type AS move_type, m.description \
             FROM pokemon_moves pm JOIN moves m ON m.move_id = pm.move_id \
             WHERE pm.pokemon_id = ? ORDER BY m.move_id",
        )
        .bind(creature_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
