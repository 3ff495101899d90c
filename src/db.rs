//! SQLite storage for crafting saves.
//!
//! Station snapshots are stored as JSON blobs next to the clock reading they
//! were captured with; players keep their crafting XP and inventory JSON.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use crate::crafting::{StationSnapshot, WorldSnapshot};
use crate::data::ItemRegistry;
use crate::item::Inventory;
use crate::player::Player;
use crate::skills::Skill;

const UPSERT_CLOCK: &str = r#"INSERT INTO world_clock (id, elapsed) VALUES (1, ?)
   ON CONFLICT(id) DO UPDATE SET elapsed = excluded.elapsed, saved_at = CURRENT_TIMESTAMP"#;

const UPSERT_STATION: &str = r#"INSERT INTO station_snapshots (station_id, snapshot_json) VALUES (?, ?)
   ON CONFLICT(station_id) DO UPDATE SET
       snapshot_json = excluded.snapshot_json, saved_at = CURRENT_TIMESTAMP"#;

const UPSERT_PLAYER: &str = r#"INSERT INTO players (id, name, crafting_xp, inventory_json) VALUES (?, ?, ?, ?)
   ON CONFLICT(id) DO UPDATE SET
       name = excluded.name,
       crafting_xp = excluded.crafting_xp,
       inventory_json = excluded.inventory_json,
       last_saved = CURRENT_TIMESTAMP"#;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS world_clock (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                elapsed REAL NOT NULL DEFAULT 0,
                saved_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS station_snapshots (
                station_id TEXT PRIMARY KEY,
                snapshot_json TEXT NOT NULL,
                saved_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                crafting_xp INTEGER NOT NULL DEFAULT 0,
                inventory_json TEXT NOT NULL DEFAULT '[]',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                last_saved DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Save the clock, every station and every player in one transaction.
    ///
    /// Ingredients leave an inventory when a craft starts, so stations and
    /// players are only consistent when written together.
    pub async fn save_all(&self, world: &WorldSnapshot, players: &[Player]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(UPSERT_CLOCK)
            .bind(world.clock)
            .execute(&mut *tx)
            .await?;

        for (station_id, snapshot) in &world.stations {
            let json = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
            sqlx::query(UPSERT_STATION)
                .bind(station_id)
                .bind(&json)
                .execute(&mut *tx)
                .await?;
        }

        for player in players {
            sqlx::query(UPSERT_PLAYER)
                .bind(&player.id)
                .bind(&player.name)
                .bind(player.crafting.xp)
                .bind(player.inventory.to_json())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    /// Load the last saved world, if anything was ever saved
    pub async fn load_world(&self) -> Result<Option<WorldSnapshot>, sqlx::Error> {
        let clock_row = sqlx::query("SELECT elapsed FROM world_clock WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        let Some(clock_row) = clock_row else {
            return Ok(None);
        };

        let rows = sqlx::query("SELECT station_id, snapshot_json FROM station_snapshots ORDER BY station_id")
            .fetch_all(&self.pool)
            .await?;

        let mut stations = Vec::with_capacity(rows.len());
        for row in rows {
            let station_id: String = row.get("station_id");
            let json: String = row.get("snapshot_json");
            match serde_json::from_str::<StationSnapshot>(&json) {
                Ok(snapshot) => stations.push((station_id, snapshot)),
                Err(e) => tracing::warn!("Skipping unreadable snapshot for station {}: {}", station_id, e),
            }
        }

        Ok(Some(WorldSnapshot {
            clock: clock_row.get("elapsed"),
            stations,
        }))
    }

    /// Save one player outside a world save (used when a player is created)
    pub async fn save_player(&self, player: &Player) -> Result<(), sqlx::Error> {
        sqlx::query(UPSERT_PLAYER)
            .bind(&player.id)
            .bind(&player.name)
            .bind(player.crafting.xp)
            .bind(player.inventory.to_json())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn load_players(&self, items: Arc<ItemRegistry>) -> Result<Vec<Player>, sqlx::Error> {
        let rows = sqlx::query("SELECT id, name, crafting_xp, inventory_json FROM players")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let inventory_json: String = r.get("inventory_json");
                Player {
                    id: r.get("id"),
                    name: r.get("name"),
                    inventory: Inventory::from_json(&inventory_json, items.clone()),
                    crafting: Skill::from_xp(r.get("crafting_xp")),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crafting::CraftingState;
    use crate::data::ItemDefinition;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Database {
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());
        Database::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_world_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        assert!(db.load_world().await.unwrap().is_none());

        let world = WorldSnapshot {
            clock: 120.5,
            stations: vec![(
                "forge".to_string(),
                StationSnapshot {
                    state: CraftingState::Crafting,
                    start_time: 118.0,
                    recipe_id: "hunting_bow".to_string(),
                    crafter_id: "p1".to_string(),
                    progress: 0.25,
                    output_item_id: "arrow".to_string(),
                    output_amount: 6,
                },
            )],
        };
        db.save_all(&world, &[]).await.unwrap();
        db.save_all(&world, &[]).await.unwrap();

        assert_eq!(db.load_world().await.unwrap(), Some(world));
    }

    #[tokio::test]
    async fn test_player_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let items = Arc::new(ItemRegistry::from_items([ItemDefinition::new("wood", "Wood", 99)]));

        let mut player = Player::new("p1", "Ash", items.clone(), 3);
        player.inventory.add_item("wood", 7);
        db.save_player(&player).await.unwrap();

        let loaded = db.load_players(items).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Ash");
        assert_eq!(loaded[0].crafting.level, 3);
        assert_eq!(loaded[0].inventory.count_item("wood"), 7);
    }

    #[tokio::test]
    async fn test_save_all_writes_stations_and_players_together() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let items = Arc::new(ItemRegistry::from_items([ItemDefinition::new("wood", "Wood", 99)]));

        let mut player = Player::new("p1", "Ash", items.clone(), 2);
        player.inventory.add_item("wood", 7);
        db.save_player(&player).await.unwrap();

        // The craft took 5 wood; both sides must land or neither
        player.inventory.remove_item("wood", 5);
        let world = WorldSnapshot {
            clock: 12.0,
            stations: vec![(
                "bench".to_string(),
                StationSnapshot {
                    state: CraftingState::Crafting,
                    start_time: 10.0,
                    recipe_id: "hunting_bow".to_string(),
                    crafter_id: "p1".to_string(),
                    ..Default::default()
                },
            )],
        };
        db.save_all(&world, std::slice::from_ref(&player)).await.unwrap();

        assert_eq!(db.load_world().await.unwrap(), Some(world));
        let loaded = db.load_players(items).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].inventory.count_item("wood"), 2);
    }

    #[tokio::test]
    async fn test_failed_save_all_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let items = Arc::new(ItemRegistry::new());

        sqlx::query("DROP TABLE players").execute(&db.pool).await.unwrap();
        let world = WorldSnapshot {
            clock: 5.0,
            stations: vec![("bench".to_string(), StationSnapshot::default())],
        };
        let player = Player::new("p1", "Ash", items, 1);
        assert!(db.save_all(&world, &[player]).await.is_err());

        assert!(db.load_world().await.unwrap().is_none());
    }
}
