use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, GameId, LineId, Money, OrderId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Game, GameRepository, LineRepository, Order, OrderLine, OrderRepository, OrderStatus, Result,
    StoreError,
};

/// PostgreSQL-backed store implementation.
///
/// The stock floor and the one-open-cart rule are enforced in SQL:
/// `adjust_stock` is a single conditional UPDATE, and the partial unique
/// index `uniq_open_order_per_customer` turns a get-or-create race into a
/// constraint violation the caller can recover from.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_game(row: &PgRow) -> Result<Game> {
        Ok(Game {
            id: GameId::from_uuid(row.try_get::<Uuid, _>("id").map_err(StoreError::Database)?),
            key: row.try_get("key").map_err(StoreError::Database)?,
            name: row.try_get("name").map_err(StoreError::Database)?,
            price: Money::from_cents(
                row.try_get::<i64, _>("price_cents")
                    .map_err(StoreError::Database)?,
            ),
            unit_in_stock: row
                .try_get::<i32, _>("unit_in_stock")
                .map_err(StoreError::Database)?
                .try_into()
                .unwrap_or(0),
            discount: row
                .try_get::<i16, _>("discount")
                .map_err(StoreError::Database)?
                .try_into()
                .unwrap_or(0),
            is_deleted: row.try_get("is_deleted").map_err(StoreError::Database)?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status").map_err(StoreError::Database)?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id").map_err(StoreError::Database)?),
            customer_id: CustomerId::from_uuid(
                row.try_get::<Uuid, _>("customer_id")
                    .map_err(StoreError::Database)?,
            ),
            date: row
                .try_get::<Option<DateTime<Utc>>, _>("date")
                .map_err(StoreError::Database)?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: LineId::from_uuid(row.try_get::<Uuid, _>("id").map_err(StoreError::Database)?),
            order_id: OrderId::from_uuid(
                row.try_get::<Uuid, _>("order_id")
                    .map_err(StoreError::Database)?,
            ),
            game_id: GameId::from_uuid(
                row.try_get::<Uuid, _>("game_id")
                    .map_err(StoreError::Database)?,
            ),
            price: Money::from_cents(
                row.try_get::<i64, _>("price_cents")
                    .map_err(StoreError::Database)?,
            ),
            quantity: row
                .try_get::<i32, _>("quantity")
                .map_err(StoreError::Database)?
                .try_into()
                .unwrap_or(1),
            discount: row
                .try_get::<i16, _>("discount")
                .map_err(StoreError::Database)?
                .try_into()
                .unwrap_or(0),
        })
    }
}

#[async_trait]
impl GameRepository for PostgresStore {
    async fn game(&self, id: GameId) -> Result<Option<Game>> {
        let row = sqlx::query("SELECT * FROM games WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_game).transpose()
    }

    async fn game_by_key(&self, key: &str) -> Result<Option<Game>> {
        let row = sqlx::query("SELECT * FROM games WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_game).transpose()
    }

    async fn insert_game(&self, game: Game) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO games (id, key, name, price_cents, unit_in_stock, discount, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(game.id.as_uuid())
        .bind(&game.key)
        .bind(&game.name)
        .bind(game.price.cents())
        .bind(i32::try_from(game.unit_in_stock).unwrap_or(i32::MAX))
        .bind(i16::from(game.discount))
        .bind(game.is_deleted)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn adjust_stock(&self, id: GameId, delta: i64) -> Result<Game> {
        // Conditional UPDATE: the availability check and the write are one
        // statement, so concurrent adjustments serialize on the row lock
        // and the counter can never cross zero.
        let row = sqlx::query(
            r#"
            UPDATE games
            SET unit_in_stock = unit_in_stock + $2
            WHERE id = $1 AND unit_in_stock + $2 >= 0
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Self::row_to_game(row),
            None => match GameRepository::game(self, id).await? {
                Some(game) => Err(StoreError::InsufficientStock {
                    game_id: id,
                    requested: delta.unsigned_abs().try_into().unwrap_or(u32::MAX),
                    available: game.unit_in_stock,
                }),
                None => Err(StoreError::NotFound(format!("game {id}"))),
            },
        }
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT * FROM orders ORDER BY date NULLS FIRST, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn find_open_order(&self, customer_id: CustomerId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE customer_id = $1 AND status = 'Open'")
            .bind(customer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn insert_open_order(&self, order: Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, date, status)
            VALUES ($1, $2, $3, 'Open')
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.date)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("uniq_open_order_per_customer")
            {
                return StoreError::OpenCartExists(order.customer_id);
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn set_shipped(&self, id: OrderId, date: DateTime<Utc>) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'Shipped', date = $2
            WHERE id = $1 AND status = 'Open'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Self::row_to_order(row),
            None => match OrderRepository::order(self, id).await? {
                Some(_) => Err(StoreError::NotOpen(id)),
                None => Err(StoreError::NotFound(format!("order {id}"))),
            },
        }
    }
}

#[async_trait]
impl LineRepository for PostgresStore {
    async fn line(&self, id: LineId) -> Result<Option<OrderLine>> {
        let row = sqlx::query("SELECT * FROM order_lines WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_line).transpose()
    }

    async fn find_line(&self, order_id: OrderId, game_id: GameId) -> Result<Option<OrderLine>> {
        let row = sqlx::query("SELECT * FROM order_lines WHERE order_id = $1 AND game_id = $2")
            .bind(order_id.as_uuid())
            .bind(game_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_line).transpose()
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query("SELECT * FROM order_lines WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_line).collect()
    }

    async fn insert_line(&self, line: OrderLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_id, game_id, price_cents, quantity, discount)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.order_id.as_uuid())
        .bind(line.game_id.as_uuid())
        .bind(line.price.cents())
        .bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
        .bind(i16::from(line.discount))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_line(&self, line: OrderLine) -> Result<OrderLine> {
        // Insert-or-merge in one statement: concurrent adds of the same
        // game serialize on the (order_id, game_id) unique constraint
        // instead of racing a find-then-update sequence.
        let row = sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_id, game_id, price_cents, quantity, discount)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id, game_id) DO UPDATE
            SET quantity = order_lines.quantity + EXCLUDED.quantity,
                price_cents = EXCLUDED.price_cents,
                discount = EXCLUDED.discount
            RETURNING *
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.order_id.as_uuid())
        .bind(line.game_id.as_uuid())
        .bind(line.price.cents())
        .bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
        .bind(i16::from(line.discount))
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_line(&row)
    }

    async fn set_quantity(&self, id: LineId, expected: u32, quantity: u32) -> Result<OrderLine> {
        let row = sqlx::query(
            r#"
            UPDATE order_lines
            SET quantity = $3
            WHERE id = $1 AND quantity = $2
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(i32::try_from(expected).unwrap_or(i32::MAX))
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Self::row_to_line(row),
            None => match LineRepository::line(self, id).await? {
                Some(line) => Err(StoreError::ConcurrencyConflict {
                    line_id: id,
                    expected,
                    actual: line.quantity,
                }),
                None => Err(StoreError::NotFound(format!("line {id}"))),
            },
        }
    }

    async fn delete_line(&self, id: LineId) -> Result<()> {
        sqlx::query("DELETE FROM order_lines WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
