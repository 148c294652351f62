//! SQLite ledger store for local and embedded deployments.
//!
//! Mirrors the PostgreSQL store's semantics. SQLite serializes writers
//! globally, so the guarded `UPDATE ... WHERE current_stock >= ?` is the
//! whole read-modify-write: the first statement of the movement transaction
//! takes the write lock, and a concurrent exit that would drive stock
//! negative simply matches zero rows.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ActorId, AppliedMovement, EntryId, LedgerEntry, MovementDirection, MovementRecord, NewProduct,
    Product, ProductFilter, ProductId, ProductUpdate,
};
use crate::infra::{LedgerError, LedgerStore, Result};

/// SQLite-backed ledger store
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct SqliteProductRow {
    id: String,
    code: String,
    name: String,
    category: String,
    current_stock: i64,
    created_at: String,
    updated_at: String,
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| LedgerError::Internal(format!("invalid {what} in row: {s}")))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LedgerError::Internal(format!("invalid timestamp in row: {s}")))
}

fn encode_instant(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TryFrom<SqliteProductRow> for Product {
    type Error = LedgerError;

    fn try_from(row: SqliteProductRow) -> Result<Self> {
        Ok(Product {
            id: ProductId::from_uuid(parse_uuid(&row.id, "product id")?),
            code: row.code,
            name: row.name,
            category: row.category,
            current_stock: row.current_stock,
            created_at: parse_instant(&row.created_at)?,
            updated_at: parse_instant(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct SqliteEntryRow {
    id: String,
    product_id: String,
    user_id: String,
    user_email: String,
    direction: String,
    quantity: i64,
    content_hash: String,
    proof_reference: Option<String>,
    created_at: String,
}

impl TryFrom<SqliteEntryRow> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(row: SqliteEntryRow) -> Result<Self> {
        let direction = MovementDirection::parse(&row.direction).ok_or_else(|| {
            LedgerError::Internal(format!("invalid direction in ledger row: {}", row.direction))
        })?;
        let content_hash = hex::decode(&row.content_hash)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| LedgerError::Internal("invalid content hash in ledger row".into()))?;

        Ok(LedgerEntry {
            id: EntryId::from_uuid(parse_uuid(&row.id, "entry id")?),
            product_id: ProductId::from_uuid(parse_uuid(&row.product_id, "product id")?),
            user_id: ActorId::from_uuid(parse_uuid(&row.user_id, "user id")?),
            user_email: row.user_email,
            direction,
            quantity: row.quantity,
            content_hash,
            proof_reference: row.proof_reference,
            created_at: parse_instant(&row.created_at)?,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, product_id, user_id, user_email, direction, quantity, \
     content_hash, proof_reference, created_at";

const PRODUCT_COLUMNS: &str = "id, code, name, category, current_stock, created_at, updated_at";

fn unique_conflict(e: sqlx::Error, message: &str) -> LedgerError {
    match &e {
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            LedgerError::Conflict(message.to_string())
        }
        _ => e.into(),
    }
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) a database file and run migrations.
    pub async fn from_path(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| LedgerError::Internal(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Run embedded migrations on the pool.
    pub async fn initialize(&self) -> Result<()> {
        crate::migrations::run_sqlite(&self.pool)
            .await
            .map_err(|e| LedgerError::Internal(e.to_string()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn validate_quantity(record: &MovementRecord) -> Result<()> {
        if record.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(record.quantity));
        }
        Ok(())
    }

    async fn insert_entry_tx(
        tx: &mut Transaction<'_, Sqlite>,
        record: &MovementRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, product_id, user_id, user_email,
                direction, quantity, content_hash, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.entry_id.0.to_string())
        .bind(record.product_id.0.to_string())
        .bind(record.actor.actor_id.0.to_string())
        .bind(&record.actor.email)
        .bind(record.direction.as_str())
        .bind(record.quantity)
        .bind(hex::encode(record.content_hash))
        .bind(encode_instant(&record.created_at))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn name_taken(&self, name: &str, exclude: Option<ProductId>) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM products WHERE LOWER(name) = LOWER(?)")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((id,)) => exclude.map_or(true, |p| p.0.to_string() != id),
            None => false,
        })
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    #[instrument(skip(self, new_product), fields(code = %new_product.code))]
    async fn create_product(&self, new_product: NewProduct) -> Result<Product> {
        if new_product.code.is_empty() {
            return Err(LedgerError::InvalidArgument("product code is empty".into()));
        }
        if new_product.current_stock < 0 {
            return Err(LedgerError::InvalidArgument(
                "initial stock must not be negative".into(),
            ));
        }

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM products WHERE code = ?")
                .bind(&new_product.code)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(LedgerError::Conflict(
                "a product with this code already exists".into(),
            ));
        }
        if self.name_taken(&new_product.name, None).await? {
            return Err(LedgerError::Conflict(
                "a product with this name already exists".into(),
            ));
        }

        let now = encode_instant(&Utc::now());
        let row: SqliteProductRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO products (id, code, name, category, current_stock, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new_product.code)
        .bind(&new_product.name)
        .bind(&new_product.category)
        .bind(new_product.current_stock)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "a product with this code or name already exists"))?;

        row.try_into()
    }

    async fn product_by_id(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row: Option<SqliteProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(product_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let rows: Vec<SqliteProductRow> = if let Some(code) = &filter.code {
            sqlx::query_as(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?"
            ))
            .bind(code)
            .fetch_all(&self.pool)
            .await?
        } else if let Some(name) = &filter.name {
            sqlx::query_as(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products \
                 WHERE name LIKE ? COLLATE NOCASE ORDER BY name"
            ))
            .bind(format!("%{}%", name))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, update), fields(product_id = %product_id))]
    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        if update.current_stock.is_some() && update.add_stock.is_some() {
            return Err(LedgerError::InvalidArgument(
                "use only current_stock or add_stock".into(),
            ));
        }
        if let Some(stock) = update.current_stock {
            if stock < 0 {
                return Err(LedgerError::InvalidArgument(
                    "current_stock must not be negative".into(),
                ));
            }
        }

        if self.product_by_id(product_id).await?.is_none() {
            return Err(LedgerError::ProductNotFound(product_id.0));
        }

        if let Some(name) = &update.name {
            if self.name_taken(name, Some(product_id)).await? {
                return Err(LedgerError::Conflict(
                    "another product with this name already exists".into(),
                ));
            }
        }

        let row: Option<SqliteProductRow> = sqlx::query_as(&format!(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                category = COALESCE(?3, category),
                current_stock = CASE
                    WHEN ?4 IS NOT NULL THEN ?4
                    WHEN ?5 IS NOT NULL THEN current_stock + ?5
                    ELSE current_stock
                END,
                updated_at = ?6
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.0.to_string())
        .bind(update.name.as_deref())
        .bind(update.category.as_deref())
        .bind(update.current_stock)
        .bind(update.add_stock)
        .bind(encode_instant(&Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::CheckViolation) =>
            {
                LedgerError::InvalidArgument("stock balance must not go negative".into())
            }
            _ => e.into(),
        })?;

        row.ok_or(LedgerError::ProductNotFound(product_id.0))?
            .try_into()
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(product_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db)
                    if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation) =>
                {
                    LedgerError::Conflict("product still has ledger entries".into())
                }
                _ => e.into(),
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, record), fields(product_id = %record.product_id, quantity = record.quantity))]
    async fn apply_entry(&self, record: MovementRecord) -> Result<AppliedMovement> {
        Self::validate_quantity(&record)?;

        let mut tx = self.pool.begin().await?;

        let row: Option<SqliteProductRow> = sqlx::query_as(&format!(
            r#"
            UPDATE products
            SET current_stock = current_stock + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(record.product_id.0.to_string())
        .bind(record.quantity)
        .bind(encode_instant(&record.created_at))
        .fetch_optional(&mut *tx)
        .await?;

        let product: Product = row
            .ok_or(LedgerError::ProductNotFound(record.product_id.0))?
            .try_into()?;

        Self::insert_entry_tx(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(AppliedMovement {
            product,
            entry: LedgerEntry::from_record(record),
        })
    }

    #[instrument(skip(self, record), fields(product_id = %record.product_id, quantity = record.quantity))]
    async fn apply_exit(&self, record: MovementRecord) -> Result<AppliedMovement> {
        Self::validate_quantity(&record)?;

        let mut tx = self.pool.begin().await?;

        let row: Option<SqliteProductRow> = sqlx::query_as(&format!(
            r#"
            UPDATE products
            SET current_stock = current_stock - ?2, updated_at = ?3
            WHERE id = ?1 AND current_stock >= ?2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(record.product_id.0.to_string())
        .bind(record.quantity)
        .bind(encode_instant(&record.created_at))
        .fetch_optional(&mut *tx)
        .await?;

        let product: Product = match row {
            Some(row) => row.try_into()?,
            None => {
                let available: Option<(i64,)> =
                    sqlx::query_as("SELECT current_stock FROM products WHERE id = ?")
                        .bind(record.product_id.0.to_string())
                        .fetch_optional(&mut *tx)
                        .await?;

                return Err(match available {
                    Some((available,)) => LedgerError::InsufficientStock {
                        product_id: record.product_id.0,
                        requested: record.quantity,
                        available,
                    },
                    None => LedgerError::ProductNotFound(record.product_id.0),
                });
            }
        };

        Self::insert_entry_tx(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(AppliedMovement {
            product,
            entry: LedgerEntry::from_record(record),
        })
    }

    async fn attach_proof(&self, entry_id: EntryId, proof_reference: &str) -> Result<()> {
        let result = sqlx::query("UPDATE ledger_entries SET proof_reference = ? WHERE id = ?")
            .bind(proof_reference)
            .bind(entry_id.0.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::EntryNotFound(entry_id.0));
        }
        Ok(())
    }

    async fn entry_by_id(&self, entry_id: EntryId) -> Result<Option<LedgerEntry>> {
        let row: Option<SqliteEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = ?"
        ))
        .bind(entry_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<SqliteEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn entries_by_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<SqliteEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE product_id = ? ORDER BY seq"
        ))
        .bind(product_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn entries_by_actor(&self, actor_id: ActorId) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<SqliteEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE user_id = ? ORDER BY seq"
        ))
        .bind(actor_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_unanchored(&self) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<SqliteEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE proof_reference IS NULL ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_entry(&self, entry_id: EntryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE id = ?")
            .bind(entry_id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
