//! PostgreSQL ledger store implementation.
//!
//! # Atomicity
//!
//! Each movement runs the stock mutation and the ledger append in one
//! transaction. Exits lock the product row first:
//!
//! ```sql
//! BEGIN;
//! SELECT current_stock FROM products WHERE id = $1 FOR UPDATE;
//! -- check sufficiency, decrement, insert the ledger row
//! COMMIT;
//! ```
//!
//! The row lock serializes conflicting movements per product while leaving
//! other products fully concurrent. `ledger_entries.seq` is assigned while
//! the lock is held, so per-product ledger order matches commit order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ActorId, AppliedMovement, EntryId, LedgerEntry, MovementDirection, MovementRecord, NewProduct,
    Product, ProductFilter, ProductId, ProductUpdate,
};
use crate::infra::{LedgerError, LedgerStore, Result};

/// PostgreSQL-backed ledger store
pub struct PgLedgerStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct PgProductRow {
    id: Uuid,
    code: String,
    name: String,
    category: String,
    current_stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PgProductRow> for Product {
    fn from(row: PgProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            category: row.category,
            current_stock: row.current_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PgEntryRow {
    id: Uuid,
    product_id: Uuid,
    user_id: Uuid,
    user_email: String,
    direction: String,
    quantity: i64,
    content_hash: String,
    proof_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PgEntryRow> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(row: PgEntryRow) -> Result<Self> {
        let direction = MovementDirection::parse(&row.direction).ok_or_else(|| {
            LedgerError::Internal(format!("invalid direction in ledger row: {}", row.direction))
        })?;
        let content_hash = hex::decode(row.content_hash.trim())
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| LedgerError::Internal("invalid content hash in ledger row".into()))?;

        Ok(LedgerEntry {
            id: EntryId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            user_id: ActorId::from_uuid(row.user_id),
            user_email: row.user_email,
            direction,
            quantity: row.quantity,
            content_hash,
            proof_reference: row.proof_reference,
            created_at: row.created_at,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, product_id, user_id, user_email, direction, quantity, \
     content_hash, proof_reference, created_at";

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

impl PgLedgerStore {
    /// Create a new PostgreSQL ledger store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn validate_quantity(record: &MovementRecord) -> Result<()> {
        if record.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(record.quantity));
        }
        Ok(())
    }

    async fn insert_entry_tx(
        tx: &mut Transaction<'_, Postgres>,
        record: &MovementRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, product_id, user_id, user_email,
                direction, quantity, content_hash, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.entry_id.0)
        .bind(record.product_id.0)
        .bind(record.actor.actor_id.0)
        .bind(&record.actor.email)
        .bind(record.direction.as_str())
        .bind(record.quantity)
        .bind(hex::encode(record.content_hash))
        .bind(record.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn name_taken(&self, name: &str, exclude: Option<ProductId>) -> Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM products WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((id,)) => exclude.map_or(true, |p| p.0 != id),
            None => false,
        })
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
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

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE code = $1")
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

        let row: PgProductRow = sqlx::query_as(
            r#"
            INSERT INTO products (id, code, name, category, current_stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, code, name, category, current_stock, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_product.code)
        .bind(&new_product.name)
        .bind(&new_product.category)
        .bind(new_product.current_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "a product with this code or name already exists"))?;

        Ok(row.into())
    }

    async fn product_by_id(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgProductRow> = sqlx::query_as(
            "SELECT id, code, name, category, current_stock, created_at, updated_at \
             FROM products WHERE id = $1",
        )
        .bind(product_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let rows: Vec<PgProductRow> = if let Some(code) = &filter.code {
            sqlx::query_as(
                "SELECT id, code, name, category, current_stock, created_at, updated_at \
                 FROM products WHERE code = $1",
            )
            .bind(code)
            .fetch_all(&self.pool)
            .await?
        } else if let Some(name) = &filter.name {
            sqlx::query_as(
                "SELECT id, code, name, category, current_stock, created_at, updated_at \
                 FROM products WHERE name ILIKE $1 ORDER BY name",
            )
            .bind(format!("%{}%", name))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, code, name, category, current_stock, created_at, updated_at \
                 FROM products ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.into_iter().map(Into::into).collect())
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

        let row: Option<PgProductRow> = sqlx::query_as(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                current_stock = CASE
                    WHEN $4::BIGINT IS NOT NULL THEN $4
                    WHEN $5::BIGINT IS NOT NULL THEN current_stock + $5
                    ELSE current_stock
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, code, name, category, current_stock, created_at, updated_at
            "#,
        )
        .bind(product_id.0)
        .bind(update.name.as_deref())
        .bind(update.category.as_deref())
        .bind(update.current_stock)
        .bind(update.add_stock)
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

        row.map(Into::into)
            .ok_or(LedgerError::ProductNotFound(product_id.0))
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id.0)
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

        let row: Option<PgProductRow> = sqlx::query_as(
            r#"
            UPDATE products
            SET current_stock = current_stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, code, name, category, current_stock, created_at, updated_at
            "#,
        )
        .bind(record.product_id.0)
        .bind(record.quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let product: Product = row
            .ok_or(LedgerError::ProductNotFound(record.product_id.0))?
            .into();

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

        // Lock the product row so the sufficiency check and the decrement are
        // one serialized read-modify-write.
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT current_stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(record.product_id.0)
                .fetch_optional(&mut *tx)
                .await?;

        let available = match row {
            Some((available,)) => available,
            None => return Err(LedgerError::ProductNotFound(record.product_id.0)),
        };
        if available < record.quantity {
            return Err(LedgerError::InsufficientStock {
                product_id: record.product_id.0,
                requested: record.quantity,
                available,
            });
        }

        let product: PgProductRow = sqlx::query_as(
            r#"
            UPDATE products
            SET current_stock = current_stock - $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, code, name, category, current_stock, created_at, updated_at
            "#,
        )
        .bind(record.product_id.0)
        .bind(record.quantity)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_entry_tx(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(AppliedMovement {
            product: product.into(),
            entry: LedgerEntry::from_record(record),
        })
    }

    async fn attach_proof(&self, entry_id: EntryId, proof_reference: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE ledger_entries SET proof_reference = $2 WHERE id = $1")
                .bind(entry_id.0)
                .bind(proof_reference)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::EntryNotFound(entry_id.0));
        }
        Ok(())
    }

    async fn entry_by_id(&self, entry_id: EntryId) -> Result<Option<LedgerEntry>> {
        let row: Option<PgEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = $1"
        ))
        .bind(entry_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<PgEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn entries_by_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<PgEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE product_id = $1 ORDER BY seq"
        ))
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn entries_by_actor(&self, actor_id: ActorId) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<PgEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE user_id = $1 ORDER BY seq"
        ))
        .bind(actor_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_unanchored(&self) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<PgEntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE proof_reference IS NULL ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_entry(&self, entry_id: EntryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE id = $1")
            .bind(entry_id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
