//! Product catalog, stock management, and the two-phase reservation saga.

use crate::db::{product_repo, reservation_repo, stock_repo};
use crate::db::product_repo::{NewProduct, ProductListFilter, ProductPatch};
use crate::error::{InventoryError, Result};
use crate::middleware::jwt_auth::AuthUser;
use crate::models::{Product, Reservation, ReservationStatus, Stock};
use jwt_verify::Role;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

const CURRENCY_RUB: &str = "RUB";

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub vendor_id: Uuid,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub currency_code: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReserveItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReserveOkItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReserveFailedItem {
    pub product_id: Uuid,
    pub requested: u32,
    pub reason: String,
}

/// Inline partial-success report: ok rows hold stock, failed rows left it
/// untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReserveOutcome {
    pub ok: Vec<ReserveOkItem>,
    pub failed: Vec<ReserveFailedItem>,
}

pub struct InventoryService {
    db: PgPool,
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// ADMIN operates on any product; VENDOR only on products whose
    /// vendor_id is their own user id.
    fn may_manage(actor: &AuthUser, vendor_id: Uuid) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Vendor => actor.user_id == vendor_id,
            Role::Customer => false,
        }
    }

    pub async fn create_product(&self, actor: &AuthUser, input: ProductInput) -> Result<Product> {
        if !matches!(actor.role, Role::Admin | Role::Vendor) {
            return Err(InventoryError::Forbidden);
        }
        if actor.role == Role::Vendor && input.vendor_id != actor.user_id {
            return Err(InventoryError::Forbidden);
        }
        if input.currency_code != CURRENCY_RUB {
            return Err(InventoryError::CurrencyMismatch);
        }

        let sku = input.sku.trim().to_string();
        let name = input.name.trim().to_string();
        if sku.is_empty() || name.is_empty() {
            return Err(InventoryError::Validation("sku and name are required".to_string()));
        }

        let mut tx = self.db.begin().await?;

        // Check-then-insert inside the transaction; the unique index on
        // (vendor_id, lower(sku)) backstops races.
        if product_repo::get_by_vendor_and_sku(&mut *tx, input.vendor_id, &sku)
            .await?
            .is_some()
        {
            return Err(InventoryError::SkuAlreadyExists);
        }

        let product = product_repo::create(
            &mut *tx,
            &NewProduct {
                vendor_id: input.vendor_id,
                sku: &sku,
                name: &name,
                description: input.description.trim(),
                price_cents: input.price_cents,
                currency_code: CURRENCY_RUB,
                is_active: input.is_active,
            },
        )
        .await?;
        stock_repo::ensure_row(&mut *tx, product.id).await?;

        tx.commit().await?;

        info!(product_id = %product.id, vendor_id = %product.vendor_id, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &AuthUser,
        product_id: Uuid,
        mut patch: ProductPatch,
    ) -> Result<Product> {
        let product = product_repo::get_by_id(&self.db, product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound)?;

        if !Self::may_manage(actor, product.vendor_id) {
            return Err(InventoryError::Forbidden);
        }

        if let Some(currency) = &patch.currency_code {
            if currency != CURRENCY_RUB {
                return Err(InventoryError::CurrencyMismatch);
            }
        }
        if let Some(sku) = &mut patch.sku {
            *sku = sku.trim().to_string();
        }
        if let Some(name) = &mut patch.name {
            *name = name.trim().to_string();
        }
        if let Some(description) = &mut patch.description {
            *description = description.trim().to_string();
        }

        if patch.is_empty() {
            return Ok(product);
        }

        if let Some(new_sku) = &patch.sku {
            if let Some(existing) =
                product_repo::get_by_vendor_and_sku(&self.db, product.vendor_id, new_sku).await?
            {
                if existing.id != product.id {
                    return Err(InventoryError::SkuAlreadyExists);
                }
            }
        }

        product_repo::update_fields(&self.db, product_id, &patch).await?;

        product_repo::get_by_id(&self.db, product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product> {
        product_repo::get_by_id(&self.db, product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound)
    }

    pub async fn list_products(&self, filter: ProductListFilter) -> Result<(Vec<Product>, i64)> {
        product_repo::list(&self.db, &filter).await
    }

    pub async fn batch_get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        product_repo::batch_get(&self.db, ids).await
    }

    /// Deletion is refused while any stock sits reserved for the product.
    pub async fn delete_product(&self, actor: &AuthUser, product_id: Uuid) -> Result<bool> {
        let product = product_repo::get_by_id(&self.db, product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound)?;

        if !Self::may_manage(actor, product.vendor_id) {
            return Err(InventoryError::Forbidden);
        }

        if let Some(stock) = stock_repo::get(&self.db, product_id).await? {
            if stock.reserved > 0 {
                return Err(InventoryError::CannotDeleteReserved);
            }
        }

        let deleted = product_repo::delete(&self.db, product_id).await?;
        if deleted {
            info!(product_id = %product_id, "product deleted");
        }
        Ok(deleted)
    }

    pub async fn get_stock(&self, product_id: Uuid) -> Result<Stock> {
        stock_repo::get(&self.db, product_id)
            .await?
            .ok_or(InventoryError::StockNotFound)
    }

    pub async fn set_stock(
        &self,
        actor: &AuthUser,
        product_id: Uuid,
        available: i32,
    ) -> Result<Stock> {
        if available < 0 {
            return Err(InventoryError::Validation("available must be >= 0".to_string()));
        }
        let product = product_repo::get_by_id(&self.db, product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound)?;

        if !Self::may_manage(actor, product.vendor_id) {
            return Err(InventoryError::Forbidden);
        }

        stock_repo::set_available(&self.db, product_id, available).await?;
        self.get_stock(product_id).await
    }

    /// A delta that would take `available` below zero affects no rows and
    /// leaves the counters unchanged.
    pub async fn adjust_stock(
        &self,
        actor: &AuthUser,
        product_id: Uuid,
        delta: i32,
    ) -> Result<Stock> {
        let product = product_repo::get_by_id(&self.db, product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound)?;

        if !Self::may_manage(actor, product.vendor_id) {
            return Err(InventoryError::Forbidden);
        }

        stock_repo::adjust_available(&self.db, product_id, delta).await?;
        self.get_stock(product_id).await
    }

    /// Atomic first phase of the saga. Refuses a second call for the same
    /// order outright; inside one transaction each item is upserted PENDING
    /// and conditionally flipped to RESERVED or FAILED.
    pub async fn reserve(&self, order_id: Uuid, items: &[ReserveItem]) -> Result<ReserveOutcome> {
        if items.is_empty() {
            return Ok(ReserveOutcome::default());
        }

        if reservation_repo::exists_for_order(&self.db, order_id).await? {
            return Err(InventoryError::ReservationExists);
        }

        let mut outcome = ReserveOutcome::default();
        let mut tx = self.db.begin().await?;

        for item in items {
            if item.quantity == 0 {
                return Err(InventoryError::InvalidQuantity);
            }
            let quantity = item.quantity as i32;

            let product = match product_repo::get_by_id(&mut *tx, item.product_id).await? {
                Some(product) => product,
                None => {
                    outcome.failed.push(ReserveFailedItem {
                        product_id: item.product_id,
                        requested: item.quantity,
                        reason: "not found".to_string(),
                    });
                    continue;
                }
            };
            if !product.is_active {
                outcome.failed.push(ReserveFailedItem {
                    product_id: item.product_id,
                    requested: item.quantity,
                    reason: "inactive".to_string(),
                });
                continue;
            }
            if product.currency_code != CURRENCY_RUB {
                return Err(InventoryError::CurrencyMismatch);
            }

            reservation_repo::upsert_pending(&mut *tx, order_id, item.product_id, quantity).await?;

            if stock_repo::try_reserve(&mut *tx, item.product_id, quantity).await? {
                reservation_repo::set_status(
                    &mut *tx,
                    order_id,
                    item.product_id,
                    ReservationStatus::Reserved,
                )
                .await?;
                outcome.ok.push(ReserveOkItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            } else {
                reservation_repo::set_status(
                    &mut *tx,
                    order_id,
                    item.product_id,
                    ReservationStatus::Failed,
                )
                .await?;
                outcome.failed.push(ReserveFailedItem {
                    product_id: item.product_id,
                    requested: item.quantity,
                    reason: "out_of_stock".to_string(),
                });
            }
        }

        tx.commit().await?;

        info!(
            order_id = %order_id,
            ok = outcome.ok.len(),
            failed = outcome.failed.len(),
            "reservation processed"
        );
        Ok(outcome)
    }

    /// Compensation: return RESERVED rows' stock and mark every row of the
    /// order RELEASED. Returns how many stock rows were actually credited.
    pub async fn release(&self, order_id: Uuid) -> Result<u64> {
        let mut released = 0u64;
        let mut tx = self.db.begin().await?;

        let rows: Vec<Reservation> = reservation_repo::list_by_order(&mut *tx, order_id).await?;
        for row in &rows {
            if row.status == ReservationStatus::Reserved
                && stock_repo::release(&mut *tx, row.product_id, row.quantity).await?
            {
                released += 1;
            }
            reservation_repo::set_status(
                &mut *tx,
                order_id,
                row.product_id,
                ReservationStatus::Released,
            )
            .await?;
        }

        tx.commit().await?;

        info!(order_id = %order_id, released, "reservation released");
        Ok(released)
    }

    /// Final consumption: burn the reserve of RESERVED rows without touching
    /// `available`. Rows in other states are skipped.
    pub async fn confirm(&self, order_id: Uuid) -> Result<u64> {
        let mut confirmed = 0u64;
        let mut tx = self.db.begin().await?;

        let rows: Vec<Reservation> = reservation_repo::list_by_order(&mut *tx, order_id).await?;
        for row in &rows {
            if row.status == ReservationStatus::Reserved
                && stock_repo::confirm(&mut *tx, row.product_id, row.quantity).await?
            {
                confirmed += 1;
            }
        }

        tx.commit().await?;

        info!(order_id = %order_id, confirmed, "reservation confirmed");
        Ok(confirmed)
    }
}
