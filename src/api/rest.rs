//! REST API routes for the stock ledger.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::server::AppState;

use super::handlers::{entries, movements, products, proofs};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Product catalog
        .route("/v1/products", post(products::create_product))
        .route("/v1/products", get(products::list_products))
        .route("/v1/products/:id", get(products::get_product))
        .route("/v1/products/:id", put(products::update_product))
        .route("/v1/products/:id", delete(products::delete_product))
        // Stock movements
        .route("/v1/movements/entry", post(movements::record_entry))
        .route("/v1/movements/exit", post(movements::record_exit))
        // Audit surface
        .route("/v1/entries", get(entries::list_entries))
        .route("/v1/entries/:id", get(entries::get_entry))
        .route("/v1/entries/:id", delete(entries::delete_entry))
        // Proofs
        .route("/v1/entries/:id/verify", get(proofs::verify_entry))
        .route("/v1/entries/:id/proof", get(proofs::get_proof_artifact))
        .route("/v1/anchors/backfill", post(proofs::anchor_backfill))
}
