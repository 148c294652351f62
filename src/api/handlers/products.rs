//! Product catalog handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    CreateProductRequest, ProductListQuery, ProductResponse, UpdateProductRequest,
};
use crate::domain::{NewProduct, ProductFilter, ProductId, ProductUpdate};
use crate::infra::LedgerStore;
use crate::server::AppState;

/// POST /api/v1/products - Create a product.
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let new_product = NewProduct {
        code: body.code,
        name: body.name,
        category: body.category,
        current_stock: body.current_stock,
    }
    .normalized();

    let product = state.store.create_product(new_product).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /api/v1/products - List products with optional code/name filters.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let products = state
        .store
        .list_products(ProductFilter {
            code: query.code,
            name: query.name,
        })
        .await?;

    let products: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(Json(serde_json::json!({
        "products": products,
        "count": products.len(),
    })))
}

/// GET /api/v1/products/:id - Fetch one product.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .store
        .product_by_id(ProductId::from_uuid(id))
        .await?
        .ok_or(crate::infra::LedgerError::ProductNotFound(id))?;

    Ok(Json(product.into()))
}

/// PUT /api/v1/products/:id - Update catalog fields or apply an
/// administrative stock override.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let update = ProductUpdate {
        name: body.name,
        category: body.category,
        current_stock: body.current_stock,
        add_stock: body.add_stock,
    }
    .normalized();

    let product = state
        .store
        .update_product(ProductId::from_uuid(id), update)
        .await?;

    Ok(Json(product.into()))
}

/// DELETE /api/v1/products/:id
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.store.delete_product(ProductId::from_uuid(id)).await?;
    if !deleted {
        return Err(crate::infra::LedgerError::ProductNotFound(id).into());
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
