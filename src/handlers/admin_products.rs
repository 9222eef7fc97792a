use crate::auth::AuthUser;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::models::Product;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// Admin catalog management routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", put(update_product).delete(delete_product))
        .route("/:id/featured", post(toggle_featured))
        .route("/:id/status", put(set_status))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SetStatusRequest {
    /// `active`/`ativo` or `inactive`/`inativo`/`pause`/`paused`, case-insensitive
    pub status: String,
}

/// List every product, inactive ones included
#[utoipa::path(
    get,
    path = "/api/v1/admin/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Products newest first", body = PaginatedResponse<Product>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&params)?;

    let (products, total) = state
        .services
        .admin
        .list(&user, params.page, params.per_page, params.search.clone())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        products,
        params.page,
        params.per_page,
        total,
    )))
}

/// Create a product from either the nested or the legacy flat shape
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body(content = Product, description = "Product fields; id, slug, rating and timestamps are assigned by the server"),
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug could not be reserved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .admin
        .create(&user, &payload)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %product.id, "Admin created product");
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body(content = Product, description = "Full replacement; omitted list fields keep their stored values"),
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used by another product", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .admin
        .update(&user, id, &payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .admin
        .delete(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Flip the featured flag
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/{id}/featured",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Featured flag toggled", body = Product),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn toggle_featured(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .admin
        .toggle_featured(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}/status",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Product),
        (status = 400, description = "Unknown status value", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn set_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .admin
        .set_status(&user, id, &payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}
