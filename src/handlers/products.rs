use crate::auth::AuthUser;
use crate::handlers::common::{map_service_error, success_response};
use crate::models::{Category, Product};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Largest batch accepted by the batch endpoint
const MAX_BATCH_IDS: usize = 100;

/// Public storefront routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products/featured", get(list_featured))
        .route("/products/batch", get(get_products_batch))
        .route("/products/:id", get(get_product))
        .route("/products/:id/rating", post(rate_product))
        .route("/categories", get(list_categories))
        .route("/categories/:slug/products", get(list_category_products))
}

#[derive(Debug, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchQuery {
    /// Comma-separated product ids
    pub ids: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RateProductRequest {
    /// Integer score from 1 to 5
    pub score: i64,
}

/// Get one product by id or slug
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = String, Path, description = "Product id or slug")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_detail(&key)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Get several products by id; unknown or malformed ids are left out
#[utoipa::path(
    get,
    path = "/api/v1/products/batch",
    params(BatchQuery),
    responses(
        (status = 200, description = "Matching products in request order", body = [Product]),
        (status = 400, description = "Too many ids", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_products_batch(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ids: Vec<String> = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.len() > MAX_BATCH_IDS {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_BATCH_IDS} ids per request"
        )));
    }

    let products = state
        .services
        .catalog
        .get_by_ids(&ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Featured products for the storefront front page
#[utoipa::path(
    get,
    path = "/api/v1/products/featured",
    responses((status = 200, description = "Featured products", body = [Product])),
    tag = "Catalog"
)]
pub async fn list_featured(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_featured()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Canonical categories", body = [Category])),
    tag = "Catalog"
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.services.catalog.list_categories())
}

/// Visible products of one category
#[utoipa::path(
    get,
    path = "/api/v1/categories/{slug}/products",
    params(("slug" = String, Path, description = "Category slug")),
    responses((status = 200, description = "Products in the category", body = [Product])),
    tag = "Catalog"
)]
pub async fn list_category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_by_category(&slug)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Rate a product as the calling user
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/rating",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = RateProductRequest,
    responses(
        (status = 200, description = "Rating recorded", body = Product),
        (status = 400, description = "Score out of range", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn rate_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .ratings
        .rate(&user, id, payload.score)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}
