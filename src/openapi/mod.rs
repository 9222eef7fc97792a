use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bakery Catalog API",
        version = "1.0.0",
        description = r#"
# Bakery Catalog API

Product catalog of a bakery storefront: public browsing by category, featured
products and product detail, plus authenticated administration.

## Authentication

Admin endpoints and product rating require a bearer JWT:

```
Authorization: Bearer <your-jwt-token>
```

Admin endpoints additionally require the `admin` role.

## Error Handling

Errors share one body:

```json
{
  "error": "Bad Request",
  "message": "Name is required",
  "field": "name",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "Catalog", description = "Public storefront endpoints"),
        (name = "Admin", description = "Catalog administration endpoints")
    ),
    paths(
        // Catalog
        crate::handlers::products::get_product,
        crate::handlers::products::get_products_batch,
        crate::handlers::products::list_featured,
        crate::handlers::products::list_categories,
        crate::handlers::products::list_category_products,
        crate::handlers::products::rate_product,

        // Admin
        crate::handlers::admin_products::list_products,
        crate::handlers::admin_products::create_product,
        crate::handlers::admin_products::update_product,
        crate::handlers::admin_products::delete_product,
        crate::handlers::admin_products::toggle_featured,
        crate::handlers::admin_products::set_status,
    ),
    components(
        schemas(
            crate::models::Product,
            crate::models::Category,
            crate::models::ProductStatus,
            crate::handlers::products::RateProductRequest,
            crate::handlers::admin_products::SetStatusRequest,
            crate::handlers::common::PaginationMeta,
            crate::services::MigrationReport,
            crate::services::CollectionReport,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_catalog_and_admin_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Bakery Catalog API"));
        assert!(json.contains("/api/v1/products/{id}"));
        assert!(json.contains("/api/v1/admin/products/{id}/status"));
        assert!(json.contains("\"Bearer\""));
    }
}
