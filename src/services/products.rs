use std::sync::Arc;

use axum::extract::Query;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::server::{health, with_common_layers};
use crate::error::FieldError;
use crate::services::validation::BodyFields;
use crate::services::{create, fetch, remove, update, Record, RecordStore};

const DEFAULT_CATEGORY: &str = "General";

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub stock: u64,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub price: f64,
    pub stock: u64,
    pub category: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u64>,
    pub category: Option<String>,
}

impl Record for Product {
    type Draft = ProductDraft;
    type Patch = ProductPatch;
    const KIND: &'static str = "Product";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: ProductDraft) -> Self {
        Product {
            id,
            name: draft.name,
            price: draft.price,
            stock: draft.stock,
            category: draft.category,
        }
    }

    fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
    }

    fn parse_draft(body: &Value) -> Result<ProductDraft, Vec<FieldError>> {
        let mut fields = BodyFields::for_create(body);
        let name = fields.non_empty_string("name");
        let price = fields.non_negative_f64("price");
        let stock = fields.non_negative_u64("stock");
        let category = fields.optional_string("category");
        fields.finish()?;

        Ok(ProductDraft {
            name: name.unwrap_or_default(),
            price: price.unwrap_or_default(),
            stock: stock.unwrap_or_default(),
            category: category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        })
    }

    fn parse_patch(body: &Value) -> Result<ProductPatch, Vec<FieldError>> {
        let mut fields = BodyFields::for_update(body);
        let patch = ProductPatch {
            name: fields.non_empty_string("name"),
            price: fields.non_negative_f64("price"),
            stock: fields.non_negative_u64("stock"),
            category: fields.optional_string("category"),
        };
        fields.finish()?;
        Ok(patch)
    }
}

/// Query parameters accepted by `GET /`
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,

    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,

    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
}

impl ProductFilter {
    /// Empty parameters are ignored. An unparsable price bound matches nothing.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = present(&self.category) {
            if product.category != category {
                return false;
            }
        }
        if let Some(min) = present(&self.min_price).map(parse_bound) {
            if min.is_nan() || product.price < min {
                return false;
            }
        }
        if let Some(max) = present(&self.max_price).map(parse_bound) {
            if max.is_nan() || product.price > max {
                return false;
            }
        }
        true
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_bound(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(f64::NAN)
}

/// `GET /` with optional category and price filters
async fn list_products(
    Extension(store): Extension<Arc<RecordStore<Product>>>,
    Query(filter): Query<ProductFilter>,
) -> Json<Vec<Product>> {
    let products = store
        .list()
        .await
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();
    Json(products)
}

/// Products present at startup
pub fn seed_products() -> Vec<Product> {
    let product = |id, name: &str, price, stock| Product {
        id,
        name: name.to_string(),
        price,
        stock,
        category: "Electronics".to_string(),
    };

    vec![
        product(1, "Laptop", 999.99, 50),
        product(2, "Mouse", 29.99, 200),
        product(3, "Keyboard", 79.99, 150),
    ]
}

pub fn product_routes(store: Arc<RecordStore<Product>>) -> Router {
    Router::new()
        .route("/health", health("product-service"))
        .route("/", get(list_products).post(create::<Product>))
        .route(
            "/:id",
            get(fetch::<Product>)
                .put(update::<Product>)
                .delete(remove::<Product>),
        )
        .layer(Extension(store))
}

/// Product service application with the shared layers
pub fn app(store: Arc<RecordStore<Product>>) -> Router {
    with_common_layers(product_routes(store))
}
