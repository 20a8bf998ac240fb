//! Pricing and availability gateway
//!
//! The engine never owns product truth. Every mutation consults this gateway
//! for the current price, discount, availability and purchase limit of the
//! product being touched, and nothing from a previous call is reused.
//!
//! The in-memory implementation backs the standalone server and the tests;
//! a deployment against a real catalog service only needs to implement the
//! trait.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Catalog truth for one product at one instant.
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub id: u64,
    pub name: String,
    pub unit_price: Decimal,
    /// Promotional price; used instead of `unit_price` when present and > 0.
    pub discount_price: Option<Decimal>,
    pub in_stock: bool,
    /// Per-order purchase limit. `None` means unbounded.
    pub max_quantity: Option<u32>,
}

impl ProductInfo {
    /// The price a shopper actually pays per unit.
    pub fn effective_unit_price(&self) -> Decimal {
        match self.discount_price {
            Some(p) if p > Decimal::ZERO => p,
            _ => self.unit_price,
        }
    }
}

/// Errors the gateway can produce. Transport problems and unknown products
/// are the only shapes the engine distinguishes.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("pricing gateway unavailable: {0}")]
    Unavailable(String),

    #[error("product {0} is not in the catalog")]
    ProductMissing(u64),
}

/// Authoritative source for product pricing and availability.
#[async_trait]
pub trait PricingAvailabilityGateway: Send + Sync {
    async fn product_info(&self, product_id: u64) -> Result<ProductInfo, GatewayError>;
}

/// In-memory catalog used by the standalone server and the test suite.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: DashMap<u64, ProductInfo>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: ProductInfo) {
        self.products.insert(product.id, product);
    }

    /// Changes the stock flag for a product. Used to simulate availability
    /// drifting between cart validation and order submission.
    pub fn set_in_stock(&self, product_id: u64, in_stock: bool) {
        if let Some(mut p) = self.products.get_mut(&product_id) {
            p.in_stock = in_stock;
        }
    }

    pub fn set_unit_price(&self, product_id: u64, unit_price: Decimal) {
        if let Some(mut p) = self.products.get_mut(&product_id) {
            p.unit_price = unit_price;
        }
    }

    /// Seeds the fitness storefront demo catalog served by `main`.
    pub fn with_demo_products() -> Self {
        let catalog = Self::new();
        let demo = [
            ProductInfo {
                id: 1,
                name: "Whey Protein 2kg".into(),
                unit_price: dec!(54.99),
                discount_price: Some(dec!(49.99)),
                in_stock: true,
                max_quantity: Some(5),
            },
            ProductInfo {
                id: 2,
                name: "Resistance Bands Set".into(),
                unit_price: dec!(24.50),
                discount_price: None,
                in_stock: true,
                max_quantity: Some(10),
            },
            ProductInfo {
                id: 3,
                name: "Yoga Mat Pro".into(),
                unit_price: dec!(39.00),
                discount_price: None,
                in_stock: true,
                max_quantity: None,
            },
            ProductInfo {
                id: 4,
                name: "Adjustable Dumbbells Pair".into(),
                unit_price: dec!(189.00),
                discount_price: None,
                in_stock: false,
                max_quantity: Some(2),
            },
        ];
        for product in demo {
            catalog.insert(product);
        }
        catalog
    }
}

#[async_trait]
impl PricingAvailabilityGateway for InMemoryCatalog {
    async fn product_info(&self, product_id: u64) -> Result<ProductInfo, GatewayError> {
        self.products
            .get(&product_id)
            .map(|p| p.clone())
            .ok_or(GatewayError::ProductMissing(product_id))
    }
}
