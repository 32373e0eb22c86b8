//! Recording mock of the payment gateway.

use async_trait::async_trait;
use hotdesk_core::gateway::{
    CatalogGateway, CatalogPrice, CatalogProduct, CheckoutGateway, CheckoutSession,
    CheckoutSessionSpec, GatewayError, ProductSpec,
};
use hotdesk_core::types::Money;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock gateway that records every call and can be told to fail.
///
/// Checkout sessions get ids `cs_test_1`, `cs_test_2`, … in call order, so
/// tests can correlate webhook events deterministically. The catalog side
/// keeps products and prices in memory with the same create/list/archive
/// semantics as the HTTP client.
#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<MockGatewayInner>,
}

#[derive(Default)]
struct MockGatewayInner {
    session_counter: AtomicU64,
    product_counter: AtomicU64,
    price_counter: AtomicU64,
    fail_checkout: AtomicBool,
    fail_catalog: AtomicBool,
    sessions: Mutex<Vec<CheckoutSessionSpec>>,
    products: Mutex<Vec<CatalogProduct>>,
    prices: Mutex<Vec<CatalogPrice>>,
}

impl MockGateway {
    /// Create a mock with no sessions, products, or prices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next and all following checkout calls fail.
    pub fn fail_checkout(&self, fail: bool) {
        self.inner.fail_checkout.store(fail, Ordering::SeqCst);
    }

    /// Make all catalog calls fail.
    pub fn fail_catalog(&self, fail: bool) {
        self.inner.fail_catalog.store(fail, Ordering::SeqCst);
    }

    /// Every checkout session opened, in call order.
    pub async fn sessions(&self) -> Vec<CheckoutSessionSpec> {
        self.inner.sessions.lock().await.clone()
    }

    /// Current catalog products, including archived ones.
    pub async fn products(&self) -> Vec<CatalogProduct> {
        self.inner.products.lock().await.clone()
    }

    /// Current catalog prices, including deactivated ones.
    pub async fn prices(&self) -> Vec<CatalogPrice> {
        self.inner.prices.lock().await.clone()
    }

    /// Seed a pre-existing product, as if created outside the pipeline.
    pub async fn seed_product(&self, product: CatalogProduct) {
        self.inner.products.lock().await.push(product);
    }

    /// Seed a pre-existing price.
    pub async fn seed_price(&self, price: CatalogPrice) {
        self.inner.prices.lock().await.push(price);
    }

    fn catalog_guard(&self) -> Result<(), GatewayError> {
        if self.inner.fail_catalog.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 500,
                message: "mock catalog failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CheckoutGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        spec: &CheckoutSessionSpec,
    ) -> Result<CheckoutSession, GatewayError> {
        if self.inner.fail_checkout.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 502,
                message: "mock checkout failure".to_string(),
            });
        }

        let n = self.inner.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.sessions.lock().await.push(spec.clone());

        Ok(CheckoutSession {
            session_id: format!("cs_test_{n}"),
            redirect_url: format!("https://checkout.test/pay/cs_test_{n}"),
        })
    }
}

#[async_trait]
impl CatalogGateway for MockGateway {
    async fn create_product(&self, spec: &ProductSpec) -> Result<CatalogProduct, GatewayError> {
        self.catalog_guard()?;
        let n = self.inner.product_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let product = CatalogProduct {
            id: format!("prod_test_{n}"),
            name: spec.name.clone(),
            active: true,
            space_id: Some(spec.space_id),
        };
        self.inner.products.lock().await.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: &str,
        spec: &ProductSpec,
    ) -> Result<CatalogProduct, GatewayError> {
        self.catalog_guard()?;
        let mut products = self.inner.products.lock().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(GatewayError::Api {
                status: 404,
                message: format!("no such product: {product_id}"),
            })?;
        product.name = spec.name.clone();
        product.space_id = Some(spec.space_id);
        Ok(product.clone())
    }

    async fn list_active_products(&self) -> Result<Vec<CatalogProduct>, GatewayError> {
        self.catalog_guard()?;
        Ok(self
            .inner
            .products
            .lock()
            .await
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }

    async fn archive_product(&self, product_id: &str) -> Result<(), GatewayError> {
        self.catalog_guard()?;
        let mut products = self.inner.products.lock().await;
        if let Some(product) = products.iter_mut().find(|p| p.id == product_id) {
            product.active = false;
        }
        Ok(())
    }

    async fn create_price(
        &self,
        product_id: &str,
        amount: Money,
        currency: &str,
    ) -> Result<CatalogPrice, GatewayError> {
        self.catalog_guard()?;
        let n = self.inner.price_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let price = CatalogPrice {
            id: format!("price_test_{n}"),
            product_id: product_id.to_string(),
            amount,
            currency: currency.to_string(),
            active: true,
        };
        self.inner.prices.lock().await.push(price.clone());
        Ok(price)
    }

    async fn list_active_prices(&self, product_id: &str) -> Result<Vec<CatalogPrice>, GatewayError> {
        self.catalog_guard()?;
        Ok(self
            .inner
            .prices
            .lock()
            .await
            .iter()
            .filter(|p| p.product_id == product_id && p.active)
            .cloned()
            .collect())
    }
}
