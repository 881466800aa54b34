use std::future::Future;

use thiserror::Error;

use cartsync_core::ids::ProductId;
use cartsync_core::model::{CartLineItem, ProductOption};

/// Failure reported by the remote cart service. The wire envelope's
/// `{success, error}` shape maps onto `Result<_, ApiError>` here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The authoritative cart as the server reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCart {
    pub items: Vec<CartLineItem>,
    pub version: u64,
}

/// Body of `POST cart/items`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub selected_options: Vec<ProductOption>,
}

/// The remote cart service, at its interface boundary. The engine only
/// ever talks to the server through this trait.
pub trait CartApi {
    /// `GET cart`
    fn fetch_cart(&self) -> impl Future<Output = Result<RemoteCart, ApiError>>;

    /// `POST cart/items`
    fn add_item(&self, request: &AddItemRequest) -> impl Future<Output = Result<(), ApiError>>;

    /// `PATCH cart/items/{productId}`
    fn update_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>>;

    /// `DELETE cart/items/{productId}`
    fn remove_item(&self, product_id: &ProductId) -> impl Future<Output = Result<(), ApiError>>;

    /// `DELETE cart`
    fn clear_cart(&self) -> impl Future<Output = Result<(), ApiError>>;
}

impl<T: CartApi> CartApi for std::sync::Arc<T> {
    async fn fetch_cart(&self) -> Result<RemoteCart, ApiError> {
        (**self).fetch_cart().await
    }

    async fn add_item(&self, request: &AddItemRequest) -> Result<(), ApiError> {
        (**self).add_item(request).await
    }

    async fn update_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        (**self).update_item(product_id, quantity).await
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<(), ApiError> {
        (**self).remove_item(product_id).await
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        (**self).clear_cart().await
    }
}
