use std::sync::{Mutex, MutexGuard, PoisonError};

use cartsync_core::ids::ProductId;
use cartsync_core::model::{CartLineItem, Product};
use cartsync_engine::{AddItemRequest, ApiError, CartApi, RemoteCart};

/// Which endpoint a recorded call hit, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Fetch,
    Add { product_id: ProductId, quantity: u32 },
    Update { product_id: ProductId, quantity: u32 },
    Remove { product_id: ProductId },
    Clear,
}

#[derive(Default)]
struct ServerState {
    catalog: Vec<Product>,
    items: Vec<CartLineItem>,
    version: u64,
    fail_mutations: u32,
    fail_fetches: u32,
    calls: Vec<ApiCall>,
}

/// In-memory stand-in for the remote cart service.
///
/// Holds its own authoritative item list so tests can assert that local
/// and server state converge. Endpoints can be scripted to fail a fixed
/// number of upcoming requests, and every call is recorded for attempt
/// counting.
#[derive(Default)]
pub struct MockCartApi {
    state: Mutex<ServerState>,
}

impl MockCartApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Products the server knows how to materialize on `POST cart/items`.
    pub fn seed_catalog(&self, products: Vec<Product>) {
        self.lock().catalog.extend(products);
    }

    /// Pre-populate the server-side cart.
    pub fn seed_cart(&self, items: Vec<CartLineItem>, version: u64) {
        let mut state = self.lock();
        state.items = items;
        state.version = version;
    }

    /// Fail the next `count` mutating requests (add/update/remove/clear).
    pub fn fail_next_mutations(&self, count: u32) {
        self.lock().fail_mutations = count;
    }

    /// Fail the next `count` `GET cart` requests.
    pub fn fail_next_fetches(&self, count: u32) {
        self.lock().fail_fetches = count;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Number of mutating requests received so far.
    pub fn mutation_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, ApiCall::Fetch))
            .count()
    }

    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().items.clone()
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_mutation_failure(state: &mut ServerState) -> Result<(), ApiError> {
        if state.fail_mutations > 0 {
            state.fail_mutations -= 1;
            return Err(ApiError::new("cart service unavailable"));
        }
        Ok(())
    }
}

impl CartApi for MockCartApi {
    async fn fetch_cart(&self) -> Result<RemoteCart, ApiError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Fetch);
        if state.fail_fetches > 0 {
            state.fail_fetches -= 1;
            return Err(ApiError::new("cart service unavailable"));
        }
        Ok(RemoteCart {
            items: state.items.clone(),
            version: state.version,
        })
    }

    async fn add_item(&self, request: &AddItemRequest) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Add {
            product_id: request.product_id.clone(),
            quantity: request.quantity,
        });
        Self::check_mutation_failure(&mut state)?;

        let product = state
            .catalog
            .iter()
            .find(|p| p.id == request.product_id)
            .cloned()
            .ok_or_else(|| ApiError::new(format!("unknown product {}", request.product_id)))?;
        let line = CartLineItem::new(product, request.quantity, request.selected_options.clone());
        let key = line.key();
        match state.items.iter().position(|i| i.key() == key) {
            Some(index) => state.items[index].quantity += request.quantity,
            None => state.items.push(line),
        }
        state.version += 1;
        Ok(())
    }

    async fn update_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Update {
            product_id: product_id.clone(),
            quantity,
        });
        Self::check_mutation_failure(&mut state)?;

        let index = state
            .items
            .iter()
            .position(|i| i.product.id == *product_id)
            .ok_or_else(|| ApiError::new(format!("item {product_id} not in cart")))?;
        state.items[index].quantity = quantity;
        state.version += 1;
        Ok(())
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Remove {
            product_id: product_id.clone(),
        });
        Self::check_mutation_failure(&mut state)?;

        let index = state
            .items
            .iter()
            .position(|i| i.product.id == *product_id)
            .ok_or_else(|| ApiError::new(format!("item {product_id} not in cart")))?;
        state.items.remove(index);
        state.version += 1;
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Clear);
        Self::check_mutation_failure(&mut state)?;

        state.items.clear();
        state.version += 1;
        Ok(())
    }
}
