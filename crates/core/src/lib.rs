pub mod clock;
pub mod error;
pub mod identity;
pub mod ids;
pub mod model;
pub mod ops;
pub mod validate;

pub use error::CoreError;
pub use identity::{ItemKey, LineSelector};
pub use ids::*;
pub use model::{CartLineItem, CartState, Product, ProductOption};
pub use ops::{CartOp, QueuedOperation};
