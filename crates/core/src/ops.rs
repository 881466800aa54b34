use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{OpId, ProductId};
use crate::model::{Product, ProductOption};

/// A cart mutation, captured with the exact arguments needed to replay it.
/// One variant per mutation kind so replay is exhaustively type-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CartOp {
    Add {
        product: Product,
        quantity: u32,
        selected_options: Vec<ProductOption>,
    },
    Remove {
        product_id: ProductId,
        option_name: Option<String>,
    },
    Update {
        product_id: ProductId,
        quantity: u32,
        option_name: Option<String>,
    },
    Clear,
}

impl CartOp {
    /// String name of the operation kind for logging/indexing.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "Add",
            Self::Remove { .. } => "Remove",
            Self::Update { .. } => "Update",
            Self::Clear => "Clear",
        }
    }

    /// The product this operation targets, if any.
    pub fn product_id(&self) -> Option<&ProductId> {
        match self {
            Self::Add { product, .. } => Some(&product.id),
            Self::Remove { product_id, .. } | Self::Update { product_id, .. } => Some(product_id),
            Self::Clear => None,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CoreError> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

/// A mutation recorded while the server was unreachable.
///
/// Created when a mutation cannot reach the server; removed once replayed
/// successfully; discarded after `attempts` passes the engine's retry cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub op_id: OpId,
    pub op: CartOp,
    pub queued_at_ms: u64,
    pub attempts: u32,
}

impl QueuedOperation {
    pub fn new(op: CartOp, queued_at_ms: u64) -> Self {
        Self {
            op_id: OpId::new(),
            op,
            queued_at_ms,
            attempts: 0,
        }
    }
}
