use std::collections::TryReserveError;

use thiserror::Error;

use crate::MIN_ORDER;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`BTree`](crate::BTree) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The order passed to [`BTree::with_order`](crate::BTree::with_order) is too small.
    #[error("invalid order {order}, must be at least {min}", min = MIN_ORDER)]
    InvalidOrder {
        /// Order that was rejected.
        order: usize,
    },

    /// Memory for the nodes an insertion might need could not be reserved.
    #[error("allocation failed: {0}")]
    AllocFailed(#[from] TryReserveError),
}
