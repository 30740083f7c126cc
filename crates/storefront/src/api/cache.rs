//! Cache types for catalog responses.

use std::sync::Arc;

use super::types::Product;

/// Cache key for catalog data.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The full displayable product listing.
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
}
