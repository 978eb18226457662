//! Shared identifiers and value types used across the workspace.

pub mod email;
pub mod geo;
pub mod money;
pub mod pagination;
pub mod types;

pub use email::{Email, EmailError};
pub use geo::GeoPoint;
pub use money::Money;
pub use pagination::{Page, PageInfo, PageRequest};
pub use types::{BranchId, IdParseError, OrderId, ProductId, UserId};
