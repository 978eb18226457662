//! Persistence layer: records, query filters, repository traits and their
//! in-memory and PostgreSQL implementations.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{BranchId, OrderId, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use models::{
    Branch, Category, OpeningHours, Order, OrderLine, OrderStatus, PasswordReset, PaymentDetails,
    PaymentMethod, PaymentStatus, Product, Role, Session, UnknownVariant, User, Weekday,
};
pub use postgres::PostgresStore;
pub use query::{BranchQuery, DateRange, OrderQuery, ProductQuery, ProductSort, SortDirection};
pub use store::{BranchStore, OrderStore, ProductStore, Store, UserStore};
