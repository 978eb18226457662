//! Business rules for the coffee shop backend.
//!
//! Each service is generic over a [`store::Store`] backend and owns the
//! validation and state changes for one area:
//! - [`AccountService`]: registration, login and bearer-token sessions
//! - [`CatalogService`]: product management
//! - [`BranchService`]: branches, geocoding and proximity search
//! - [`OrderService`]: order placement and payment notifications
//! - [`AnalyticsService`]: sales reports over paid orders

pub mod account;
pub mod analytics;
pub mod branch;
pub mod catalog;
pub mod error;
pub mod order;
pub mod validation;

pub use account::{
    AccountService, DEFAULT_SESSION_TTL_HOURS, LoginOutcome, PASSWORD_RESET_TTL_MINUTES,
    Passwords, Principal, ProfileChanges, Registration, ResetTicket,
};
pub use analytics::{
    AnalyticsService, BranchPerformance, DEFAULT_REPORT_LIMIT, DailyRevenue, ProductSales,
    SalesSummary,
};
pub use branch::{
    BranchChanges, BranchService, DEFAULT_NEARBY_RADIUS_KM, MAX_NEARBY_RADIUS_KM, NearbyBranch,
    NewBranch,
};
pub use catalog::{CatalogService, MAX_PRICE, NewProduct, ProductChanges};
pub use error::{DomainError, Result};
pub use order::{
    NotificationOutcome, OrderFilter, OrderItemInput, OrderService, PlaceOrder, PlacedOrder,
};
