//! User accounts and bearer-token sessions.

mod password;
mod service;
mod token;

pub use password::Passwords;
pub use service::{
    AccountService, DEFAULT_SESSION_TTL_HOURS, LoginOutcome, PASSWORD_RESET_TTL_MINUTES, Principal,
    ProfileChanges, Registration, ResetTicket,
};
pub use token::{generate_token, hash_token};
