use chrono::{DateTime, Duration, Utc};
use common::{Email, UserId};
use store::{PasswordReset, Role, Session, Store, User};
use tracing::{info, warn};

use super::password::Passwords;
use super::token::{generate_token, hash_token};
use crate::error::{DomainError, Result};
use crate::validation::Validator;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// How long a password reset token stays valid.
pub const PASSWORD_RESET_TTL_MINUTES: i64 = 60;

/// Input for [`AccountService::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: Email,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    /// The raw bearer token. Only its hash is stored.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued reset token. The raw token is handed back once; only its
/// hash is stored.
#[derive(Debug, Clone)]
pub struct ResetTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn validate_password(v: &mut Validator, password: &str) {
    let len = password.chars().count();
    v.check(
        (6..=100).contains(&len),
        "Password must be between 6 and 100 characters",
    );
}

/// Registration, login sessions and profiles.
pub struct AccountService<S: Store> {
    store: S,
    passwords: Passwords,
    session_ttl: Duration,
}

impl<S: Store> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            passwords: Passwords::default(),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn with_passwords(mut self, passwords: Passwords) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Creates a `USER` account.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<User> {
        let mut v = Validator::new();
        v.length("Name", &registration.name, 2, 100)
            .phone("Phone", &registration.phone);
        let email = Email::parse(&registration.email);
        if let Err(ref e) = email {
            v.check(false, format!("Invalid email: {e}"));
        }
        validate_password(&mut v, &registration.password);
        v.finish()?;
        let email = email.map_err(|e| DomainError::Validation(e.to_string()))?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: registration.name.trim().to_string(),
            email,
            phone: registration.phone.trim().to_string(),
            password_hash: self.passwords.hash(&registration.password)?,
            role: Role::User,
            avatar: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_user(&user).await.map_err(|e| match e {
            store::StoreError::Conflict(_) => {
                DomainError::Conflict("Email already registered".to_string())
            }
            other => other.into(),
        })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verifies credentials and opens a session.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let outcome = self.try_login(email, password).await;
        let label = if outcome.is_ok() { "success" } else { "failure" };
        metrics::counter!("logins_total", "outcome" => label).increment(1);
        outcome
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let email = Email::parse(email).map_err(|_| DomainError::InvalidCredentials)?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash) {
            return Err(DomainError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(DomainError::AccountDeactivated);
        }

        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            token_hash: hash_token(&token),
            user_id: user.id,
            expires_at: now + self.session_ttl,
            created_at: now,
        };
        self.store.insert_session(&session).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            user,
            token,
            expires_at: session.expires_at,
        })
    }

    /// Resolves a bearer token to its principal.
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let token_hash = hash_token(token);
        let session = self
            .store
            .find_session(&token_hash)
            .await?
            .ok_or(DomainError::Unauthenticated)?;

        if session.is_expired(Utc::now()) {
            self.store.delete_session(&token_hash).await?;
            return Err(DomainError::Unauthenticated);
        }

        let user = self
            .store
            .find_user(session.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(DomainError::Unauthenticated)?;

        Ok(Principal {
            user_id: user.id,
            email: user.email,
            role: user.role,
        })
    }

    /// Ends the session the token belongs to.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.delete_session(&hash_token(token)).await?;
        Ok(())
    }

    /// Ends every session of a user. Returns how many were ended.
    #[tracing::instrument(skip(self))]
    pub async fn logout_all(&self, user_id: UserId) -> Result<u64> {
        let ended = self.store.delete_user_sessions(user_id).await?;
        info!(%user_id, ended, "All sessions ended");
        Ok(ended)
    }

    /// Issues a password reset token, replacing any earlier one.
    #[tracing::instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<ResetTicket> {
        let email = Email::parse(email)
            .map_err(|e| DomainError::Validation(format!("Invalid email: {e}")))?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::Validation("Email not found".to_string()))?;

        let token = generate_token();
        let now = Utc::now();
        let reset = PasswordReset {
            user_id: user.id,
            token_hash: hash_token(&token),
            expires_at: now + Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
            created_at: now,
        };
        self.store.upsert_password_reset(&reset).await?;

        info!(user_id = %user.id, "Password reset token issued");
        Ok(ResetTicket {
            token,
            expires_at: reset.expires_at,
        })
    }

    /// Sets a new password using a reset token. The token is consumed and
    /// every open session of the account is ended.
    #[tracing::instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let mut v = Validator::new();
        v.check(!token.trim().is_empty(), "Token is required");
        validate_password(&mut v, new_password);
        v.finish()?;

        let reset = self
            .store
            .find_password_reset(&hash_token(token.trim()))
            .await?
            .ok_or(DomainError::InvalidResetToken)?;
        if reset.is_expired(Utc::now()) {
            self.store.delete_password_reset(reset.user_id).await?;
            return Err(DomainError::InvalidResetToken);
        }

        let mut user = self
            .store
            .find_user(reset.user_id)
            .await?
            .ok_or(DomainError::InvalidResetToken)?;
        user.password_hash = self.passwords.hash(new_password)?;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        self.store.delete_password_reset(user.id).await?;
        let ended = self.store.delete_user_sessions(user.id).await?;
        info!(user_id = %user.id, ended, "Password reset");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn profile(&self, user_id: UserId) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn update_profile(&self, user_id: UserId, changes: ProfileChanges) -> Result<User> {
        let mut v = Validator::new();
        if let Some(ref name) = changes.name {
            v.length("Name", name, 2, 100);
        }
        if let Some(ref phone) = changes.phone {
            v.phone("Phone", phone);
        }
        if let Some(ref avatar) = changes.avatar {
            v.url("Avatar", avatar);
        }
        v.finish()?;

        let mut user = self.profile(user_id).await?;
        if let Some(name) = changes.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = changes.phone {
            user.phone = phone.trim().to_string();
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Some(avatar.trim().to_string());
        }
        user.updated_at = Utc::now();

        self.store.update_user(&user).await?;
        Ok(user)
    }

    /// Makes sure an administrator with this email exists, creating it or
    /// promoting an existing account. The password of an existing account
    /// is left untouched.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let parsed = Email::parse(email).map_err(|e| DomainError::Validation(e.to_string()))?;

        if let Some(mut user) = self.store.find_user_by_email(&parsed).await? {
            if user.role != Role::Admin || !user.is_active {
                warn!(user_id = %user.id, "Promoting existing account to administrator");
                user.role = Role::Admin;
                user.is_active = true;
                user.updated_at = Utc::now();
                self.store.update_user(&user).await?;
            }
            return Ok(user);
        }

        let mut v = Validator::new();
        v.length("Name", name, 2, 100);
        validate_password(&mut v, password);
        v.finish()?;

        let now = Utc::now();
        let admin = User {
            id: UserId::new(),
            name: name.trim().to_string(),
            email: parsed,
            phone: String::new(),
            password_hash: self.passwords.hash(password)?,
            role: Role::Admin,
            avatar: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&admin).await?;
        info!(user_id = %admin.id, "Administrator account created");
        Ok(admin)
    }
}
