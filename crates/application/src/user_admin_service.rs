//! User administration ports and application service.
//!
//! Account CRUD is an admin-only surface; the one self-service operation is
//! a password change verified against the current password.

use std::sync::Arc;

use async_trait::async_trait;
use crewplan_core::{AppError, AppResult, NonEmptyString};
use crewplan_domain::{
    AccessRequest, Actor, AuditAction, EmailAddress, Role, User, UserId, validate_password,
};

use crate::access::{ensure_allowed, ensure_authenticated};
use crate::{AuditEvent, AuditRepository};

/// A user account row: the domain user plus its stored credential.
#[derive(Debug, Clone)]
pub struct UserAccount {
    /// Domain user fields.
    pub user: User,
    /// Password hash produced by the [`PasswordHasher`] port.
    pub password_hash: String,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new account. Fails with a conflict when the email is taken.
    async fn insert(&self, account: UserAccount) -> AppResult<()>;

    /// Replaces the profile fields of an existing account.
    async fn update_profile(&self, user: User) -> AppResult<()>;

    /// Replaces the stored password hash.
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()>;

    /// Deletes an account. Fails with a conflict while the user still
    /// manages projects or holds assigned subtasks.
    async fn delete(&self, user_id: UserId) -> AppResult<()>;

    /// Finds an account by user id.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>>;

    /// Finds an account by email (emails are stored lower-cased).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    /// Lists all users, name order.
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Counts all users.
    async fn count(&self) -> AppResult<usize>;
}

/// Port for password hashing, keeping services free of crypto coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Parameters for creating a user account.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Display name.
    pub name: String,
    /// Unique login email.
    pub email: String,
    /// Initial plaintext password.
    pub password: String,
    /// Workspace role.
    pub role: Role,
}

/// Parameters for updating a user account's profile.
#[derive(Debug, Clone)]
pub struct UpdateUserInput {
    /// Account to update.
    pub user_id: UserId,
    /// New display name.
    pub name: String,
    /// New login email.
    pub email: String,
    /// New workspace role.
    pub role: Role,
}

/// Application service for account administration.
#[derive(Clone)]
pub struct UserAdminService {
    repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl UserAdminService {
    /// Creates a new user administration service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            password_hasher,
            audit_repository,
        }
    }

    /// Creates a user account.
    pub async fn create_user(
        &self,
        actor: Option<&Actor>,
        input: CreateUserInput,
    ) -> AppResult<User> {
        let actor = ensure_allowed(actor, &AccessRequest::UserCreate)?;

        let email = EmailAddress::new(input.email)?;
        validate_password(&input.password)?;
        let password_hash = self.password_hasher.hash_password(&input.password)?;

        let user = User {
            id: UserId::new(),
            name: NonEmptyString::new(input.name)?,
            email,
            role: input.role,
        };

        self.repository
            .insert(UserAccount {
                user: user.clone(),
                password_hash,
            })
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::UserCreated,
                resource_type: "user".to_owned(),
                resource_id: user.id.to_string(),
                detail: Some(format!(
                    "created {} account '{}'",
                    user.role.as_str(),
                    user.name
                )),
            })
            .await?;

        Ok(user)
    }

    /// Updates the profile fields of an account.
    pub async fn update_user(
        &self,
        actor: Option<&Actor>,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        let actor = ensure_allowed(actor, &AccessRequest::UserUpdate)?;

        let existing = self
            .repository
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", input.user_id)))?;

        let updated = User {
            id: existing.user.id,
            name: NonEmptyString::new(input.name)?,
            email: EmailAddress::new(input.email)?,
            role: input.role,
        };

        self.repository.update_profile(updated.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::UserUpdated,
                resource_type: "user".to_owned(),
                resource_id: updated.id.to_string(),
                detail: (existing.user.role != updated.role).then(|| {
                    format!(
                        "role changed from {} to {}",
                        existing.user.role.as_str(),
                        updated.role.as_str()
                    )
                }),
            })
            .await?;

        Ok(updated)
    }

    /// Deletes an account permanently. Deletion is terminal.
    pub async fn delete_user(&self, actor: Option<&Actor>, user_id: UserId) -> AppResult<()> {
        let actor = ensure_allowed(actor, &AccessRequest::UserDelete)?;

        let existing = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}'")))?;

        self.repository.delete(user_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::UserDeleted,
                resource_type: "user".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!("deleted account '{}'", existing.user.name)),
            })
            .await?;

        Ok(())
    }

    /// Changes the caller's own password after verifying the current one.
    pub async fn change_password(
        &self,
        actor: Option<&Actor>,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let actor = ensure_authenticated(actor)?;

        let account = self
            .repository
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", actor.id)))?;

        let current_valid = self
            .password_hasher
            .verify_password(current_password, &account.password_hash)?;

        if !current_valid {
            return Err(AppError::Unauthorized(
                "current password is incorrect".to_owned(),
            ));
        }

        validate_password(new_password)?;
        let new_hash = self.password_hasher.hash_password(new_password)?;
        self.repository.update_password(actor.id, &new_hash).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::PasswordChanged,
                resource_type: "user".to_owned(),
                resource_id: actor.id.to_string(),
                detail: None,
            })
            .await?;

        Ok(())
    }

    /// Returns an account's user fields by id. Administration surface,
    /// gated like the account mutations.
    pub async fn get_user(&self, actor: Option<&Actor>, user_id: UserId) -> AppResult<Option<User>> {
        ensure_allowed(actor, &AccessRequest::UserUpdate)?;
        Ok(self
            .repository
            .find_by_id(user_id)
            .await?
            .map(|account| account.user))
    }

    /// Lists all accounts. Administration surface, gated like the mutations.
    pub async fn list_users(&self, actor: Option<&Actor>) -> AppResult<Vec<User>> {
        ensure_allowed(actor, &AccessRequest::UserCreate)?;
        self.repository.list().await
    }
}
