//! Client management ports and application service.

use std::sync::Arc;

use async_trait::async_trait;
use crewplan_core::{AppError, AppResult, NonEmptyString};
use crewplan_domain::{
    AccessRequest, Actor, AuditAction, Client, ClientId, ClientStatus, EmailAddress,
};

use crate::access::{ensure_allowed, ensure_authenticated};
use crate::{AuditEvent, AuditRepository};

/// Repository port for client persistence.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Stores a new client. Fails with a conflict when the name is taken.
    async fn insert(&self, client: Client) -> AppResult<()>;

    /// Replaces an existing client record.
    async fn update(&self, client: Client) -> AppResult<()>;

    /// Deletes a client. Fails with a conflict while projects reference it.
    async fn delete(&self, client_id: ClientId) -> AppResult<()>;

    /// Finds a client by its identifier.
    async fn find_by_id(&self, client_id: ClientId) -> AppResult<Option<Client>>;

    /// Lists all clients, name order.
    async fn list(&self) -> AppResult<Vec<Client>>;
}

/// Parameters for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClientInput {
    /// Unique client name.
    pub name: String,
    /// Optional billing / contact email.
    pub contact_email: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Initial engagement status.
    pub status: ClientStatus,
}

/// Parameters for updating a client.
#[derive(Debug, Clone)]
pub struct UpdateClientInput {
    /// Client to update.
    pub client_id: ClientId,
    /// New client name.
    pub name: String,
    /// New contact email, if any.
    pub contact_email: Option<String>,
    /// New phone number, if any.
    pub phone: Option<String>,
    /// New engagement status.
    pub status: ClientStatus,
}

/// Application service for client CRUD. Mutation is gated purely by role.
#[derive(Clone)]
pub struct ClientService {
    repository: Arc<dyn ClientRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl ClientService {
    /// Creates a new client service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Creates a client.
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: CreateClientInput,
    ) -> AppResult<Client> {
        let actor = ensure_allowed(actor, &AccessRequest::ClientCreate)?;

        let client = Client::new(input.name, input.contact_email, input.phone, input.status)?;
        self.repository.insert(client.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::ClientCreated,
                resource_type: "client".to_owned(),
                resource_id: client.id.to_string(),
                detail: Some(format!("created client '{}'", client.name)),
            })
            .await?;

        Ok(client)
    }

    /// Updates a client.
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        input: UpdateClientInput,
    ) -> AppResult<Client> {
        let actor = ensure_allowed(actor, &AccessRequest::ClientUpdate)?;

        let existing = self
            .repository
            .find_by_id(input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("client '{}'", input.client_id)))?;

        let updated = Client {
            id: existing.id,
            name: NonEmptyString::new(input.name)?,
            contact_email: input
                .contact_email
                .filter(|value| !value.trim().is_empty())
                .map(EmailAddress::new)
                .transpose()?,
            phone: input.phone.filter(|value| !value.trim().is_empty()),
            status: input.status,
        };

        self.repository.update(updated.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::ClientUpdated,
                resource_type: "client".to_owned(),
                resource_id: updated.id.to_string(),
                detail: None,
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a client permanently. Deletion is terminal.
    pub async fn delete(&self, actor: Option<&Actor>, client_id: ClientId) -> AppResult<()> {
        let actor = ensure_allowed(actor, &AccessRequest::ClientDelete)?;

        let existing = self
            .repository
            .find_by_id(client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("client '{client_id}'")))?;

        self.repository.delete(client_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::ClientDeleted,
                resource_type: "client".to_owned(),
                resource_id: client_id.to_string(),
                detail: Some(format!("deleted client '{}'", existing.name)),
            })
            .await?;

        Ok(())
    }

    /// Returns a client by id, if it exists.
    pub async fn get(&self, actor: Option<&Actor>, client_id: ClientId) -> AppResult<Option<Client>> {
        ensure_authenticated(actor)?;
        self.repository.find_by_id(client_id).await
    }

    /// Lists all clients.
    pub async fn list(&self, actor: Option<&Actor>) -> AppResult<Vec<Client>> {
        ensure_authenticated(actor)?;
        self.repository.list().await
    }
}
