//! Authorization policy: role allow-lists, ownership rules and self-action
//! restrictions.
//!
//! Everything here is a pure decision over already-fetched data. The API
//! layer fetches the principal or record, then asks this module whether the
//! operation may proceed.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{Principal, Role};
use crate::models::content::{Comment, News};

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),
}

/// Per-request identity established by the authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub principal_id: Uuid,
    /// `None` until the role has been looked up in the store.
    pub role: Option<Role>,
}

impl AuthContext {
    pub fn new(principal_id: Uuid, role: Role) -> Self {
        Self {
            principal_id,
            role: Some(role),
        }
    }
}

/// A set of roles allowed to perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const ADMIN: RoleSet = RoleSet::of(&[Role::Admin]);
    pub const MODERATOR: RoleSet = RoleSet::of(&[Role::Moderator]);
    pub const MODERATOR_OR_ADMIN: RoleSet = RoleSet::of(&[Role::Moderator, Role::Admin]);
    pub const USER: RoleSet = RoleSet::of(&[Role::User]);
    pub const ANY: RoleSet = RoleSet::of(&Role::ALL);

    pub const fn of(roles: &[Role]) -> RoleSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= Self::bit(roles[i]);
            i += 1;
        }
        RoleSet(bits)
    }

    const fn bit(role: Role) -> u8 {
        match role {
            Role::User => 1,
            Role::Moderator => 1 << 1,
            Role::Admin => 1 << 2,
        }
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    pub fn roles(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.roles().map(|r| r.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Allow iff `role` is in `allowed`.
pub fn authorize_role(role: Role, allowed: RoleSet) -> Result<(), PolicyError> {
    if allowed.contains(role) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(format!(
            "Insufficient role; required: {allowed}"
        )))
    }
}

/// Kinds of owned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    News,
    Comment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::News => "news",
            ResourceKind::Comment => "comment",
        })
    }
}

/// Mutations subject to the ownership rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// A record owned by exactly one principal.
pub trait Owned {
    const KIND: ResourceKind;

    fn owner_id(&self) -> Uuid;
}

impl Owned for News {
    const KIND: ResourceKind = ResourceKind::News;

    fn owner_id(&self) -> Uuid {
        self.author.id
    }
}

impl Owned for Comment {
    const KIND: ResourceKind = ResourceKind::Comment;

    fn owner_id(&self) -> Uuid {
        self.author.id
    }
}

/// Whether `role` may perform `op` on a `kind` record it does not own.
///
/// Only Admin overrides, and only for deletion. Moderators never override.
fn overrides_ownership(role: Role, _kind: ResourceKind, op: Operation) -> bool {
    matches!((role, op), (Role::Admin, Operation::Delete))
}

/// Allow the owner, or a role that overrides ownership for this operation.
pub fn ensure_can_modify<R: Owned>(
    ctx: &AuthContext,
    resource: &R,
    op: Operation,
) -> Result<(), PolicyError> {
    if resource.owner_id() == ctx.principal_id {
        return Ok(());
    }
    if let Some(role) = ctx.role
        && overrides_ownership(role, R::KIND, op)
    {
        return Ok(());
    }
    Err(PolicyError::Forbidden(format!(
        "Not allowed to {op} this {}",
        R::KIND
    )))
}

/// Reject actions a principal targets at their own account.
pub fn ensure_not_self(ctx: &AuthContext, target_id: Uuid, action: &str) -> Result<(), PolicyError> {
    if ctx.principal_id == target_id {
        return Err(PolicyError::Forbidden(format!(
            "You cannot {action} your own account"
        )));
    }
    Ok(())
}

/// Admin account deletion: never self, never another Admin.
pub fn ensure_can_delete_principal(
    ctx: &AuthContext,
    target: &Principal,
) -> Result<(), PolicyError> {
    ensure_not_self(ctx, target.id, "delete")?;
    if target.role == Role::Admin {
        return Err(PolicyError::Forbidden(
            "Admin accounts cannot be deleted".into(),
        ));
    }
    Ok(())
}
