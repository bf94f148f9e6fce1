//! Roles, users and login.

use common::{RoleId, RoleName, UserId};
use serde::Deserialize;
use store::{NewUser, Role, User, UserPatch, UserStore};

use crate::error::{DomainError, ValidationError};
use crate::password::{hash_password, verify_password};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 10;

/// Input for a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub role_id: Option<RoleId>,
}

/// Partial user update. A supplied password is hashed again; a `null`
/// address or phone clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub phone: Option<Option<String>>,
    pub password: Option<String>,
    pub role_id: Option<RoleId>,
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn check_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        })
    } else {
        Ok(())
    }
}

/// Service for roles, users and password login.
pub struct UserService<S> {
    store: S,
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn ensure_role(&self, role_id: RoleId) -> Result<(), DomainError> {
        match self.store.get_role(role_id).await? {
            Some(_) => Ok(()),
            None => Err(ValidationError::UnknownRole(role_id).into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_role(&self, name: &str) -> Result<Role, DomainError> {
        let name: RoleName = name.trim().parse()?;
        Ok(self.store.create_role(name).await?)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, DomainError> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DomainError> {
        Ok(self.store.get_role(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_role(&self, id: RoleId, name: &str) -> Result<Option<Role>, DomainError> {
        let name: RoleName = name.trim().parse()?;
        Ok(self.store.rename_role(id, name).await?)
    }

    /// Deletes a role after unassigning it.
    ///
    /// Returns the users that lost the role, or None if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_role(&self, id: RoleId) -> Result<Option<Vec<UserId>>, DomainError> {
        let affected = self.store.delete_role(id).await?;
        if let Some(users) = &affected {
            tracing::info!(role_id = %id, unassigned = users.len(), "role deleted");
        }
        Ok(affected)
    }

    #[tracing::instrument(skip(self, cmd), fields(email = %cmd.email))]
    pub async fn create_user(&self, cmd: CreateUser) -> Result<User, DomainError> {
        let last_name = required(&cmd.last_name, "last name")?;
        let first_name = required(&cmd.first_name, "first name")?;
        let email = check_email(&cmd.email)?;
        check_password(&cmd.password)?;
        if let Some(role_id) = cmd.role_id {
            self.ensure_role(role_id).await?;
        }

        let user = self
            .store
            .create_user(NewUser {
                last_name,
                first_name,
                email,
                address: cmd.address,
                phone: cmd.phone,
                password_hash: hash_password(&cmd.password)?,
                role_id: cmd.role_id,
            })
            .await?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.store.get_user(id).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self.store.get_user_by_email(email.trim()).await?)
    }

    #[tracing::instrument(skip(self, cmd))]
    pub async fn update_user(
        &self,
        id: UserId,
        cmd: UpdateUser,
    ) -> Result<Option<User>, DomainError> {
        let password_hash = match cmd.password.as_deref() {
            Some(password) => {
                check_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };
        if let Some(role_id) = cmd.role_id {
            self.ensure_role(role_id).await?;
        }
        let patch = UserPatch {
            last_name: cmd
                .last_name
                .as_deref()
                .map(|v| required(v, "last name"))
                .transpose()?,
            first_name: cmd
                .first_name
                .as_deref()
                .map(|v| required(v, "first name"))
                .transpose()?,
            address: cmd.address,
            phone: cmd.phone,
            password_hash,
            role_id: cmd.role_id,
        };
        Ok(self.store.update_user(id, patch).await?)
    }

    /// Deletes a user. A user who still has orders is a store conflict.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<bool, DomainError> {
        Ok(self.store.delete_user(id).await?)
    }

    /// Checks an email and password pair.
    ///
    /// Unknown email and wrong password fail the same way.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let Some(user) = self.store.get_user_by_email(email.trim()).await? else {
            metrics::counter!("logins_failed_total").increment(1);
            tracing::warn!("login failed: unknown email");
            return Err(DomainError::InvalidCredentials);
        };
        if !verify_password(&user.password_hash, password)? {
            metrics::counter!("logins_failed_total").increment(1);
            tracing::warn!(user_id = %user.id, "login failed: wrong password");
            return Err(DomainError::InvalidCredentials);
        }
        tracing::info!(user_id = %user.id, "login ok");
        Ok(user)
    }
}
