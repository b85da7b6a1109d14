//! Standalone directory entities: companies, platforms and users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_entity;
use crate::entity::{CreateInput, IdKey, UniqueKey, UpdateInput, non_empty, non_empty_opt, set};
use crate::error::{Result, StoreError};
use crate::value::Value;

/// User role stored when none is given.
pub const DEFAULT_USER_ROLE: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCreate {
    pub name: String,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl CreateInput for CompanyCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        email_like("contact_email", self.contact_email.as_deref())
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("registration_number", self.registration_number.clone().into()),
            ("address", self.address.clone().into()),
            ("contact_email", self.contact_email.clone().into()),
            ("contact_phone", self.contact_phone.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub registration_number: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub contact_email: Option<Option<String>>,
    pub contact_phone: Option<Option<String>>,
}

impl UpdateInput for CompanyUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())?;
        email_like("contact_email", self.contact_email.clone().flatten().as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "registration_number", self.registration_number.as_ref());
        set(&mut out, "address", self.address.as_ref());
        set(&mut out, "contact_email", self.contact_email.as_ref());
        set(&mut out, "contact_phone", self.contact_phone.as_ref());
        out
    }
}

impl_entity!(Company, Company, IdKey, CompanyCreate, CompanyUpdate);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Platform {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub version: Option<String>,
    pub serial_numbers: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCreate {
    pub name: String,
    pub url: Option<String>,
    pub version: Option<String>,
    pub serial_numbers: Option<String>,
}

impl CreateInput for PlatformCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("url", self.url.clone().into()),
            ("version", self.version.clone().into()),
            ("serial_numbers", self.serial_numbers.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformUpdate {
    pub name: Option<String>,
    pub url: Option<Option<String>>,
    pub version: Option<Option<String>>,
    pub serial_numbers: Option<Option<String>>,
}

impl UpdateInput for PlatformUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "url", self.url.as_ref());
        set(&mut out, "version", self.version.as_ref());
        set(&mut out, "serial_numbers", self.serial_numbers.as_ref());
        out
    }
}

impl_entity!(Platform, Platform, IdKey, PlatformCreate, PlatformUpdate);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(String),
    Username(String),
    Email(String),
}

impl UniqueKey for UserKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::Username(username) => vec![("username", username.into())],
            Self::Email(email) => vec![("email", email.into())],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: Option<String>,
    /// `None` stores [`DEFAULT_USER_ROLE`].
    pub role: Option<String>,
    pub avatar: Option<String>,
}

impl UserCreate {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }
}

impl CreateInput for UserCreate {
    fn validate(&self) -> Result<()> {
        non_empty("username", &self.username)?;
        non_empty_opt("role", self.role.as_deref())?;
        email_like("email", self.email.as_deref())
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut out = vec![
            ("username", (&self.username).into()),
            ("email", self.email.clone().into()),
            ("avatar", self.avatar.clone().into()),
        ];
        set(&mut out, "role", self.role.as_ref());
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<Option<String>>,
    pub role: Option<String>,
    pub avatar: Option<Option<String>>,
}

impl UpdateInput for UserUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("username", self.username.as_deref())?;
        non_empty_opt("role", self.role.as_deref())?;
        email_like("email", self.email.clone().flatten().as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "username", self.username.as_ref());
        set(&mut out, "email", self.email.as_ref());
        set(&mut out, "role", self.role.as_ref());
        set(&mut out, "avatar", self.avatar.as_ref());
        out
    }
}

impl_entity!(User, User, UserKey, UserCreate, UserUpdate);

fn email_like(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(email) if !email.contains('@') => Err(StoreError::invalid_field(
            field,
            "must be an email address",
        )),
        _ => Ok(()),
    }
}
