//! Anonymous student profiles.
//!
//! Registration creates a `users/<id>` document in the remote store and
//! remembers the id on the device, so later launches can find the profile
//! again without any account.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OfpptError, Result};
use crate::storage::{DocumentStore, KeyValueStore};

pub const USERS_COLLECTION: &str = "users";
pub const USER_ID_KEY: &str = "anonymous_user_id";
pub const REGISTRATION_COMPLETED_KEY: &str = "registration_completed";

/// Accepted `niveau` codes: Technicien, Technicien Spécialisé, Qualification.
pub const NIVEAUX: [&str; 3] = ["T", "TS", "Q"];
/// Accepted `annee` values.
pub const ANNEES: [&str; 2] = ["1", "2"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub filiere: String,
    pub niveau: String,
    pub annee: String,
    #[serde(default)]
    pub option: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Registration form fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub filiere: String,
    pub niveau: String,
    pub annee: String,
    #[serde(default)]
    pub option: Option<String>,
}

impl NewUser {
    /// Check that every required field is filled and that `niveau` and
    /// `annee` are known codes.
    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.first_name,
            &self.last_name,
            &self.filiere,
            &self.niveau,
            &self.annee,
        )
    }
}

fn validate_fields(
    first_name: &str,
    last_name: &str,
    filiere: &str,
    niveau: &str,
    annee: &str,
) -> Result<()> {
    let required = [
        ("firstName", first_name),
        ("lastName", last_name),
        ("filiere", filiere),
        ("niveau", niveau),
        ("annee", annee),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(OfpptError::Profile(format!(
            "Please fill in all required fields: {}",
            missing.join(", ")
        )));
    }
    if !NIVEAUX.contains(&niveau.trim()) {
        return Err(OfpptError::Profile(format!("Unknown niveau: {}", niveau)));
    }
    if !ANNEES.contains(&annee.trim()) {
        return Err(OfpptError::Profile(format!("Unknown annee: {}", annee)));
    }
    Ok(())
}

/// A blank option is stored as `null`.
fn normalize_option(option: Option<String>) -> Option<String> {
    option.filter(|o| !o.trim().is_empty())
}

pub struct ProfileService {
    documents: Arc<dyn DocumentStore>,
    local: Arc<dyn KeyValueStore>,
}

impl ProfileService {
    pub fn new(documents: Arc<dyn DocumentStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self { documents, local }
    }

    pub async fn create_profile(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;
        let now = timestamp();
        let user = User {
            id: uuid::Uuid::new_v4().simple().to_string(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            filiere: new_user.filiere,
            niveau: new_user.niveau,
            annee: new_user.annee,
            option: normalize_option(new_user.option),
            created_at: now.clone(),
            updated_at: now,
        };

        self.documents
            .set(USERS_COLLECTION, &user.id, serde_json::to_value(&user)?)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error creating profile"))?;
        self.local.set(USER_ID_KEY, &user.id).await?;

        tracing::info!(user_id = %user.id, "Created profile");
        Ok(user)
    }

    /// Profile of the user registered on this device, if any.
    pub async fn current_profile(&self) -> Result<Option<User>> {
        let Some(user_id) = self.user_id().await? else {
            tracing::debug!("No user id stored locally");
            return Ok(None);
        };

        match self.documents.get(USERS_COLLECTION, &user_id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => {
                tracing::debug!(user_id = %user_id, "No user document found");
                Ok(None)
            }
        }
    }

    /// Merge `user` into the stored profile, refreshing `updated_at`.
    pub async fn update_profile(&self, mut user: User) -> Result<User> {
        validate_fields(
            &user.first_name,
            &user.last_name,
            &user.filiere,
            &user.niveau,
            &user.annee,
        )?;
        user.option = normalize_option(user.option.take());

        let user_id = self
            .user_id()
            .await?
            .ok_or_else(|| OfpptError::Profile("No user ID found".to_string()))?;

        user.updated_at = timestamp();
        let mut patch = serde_json::to_value(&user)?;
        // The document key stays authoritative over whatever id the caller passed.
        patch["id"] = serde_json::Value::String(user_id.clone());
        user.id = user_id.clone();

        self.documents
            .update(USERS_COLLECTION, &user_id, patch)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error updating profile"))?;
        Ok(user)
    }

    pub async fn user_id(&self) -> Result<Option<String>> {
        self.local.get(USER_ID_KEY).await
    }

    pub async fn is_registration_completed(&self) -> Result<bool> {
        Ok(self
            .local
            .get(REGISTRATION_COMPLETED_KEY)
            .await?
            .is_some_and(|v| v == "true"))
    }

    pub async fn mark_registration_completed(&self) -> Result<()> {
        self.local.set(REGISTRATION_COMPLETED_KEY, "true").await
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
