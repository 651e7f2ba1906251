// src/auth.rs - Caller identity resolution
use crate::config::Config;
use crate::errors::LedgerError;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

/// Source of the caller identity recorded on new trades.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user_id(&self) -> Result<String, LedgerError>;
}

/// Fixed identity for tests and offline runs.
pub struct StaticIdentity(pub String);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user_id(&self) -> Result<String, LedgerError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AuthUser {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AuthSession {
    access_token: String,
    user: AuthUser,
}

/// Supabase auth collaborator. If no session exists yet, one is established
/// transparently via anonymous sign-in and a profile row is created for the
/// new user.
pub struct SupabaseAuth {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: Mutex<Option<AuthSession>>,
}

impl SupabaseAuth {
    pub fn new(config: &Config) -> Result<Self, LedgerError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_anon_key.clone(),
            session: Mutex::new(None),
        })
    }

    async fn sign_in_anonymously(&self) -> Result<AuthSession, LedgerError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.api_key)
            .json(&json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::StoreUnavailable(format!(
                "anonymous sign-in failed with {}: {}",
                status, body
            )));
        }

        let session: AuthSession = response.json().await?;
        info!("🔑 [AUTH] Anonymous session for user {}", session.user.id);

        self.create_user_profile(&session).await?;
        Ok(session)
    }

    async fn create_user_profile(&self, session: &AuthSession) -> Result<(), LedgerError> {
        let profile = json!({
            "id": session.user.id,
            "email": format!("anonymous-{}@example.com", session.user.id),
        });

        let response = self
            .http
            .post(format!("{}/rest/v1/users", self.base_url))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .json(&profile)
            .send()
            .await?;

        let status = response.status();
        // 409 means the profile already exists, which is not a failure.
        if !status.is_success() && status.as_u16() != 409 {
            let body = response.text().await.unwrap_or_default();
            warn!("⚠️  [AUTH] Profile insert failed with {}: {}", status, body);
            return Err(LedgerError::StoreUnavailable(format!(
                "user profile insert failed with {}",
                status
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn current_user_id(&self) -> Result<String, LedgerError> {
        let mut session = self.session.lock().await;
        if let Some(existing) = session.as_ref() {
            return Ok(existing.user.id.clone());
        }

        let fresh = self.sign_in_anonymously().await?;
        let user_id = fresh.user.id.clone();
        *session = Some(fresh);
        Ok(user_id)
    }
}
