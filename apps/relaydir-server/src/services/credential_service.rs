use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use relaydir_db::models::credential::{ApiCredential, CredentialUpdate};
use relaydir_db::repositories::credential_repo::CredentialRepository;

/// Unique-key collisions are vanishingly rare with UUID material, but key
/// generation is the one write that retries before giving up.
const KEY_GENERATION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct CredentialService {
    credentials: CredentialRepository,
}

impl CredentialService {
    pub fn new(credentials: CredentialRepository) -> Self {
        Self { credentials }
    }

    pub async fn create(
        &self,
        rate_limit: i32,
        description: Option<&str>,
    ) -> Result<ApiCredential, ApiError> {
        if rate_limit <= 0 {
            return Err(ApiError::Validation("rate_limit must be positive".into()));
        }

        for _ in 0..KEY_GENERATION_ATTEMPTS {
            let key = generate_key();
            if let Some(credential) =
                self.credentials.create(&key, rate_limit, description).await?
            {
                info!("Created API credential {}", credential.id);
                return Ok(credential);
            }
        }

        Err(ApiError::Conflict(
            "Could not generate a unique API key".into(),
        ))
    }

    pub async fn get_all(&self) -> Result<Vec<ApiCredential>, ApiError> {
        Ok(self.credentials.get_all().await?)
    }

    pub async fn update(
        &self,
        id: i64,
        update: CredentialUpdate,
    ) -> Result<Option<ApiCredential>, ApiError> {
        if let Some(rate_limit) = update.rate_limit {
            if rate_limit <= 0 {
                return Err(ApiError::Validation("rate_limit must be positive".into()));
            }
        }
        Ok(self.credentials.update(id, &update).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ApiError> {
        Ok(self.credentials.delete(id).await?)
    }

    /// Key lookup for the public-route extractor. Active-flag enforcement is
    /// the caller's concern so a disabled key can be reported as such.
    pub async fn resolve_key(&self, key: &str) -> Result<Option<ApiCredential>, ApiError> {
        Ok(self.credentials.get_by_key(key).await?)
    }
}

fn generate_key() -> String {
    format!("RD-{}", Uuid::new_v4().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_the_expected_shape() {
        let key = generate_key();
        assert!(key.starts_with("RD-"));
        assert_eq!(key.len(), 3 + 36);
        assert_eq!(key, key.to_uppercase());
    }

    #[test]
    fn generated_keys_are_unique_in_practice() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
    }
}
