/// Bank-account name resolution
///
/// Names come from a generative-language collaborator when one is configured,
/// and from a fixed list of plausible names otherwise. Resolution never fails.

use crate::{
    config::NameResolutionConfig,
    error::{WalletError, WalletResult},
    metrics,
    wallet::catalog,
};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Literal returned for account numbers too short to resolve
pub const UNRESOLVED: &str = "UNRESOLVED";

const MIN_ACCOUNT_DIGITS: usize = 10;

pub const FALLBACK_NAMES: &[&str] = &[
    "NOSAYI JOHN O.",
    "GABRIEL BOLUWARIN",
    "LAWRENCE MARTIN P.",
    "FATIMA BELLO",
];

/// Source of plausible account-holder names
#[async_trait]
pub trait AccountNameResolver: Send + Sync {
    async fn resolve(&self, bank_name: &str, account_number: &str) -> WalletResult<String>;
}

/// Resolver backed by a generateContent-style HTTP API
pub struct GenerativeNameResolver {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
    }
}

impl GenerativeNameResolver {
    pub fn new(config: &NameResolutionConfig, api_key: String) -> WalletResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WalletError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn prompt(bank_name: &str, account_number: &str) -> String {
        format!(
            "Act as an inter-bank settlement API node. For the bank \"{}\" and account number \"{}\", \
             generate a plausible Nigerian full name for the account owner. \
             Format: UPPERCASE. Only return the name. No extra text.",
            bank_name, account_number
        )
    }
}

#[async_trait]
impl AccountNameResolver for GenerativeNameResolver {
    async fn resolve(&self, bank_name: &str, account_number: &str) -> WalletResult<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": Self::prompt(bank_name, account_number) }] }]
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Internal(format!("Name resolution request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WalletError::Internal(format!(
                "Name resolution returned status {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Internal(format!("Invalid name resolution response: {}", e)))?;

        parsed
            .first_text()
            .ok_or_else(|| WalletError::Internal("Name resolution returned no text".to_string()))
    }
}

/// Resolution with local fallback and a simulated handshake delay
#[derive(Clone)]
pub struct AccountNameService {
    resolver: Option<Arc<dyn AccountNameResolver>>,
    delay: Duration,
}

impl AccountNameService {
    pub fn new(resolver: Option<Arc<dyn AccountNameResolver>>, delay: Duration) -> Self {
        Self { resolver, delay }
    }

    /// Build from configuration; without an API key only fallback names are used
    pub fn from_config(config: &NameResolutionConfig) -> WalletResult<Self> {
        let resolver: Option<Arc<dyn AccountNameResolver>> = match config.api_key {
            Some(ref key) => Some(Arc::new(GenerativeNameResolver::new(config, key.clone())?)),
            None => {
                tracing::info!("No name resolution API key configured, using fallback names");
                None
            }
        };

        Ok(Self::new(resolver, Duration::from_millis(config.delay_ms)))
    }

    /// Resolve the holder name for a bank account
    pub async fn resolve_account_name(&self, bank_id: &str, account_number: &str) -> String {
        let digits = account_number.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < MIN_ACCOUNT_DIGITS {
            metrics::record_name_resolution("unresolved");
            return UNRESOLVED.to_string();
        }

        let bank_name = catalog::bank_by_id(bank_id)
            .map(|b| b.name)
            .unwrap_or("Unknown Bank");

        let resolved = match self.resolver {
            Some(ref resolver) => match resolver.resolve(bank_name, account_number).await {
                Ok(name) if !name.trim().is_empty() => Some(name),
                Ok(_) => {
                    tracing::warn!("Name resolution returned an empty name, using fallback");
                    None
                }
                Err(e) => {
                    tracing::warn!("Name resolution failed, using fallback: {}", e);
                    None
                }
            },
            None => None,
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match resolved {
            Some(name) => {
                metrics::record_name_resolution("resolver");
                name.trim().to_uppercase()
            }
            None => {
                metrics::record_name_resolution("fallback");
                fallback_name()
            }
        }
    }
}

fn fallback_name() -> String {
    FALLBACK_NAMES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_NAMES[0])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver {
        answer: WalletResult<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(answer: WalletResult<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AccountNameResolver for FixedResolver {
        async fn resolve(&self, _bank_name: &str, _account_number: &str) -> WalletResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(name) => Ok(name.to_string()),
                Err(_) => Err(WalletError::Internal("collaborator down".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_short_account_number_is_unresolved() {
        let resolver = FixedResolver::new(Ok("ADA OKAFOR"));
        let service = AccountNameService::new(Some(resolver.clone()), Duration::ZERO);

        assert_eq!(service.resolve_account_name("1", "123456789").await, UNRESOLVED);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolver_answer_is_normalized() {
        let resolver = FixedResolver::new(Ok("  ada okafor \n"));
        let service = AccountNameService::new(Some(resolver), Duration::ZERO);

        assert_eq!(service.resolve_account_name("3", "0123456789").await, "ADA OKAFOR");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_known_names() {
        let resolver = FixedResolver::new(Err(WalletError::Internal(String::new())));
        let service = AccountNameService::new(Some(resolver), Duration::ZERO);

        let name = service.resolve_account_name("1", "01234567890").await;
        assert!(FALLBACK_NAMES.contains(&name.as_str()));
    }

    #[tokio::test]
    async fn test_empty_answer_falls_back() {
        let resolver = FixedResolver::new(Ok("   "));
        let service = AccountNameService::new(Some(resolver), Duration::ZERO);

        let name = service.resolve_account_name("1", "0123456789").await;
        assert!(FALLBACK_NAMES.contains(&name.as_str()));
    }

    #[tokio::test]
    async fn test_unconfigured_service_uses_fallback() {
        let service = AccountNameService::from_config(&NameResolutionConfig::default()).unwrap();
        let name = service.resolve_account_name("9", "0123456789").await;
        assert!(FALLBACK_NAMES.contains(&name.as_str()));
    }

    #[test]
    fn test_generate_response_parsing() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "BOLA ADE" }] } }]
        }))
        .unwrap();
        assert_eq!(parsed.first_text().as_deref(), Some("BOLA ADE"));

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.first_text().is_none());
    }
}
