/// Account manager: signup, one-time code verification, login and sessions
use crate::{
    account::{password, ReferralLink, Session},
    config::ServerConfig,
    error::{WalletError, WalletResult},
    metrics,
    models::{PendingSignup, Role, Tier, Transaction, TransactionType, User, Wallet},
    store::{LedgerStore, StoreTransaction},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const ACCOUNT_NUMBER_LEN: usize = 11;
const REFERRAL_CODE_LEN: usize = 6;
const MAX_IDENTIFIER_ATTEMPTS: usize = 16;

lazy_static! {
    /// Verified against when the email is unknown, so both login failures cost one hash
    static ref DUMMY_PASSWORD_HASH: Option<String> =
        password::hash_password("loop-rewards-unknown-account").ok();
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Account manager service
pub struct AccountManager {
    store: Arc<dyn LedgerStore>,
    config: Arc<ServerConfig>,
}

/// Trim and lower-case an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim and upper-case a referral code; blank codes are dropped
pub fn normalize_referral_code(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty())
}

fn generate_signup_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    (0..ACCOUNT_NUMBER_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn generate_referral_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Look a user up by email or account number
pub(crate) async fn find_by_identifier(
    tx: &mut dyn StoreTransaction,
    identifier: &str,
) -> WalletResult<Option<User>> {
    let identifier = identifier.trim();
    if let Some(user) = tx.user_by_email(&normalize_email(identifier)).await? {
        return Ok(Some(user));
    }
    tx.user_by_account_number(identifier).await
}

impl AccountManager {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<ServerConfig>) -> Self {
        Self { store, config }
    }

    /// Start a signup and return the one-time code
    ///
    /// Overwrites whatever signup was pending before.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        referral_code: Option<&str>,
    ) -> WalletResult<String> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(WalletError::Validation("Invalid email format".to_string()));
        }
        if password.is_empty() {
            return Err(WalletError::Validation("Password cannot be empty".to_string()));
        }

        let password_hash = password::hash_password(password)?;

        let mut tx = self.store.begin().await?;
        if tx.user_by_email(&email).await?.is_some() {
            return Err(WalletError::DuplicateIdentity(email));
        }

        let code = generate_signup_code();
        tx.put_pending_signup(&PendingSignup {
            email: email.clone(),
            code: code.clone(),
            password_hash,
            referral_code: normalize_referral_code(referral_code),
            created_at: Utc::now(),
        })
        .await?;
        tx.commit().await?;

        metrics::record_signup();
        tracing::info!("Signup pending for {}", email);

        Ok(code)
    }

    /// Drop the pending signup if it still holds this email and code
    ///
    /// Used when the code could not be delivered; a newer signup is left alone.
    pub async fn discard_signup(&self, email: &str, code: &str) -> WalletResult<()> {
        let email = normalize_email(email);
        let mut tx = self.store.begin().await?;

        match tx.pending_signup().await? {
            Some(pending) if pending.email == email && pending.code == code => {
                tx.clear_pending_signup().await?;
                tx.commit().await?;
                tracing::info!("Discarded undeliverable signup for {}", email);
            }
            _ => {}
        }

        Ok(())
    }

    /// Redeem the pending one-time code, creating the user and the wallet
    pub async fn verify_code(&self, code: &str) -> WalletResult<(User, Wallet)> {
        let mut tx = self.store.begin().await?;

        let pending = match tx.pending_signup().await? {
            Some(pending) => pending,
            None => {
                metrics::record_verification("mismatch");
                return Err(WalletError::CodeMismatch);
            }
        };

        let ttl = Duration::seconds(self.config.signup.code_ttl_secs);
        if Utc::now() - pending.created_at > ttl {
            tx.clear_pending_signup().await?;
            tx.commit().await?;
            metrics::record_verification("expired");
            tracing::debug!("Pending signup for {} expired", pending.email);
            return Err(WalletError::CodeMismatch);
        }

        if pending.code != code.trim() {
            metrics::record_verification("mismatch");
            return Err(WalletError::CodeMismatch);
        }

        if tx.user_by_email(&pending.email).await?.is_some() {
            return Err(WalletError::DuplicateIdentity(pending.email));
        }

        let account_number = self.unique_account_number(tx.as_mut()).await?;
        let referral_code = self.unique_referral_code(tx.as_mut()).await?;

        let role = if self.config.is_admin_email(&pending.email) {
            Role::Admin
        } else {
            Role::User
        };

        let mut user = User {
            id: Uuid::new_v4().to_string(),
            email: pending.email.clone(),
            account_number,
            password_hash: pending.password_hash.clone(),
            is_verified: true,
            is_suspended: false,
            role,
            tier: Tier::Basic,
            referral_code,
            referred_by: None,
            streak: 0,
            xp: 0,
            level: 1,
            created_at: Utc::now(),
        };

        // Resolve the referrer before the new user exists so a code can never point at itself.
        let referrer = match pending.referral_code.as_deref() {
            Some(code) => tx.user_by_referral_code(code).await?,
            None => None,
        };
        if let Some(ref referrer) = referrer {
            user.referred_by = Some(referrer.id.clone());
        }

        tx.insert_user(&user).await?;

        let wallet = Wallet {
            user_id: user.id.clone(),
            balance: self.config.rewards.starting_balance,
            points: self.config.rewards.starting_points,
        };
        tx.insert_wallet(&wallet).await?;

        let mut referral_paid = false;
        if let Some(referrer) = referrer {
            if let Some(mut referrer_wallet) = tx.wallet(&referrer.id).await? {
                let bonus = self.config.rewards.referral_bonus;
                referrer_wallet.balance += bonus;
                tx.update_wallet(&referrer_wallet).await?;
                tx.append_transaction(&Transaction::approved(
                    &referrer.id,
                    TransactionType::TaskReward,
                    bonus,
                    format!("Incentive: Referral from {}", user.email),
                ))
                .await?;
                referral_paid = true;
            } else {
                tracing::warn!("Referrer {} has no wallet, skipping bonus", referrer.id);
            }
        }

        tx.clear_pending_signup().await?;
        tx.commit().await?;

        metrics::record_verification("created");
        if referral_paid {
            metrics::record_ledger_entry(TransactionType::TaskReward.as_str());
        }
        tracing::info!(
            "Created account {} ({}) with role {}",
            user.id,
            user.email,
            user.role.as_str()
        );

        Ok((user, wallet))
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> WalletResult<User> {
        let email = normalize_email(email);

        // The unit of work ends with this statement, before any hashing.
        let user = self.store.begin().await?.user_by_email(&email).await?;

        let Some(user) = user else {
            if let Some(hash) = DUMMY_PASSWORD_HASH.as_ref() {
                let _ = password::verify_password(password, hash);
            }
            return Err(WalletError::AccessDenied("Invalid credentials".to_string()));
        };

        if !password::verify_password(password, &user.password_hash)? {
            tracing::debug!("Password mismatch for {}", email);
            return Err(WalletError::AccessDenied("Invalid credentials".to_string()));
        }

        if user.is_suspended {
            return Err(WalletError::AccessDenied("Account is suspended".to_string()));
        }

        Ok(user)
    }

    /// Sign a session token for a user
    pub fn issue_session(&self, user: &User) -> WalletResult<Session> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.clone(),
            role: user.role,
            iat: now,
            exp: now + self.config.authentication.session_ttl_secs,
        };

        let access_jwt = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| WalletError::Jwt(format!("Failed to generate token: {}", e)))?;

        Ok(Session {
            access_jwt,
            user: user.clone(),
        })
    }

    /// Validate a session token and reload its user
    pub async fn restore_session(&self, token: &str) -> WalletResult<User> {
        let decoded = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!("Session token rejected: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    WalletError::Authentication("Session has expired".to_string())
                }
                _ => WalletError::Authentication("Invalid session token".to_string()),
            }
        })?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .user_by_id(&decoded.claims.sub)
            .await?
            .ok_or_else(|| WalletError::AccessDenied("Session user no longer exists".to_string()))?;

        if user.is_suspended {
            return Err(WalletError::AccessDenied("Account is suspended".to_string()));
        }

        Ok(user)
    }

    /// Grant or revoke the administrative role
    pub async fn set_role(&self, identifier: &str, role: Role) -> WalletResult<User> {
        let mut tx = self.store.begin().await?;
        let mut user = find_by_identifier(tx.as_mut(), identifier)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("User {}", identifier)))?;

        user.role = role;
        tx.update_user(&user).await?;
        tx.commit().await?;

        tracing::info!("Set role of {} to {}", user.id, role.as_str());
        Ok(user)
    }

    /// Suspend or reinstate an account
    pub async fn set_suspended(&self, identifier: &str, suspended: bool) -> WalletResult<User> {
        let mut tx = self.store.begin().await?;
        let mut user = find_by_identifier(tx.as_mut(), identifier)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("User {}", identifier)))?;

        user.is_suspended = suspended;
        tx.update_user(&user).await?;
        tx.commit().await?;

        tracing::info!("Account {} suspended: {}", user.id, suspended);
        Ok(user)
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: &str) -> WalletResult<User> {
        let mut tx = self.store.begin().await?;
        tx.user_by_id(user_id)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("User {}", user_id)))
    }

    /// Shareable link that prefills the referral code on signup
    pub fn referral_link(&self, user: &User) -> ReferralLink {
        let base = self.config.service.public_url.trim_end_matches('/');
        ReferralLink {
            referral_code: user.referral_code.clone(),
            link: format!("{}/?ref={}", base, user.referral_code),
        }
    }

    async fn unique_account_number(&self, tx: &mut dyn StoreTransaction) -> WalletResult<String> {
        for _ in 0..MAX_IDENTIFIER_ATTEMPTS {
            let candidate = generate_account_number();
            if tx.user_by_account_number(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WalletError::Internal(
            "Could not allocate a unique account number".to_string(),
        ))
    }

    async fn unique_referral_code(&self, tx: &mut dyn StoreTransaction) -> WalletResult<String> {
        for _ in 0..MAX_IDENTIFIER_ATTEMPTS {
            let candidate = generate_referral_code();
            if tx.user_by_referral_code(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WalletError::Internal(
            "Could not allocate a unique referral code".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::store::MemoryStore;

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.authentication.admin_emails = vec!["ops@loop.test".to_string()];
        config
    }

    fn create_test_manager() -> (AccountManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = AccountManager::new(store.clone(), Arc::new(test_config()));
        (manager, store)
    }

    async fn register(manager: &AccountManager, email: &str, referral: Option<&str>) -> (User, Wallet) {
        let code = manager.signup(email, "password123", referral).await.unwrap();
        manager.verify_code(&code).await.unwrap()
    }

    #[tokio::test]
    async fn test_signup_returns_six_digit_code() {
        let (manager, _) = create_test_manager();
        let code = manager.signup("new@loop.test", "password123", None).await.unwrap();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        let value: u32 = code.parse().unwrap();
        assert!((100_000..=999_999).contains(&value));
    }

    #[tokio::test]
    async fn test_signup_validates_input() {
        let (manager, _) = create_test_manager();
        assert!(matches!(
            manager.signup("not-an-email", "pw", None).await,
            Err(WalletError::Validation(_))
        ));
        assert!(matches!(
            manager.signup("a@loop.test", "", None).await,
            Err(WalletError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_creates_basic_user_with_starting_grant() {
        let (manager, store) = create_test_manager();
        let (user, wallet) = register(&manager, "  New@Loop.Test ", None).await;

        assert_eq!(user.email, "new@loop.test");
        assert_eq!(user.tier, Tier::Basic);
        assert_eq!(user.role, Role::User);
        assert!(user.is_verified);
        assert_eq!(user.account_number.len(), 11);
        assert!(user.account_number.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(user.referral_code.len(), 6);
        assert_eq!(wallet.balance, 1250);
        assert_eq!(wallet.points, 1000);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.pending_signup().await.unwrap().is_none());
        assert!(tx.recent_transactions(&user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_code_creates_nothing() {
        let (manager, store) = create_test_manager();
        let code = manager.signup("new@loop.test", "password123", None).await.unwrap();
        let wrong = if code == "123456" { "654321" } else { "123456" };

        assert!(matches!(
            manager.verify_code(wrong).await,
            Err(WalletError::CodeMismatch)
        ));

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.count_users().await.unwrap(), 0);
        assert!(tx.pending_signup().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_verify_without_pending_signup() {
        let (manager, _) = create_test_manager();
        assert!(matches!(
            manager.verify_code("123456").await,
            Err(WalletError::CodeMismatch)
        ));
    }

    #[tokio::test]
    async fn test_newer_signup_replaces_pending_code() {
        let (manager, _) = create_test_manager();
        let first = manager.signup("first@loop.test", "pw", None).await.unwrap();
        let second = manager.signup("second@loop.test", "pw", None).await.unwrap();

        if first != second {
            assert!(manager.verify_code(&first).await.is_err());
        }
        let (user, _) = manager.verify_code(&second).await.unwrap();
        assert_eq!(user.email, "second@loop.test");
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected_and_cleared() {
        let store = Arc::new(MemoryStore::new());
        let manager = AccountManager::new(store.clone(), Arc::new(test_config()));

        let mut tx = store.begin().await.unwrap();
        tx.put_pending_signup(&PendingSignup {
            email: "late@loop.test".to_string(),
            code: "424242".to_string(),
            password_hash: password::hash_password("pw").unwrap(),
            referral_code: None,
            created_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(
            manager.verify_code("424242").await,
            Err(WalletError::CodeMismatch)
        ));

        let mut tx = store.begin().await.unwrap();
        assert!(tx.pending_signup().await.unwrap().is_none());
        assert_eq!(tx.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (manager, _) = create_test_manager();
        register(&manager, "dup@loop.test", None).await;

        assert!(matches!(
            manager.signup("DUP@loop.test", "pw", None).await,
            Err(WalletError::DuplicateIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_referral_credits_referrer_once() {
        let (manager, store) = create_test_manager();
        let (referrer, _) = register(&manager, "referrer@loop.test", None).await;

        let code = referrer.referral_code.to_lowercase();
        let (newcomer, newcomer_wallet) =
            register(&manager, "newcomer@loop.test", Some(&format!(" {} ", code))).await;

        assert_eq!(newcomer.referred_by.as_deref(), Some(referrer.id.as_str()));
        assert_eq!(newcomer_wallet.balance, 1250);

        let mut tx = store.begin().await.unwrap();
        let referrer_wallet = tx.wallet(&referrer.id).await.unwrap().unwrap();
        assert_eq!(referrer_wallet.balance, 1750);

        let history = tx.recent_transactions(&referrer.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, TransactionType::TaskReward);
        assert_eq!(history[0].amount, 500);
        assert!(history[0].description.contains("newcomer@loop.test"));
    }

    #[tokio::test]
    async fn test_unknown_referral_code_is_ignored() {
        let (manager, _) = create_test_manager();
        let (user, wallet) = register(&manager, "solo@loop.test", Some("NOPE00")).await;
        assert!(user.referred_by.is_none());
        assert_eq!(wallet.balance, 1250);
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let (manager, _) = create_test_manager();
        register(&manager, "login@loop.test", None).await;

        let user = manager.login("Login@loop.test", "password123").await.unwrap();
        assert_eq!(user.email, "login@loop.test");

        assert!(matches!(
            manager.login("login@loop.test", "wrong").await,
            Err(WalletError::AccessDenied(_))
        ));
        assert!(matches!(
            manager.login("ghost@loop.test", "password123").await,
            Err(WalletError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_fail_alike() {
        let (manager, _) = create_test_manager();
        register(&manager, "known@loop.test", None).await;

        let wrong_password = manager.login("known@loop.test", "wrong").await.unwrap_err();
        let unknown_email = manager.login("ghost@loop.test", "wrong").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());

        let dummy = DUMMY_PASSWORD_HASH.as_ref().unwrap();
        assert!(!password::verify_password("wrong", dummy).unwrap());
    }

    #[tokio::test]
    async fn test_discard_signup_only_clears_matching_slot() {
        let (manager, store) = create_test_manager();
        let first = manager.signup("first@loop.test", "pw", None).await.unwrap();
        let second = manager.signup("second@loop.test", "pw", None).await.unwrap();

        manager.discard_signup("first@loop.test", &first).await.unwrap();
        {
            let mut tx = store.begin().await.unwrap();
            let pending = tx.pending_signup().await.unwrap().unwrap();
            assert_eq!(pending.email, "second@loop.test");
        }

        manager.discard_signup("Second@loop.test", &second).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.pending_signup().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_suspended_user_cannot_login() {
        let (manager, _) = create_test_manager();
        let (user, _) = register(&manager, "bad@loop.test", None).await;
        manager.set_suspended(&user.account_number, true).await.unwrap();

        assert!(matches!(
            manager.login("bad@loop.test", "password123").await,
            Err(WalletError::AccessDenied(_))
        ));

        manager.set_suspended("bad@loop.test", false).await.unwrap();
        assert!(manager.login("bad@loop.test", "password123").await.is_ok());
    }

    #[tokio::test]
    async fn test_configured_admin_email_gets_admin_role() {
        let (manager, _) = create_test_manager();
        let (admin, _) = register(&manager, "ops@loop.test", None).await;
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_set_role_promotes_user() {
        let (manager, _) = create_test_manager();
        let (user, _) = register(&manager, "promote@loop.test", None).await;

        let updated = manager.set_role("promote@loop.test", Role::Admin).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(manager.get_user(&user.id).await.unwrap().role, Role::Admin);

        assert!(matches!(
            manager.set_role("nobody@loop.test", Role::Admin).await,
            Err(WalletError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let (manager, _) = create_test_manager();
        let (user, _) = register(&manager, "session@loop.test", None).await;

        let session = manager.issue_session(&user).unwrap();
        let restored = manager.restore_session(&session.access_jwt).await.unwrap();
        assert_eq!(restored.id, user.id);

        assert!(matches!(
            manager.restore_session("garbage").await,
            Err(WalletError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_referral_link_uses_public_url() {
        let (manager, _) = create_test_manager();
        let (user, _) = register(&manager, "share@loop.test", None).await;

        let link = manager.referral_link(&user);
        assert_eq!(
            link.link,
            format!("http://localhost:8080/?ref={}", user.referral_code)
        );
    }
}
