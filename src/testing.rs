//! In-process fakes for the store and mail transport.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{password::hash_password, repo::UserStore, repo_types::User},
    config::AppConfig,
    mail::{Mailer, OutgoingMail},
    state::AppState,
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn snapshot(&self, email: &str) -> Option<User> {
        let users = self.users.lock().unwrap();
        users.iter().find(|u| u.email == email).cloned()
    }

    /// Writes the reset fields directly, e.g. to plant an already expired token.
    pub fn force_reset_token(&self, email: &str, token: &str, expires_at: OffsetDateTime) {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.email == email).unwrap();
        user.reset_token = Some(token.to_string());
        user.reset_token_expires_at = Some(expires_at);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.reset_token_matches(token, now))
            .cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reset_token: None,
            reset_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(Some(user))
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn revoke_reset_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id == user_id && u.reset_token.as_deref() == Some(token))
        {
            Some(user) => {
                user.reset_token = None;
                user.reset_token_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id == user_id && u.reset_token.as_deref() == Some(token))
        {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.reset_token = None;
                user.reset_token_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Records every mail instead of sending it; can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("smtp: 421 service not available");
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_tests())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let users = Arc::new(MemoryUserStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_parts(
            Arc::new(config),
            users.clone(),
            mailer.clone(),
        );
        Self {
            state,
            users,
            mailer,
        }
    }

    pub async fn seed_user(&self, email: &str, password: &str) -> User {
        let hash = hash_password(password).expect("hash");
        self.users
            .create(email, &hash)
            .await
            .expect("create")
            .expect("fresh email")
    }

    /// Extracts the token from the most recent reset link sent.
    pub fn last_reset_token(&self) -> Option<String> {
        let mail = self.mailer.sent().pop()?;
        let start = mail.html.find("token=")? + "token=".len();
        let token: String = mail.html[start..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        Some(token)
    }
}
