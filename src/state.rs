use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::mail::{Mailer, SmtpMailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let users = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        let mailer = Arc::new(SmtpMailer::new(&config.mail)?) as Arc<dyn Mailer>;

        Ok(Self::from_parts(config, users, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            mailer,
        }
    }
}
