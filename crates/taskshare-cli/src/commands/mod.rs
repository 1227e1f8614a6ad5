pub mod account;
pub mod categories;
pub mod tasks;

use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use taskshare_application::TaskShareClient;
use taskshare_core::CategoryId;
use taskshare_infrastructure::{ClientConfig, HttpTaskApi, init_tracing};

/// Everything a command needs: configuration and credentials.
pub struct Context {
    pub config: ClientConfig,
    user: Option<String>,
    password: Option<String>,
    pub json: bool,
}

impl Context {
    pub fn new(
        config_path: Option<&Path>,
        user: Option<String>,
        password: Option<String>,
        json: bool,
    ) -> Result<Self> {
        let config = ClientConfig::load(config_path).context("Failed to load configuration")?;
        init_tracing(&config.logging.level);
        Ok(Self {
            config,
            user,
            password,
            json,
        })
    }

    pub fn credentials(&self) -> Result<(&str, &str)> {
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow!("No user given (use --user or TASKSHARE_USER)"))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| anyhow!("No password given (use --password or TASKSHARE_PASSWORD)"))?;
        Ok((user, password))
    }

    /// A logged-out client talking to the configured server.
    pub fn client(&self) -> Result<TaskShareClient> {
        let api = HttpTaskApi::from_settings(&self.config.server)?;
        Ok(TaskShareClient::new(Arc::new(api), None))
    }

    /// A client with a live session for the configured user.
    pub async fn login(&self) -> Result<TaskShareClient> {
        let (user, password) = self.credentials()?;
        let client = self.client()?;
        client
            .login(user, password)
            .await
            .with_context(|| format!("Login as '{}' failed", user))?;
        tracing::debug!("[Cli] Logged in as {}", user);
        Ok(client)
    }
}

/// Resolves a category name to its id. `None` means the default category.
pub async fn resolve_category(client: &TaskShareClient, name: Option<&str>) -> Result<CategoryId> {
    let categories = client.categories().await;
    match name {
        None => categories
            .iter()
            .find(|c| c.is_default())
            .map(|c| c.id)
            .ok_or_else(|| anyhow!("No default category in session")),
        Some(name) => categories
            .iter()
            .find(|c| c.name == name.trim())
            .map(|c| c.id)
            .ok_or_else(|| anyhow!("Unknown category '{}'", name)),
    }
}
