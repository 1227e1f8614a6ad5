use super::Context;
use anyhow::{Context as _, Result};

pub async fn register(ctx: &Context) -> Result<()> {
    let (user, password) = ctx.credentials()?;
    let client = ctx.client()?;
    client
        .register(user, password)
        .await
        .with_context(|| format!("Registration of '{}' failed", user))?;
    println!("✅ Registered '{}'", user);
    Ok(())
}
