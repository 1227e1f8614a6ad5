use super::Context;
use anyhow::{Result, anyhow};
use taskshare_core::CategoryDraft;

pub async fn list(ctx: &Context) -> Result<()> {
    let client = ctx.login().await?;
    let categories = client.categories().await;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in &categories {
            println!(
                "#{:<5} {:<14} {} / {}",
                category.id,
                category.display_name(),
                category.header_color,
                category.body_color
            );
        }
    }

    client.logout().await;
    Ok(())
}

pub async fn add(
    ctx: &Context,
    name: &str,
    header: Option<String>,
    body: Option<String>,
) -> Result<()> {
    let client = ctx.login().await?;
    let mut draft = CategoryDraft::named(name);
    if let Some(header) = header {
        draft.header_color = header;
    }
    if let Some(body) = body {
        draft.body_color = body;
    }
    let category = client.create_category(draft).await?;
    println!("✅ Added category #{} {}", category.id, category.name);
    client.logout().await;
    Ok(())
}

pub async fn update(
    ctx: &Context,
    id: i64,
    name: Option<String>,
    header: Option<String>,
    body: Option<String>,
) -> Result<()> {
    let client = ctx.login().await?;
    let current = client
        .categories()
        .await
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| anyhow!("No category with id {}", id))?;

    let draft = CategoryDraft::named(name.unwrap_or(current.name)).with_colors(
        header.unwrap_or(current.header_color),
        body.unwrap_or(current.body_color),
    );
    let category = client.update_category(id, draft).await?;
    println!("✅ Updated category #{} {}", category.id, category.name);
    client.logout().await;
    Ok(())
}

pub async fn delete(ctx: &Context, id: i64) -> Result<()> {
    let client = ctx.login().await?;
    client.delete_category(id).await?;
    println!("✅ Deleted category #{}; its tasks are now uncategorized", id);
    client.logout().await;
    Ok(())
}
