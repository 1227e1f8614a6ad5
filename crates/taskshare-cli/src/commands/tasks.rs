use super::{Context, resolve_category};
use anyhow::{Result, anyhow};
use taskshare_core::{Task, TaskEdit};

pub async fn list(ctx: &Context) -> Result<()> {
    let client = ctx.login().await?;
    let user = client.current_user().await.unwrap_or_default();
    let tasks = client.tasks().await;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        for (index, task) in tasks.iter().enumerate() {
            println!("{}", format_task(index, task, &user));
        }
    }

    client.logout().await;
    Ok(())
}

pub async fn add(ctx: &Context, title: &str, desc: &str, category: Option<&str>) -> Result<()> {
    let client = ctx.login().await?;
    let category_id = resolve_category(&client, category).await?;
    let task = client.create_task(title, desc, category_id).await?;
    print_task(ctx, &task, "Added")?;
    client.logout().await;
    Ok(())
}

pub async fn toggle(ctx: &Context, id: i64) -> Result<()> {
    let client = ctx.login().await?;
    let task = client.toggle_done(id).await?;
    print_task(ctx, &task, if task.is_done { "Done" } else { "Reopened" })?;
    client.logout().await;
    Ok(())
}

pub async fn edit(
    ctx: &Context,
    id: i64,
    title: Option<String>,
    desc: Option<String>,
    category: Option<&str>,
) -> Result<()> {
    let client = ctx.login().await?;
    let current = client
        .tasks()
        .await
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| anyhow!("No task with id {}", id))?;

    let category_id = match category {
        Some(name) => resolve_category(&client, Some(name)).await?,
        None => current.category.id,
    };
    let edit = TaskEdit {
        title: title.unwrap_or(current.title),
        description: desc.unwrap_or(current.description),
        category_id,
    };
    let task = client.edit_task(id, edit).await?;
    print_task(ctx, &task, "Updated")?;
    client.logout().await;
    Ok(())
}

pub async fn delete(ctx: &Context, id: i64) -> Result<()> {
    let client = ctx.login().await?;
    client.delete_task(id).await?;
    println!("✅ Deleted task {}", id);
    client.logout().await;
    Ok(())
}

pub async fn share(ctx: &Context, id: i64, target: &str, share: bool) -> Result<()> {
    let client = ctx.login().await?;
    let task = if share {
        client.share_task(id, target).await?
    } else {
        client.unshare_task(id, target).await?
    };
    print_task(ctx, &task, if share { "Shared" } else { "Unshared" })?;
    client.logout().await;
    Ok(())
}

pub async fn swap(ctx: &Context, index: usize) -> Result<()> {
    let client = ctx.login().await?;
    client.swap(index).await?;
    println!("✅ Swapped positions {} and {}", index, index + 1);
    client.logout().await;
    Ok(())
}

fn print_task(ctx: &Context, task: &Task, verb: &str) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("✅ {} #{} {}", verb, task.id, task.title);
    }
    Ok(())
}

fn format_task(index: usize, task: &Task, user: &str) -> String {
    let mark = if task.is_done { "x" } else { " " };
    let mut line = format!(
        "{:>3}. [{}] #{:<5} {:<40} ({})",
        index,
        mark,
        task.id,
        task.title,
        task.category.display_name()
    );
    if !task.is_owned_by(user) {
        line.push_str(&format!("  from {}", task.owner));
    } else if !task.shared_with.is_empty() {
        let shared: Vec<&str> = task.shared_with.iter().collect();
        line.push_str(&format!("  shared with {}", shared.join(", ")));
    }
    line
}
