//! Fetch command

use anyhow::Result;
use modlayer_core::AppContext;
use modlayer_core::sync::FetchOutcome;

use crate::lookup;
use crate::ui::Output;

/// Refresh the whole catalog, or one mod when `name` is given.
pub async fn fetch(name: Option<&str>, force: bool) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, false).await?;

    match name {
        Some(query) => fetch_one(&ctx, &output, query).await?,
        None => fetch_all(&ctx, &output, force).await?,
    }

    if let Some(remaining) = ctx.remaining_quota() {
        output.info(&format!("{remaining} API request(s) left"));
    }
    Ok(())
}

async fn fetch_all(ctx: &AppContext, output: &Output, force: bool) -> Result<()> {
    let last_check = ctx.snapshot().await.last_check;
    let cooldown = if force {
        None
    } else {
        ctx.config()
            .in_cooldown(last_check, chrono::Utc::now().timestamp())
    };
    if let Some(minutes) = cooldown {
        output.warning(&format!(
            "The catalog was fetched {minutes} minute(s) ago. Use --force to fetch again."
        ));
        return Ok(());
    }

    output.section("Fetching");
    let summary = ctx.sync().await?;
    super::report_sync(output, summary);
    Ok(())
}

async fn fetch_one(ctx: &AppContext, output: &Output, query: &str) -> Result<()> {
    let catalog = ctx.snapshot().await;
    let m = lookup::find_mod(&catalog, query)?;
    let title = m.display_title();

    output.fetching(&title);
    match ctx.fetch_one(&m.id()).await? {
        FetchOutcome::Complete => output.success(&format!("{title} refreshed")),
        FetchOutcome::Partial => output.warning(&format!(
            "{title} was only partly refreshed: rate limit exhausted, try later"
        )),
    }
    Ok(())
}
