//! Enable and disable commands

use anyhow::{Result, bail};

use crate::lookup;
use crate::ui::Output;

/// Move the mod `query` names into the active plugin directory.
pub async fn enable(query: &str) -> Result<()> {
    toggle(query, true).await
}

/// Move the mod `query` names into the disabled plugin directory.
pub async fn disable(query: &str) -> Result<()> {
    toggle(query, false).await
}

async fn toggle(query: &str, enable: bool) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, true).await?;
    let catalog = ctx.snapshot().await;
    let m = lookup::find_mod(&catalog, query)?;
    let title = m.display_title();

    let Some(file) = m.existing_file() else {
        bail!("{title} is not installed");
    };
    let layout = ctx.layout();
    if enable && layout.is_active(file) {
        output.info(&format!("{title} is already enabled"));
        return Ok(());
    }
    if !enable && layout.is_disabled(file) {
        output.info(&format!("{title} is already disabled"));
        return Ok(());
    }

    let id = m.id();
    let path = if enable {
        ctx.enable(&id).await?
    } else {
        ctx.disable(&id).await?
    };
    let verb = if enable { "enabled" } else { "disabled" };
    output.success(&format!("{title} {verb} ({})", path.display()));
    Ok(())
}
