//! Uninstall command

use anyhow::Result;

use crate::lookup;
use crate::ui::Output;

/// Delete the installed file of the mod `query` names.
///
/// Local mods leave the catalog with their file, so they need `yes`.
pub async fn uninstall(query: &str, yes: bool) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, true).await?;
    let catalog = ctx.snapshot().await;
    let m = lookup::find_mod(&catalog, query)?;
    let title = m.display_title();

    if m.existing_file().is_none() {
        output.info(&format!("{title} is not installed"));
        return Ok(());
    }
    if m.is_local() && !yes {
        output.warning(&format!(
            "{title} is a local mod and cannot be reinstalled once deleted. Re-run with --yes to confirm."
        ));
        return Ok(());
    }

    ctx.uninstall(&m.id()).await?;
    output.success(&format!("{title} uninstalled"));
    Ok(())
}
