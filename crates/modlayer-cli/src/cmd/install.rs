//! Install command

use anyhow::{Context, Result, bail};
use modlayer_core::ModState;

use crate::lookup;
use crate::ui::Output;

/// Install the mod `query` names at `version`, or at the latest release of
/// its channel.
///
/// A mod that was disabled before the download ends up disabled again; it
/// is moved to the active location afterwards.
pub async fn install(query: &str, version: Option<&str>) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, true).await?;
    let catalog = ctx.snapshot().await;
    let m = lookup::find_mod(&catalog, query)?;
    let title = m.display_title();

    if m.is_local() {
        bail!("{title} is a local mod and cannot be installed from the catalog");
    }
    let release = match version {
        Some(v) => lookup::find_release(m, v)?,
        None => m
            .channel_latest()
            .with_context(|| format!("{title} has no releases"))?,
    };

    if m.existing_file().is_some() && m.current_tag.as_deref() == Some(release.tag.as_str()) {
        output.info(&format!("{title} {} is already installed", release.tag));
        return Ok(());
    }

    let id = m.id();
    output.section("Installing");
    let task = ctx.start_download(&id, &release.tag).await?;
    super::watch_downloads(&ctx, std::slice::from_ref(&task)).await;

    if task.is_failed() {
        bail!(
            "Failed to install {title} {}: {}",
            release.tag,
            task.failure().unwrap_or_default()
        );
    }
    if let Some(reason) = task.save_failure() {
        bail!(
            "Installed {title} {} but could not save the catalog: {reason}",
            release.tag
        );
    }

    if ctx.classify(&id).await? == ModState::Disabled {
        let path = ctx.enable(&id).await?;
        output.info(&format!("Enabled {}", path.display()));
    }
    Ok(())
}
