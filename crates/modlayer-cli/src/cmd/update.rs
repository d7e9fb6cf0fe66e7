//! Update command

use anyhow::{Result, bail};
use modlayer_core::state::{self, ModState};
use modlayer_core::{AppContext, Layout};
use modlayer_schema::{ModId, ModRecord};

use crate::lookup;
use crate::ui::Output;

/// A mod to re-download and the release it moves to.
#[derive(Debug)]
struct Target {
    id: ModId,
    title: String,
    tag: String,
}

fn target(m: &ModRecord) -> Option<Target> {
    let release = m.channel_latest()?;
    Some(Target {
        id: m.id(),
        title: m.display_title().into_owned(),
        tag: release.tag.clone(),
    })
}

/// Why a named mod is not updated, or `None` when it should be.
fn refusal(layout: &Layout, m: &ModRecord) -> Option<String> {
    let title = m.display_title();
    if m.is_local() {
        return Some(format!("{title} is a local mod and has no releases"));
    }
    match state::classify(layout, m) {
        ModState::NotInstalled => Some(format!(
            "{title} is not installed. Use 'modlayer install' instead."
        )),
        ModState::Disabled => Some(format!("{title} is disabled. Enable it before updating.")),
        ModState::Enabled => Some(format!("{title} is up to date")),
        ModState::HasUpdate | ModState::UnknownVersion => None,
    }
}

/// Every remote mod with a newer release on its channel, or whose installed
/// version is unknown.
fn outdated<'a>(layout: &Layout, mods: impl Iterator<Item = &'a ModRecord>) -> Vec<Target> {
    mods.filter(|m| !m.is_local() && state::classify(layout, m).needs_update())
        .filter_map(target)
        .collect()
}

/// Update the mod `query` names, or every outdated mod. Downloads run
/// concurrently.
pub async fn update(query: Option<&str>) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, true).await?;
    let catalog = ctx.snapshot().await;

    let targets = match query {
        Some(query) => {
            let m = lookup::find_mod(&catalog, query)?;
            if let Some(reason) = refusal(ctx.layout(), m) {
                output.info(&reason);
                return Ok(());
            }
            target(m).into_iter().collect()
        }
        None => outdated(ctx.layout(), catalog.mods.iter()),
    };

    if targets.is_empty() {
        output.success("All mods are up to date");
        return Ok(());
    }

    output.section("Updating");
    run(&ctx, &output, targets).await
}

async fn run(ctx: &AppContext, output: &Output, targets: Vec<Target>) -> Result<()> {
    let mut tasks = Vec::with_capacity(targets.len());
    let mut failed = 0usize;
    for t in targets {
        match ctx.start_download(&t.id, &t.tag).await {
            Ok(task) => tasks.push(task),
            Err(e) => {
                output.failed(&t.title, &t.tag, &e.to_string());
                failed += 1;
            }
        }
    }

    super::watch_downloads(ctx, &tasks).await;
    ctx.downloads().wait_all().await;

    failed += tasks.iter().filter(|t| t.is_failed()).count();
    let updated = tasks.iter().filter(|t| t.is_complete()).count();
    if updated > 0 {
        output.success(&format!("{updated} mod(s) updated"));
    }
    if failed > 0 {
        bail!("{failed} update(s) failed");
    }
    if let Some(reason) = tasks.iter().find_map(|t| t.save_failure()) {
        bail!("Could not save the catalog: {reason}");
    }
    Ok(())
}
