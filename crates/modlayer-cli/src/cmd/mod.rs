//! Command implementations

pub mod completions;
pub mod fetch;
pub mod info;
pub mod install;
pub mod list;
pub mod toggle;
pub mod uninstall;
pub mod update;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use crossterm::{cursor, execute, terminal};
use modlayer_core::sync::SyncSummary;
use modlayer_core::{AppContext, Config, DownloadTask, try_modlayer_home};

use crate::ui::Output;
use crate::ui::progress::format_download_progress;

/// Resolve the home directory, load the configuration and open the catalog.
///
/// With `start_fetch`, a pending `fetch_on_start` request is honoured once:
/// the flag is cleared from the saved configuration after a successful
/// fetch.
pub async fn open(output: &Output, start_fetch: bool) -> Result<AppContext> {
    let home = try_modlayer_home().context("Could not determine the modlayer home directory")?;
    let mut config = Config::load(&home).context("Failed to load configuration")?;

    let ctx = AppContext::from_config(config.clone().with_env(), &home, Arc::new(*output))
        .await
        .context("Failed to open the mod catalog")?;

    if start_fetch && config.fetch_on_start {
        output.section("Fetching");
        match ctx.sync().await {
            Ok(summary) => {
                report_sync(output, summary);
                config.fetch_on_start = false;
                config.save(&home).context("Failed to save configuration")?;
            }
            Err(e) => output.warning(&format!("Start-up fetch failed: {e}")),
        }
    }
    Ok(ctx)
}

pub(crate) fn report_sync(output: &Output, summary: SyncSummary) {
    output.success(&format!(
        "{} mod{} in the catalog",
        summary.mods,
        if summary.mods == 1 { "" } else { "s" }
    ));
    if summary.dropped > 0 {
        output.info(&format!(
            "{} tracked repositor{} skipped: no usable release",
            summary.dropped,
            if summary.dropped == 1 { "y" } else { "ies" }
        ));
    }
    if summary.locals > 0 {
        output.info(&format!("{} local mod(s) found", summary.locals));
    }
}

/// Draw aggregate progress until every task in `tasks` has settled.
pub(crate) async fn watch_downloads(ctx: &AppContext, tasks: &[Arc<DownloadTask>]) {
    let draw = std::io::stderr().is_terminal();
    let mut stderr = std::io::stderr();
    let mut interval = tokio::time::interval(Duration::from_millis(100));

    while !tasks.iter().all(|t| t.is_finished()) {
        interval.tick().await;
        if draw {
            let agg = ctx.downloads().aggregate();
            let _ = execute!(
                stderr,
                cursor::MoveToColumn(0),
                terminal::Clear(terminal::ClearType::CurrentLine)
            );
            eprint!(
                "  {}  {}",
                format_download_progress(agg.bytes_received, agg.bytes_total),
                format!("{} active", agg.active).dark_grey()
            );
        }
    }
    if draw {
        let _ = execute!(
            stderr,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        );
    }
    for task in tasks {
        task.wait().await;
    }
}
