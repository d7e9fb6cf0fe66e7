//! List command

use std::ops::Range;

use anyhow::{Result, bail};
use crossterm::style::{StyledContent, Stylize};
use modlayer_core::state::{self, ModState};
use modlayer_core::{AppContext, Layout};
use modlayer_schema::{Catalog, ModRecord};

use crate::lookup;
use crate::ui::Output;

/// Rows per page.
pub const PAGE_SIZE: usize = 15;

const NAME_WIDTH: usize = 32;
const STATUS_WIDTH: usize = 16;
const TAG_WIDTH: usize = 14;

/// List the catalog, or the releases of one mod when `name` is given.
pub async fn list(name: Option<&str>, page: usize) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, true).await?;
    let catalog = ctx.snapshot().await;

    match name {
        Some(query) => list_releases(lookup::find_mod(&catalog, query)?, page),
        None => list_mods(&ctx, &catalog, page),
    }
}

/// Number of pages and the index range shown on `page` (1-based).
fn page_range(len: usize, page: usize) -> Result<(usize, Range<usize>)> {
    let pages = len.div_ceil(PAGE_SIZE).max(1);
    if page == 0 || page > pages {
        bail!("Page {page} does not exist (1-{pages})");
    }
    let start = (page - 1) * PAGE_SIZE;
    Ok((pages, start..(start + PAGE_SIZE).min(len)))
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Whether the mod's file sits in the active location.
fn is_active(layout: &Layout, m: &ModRecord, state: ModState) -> bool {
    if m.is_local() {
        state::is_enabled(layout, m)
    } else {
        matches!(state, ModState::Enabled | ModState::HasUpdate)
    }
}

/// Enabled mods first, then by title; local mods after all remote ones.
fn sort_rows(layout: &Layout, rows: &mut [(&ModRecord, ModState)]) {
    rows.sort_by_cached_key(|(m, state)| {
        (
            m.is_local(),
            !is_active(layout, m, *state),
            m.display_title().to_lowercase(),
        )
    });
}

fn status_cell(layout: &Layout, m: &ModRecord, state: ModState) -> StyledContent<String> {
    if m.is_local() {
        return if state::is_enabled(layout, m) {
            format!("{:<STATUS_WIDTH$}", "local").cyan()
        } else {
            format!("{:<STATUS_WIDTH$}", "local, disabled").dark_grey()
        };
    }
    let cell = format!("{:<STATUS_WIDTH$}", state.label());
    match state {
        ModState::Enabled => cell.green(),
        ModState::HasUpdate => cell.yellow(),
        ModState::UnknownVersion => cell.magenta(),
        ModState::Disabled | ModState::NotInstalled => cell.dark_grey(),
    }
}

fn list_mods(ctx: &AppContext, catalog: &Catalog, page: usize) -> Result<()> {
    if catalog.mods.is_empty() {
        println!();
        println!("  No mods in the catalog.");
        println!("  Run 'modlayer fetch' to get started.");
        return Ok(());
    }

    let layout = ctx.layout();
    let mut rows: Vec<(&ModRecord, ModState)> = catalog
        .mods
        .iter()
        .map(|m| (m, state::classify(layout, m)))
        .collect();
    sort_rows(layout, &mut rows);

    let (pages, range) = page_range(rows.len(), page)?;

    println!();
    println!(
        "  {}",
        format!(
            "{:<NAME_WIDTH$} {:<STATUS_WIDTH$} {:<TAG_WIDTH$} {}",
            "MOD", "STATUS", "INSTALLED", "LATEST"
        )
        .dark_grey()
    );
    for (m, state) in &rows[range] {
        let installed = m.current_tag.as_deref().unwrap_or("-");
        let latest = m.channel_latest().map_or("-", |r| r.tag.as_str());
        println!(
            "  {:<NAME_WIDTH$} {} {:<TAG_WIDTH$} {}",
            truncate(&m.display_title(), NAME_WIDTH),
            status_cell(layout, m, *state),
            truncate(installed, TAG_WIDTH),
            latest.dark_grey()
        );
    }
    println!();
    println!(
        "  {}",
        format!("page {page}/{pages}, {} mods", rows.len()).dark_grey()
    );
    Ok(())
}

fn list_releases(m: &ModRecord, page: usize) -> Result<()> {
    let title = m.display_title();
    if m.releases.is_empty() {
        println!();
        println!("  {title} has no releases.");
        return Ok(());
    }

    let (pages, range) = page_range(m.releases.len(), page)?;

    println!();
    println!("  {}", title.to_string().bold());
    println!();
    for release in &m.releases[range] {
        let marker = if m.current_tag.as_deref() == Some(release.tag.as_str()) {
            "*".green()
        } else {
            " ".reset()
        };
        let channel = if release.prerelease { "pre" } else { "" };
        println!(
            "  {marker} {:<TAG_WIDTH$} {} {}",
            truncate(&release.tag, TAG_WIDTH),
            format!("{channel:<4}").yellow(),
            m.release_title(release).into_owned().dark_grey()
        );
    }
    println!();
    println!(
        "  {}",
        format!("page {page}/{pages}, {} releases", m.releases.len()).dark_grey()
    );
    Ok(())
}
