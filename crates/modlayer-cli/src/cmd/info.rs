//! Info command

use anyhow::Result;
use crossterm::style::Stylize;
use modlayer_core::state;

use crate::lookup;
use crate::ui::Output;

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M UTC")
        .to_string()
}

/// Show details of the mod `query` names.
pub async fn info(query: &str) -> Result<()> {
    let output = Output::new();
    let ctx = super::open(&output, true).await?;
    let catalog = ctx.snapshot().await;
    let m = lookup::find_mod(&catalog, query)?;

    let lw = 12;
    let latest = m.channel_latest();

    println!();
    println!(
        "  {} {}",
        m.display_title().to_string().white().bold(),
        latest.map_or("", |r| r.tag.as_str()).dark_grey()
    );
    if let Some(description) = &m.description {
        println!("  {description}");
    }
    println!();

    match &m.repo {
        Some(repo) => println!("  {:<lw$}{repo}", "repository"),
        None => println!("  {:<lw$}{}", "source", "local file"),
    }

    if m.is_local() {
        let status = if state::is_enabled(ctx.layout(), m) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  {:<lw$}{status}", "status");
    } else {
        println!(
            "  {:<lw$}{}",
            "status",
            state::classify(ctx.layout(), m).label()
        );
        println!(
            "  {:<lw$}{}",
            "installed",
            m.current_tag.as_deref().unwrap_or("-")
        );
        if let Some(latest) = latest {
            println!("  {:<lw$}{} ({})", "latest", latest.tag, m.release_title(latest));
        }
        let newer_pre = m
            .latest(true)
            .filter(|r| r.prerelease && latest.is_none_or(|l| l.tag != r.tag));
        if let Some(pre) = newer_pre {
            println!("  {:<lw$}{}", "pre-release", pre.tag);
        }
        println!("  {:<lw$}{}", "releases", m.releases.len());
        println!(
            "  {:<lw$}{} stars, {} watchers, {} downloads",
            "popularity", m.stars, m.watchers, m.downloads
        );
    }

    if let Some(file) = m.existing_file() {
        println!("  {:<lw$}{}", "file", file.display());
    }
    if let Some(ts) = m.last_check {
        println!("  {:<lw$}{}", "checked", format_timestamp(ts));
    }
    Ok(())
}
