//! Per-title watch-state commands

use crate::config::Config;
use crate::domain::MediaType;
use crate::models::watch_state::{ToggleOutcome, ToggleStatus};
use crate::services::WatchStateService;

use super::context::{CliContext, parse_media_id, print_state};

pub async fn cmd_state(
    config: &Config,
    offline: bool,
    media_type: MediaType,
    id: i64,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;
    let state = ctx.watch.state(id).await;
    println!("{media_type} {id}");
    print_state(id, &state);
    Ok(())
}

fn report_toggle(verb_on: &str, verb_off: &str, title: &str, outcome: &ToggleOutcome) {
    match outcome.status {
        ToggleStatus::Confirmed if outcome.requested => println!("✓ {verb_on}: {title}"),
        ToggleStatus::Confirmed => println!("✓ {verb_off}: {title}"),
        other => println!("• {title}: {}", other.as_str()),
    }
}

pub async fn cmd_like(
    config: &Config,
    offline: bool,
    media_type: MediaType,
    id: i64,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;
    let title = ctx.title_ref(media_type, id).await?;
    let name = title.title.clone();

    let outcome = ctx.watch.toggle_like(title).await?;
    report_toggle("Liked", "Unliked", &name, &outcome);
    Ok(())
}

pub async fn cmd_watchlist(
    config: &Config,
    offline: bool,
    media_type: MediaType,
    id: i64,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;
    let title = ctx.title_ref(media_type, id).await?;
    let name = title.title.clone();

    let outcome = ctx.watch.toggle_watchlist(title).await?;
    report_toggle(
        "Added to watchlist",
        "Removed from watchlist",
        &name,
        &outcome,
    );
    Ok(())
}

pub async fn cmd_rate(
    config: &Config,
    offline: bool,
    media_type: MediaType,
    id: i64,
    rating: i32,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;
    let title = ctx.title_ref(media_type, id).await?;
    let name = title.title.clone();

    let state = ctx.watch.set_rating(title, rating).await?;
    if rating == 0 {
        println!("✓ Cleared rating of {name}");
    } else {
        println!("✓ Rated {name} {rating}/10");
    }
    print_state(id, &state);
    Ok(())
}

pub async fn cmd_forget(
    config: &Config,
    offline: bool,
    media_type: MediaType,
    id: i64,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;

    let report = ctx.watch.delete_all_media_data(id, media_type).await;

    println!("Deleted data for {media_type} {id}");
    println!("{:-<60}", "");
    for table in &report.deleted {
        println!("  ✓ {table}");
    }
    for failure in &report.failed {
        println!("  ✗ {}: {}", failure.table, failure.error);
    }
    if !report.is_complete() {
        anyhow::bail!("{} table(s) could not be cleared", report.failed.len());
    }
    Ok(())
}
