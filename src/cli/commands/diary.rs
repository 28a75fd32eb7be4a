//! Movie diary, reviews and the watched collection

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::MediaType;
use crate::models::diary::{DiaryPatch, MovieLog};
use crate::models::review::ReviewDraft;
use crate::services::WatchStateService;

use super::context::{CliContext, parse_media_id};

pub async fn cmd_log(
    config: &Config,
    offline: bool,
    id: i64,
    rating: Option<i32>,
    notes: Option<String>,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;
    let title = ctx.title_ref(MediaType::Movie, id).await?;

    let entry = ctx
        .watch
        .log_movie(MovieLog {
            movie_id: id,
            movie_title: title.title,
            movie_poster: title.poster,
            rating,
            notes,
            watched_date: date,
        })
        .await?;

    println!(
        "✓ Logged {} on {} (entry {})",
        entry.movie_title, entry.watched_date, entry.id
    );
    Ok(())
}

pub async fn cmd_diary_edit(
    config: &Config,
    offline: bool,
    entry_id: Uuid,
    patch: DiaryPatch,
) -> anyhow::Result<()> {
    anyhow::ensure!(!patch.is_empty(), "Nothing to change: pass --rating, --notes or --date");
    let ctx = CliContext::open(config, offline).await?;
    let entry = ctx.watch.update_movie_diary_entry(entry_id, patch).await?;
    println!("✓ Updated {} ({})", entry.movie_title, entry.watched_date);
    Ok(())
}

pub async fn cmd_diary_remove(
    config: &Config,
    offline: bool,
    entry_id: Uuid,
) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    ctx.watch.delete_movie_diary_entry(entry_id).await?;
    println!("✓ Deleted diary entry {entry_id}");
    Ok(())
}

pub async fn cmd_review(config: &Config, offline: bool, draft: ReviewDraft) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    let review = ctx.watch.write_review(draft).await?;
    println!(
        "✓ Review saved for {} {}{}",
        review.media_type,
        review.movie_id,
        review
            .rating
            .map_or_else(String::new, |r| format!(" ({r}/10)"))
    );
    Ok(())
}

pub async fn cmd_watched(config: &Config, offline: bool) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    let titles = ctx.watch.watched_titles().await?;

    if titles.is_empty() {
        println!("Nothing watched yet.");
        println!();
        println!("Rate a title with: sceneburn rate <id> <1-10>");
        return Ok(());
    }

    println!("Watched ({} total)", titles.len());
    println!("{:-<70}", "");
    for title in titles {
        let rating = title
            .rating
            .map_or_else(|| "  -  ".to_string(), |r| format!("{r:>2}/10"));
        let date = title
            .last_watched
            .map_or_else(|| "          ".to_string(), |d| d.to_string());
        println!(
            "{rating}  {date}  {} [{} {}]",
            title.title, title.media_type, title.media_id
        );
    }
    Ok(())
}
