//! Episode, season and community review commands

use tracing::warn;

use crate::config::Config;
use crate::domain::{EpisodeKey, MediaType};
use crate::services::WatchStateService;

use super::context::{CliContext, parse_media_id};

pub async fn cmd_episode(
    config: &Config,
    offline: bool,
    tv_id: i64,
    season: i32,
    episode: i32,
) -> anyhow::Result<()> {
    let key = EpisodeKey::new(parse_media_id(tv_id)?, season, episode);
    let ctx = CliContext::open(config, offline).await?;

    let runtime = ctx.catalog.episode_runtime(&key).await.unwrap_or_else(|e| {
        warn!(episode = %key, error = %e, "Episode runtime lookup failed");
        None
    });
    let tv_name = ctx
        .title_ref(MediaType::Tv, key.tv_id)
        .await
        .ok()
        .map(|t| t.title);

    let toggle = ctx.watch.mark_episode_watched(key, tv_name, runtime).await?;
    if toggle.is_watched() {
        println!("✓ Marked S{season:02}E{episode:02} watched");
    } else {
        println!("✓ Unmarked S{season:02}E{episode:02}");
    }
    Ok(())
}

pub async fn cmd_season(
    config: &Config,
    offline: bool,
    tv_id: i64,
    season: i32,
    rate: Option<i32>,
) -> anyhow::Result<()> {
    let tv_id = parse_media_id(tv_id)?;
    let ctx = CliContext::open(config, offline).await?;

    if let Some(rating) = rate {
        let tv_name = ctx
            .title_ref(MediaType::Tv, tv_id)
            .await
            .ok()
            .map(|t| t.title);
        let stored = ctx
            .watch
            .set_season_rating(tv_id, tv_name, season, rating)
            .await?;
        match stored {
            Some(r) => println!("✓ Season {season} rated {r}/10"),
            None => println!("✓ Season {season} rating cleared"),
        }
        println!();
    }

    let view = ctx.catalog.season_view(tv_id, season, &ctx.watch).await?;

    println!(
        "{} ({}/{} watched)",
        view.name.as_deref().unwrap_or("Season"),
        view.watched_count,
        view.episodes.len()
    );
    println!("{:-<60}", "");
    for episode in &view.episodes {
        let mark = if episode.watched { "✓" } else { " " };
        let rating = episode
            .rating
            .map_or_else(String::new, |r| format!("  {r}/10"));
        println!(
            "[{mark}] E{:02} {}{rating}",
            episode.episode_number,
            episode.name.as_deref().unwrap_or("")
        );
    }
    println!();
    let show = |r: Option<i32>| r.map_or_else(|| "-".to_string(), |r| format!("{r}/10"));
    println!("Season rating:  {}", show(view.manual_rating));
    println!("Episode rollup: {}", show(view.episode_rollup));
    Ok(())
}

pub async fn cmd_reviews(config: &Config, offline: bool, tv_id: i64) -> anyhow::Result<()> {
    let tv_id = parse_media_id(tv_id)?;
    let ctx = CliContext::open(config, offline).await?;
    let seasons = ctx.watch.season_review_summary(tv_id).await?;

    if seasons.is_empty() {
        println!("No episode ratings for show {tv_id} yet.");
        return Ok(());
    }

    for season in seasons {
        println!(
            "Season {}: {:.1} ({} ratings)",
            season.season_number, season.average_rating, season.rating_count
        );
        println!("{:-<60}", "");
        for episode in season.episodes {
            println!(
                "  E{:02}  {:.1}  ({})",
                episode.episode_number, episode.average_rating, episode.rating_count
            );
        }
        println!();
    }
    Ok(())
}
