//! Catalog lookups

use crate::clients::tmdb::{DiscoverParams, SearchResult};
use crate::config::Config;
use crate::domain::MediaType;
use crate::services::TitleView;

use super::context::{CliContext, parse_media_id, print_state};

pub async fn cmd_search(
    config: &Config,
    offline: bool,
    query: &str,
    page: u32,
) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    println!("Searching for: {query}");

    let results = ctx.catalog.search(query, page).await?;
    if results.is_empty() {
        println!("Nothing found matching '{query}'");
        return Ok(());
    }

    println!();
    println!("Search Results:");
    println!("{:-<60}", "");
    for result in &results {
        match result {
            SearchResult::Movie(m) => println!(
                "• {} ({}) | movie {}",
                m.title,
                year(m.release_date.as_deref()),
                m.id
            ),
            SearchResult::Tv(t) => println!(
                "• {} ({}) | tv {}",
                t.name,
                year(t.first_air_date.as_deref()),
                t.id
            ),
            SearchResult::Person(p) => println!("• {} | person {}", result.display_title(), p.id),
        }
    }
    println!();
    println!("Details: sceneburn show <movie|tv> <id>");
    Ok(())
}

fn year(date: Option<&str>) -> &str {
    date.and_then(|d| d.get(..4)).unwrap_or("?")
}

pub async fn cmd_show(
    config: &Config,
    offline: bool,
    media_type: MediaType,
    id: i64,
) -> anyhow::Result<()> {
    let id = parse_media_id(id)?;
    let ctx = CliContext::open(config, offline).await?;
    let view: TitleView = ctx.catalog.title_view(media_type, id, &ctx.watch).await?;

    println!("{} [{} {}]", view.title, view.media_type, view.media_id);
    if let Some(overview) = &view.overview {
        println!();
        println!("{overview}");
    }
    if let Some(url) = &view.poster_url {
        println!("Poster:  {url}");
    }
    if let Some(key) = &view.trailer_key {
        println!("Trailer: https://www.youtube.com/watch?v={key}");
    }
    println!();
    print_state(id, &view.state);
    Ok(())
}

pub async fn cmd_person(config: &Config, offline: bool, id: i64) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    let person = ctx.catalog.person(id).await?;

    println!("{} [person {}]", person.name, person.id);
    println!("{:-<60}", "");
    if let Some(department) = &person.known_for_department {
        println!("  Known for: {department}");
    }
    if let Some(birthday) = &person.birthday {
        println!(
            "  Born:      {birthday}{}",
            person
                .place_of_birth
                .as_deref()
                .map_or_else(String::new, |p| format!(", {p}"))
        );
    }
    if let Some(bio) = person.biography.as_deref().filter(|b| !b.is_empty()) {
        println!();
        println!("{bio}");
    }
    Ok(())
}

pub async fn cmd_discover(
    config: &Config,
    offline: bool,
    params: DiscoverParams,
) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    let page = ctx.catalog.discover(&params).await?;

    println!(
        "Discover (page {} of {}, {} results)",
        page.page, page.total_pages, page.total_results
    );
    println!("{:-<60}", "");
    for movie in &page.results {
        let vote = movie
            .vote_average
            .map_or_else(|| " -  ".to_string(), |v| format!("{v:>4.1}"));
        println!(
            "{vote}  {} ({}) | movie {}",
            movie.title,
            year(movie.release_date.as_deref()),
            movie.id
        );
    }
    Ok(())
}
