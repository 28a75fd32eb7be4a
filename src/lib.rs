pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod domain;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, DiaryCommands};
pub use config::Config;

use crate::clients::tmdb::DiscoverParams;
use crate::domain::MediaId;
use crate::models::diary::DiaryPatch;
use crate::models::review::ReviewDraft;

pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;

    if !matches!(cli.command, None | Some(Commands::Init)) {
        config.validate(cli.offline)?;
    }

    let serving = matches!(cli.command, Some(Commands::Serve));
    let prometheus_handle = if serving && config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;
    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    let offline = cli.offline;
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init => cli::cmd_init(),
        Commands::Login { email, password } => cli::cmd_login(&config, &email, password).await,
        Commands::Logout => cli::cmd_logout(&config).await,
        Commands::Whoami => cli::cmd_whoami(&config, offline).await,
        Commands::State { id, media_type } => {
            cli::cmd_state(&config, offline, media_type, id).await
        }
        Commands::Like { id, media_type } => cli::cmd_like(&config, offline, media_type, id).await,
        Commands::Watchlist { id, media_type } => {
            cli::cmd_watchlist(&config, offline, media_type, id).await
        }
        Commands::Rate {
            id,
            rating,
            media_type,
        } => cli::cmd_rate(&config, offline, media_type, id, rating).await,
        Commands::Forget { id, media_type } => {
            cli::cmd_forget(&config, offline, media_type, id).await
        }
        Commands::Log {
            id,
            rating,
            notes,
            date,
        } => cli::cmd_log(&config, offline, id, rating, notes, date).await,
        Commands::Diary { command } => match command {
            DiaryCommands::Edit {
                entry_id,
                rating,
                notes,
                date,
            } => {
                let patch = DiaryPatch {
                    rating,
                    notes,
                    watched_date: date,
                };
                cli::cmd_diary_edit(&config, offline, entry_id, patch).await
            }
            DiaryCommands::Remove { entry_id } => {
                cli::cmd_diary_remove(&config, offline, entry_id).await
            }
        },
        Commands::Review {
            id,
            media_type,
            rating,
            text,
            spoiler,
            season,
            episode,
        } => {
            anyhow::ensure!(id > 0, "Invalid title ID: {id}");
            let draft = ReviewDraft {
                media_id: MediaId::new(id),
                media_type,
                rating,
                review_text: text,
                is_spoiler: spoiler,
                season_number: season,
                episode_number: episode,
            };
            cli::cmd_review(&config, offline, draft).await
        }
        Commands::Watched => cli::cmd_watched(&config, offline).await,
        Commands::Episode {
            tv_id,
            season,
            episode,
        } => cli::cmd_episode(&config, offline, tv_id, season, episode).await,
        Commands::Season {
            tv_id,
            season,
            rate,
        } => cli::cmd_season(&config, offline, tv_id, season, rate).await,
        Commands::Reviews { tv_id } => cli::cmd_reviews(&config, offline, tv_id).await,
        Commands::Search { query, page } => {
            cli::cmd_search(&config, offline, &query.join(" "), page).await
        }
        Commands::Show { media_type, id } => cli::cmd_show(&config, offline, media_type, id).await,
        Commands::Person { id } => cli::cmd_person(&config, offline, id).await,
        Commands::Discover {
            page,
            sort_by,
            genres,
            year,
            min_vote,
            language,
        } => {
            let params = DiscoverParams {
                page,
                sort_by,
                with_genres: genres,
                year,
                min_vote_average: min_vote,
                with_original_language: language,
            };
            cli::cmd_discover(&config, offline, params).await
        }
        Commands::Serve => cli::cmd_serve(config, offline, prometheus_handle).await,
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "sceneburn")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}
