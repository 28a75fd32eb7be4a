//! CLI module - Command-line interface for SceneBurn
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::domain::MediaType;

/// SceneBurn - movie and TV watch tracking
#[derive(Parser)]
#[command(name = "sceneburn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use an in-memory store instead of Supabase (nothing is persisted)
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Sign in with email and password
    Login {
        email: String,
        /// Password; read from SCENEBURN_PASSWORD or prompted when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show the watch state of a title
    #[command(alias = "st")]
    State {
        id: i64,
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
    },

    /// Like or unlike a title
    Like {
        id: i64,
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
    },

    /// Add a title to the watchlist or remove it
    #[command(alias = "wl")]
    Watchlist {
        id: i64,
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
    },

    /// Rate a title from 1 to 10 (0 clears)
    Rate {
        id: i64,
        rating: i32,
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
    },

    /// Delete every rating, review, list entry and diary log of a title
    Forget {
        id: i64,
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
    },

    /// Log a movie watch in the diary
    Log {
        id: i64,
        #[arg(long)]
        rating: Option<i32>,
        #[arg(long)]
        notes: Option<String>,
        /// Watch date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Manage movie diary entries
    Diary {
        #[command(subcommand)]
        command: DiaryCommands,
    },

    /// Write a review
    Review {
        id: i64,
        #[arg(long = "type", default_value = "movie")]
        media_type: MediaType,
        #[arg(long)]
        rating: Option<i32>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        spoiler: bool,
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        episode: Option<i32>,
    },

    /// List watched titles
    #[command(alias = "w")]
    Watched,

    /// Mark an episode watched, or unmark it
    #[command(alias = "ep")]
    Episode {
        tv_id: i64,
        season: i32,
        episode: i32,
    },

    /// Show a season with progress; --rate sets the season rating (0 clears)
    Season {
        tv_id: i64,
        season: i32,
        #[arg(long)]
        rate: Option<i32>,
    },

    /// Community episode ratings of a show, per season
    Reviews { tv_id: i64 },

    /// Search movies, shows and people
    #[command(alias = "s")]
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Show catalog details and watch state of a title
    #[command(alias = "i")]
    Show { media_type: MediaType, id: i64 },

    /// Show a person from the catalog
    Person { id: i64 },

    /// Browse movies by popularity, genre or year
    Discover {
        #[arg(long)]
        page: Option<u32>,
        /// e.g. popularity.desc, vote_average.desc
        #[arg(long)]
        sort_by: Option<String>,
        /// Genre ID; repeatable
        #[arg(long = "genre")]
        genres: Vec<i32>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        min_vote: Option<f64>,
        #[arg(long)]
        language: Option<String>,
    },

    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve,
}

#[derive(Subcommand)]
pub enum DiaryCommands {
    /// Change rating, notes or date of an entry
    Edit {
        entry_id: Uuid,
        #[arg(long)]
        rating: Option<i32>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Remove { entry_id: Uuid },
}

pub use commands::*;
