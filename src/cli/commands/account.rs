//! Config bootstrap and sign-in commands

use anyhow::Context;
use std::io::{BufRead, Write};

use crate::clients::supabase_auth::SupabaseAuthClient;
use crate::config::Config;
use crate::services::{SessionFile, WatchStateService};
use crate::state::build_shared_http_client;

use super::context::CliContext;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml");
        println!("Set supabase.url and supabase.anon_key, then run: sceneburn login <email>");
    } else {
        println!("config.toml already exists");
    }
    Ok(())
}

fn auth_client(config: &Config) -> anyhow::Result<SupabaseAuthClient> {
    let http = build_shared_http_client(config.supabase.request_timeout_seconds.into())?;
    Ok(SupabaseAuthClient::new(
        http,
        &config.supabase.url,
        config.supabase.anon_key.clone(),
    )?)
}

fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var("SCENEBURN_PASSWORD")
        && !password.is_empty()
    {
        return Ok(password);
    }

    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_login(
    config: &Config,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };
    anyhow::ensure!(!password.is_empty(), "Password cannot be empty");

    let session = auth_client(config)?
        .sign_in_with_password(email, &password)
        .await
        .context("Sign-in failed")?;

    let file = SessionFile::default_location()?;
    file.save(&session)?;

    println!(
        "Signed in as {} ({})",
        session.user.email.as_deref().unwrap_or(email),
        session.user_id()
    );
    println!("Session stored in {}", file.path().display());
    Ok(())
}

pub async fn cmd_logout(config: &Config) -> anyhow::Result<()> {
    let file = SessionFile::default_location()?;
    let Some(session) = file.load()? else {
        println!("Not signed in.");
        return Ok(());
    };

    if let Err(e) = auth_client(config)?.sign_out(&session.access_token).await {
        tracing::warn!(error = %e, "Remote sign-out failed; removing local session anyway");
    }
    file.clear()?;
    println!("Signed out.");
    Ok(())
}

pub async fn cmd_whoami(config: &Config, offline: bool) -> anyhow::Result<()> {
    let ctx = CliContext::open(config, offline).await?;
    let user_id = ctx.watch.user_id();

    let profile = ctx
        .store
        .profiles()
        .get(user_id)
        .await
        .context("Failed to load profile")?;

    println!("User {user_id}");
    println!("{:-<60}", "");
    match profile {
        Some(profile) => {
            println!("  Name:     {}", profile.display_name());
            if let Some(username) = &profile.username {
                println!("  Username: @{username}");
            }
        }
        None => println!("  No profile row yet."),
    }
    Ok(())
}
