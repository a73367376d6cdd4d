//! namescan command-line front end.
//!
//! Talks to a running namescan server through [`SearchClient`], caching
//! results on disk, and prints the per-site counts followed by each result.

use anyhow::{Context, Result};
use clap::Parser;
use namescan_client::{Debouncer, SearchClient, SearchPhase, SearchState};
use namescan_core::{AppConfig, CacheDb, CachePolicy, Locale, MemoryCache, Messages, ResultCache};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod args;
mod render;

use args::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let locale = cli.lang.as_deref().map(Locale::from_tag).unwrap_or_else(Locale::detect);
    let client = build_client(&cli, &config, locale).await?;

    match client.purge_expired().await {
        Ok(purged) if purged > 0 => tracing::debug!(purged, "dropped expired cache entries"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to purge expired cache entries"),
    }

    let sites = if cli.sites.is_empty() {
        match client.allowed_sites().await {
            Ok(sites) => sites.iter().map(ToString::to_string).collect(),
            Err(failure) => {
                eprintln!("{}", failure.message);
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        cli.sites.clone()
    };

    if cli.interactive {
        return interactive(client, sites, cli.location.clone(), cli.json).await;
    }

    let name = cli.name.clone().unwrap_or_default();

    if cli.report {
        return match client.search_report(&name, sites.as_slice(), cli.location.as_deref()).await {
            Ok(report) if cli.json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(ExitCode::SUCCESS)
            }
            Ok(report) => {
                print!("{}", render::results(&report.results, &name, client.messages()));
                eprint!("{}", render::failures(&report.failures));
                Ok(ExitCode::SUCCESS)
            }
            Err(failure) => {
                eprintln!("{}", failure.message);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    client.search(&name, sites.as_slice(), cli.location.as_deref()).await;
    print_state(&client.state(), &name, client.messages(), cli.json)
}

async fn build_client(cli: &Cli, config: &AppConfig, locale: Locale) -> Result<SearchClient> {
    let endpoint = cli.endpoint.clone().unwrap_or_else(|| format!("http://{}", config.bind_addr));
    let policy = match config.cache_ttl() {
        Some(ttl) => CachePolicy::with_ttl(ttl),
        None => CachePolicy::never_expire(),
    };

    let memory = || Arc::new(MemoryCache::new(config.cache_max_entries as u64)) as Arc<dyn ResultCache>;
    let cache = if cli.no_cache {
        memory()
    } else {
        match CacheDb::open(&config.cache_db_path).await {
            Ok(db) => Arc::new(db.with_capacity(config.cache_max_entries)) as Arc<dyn ResultCache>,
            Err(e) => {
                tracing::warn!(path = %config.cache_db_path.display(), error = %e, "cache unavailable, using memory");
                memory()
            }
        }
    };

    Ok(SearchClient::new(&endpoint, cache, policy)?.with_locale(locale))
}

/// Search each line read from stdin once typing settles.
async fn interactive(client: SearchClient, sites: Vec<String>, location: Option<String>, json: bool) -> Result<ExitCode> {
    let messages = client.messages();
    eprint!("{}", render::banner(messages, &sites, location.as_deref()));

    let sites = Arc::new(sites);
    let debouncer = Debouncer::default().on_stop({
        let client = client.clone();
        move || client.cancel()
    });
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let name = line.trim().to_string();
        if name.is_empty() {
            continue;
        }

        let client = client.clone();
        let sites = Arc::clone(&sites);
        let location = location.clone();
        debouncer.trigger(async move {
            eprintln!("{}", client.messages().loading);
            let phase = client.search(&name, sites.as_slice(), location.as_deref()).await;
            if phase != SearchPhase::Aborted {
                let _ = print_state(&client.state(), &name, client.messages(), json);
            }
        });
    }

    while debouncer.is_pending() {
        tokio::time::sleep(debouncer.delay() / 4).await;
    }
    client.cancel();

    Ok(ExitCode::SUCCESS)
}

fn print_state(state: &SearchState, name: &str, messages: &Messages, json: bool) -> Result<ExitCode> {
    match (&state.error, state.phase) {
        (Some(failure), _) => {
            eprintln!("{}", failure.message);
            Ok(ExitCode::FAILURE)
        }
        (None, SearchPhase::Success) if json => {
            println!("{}", serde_json::to_string_pretty(&state.results)?);
            Ok(ExitCode::SUCCESS)
        }
        (None, SearchPhase::Success) => {
            print!("{}", render::results(&state.results, name, messages));
            Ok(ExitCode::SUCCESS)
        }
        (None, phase) => {
            tracing::debug!(?phase, "search ended without results");
            Ok(ExitCode::FAILURE)
        }
    }
}
