//! registro - CLI client for a public registry backed by a hosted
//! document store.
//!
//! Users search registry entries by name and city and submit new entries.
//! The city reference directory is served through a 24-hour local cache
//! (`cache::DirectoryCache`) so repeat invocations stay off the network.

mod api;
mod cache;
mod config;
mod models;
mod storage;
mod utils;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api::client::DEFAULT_SEARCH_LIMIT;
use api::FirestoreClient;
use cache::DirectoryCache;
use config::Config;
use models::{City, EntryDraft};
use storage::FileStore;
use utils::{city_slug, format_optional};

const USAGE: &str = "\
registro - public registry client

Usage:
  registro cities                      List the city directory, grouped by province
  registro search <term> [--city ID]   Search entries by name, optionally in one city
  registro add [options]               Submit a new entry
  registro audit                       Check the city directory for id collisions
  registro config [options]            Save project settings
  registro help                        Show this help

Add options (all required unless noted):
  --first-name NAME   --last-name NAME   --age N   --gender G
  --city ID           --description TEXT
  --accept-terms      Acknowledge the publication terms

Config options:
  --project-id ID     --api-key KEY

Environment:
  REGISTRO_PROJECT_ID, REGISTRO_API_KEY  Override the config file
  RUST_LOG                               Log filter (e.g. RUST_LOG=debug)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("help");

    match command {
        "cities" => cmd_cities().await,
        "search" => cmd_search(&args[1..]).await,
        "add" => cmd_add(&args[1..]).await,
        "audit" => cmd_audit().await,
        "config" => cmd_config(&args[1..]),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
    }
}

/// Wire up config, store, client and cache for a command invocation.
fn build_services() -> Result<(DirectoryCache, FirestoreClient)> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let project_id = config.project_id.clone().ok_or_else(|| {
        anyhow!("No project configured. Set REGISTRO_PROJECT_ID or run `registro config`.")
    })?;
    let api_key = config.api_key.clone().ok_or_else(|| {
        anyhow!("No API key configured. Set REGISTRO_API_KEY or run `registro config`.")
    })?;

    let client = FirestoreClient::new(project_id, api_key)?;

    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    let store = FileStore::new(cache_dir)?;
    let cache = DirectoryCache::new(Arc::new(client.clone()), Arc::new(store));

    Ok((cache, client))
}

fn next_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| anyhow!("{} requires a value", flag))
}

async fn cmd_cities() -> Result<()> {
    let (cache, _client) = build_services()?;

    let fetch = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_cities().await })
    };
    if cache.is_loading() {
        eprintln!("Loading city directory...");
    }

    let cities = fetch.await?;
    if cities.is_empty() {
        println!("No data available.");
        return Ok(());
    }

    for (province, group) in models::city::by_province(&cities) {
        println!("{}", province);
        for city in group {
            println!("  {:<28} {}", city.name, city.id);
        }
    }
    println!("\n{} cities", cities.len());
    Ok(())
}

async fn cmd_search(args: &[String]) -> Result<()> {
    let mut term = String::new();
    let mut city_filter: Option<String> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--city" => city_filter = Some(next_value(&mut iter, "--city")?),
            flag if flag.starts_with("--") => bail!("Unknown flag: {}", flag),
            word => {
                if !term.is_empty() {
                    term.push(' ');
                }
                term.push_str(word);
            }
        }
    }

    let term = term.trim().to_string();
    if term.is_empty() && city_filter.is_none() {
        println!("Enter a name, last name, or city to search.");
        return Ok(());
    }

    let (cache, client) = build_services()?;

    let mut entries = client
        .search_entries(city_filter.as_deref(), DEFAULT_SEARCH_LIMIT)
        .await
        .context("Entry search failed")?;

    if !term.is_empty() {
        entries.retain(|entry| entry.matches_term(&term));
    }

    if entries.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    let cities = cache.get_cities().await;
    println!("Results ({}):\n", entries.len());

    for entry in &entries {
        let city_name = cities
            .iter()
            .find(|city| city.id == entry.city_id)
            .map(|city| city.name.clone())
            .unwrap_or_else(|| "Unknown city".to_string());

        println!("{} - {}", entry.full_name(), city_name);

        let age = entry.age.map(|a| a.to_string());
        println!(
            "  age: {}  gender: {}",
            format_optional(&age, "-"),
            format_optional(&entry.gender, "-")
        );
        if let Some(created_at) = entry.created_at {
            println!("  reported: {}", created_at.format("%b %d, %Y"));
        }
        if !entry.description.is_empty() {
            println!("  {}", entry.description);
        }
        println!();
    }
    Ok(())
}

async fn cmd_add(args: &[String]) -> Result<()> {
    let mut first_name = None;
    let mut last_name = None;
    let mut age = None;
    let mut gender = None;
    let mut city_id = None;
    let mut description = None;
    let mut accepted_terms = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--first-name" => first_name = Some(next_value(&mut iter, "--first-name")?),
            "--last-name" => last_name = Some(next_value(&mut iter, "--last-name")?),
            "--age" => age = Some(next_value(&mut iter, "--age")?),
            "--gender" => gender = Some(next_value(&mut iter, "--gender")?),
            "--city" => city_id = Some(next_value(&mut iter, "--city")?),
            "--description" => description = Some(next_value(&mut iter, "--description")?),
            "--accept-terms" => accepted_terms = true,
            other => bail!("Unknown flag: {}", other),
        }
    }

    let first_name = first_name.ok_or_else(|| anyhow!("--first-name is required"))?;
    let last_name = last_name.ok_or_else(|| anyhow!("--last-name is required"))?;
    let age: i64 = age
        .ok_or_else(|| anyhow!("--age is required"))?
        .parse()
        .context("--age must be a number")?;
    let gender = gender.ok_or_else(|| anyhow!("--gender is required"))?;
    let city_id = city_id.ok_or_else(|| anyhow!("--city is required"))?;
    let description = description.ok_or_else(|| anyhow!("--description is required"))?;

    if !accepted_terms {
        bail!("Submissions must acknowledge the publication terms (--accept-terms)");
    }

    let (cache, client) = build_services()?;

    // Only ids from the reference directory are accepted
    let cities = cache.get_cities().await;
    if !cities.iter().any(|city| city.id == city_id) {
        bail!(
            "Unknown city id '{}'. Run `registro cities` to list valid ids.",
            city_id
        );
    }

    let draft = EntryDraft {
        first_name,
        last_name,
        age,
        gender,
        city_id,
        description,
        accepted_terms,
    };

    let id = client
        .submit_entry(&draft)
        .await
        .context("Failed to submit entry")?;

    info!(id = %id, "Entry submitted");
    println!("Entry added ({})", id);
    Ok(())
}

/// Recompute the canonical slug for every city and report collisions and
/// ids that drifted from their slug.
async fn cmd_audit() -> Result<()> {
    let (cache, _client) = build_services()?;

    let cities = cache.get_cities().await;
    if cities.is_empty() {
        println!("No data available.");
        return Ok(());
    }

    let mut seen: HashMap<String, &City> = HashMap::new();
    let mut collisions = 0;
    let mut mismatches = 0;

    for city in &cities {
        let slug = city_slug(&city.province, &city.name);

        if slug != city.id {
            mismatches += 1;
            println!("id mismatch: '{}' (expected '{}')", city.id, slug);
        }

        if let Some(previous) = seen.insert(slug.clone(), city) {
            collisions += 1;
            println!(
                "slug collision: '{}' is claimed by both '{}' and '{}'",
                slug, previous.name, city.name
            );
        }
    }

    if collisions == 0 && mismatches == 0 {
        println!("No duplicates found ({} cities).", cities.len());
    } else {
        println!(
            "\n{} collisions, {} mismatches in {} cities",
            collisions,
            mismatches,
            cities.len()
        );
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    let mut config = Config::load_file().unwrap_or_default();
    let mut changed = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--project-id" => {
                config.project_id = Some(next_value(&mut iter, "--project-id")?);
                changed = true;
            }
            "--api-key" => {
                config.api_key = Some(next_value(&mut iter, "--api-key")?);
                changed = true;
            }
            other => bail!("Unknown flag: {}", other),
        }
    }

    if !changed {
        bail!("Nothing to set. Pass --project-id and/or --api-key.");
    }

    config.save()?;
    println!("Configuration saved.");
    Ok(())
}
