//! eventdesk - command-line front-end for the event admin backend.
//!
//! Every read goes through the local cache, so the last known data is still
//! shown when the backend is unreachable.

use std::io;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eventdesk_core::cache::CacheKey;
use eventdesk_core::models::{RegistrationSummary, Visitor};
use eventdesk_core::services::{DashboardService, RegistrationService, VisitorService};
use eventdesk_core::{AdminContext, Config, DataSource, Fetched};

const USAGE: &str = "\
Usage: eventdesk [--demo] <command>

Commands:
  stats                                   Today's dashboard counts
  registrations [event-id]                Registrations for an event
  visitors <registration-id>              Visitors of one registration
  check-in <registration-id> <visitor-id> [--undo]
  clear-cache                             Drop all cached data";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level, e.g. RUST_LOG=eventdesk_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let demo = take_flag(&mut args, "--demo");
    let undo = take_flag(&mut args, "--undo");

    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let mut config = Config::load().context("Failed to load config")?;
    config.apply_env();
    if demo {
        config.demo_mode = true;
    }

    let ctx = AdminContext::from_config(&config)?;
    info!(command = %command, demo = config.demo_mode, "eventdesk starting");

    match command.as_str() {
        "stats" => show_stats(&ctx).await,
        "registrations" => {
            let event_id = match args.get(1) {
                Some(raw) => parse_id(raw, "event id")?,
                None => config
                    .last_event_id
                    .context("No event id given and none remembered")?,
            };
            show_registrations(&ctx, event_id).await?;
            if config.last_event_id != Some(event_id) {
                config.last_event_id = Some(event_id);
                config.save().context("Failed to save config")?;
            }
            Ok(())
        }
        "visitors" => {
            let registration_id = parse_id(arg(&args, 1, "registration id")?, "registration id")?;
            show_visitors(&ctx, registration_id).await
        }
        "check-in" => {
            let registration_id = parse_id(arg(&args, 1, "registration id")?, "registration id")?;
            let visitor_id = parse_id(arg(&args, 2, "visitor id")?, "visitor id")?;
            ctx.visitors
                .set_completed(registration_id, visitor_id, !undo)
                .await?;
            println!(
                "Visitor {} {}",
                visitor_id,
                if undo { "marked pending" } else { "checked in" }
            );
            Ok(())
        }
        "clear-cache" => {
            ctx.clear_all_data()?;
            println!("Cache cleared");
            Ok(())
        }
        other => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
    }
}

/// Remove `flag` from `args`, returning whether it was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn arg<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("Missing {}\n\n{}", what, USAGE))
}

fn parse_id(raw: &str, what: &str) -> Result<i64> {
    raw.parse()
        .with_context(|| format!("Invalid {}: {:?}", what, raw))
}

/// Footer describing where the data came from.
fn source_note<T>(ctx: &AdminContext, fetched: &Fetched<T>, key: &CacheKey) -> Option<String> {
    match fetched.source {
        DataSource::Demo => Some("(demo data)".to_string()),
        DataSource::StaleCache => {
            let age = ctx.cache.cache_age(key).unwrap_or_else(|| "unknown age".to_string());
            Some(format!("(cached data, may be outdated: {})", age))
        }
        DataSource::Cache => ctx.cache.cache_age(key).map(|age| format!("(cached {})", age)),
        DataSource::Remote => None,
    }
}

async fn show_stats(ctx: &AdminContext) -> Result<()> {
    let fetched = ctx.dashboard.stats().await?;
    let stats = &fetched.value;

    if let Some(since) = stats.since {
        println!("Since {}", since.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("Registrations   {:>6}", stats.total_registrations);
    println!(
        "Visitors        {:>6}  ({} checked in, {} pending)",
        stats.total_visitors,
        stats.checked_in_visitors,
        stats.pending_visitors()
    );
    println!(
        "Visit type      {:>6} single day, {} multi day",
        stats.single_day_visitors, stats.multi_day_visitors
    );
    println!(
        "Meals           {:>6} veg, {} non-veg, {} none",
        stats.vegetarian_meals, stats.non_vegetarian_meals, stats.no_meal
    );
    println!(
        "Payments        {:>6}  ({} cash, {} online, {} waived)",
        stats.total_payments(),
        stats.cash_payments,
        stats.online_payments,
        stats.waived_payments
    );
    println!(
        "Collected       {:>6}.{:02}",
        stats.amount_collected / 100,
        (stats.amount_collected % 100).abs()
    );

    if let Some(note) = source_note(ctx, &fetched, &DashboardService::cache_key()) {
        println!("{}", note);
    }
    Ok(())
}

async fn show_registrations(ctx: &AdminContext, event_id: i64) -> Result<()> {
    let fetched = ctx.registrations.list(event_id).await?;
    print_registrations(&fetched.value);

    if let Some(note) = source_note(ctx, &fetched, &RegistrationService::cache_key(event_id)) {
        println!("{}", note);
    }
    Ok(())
}

fn print_registrations(registrations: &[RegistrationSummary]) {
    if registrations.is_empty() {
        println!("No registrations");
        return;
    }
    for registration in registrations {
        println!(
            "{:>6}  {}  {}",
            registration.id,
            registration.created_at.format("%Y-%m-%d %H:%M"),
            registration.name
        );
    }
}

async fn show_visitors(ctx: &AdminContext, registration_id: i64) -> Result<()> {
    let fetched = ctx.visitors.list(registration_id).await?;
    print_visitors(&fetched.value);

    if let Some(note) = source_note(ctx, &fetched, &VisitorService::cache_key(registration_id)) {
        println!("{}", note);
    }
    Ok(())
}

fn print_visitors(visitors: &[Visitor]) {
    if visitors.is_empty() {
        println!("No visitors");
        return;
    }
    for visitor in visitors {
        println!(
            "{:>6}  {:<9} {:<10} {:<14} {}",
            visitor.id,
            visitor.status_label(),
            visitor.visit_type.to_string(),
            visitor.food_preference.to_string(),
            visitor.name
        );
    }
}
