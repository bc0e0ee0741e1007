//! memocache CLI
//!
//! Drives a cache against a simulated slow producer to show coalescing, lazy
//! expiry and sweep reclamation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::future::join_all;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use memocache::{AsyncMemCache, CacheConfig};

/// memocache - TTL-bounded, request-coalescing memoization
#[derive(Parser)]
#[command(name = "memocache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire concurrent lookups and count producer invocations
    Coalesce {
        /// Number of concurrent callers
        #[arg(short, long, default_value = "100")]
        callers: usize,
        /// Number of distinct keys the callers spread over
        #[arg(short, long, default_value = "4")]
        keys: usize,
        /// Simulated producer latency in milliseconds
        #[arg(short, long, default_value = "50")]
        latency_ms: u64,
        /// Cache TTL in milliseconds
        #[arg(short, long, default_value = "1000", env = "MEMOCACHE_TTL_MS")]
        ttl_ms: i64,
    },

    /// Show lazy expiry and sweep reclamation for one key
    Expiry {
        /// Cache TTL in milliseconds
        #[arg(short, long, default_value = "100", env = "MEMOCACHE_TTL_MS")]
        ttl_ms: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "memocache=debug,info"
    } else {
        "memocache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Coalesce {
            callers,
            keys,
            latency_ms,
            ttl_ms,
        } => cmd_coalesce(callers, keys, latency_ms, ttl_ms).await,
        Commands::Expiry { ttl_ms } => cmd_expiry(ttl_ms).await,
    }
}

type DemoCache = AsyncMemCache<String, String>;

fn build_cache(ttl_ms: i64) -> Result<DemoCache> {
    let config = CacheConfig { ttl_ms };
    DemoCache::with_config(&config).context("Failed to create cache")
}

/// Fire concurrent lookups
async fn cmd_coalesce(callers: usize, keys: usize, latency_ms: u64, ttl_ms: i64) -> Result<()> {
    ensure!(keys > 0, "--keys must be at least 1");

    println!(
        "{} {} callers over {} keys",
        "🔁 Coalescing".cyan().bold(),
        callers,
        keys
    );

    let cache = build_cache(ttl_ms)?;
    let invocations = Arc::new(AtomicUsize::new(0));
    let latency = Duration::from_millis(latency_ms);

    let start = Instant::now();
    let handles: Vec<_> = (0..callers)
        .map(|caller| {
            let key = format!("key-{}", caller % keys);
            let invocations = invocations.clone();
            let value = format!("{} (first requested by caller {})", key, caller);
            cache.get(&key, move || {
                invocations.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(latency).await;
                    Ok(value)
                }
            })
        })
        .collect();

    let results = join_all(handles).await;
    let elapsed = start.elapsed();
    let failures = results.iter().filter(|r| r.is_err()).count();
    let calls = invocations.load(Ordering::SeqCst);

    info!(
        callers,
        calls,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Coalescing run finished"
    );

    println!("\n{}", "📈 Results:".green().bold());
    println!("   Callers:              {}", callers);
    println!("   Producer invocations: {}", calls);
    println!("   Failures:             {}", failures);
    println!("   Cached entries:       {}", cache.len());
    println!("   Wall time:            {:?}", elapsed);

    if calls == keys.min(callers) {
        println!("   {} One producer call per key", "✅".green());
    } else {
        println!("   {} Expected {}, saw {}", "❌".red(), keys.min(callers), calls);
    }

    cache.destroy();
    Ok(())
}

/// Walk one key through its lifecycle
async fn cmd_expiry(ttl_ms: i64) -> Result<()> {
    let cache = build_cache(ttl_ms)?;
    let ttl = cache.ttl();

    println!(
        "{} ttl={:?}, sweep every {:?}",
        "⏱️  Expiry".cyan().bold(),
        ttl,
        cache.sweep_interval()
    );

    let first = cache
        .get("demo", || async { Ok("first".to_string()) })
        .await
        .map_err(anyhow::Error::msg)?;
    println!("   {} {}", "Resolved:".dimmed(), first);

    let hit = cache
        .get("demo", || async { Ok("not used".to_string()) })
        .await
        .map_err(anyhow::Error::msg)?;
    println!("   {} {}", "Within TTL:".dimmed(), hit);

    tokio::time::sleep(ttl).await;
    println!(
        "   {} stored={}, expired={}",
        "After TTL:".dimmed(),
        cache.len(),
        cache.stats().expired_entries
    );

    tokio::time::sleep(cache.sweep_interval()).await;
    println!("   {} stored={}", "After sweep:".dimmed(), cache.len());

    let refreshed = cache
        .get("demo", || async { Ok("second".to_string()) })
        .await
        .map_err(anyhow::Error::msg)?;
    println!("   {} {}", "Refetched:".dimmed(), refreshed);

    cache.destroy();
    Ok(())
}
