use std::path::Path;

use serde::Serialize;

use crate::app::{AppContext, Result};
use crate::cache::derive_key;
use crate::domain::Failure;
use crate::fetcher::{FetchOptions, FetchResult};
use crate::normalizer::parse_feed;

#[derive(Serialize)]
struct UrlOutcome<'a, T: Serialize> {
    url: &'a str,
    #[serde(flatten)]
    result: T,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Split `urls` into those the client may fetch and those it may not,
/// counting each admitted request against the client's window.
async fn admit(
    ctx: &AppContext,
    client: &str,
    urls: Vec<String>,
) -> Result<(Vec<String>, Vec<(String, Failure)>)> {
    let mut admitted = Vec::new();
    let mut rejected = Vec::new();

    for url in urls {
        let decision = ctx.rate_limiter.check(client).await?;
        if decision.allowed {
            ctx.rate_limiter.increment(client).await?;
            admitted.push(url);
        } else {
            tracing::info!("Rejecting {} for client {}", url, client);
            rejected.push((url, decision.to_failure()));
        }
    }

    Ok((admitted, rejected))
}

pub async fn fetch_feeds(
    ctx: &AppContext,
    urls: Vec<String>,
    client: &str,
    use_cache: bool,
    force_refresh: bool,
) -> Result<()> {
    let (admitted, rejected) = admit(ctx, client, urls).await?;

    for (url, failure) in &rejected {
        print_json(&UrlOutcome {
            url: url.as_str(),
            result: failure,
        })?;
    }

    let options = FetchOptions {
        force_refresh,
        ttl_secs: None,
    };
    let cache = use_cache.then(|| ctx.cache.clone());

    let results: Vec<(String, Result<FetchResult>)> = if admitted.len() == 1 {
        let url = admitted[0].clone();
        let result = ctx.fetcher.fetch(&url, cache.as_ref(), &options).await;
        vec![(url, result)]
    } else {
        ctx.parallel_fetcher
            .fetch_all(admitted, cache, options)
            .await
    };

    for (url, result) in results {
        match result {
            Ok(result) => print_json(&UrlOutcome { url: &url, result })?,
            Err(e) => eprintln!("  Error fetching {}: {}", url, e),
        }
    }

    Ok(())
}

pub fn parse_file(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    match parse_feed(&content) {
        Ok(parsed) => print_json(&parsed),
        Err(failure) => print_json(&failure),
    }
}

pub fn show_key(url: &str) {
    println!("{}", derive_key(url));
}

pub async fn show_limit(ctx: &AppContext, client: &str) -> Result<()> {
    let decision = ctx.rate_limiter.check(client).await?;
    print_json(&decision)
}
