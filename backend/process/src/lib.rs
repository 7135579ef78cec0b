//! # Catalog Maintenance
//!
//! Offline jobs that share the server's configuration and store.
//!
//! ## Seeding
//! Runs the same reseed the `POST /{prefix}/load-data` routes run, for any
//! number of categories in one go. Each category is fetched and normalized
//! before its collection is cleared, so a feed that is down leaves the
//! existing products in place and the run moves on to the next category.
//!
//! With `--dry-run` nothing is written; the report only shows how many
//! records would load and which were skipped.
//!
//! ## Admin claims
//! Bootstrapping the first admin cannot go through `/admin/set-claim`, which
//! itself needs an admin. `grant-admin` sets the claim directly with the
//! service account.
use anyhow::{Context, Result, bail};
use catalog::{Category, HttpFeed};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use server::{
    auth::{ClaimsAdmin, FirebaseAuth},
    config::Config,
    database::init_mongo,
    loader::{LoadReport, preview, reseed},
    store::MongoStore,
};
use tracing::{error, info};

/// Reseeds `categories`, or all of them when empty. Returns the number of
/// categories that failed.
pub async fn seed(categories: Vec<Category>, dry_run: bool) -> Result<usize> {
    let config = Config::load()?;
    let categories = if categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        categories
    };

    let feed = HttpFeed::new(&config.feed_base_url, config.feed_timeout)
        .context("building feed client")?;
    let store = if dry_run {
        None
    } else {
        let db = init_mongo(&config.mongodb_uri, &config.mongodb_database).await?;
        Some(MongoStore::new(db))
    };

    let pb = ProgressBar::new(categories.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut failures = 0;
    for category in categories {
        pb.set_message(format!("Loading {category}"));

        let result = match &store {
            Some(store) => reseed(store, &feed, category).await,
            None => preview(&feed, category).await,
        };

        match result {
            Ok(report) => pb.println(summary(&report, dry_run)),
            Err(e) => {
                error!("Failed to load {category}: {e}");
                failures += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    Ok(failures)
}

pub async fn grant_admin(uid: &str, revoke: bool) -> Result<()> {
    let uid = uid.trim();
    if uid.is_empty() {
        bail!("uid must not be empty");
    }

    let mut config = Config::load()?;
    let firebase = FirebaseAuth::new(
        &config.firebase_project_id,
        Client::new(),
        config.service_account.take(),
    );
    if !firebase.has_service_account() {
        bail!("no Firebase service account configured");
    }

    firebase.set_admin_claim(uid, !revoke).await?;
    info!("Set admin={} on {uid}", !revoke);

    Ok(())
}

fn summary(report: &LoadReport, dry_run: bool) -> String {
    let verb = if dry_run { "would load" } else { "loaded" };
    let mut line = format!(
        "{}: {verb} {}, skipped {}",
        report.category,
        report.loaded,
        report.skipped.len()
    );

    for skipped in &report.skipped {
        line.push_str(&format!("\n  #{}: {}", skipped.index, skipped.reason));
    }

    line
}
