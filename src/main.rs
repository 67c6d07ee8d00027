//! # Pipeline Driver
//!
//! ## Purpose
//! Thin command-line driver over the library: scrape batches, load the
//! corpus, and answer ad-hoc queries. Presentation layers call the library
//! directly; this binary exists for operating the pipeline.

use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use tracing::info;
use tracing_subscriber::EnvFilter;

use congress_pipeline::{Config, Corpus, IngestSummary, QueryEngine, ScrapePipeline};

fn cli() -> Command {
    Command::new("congress-pipeline")
        .version("0.1.0")
        .about("Scrape, normalize, cache, and query US House legislative data")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("force-reload")
                .long("force-reload")
                .action(ArgAction::SetTrue)
                .help("Re-download documents even when cached")
                .global(true),
        )
        .subcommand(
            Command::new("scrape-bills")
                .about("Scrape bill detail pages")
                .arg(Arg::new("urls").num_args(1..).required(true)),
        )
        .subcommand(
            Command::new("scrape-reps")
                .about("Scrape member detail pages; with no URLs, scrape the sponsor URLs of loaded bills")
                .arg(Arg::new("urls").num_args(0..)),
        )
        .subcommand(
            Command::new("scrape-votes")
                .about("Scrape a year of clerk roll-call feeds")
                .arg(Arg::new("year").long("year").required(true))
                .arg(Arg::new("count").long("count").required(true)),
        )
        .subcommand(
            Command::new("scrape-session")
                .about("Scrape a floor-proceedings document")
                .arg(Arg::new("source").help("Document name, e.g. HDoc-116-1-FloorProceedings.xml")),
        )
        .subcommand(
            Command::new("query")
                .about("Run one query against the loaded corpus")
                .arg(Arg::new("group").required(true))
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("value").required(true)),
        )
}

fn report(summary: &IngestSummary) {
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        "scrape finished"
    );
    for failure in &summary.failed {
        eprintln!(
            "failed [{}] {}: {}",
            failure.category, failure.url, failure.message
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let mut config = Config::from_file(
        matches
            .get_one::<String>("config")
            .map(String::as_str)
            .unwrap_or("config.toml"),
    )?;
    if matches.get_flag("force-reload") {
        config.fetch.force_reload = true;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    match matches.subcommand() {
        Some(("scrape-bills", sub)) => {
            let urls: Vec<String> = sub
                .get_many::<String>("urls")
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            let pipeline = ScrapePipeline::new(config)?;
            report(&pipeline.scrape_bills(&urls).await);
        }
        Some(("scrape-reps", sub)) => {
            let mut urls: Vec<String> = sub
                .get_many::<String>("urls")
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            if urls.is_empty() {
                let corpus = Corpus::load_all(&config.data, &config.corpus)?;
                urls = corpus.sponsor_urls().into_iter().collect();
                info!(count = urls.len(), "scraping sponsor URLs from loaded bills");
            }
            let pipeline = ScrapePipeline::new(config)?;
            report(&pipeline.scrape_reps(&urls).await);
        }
        Some(("scrape-votes", sub)) => {
            let year: u16 = sub
                .get_one::<String>("year")
                .map(String::as_str)
                .unwrap_or_default()
                .parse()?;
            let count: u32 = sub
                .get_one::<String>("count")
                .map(String::as_str)
                .unwrap_or_default()
                .parse()?;
            let pipeline = ScrapePipeline::new(config)?;
            let urls = pipeline.vote_urls(year, 1..=count);
            report(&pipeline.scrape_votes(&urls).await);
        }
        Some(("scrape-session", sub)) => {
            let source = sub
                .get_one::<String>("source")
                .cloned()
                .unwrap_or_else(|| config.scrape.default_floor_source.clone());
            let pipeline = ScrapePipeline::new(config)?;
            let session = pipeline.scrape_session(&source).await?;
            println!("{session}");
        }
        Some(("query", sub)) => {
            let group = sub.get_one::<String>("group").expect("required arg");
            let key = sub.get_one::<String>("key").expect("required arg");
            let value = sub.get_one::<String>("value").expect("required arg");

            let corpus = Arc::new(Corpus::load_all(&config.data, &config.corpus)?);
            let engine = QueryEngine::new(Arc::clone(&corpus), config.query.enable_memo);
            let hits = engine.search(group, key, value.as_str())?;
            println!("{} match(es)", hits.len());
            for id in &hits {
                match id {
                    congress_pipeline::EntityId::Bill(idx) => {
                        if let Some(bill) = corpus.bill(*idx as usize) {
                            println!("  bill: {bill}");
                        }
                    }
                    congress_pipeline::EntityId::Rep(idx) => {
                        if let Some(rep) = corpus.rep(*idx as usize) {
                            println!("  rep: {rep}");
                        }
                    }
                    congress_pipeline::EntityId::Vote(idx) => {
                        if let Some(vote) = corpus.vote(*idx as usize) {
                            println!("  vote: {vote}");
                        }
                    }
                }
            }
        }
        _ => {
            cli().print_help()?;
        }
    }

    Ok(())
}
