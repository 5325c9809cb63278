use std::fs;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::config::{AppConfig, SourceConfig};
use crate::llm::openai::{LlmClient, OpenAiClient, OpenAiClientConfig};
use crate::llm::summarize::summarize;
use crate::site;
use crate::telemetry::{self};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::run::{Phase as RunPhase, Run};

pub mod fetch;
pub mod filter;
pub mod sanitize;
pub mod store;
pub mod types;

use fetch::{FeedSource, HttpFeedSource};
use filter::EntryFilter;
use types::{Entry, RunApply, RunPlan, RunTotals, SourcePlan, SourceReport};

#[derive(Args)]
pub struct RunCmd {
    /// Execute the pipeline; without this flag only the plan is printed.
    #[arg(long, default_value_t = false)]
    pub apply: bool,
    #[arg(long, default_value_t = 10)]
    pub plan_limit: usize,
}

pub async fn run(cfg: &AppConfig, args: RunCmd) -> Result<()> {
    let log = telemetry::run();
    let _g = log
        .root_span_kv([
            ("apply", args.apply.to_string()),
            ("sources", cfg.sources.len().to_string()),
            ("base", cfg.base.display().to_string()),
        ])
        .entered();

    if !args.apply {
        if telemetry::config::json_mode() {
            let sample: Vec<SourcePlan> = cfg
                .sources
                .iter()
                .take(args.plan_limit)
                .map(|s| SourcePlan {
                    name: s.name.clone(),
                    urls: s.urls().map(str::to_string).collect(),
                    filtered: s.filter_apply.is_some(),
                    max_items: s.max_items,
                })
                .collect();
            let plan = RunPlan {
                sources: cfg.sources.len(),
                base: cfg.base.display().to_string(),
                sample_sources: sample,
            };
            log.plan(&plan)?;
        } else {
            log.info(format!(
                "📝 Run plan — sources={} base={}",
                cfg.sources.len(),
                cfg.base.display()
            ));
            for s in cfg.sources.iter().take(args.plan_limit) {
                log.info(format!(
                    "  name={} urls={} filtered={} max_items={}",
                    s.name,
                    s.urls().count(),
                    s.filter_apply.is_some(),
                    s.max_items
                ));
            }
            if cfg.sources.len() > args.plan_limit {
                log.info(format!("  ... ({} more)", cfg.sources.len() - args.plan_limit));
            }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    fs::create_dir_all(&cfg.base)
        .with_context(|| format!("creating output directory {}", cfg.base.display()))?;

    // one feed client and one completion client for the whole run
    let feeds = HttpFeedSource::new()?;
    let llm = OpenAiClient::new(OpenAiClientConfig::new(
        cfg.env.api_key.clone(),
        cfg.env.base_url.clone(),
        cfg.env.proxy.clone(),
    ))?;

    let mut per_source: Vec<SourceReport> = Vec::new();
    let mut invalid = 0usize;

    for source in &cfg.sources {
        let filter = {
            let _s = log
                .span_kv(&RunPhase::Validate, [("source", source.name.clone())])
                .entered();
            match source.filter() {
                Ok(f) => f,
                Err(err) => {
                    log.error_kv(
                        "🚫 invalid source config",
                        [("source", source.name.clone()), ("error", err.to_string())],
                    );
                    invalid += 1;
                    continue;
                }
            }
        };
        let report = process_source(cfg, source, filter, &feeds, &llm, &log).await?;
        log.source_summary(&report.name, report.accepted, report.persisted, report.skipped_urls);
        per_source.push(report);
    }

    let accepted: usize = per_source.iter().map(|r| r.accepted).sum();
    log.totals(cfg.sources.len(), accepted, invalid);

    site::render(cfg)?;

    if telemetry::config::json_mode() {
        let result = RunApply {
            totals: RunTotals {
                sources: cfg.sources.len(),
                accepted,
                invalid,
            },
            per_source,
        };
        log.result(&result)?;
    }

    if invalid > 0 {
        bail!("{invalid} source(s) failed validation");
    }
    Ok(())
}

/// Process one source end to end: load and bound the previous artifact,
/// fetch and filter each configured URL, summarize the accepted entries,
/// merge and persist. Feed fetch/parse failures skip the URL; a
/// summarization transport failure or a write failure aborts the run.
async fn process_source(
    cfg: &AppConfig,
    source: &SourceConfig,
    filter: Option<EntryFilter>,
    feeds: &dyn FeedSource,
    llm: &dyn LlmClient,
    log: &LogCtx<Run>,
) -> Result<SourceReport> {
    let previous = {
        let _s = log
            .span_kv(&RunPhase::LoadPrevious, [("source", source.name.clone())])
            .entered();
        store::truncate(store::load_previous(&cfg.base, &source.name), source.max_items)
    };

    let mut fresh: Vec<Entry> = Vec::new();
    let mut skipped_urls = 0usize;

    'urls: for url in source.urls() {
        if fresh.len() >= source.max_items {
            break;
        }
        let feed = {
            let _s = log
                .span_kv(&RunPhase::FetchFeed, [("url", url.to_string())])
                .entered();
            match feeds.fetch(url).await {
                Ok(f) => f,
                Err(err) => {
                    log.warn_kv(
                        "⚠️ feed skipped",
                        [("url", url.to_string()), ("error", err.to_string())],
                    );
                    skipped_urls += 1;
                    continue;
                }
            }
        };

        for raw in &feed.entries {
            // accumulation stops for the whole source once the cap is hit
            if fresh.len() >= source.max_items {
                continue 'urls;
            }
            let Some(mut entry) = fetch::entry_fields(raw) else {
                log.debug_kv("↩️ skip", [("reason", "no-link".to_string())]);
                continue;
            };
            {
                let _s = log.span(&RunPhase::Filter).entered();
                if let Some(f) = &filter {
                    if !f.matches(&entry) {
                        log.debug_kv(
                            "↩️ skip",
                            [("reason", "filtered".to_string()), ("link", entry.link.clone())],
                        );
                        continue;
                    }
                }
            }
            let cleaned = sanitize::sanitize(&entry.article);
            let summary = {
                let _s = log
                    .span_kv(&RunPhase::Summarize, [("link", entry.link.clone())])
                    .entered();
                summarize(
                    llm,
                    &cleaned,
                    &cfg.env.model,
                    &cfg.language,
                    cfg.keyword_length,
                    cfg.summary_length,
                )
                .await
                .with_context(|| format!("summarizing {} for source {}", entry.link, source.name))?
            };
            entry.summary = Some(summary);
            log.info_kv(
                "➕ accept",
                [("source", source.name.clone()), ("title", entry.title.clone())],
            );
            fresh.push(entry);
        }
    }

    let accepted = fresh.len();
    let persisted = {
        let _s = log
            .span_kv(&RunPhase::Persist, [("source", source.name.clone())])
            .entered();
        store::write_listing(&cfg.base, &source.name, &fresh)?;
        let merged = store::merge(fresh, previous, source.max_items);
        let channel_link = format!("{}{}.xml", cfg.env.deployment_url, source.name);
        store::persist(&cfg.base, &source.name, &channel_link, &merged)?;
        merged.len()
    };

    Ok(SourceReport {
        name: source.name.clone(),
        accepted,
        persisted,
        skipped_urls,
    })
}
