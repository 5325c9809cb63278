use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::AppConfig;
use crate::telemetry::{self};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::render::{Phase as RenderPhase, Render};

/// The two files whose trailing feed list is regenerated every run.
const README_FILES: [&str; 2] = ["README.md", "README-zh.md"];

struct FeedLink {
    name: String,
    url: String,
}

/// Render the presentational artifacts for the configured sources: the
/// status page under the output base and the README feed listings.
pub fn render(cfg: &AppConfig) -> Result<()> {
    let log = telemetry::render();
    let _g = log.root_span().entered();

    {
        let _s = log.span(&RenderPhase::StatusPage).entered();
        let feeds: Vec<FeedLink> = cfg
            .sources
            .iter()
            .map(|s| FeedLink {
                name: s.name.clone(),
                url: s.url.replace(',', "<br>"),
            })
            .collect();
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let html = status_page_html(&now, &feeds);
        let path = cfg.base.join("index.html");
        fs::write(&path, html)
            .with_context(|| format!("writing status page {}", path.display()))?;
        log.info_kv("🖼️ status page", [("path", path.display().to_string())]);
    }

    {
        let _s = log.span(&RenderPhase::Readme).entered();
        let links: Vec<String> = cfg
            .sources
            .iter()
            .map(|s| {
                format!(
                    "- {} -> {}{}.xml\n",
                    s.url.replace(',', ", "),
                    cfg.env.deployment_url,
                    s.name
                )
            })
            .collect();
        for readme in README_FILES {
            update_readme(Path::new(readme), &links, &log)?;
        }
    }

    Ok(())
}

fn status_page_html(update_time: &str, feeds: &[FeedLink]) -> String {
    let mut rows = String::new();
    for f in feeds {
        rows.push_str(&format!(
            "      <li><a href=\"{name}.xml\">{name}</a><p class=\"urls\">{url}</p></li>\n",
            name = f.name,
            url = f.url,
        ));
    }
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         \x20 <meta charset=\"utf-8\">\n\
         \x20 <title>RSS Digest</title>\n\
         </head>\n\
         <body>\n\
         \x20 <h1>RSS Digest</h1>\n\
         \x20 <p>Last updated: {update_time}</p>\n\
         \x20 <ul>\n\
         {rows}\
         \x20 </ul>\n\
         </body>\n\
         </html>\n"
    )
}

/// Replace the trailing feed list of a README: drop trailing list-marker and
/// blank lines, then append a blank line and the freshly generated links.
/// A missing file is skipped — the listing is presentational glue.
fn update_readme(path: &Path, links: &[String], log: &LogCtx<Render>) -> Result<()> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(err) => {
            log.warn_kv(
                "⚠️ readme skipped",
                [("path", path.display().to_string()), ("error", err.to_string())],
            );
            return Ok(());
        }
    };

    let mut lines: Vec<&str> = text.lines().collect();
    while matches!(lines.last(), Some(l) if l.starts_with("- ") || l.is_empty()) {
        lines.pop();
    }

    let mut out = String::new();
    if !lines.is_empty() {
        out.push_str(&lines.join("\n"));
        out.push('\n');
    }
    out.push('\n');
    for link in links {
        out.push_str(link);
    }

    fs::write(path, out).with_context(|| format!("rewriting readme {}", path.display()))?;
    log.info_kv("📝 readme updated", [("path", path.display().to_string())]);
    Ok(())
}
