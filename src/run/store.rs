use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rss::{Channel, Item};
use tracing::debug;

use crate::run::types::Entry;

/// Read the prior run's persisted artifact for a source. Absent and
/// malformed both mean an empty history — the distinction only matters for
/// diagnostics, so it is logged and swallowed here.
pub fn load_previous(base: &Path, name: &str) -> Vec<Entry> {
    let path = base.join(format!("{name}.xml"));
    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(err) => {
            debug!("no previous artifact at {}: {err}", path.display());
            return Vec::new();
        }
    };
    match Channel::read_from(&bytes[..]) {
        Ok(channel) => channel.items().iter().filter_map(entry_from_item).collect(),
        Err(err) => {
            debug!("previous artifact {} unparseable, starting empty: {err}", path.display());
            Vec::new()
        }
    }
}

fn entry_from_item(item: &Item) -> Option<Entry> {
    let link = item.link()?.to_string();
    let title = item.title().unwrap_or("Untitled").to_string();
    let article = item
        .description()
        .map(str::to_string)
        .unwrap_or_else(|| title.clone());
    Some(Entry {
        title,
        article,
        link,
        summary: None,
    })
}

/// Keep the first `max` entries, preserving order.
pub fn truncate(mut entries: Vec<Entry>, max: usize) -> Vec<Entry> {
    entries.truncate(max);
    entries
}

/// Newly accepted entries go first, then the previously persisted tail,
/// bounded to `max`. No deduplication by link happens here.
pub fn merge(new: Vec<Entry>, previous: Vec<Entry>, max: usize) -> Vec<Entry> {
    let mut merged = new;
    merged.extend(previous);
    truncate(merged, max)
}

/// Serialize the merged entry set as the source's RSS artifact. Fresh
/// entries persist their summary as the item description; carried-over
/// entries persist their stored body unchanged. `load_previous` must be able
/// to read exactly what this writes.
pub fn persist(base: &Path, name: &str, channel_link: &str, entries: &[Entry]) -> Result<()> {
    let items: Vec<Item> = entries
        .iter()
        .map(|e| {
            let mut item = Item::default();
            item.set_title(e.title.clone());
            item.set_link(e.link.clone());
            item.set_description(e.summary.clone().unwrap_or_else(|| e.article.clone()));
            item
        })
        .collect();

    let mut channel = Channel::default();
    channel.set_title(name.to_string());
    channel.set_link(channel_link.to_string());
    channel.set_description(format!("Summarized feed for {name}"));
    channel.set_items(items);

    let path = base.join(format!("{name}.xml"));
    fs::write(&path, channel.to_string())
        .with_context(|| format!("writing feed artifact {}", path.display()))
}

/// Flat `Summary: ...\nLink: ...\n\n` listing for the current run's accepted
/// entries only (not the merged historical set).
pub fn write_listing(base: &Path, name: &str, entries: &[Entry]) -> Result<()> {
    let dir = base.join(name);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating listing directory {}", dir.display()))?;

    let mut out = String::new();
    for e in entries {
        let summary = e.summary.as_deref().unwrap_or("No summary available");
        out.push_str(&format!("Summary: {summary}\nLink: {}\n\n", e.link));
    }

    let path = dir.join("summaries_and_links.txt");
    fs::write(&path, out).with_context(|| format!("writing listing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, link: &str, summary: Option<&str>) -> Entry {
        Entry {
            title: title.to_string(),
            article: format!("{title} body"),
            link: link.to_string(),
            summary: summary.map(str::to_string),
        }
    }

    fn titles(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn truncate_bounds_length_and_keeps_prefix_order() {
        let entries = vec![
            entry("a", "http://x/a", None),
            entry("b", "http://x/b", None),
            entry("c", "http://x/c", None),
        ];
        assert_eq!(titles(&truncate(entries.clone(), 2)), ["a", "b"]);
        assert_eq!(truncate(entries.clone(), 0).len(), 0);
        assert_eq!(truncate(entries.clone(), 10).len(), 3);
    }

    #[test]
    fn merge_puts_new_entries_before_previous_and_rebounds() {
        let previous = vec![entry("old1", "http://x/o1", None), entry("old2", "http://x/o2", None)];
        let new = vec![entry("new1", "http://x/n1", None), entry("new2", "http://x/n2", None)];

        let merged = merge(new.clone(), previous.clone(), 10);
        assert_eq!(titles(&merged), ["new1", "new2", "old1", "old2"]);

        // all of N if it fits, then as much of P as fits
        let merged = merge(new, previous, 3);
        assert_eq!(titles(&merged), ["new1", "new2", "old1"]);
    }

    #[test]
    fn merge_does_not_deduplicate_by_link() {
        let previous = vec![entry("seen", "http://x/same", None)];
        let new = vec![entry("seen", "http://x/same", Some("summary"))];
        let merged = merge(new, previous, 10);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].link, merged[1].link);
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            entry("fresh", "http://x/fresh", Some("kw1 kw2<br><br>Summary: the gist")),
            entry("old", "http://x/old", None),
        ];
        persist(dir.path(), "tech", "https://site.example/tech.xml", &entries).unwrap();

        let loaded = load_previous(dir.path(), "tech");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "fresh");
        assert_eq!(loaded[0].link, "http://x/fresh");
        // the summary became the stored body
        assert_eq!(loaded[0].article, "kw1 kw2<br><br>Summary: the gist");
        assert!(loaded[0].summary.is_none());
        assert_eq!(loaded[1].article, "old body");

        // a second persist of what was loaded reads back identically
        persist(dir.path(), "tech", "https://site.example/tech.xml", &loaded).unwrap();
        assert_eq!(load_previous(dir.path(), "tech"), loaded);
    }

    #[test]
    fn load_previous_treats_missing_and_corrupt_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_previous(dir.path(), "nothing").is_empty());

        fs::write(dir.path().join("broken.xml"), "not xml at all <<<").unwrap();
        assert!(load_previous(dir.path(), "broken").is_empty());
    }

    #[test]
    fn listing_writes_summary_and_link_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            entry("a", "http://x/a", Some("first summary")),
            entry("b", "http://x/b", None),
        ];
        write_listing(dir.path(), "tech", &entries).unwrap();

        let text = fs::read_to_string(dir.path().join("tech").join("summaries_and_links.txt")).unwrap();
        assert_eq!(
            text,
            "Summary: first summary\nLink: http://x/a\n\n\
             Summary: No summary available\nLink: http://x/b\n\n"
        );
    }
}
