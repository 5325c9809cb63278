use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::run::types::Entry;

/// Which entry field the rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    Title,
    Article,
    Link,
}

impl FilterTarget {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "title" => Ok(Self::Title),
            "article" => Ok(Self::Article),
            "link" => Ok(Self::Link),
            other => bail!("filter_apply not supported: {other}"),
        }
    }
}

/// `include`/`exclude` are aliases over the same regex search as the
/// explicit `regex match`/`regex not match` operators. An include rule
/// containing regex metacharacters therefore behaves as a pattern, not a
/// literal keyword — kept as documented behavior of the config surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Include,
    Exclude,
    RegexMatch,
    RegexNotMatch,
}

impl FilterKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            "regex match" => Ok(Self::RegexMatch),
            "regex not match" => Ok(Self::RegexNotMatch),
            other => bail!("filter_type not supported: {other}"),
        }
    }
}

/// A compiled per-source filter. Built once during source validation so an
/// invalid target, type or rule surfaces before any entry is evaluated.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    target: FilterTarget,
    kind: FilterKind,
    rule: Regex,
}

impl EntryFilter {
    pub fn from_config(apply: &str, kind: &str, rule: &str) -> Result<Self> {
        let target = FilterTarget::parse(apply)?;
        let kind = FilterKind::parse(kind)?;
        let rule = Regex::new(rule).with_context(|| format!("invalid filter_rule: {rule}"))?;
        Ok(Self { target, kind, rule })
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        let text = match self.target {
            FilterTarget::Title => &entry.title,
            FilterTarget::Article => &entry.article,
            FilterTarget::Link => &entry.link,
        };
        let hit = self.rule.is_match(text);
        match self.kind {
            FilterKind::Include | FilterKind::RegexMatch => hit,
            FilterKind::Exclude | FilterKind::RegexNotMatch => !hit,
        }
    }
}
