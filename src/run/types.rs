use serde::Serialize;

/// One article from a feed. `link` is the entry's stable identity across
/// runs; it is deliberately never used to deduplicate on merge, so an
/// article that keeps appearing upstream can appear twice in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub title: String,
    pub article: String,
    pub link: String,
    pub summary: Option<String>,
}

// Plan envelope types
#[derive(Serialize)]
pub struct SourcePlan {
    pub name: String,
    pub urls: Vec<String>,
    pub filtered: bool,
    pub max_items: usize,
}

#[derive(Serialize)]
pub struct RunPlan {
    pub sources: usize,
    pub base: String,
    pub sample_sources: Vec<SourcePlan>,
}

// Apply/result envelope types
#[derive(Serialize, Debug)]
pub struct SourceReport {
    pub name: String,
    pub accepted: usize,
    pub persisted: usize,
    pub skipped_urls: usize,
}

#[derive(Serialize)]
pub struct RunTotals {
    pub sources: usize,
    pub accepted: usize,
    pub invalid: usize,
}

#[derive(Serialize)]
pub struct RunApply {
    pub totals: RunTotals,
    pub per_source: Vec<SourceReport>,
}
