use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Run;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Validate, LoadPrevious, FetchFeed, Filter, Summarize, Persist }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Validate => "validate",
        Phase::LoadPrevious => "load_previous",
        Phase::FetchFeed => "fetch_feed",
        Phase::Filter => "filter",
        Phase::Summarize => "summarize",
        Phase::Persist => "persist",
    }}
    fn span(&self) -> Span { match self {
        Phase::Validate => info_span!("validate"),
        Phase::LoadPrevious => info_span!("load_previous"),
        Phase::FetchFeed => info_span!("fetch_feed"),
        Phase::Filter => info_span!("filter"),
        Phase::Summarize => info_span!("summarize"),
        Phase::Persist => info_span!("persist"),
    }}
}

impl OpMarker for Run {
    const NAME: &'static str = "run";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("run") }
}
