use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Render;

#[derive(Copy, Clone, Debug)]
pub enum Phase { StatusPage, Readme }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::StatusPage => "status_page",
        Phase::Readme => "readme",
    }}
    fn span(&self) -> Span { match self {
        Phase::StatusPage => info_span!("status_page"),
        Phase::Readme => info_span!("readme"),
    }}
}

impl OpMarker for Render {
    const NAME: &'static str = "render";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("render") }
}
