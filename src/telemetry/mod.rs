pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// Factory helpers, one per op
pub fn run() -> LogCtx<ops::run::Run> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn render() -> LogCtx<ops::render::Render> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
