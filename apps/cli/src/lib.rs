pub mod config;
pub mod main_lib;

pub use main_lib::{
    build_store, collect_summaries, init_tracing, load_instruments, render_report,
    render_summaries, run, run_with_provider, RunOutcome,
};
