pub mod pipeline;
pub mod runner;

pub use pipeline::{Counts, Eligibility, Outcome, Pipeline, RunSummary, check_eligibility, is_eligible};
pub use runner::{run, run_once};
