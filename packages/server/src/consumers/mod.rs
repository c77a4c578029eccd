pub mod push_result;
pub mod recompute;

pub use push_result::consume_push_results;
pub use recompute::consume_recompute_jobs;
