pub mod audio;
pub mod card;
pub mod config;
pub mod feed;
pub mod llm;
pub mod logging;
pub mod optimistic;
pub mod pipeline;
pub mod prompts;
pub mod store;
pub mod stt;
pub mod telemetry;

pub use logging::{log_debug, log_debug_content, log_panic};
pub use pipeline::{start_memo_job, MemoJob, MemoJobMessage};
