pub mod event;
pub mod render;
pub mod reporter;

pub use event::{ProgressEvent, ProgressEventKind};
pub use render::{BarRenderer, render_summary_table};
pub use reporter::{
    DEFAULT_QUEUE_CAPACITY, EventSink, InstallSummary, ProgressReporter, ProgressSender,
};
