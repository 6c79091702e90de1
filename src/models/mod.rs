pub mod events;
pub mod observation;

pub use events::{Attributes, MessageEvent, SummaryEvent};
pub use observation::{NormalizedMessage, RequestParams, TraceContext, Usage};
