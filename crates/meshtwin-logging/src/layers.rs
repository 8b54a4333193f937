//! JSON lines formatting
//!
//! Every event becomes one JSON object with its fields flattened to the top
//! level, the current span under `span` and the whole span stack under
//! `spans`. Span fields such as a chaos run's `run_id` therefore appear on
//! every line emitted inside that span.

use tracing::Subscriber;
use tracing_subscriber::fmt::{
    self, MakeWriter,
    format::{Format, Json, JsonFields},
};
use tracing_subscriber::registry::LookupSpan;

/// JSONL formatting layer over any writer
pub fn jsonl_layer<S, W>(writer: W, include_location: bool) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .flatten_event(true)
        .with_file(include_location)
        .with_line_number(include_location)
        .with_writer(writer)
}
