use indicatif::ProgressStyle;
use pump_engine::{Progress, ProgressEvent, PumpReport};
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Progress bar attached to the run's tracing span.
pub struct SpanProgress {
    span: Span,
}

impl SpanProgress {
    pub fn new() -> Self {
        let span = info_span!("pump");
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            span.pb_set_style(&style.progress_chars("=> "));
        }
        span.pb_start();
        Self { span }
    }
}

impl Default for SpanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for SpanProgress {
    fn on_item(&self, event: &ProgressEvent<'_>) {
        if let Some(total) = event.total {
            self.span.pb_set_length(total);
        }
        self.span.pb_set_position(event.processed);
        self.span.pb_set_message(event.identifier.as_str());
    }

    fn finish(&self, report: &PumpReport) {
        self.span
            .pb_set_message(&format!("{} written, {} failed", report.written, report.failures()));
    }
}
