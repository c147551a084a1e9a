//! `console.execute` span instrumentation.

use std::sync::{Arc, Mutex};

use evalcon::{ExprEvaluator, SessionRegistry};
use evalcon_dom::{Document, MemoryDocument};
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Debug, Default)]
struct ExecuteTraceState {
    span_count: usize,
    command_lens: Vec<u64>,
    levels: Vec<String>,
}

struct ExecuteTraceCapture {
    state: Arc<Mutex<ExecuteTraceState>>,
}

#[derive(Default)]
struct ExecuteVisitor {
    command_len: Option<u64>,
    level: Option<String>,
}

impl tracing::field::Visit for ExecuteVisitor {
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "command_len" {
            self.command_len = Some(value);
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        if field.name() == "command_len" {
            self.command_len = u64::try_from(value).ok();
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "level" {
            self.level = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "level" {
            self.level = Some(format!("{value:?}").trim_matches('"').to_owned());
        }
    }
}

impl<S> Layer<S> for ExecuteTraceCapture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::Id,
        _ctx: Context<'_, S>,
    ) {
        if attrs.metadata().name() != "console.execute" {
            return;
        }
        let mut visitor = ExecuteVisitor::default();
        attrs.record(&mut visitor);
        let mut state = self.state.lock().expect("trace state lock");
        state.span_count += 1;
        if let Some(len) = visitor.command_len {
            state.command_lens.push(len);
        }
    }

    fn on_record(
        &self,
        id: &tracing::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if span.name() != "console.execute" {
            return;
        }
        let mut visitor = ExecuteVisitor::default();
        values.record(&mut visitor);
        if let Some(level) = visitor.level {
            self.state.lock().expect("trace state lock").levels.push(level);
        }
    }
}

#[test]
fn execute_span_records_length_and_level() {
    let state = Arc::new(Mutex::new(ExecuteTraceState::default()));
    let subscriber = tracing_subscriber::registry().with(ExecuteTraceCapture {
        state: Arc::clone(&state),
    });
    let _guard = tracing::subscriber::set_default(subscriber);
    tracing::callsite::rebuild_interest_cache();

    let mut doc = MemoryDocument::new();
    let mount = doc.create_element("div");
    let body = doc.body();
    doc.append_child(body, mount);
    let mut registry = SessionRegistry::new(ExprEvaluator::new());
    let session = registry.acquire(&mut doc, mount, None).expect("mounted");
    session.execute(&mut doc, "1 + 1");
    session.execute(&mut doc, "   ");
    session.execute(&mut doc, "nope");

    tracing::callsite::rebuild_interest_cache();
    let snapshot = state.lock().expect("trace state lock");
    assert_eq!(snapshot.span_count, 2, "blank input opens no span");
    assert_eq!(snapshot.command_lens, vec![5, 4]);
    assert_eq!(snapshot.levels, vec!["info", "error"]);
}
