//! End-to-end console lifecycle against the in-memory document.
//!
//! Covers mounting through the registry, command execution, logging,
//! keyboard dispatch, and restoring the mount element on destroy.

use evalcon::{
    ConsoleConfig, ErrorValue, EventOutcome, ExprEvaluator, LogLevel, SessionRegistry, Value,
};
use evalcon_dom::{
    Document, DomEvent, KeyCode, KeyEvent, KeyEventKind, MemoryDocument, Modifiers, NodeId,
};
use pretty_assertions::assert_eq;

struct Fixture {
    doc: MemoryDocument,
    mount: NodeId,
    registry: SessionRegistry,
}

impl Fixture {
    /// `<section id="host" class="panel">` holding one paragraph.
    fn new() -> Self {
        let mut doc = MemoryDocument::new();
        let mount = doc.create_element("section");
        doc.set_attribute(mount, "id", "host");
        doc.set_attribute(mount, "class", "panel");
        let paragraph = doc.create_element("p");
        doc.append_text(paragraph, "original content");
        doc.append_child(mount, paragraph);
        let body = doc.body();
        doc.append_child(body, mount);
        Self {
            doc,
            mount,
            registry: SessionRegistry::new(ExprEvaluator::new()),
        }
    }

    fn input(&mut self) -> NodeId {
        self.registry
            .acquire(&mut self.doc, self.mount, None)
            .expect("mount resolves")
            .input()
    }

    fn rows(&self) -> usize {
        self.registry
            .get(self.mount)
            .map_or(0, |session| session.row_count(&self.doc))
    }

    fn press(&mut self, target: NodeId, key: KeyEvent) -> EventOutcome {
        self.registry
            .dispatch(&mut self.doc, target, &DomEvent::Key(key))
    }
}

const PRISTINE: &str = "<section id=\"host\" class=\"panel\"><p>original content</p></section>";

#[test]
fn blank_commands_change_nothing() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", Some(Value::Object(Default::default())))
        .expect("mount resolves");
    assert!(session.execute(&mut fx.doc, "").is_none());
    assert!(session.execute(&mut fx.doc, "   ").is_none());
    assert!(session.history().is_empty());
    assert_eq!(fx.rows(), 0);
}

#[test]
fn successful_command_logs_info() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    let run = session.execute(&mut fx.doc, "1+1").expect("not blank");
    assert_eq!(run.level, LogLevel::Info);
    assert_eq!(session.history().entries().collect::<Vec<_>>(), ["1+1"]);
    assert_eq!(
        fx.doc.outer_html(run.row),
        "<p class=\"number info\"><div class=\"command\">1+1</div>\
         <div class=\"result\"><span class=\"number\">2</span></div></p>"
    );
    assert_eq!(fx.rows(), 1);
}

#[test]
fn failing_command_logs_error_and_is_still_recorded() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    let run = session.execute(&mut fx.doc, "undefinedVar.x").expect("not blank");
    assert_eq!(run.level, LogLevel::Error);
    assert!(matches!(&run.value, Value::Error(e) if e.name() == "ReferenceError"));
    assert_eq!(
        fx.doc.outer_html(run.row),
        "<p class=\"error\"><div class=\"command\">undefinedVar.x</div>\
         <div class=\"result\"><span class=\"error\">ReferenceError: undefinedVar is not defined</span></div></p>"
    );
    assert_eq!(session.history().len(), 1);
}

#[test]
fn warn_and_error_rows_carry_their_level() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    let warn = session.warn(&mut fx.doc, &[Value::from(3)]);
    let error = session.error(&mut fx.doc, &[Value::from(ErrorValue::plain("bad"))]);
    assert!(fx.doc.has_class(warn, "warn"));
    assert!(fx.doc.has_class(warn, "number"));
    assert!(fx.doc.has_class(error, "error"));
    assert_eq!(fx.doc.text_content(error), "Error: bad");
}

#[test]
fn structured_values_expand_one_level() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    let inner = Value::object([("deep", Value::from(true))]);
    let value = Value::object([
        ("a", Value::from(1)),
        ("b", Value::array([Value::from(1), Value::from(2)])),
        ("c", inner),
    ]);
    let row = session.info(&mut fx.doc, &[value]);
    assert_eq!(
        fx.doc.outer_html(row),
        "<p class=\"object info\"><div class=\"result\"><dl class=\"object\">\
         <dt>a</dt><dd><span class=\"number\">1</span></dd>\
         <dt>b</dt><dd><ol class=\"array\"><li><span class=\"number\">1</span></li>\
         <li><span class=\"number\">2</span></li></ol></dd>\
         <dt>c</dt><dd><dl class=\"object\"><dt>deep</dt><dd>deep</dd></dl></dd>\
         </dl></div></p>"
    );
}

#[test]
fn acquire_twice_mounts_once() {
    let mut fx = Fixture::new();
    let first = fx.input();
    let second = fx.input();
    assert_eq!(first, second);
    assert_eq!(fx.registry.len(), 1);
    assert_eq!(fx.doc.children(fx.mount).len(), 1);
    assert_eq!(fx.doc.listener_count(), 3);
}

#[test]
fn destroy_then_acquire_starts_fresh() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    session.execute(&mut fx.doc, "41 + 1");
    let old_container = session.container();

    assert!(fx.registry.destroy(&mut fx.doc, "host").expect("resolves"));
    assert_eq!(fx.doc.outer_html(fx.mount), PRISTINE);
    assert_eq!(fx.doc.listener_count(), 0);

    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    assert!(session.history().is_empty());
    assert_ne!(session.container(), old_container);
    assert_eq!(fx.rows(), 0);
    assert_eq!(
        fx.doc.attribute(fx.mount, "class").as_deref(),
        Some("panel console")
    );

    fx.registry.destroy_all(&mut fx.doc);
    assert_eq!(fx.doc.outer_html(fx.mount), PRISTINE);
}

#[test]
fn keyboard_round_trip() {
    let mut fx = Fixture::new();
    let input = fx.input();

    for command in ["1", "2", "2", "3"] {
        fx.doc.set_value(input, command);
        let outcome = fx.press(input, KeyEvent::new(KeyCode::Enter));
        assert_eq!(outcome, EventOutcome::Consumed);
        assert_eq!(fx.doc.value(input), "");
    }
    assert_eq!(fx.rows(), 4);

    let mut seen = Vec::new();
    for _ in 0..4 {
        fx.press(input, KeyEvent::new(KeyCode::Up));
        seen.push(fx.doc.value(input));
    }
    assert_eq!(seen, ["3", "2", "1", "1"]);

    let mut seen = Vec::new();
    for _ in 0..3 {
        fx.press(input, KeyEvent::new(KeyCode::Down));
        seen.push(fx.doc.value(input));
    }
    assert_eq!(seen, ["2", "3", ""]);
}

#[test]
fn shift_enter_inserts_instead_of_submitting() {
    let mut fx = Fixture::new();
    let input = fx.input();
    fx.doc.set_value(input, "1 +");
    let outcome = fx.press(
        input,
        KeyEvent::new(KeyCode::Enter).with_modifiers(Modifiers::SHIFT),
    );
    assert_eq!(outcome, EventOutcome::Ignored);
    let outcome = fx.press(
        input,
        KeyEvent::new(KeyCode::Enter).with_kind(KeyEventKind::Release),
    );
    assert_eq!(outcome, EventOutcome::Ignored);
    assert_eq!(fx.doc.value(input), "1 +");
    assert_eq!(fx.rows(), 0);
}

#[test]
fn blur_resets_cursor_and_focus_moves_to_input() {
    let mut fx = Fixture::new();
    let input = fx.input();
    fx.doc.set_value(input, "7");
    fx.press(input, KeyEvent::new(KeyCode::Enter));
    fx.press(input, KeyEvent::new(KeyCode::Up));

    let mount = fx.mount;
    assert_eq!(
        fx.registry.dispatch(&mut fx.doc, input, &DomEvent::Blur),
        EventOutcome::Consumed
    );
    assert_eq!(
        fx.registry
            .get(mount)
            .map(|session| session.history().cursor()),
        Some(1)
    );

    assert_eq!(
        fx.registry.dispatch(&mut fx.doc, mount, &DomEvent::Focus),
        EventOutcome::Consumed
    );
    assert_eq!(fx.doc.focused(), Some(input));
}

#[test]
fn clear_leaves_history() {
    let mut fx = Fixture::new();
    let session = fx
        .registry
        .acquire(&mut fx.doc, "host", None)
        .expect("mount resolves");
    session.execute(&mut fx.doc, "1");
    session.execute(&mut fx.doc, "2");
    session.clear(&mut fx.doc);
    assert_eq!(session.history().len(), 2);
    assert_eq!(fx.rows(), 0);
}

#[test]
fn configured_class_names_shape_the_dom() {
    let mut fx = Fixture::new();
    let mut config = ConsoleConfig::default();
    config.class_names.console = "repl".to_owned();
    config.class_names.result = "out".to_owned();
    config.input_rows = 3;
    let mut registry = SessionRegistry::new(ExprEvaluator::new()).with_config(config);

    let session = registry
        .acquire(&mut fx.doc, fx.mount, None)
        .expect("mount resolves");
    let row = session.info(&mut fx.doc, &[Value::Null]);
    let input = session.input();
    assert_eq!(
        fx.doc.attribute(fx.mount, "class").as_deref(),
        Some("panel repl")
    );
    assert_eq!(fx.doc.attribute(input, "rows").as_deref(), Some("3"));
    assert_eq!(
        fx.doc.outer_html(row),
        "<p class=\"null info\"><div class=\"out\"><span class=\"null\">null</span></div></p>"
    );
}
