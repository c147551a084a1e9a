#![forbid(unsafe_code)]

//! A console mounted on one element.
//!
//! ```text
//! <div class="console" tabindex="0">          mount element
//!   <div class="console-container">           scrollback
//!     <p class="number info">                 one row per log or execute
//!       <div class="command">1+1</div>
//!       <div class="result"><span class="number">2</span></div>
//!     </p>
//!     <p class="console-input"><textarea rows="1"></textarea></p>
//!   </div>
//! </div>
//! ```
//!
//! The mount element's previous children are parked in a detached holding
//! element while the session lives, and [`Session::teardown`] puts them back
//! together with the original `class` and `tabindex` attributes.
//!
//! # Keyboard
//!
//! | event                   | effect                                      |
//! |-------------------------|---------------------------------------------|
//! | `Enter` (no shift)      | execute the input, then empty it            |
//! | `Up`                    | show the previous history entry             |
//! | `Down`                  | show the next entry, or empty at the end    |
//! | blur on the input       | reset the history cursor                    |
//! | focus on the mount      | focus the input                             |

use std::fmt;
use std::rc::Rc;

use evalcon_dom::{Document, DomEvent, EventKind, KeyCode, KeyEvent, ListenerId, NodeId};

use crate::classify::classify;
use crate::config::{ClassNames, ConsoleConfig, RenderConfig};
use crate::eval::Evaluator;
use crate::history::History;
use crate::render::render_with;
use crate::value::Value;

/// Severity of a scrollback row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Class name attached to rows of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an event was acted on.
///
/// Hosts should suppress the event's default action for `Consumed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Consumed,
    Ignored,
}

impl EventOutcome {
    #[must_use]
    pub const fn is_consumed(self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// Result of one executed command.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Scrollback row that was appended.
    pub row: NodeId,
    /// `Info` on success, `Error` when the evaluator raised.
    pub level: LogLevel,
    /// Evaluated or raised value.
    pub value: Value,
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    id: ListenerId,
    node: NodeId,
    kind: EventKind,
}

/// Mount attributes as they were before mounting. `None` means absent.
#[derive(Debug, Clone, Default)]
struct SavedAttributes {
    class: Option<String>,
    tabindex: Option<String>,
}

/// One console bound to one mount element.
///
/// Sessions are created and destroyed through
/// [`SessionRegistry`](crate::SessionRegistry); every DOM-touching method
/// takes the document the session was mounted in.
pub struct Session {
    mount: NodeId,
    holding: NodeId,
    container: NodeId,
    input_row: NodeId,
    input: NodeId,
    saved: SavedAttributes,
    listeners: Vec<Listener>,
    history: History,
    scope: Value,
    evaluator: Rc<dyn Evaluator>,
    class_names: ClassNames,
    render: RenderConfig,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mount", &self.mount)
            .field("container", &self.container)
            .field("input", &self.input)
            .field("history_len", &self.history.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Take over `mount`: park its children, build the console subtree and
    /// register listeners.
    pub(crate) fn mount<D: Document + ?Sized>(
        doc: &mut D,
        mount: NodeId,
        scope: Value,
        evaluator: Rc<dyn Evaluator>,
        config: &ConsoleConfig,
    ) -> Self {
        let class_names = config.class_names.clone();
        let saved = SavedAttributes {
            class: doc.attribute(mount, "class"),
            tabindex: doc.attribute(mount, "tabindex"),
        };

        let holding = doc.create_element("div");
        for child in doc.children(mount) {
            doc.append_child(holding, child);
        }

        let container = doc.create_element_with_class("div", &class_names.container);
        let input_row = doc.create_element_with_class("p", &class_names.input_row);
        let input = doc.create_element("textarea");
        doc.set_attribute(input, "rows", &config.input_rows.to_string());
        doc.append_child(input_row, input);
        doc.append_child(container, input_row);
        doc.add_class(mount, &class_names.console);
        doc.append_child(mount, container);

        let focusable = saved
            .tabindex
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .is_some_and(|index| index >= 0);
        if !focusable {
            doc.set_attribute(mount, "tabindex", "0");
        }

        let listeners = [
            (input, EventKind::KeyDown),
            (input, EventKind::Blur),
            (mount, EventKind::Focus),
        ]
        .into_iter()
        .map(|(node, kind)| Listener {
            id: doc.listen(node, kind),
            node,
            kind,
        })
        .collect();

        tracing::debug!(%mount, "console mounted");
        Self {
            mount,
            holding,
            container,
            input_row,
            input,
            saved,
            listeners,
            history: History::new(config.history),
            scope,
            evaluator,
            class_names,
            render: config.render,
        }
    }

    /// Replace the evaluation scope. Existing scrollback is untouched.
    pub fn change_scope(&mut self, scope: Value) {
        tracing::debug!(mount = %self.mount, "scope changed");
        self.scope = scope;
    }

    /// Append a row rendering `values` above the input.
    ///
    /// A single value is rendered as is; any other count is rendered as one
    /// ordered group.
    pub fn log<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        level: LogLevel,
        values: &[Value],
    ) -> NodeId {
        let value = match values {
            [single] => single.clone(),
            _ => Value::array(values.iter().cloned()),
        };
        self.append_row(doc, level, &value)
    }

    pub fn info<D: Document + ?Sized>(&mut self, doc: &mut D, values: &[Value]) -> NodeId {
        self.log(doc, LogLevel::Info, values)
    }

    pub fn warn<D: Document + ?Sized>(&mut self, doc: &mut D, values: &[Value]) -> NodeId {
        self.log(doc, LogLevel::Warn, values)
    }

    pub fn error<D: Document + ?Sized>(&mut self, doc: &mut D, values: &[Value]) -> NodeId {
        self.log(doc, LogLevel::Error, values)
    }

    fn append_row<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        level: LogLevel,
        value: &Value,
    ) -> NodeId {
        let row = doc.create_element_with_class("p", classify(value).class_name());
        doc.add_class(row, level.as_str());
        let result = doc.create_element_with_class("div", &self.class_names.result);
        let rendered = render_with(doc, value, true, &self.render);
        doc.append_child(result, rendered);
        doc.append_child(row, result);
        doc.insert_before(self.container, row, Some(self.input_row));
        doc.scroll_to_bottom(row);
        doc.scroll_to_bottom(self.container);
        row
    }

    /// Evaluate `command` against the current scope and log the outcome.
    ///
    /// Returns `None` without touching scrollback or history when the
    /// command is blank. Evaluation failures are logged at `Error` level and
    /// never returned as errors.
    pub fn execute<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        command: &str,
    ) -> Option<Execution> {
        if command.trim().is_empty() {
            return None;
        }
        let span = tracing::debug_span!(
            "console.execute",
            command_len = command.len(),
            level = tracing::field::Empty
        );
        let _guard = span.enter();

        let (level, value) = match self.evaluator.evaluate(command, &self.scope) {
            Ok(value) => (LogLevel::Info, value),
            Err(raised) => (LogLevel::Error, raised),
        };
        span.record("level", level.as_str());

        let row = self.append_row(doc, level, &value);
        let label = doc.create_element_with_class("div", &self.class_names.command);
        doc.append_text(label, command);
        let first = doc.first_child(row);
        doc.insert_before(row, label, first);
        self.history.push(command);

        Some(Execution { row, level, value })
    }

    /// Remove every scrollback row. History is kept.
    pub fn clear<D: Document + ?Sized>(&mut self, doc: &mut D) {
        let rows: Vec<NodeId> = doc
            .children(self.container)
            .into_iter()
            .take_while(|&child| child != self.input_row)
            .collect();
        tracing::debug!(mount = %self.mount, rows = rows.len(), "scrollback cleared");
        for row in rows {
            doc.remove_child(self.container, row);
        }
    }

    /// Number of scrollback rows.
    #[must_use]
    pub fn row_count<D: Document + ?Sized>(&self, doc: &D) -> usize {
        doc.children(self.container)
            .into_iter()
            .take_while(|&child| child != self.input_row)
            .count()
    }

    /// Whether one of this session's listeners covers `(target, kind)`.
    #[must_use]
    pub fn listens_to(&self, target: NodeId, kind: EventKind) -> bool {
        self.listeners
            .iter()
            .any(|listener| listener.node == target && listener.kind == kind)
    }

    /// React to an event the host observed on `target`.
    pub fn handle_event<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        target: NodeId,
        event: &DomEvent,
    ) -> EventOutcome {
        if !self.listens_to(target, event.kind()) {
            return EventOutcome::Ignored;
        }
        match event {
            DomEvent::Key(key) => self.handle_key(doc, key),
            DomEvent::Blur => {
                self.history.reset();
                EventOutcome::Consumed
            }
            DomEvent::Focus => {
                doc.focus(self.input);
                EventOutcome::Consumed
            }
        }
    }

    fn handle_key<D: Document + ?Sized>(&mut self, doc: &mut D, key: &KeyEvent) -> EventOutcome {
        if !key.is_actionable() {
            return EventOutcome::Ignored;
        }
        match key.code {
            KeyCode::Enter if !key.shift() => {
                let command = doc.value(self.input);
                self.execute(doc, &command);
                doc.set_value(self.input, "");
            }
            KeyCode::Up => {
                if let Some(entry) = self.history.previous()
                    && !entry.is_empty()
                {
                    doc.set_value(self.input, entry);
                }
            }
            KeyCode::Down => {
                let entry = self.history.next().unwrap_or_default();
                doc.set_value(self.input, entry);
            }
            _ => return EventOutcome::Ignored,
        }
        EventOutcome::Consumed
    }

    /// Undo the mount: restore attributes and children, drop listeners.
    pub(crate) fn teardown<D: Document + ?Sized>(self, doc: &mut D) {
        for (name, saved) in [
            ("class", &self.saved.class),
            ("tabindex", &self.saved.tabindex),
        ] {
            match saved {
                Some(value) => doc.set_attribute(self.mount, name, value),
                None => doc.remove_attribute(self.mount, name),
            }
        }
        for child in doc.children(self.mount) {
            doc.remove_child(self.mount, child);
        }
        for child in doc.children(self.holding) {
            doc.append_child(self.mount, child);
        }
        for listener in &self.listeners {
            doc.unlisten(listener.id);
        }
        tracing::debug!(mount = %self.mount, "console destroyed");
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    #[must_use]
    pub fn scope(&self) -> &Value {
        &self.scope
    }

    #[must_use]
    pub const fn mount_node(&self) -> NodeId {
        self.mount
    }

    /// The input textarea.
    #[must_use]
    pub const fn input(&self) -> NodeId {
        self.input
    }

    /// The scrollback container.
    #[must_use]
    pub const fn container(&self) -> NodeId {
        self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ExprEvaluator;
    use evalcon_dom::{KeyEventKind, MemoryDocument, Modifiers};
    use pretty_assertions::assert_eq;

    fn mounted() -> (MemoryDocument, Session) {
        let mut doc = MemoryDocument::new();
        let mount = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, mount);
        let session = Session::mount(
            &mut doc,
            mount,
            Value::object([("x", Value::from(2))]),
            Rc::new(ExprEvaluator::new()),
            &ConsoleConfig::default(),
        );
        (doc, session)
    }

    fn key(code: KeyCode) -> DomEvent {
        DomEvent::Key(KeyEvent::new(code))
    }

    #[test]
    fn mount_builds_the_console_subtree() {
        let (doc, session) = mounted();
        assert_eq!(
            doc.outer_html(session.mount_node()),
            "<div class=\"console\" tabindex=\"0\"><div class=\"console-container\">\
             <p class=\"console-input\"><textarea rows=\"1\"></textarea></p></div></div>"
        );
        assert_eq!(doc.listener_count(), 3);
    }

    #[test]
    fn log_inserts_rows_before_the_input() {
        let (mut doc, mut session) = mounted();
        let row = session.warn(&mut doc, &[Value::from("careful")]);
        assert_eq!(
            doc.outer_html(row),
            "<p class=\"string warn\"><div class=\"result\">\
             <span class=\"string\">careful</span></div></p>"
        );
        let children = doc.children(session.container());
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], row);
        assert_eq!(doc.scroll_requests(row), 1);
        assert_eq!(doc.scroll_requests(session.container()), 1);
    }

    #[test]
    fn several_values_log_as_one_group() {
        let (mut doc, mut session) = mounted();
        let row = session.info(&mut doc, &[Value::from(1), Value::from("two")]);
        assert!(doc.has_class(row, "array"));
        assert_eq!(doc.text_content(row), "1two");

        let empty = session.info(&mut doc, &[]);
        assert!(doc.has_class(empty, "array"));
        assert_eq!(doc.text_content(empty), "");
    }

    #[test]
    fn execute_prepends_the_command_label() {
        let (mut doc, mut session) = mounted();
        let execution = session.execute(&mut doc, "x * 21").expect("not blank");
        assert_eq!(execution.level, LogLevel::Info);
        assert_eq!(execution.value.to_display_string(), "42");
        assert_eq!(
            doc.outer_html(execution.row),
            "<p class=\"number info\"><div class=\"command\">x * 21</div>\
             <div class=\"result\"><span class=\"number\">42</span></div></p>"
        );
        assert_eq!(session.history().entries().collect::<Vec<_>>(), ["x * 21"]);
    }

    #[test]
    fn raised_errors_are_logged_at_error_level() {
        let (mut doc, mut session) = mounted();
        let execution = session.execute(&mut doc, "nope").expect("not blank");
        assert_eq!(execution.level, LogLevel::Error);
        assert!(doc.has_class(execution.row, "error"));
        assert!(
            doc.text_content(execution.row)
                .ends_with("ReferenceError: nope is not defined")
        );
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn blank_commands_do_nothing() {
        let (mut doc, mut session) = mounted();
        assert!(session.execute(&mut doc, "").is_none());
        assert!(session.execute(&mut doc, " \t ").is_none());
        assert_eq!(session.row_count(&doc), 0);
        assert!(session.history().is_empty());
    }

    #[test]
    fn change_scope_affects_later_commands_only() {
        let (mut doc, mut session) = mounted();
        let first = session.execute(&mut doc, "x").expect("not blank");
        session.change_scope(Value::object([("x", Value::from("new"))]));
        let second = session.execute(&mut doc, "x").expect("not blank");
        assert_eq!(doc.text_content(first.row), "x2");
        assert_eq!(doc.text_content(second.row), "xnew");
    }

    #[test]
    fn clear_keeps_input_and_history() {
        let (mut doc, mut session) = mounted();
        session.execute(&mut doc, "1");
        session.info(&mut doc, &[Value::Null]);
        assert_eq!(session.row_count(&doc), 2);
        session.clear(&mut doc);
        assert_eq!(session.row_count(&doc), 0);
        assert_eq!(doc.children(session.container()).len(), 1);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn enter_executes_and_empties_the_input() {
        let (mut doc, mut session) = mounted();
        let input = session.input();
        doc.set_value(input, "x + 1");
        let outcome = session.handle_event(&mut doc, input, &key(KeyCode::Enter));
        assert_eq!(outcome, EventOutcome::Consumed);
        assert_eq!(doc.value(input), "");
        assert_eq!(session.row_count(&doc), 1);
    }

    #[test]
    fn shift_enter_and_releases_are_ignored() {
        let (mut doc, mut session) = mounted();
        let input = session.input();
        doc.set_value(input, "1");
        let shifted = DomEvent::Key(KeyEvent::new(KeyCode::Enter).with_modifiers(Modifiers::SHIFT));
        let released = DomEvent::Key(KeyEvent::new(KeyCode::Enter).with_kind(KeyEventKind::Release));
        assert_eq!(
            session.handle_event(&mut doc, input, &shifted),
            EventOutcome::Ignored
        );
        assert_eq!(
            session.handle_event(&mut doc, input, &released),
            EventOutcome::Ignored
        );
        assert_eq!(
            session.handle_event(&mut doc, input, &key(KeyCode::Char('a'))),
            EventOutcome::Ignored
        );
        assert_eq!(doc.value(input), "1");
        assert_eq!(session.row_count(&doc), 0);
    }

    #[test]
    fn arrows_walk_history_into_the_input() {
        let (mut doc, mut session) = mounted();
        let input = session.input();
        for command in ["1", "2"] {
            session.execute(&mut doc, command);
        }
        session.handle_event(&mut doc, input, &key(KeyCode::Up));
        assert_eq!(doc.value(input), "2");
        session.handle_event(&mut doc, input, &key(KeyCode::Up));
        session.handle_event(&mut doc, input, &key(KeyCode::Up));
        assert_eq!(doc.value(input), "1");
        session.handle_event(&mut doc, input, &key(KeyCode::Down));
        assert_eq!(doc.value(input), "2");
        session.handle_event(&mut doc, input, &key(KeyCode::Down));
        assert_eq!(doc.value(input), "");
    }

    #[test]
    fn up_on_empty_history_leaves_the_input_alone() {
        let (mut doc, mut session) = mounted();
        let input = session.input();
        doc.set_value(input, "draft");
        session.handle_event(&mut doc, input, &key(KeyCode::Up));
        assert_eq!(doc.value(input), "draft");
    }

    #[test]
    fn blur_resets_and_focus_delegates() {
        let (mut doc, mut session) = mounted();
        let input = session.input();
        session.execute(&mut doc, "1");
        session.history_mut().previous();
        assert_eq!(session.history().cursor(), 0);
        session.handle_event(&mut doc, input, &DomEvent::Blur);
        assert_eq!(session.history().cursor(), 1);

        let mount = session.mount_node();
        let outcome = session.handle_event(&mut doc, mount, &DomEvent::Focus);
        assert_eq!(outcome, EventOutcome::Consumed);
        assert_eq!(doc.focused(), Some(input));
    }

    #[test]
    fn events_on_unwatched_nodes_are_ignored() {
        let (mut doc, mut session) = mounted();
        let mount = session.mount_node();
        assert_eq!(
            session.handle_event(&mut doc, mount, &key(KeyCode::Enter)),
            EventOutcome::Ignored
        );
        assert_eq!(
            session.handle_event(&mut doc, session.input(), &DomEvent::Focus),
            EventOutcome::Ignored
        );
    }

    #[test]
    fn negative_tabindex_is_raised_and_restored() {
        let mut doc = MemoryDocument::new();
        let mount = doc.create_element("section");
        doc.set_attribute(mount, "tabindex", "-1");
        doc.set_attribute(mount, "class", "panel");
        doc.append_text(mount, "before");
        let session = Session::mount(
            &mut doc,
            mount,
            Value::Undefined,
            Rc::new(ExprEvaluator::new()),
            &ConsoleConfig::default(),
        );
        assert_eq!(doc.attribute(mount, "tabindex").as_deref(), Some("0"));
        assert_eq!(doc.attribute(mount, "class").as_deref(), Some("panel console"));
        assert_eq!(doc.text_content(mount), "");

        session.teardown(&mut doc);
        assert_eq!(
            doc.outer_html(mount),
            "<section tabindex=\"-1\" class=\"panel\">before</section>"
        );
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn existing_non_negative_tabindex_is_kept() {
        let mut doc = MemoryDocument::new();
        let mount = doc.create_element("div");
        doc.set_attribute(mount, "tabindex", "3");
        let session = Session::mount(
            &mut doc,
            mount,
            Value::Undefined,
            Rc::new(ExprEvaluator::new()),
            &ConsoleConfig::default(),
        );
        assert_eq!(doc.attribute(mount, "tabindex").as_deref(), Some("3"));
        session.teardown(&mut doc);
        assert_eq!(doc.attribute(mount, "tabindex").as_deref(), Some("3"));
        assert_eq!(doc.attribute(mount, "class"), None);
    }
}
