#![forbid(unsafe_code)]

//! Headless console driven from stdin.
//!
//! Every input line is typed into the console and submitted with Enter; the
//! scrollback row it produced is printed as HTML. `.clear` empties the
//! scrollback, `.history` prints stored commands.
//!
//! # Running
//!
//! ```sh
//! echo 'answer * 2' | cargo run -p evalcon-demo
//! RUST_LOG=evalcon=debug cargo run -p evalcon-demo -- console.toml
//! ```

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use evalcon::{ConsoleConfig, ConsoleError, ExprEvaluator, Session, SessionRegistry, Value};
use evalcon_dom::{Document, DomEvent, KeyCode, KeyEvent, MemoryDocument, NodeId};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    // Respects RUST_LOG; logs go to stderr so stdout stays pure HTML.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn sample_scope() -> Value {
    Value::object([
        ("answer", Value::from(21)),
        ("name", Value::from("evalcon")),
        ("primes", Value::array([2, 3, 5, 7].map(Value::from))),
        (
            "nested",
            Value::object([
                ("depth", Value::from(1)),
                ("items", Value::array([Value::Null, Value::Undefined])),
            ]),
        ),
    ])
}

fn last_row(doc: &MemoryDocument, session: &Session) -> Option<NodeId> {
    let index = session.row_count(doc).checked_sub(1)?;
    doc.children(session.container()).get(index).copied()
}

fn run() -> Result<(), ConsoleError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ConsoleConfig::from_toml_file(path)?,
        None => ConsoleConfig::default(),
    };

    let mut doc = MemoryDocument::new();
    let mount = doc.create_element("div");
    doc.set_attribute(mount, "id", "console");
    let body = doc.body();
    doc.append_child(body, mount);

    let mut registry = SessionRegistry::new(ExprEvaluator::new())
        .with_config(config)
        .with_global_scope(sample_scope());
    let input = registry.acquire(&mut doc, "console", None)?.input();
    let enter = DomEvent::Key(KeyEvent::new(KeyCode::Enter));

    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().lines() {
        let line = line?;
        match line.trim() {
            ".clear" => {
                if let Some(session) = registry.get_mut(mount) {
                    session.clear(&mut doc);
                }
            }
            ".history" => {
                if let Some(session) = registry.get(mount) {
                    for (index, entry) in session.history().entries().enumerate() {
                        writeln!(stdout, "{index:>4}  {entry}")?;
                    }
                }
            }
            _ => {
                doc.set_value(input, &line);
                if !registry.dispatch(&mut doc, input, &enter).is_consumed() {
                    tracing::warn!("enter was not handled");
                }
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(row) = registry.get(mount).and_then(|s| last_row(&doc, s)) {
                    writeln!(stdout, "{}", doc.outer_html(row))?;
                }
            }
        }
    }

    registry.destroy_all(&mut doc);
    tracing::debug!(html = %doc.outer_html(mount), "console restored");
    Ok(())
}
