//! Shared test utilities for `afterhook_dispatch` integration tests.
//!
//! Provides a hooked `Calculator::add` operation, a `Journal` handler type
//! that records which members ran, and a server builder. Import via
//! `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::sync::Arc;
use std::time::Duration;

use afterhook_core_plugins::TimePlugin;
use afterhook_dispatch::api::HooksAPI;
use afterhook_dispatch::error::BoxError;
use afterhook_dispatch::handler::HandlerType;
use afterhook_dispatch::metadata::{HandlerRef, HookBinding, OperationHooks};
use afterhook_dispatch::plugin::HooksPlugin;
use afterhook_dispatch::record::{ExecutionRecord, Invocation, OperationId};
use afterhook_system::server::Server;
use futures::FutureExt;
use parking_lot::Mutex;

// ═══════════════════════════════════════════════════════════════════════════════
// HOOKED OPERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Owner of the hooked `add` operation.
pub struct Calculator;

impl Calculator {
    pub fn add(a: i64, b: i64) -> i64 {
        a + b
    }
}

pub fn add_op() -> OperationId {
    OperationId::of::<Calculator>("add")
}

pub fn add_call(a: i64, b: i64) -> Invocation {
    Invocation::new(add_op()).arg(a).arg(b)
}

/// Declaration of `add(a, b)` with no bindings yet.
pub fn add_hooks() -> OperationHooks {
    OperationHooks::new(add_op()).parameters(["a", "b"])
}

// ═══════════════════════════════════════════════════════════════════════════════
// JOURNAL HANDLER
// ═══════════════════════════════════════════════════════════════════════════════

/// Bag key holding the append-only list of members that ran.
pub const SEQUENCE: &str = "sequence";

/// Handler type whose members record that they ran.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

/// Appends `label` to the journal and to the record's bag sequence.
fn note(journal: &Journal, record: &ExecutionRecord, label: &str) {
    journal.push(label);
    record.update_item::<Vec<String>, _>(SEQUENCE, |seq| seq.push(label.to_string()));
}

/// Adds one member per name; each notes its own name and succeeds.
pub fn recording(handler: HandlerType<Journal>, names: &[&str]) -> HandlerType<Journal> {
    names.iter().fold(handler, |handler, name| {
        let label: Arc<str> = Arc::from(*name);
        handler.method(*name, [], move |journal, call| {
            note(&journal, call.record(), &label);
            futures::future::ready(Ok(())).boxed()
        })
    })
}

/// Adds a member that notes its name, then fails with `message`.
pub fn failing(handler: HandlerType<Journal>, name: &str, message: &'static str) -> HandlerType<Journal> {
    let label: Arc<str> = Arc::from(name);
    handler.method(name, [], move |journal, call| {
        note(&journal, call.record(), &label);
        let error: BoxError = message.into();
        futures::future::ready(Err(error)).boxed()
    })
}

/// Adds a member that panics before doing anything.
pub fn panicking(handler: HandlerType<Journal>, name: &str) -> HandlerType<Journal> {
    handler.method(name, [], |_journal, _call| panic!("handler exploded"))
}

/// Adds an async member that sleeps for `delay` and then notes its name.
pub fn sleeping(handler: HandlerType<Journal>, name: &str, delay: Duration) -> HandlerType<Journal> {
    let label: Arc<str> = Arc::from(name);
    handler.method(name, [], move |journal, call| {
        let label = Arc::clone(&label);
        async move {
            tokio::time::sleep(delay).await;
            note(&journal, call.record(), &label);
            Ok(())
        }
        .boxed()
    })
}

/// Adds a member that blocks the thread for `delay`, notes its name and
/// returns an already completed future.
pub fn blocking(handler: HandlerType<Journal>, name: &str, delay: Duration) -> HandlerType<Journal> {
    let label: Arc<str> = Arc::from(name);
    handler.method(name, [], move |journal, call| {
        std::thread::sleep(delay);
        note(&journal, call.record(), &label);
        futures::future::ready(Ok(())).boxed()
    })
}

/// Binding to a `Journal` member with default flags.
pub fn binding(member: &str) -> HookBinding {
    HookBinding::new(HandlerRef::of::<Journal>(member))
}

/// Reads the bag sequence written by journal members.
pub fn sequence(record: &ExecutionRecord) -> Vec<String> {
    record
        .item::<Vec<String>>(SEQUENCE)
        .map(|seq| (*seq).clone())
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEST SERVER SETUP
// ═══════════════════════════════════════════════════════════════════════════════

/// Creates a finished server with the given hooks plugin and a registered
/// `Journal` service.
pub fn create_test_server(plugin: HooksPlugin) -> Server {
    let mut server = Server::new();
    server.add_plugins(TimePlugin::default()).add_plugins(plugin);
    server.insert_service(Journal::default());
    server.finish();
    server
}

/// Returns the `HooksAPI` from a server.
pub fn get_hooks(server: &Server) -> &HooksAPI {
    server
        .api::<HooksAPI>()
        .expect("HooksPlugin inserts the HooksAPI")
}

/// Returns the journal service from a server.
pub fn get_journal(server: &Server) -> Arc<Journal> {
    server
        .get_service::<Journal>()
        .expect("journal service registered")
}
