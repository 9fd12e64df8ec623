//! Execution records.
//!
//! An [`ExecutionRecord`] is the sealed snapshot of one finished invocation:
//! what was called, with which arguments, what came back (or what failed),
//! when it started and how long it took. Records are built in two steps so
//! that an unsealed record can never reach the dispatcher:
//!
//! ```text
//! Invocation ──start()──► PendingInvocation ──seal(outcome)──► ExecutionRecord
//! ```
//!
//! Apart from the shared bag, a record is immutable once sealed. The bag is a
//! per-dispatch scratch space that lets later hooks read what earlier hooks
//! wrote.

use core::any::Any;
use core::fmt;
use core::panic::Location;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use afterhook_core_plugins::{Clock, Stopwatch};
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identity of a hooked operation: declaring type plus member name.
///
/// Used as the key into the hook metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId {
    declaring_type: Arc<str>,
    member: Arc<str>,
}

impl OperationId {
    /// Creates an id from explicit names.
    #[must_use]
    pub fn new(declaring_type: impl Into<Arc<str>>, member: impl Into<Arc<str>>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            member: member.into(),
        }
    }

    /// Creates an id for a member of `T`, named by `T`'s type name.
    #[must_use]
    pub fn of<T: ?Sized>(member: impl Into<Arc<str>>) -> Self {
        Self::new(core::any::type_name::<T>(), member)
    }

    /// Returns the declaring type's name.
    #[must_use]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Returns the member name.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.member)
    }
}

/// Unique id of one invocation, generated with nanoid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationId(Arc<str>);

impl InvocationId {
    /// Creates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv_{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// How the intercepted operation delivered its result.
///
/// Heavy and lightweight futures are both reported as async; the difference
/// does not matter to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// Returned (or failed) synchronously.
    Sync,
    /// Completed asynchronously with no value.
    AsyncUnit,
    /// Completed asynchronously with a single value.
    AsyncValue,
}

impl ReturnShape {
    /// Returns true for both asynchronous shapes.
    #[must_use]
    pub fn is_async(self) -> bool {
        !matches!(self, Self::Sync)
    }
}

/// Snapshot of an operation's failure.
///
/// The original error value goes back to the caller untouched; hooks see this
/// copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    type_name: &'static str,
    message: String,
}

impl Failure {
    /// Captures the type name and display message of an error.
    #[must_use]
    pub fn capture<E: fmt::Display + ?Sized>(error: &E) -> Self {
        Self {
            type_name: core::any::type_name::<E>(),
            message: error.to_string(),
        }
    }

    /// Returns the error's type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the error's display message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result or failure of the intercepted operation. Never both.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The operation returned. `None` for operations that return nothing.
    Returned(Option<Value>),
    /// The operation failed.
    Failed(Failure),
}

impl Outcome {
    /// Returns the result value, if the operation returned one.
    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        match self {
            Self::Returned(value) => value.as_ref(),
            Self::Failed(_) => None,
        }
    }

    /// Returns the failure, if the operation failed.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Returned(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Returns true if the operation failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Caller
// ─────────────────────────────────────────────────────────────────────────────

/// Diagnostic description of whoever triggered the operation.
///
/// Only ever supplied explicitly by the interception layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerInfo {
    name: Arc<str>,
    location: Option<&'static Location<'static>>,
}

impl CallerInfo {
    /// Creates caller info with a name only.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    /// Creates caller info carrying the source location of this call.
    #[must_use]
    #[track_caller]
    pub fn here(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            location: Some(Location::caller()),
        }
    }

    /// Returns the caller's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the caller's source location, if captured.
    #[must_use]
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }
}

impl fmt::Display for CallerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} ({})", self.name, location),
            None => f.write_str(&self.name),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation → PendingInvocation → ExecutionRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Description of a call about to be made.
///
/// Arguments are positional and line up with the parameter names declared in
/// the operation's [`OperationHooks`](crate::metadata::OperationHooks).
///
/// ```
/// use afterhook_dispatch::record::{Invocation, OperationId};
///
/// struct Calculator;
///
/// let invocation = Invocation::new(OperationId::of::<Calculator>("add"))
///     .arg(2_i64)
///     .arg(3_i64);
/// assert_eq!(invocation.arguments().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Invocation {
    operation: OperationId,
    receiver: Option<Value>,
    arguments: Vec<Value>,
    caller: Option<CallerInfo>,
}

impl Invocation {
    /// Starts describing a call to `operation`.
    #[must_use]
    pub fn new(operation: OperationId) -> Self {
        Self {
            operation,
            receiver: None,
            arguments: Vec::new(),
            caller: None,
        }
    }

    /// Sets the receiver the operation is called on.
    #[must_use]
    pub fn receiver<T: Any + Send + Sync>(self, receiver: T) -> Self {
        self.receiver_value(Value::new(receiver))
    }

    /// Sets the receiver from an existing [`Value`].
    #[must_use]
    pub fn receiver_value(mut self, receiver: Value) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg<T: Any + Send + Sync>(self, argument: T) -> Self {
        self.arg_value(Value::new(argument))
    }

    /// Appends a positional argument from an existing [`Value`].
    #[must_use]
    pub fn arg_value(mut self, argument: Value) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Attaches caller diagnostics.
    #[must_use]
    pub fn caller(mut self, caller: CallerInfo) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Returns the operation being called.
    #[must_use]
    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

/// An invocation that has started but not finished.
///
/// The only way to obtain an [`ExecutionRecord`] is [`PendingInvocation::seal`],
/// which fixes the duration at the moment the outcome is known.
#[derive(Debug)]
pub struct PendingInvocation {
    id: InvocationId,
    invocation: Invocation,
    shape: ReturnShape,
    stopwatch: Stopwatch,
}

impl PendingInvocation {
    /// Stamps the start time of an invocation.
    #[must_use]
    pub fn start(invocation: Invocation, shape: ReturnShape, clock: &Clock) -> Self {
        Self {
            id: InvocationId::new(),
            invocation,
            shape,
            stopwatch: clock.stopwatch(),
        }
    }

    /// Returns this invocation's id.
    #[must_use]
    pub fn id(&self) -> &InvocationId {
        &self.id
    }

    /// Finishes the invocation and produces its sealed record.
    #[must_use]
    pub fn seal(self, outcome: Outcome) -> ExecutionRecord {
        let duration = self.stopwatch.elapsed();
        let Invocation {
            operation,
            receiver,
            arguments,
            caller,
        } = self.invocation;

        ExecutionRecord {
            id: self.id,
            operation,
            receiver,
            arguments,
            outcome,
            shape: self.shape,
            started_at: self.stopwatch.started_at(),
            duration,
            caller,
            bag: Mutex::new(HashMap::new()),
        }
    }
}

/// Sealed snapshot of one finished invocation.
pub struct ExecutionRecord {
    id: InvocationId,
    operation: OperationId,
    receiver: Option<Value>,
    arguments: Vec<Value>,
    outcome: Outcome,
    shape: ReturnShape,
    started_at: SystemTime,
    duration: Duration,
    caller: Option<CallerInfo>,
    // Dispatch is sequential, so this lock is never contended.
    bag: Mutex<HashMap<String, Value>>,
}

impl ExecutionRecord {
    /// Returns the invocation id.
    #[must_use]
    pub fn id(&self) -> &InvocationId {
        &self.id
    }

    /// Returns the invoked operation.
    #[must_use]
    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    /// Returns the receiver, or `None` for free or static operations.
    #[must_use]
    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_ref()
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Returns the argument at `index` downcast to `T`.
    #[must_use]
    pub fn argument<T: Any>(&self, index: usize) -> Option<&T> {
        self.arguments.get(index)?.downcast_ref::<T>()
    }

    /// Returns the operation's outcome.
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the result value, if any.
    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        self.outcome.return_value()
    }

    /// Returns the failure, if the operation failed.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        self.outcome.failure()
    }

    /// Returns true if the operation failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }

    /// Returns how the operation delivered its result.
    #[must_use]
    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    /// Returns the wall-clock start time.
    #[must_use]
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Returns the elapsed time, including any asynchronous completion.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns caller diagnostics, if supplied.
    #[must_use]
    pub fn caller(&self) -> Option<&CallerInfo> {
        self.caller.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared bag
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores a value under `key`, returning the previous one.
    pub fn set_item<T: Any + Send + Sync>(&self, key: impl Into<String>, item: T) -> Option<Value> {
        self.set_value(key, Value::new(item))
    }

    /// Stores an existing [`Value`] under `key`, returning the previous one.
    pub fn set_value(&self, key: impl Into<String>, item: Value) -> Option<Value> {
        self.bag.lock().insert(key.into(), item)
    }

    /// Returns the value under `key` if it is a `T`.
    #[must_use]
    pub fn item<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.bag.lock().get(key)?.downcast::<T>()
    }

    /// Returns the raw value under `key`.
    #[must_use]
    pub fn item_value(&self, key: &str) -> Option<Value> {
        self.bag.lock().get(key).cloned()
    }

    /// Replaces the `T` under `key` with `update` applied to a copy of it.
    ///
    /// Starts from `T::default()` when the key is absent or holds another type.
    /// The bag is unlocked while `update` runs, so it may read or write other
    /// keys; a write to `key` made inside `update` is overwritten.
    ///
    /// ```ignore
    /// record.update_item::<Vec<&str>, _>("sequence", |seq| seq.push("audit"));
    /// ```
    pub fn update_item<T, F>(&self, key: &str, update: F)
    where
        T: Any + Clone + Default + Send + Sync,
        F: FnOnce(&mut T),
    {
        let mut current = self
            .item::<T>(key)
            .map(|value| (*value).clone())
            .unwrap_or_default();
        update(&mut current);
        self.bag.lock().insert(key.to_string(), Value::new(current));
    }

    /// Removes and returns the value under `key`.
    pub fn remove_item(&self, key: &str) -> Option<Value> {
        self.bag.lock().remove(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_item(&self, key: &str) -> bool {
        self.bag.lock().contains_key(key)
    }

    /// Returns the bag's keys in no particular order.
    #[must_use]
    pub fn item_keys(&self) -> Vec<String> {
        self.bag.lock().keys().cloned().collect()
    }
}

impl fmt::Debug for ExecutionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRecord")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .field("arguments", &self.arguments)
            .field("outcome", &self.outcome)
            .field("shape", &self.shape)
            .field("duration", &self.duration)
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}
