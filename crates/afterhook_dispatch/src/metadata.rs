//! Declarative hook metadata.
//!
//! An [`OperationHooks`] describes everything attached to one hooked
//! operation: its bindings, mapping directives, guard and production marker.
//! Declarations are built once, handed to
//! [`HooksAPI::declare`](crate::api::HooksAPI::declare), and are read-only
//! from then on.
//!
//! # Example
//!
//! ```
//! use afterhook_dispatch::metadata::{HandlerRef, HookBinding, MappingDirective, OperationHooks};
//! use afterhook_dispatch::record::OperationId;
//!
//! struct Calculator;
//! struct AuditHooks;
//!
//! let hooks = OperationHooks::new(OperationId::of::<Calculator>("add"))
//!     .parameters(["a", "b"])
//!     .hook(HookBinding::new(HandlerRef::of::<AuditHooks>("record_sum")).with_order(10))
//!     .directive(MappingDirective::return_value("sum"))
//!     .directive(MappingDirective::rename("a", "left"));
//!
//! assert_eq!(hooks.bindings().len(), 1);
//! assert!(hooks.directive_for("sum").is_some());
//! ```

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::record::OperationId;
use crate::value::Value;

/// Reference to a handler member, resolved lazily at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    type_name: Arc<str>,
    member: Arc<str>,
}

impl HandlerRef {
    /// Creates a reference from explicit names.
    #[must_use]
    pub fn new(type_name: impl Into<Arc<str>>, member: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    /// Creates a reference to a member of handler type `H`.
    #[must_use]
    pub fn of<H: ?Sized>(member: impl Into<Arc<str>>) -> Self {
        Self::new(core::any::type_name::<H>(), member)
    }

    /// Returns the handler type's name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the member name.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_name, self.member)
    }
}

/// Attaches one handler to one operation.
///
/// Defaults: parameters and return value are both passed to the handler, the
/// order key is `0`, and failures fall back to the global error policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookBinding {
    handler: HandlerRef,
    include_parameters: bool,
    include_return_value: bool,
    continue_on_error: Option<bool>,
    order: i32,
}

impl HookBinding {
    /// Creates a binding for `handler` with default flags.
    #[must_use]
    pub fn new(handler: HandlerRef) -> Self {
        Self {
            handler,
            include_parameters: true,
            include_return_value: true,
            continue_on_error: None,
            order: 0,
        }
    }

    /// Sets the order key. Lower runs first; ties keep declaration order.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Controls whether the operation's arguments are offered to the handler.
    #[must_use]
    pub fn with_parameters(mut self, include: bool) -> Self {
        self.include_parameters = include;
        self
    }

    /// Controls whether the operation's result is offered to the handler.
    #[must_use]
    pub fn with_return_value(mut self, include: bool) -> Self {
        self.include_return_value = include;
        self
    }

    /// Sets an explicit continue-on-error flag, overriding the global policy.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = Some(continue_on_error);
        self
    }

    /// Returns the handler reference.
    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Returns true if operation arguments are bound.
    #[must_use]
    pub fn includes_parameters(&self) -> bool {
        self.include_parameters
    }

    /// Returns true if the operation result is bound.
    #[must_use]
    pub fn includes_return_value(&self) -> bool {
        self.include_return_value
    }

    /// Returns the explicit continue-on-error flag, if one was set.
    #[must_use]
    pub fn continue_on_error(&self) -> Option<bool> {
        self.continue_on_error
    }

    /// Returns the order key.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }
}

/// Rule feeding one handler parameter from the original call.
#[derive(Debug, Clone)]
pub enum MappingDirective {
    /// Bind the operation parameter `source` to handler parameter `target`.
    Rename {
        /// Parameter name on the operation.
        source: Arc<str>,
        /// Parameter name on the handler.
        target: Arc<str>,
    },
    /// Bind a fixed value to `target`.
    Literal {
        /// Parameter name on the handler.
        target: Arc<str>,
        /// The injected value.
        value: Value,
    },
    /// Bind the operation's result to `target`.
    ReturnValue {
        /// Parameter name on the handler.
        target: Arc<str>,
    },
}

impl MappingDirective {
    /// Creates a rename directive.
    #[must_use]
    pub fn rename(source: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        Self::Rename {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Creates a literal directive.
    #[must_use]
    pub fn literal<T: Any + Send + Sync>(target: impl Into<Arc<str>>, value: T) -> Self {
        Self::Literal {
            target: target.into(),
            value: Value::new(value),
        }
    }

    /// Creates a return-value directive.
    #[must_use]
    pub fn return_value(target: impl Into<Arc<str>>) -> Self {
        Self::ReturnValue {
            target: target.into(),
        }
    }

    /// Returns the handler parameter this directive feeds.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Rename { target, .. }
            | Self::Literal { target, .. }
            | Self::ReturnValue { target } => target,
        }
    }

    fn target_key(&self) -> Arc<str> {
        match self {
            Self::Rename { target, .. }
            | Self::Literal { target, .. }
            | Self::ReturnValue { target } => Arc::clone(target),
        }
    }
}

/// Everything declared for one hooked operation.
#[derive(Debug, Clone)]
pub struct OperationHooks {
    operation: OperationId,
    parameters: Vec<Arc<str>>,
    bindings: Vec<HookBinding>,
    directives: HashMap<Arc<str>, MappingDirective>,
    guard: Option<Arc<str>>,
    skip_in_production: bool,
}

impl OperationHooks {
    /// Starts a declaration for `operation`.
    #[must_use]
    pub fn new(operation: OperationId) -> Self {
        Self {
            operation,
            parameters: Vec::new(),
            bindings: Vec::new(),
            directives: HashMap::new(),
            guard: None,
            skip_in_production: false,
        }
    }

    /// Declares the operation's formal parameter names, in positional order.
    #[must_use]
    pub fn parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.parameters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a binding. Bindings are kept stably sorted by order key.
    #[must_use]
    pub fn hook(mut self, binding: HookBinding) -> Self {
        // Insert after every binding with an order key <= this one
        let at = self
            .bindings
            .partition_point(|existing| existing.order <= binding.order);
        self.bindings.insert(at, binding);
        self
    }

    /// Adds a mapping directive, replacing any earlier one with the same target.
    #[must_use]
    pub fn directive(mut self, directive: MappingDirective) -> Self {
        self.directives.insert(directive.target_key(), directive);
        self
    }

    /// Names the guard, registered on the declaring type, that gates every binding.
    #[must_use]
    pub fn guard(mut self, name: impl Into<Arc<str>>) -> Self {
        self.guard = Some(name.into());
        self
    }

    /// Disables all hooks for this operation in production mode.
    #[must_use]
    pub fn skip_in_production(mut self) -> Self {
        self.skip_in_production = true;
        self
    }

    /// Returns the operation id.
    #[must_use]
    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    /// Returns the declared parameter names.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(AsRef::as_ref)
    }

    /// Returns the position of the named operation parameter.
    #[must_use]
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| &**p == name)
    }

    /// Returns the bindings in dispatch order.
    #[must_use]
    pub fn bindings(&self) -> &[HookBinding] {
        &self.bindings
    }

    /// Returns the directive targeting the named handler parameter.
    #[must_use]
    pub fn directive_for(&self, target: &str) -> Option<&MappingDirective> {
        self.directives.get(target)
    }

    /// Returns the guard name, if one is declared.
    #[must_use]
    pub fn guard_name(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    /// Returns true if the operation itself is marked skip-in-production.
    #[must_use]
    pub fn skips_in_production(&self) -> bool {
        self.skip_in_production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer;

    fn binding(member: &str, order: i32) -> HookBinding {
        HookBinding::new(HandlerRef::of::<Mailer>(member)).with_order(order)
    }

    fn members(hooks: &OperationHooks) -> Vec<&str> {
        hooks.bindings().iter().map(|b| b.handler().member()).collect()
    }

    #[test]
    fn bindings_sorted_stably_by_order() {
        let hooks = OperationHooks::new(OperationId::new("Orders", "place"))
            .hook(binding("c", 5))
            .hook(binding("a", -1))
            .hook(binding("d", 5))
            .hook(binding("b", 0))
            .hook(binding("e", 5));

        assert_eq!(members(&hooks), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn binding_defaults() {
        let b = HookBinding::new(HandlerRef::new("Mailer", "notify"));
        assert!(b.includes_parameters());
        assert!(b.includes_return_value());
        assert_eq!(b.continue_on_error(), None);
        assert_eq!(b.order(), 0);
        assert_eq!(b.handler().to_string(), "Mailer::notify");

        let b = b
            .with_parameters(false)
            .with_return_value(false)
            .with_continue_on_error(false);
        assert!(!b.includes_parameters());
        assert!(!b.includes_return_value());
        assert_eq!(b.continue_on_error(), Some(false));
    }

    #[test]
    fn directives_keyed_by_target() {
        let hooks = OperationHooks::new(OperationId::new("Orders", "place"))
            .directive(MappingDirective::rename("order_id", "id"))
            .directive(MappingDirective::literal("channel", "email"))
            .directive(MappingDirective::return_value("id"));

        assert!(matches!(
            hooks.directive_for("id"),
            Some(MappingDirective::ReturnValue { .. })
        ));
        match hooks.directive_for("channel") {
            Some(MappingDirective::Literal { value, .. }) => {
                assert_eq!(value.downcast_ref::<&str>(), Some(&"email"));
            }
            other => panic!("expected literal, got {other:?}"),
        }
        assert!(hooks.directive_for("order_id").is_none());
    }

    #[test]
    fn parameter_lookup() {
        let hooks = OperationHooks::new(OperationId::new("Calculator", "add"))
            .parameters(["a", "b"])
            .guard("is_enabled")
            .skip_in_production();

        assert_eq!(hooks.parameter_index("b"), Some(1));
        assert_eq!(hooks.parameter_index("c"), None);
        assert_eq!(hooks.parameter_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(hooks.guard_name(), Some("is_enabled"));
        assert!(hooks.skips_in_production());
    }
}
