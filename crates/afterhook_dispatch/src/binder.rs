//! Parameter binding.
//!
//! Resolves each formal parameter of a handler member to something, using the
//! first rule that matches:
//!
//! 1. A directive targets the parameter: `ReturnValue` (when the binding
//!    includes the return value) yields the result, `Literal` yields its value
//! 2. The name is `return_value` or `result` and the binding includes the
//!    return value: the result
//! 3. The name is `record` or `context` and the parameter is declared as an
//!    [`ExecutionRecord`]: the record itself
//! 4. The binding includes parameters and the operation has a parameter of
//!    that name, after any `Rename`: the positional argument
//! 5. Service resolution is enabled and a service of the declared type is
//!    registered: that service
//! 6. The parameter's default, else absent
//!
//! Binding never fails.

use afterhook_system::service::Services;

use crate::handler::{BoundArg, HandlerParam, HookArgs};
use crate::metadata::{HookBinding, MappingDirective, OperationHooks};
use crate::record::ExecutionRecord;
use crate::value::Value;

/// Handler parameter names that receive the operation's result.
pub const RETURN_VALUE_NAMES: [&str; 2] = ["return_value", "result"];

/// Handler parameter names that receive the execution record.
pub const RECORD_NAMES: [&str; 2] = ["record", "context"];

pub(crate) struct ParameterBinder<'a> {
    operation: &'a OperationHooks,
    services: &'a Services,
    resolve_services: bool,
}

impl<'a> ParameterBinder<'a> {
    pub(crate) fn new(
        operation: &'a OperationHooks,
        services: &'a Services,
        resolve_services: bool,
    ) -> Self {
        Self {
            operation,
            services,
            resolve_services,
        }
    }

    pub(crate) fn bind(
        &self,
        binding: &HookBinding,
        params: &[HandlerParam],
        record: &ExecutionRecord,
    ) -> HookArgs {
        let mut args = HookArgs::with_capacity(params.len());
        for param in params {
            args.push(param.name_key(), self.bind_one(binding, param, record));
        }
        args
    }

    fn bind_one(
        &self,
        binding: &HookBinding,
        param: &HandlerParam,
        record: &ExecutionRecord,
    ) -> BoundArg {
        let name = param.name();
        let directive = self.operation.directive_for(name);

        match directive {
            Some(MappingDirective::ReturnValue { .. }) if binding.includes_return_value() => {
                return result_of(record);
            }
            Some(MappingDirective::Literal { value, .. }) => return BoundArg::Value(value.clone()),
            _ => {}
        }

        if binding.includes_return_value() && RETURN_VALUE_NAMES.contains(&name) {
            return result_of(record);
        }

        if param.is_record() && RECORD_NAMES.contains(&name) {
            return BoundArg::Record;
        }

        if binding.includes_parameters() {
            let source = match directive {
                Some(MappingDirective::Rename { source, .. }) => &**source,
                _ => name,
            };
            if let Some(argument) = self
                .operation
                .parameter_index(source)
                .and_then(|index| record.arguments().get(index))
            {
                return BoundArg::Value(argument.clone());
            }
        }

        if self.resolve_services
            && let Some(type_id) = param.type_id()
            && let Some(service) = self.services.get_by_type_id(type_id)
        {
            return BoundArg::Value(Value::from_erased(service, param.type_name()));
        }

        param
            .default_value()
            .cloned()
            .map_or(BoundArg::Absent, BoundArg::Value)
    }
}

fn result_of(record: &ExecutionRecord) -> BoundArg {
    record
        .return_value()
        .cloned()
        .map_or(BoundArg::Absent, BoundArg::Value)
}
