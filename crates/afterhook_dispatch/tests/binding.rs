//! End-to-end parameter binding.
//!
//! Runs real operations through an `Interceptor` and checks what handler
//! parameters receive: the operation's result, original arguments (renamed
//! or not), literals, services and defaults.

mod test_utils;

use afterhook_dispatch::adapter::Interceptor;
use afterhook_dispatch::handler::{HandlerParam, HandlerType};
use afterhook_dispatch::metadata::MappingDirective;
use afterhook_dispatch::plugin::HooksPlugin;
use futures::FutureExt;
use test_utils::{
    Calculator, Journal, add_call, add_hooks, binding, create_test_server, get_hooks, get_journal,
};

/// `Journal::observe(sum, a, b)` records whatever each parameter received.
fn observer() -> HandlerType<Journal> {
    HandlerType::<Journal>::new().method(
        "observe",
        [
            HandlerParam::of::<i64>("sum"),
            HandlerParam::of::<i64>("a"),
            HandlerParam::of::<i64>("b"),
        ],
        |journal, call| {
            for name in ["sum", "a", "b"] {
                journal.push(format!("{name}={:?}", call.get::<i64>(name)));
            }
            futures::future::ready(Ok(())).boxed()
        },
    )
}

#[tokio::test]
async fn add_maps_return_value_to_sum() {
    let server = create_test_server(HooksPlugin::default());
    let hooks = get_hooks(&server);
    hooks
        .register_handler(HandlerType::<Journal>::new().method(
            "record_sum",
            [HandlerParam::of::<i64>("sum")],
            |journal, call| {
                if let Some(sum) = call.get::<i64>("sum") {
                    journal.push(format!("sum={sum}"));
                }
                futures::future::ready(Ok(())).boxed()
            },
        ))
        .expect("registered once");
    hooks
        .declare(
            add_hooks()
                .directive(MappingDirective::return_value("sum"))
                .hook(binding("record_sum")),
        )
        .expect("declared once");

    let sum = Interceptor::new(&server)
        .run_value(add_call(2, 3), || Calculator::add(2, 3))
        .await
        .into_value();

    assert_eq!(sum, 5);
    assert_eq!(get_journal(&server).entries(), ["sum=5"]);
}

#[tokio::test]
async fn return_directive_wins_over_original_parameter() {
    let server = create_test_server(HooksPlugin::default());
    let hooks = get_hooks(&server);
    hooks.register_handler(observer()).expect("registered once");
    hooks
        .declare(
            add_hooks()
                .directive(MappingDirective::return_value("a"))
                .hook(binding("observe")),
        )
        .expect("declared once");

    Interceptor::new(&server)
        .run_value(add_call(2, 3), || Calculator::add(2, 3))
        .await
        .into_value();

    assert_eq!(
        get_journal(&server).entries(),
        ["sum=None", "a=Some(5)", "b=Some(3)"]
    );
}

#[tokio::test]
async fn binding_flags_gate_arguments_and_result() {
    let server = create_test_server(HooksPlugin::default());
    let hooks = get_hooks(&server);
    hooks.register_handler(observer()).expect("registered once");
    hooks
        .declare(
            add_hooks()
                .directive(MappingDirective::return_value("sum"))
                .hook(binding("observe").with_order(1).with_return_value(false))
                .hook(binding("observe").with_order(2).with_parameters(false)),
        )
        .expect("declared once");

    Interceptor::new(&server)
        .run_value(add_call(2, 3), || Calculator::add(2, 3))
        .await
        .into_value();

    assert_eq!(
        get_journal(&server).entries(),
        [
            "sum=None", "a=Some(2)", "b=Some(3)", // arguments only
            "sum=Some(5)", "a=None", "b=None", // result only
        ]
    );
}

#[tokio::test]
async fn renamed_arguments_and_reserved_result_name() {
    let server = create_test_server(HooksPlugin::default());
    let hooks = get_hooks(&server);
    hooks
        .register_handler(HandlerType::<Journal>::new().method(
            "describe",
            [
                HandlerParam::of::<i64>("left"),
                HandlerParam::of::<i64>("right"),
                HandlerParam::of::<i64>("result"),
            ],
            |journal, call| {
                journal.push(format!(
                    "{:?} + {:?} = {:?}",
                    call.get::<i64>("left"),
                    call.get::<i64>("right"),
                    call.get::<i64>("result"),
                ));
                futures::future::ready(Ok(())).boxed()
            },
        ))
        .expect("registered once");
    hooks
        .declare(
            add_hooks()
                .directive(MappingDirective::rename("a", "left"))
                .directive(MappingDirective::rename("b", "right"))
                .hook(binding("describe")),
        )
        .expect("declared once");

    Interceptor::new(&server)
        .run_value(add_call(2, 3), || Calculator::add(2, 3))
        .await
        .into_value();

    assert_eq!(get_journal(&server).entries(), ["Some(2) + Some(3) = Some(5)"]);
}

#[derive(Debug, PartialEq)]
struct Currency(&'static str);

#[tokio::test]
async fn services_then_defaults_then_absent() {
    let mut server = create_test_server(HooksPlugin::default());
    server.insert_service(Currency("EUR"));
    let hooks = get_hooks(&server);
    hooks
        .register_handler(HandlerType::<Journal>::new().method(
            "format",
            [
                HandlerParam::of::<Currency>("currency"),
                HandlerParam::of::<u8>("precision").with_default(2_u8),
                HandlerParam::of::<String>("note"),
            ],
            |journal, call| {
                journal.push(format!(
                    "{:?} {:?} bound={}",
                    call.get::<Currency>("currency"),
                    call.get::<u8>("precision"),
                    call.args().is_bound("note"),
                ));
                futures::future::ready(Ok(())).boxed()
            },
        ))
        .expect("registered once");
    hooks
        .declare(add_hooks().hook(binding("format")))
        .expect("declared once");

    Interceptor::new(&server)
        .run_value(add_call(2, 3), || Calculator::add(2, 3))
        .await
        .into_value();

    assert_eq!(
        get_journal(&server).entries(),
        ["Some(Currency(\"EUR\")) Some(2) bound=false"]
    );
}

#[tokio::test]
async fn service_resolution_can_be_disabled() {
    let mut server = create_test_server(HooksPlugin::default().auto_resolve_parameters(false));
    server.insert_service(Currency("EUR"));
    let hooks = get_hooks(&server);
    hooks
        .register_handler(HandlerType::<Journal>::new().method(
            "format",
            [HandlerParam::of::<Currency>("currency")],
            |journal, call| {
                journal.push(format!("bound={}", call.args().is_bound("currency")));
                futures::future::ready(Ok(())).boxed()
            },
        ))
        .expect("registered once");
    hooks
        .declare(add_hooks().hook(binding("format")))
        .expect("declared once");

    Interceptor::new(&server)
        .run_value(add_call(2, 3), || Calculator::add(2, 3))
        .await
        .into_value();

    assert_eq!(get_journal(&server).entries(), ["bound=false"]);
}

#[tokio::test]
async fn failed_operations_bind_no_result() {
    let server = create_test_server(HooksPlugin::default());
    let hooks = get_hooks(&server);
    hooks.register_handler(observer()).expect("registered once");
    hooks
        .declare(
            add_hooks()
                .directive(MappingDirective::return_value("sum"))
                .hook(binding("observe")),
        )
        .expect("declared once");

    let outcome = Interceptor::new(&server)
        .call(add_call(2, 3), || Err::<i64, _>("overflow"))
        .await;

    assert_eq!(outcome, Err("overflow"));
    assert_eq!(
        get_journal(&server).entries(),
        ["sum=None", "a=Some(2)", "b=Some(3)"]
    );
}
