// SPDX-License-Identifier: (MIT OR Apache-2.0)

use hoist_ast::{Method, MethodBuilder, MethodKind, StorageClass};
use hoist_cfg::build_graph;
use hoist_liveness::compute_liveness;
use hoist_regions::classify;

use super::*;

fn check_method(method: &Method) -> Vec<CheckError> {
    check_with(method, CheckOptions::default())
}

fn check_with(method: &Method, options: CheckOptions) -> Vec<CheckError> {
    let graph = build_graph(method).unwrap();
    let regions = classify(method, &graph);
    let liveness = compute_liveness(&graph);
    check(method, &graph, &regions, &liveness, options)
}

fn ranks(errors: &[CheckError]) -> Vec<u8> {
    errors.iter().map(|e| e.kind.rank()).collect()
}

#[test]
fn ref_used_after_await_is_rejected() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(x, Some(b.ref_(b.local("y", StorageClass::Value)))),
        b.await_call("F"),
        b.expr_stmt(b.method_call(b.var(x), "ToString", vec![])),
    ];
    let method = b.finish(body);
    let errors = check_method(&method);

    assert_eq!(ranks(&errors), vec![1]);
    let err = &errors[0];
    assert_eq!(err.span, method.variables[x.index()].span);
    assert_eq!(
        err.to_string(),
        "ref local `x` cannot be preserved across a suspension point"
    );
    assert_eq!(err.kind.sites().len(), 1);
}

#[test]
fn ref_consumed_before_await_is_accepted() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::RefStruct);
    let body = vec![
        b.decl(x, Some(b.call("Span", vec![]))),
        b.expr_stmt(b.method_call(b.var(x), "ToString", vec![])),
        b.await_call("F"),
    ];
    assert!(check_method(&b.finish(body)).is_empty());
}

#[test]
fn value_local_across_await_is_accepted() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    let body = vec![
        b.decl(x, Some(b.int(1))),
        b.await_call("F"),
        b.expr_stmt(b.var(x)),
    ];
    assert!(check_method(&b.finish(body)).is_empty());
}

#[test]
fn one_error_per_variable_with_every_crossed_site() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(x, Some(b.call("Get", vec![]))),
        b.await_call("F"),
        b.expr_stmt(b.var(x)),
        b.await_call("G"),
        b.expr_stmt(b.var(x)),
    ];
    let errors = check_method(&b.finish(body));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind.sites().len(), 2);
}

#[test]
fn suspension_in_unsafe_block_is_rejected_even_if_unreachable() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let body = vec![b.unsafe_(vec![b.ret(None), b.await_call("F")])];
    let errors = check_with(
        &b.finish(body),
        CheckOptions {
            report_unreachable_suspensions: false,
            ..CheckOptions::default()
        },
    );
    assert_eq!(ranks(&errors), vec![2]);
    assert_eq!(errors[0].to_string(), "cannot suspend inside an unsafe block");
}

#[test]
fn nested_unsafe_regions_each_report_once() {
    let b = MethodBuilder::new("M", MethodKind::Async).unsafe_method();
    let body = vec![b.unsafe_(vec![b.await_call("F"), b.await_call("G")])];
    let errors = check_method(&b.finish(body));
    assert_eq!(ranks(&errors), vec![2, 2]);
    // Both regions cover the same text here; the message breaks the tie.
    assert_eq!(errors[0].to_string(), "cannot suspend inside an unsafe block");
    assert_eq!(errors[1].to_string(), "cannot suspend inside an unsafe method");
    assert!(errors.iter().all(|e| e.kind.sites().len() == 2));
}

#[test]
fn lock_produces_single_warning() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let o = b.local("o", StorageClass::Value);
    let body = vec![b.lock(b.var(o), vec![b.await_call("F"), b.await_call("G")])];
    let errors = check_method(&b.finish(body));
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_error());
    assert_eq!(errors[0].kind.severity(), Severity::Warning);
}

#[test]
fn lock_warning_can_be_disabled() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let o = b.local("o", StorageClass::Value);
    let body = vec![b.lock(b.var(o), vec![b.await_call("F")])];
    let options = CheckOptions {
        mutex_scope_warnings: false,
        ..CheckOptions::default()
    };
    assert!(check_with(&b.finish(body), options).is_empty());
}

#[test]
fn lock_inside_unsafe_reports_both_regions() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let o = b.local("o", StorageClass::Value);
    let body = vec![b.unsafe_(vec![b.lock(b.var(o), vec![b.await_call("F")])])];
    let errors = check_method(&b.finish(body));
    // Same start; the lock statement ends first.
    assert_eq!(ranks(&errors), vec![3, 2]);
}

#[test]
fn await_in_iterator_is_not_allowed() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let body = vec![b.await_call("F")];
    let errors = check_method(&b.finish(body));
    assert_eq!(ranks(&errors), vec![4]);
    assert_eq!(errors[0].to_string(), "`await` is not allowed in an iterator");
}

#[test]
fn yield_in_async_method_is_not_allowed() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let body = vec![b.try_(vec![], vec![], Some(vec![b.yield_return(b.int(1))]))];
    let errors = check_method(&b.finish(body));
    // Only the method kind is reported.
    assert_eq!(ranks(&errors), vec![4]);
}

#[test]
fn yield_in_finally_catch_and_guarded_try() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let body = vec![
        b.try_(
            vec![b.yield_return(b.int(1))],
            vec![b.catch(None, None, vec![b.yield_return(b.int(2))])],
            Some(vec![b.yield_return(b.int(3))]),
        ),
        b.try_(vec![b.yield_return(b.int(4))], vec![], Some(vec![])),
    ];
    let errors = check_method(&b.finish(body));
    let messages: Vec<_> = errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "cannot yield a value in the body of a try block with a catch clause",
            "cannot yield a value in the body of a catch clause",
            "cannot yield a value in the body of a finally clause",
        ]
    );
}

#[test]
fn unreachable_yield_is_reported() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let body = vec![b.yield_break(), b.yield_return(b.int(1))];
    let errors = check_method(&b.finish(body));
    assert_eq!(ranks(&errors), vec![6]);
    assert_eq!(errors[0].to_string(), "unreachable yield point");
}

#[test]
fn no_suspensions_no_errors_whatever_the_regions() {
    let b = MethodBuilder::new("M", MethodKind::Async).unsafe_method();
    let x = b.local("x", StorageClass::Ref);
    let o = b.local("o", StorageClass::Value);
    let body = vec![b.unsafe_(vec![b.lock(
        b.var(o),
        vec![b.decl(x, Some(b.call("Get", vec![]))), b.expr_stmt(b.var(x))],
    )])];
    assert!(check_method(&b.finish(body)).is_empty());
}

#[test]
fn ordering_is_by_span() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let body = vec![b.await_call("F"), b.yield_return(b.int(1))];
    let errors = check_method(&b.finish(body));
    assert_eq!(errors.len(), 2);
    assert!(errors[0].span.start < errors[1].span.start);
}
