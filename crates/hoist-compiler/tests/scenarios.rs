// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end analysis of small resumable methods.

use hoist_ast::{Method, MethodBuilder, MethodKind, StorageClass, VarId};
use hoist_compiler::{analyze, analyze_batch, Analysis, CheckConfig};
use hoist_diagnostics::Severity;
use hoist_partition::Storage;
use pretty_assertions::assert_eq;

fn run(method: &Method) -> Analysis {
    analyze(method, &CheckConfig::default())
}

fn codes(analysis: &Analysis) -> Vec<String> {
    analysis
        .diagnostics
        .iter()
        .map(|d| d.code_str().to_string())
        .collect()
}

#[test]
fn ref_used_after_suspension() {
    let b = MethodBuilder::new("A", MethodKind::Async);
    let y = b.local("y", StorageClass::Value);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(y, Some(b.int(0))),
        b.decl(x, Some(b.ref_(y))),
        b.await_call("F"),
        b.expr_stmt(b.method_call(b.var(x), "ToString", vec![])),
    ];
    let method = b.finish(body);
    let analysis = run(&method);

    assert_eq!(codes(&analysis), vec!["H0001"]);
    assert_eq!(analysis.error_count(), 1);
    assert_eq!(
        analysis.diagnostics[0].primary_span(),
        Some(method.variables[x.index()].span)
    );
    assert_eq!(analysis.verdict.storage_of(x), Some(Storage::Transient));
    assert!(analysis.verdict.degraded);
}

#[test]
fn ref_consumed_before_suspension() {
    let b = MethodBuilder::new("B", MethodKind::Async);
    let y = b.local("y", StorageClass::Value);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(y, Some(b.int(0))),
        b.decl(x, Some(b.ref_(y))),
        b.expr_stmt(b.method_call(b.var(x), "ToString", vec![])),
        b.await_call("F"),
    ];
    let analysis = run(&b.finish(body));

    assert!(analysis.diagnostics.is_empty());
    assert_eq!(analysis.verdict.storage_of(x), Some(Storage::Transient));
    assert!(!analysis.verdict.degraded);
}

#[test]
fn suspension_in_unsafe_block() {
    let b = MethodBuilder::new("C", MethodKind::Async);
    let body = vec![b.unsafe_(vec![b.await_call("F")])];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0002"]);
    assert_eq!(analysis.diagnostics[0].severity, Severity::Error);
}

#[test]
fn suspension_in_lock_is_a_warning() {
    let b = MethodBuilder::new("D", MethodKind::Async);
    let o = b.local("o", StorageClass::Value);
    let body = vec![
        b.decl(o, Some(b.call("Gate", vec![]))),
        b.lock(b.var(o), vec![b.await_call("F")]),
    ];
    let method = b.finish(body);

    let analysis = run(&method);
    assert_eq!(codes(&analysis), vec!["H0003"]);
    assert_eq!(analysis.warning_count(), 1);
    assert!(!analysis.has_errors());

    let strict = CheckConfig {
        deny_warnings: true,
        ..CheckConfig::default()
    };
    assert!(analyze(&method, &strict).has_errors());

    let quiet = CheckConfig {
        mutex_scope_warnings: false,
        ..CheckConfig::default()
    };
    assert!(analyze(&method, &quiet).diagnostics.is_empty());
}

#[test]
fn value_across_suspension_is_hoisted() {
    let b = MethodBuilder::new("E", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    let body = vec![
        b.decl(x, Some(b.int(1))),
        b.await_call("F"),
        b.expr_stmt(b.var(x)),
    ];
    let analysis = run(&b.finish(body));
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(analysis.verdict.storage_of(x), Some(Storage::Hoisted));
    assert_eq!(analysis.verdict.hoisted().collect::<Vec<_>>(), vec![x]);
}

#[test]
fn loop_carried_ref_crosses_back_edge() {
    let b = MethodBuilder::new("Loop", MethodKind::Async);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(x, Some(b.call("Get", vec![]))),
        b.while_(
            b.bool_(true),
            vec![
                b.expr_stmt(b.method_call(b.var(x), "ToString", vec![])),
                b.await_call("F"),
            ],
        ),
    ];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0001"]);
}

#[test]
fn ref_redefined_after_suspension_does_not_cross() {
    let b = MethodBuilder::new("Redef", MethodKind::Async);
    let y = b.local("y", StorageClass::Value);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(y, Some(b.int(0))),
        b.decl(x, Some(b.ref_(y))),
        b.expr_stmt(b.var(x)),
        b.await_call("F"),
        b.expr_stmt(b.assign(x, b.ref_(y))),
        b.expr_stmt(b.var(x)),
    ];
    let analysis = run(&b.finish(body));
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(analysis.verdict.storage_of(x), Some(Storage::Transient));
    // `y` is read again after the suspension.
    assert_eq!(analysis.verdict.storage_of(y), Some(Storage::Hoisted));
}

#[test]
fn ref_struct_resource_disposed_after_await() {
    let b = MethodBuilder::new("Using", MethodKind::Async);
    let r = b.local("r", StorageClass::RefStruct);
    let body = vec![b.using(Some(r), b.call("Acquire", vec![]), vec![b.await_call("F")])];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0001"]);
}

#[test]
fn yield_inside_finally() {
    let b = MethodBuilder::new("Iter", MethodKind::Iterator);
    let body = vec![b.try_(
        vec![b.yield_return(b.int(1))],
        vec![],
        Some(vec![b.yield_return(b.int(2))]),
    )];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0005"]);
}

#[test]
fn yield_after_return_is_unreachable() {
    let b = MethodBuilder::new("Iter", MethodKind::Iterator);
    let body = vec![b.ret(None), b.yield_return(b.int(1))];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0006"]);

    let lenient = CheckConfig {
        report_unreachable_suspensions: false,
        ..CheckConfig::default()
    };
    let method = {
        let b = MethodBuilder::new("Iter", MethodKind::Iterator);
        let body = vec![b.ret(None), b.yield_return(b.int(1))];
        b.finish(body)
    };
    assert!(analyze(&method, &lenient).diagnostics.is_empty());
}

#[test]
fn await_in_iterator_is_rejected() {
    let b = MethodBuilder::new("Iter", MethodKind::Iterator);
    let body = vec![b.await_call("F")];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0004"]);
}

#[test]
fn malformed_body_fails_the_analysis() {
    let b = MethodBuilder::new("Broken", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    let body = vec![b.decl(x, Some(b.int(1))), b.await_call("F"), b.break_()];
    let analysis = run(&b.finish(body));

    assert!(analysis.is_failed());
    assert_eq!(codes(&analysis), vec!["H0007"]);
    assert_eq!(analysis.diagnostics[0].message, "malformed method body");
    assert_eq!(analysis.verdict.storage_of(x), Some(Storage::Transient));
    assert!(analysis.verdict.degraded);
}

#[test]
fn unknown_variable_fails_the_analysis() {
    let b = MethodBuilder::new("Broken", MethodKind::Async);
    let body = vec![b.expr_stmt(b.var(VarId(7)))];
    let analysis = run(&b.finish(body));
    assert!(analysis.is_failed());
    assert_eq!(codes(&analysis), vec!["H0007"]);
}

#[test]
fn ref_not_needed_after_finally_that_only_returns() {
    let b = MethodBuilder::new("Early", MethodKind::Async);
    let y = b.local("y", StorageClass::Value);
    let x = b.local("x", StorageClass::Ref);
    let c = b.local("c", StorageClass::Value);
    let body = vec![
        b.decl(y, Some(b.int(0))),
        b.decl(x, Some(b.ref_(y))),
        b.decl(c, Some(b.call("Flag", vec![]))),
        b.if_(
            b.var(c),
            vec![b.try_(vec![b.ret(None)], vec![], Some(vec![b.await_call("G")]))],
            None,
        ),
        b.expr_stmt(b.var(x)),
    ];
    let analysis = run(&b.finish(body));

    assert!(analysis.diagnostics.is_empty());
    assert!(!analysis.verdict.degraded);
    assert_eq!(analysis.verdict.hoisted().count(), 0);
}

#[test]
fn yield_after_try_that_breaks_out_is_unreachable() {
    let b = MethodBuilder::new("Iter", MethodKind::Iterator);
    let body = vec![
        b.try_(vec![b.yield_break()], vec![], Some(vec![])),
        b.yield_return(b.int(1)),
    ];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0006"]);
}

#[test]
fn reused_node_id_fails_the_analysis() {
    let b = MethodBuilder::new("Shared", MethodKind::Async);
    let o = b.local("o", StorageClass::Value);
    let awaited = b.await_(b.call("F", vec![]));
    let mut inner = b.expr_stmt(b.int(1));
    inner.id = awaited.id;
    let body = vec![
        b.decl(o, Some(b.call("Gate", vec![]))),
        b.unsafe_(vec![b.expr_stmt(awaited)]),
        b.lock(b.var(o), vec![inner]),
    ];
    let analysis = run(&b.finish(body));

    assert!(analysis.is_failed());
    assert_eq!(codes(&analysis), vec!["H0007"]);
    assert!(analysis.has_errors());
}

#[test]
fn misnumbered_variable_table_fails_the_analysis() {
    let b = MethodBuilder::new("Table", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    b.local("r", StorageClass::Ref);
    let body = vec![
        b.decl(x, Some(b.int(1))),
        b.await_call("F"),
        b.expr_stmt(b.var(x)),
    ];
    let mut method = b.finish(body);
    method.variables[1].id = x;
    let analysis = run(&method);

    assert_eq!(codes(&analysis), vec!["H0007"]);
    assert_eq!(analysis.verdict.storage.len(), 2);
    assert!(analysis.verdict.degraded);
}

#[test]
fn diagnostics_are_ordered_by_span() {
    let b = MethodBuilder::new("Many", MethodKind::Async);
    let x = b.local("x", StorageClass::Ref);
    let o = b.local("o", StorageClass::Value);
    let body = vec![
        b.decl(x, Some(b.call("Get", vec![]))),
        b.unsafe_(vec![b.await_call("F")]),
        b.lock(b.var(o), vec![b.await_call("G")]),
        b.expr_stmt(b.var(x)),
    ];
    let analysis = run(&b.finish(body));
    assert_eq!(codes(&analysis), vec!["H0001", "H0002", "H0003"]);
    let starts: Vec<_> = analysis
        .diagnostics
        .iter()
        .filter_map(|d| d.primary_span())
        .map(|s| s.start)
        .collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[test]
fn analysis_is_idempotent() {
    let b = MethodBuilder::new("Twice", MethodKind::AsyncIterator);
    let x = b.local("x", StorageClass::Ref);
    let v = b.local("v", StorageClass::Value);
    let body = vec![
        b.decl(v, Some(b.int(3))),
        b.decl(x, Some(b.ref_(v))),
        b.await_call("F"),
        b.yield_return(b.var(v)),
        b.expr_stmt(b.var(x)),
    ];
    let method = b.finish(body);
    let first = run(&method);
    let second = run(&method);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.verdict, second.verdict);
}

#[test]
fn batch_keeps_input_order() {
    let methods: Vec<Method> = (0..16)
        .map(|i| {
            let b = MethodBuilder::new(format!("M{i}"), MethodKind::Async);
            let body = if i % 2 == 0 {
                vec![b.unsafe_(vec![b.await_call("F")])]
            } else {
                vec![b.await_call("F")]
            };
            b.finish(body)
        })
        .collect();
    let results = analyze_batch(&methods, &CheckConfig::default());

    let names: Vec<_> = results.iter().map(|a| a.method.clone()).collect();
    let expected: Vec<_> = (0..16).map(|i| format!("M{i}")).collect();
    assert_eq!(names, expected);
    for (i, analysis) in results.iter().enumerate() {
        assert_eq!(analysis.has_errors(), i % 2 == 0);
    }
}
