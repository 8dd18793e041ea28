// SPDX-License-Identifier: (MIT OR Apache-2.0)

use hoist_ast::{MethodBuilder, MethodKind, StorageClass, VarId};

use super::*;

fn instrs(graph: &MethodGraph) -> Vec<InstrKind> {
    graph
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter().map(|i| i.kind))
        .collect()
}

fn defs_of(graph: &MethodGraph, var: VarId) -> usize {
    instrs(graph)
        .into_iter()
        .filter(|k| *k == InstrKind::Def(var))
        .count()
}

#[test]
fn straight_line_body_stays_in_entry() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.decl(x, Some(b.call("Get", vec![]))),
        b.expr_stmt(b.method_call(b.var(x), "ToString", vec![])),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let entry = graph.block(graph.entry);
    assert_eq!(
        entry.instrs.iter().map(|i| i.kind).collect::<Vec<_>>(),
        vec![InstrKind::Def(x), InstrKind::Use(x)]
    );
    assert_eq!(
        entry.terminator,
        Terminator::Goto {
            target: graph.return_exit
        }
    );
    assert!(validate(&graph).is_ok());
}

#[test]
fn parameters_are_defined_at_entry() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let p = b.param("p", StorageClass::Value);
    let q = b.param("q", StorageClass::Ref);
    let graph = build_graph(&b.finish(vec![])).unwrap();
    let entry = graph.block(graph.entry);
    assert_eq!(entry.instrs[0].kind, InstrKind::Def(p));
    assert_eq!(entry.instrs[1].kind, InstrKind::Def(q));
}

#[test]
fn await_records_suspension_after_operand() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let t = b.local("t", StorageClass::Value);
    let body = vec![
        b.decl(t, Some(b.call("Start", vec![]))),
        b.expr_stmt(b.await_(b.var(t))),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    assert_eq!(graph.suspensions.len(), 1);
    let point = &graph.suspensions[0];
    assert_eq!(point.kind, SuspendKind::Await);
    assert_eq!(point.handler, HandlerContext::None);
    assert_eq!(point.position.offset, 2);
    assert_eq!(
        graph.instr_at(point.position).map(|i| i.kind),
        Some(InstrKind::Suspend(point.id))
    );
}

#[test]
fn while_loop_has_back_edge() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let i = b.local("i", StorageClass::Value);
    let body = vec![
        b.decl(i, Some(b.int(0))),
        b.while_(b.var(i), vec![b.yield_return(b.var(i))]),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    let body_block = graph.block(point.position.block);
    let check = match body_block.terminator {
        Terminator::Goto { target } => target,
        ref other => panic!("expected goto, got {other:?}"),
    };
    let check_block = graph.block(check);
    assert!(matches!(
        check_block.terminator,
        Terminator::Branch { then_block, .. } if then_block == body_block.id
    ));
}

#[test]
fn code_after_return_is_unreachable() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let body = vec![b.ret(None), b.yield_return(b.int(1))];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    assert!(!graph.is_reachable(point.position.block));
    assert_eq!(graph.reachable_suspensions().count(), 0);
    assert!(graph.is_reachable(graph.return_exit));
}

#[test]
fn break_outside_loop_is_an_error() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let body = vec![b.break_()];
    let err = build_graph(&b.finish(body)).unwrap_err();
    assert!(matches!(err, LoweringError::JumpOutsideLoop { keyword: "break", .. }));
}

#[test]
fn unknown_variable_is_an_error() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let body = vec![b.expr_stmt(b.var(VarId(7)))];
    let err = build_graph(&b.finish(body)).unwrap_err();
    assert_eq!(err.to_string(), "variable #7 is not declared in this method");
}

#[test]
fn try_body_blocks_get_exceptional_edge_to_dispatch() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let e = b.local("e", StorageClass::Value);
    let body = vec![b.try_(
        vec![b.await_call("Work")],
        vec![b.catch(Some(e), None, vec![b.expr_stmt(b.var(e))])],
        None,
    )];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    assert_eq!(point.handler, HandlerContext::TryWithCatch);
    let block = graph.block(point.position.block);
    let dispatch = block.handler.expect("protected block has a handler");
    assert!(block
        .successors()
        .contains(&Edge { target: dispatch, kind: EdgeKind::Exceptional }));
    assert!(matches!(graph.block(dispatch).terminator, Terminator::Switch { .. }));
    assert_eq!(defs_of(&graph, e), 1);
    assert!(validate(&graph).is_ok());
}

#[test]
fn return_inside_try_routes_through_finally() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    let body = vec![
        b.decl(x, Some(b.int(1))),
        b.try_(
            vec![b.ret(None)],
            vec![],
            Some(vec![b.expr_stmt(b.var(x))]),
        ),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let finally_end = graph
        .blocks
        .iter()
        .find(|b| matches!(b.terminator, Terminator::EndFinally { .. }))
        .expect("finally body lowered");
    match &finally_end.terminator {
        Terminator::EndFinally { targets, unwind } => {
            assert!(targets.contains(&graph.return_exit));
            assert_eq!(*unwind, graph.throw_exit);
        }
        _ => unreachable!(),
    }
    // The finally body is lowered exactly once.
    let uses = instrs(&graph)
        .into_iter()
        .filter(|k| *k == InstrKind::Use(x))
        .count();
    assert_eq!(uses, 1);
}

#[test]
fn break_chains_through_nested_finally_bodies() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let body = vec![b.while_(
        b.bool_(true),
        vec![b.try_(
            vec![b.try_(vec![b.break_()], vec![], Some(vec![]))],
            vec![],
            Some(vec![]),
        )],
    )];
    let graph = build_graph(&b.finish(body)).unwrap();

    let ends: Vec<_> = graph
        .blocks
        .iter()
        .filter_map(|b| match &b.terminator {
            Terminator::EndFinally { targets, .. } => Some((b.id, targets.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(ends.len(), 2);
    // Finally bodies are empty, so each entry is also its end. The inner
    // finally hands the break to the outer one, which then leaves the loop.
    let chained: Vec<_> = ends
        .iter()
        .filter(|(_, targets)| ends.iter().any(|(id, _)| targets.contains(id)))
        .collect();
    assert_eq!(chained.len(), 1);
    let (inner, _) = chained[0];
    let (outer, outer_targets) = ends.iter().find(|(id, _)| id != inner).unwrap();
    assert!(graph.is_reachable(*outer));
    let Terminator::Goto { target: check } = graph.block(graph.entry).terminator else {
        panic!("expected goto into the loop check");
    };
    let Terminator::Branch { else_block: loop_exit, .. } = graph.block(check).terminator else {
        panic!("expected loop branch");
    };
    assert!(outer_targets.contains(&loop_exit));
    assert!(validate(&graph).is_ok());
}

#[test]
fn yield_in_finally_is_marked() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let body = vec![b.try_(vec![], vec![], Some(vec![b.yield_return(b.int(1))]))];
    let graph = build_graph(&b.finish(body)).unwrap();
    assert_eq!(graph.suspensions[0].handler, HandlerContext::Finally);
}

#[test]
fn await_using_suspends_in_disposal() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let r = b.local("r", StorageClass::Value);
    let body = vec![b.await_using(Some(r), b.call("Open", vec![]), vec![])];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    assert_eq!(point.kind, SuspendKind::Await);
    assert_eq!(point.handler, HandlerContext::Finally);
    let block = graph.block(point.position.block);
    assert_eq!(block.instrs[point.position.offset - 1].kind, InstrKind::Use(r));
}

#[test]
fn await_foreach_suspends_at_header() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let item = b.local("item", StorageClass::Value);
    let xs = b.local("xs", StorageClass::Value);
    let body = vec![b.await_foreach(item, b.var(xs), vec![b.expr_stmt(b.var(item))])];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    let header = graph.block(point.position.block);
    assert_eq!(point.position.offset, 0);
    assert!(matches!(header.terminator, Terminator::Branch { .. }));
    // Reached from the loop body again.
    let preds = graph.predecessors();
    assert_eq!(preds[header.id.index()].len(), 2);
}

#[test]
fn short_circuit_creates_join() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    let body = vec![b.expr_stmt(b.and(b.var(x), b.await_(b.call("F", vec![]))))];
    let graph = build_graph(&b.finish(body)).unwrap();

    let entry = graph.block(graph.entry);
    let Terminator::Branch { then_block, else_block } = entry.terminator else {
        panic!("expected branch");
    };
    assert_eq!(graph.suspensions[0].position.block, then_block);
    assert_eq!(
        graph.block(then_block).terminator,
        Terminator::Goto { target: else_block }
    );
}

#[test]
fn lambda_captures_are_uses() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let r = b.local("r", StorageClass::Ref);
    let body = vec![b.expr_stmt(b.lambda(vec![r], true))];
    let graph = build_graph(&b.finish(body)).unwrap();
    assert_eq!(instrs(&graph), vec![InstrKind::Use(r)]);
    assert!(graph.suspensions.is_empty());
}

#[test]
fn validate_rejects_detached_suspension() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let body = vec![b.await_call("F")];
    let mut graph = build_graph(&b.finish(body)).unwrap();
    graph.suspensions[0].position.offset += 1;
    assert_eq!(
        validate(&graph),
        Err(GraphError::StraySuspend(Position {
            block: graph.entry,
            offset: 0
        }))
    );
}

#[test]
fn validate_rejects_edge_out_of_range() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let mut graph = build_graph(&b.finish(vec![])).unwrap();
    graph.blocks[0].terminator = Terminator::Goto { target: BlockId(99) };
    assert!(matches!(
        validate(&graph),
        Err(GraphError::EdgeOutOfRange { to: BlockId(99), .. })
    ));
}

#[test]
fn display_lists_blocks_and_suspensions() {
    let b = MethodBuilder::new("Run", MethodKind::Async);
    let body = vec![b.await_call("F")];
    let graph = build_graph(&b.finish(body)).unwrap();
    let text = graph.to_string();
    assert!(text.starts_with("graph Run {"));
    assert!(text.contains("bb0: // entry"));
    assert!(text.contains("suspend s0"));
    assert!(text.contains("s0: await at bb0[0]"));
}

fn end_finally_targets(graph: &MethodGraph) -> Vec<BlockId> {
    graph
        .blocks
        .iter()
        .find_map(|b| match &b.terminator {
            Terminator::EndFinally { targets, .. } => Some(targets.clone()),
            _ => None,
        })
        .expect("finally body lowered")
}

#[test]
fn finally_entered_only_by_return_skips_the_join() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Ref);
    let body = vec![
        b.try_(vec![b.ret(None)], vec![], Some(vec![b.await_call("G")])),
        b.expr_stmt(b.var(x)),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    assert_eq!(end_finally_targets(&graph), vec![graph.return_exit]);
    let after = graph
        .blocks
        .iter()
        .find(|b| b.instrs.iter().any(|i| i.kind == InstrKind::Use(x)))
        .unwrap();
    assert!(!graph.is_reachable(after.id));
    assert_eq!(graph.reachable_suspensions().count(), 1);
}

#[test]
fn yield_after_try_that_breaks_out_is_unreachable() {
    let b = MethodBuilder::new("M", MethodKind::Iterator);
    let body = vec![
        b.try_(vec![b.yield_break()], vec![], Some(vec![])),
        b.yield_return(b.int(1)),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    assert_eq!(end_finally_targets(&graph), vec![graph.return_exit]);
    assert_eq!(graph.suspensions.len(), 1);
    assert_eq!(graph.reachable_suspensions().count(), 0);
}

#[test]
fn finally_that_returns_resumes_no_exit() {
    let b = MethodBuilder::new("M", MethodKind::Ordinary);
    let body = vec![b.while_(
        b.bool_(true),
        vec![b.try_(vec![b.break_()], vec![], Some(vec![b.ret(None)]))],
    )];
    let graph = build_graph(&b.finish(body)).unwrap();

    // The break is pending on the finally, but the finally never completes.
    let ends: Vec<_> = graph
        .blocks
        .iter()
        .filter_map(|b| match &b.terminator {
            Terminator::EndFinally { targets, .. } => Some(targets.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(ends, vec![Vec::<BlockId>::new()]);
    assert!(graph.is_reachable(graph.return_exit));
    assert!(validate(&graph).is_ok());
}

#[test]
fn rejected_filter_falls_through_to_next_clause() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let e = b.local("e", StorageClass::Value);
    let ok = b.local("ok", StorageClass::Value);
    let body = vec![
        b.decl(ok, Some(b.bool_(false))),
        b.try_(
            vec![b.await_call("Work")],
            vec![
                b.catch(Some(e), Some(b.var(ok)), vec![b.await_call("Log")]),
                b.catch(None, None, vec![]),
            ],
            None,
        ),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let targets = graph
        .blocks
        .iter()
        .find_map(|b| match &b.terminator {
            Terminator::Switch { targets } => Some(targets.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[2], graph.throw_exit);
    let Terminator::Branch { then_block, else_block } = graph.block(targets[0]).terminator else {
        panic!("filtered clause should branch on its filter");
    };
    assert_eq!(else_block, targets[1]);
    // The clause body runs only when the filter accepts.
    let log = &graph.suspensions[1];
    assert_eq!(log.position.block, then_block);
    assert_eq!(log.handler, HandlerContext::Catch);
    assert!(validate(&graph).is_ok());
}

#[test]
fn last_rejected_filter_propagates() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let ok = b.local("ok", StorageClass::Value);
    let body = vec![
        b.decl(ok, Some(b.bool_(true))),
        b.try_(
            vec![b.try_(
                vec![b.await_call("Work")],
                vec![b.catch(None, Some(b.var(ok)), vec![])],
                None,
            )],
            vec![],
            Some(vec![]),
        ),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let targets = graph
        .blocks
        .iter()
        .find_map(|b| match &b.terminator {
            Terminator::Switch { targets } => Some(targets.clone()),
            _ => None,
        })
        .unwrap();
    // Propagation goes to the enclosing finally, not out of the method.
    let finally_entry = targets[1];
    assert_ne!(finally_entry, graph.throw_exit);
    assert!(matches!(
        graph.block(finally_entry).terminator,
        Terminator::EndFinally { .. }
    ));
    let Terminator::Branch { else_block, .. } = graph.block(targets[0]).terminator else {
        panic!("filtered clause should branch on its filter");
    };
    assert_eq!(else_block, finally_entry);
}

#[test]
fn await_in_conditional_arm_is_guarded() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let c = b.local("c", StorageClass::Value);
    let body = vec![
        b.decl(c, Some(b.bool_(true))),
        b.expr_stmt(b.conditional(b.var(c), b.await_(b.call("F", vec![])), b.int(0))),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    assert_ne!(point.position.block, graph.entry);
    let Terminator::Branch { then_block, .. } = graph.block(graph.entry).terminator else {
        panic!("conditional should branch");
    };
    assert_eq!(point.position.block, then_block);
}

#[test]
fn await_in_coalesce_rhs_runs_only_on_null() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    let body = vec![
        b.decl(x, Some(b.null())),
        b.expr_stmt(b.coalesce(b.var(x), b.await_(b.call("F", vec![])))),
    ];
    let graph = build_graph(&b.finish(body)).unwrap();

    let point = &graph.suspensions[0];
    let Terminator::Branch { then_block: merge, else_block: rhs } =
        graph.block(graph.entry).terminator
    else {
        panic!("coalesce should branch");
    };
    assert_eq!(point.position.block, rhs);
    assert_eq!(
        graph.block(rhs).terminator,
        Terminator::Goto { target: merge }
    );
}

#[test]
fn duplicate_node_id_is_an_error() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let o = b.local("o", StorageClass::Value);
    let awaited = b.await_(b.call("F", vec![]));
    let shared = awaited.id;
    let mut inner = b.expr_stmt(b.int(1));
    inner.id = shared;
    let body = vec![
        b.decl(o, Some(b.call("Gate", vec![]))),
        b.unsafe_(vec![b.expr_stmt(awaited)]),
        b.lock(b.var(o), vec![inner]),
    ];
    let err = build_graph(&b.finish(body)).unwrap_err();
    assert!(matches!(err, LoweringError::DuplicateNode { node, .. } if node == shared));
}

#[test]
fn misnumbered_variable_table_is_an_error() {
    let b = MethodBuilder::new("M", MethodKind::Async);
    let x = b.local("x", StorageClass::Value);
    b.local("r", StorageClass::Ref);
    let body = vec![b.decl(x, Some(b.int(1))), b.await_call("F")];
    let mut method = b.finish(body);
    method.variables[1].id = x;

    let err = build_graph(&method).unwrap_err();
    assert!(matches!(
        err,
        LoweringError::MisnumberedVariable { index: 1, var, .. } if var == x
    ));
    assert_eq!(err.to_string(), "variable table entry 1 is numbered #0");
}
