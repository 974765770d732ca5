use serde_json::{json, Value};
use state_tree::{
    apply_action, create_factory, get_snapshot, on_action, on_patch, record_actions, types,
    ActionCall, Factory, Node, Patch, StateError, StateTreeError,
};
use std::cell::RefCell;
use std::rc::Rc;

fn todo_type() -> Factory {
    Factory::model("Todo")
        .prop("title", "")
        .prop("done", false)
        .action("toggle", |node, _| {
            let done = node.get_value("done").and_then(|v| v.as_bool()).unwrap_or(false);
            node.set("done", !done)?;
            Ok(json!(!done))
        })
        .action("rename", |node, args| {
            let title = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| StateTreeError::action("rename expects a title"))?;
            node.set("title", title)?;
            Ok(Value::Null)
        })
        .build()
        .unwrap()
}

fn store() -> Node {
    Factory::model("Store")
        .prop("todos", types::array(&todo_type()))
        .action("add", |node, args| {
            let title = args.first().cloned().unwrap_or(json!(""));
            let todos = node.child("todos").ok_or_else(|| StateTreeError::action("no todos"))?;
            todos.push(json!({"title": title}))?;
            // Nested actions skip the middleware chain.
            let last = todos.child(&(todos.len() - 1).to_string()).unwrap();
            last.call_action("toggle", &[])?;
            Ok(json!(todos.len()))
        })
        .build()
        .unwrap()
        .create(Some(json!({"todos": [{"title": "milk"}]})), None)
        .unwrap()
}

#[test]
fn apply_action_resolves_path_and_returns_result() {
    let store = store();
    let result = apply_action(&store, &ActionCall::new("toggle", vec![]).at("/todos/0")).unwrap();
    assert_eq!(result, json!(true));
    assert_eq!(get_snapshot(&store), json!({"todos": [{"title": "milk", "done": true}]}));
}

#[test]
fn action_errors_propagate() {
    let store = store();
    let call = ActionCall::new("rename", vec![json!(1)]).at("/todos/0");
    let err = apply_action(&store, &call).unwrap_err();
    assert_eq!(err, StateTreeError::Action("rename expects a title".to_string()));
    let call = ActionCall::new("rename", vec![]).at("/todos/0/title");
    let err = apply_action(&store, &call).unwrap_err();
    assert!(matches!(err, StateTreeError::State(StateError::NotANode { .. })));
    let err = apply_action(&store, &ActionCall::new("fly", vec![])).unwrap_err();
    assert!(matches!(err, StateTreeError::State(StateError::UnknownAction { .. })));
}

#[test]
fn middleware_sees_root_actions_only_innermost_first() {
    let store = store();
    let log = Rc::new(RefCell::new(Vec::new()));

    let outer = log.clone();
    let _root = on_action(&store, move |call, next| {
        outer.borrow_mut().push(format!("store:{}@{}", call.name, call.path));
        next.call()
    });
    let todos = store.child("todos").unwrap();
    let inner = log.clone();
    let _todos = on_action(&todos, move |call, next| {
        inner.borrow_mut().push(format!("todos:{}@{}", call.name, call.path));
        next.call()
    });

    apply_action(&store, &ActionCall::new("toggle", vec![]).at("/todos/0")).unwrap();
    apply_action(&store, &ActionCall::new("add", vec![json!("eggs")])).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["todos:toggle@/0", "store:toggle@/todos/0", "store:add@"]
    );
    assert_eq!(
        get_snapshot(&store),
        json!({"todos": [{"title": "milk", "done": true}, {"title": "eggs", "done": true}]})
    );
}

#[test]
fn middleware_that_skips_next_prevents_side_effects() {
    let store = store();
    let patches = Rc::new(RefCell::new(Vec::<Patch>::new()));
    let sink = patches.clone();
    let _patches = on_patch(&store, move |patch| sink.borrow_mut().push(patch.clone()));
    let _guard = on_action(&store, |call, next| {
        if call.name == "toggle" {
            Ok(json!("denied"))
        } else {
            next.call()
        }
    });

    let result = apply_action(&store, &ActionCall::new("toggle", vec![]).at("/todos/0")).unwrap();
    assert_eq!(result, json!("denied"));
    assert!(patches.borrow().is_empty());
    assert_eq!(get_snapshot(&store), json!({"todos": [{"title": "milk", "done": false}]}));
}

#[test]
fn disposed_middleware_no_longer_intercepts() {
    let store = store();
    let blocker = on_action(&store, |_, _| Ok(Value::Null));
    assert!(blocker.dispose());
    let result = apply_action(&store, &ActionCall::new("toggle", vec![]).at("/todos/0")).unwrap();
    assert_eq!(result, json!(true));
}

#[test]
fn recorded_actions_replay_onto_another_instance() {
    let source = store();
    let mut recorder = record_actions(&source);
    apply_action(&source, &ActionCall::new("add", vec![json!("eggs")])).unwrap();
    source
        .child("todos")
        .unwrap()
        .child("0")
        .unwrap()
        .call_action("rename", &[json!("oat milk")])
        .unwrap();
    recorder.stop();
    apply_action(&source, &ActionCall::new("add", vec![json!("ignored")])).unwrap();

    let recorded = recorder.actions();
    assert_eq!(
        recorded,
        vec![
            ActionCall::new("add", vec![json!("eggs")]),
            ActionCall::new("rename", vec![json!("oat milk")]).at("/todos/0"),
        ]
    );

    let target = store();
    recorder.replay(&target).unwrap();
    assert_eq!(
        get_snapshot(&target),
        json!({"todos": [{"title": "oat milk", "done": false}, {"title": "eggs", "done": true}]})
    );
}

#[test]
fn action_mutations_notify_snapshot_listeners_once() {
    let store = store();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let _listener = state_tree::on_snapshot(&store, move |_| *counter.borrow_mut() += 1);
    apply_action(&store, &ActionCall::new("add", vec![json!("bread")])).unwrap();
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn standalone_node_runs_its_own_actions() {
    let todo = todo_type().create(None, None).unwrap();
    assert_eq!(todo.call_action("toggle", &[]).unwrap(), json!(true));
    let unused = create_factory("Unused", json!({"x": 1})).unwrap();
    assert!(unused.action("toggle").is_none());
}
