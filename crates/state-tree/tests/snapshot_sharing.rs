use serde_json::json;
use state_tree::{
    create_factory, get_snapshot, on_snapshot, transaction, types, Factory, Node, Snapshot,
};
use std::cell::RefCell;
use std::rc::Rc;

fn store() -> Node {
    let todo = create_factory("Todo", json!({"title": "", "done": false})).unwrap();
    Factory::model("Store")
        .prop("todos", types::array(&todo))
        .prop("owner", json!({"name": "", "email": ""}))
        .build()
        .unwrap()
        .create(
            Some(json!({"todos": [{"title": "a"}, {"title": "b"}], "owner": {"name": "ann"}})),
            None,
        )
        .unwrap()
}

#[test]
fn consecutive_snapshots_without_mutation_are_shared() {
    let store = store();
    let first = get_snapshot(&store);
    let second = get_snapshot(&store);
    assert!(first.ptr_eq(&second));
    assert!(first.get("owner").unwrap().ptr_eq(second.get("owner").unwrap()));
}

#[test]
fn mutation_only_rebuilds_the_changed_path() {
    let store = store();
    let before = get_snapshot(&store);
    store.resolve("/owner").unwrap().into_node().unwrap().set("email", "a@b.c").unwrap();
    let after = get_snapshot(&store);

    assert!(!before.ptr_eq(&after));
    assert!(!before.get("owner").unwrap().ptr_eq(after.get("owner").unwrap()));
    assert!(before.get("todos").unwrap().ptr_eq(after.get("todos").unwrap()));
    assert_eq!(after.get("owner").unwrap(), &json!({"name": "ann", "email": "a@b.c"}));
}

#[test]
fn snapshot_listener_fires_once_per_transaction() {
    let store = store();
    let seen: Rc<RefCell<Vec<Snapshot>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _disposer = on_snapshot(&store, move |snapshot| sink.borrow_mut().push(snapshot.clone()));

    transaction(|| {
        let todos = store.child("todos").unwrap();
        todos.child("0").unwrap().set("done", true).unwrap();
        todos.push(json!({"title": "c"})).unwrap();
        transaction(|| todos.remove("1").unwrap());
        assert!(seen.borrow().is_empty());
    });

    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(
        seen.borrow()[0],
        json!({
            "todos": [{"title": "a", "done": true}, {"title": "c", "done": false}],
            "owner": {"name": "ann", "email": ""}
        })
    );

    // A lone mutation is its own transaction.
    store.child("owner").unwrap().set("name", "bob").unwrap();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn disposed_snapshot_listener_is_silent() {
    let store = store();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let disposer = on_snapshot(&store, move |_| *counter.borrow_mut() += 1);
    store.child("owner").unwrap().set("name", "x").unwrap();
    assert!(disposer.dispose());
    store.child("owner").unwrap().set("name", "y").unwrap();
    assert_eq!(*calls.borrow(), 1);
}
