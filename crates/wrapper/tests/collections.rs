mod common;

use common::{Recorded, Todo, TodoList};
use rstest::rstest;
use tracking::Scope;
use wrapper::collection::apply;
use wrapper::{CollectionEdit, ForView, ProxyValue};

fn titles(view: &ForView, items: &ProxyValue) -> Vec<String> {
    items
        .as_collection()
        .unwrap()
        .iter()
        .map(|item| {
            let todo = view.unwrap::<Todo>(item).unwrap();
            todo.title.get(&Scope::untracked())
        })
        .collect()
}

#[test]
fn removing_an_item_emits_a_single_remove() {
    // given
    let view = ForView::new();
    let list = TodoList::new(&["a", "b", "c"]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Items");
    proxy.get_value("Items").unwrap();

    // when
    list.items.remove(1);
    view.drain();

    // then
    let changed = recorded.take_collection_changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].member, "Items");
    assert_eq!(changed[0].edits, vec![CollectionEdit::Remove {
        index: 1
    }]);
    assert!(recorded.take_changed().is_empty());
}

#[test]
fn pushed_items_arrive_wrapped() {
    // given
    let view = ForView::new();
    let list = TodoList::new(&["a"]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Items");
    proxy.get_value("Items").unwrap();
    let todo = Todo::new("b");

    // when
    list.items.push(todo.clone());
    view.drain();

    // then
    let changed = recorded.take_collection_changed();
    assert_eq!(changed[0].edits, vec![CollectionEdit::Insert {
        index: 1,
        value: ProxyValue::Object(view.wrap(&todo)),
    }]);
}

#[test]
fn replacing_the_backing_list_emits_a_reset() {
    // given
    let view = ForView::new();
    let list = TodoList::new(&["a", "b"]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Items");
    proxy.get_value("Items").unwrap();
    let replacement = vec![Todo::new("x")];

    // when
    list.items.replace(replacement.clone());
    view.drain();

    // then
    let changed = recorded.take_collection_changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].edits, vec![CollectionEdit::Reset {
        items: vec![ProxyValue::Object(view.wrap(&replacement[0]))],
    }]);
}

#[test]
fn writing_a_collection_member_replaces_the_list() {
    // given
    let view = ForView::new();
    let list = TodoList::new(&[]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Tags");
    proxy.get_value("Tags").unwrap();

    // when
    proxy
        .set_value("Tags", ProxyValue::Collection(vec!["red".into(), "blue".into()]))
        .unwrap();
    view.drain();

    // then
    assert_eq!(list.tags.get(&Scope::untracked()), vec!["red".to_string(), "blue".to_string()]);
    let changed = recorded.take_collection_changed();
    assert!(matches!(changed[0].edits.as_slice(), [CollectionEdit::Reset { items }] if items.len() == 2));
}

#[test]
fn in_place_edit_emits_a_replace() {
    // given
    let view = ForView::new();
    let list = TodoList::new(&[]);
    list.tags.replace(vec!["a".to_string(), "b".to_string()]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Tags");
    proxy.get_value("Tags").unwrap();

    // when
    list.tags.set(1, "z".to_string());
    view.drain();

    // then
    let changed = recorded.take_collection_changed();
    assert_eq!(changed[0].edits, vec![CollectionEdit::Replace {
        index: 1,
        value: "z".into(),
    }]);
}

#[rstest]
#[case::remove_first(&[0])]
#[case::remove_several(&[3, 1, 0])]
#[case::remove_all(&[4, 3, 2, 1, 0])]
fn mirrored_items_follow_the_domain_list(#[case] removals: &[usize]) {
    // given
    let view = ForView::new();
    let list = TodoList::new(&["a", "b", "c", "d", "e"]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Items");
    let mut mirror = proxy
        .get_value("Items")
        .unwrap()
        .as_collection()
        .unwrap()
        .to_vec();

    // when
    for index in removals {
        list.items.remove(*index);
        view.drain();
    }
    list.items.insert(0, Todo::new("new"));
    view.drain();

    // then
    for event in recorded.take_collection_changed() {
        apply(&mut mirror, &event.edits);
    }
    let current = proxy.get_value("Items").unwrap();
    assert_eq!(ProxyValue::Collection(mirror), current);
    assert_eq!(titles(&view, &current)[0], "new");
}

#[test]
fn unchanged_items_are_not_reported() {
    // given
    let view = ForView::new();
    let list = TodoList::new(&["a"]);
    let proxy = view.wrap(&list);
    let recorded = Recorded::default();
    recorded.watch(&proxy, "Items");
    proxy.get_value("Items").unwrap();

    // when
    list.items.sentry().invalidate();
    view.drain();

    // then
    assert_eq!(proxy.status("Items").unwrap(), tracking::DependentStatus::Valid);
    assert!(recorded.take_collection_changed().is_empty());
}
