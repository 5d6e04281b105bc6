//! # Delta Scenarios
//!
//! For an original record and a mutated copy, the delta computed between
//! them is sent through its byte format and applied to the original; the
//! result must equal the mutated copy. Each scenario also checks the delta
//! is minimal.

use docbin::delta::{delta_field_names, CollectionDelta, ListOp, MapOp, RidOp};
use docbin::{
    apply_delta, compute_delta, deserialize_delta, serialize_delta, CodecContext, Delta, DeltaOp,
    Record, RecordId, RecordSerializer, RidSet, StorageSerializer, Value,
};
use indexmap::IndexMap;

/// Computes, ships and applies a delta, returning it for inspection.
fn round_trip(original: &Record, current: &Record) -> Delta {
    let ctx = CodecContext::default();
    let delta = compute_delta(original, current, &ctx).unwrap();
    let bytes = serialize_delta(&delta, &ctx).unwrap();
    let received = deserialize_delta(&bytes, &ctx).unwrap();
    assert_eq!(received, delta);

    let applied = apply_delta(original, &received, &ctx).unwrap();
    assert_eq!(&applied, current);
    delta
}

fn stored(record: &Record) -> Record {
    let ctx = CodecContext::default();
    let bytes = StorageSerializer.serialize(record, &ctx).unwrap();
    StorageSerializer.deserialize(&bytes, &ctx).unwrap()
}

#[test]
fn add_top_level_field() {
    let original = stored(&Record::with_class("Person").with("name", "name"));
    let mut current = original.clone();
    current.set("email", "a@b.c");

    let delta = round_trip(&original, &current);
    assert_eq!(
        delta.ops,
        vec![DeltaOp::SetField {
            name: "email".into(),
            value: "a@b.c".into()
        }]
    );
}

#[test]
fn remove_existing_field() {
    let original = stored(&Record::new().with("name", "name").with("age", 20i32));
    let mut current = original.clone();
    current.remove("age");

    let delta = round_trip(&original, &current);
    assert_eq!(delta.ops, vec![DeltaOp::RemoveField { name: "age".into() }]);
}

#[test]
fn mutate_one_element_of_nested_list() {
    let original = stored(&Record::new().with(
        "profile",
        Record::new().with(
            "aliases",
            Value::EmbeddedList(vec!["a".into(), "b".into(), "c".into()]),
        ),
    ));
    let mut current = original.clone();
    let profile = current.field_mut("profile").and_then(Value::as_record_mut).unwrap();
    if let Some(Value::EmbeddedList(aliases)) = profile.field_mut("aliases") {
        aliases[1] = "B".into();
    }

    let delta = round_trip(&original, &current);
    let [DeltaOp::NestedDelta { delta: nested, .. }] = delta.ops.as_slice() else {
        panic!("expected one nested delta, got {:?}", delta.ops);
    };
    assert_eq!(
        nested.ops,
        vec![DeltaOp::UpdateCollection {
            name: "aliases".into(),
            change: CollectionDelta::EmbeddedList(vec![ListOp::Set {
                index: 1,
                value: "B".into()
            }]),
        }]
    );
}

#[test]
fn add_and_remove_nested_map_entries() {
    let mut settings = IndexMap::new();
    settings.insert("theme".to_string(), Value::from("dark"));
    settings.insert("lang".to_string(), Value::from("en"));
    let original = stored(&Record::new().with(
        "account",
        Record::new().with("settings", Value::EmbeddedMap(settings)),
    ));

    let mut current = original.clone();
    let account = current.field_mut("account").and_then(Value::as_record_mut).unwrap();
    if let Some(Value::EmbeddedMap(settings)) = account.field_mut("settings") {
        settings.shift_remove("lang");
        settings.insert("tz".to_string(), Value::from("UTC"));
    }

    let delta = round_trip(&original, &current);
    let [DeltaOp::NestedDelta { delta: nested, .. }] = delta.ops.as_slice() else {
        panic!("expected one nested delta, got {:?}", delta.ops);
    };
    assert_eq!(
        nested.ops,
        vec![DeltaOp::UpdateCollection {
            name: "settings".into(),
            change: CollectionDelta::EmbeddedMap(vec![
                MapOp::Put {
                    key: "tz".into(),
                    value: "UTC".into()
                },
                MapOp::Remove { key: "lang".into() },
            ]),
        }]
    );
}

#[test]
fn link_bag_symmetric_difference() {
    let a = RecordId::new(10, 1);
    let b = RecordId::new(10, 2);
    let c = RecordId::new(12, 7);
    let original = stored(&Record::new().with("friends", [a, b].into_iter().collect::<RidSet>()));
    let current = Record::new().with("friends", [a, c].into_iter().collect::<RidSet>());

    let delta = round_trip(&original, &current);
    assert_eq!(
        delta.ops,
        vec![DeltaOp::UpdateCollection {
            name: "friends".into(),
            change: CollectionDelta::LinkBag(vec![RidOp::Add(c), RidOp::Remove(b)]),
        }]
    );
}

#[test]
fn explicit_null_differs_from_removal() {
    let original = stored(&Record::new().with("nick", "Ada").with("age", 20i32));

    let mut nulled = original.clone();
    nulled.set("nick", Value::Null);
    let mut removed = original.clone();
    removed.remove("nick");

    let null_delta = round_trip(&original, &nulled);
    let remove_delta = round_trip(&original, &removed);
    assert_ne!(null_delta, remove_delta);

    let ctx = CodecContext::default();
    let applied = apply_delta(&original, &null_delta, &ctx).unwrap();
    assert_eq!(applied.field("nick"), Some(&Value::Null));
    assert!(applied.contains("nick"));
    assert!(!apply_delta(&original, &remove_delta, &ctx).unwrap().contains("nick"));

    // Null survives a storage round trip as well.
    assert_eq!(stored(&applied).field("nick"), Some(&Value::Null));
}

#[test]
fn unchanged_fields_produce_no_operations() {
    let original = stored(&Record::with_class("Person").with("name", "name").with("age", 20i32));
    let mut current = original.clone();
    current.set("name", "other");

    let delta = round_trip(&original, &current);
    assert_eq!(delta.len(), 1);
    assert_eq!(delta.field_names().collect::<Vec<_>>(), vec!["name"]);

    let bytes = serialize_delta(&delta, &CodecContext::default()).unwrap();
    assert_eq!(delta_field_names(&bytes).unwrap(), vec!["name"]);
}

#[test]
fn shrinking_and_growing_lists() {
    let original = stored(&Record::new().with(
        "l",
        Value::EmbeddedList(vec!["a".into(), "b".into(), "b".into(), "c".into()]),
    ));

    let shorter = Record::new().with("l", Value::EmbeddedList(vec!["a".into(), "b".into()]));
    round_trip(&original, &shorter);

    let longer = Record::new().with(
        "l",
        Value::EmbeddedList(vec!["z".into(), "b".into(), "b".into(), "c".into(), "d".into()]),
    );
    round_trip(&original, &longer);
}

#[test]
fn container_kind_change_is_a_replacement() {
    let original = stored(&Record::new().with("v", Value::EmbeddedList(vec![1i32.into()])));
    let current = Record::new().with("v", Value::EmbeddedSet(vec![1i32.into()]));
    let delta = round_trip(&original, &current);
    assert!(matches!(delta.ops.as_slice(), [DeltaOp::SetField { .. }]));
}

#[test]
fn class_change_is_carried() {
    let original = stored(&Record::with_class("Draft").with("title", "t"));
    let mut current = original.clone();
    current.set_class_name(Some("Post".into()));
    let delta = round_trip(&original, &current);
    assert!(delta.ops.is_empty());
    assert_eq!(delta.class_name.as_deref(), Some("Post"));
}

#[test]
fn link_list_diffs_by_position() {
    let [a, b, c, d] = [1, 2, 3, 4].map(|p| Value::Link(RecordId::new(7, p)));
    let original = stored(&Record::new().with(
        "follows",
        Value::LinkList(vec![a.clone(), b.clone(), c.clone()]),
    ));
    let current = Record::new().with(
        "follows",
        Value::LinkList(vec![a, c.clone(), b.clone(), d.clone()]),
    );

    let delta = round_trip(&original, &current);
    assert_eq!(
        delta.ops,
        vec![DeltaOp::UpdateCollection {
            name: "follows".into(),
            change: CollectionDelta::LinkList(vec![
                ListOp::Set { index: 1, value: c },
                ListOp::Set { index: 2, value: b },
                ListOp::Insert(d),
            ]),
        }]
    );
}

#[test]
fn link_list_shrink_removes_loaded_record() {
    let kept = RecordId::new(5, 1);
    let dropped = RecordId::new(5, 2);
    let loaded = Record::new().with("n", 1i32).with_identity(dropped);
    let original = Record::new().with(
        "l",
        Value::LinkList(vec![Value::Link(kept), loaded.into()]),
    );
    let current = Record::new().with("l", Value::LinkList(vec![Value::Link(kept)]));

    let delta = round_trip(&original, &current);
    assert_eq!(
        delta.ops,
        vec![DeltaOp::UpdateCollection {
            name: "l".into(),
            change: CollectionDelta::LinkList(vec![ListOp::Remove(Value::Link(dropped))]),
        }]
    );
    let applied = apply_delta(&original, &delta, &CodecContext::default()).unwrap();
    assert_eq!(stored(&applied), stored(&current));
}

#[test]
fn link_map_puts_and_removes_by_key() {
    let [a, b, c] = [1, 2, 3].map(|p| Value::Link(RecordId::new(8, p)));
    let mut before = IndexMap::new();
    before.insert("x".to_string(), a);
    before.insert("y".to_string(), b.clone());
    let original = stored(&Record::new().with("named", Value::LinkMap(before)));

    let mut after = IndexMap::new();
    after.insert("x".to_string(), c.clone());
    after.insert("z".to_string(), b.clone());
    let current = Record::new().with("named", Value::LinkMap(after));

    let delta = round_trip(&original, &current);
    assert_eq!(
        delta.ops,
        vec![DeltaOp::UpdateCollection {
            name: "named".into(),
            change: CollectionDelta::LinkMap(vec![
                MapOp::Put {
                    key: "x".into(),
                    value: c
                },
                MapOp::Put {
                    key: "z".into(),
                    value: b
                },
                MapOp::Remove { key: "y".into() },
            ]),
        }]
    );
}

#[test]
fn link_set_diffs_through_rids() {
    let a = RecordId::new(9, 1);
    let b = RecordId::new(9, 2);
    let c = RecordId::new(9, 3);
    let loaded = Record::new().with("n", 1i32).with_identity(a);
    let original = Record::new().with(
        "owners",
        Value::LinkSet(vec![loaded.into(), Value::Link(b)]),
    );
    let current = Record::new().with(
        "owners",
        Value::LinkSet(vec![Value::Link(b), Value::Link(c)]),
    );

    let delta = round_trip(&original, &current);
    assert_eq!(
        delta.ops,
        vec![DeltaOp::UpdateCollection {
            name: "owners".into(),
            change: CollectionDelta::LinkSet(vec![RidOp::Add(c), RidOp::Remove(a)]),
        }]
    );
}

#[test]
fn link_set_with_null_or_duplicate_is_replaced() {
    let a = Value::Link(RecordId::new(9, 1));
    let original = stored(&Record::new().with("owners", Value::LinkSet(vec![a.clone()])));

    for items in [vec![a.clone(), Value::Null], vec![a.clone(), a.clone()]] {
        let current = Record::new().with("owners", Value::LinkSet(items.clone()));
        let delta = round_trip(&original, &current);
        assert_eq!(
            delta.ops,
            vec![DeltaOp::SetField {
                name: "owners".into(),
                value: Value::LinkSet(items)
            }]
        );
    }
}
