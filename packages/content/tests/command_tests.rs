//! Structural, attribute, link and resource commands

use mindmap_content::{CommandKind, Content, ContentEvent, IdeaId, IdeaOptions, Propagation, Rank};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn content(json: Value) -> Content {
    Content::new(json, None).unwrap()
}

fn record(content: &mut Content) -> Rc<RefCell<Vec<ContentEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    content.add_event_listener("changed resourceStored", move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(Propagation::Continue)
    });
    events
}

fn changed(method: CommandKind, args: Vec<Value>) -> ContentEvent {
    ContentEvent::Changed {
        method,
        args: Some(args),
        session: None,
    }
}

fn rank_of(content: &Content, parent: impl Into<IdeaId>, child: impl Into<IdeaId>) -> Option<Rank> {
    content.find_by_id(parent)?.child_rank(child)
}

// ---- addSubIdea ----------------------------------------------------------

#[test]
fn test_add_sub_idea_assigns_next_id_and_rank() {
    let mut content = content(json!({ "id": 71, "title": "My Idea" }));
    let events = record(&mut content);

    assert_eq!(content.add_sub_idea(71, Some("New idea"), None), Some(IdeaId::from(72)));
    assert_eq!(rank_of(&content, 71, 72), Some(Rank::from(1)));
    assert_eq!(content.find_by_id(72).unwrap().title, "New idea");
    assert_eq!(
        *events.borrow(),
        vec![changed(CommandKind::AddSubIdea, vec![json!(71), json!("New idea"), json!(72)])]
    );
}

#[test]
fn test_add_sub_idea_below_second_level_appends_after_siblings() {
    let mut content = content(json!({
        "id": 1,
        "ideas": { "1": { "id": 5, "ideas": { "5": { "id": 2 }, "10": { "id": 3 }, "15": { "id": 4 } } } }
    }));
    assert_eq!(content.add_sub_idea(5, Some("x"), None), Some(IdeaId::from(6)));
    assert_eq!(rank_of(&content, 5, 6), Some(Rank::from(16)));
    assert_eq!(content.add_sub_idea(5, Some("y"), None), Some(IdeaId::from(7)));
    assert_eq!(rank_of(&content, 5, 7), Some(Rank::from(17)));
}

#[test]
fn test_add_sub_idea_balances_children_of_root_ideas() {
    let mut content = content(json!({ "id": 1 }));
    let first = content.add_sub_idea(1, None, None).unwrap();
    let second = content.add_sub_idea(1, None, None).unwrap();
    let third = content.add_sub_idea(1, None, None).unwrap();

    assert_eq!(rank_of(&content, 1, first), Some(Rank::from(1)));
    assert_eq!(rank_of(&content, 1, second), Some(Rank::from(-1)));
    assert_eq!(rank_of(&content, 1, third), Some(Rank::from(2)));
}

#[test]
fn test_add_sub_idea_with_explicit_id() {
    let mut content = content(json!({ "id": 71, "title": "My Idea" }));
    assert_eq!(content.add_sub_idea(71, Some("x"), None), Some(IdeaId::from(72)));
    assert_eq!(content.add_sub_idea(72, Some("T"), Some(555.into())), Some(IdeaId::from(555)));
    assert_eq!(content.add_sub_idea(555, Some("y"), None), Some(IdeaId::from(556)));
}

#[test]
fn test_add_sub_idea_appends_session_key() {
    let mut content = Content::new(json!({ "id": 71, "title": "My Idea" }), Some("session")).unwrap();
    assert_eq!(content.add_sub_idea(71, None, None), Some(IdeaId::from("72.session")));
}

#[test]
fn test_add_sub_idea_failures_change_nothing() {
    let mut content = content(json!({ "id": 71, "title": "My Idea" }));
    let before = content.document().snapshot();
    let events = record(&mut content);

    assert_eq!(content.add_sub_idea(71, Some("X"), Some(71.into())), None);
    assert_eq!(content.add_sub_idea(99, Some("X"), None), None);
    assert_eq!(content.document(), &before);
    assert!(events.borrow().is_empty());
    assert!(!content.can_undo());
}

// ---- removeSubIdea -------------------------------------------------------

fn linked_map() -> Content {
    content(json!({
        "id": 1,
        "ideas": {
            "1": { "id": 2, "ideas": { "1": { "id": 31 } } },
            "2": { "id": 32 },
            "3": { "id": 4 }
        },
        "links": [
            { "ideaIdFrom": 31, "ideaIdTo": 32 },
            { "ideaIdFrom": 32, "ideaIdTo": 4 }
        ]
    }))
}

#[test]
fn test_remove_sub_idea_drops_subtree_and_its_links() {
    let mut content = linked_map();
    let before = content.document().snapshot();

    assert!(content.remove_sub_idea(2));
    assert!(!content.contains(2));
    assert!(!content.contains(31));
    assert_eq!(content.links().len(), 1);
    assert_eq!(content.links()[0].idea_id_from, IdeaId::from(32));

    assert!(content.undo());
    assert_eq!(content.document(), &before);
}

#[test]
fn test_cannot_remove_last_root_idea() {
    let mut content = content(json!({ "id": 1 }));
    assert!(!content.remove_sub_idea(1));
    assert!(content.contains(1));
}

#[test]
fn test_root_idea_can_be_removed_while_others_remain() {
    let mut content = content(json!({
        "formatVersion": 3,
        "id": "root",
        "ideas": { "1": { "id": 1 }, "2": { "id": 2 } }
    }));
    assert!(content.remove_sub_idea(1));
    assert!(!content.remove_sub_idea(2));
    assert_eq!(content.get_default_root_id(), Some(IdeaId::from(2)));
}

#[test]
fn test_remove_multiple_is_one_undo_step() {
    let mut content = linked_map();
    let before = content.document().snapshot();
    let events = record(&mut content);

    assert_eq!(content.remove_multiple(&[2.into(), 4.into(), 99.into()]), vec![true, true, false]);
    assert_eq!(events.borrow().len(), 1);
    assert!(matches!(
        &events.borrow()[0],
        ContentEvent::Changed { method: CommandKind::Batch, .. }
    ));

    assert!(content.undo());
    assert_eq!(content.document(), &before);
    assert!(!content.can_undo());
}

// ---- changeParent --------------------------------------------------------

fn nested_map() -> Content {
    content(json!({
        "id": 1,
        "ideas": {
            "1": { "id": 2, "ideas": { "1": { "id": 3 } } },
            "2": { "id": 4, "attr": { "position": [10, 20, 1] } }
        }
    }))
}

#[test]
fn test_change_parent_moves_idea_and_clears_position() {
    let mut content = nested_map();
    let before = content.document().snapshot();

    assert!(content.change_parent(4, 2));
    assert_eq!(rank_of(&content, 2, 4), Some(Rank::from(2)));
    assert!(!content.find_by_id(1).unwrap().contains_direct_child(4));
    assert_eq!(content.get_attr_by_id(4, "position"), None);

    assert!(content.undo());
    assert_eq!(content.document(), &before);
    assert_eq!(content.get_attr_by_id(4, "position"), Some(json!([10, 20, 1])));
}

#[test]
fn test_change_parent_rejects_invalid_moves() {
    let mut content = nested_map();
    let before = content.document().snapshot();
    let events = record(&mut content);

    assert!(!content.change_parent(2, 2));
    assert!(!content.change_parent(2, 3));
    assert!(!content.change_parent(3, 2));
    assert!(!content.change_parent(99, 2));
    assert!(!content.change_parent(3, 99));

    assert_eq!(content.document(), &before);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_change_parent_demotes_root_idea() {
    let mut content = content(json!({
        "formatVersion": 3,
        "id": "root",
        "ideas": { "1": { "id": 1 }, "2": { "id": 2 } }
    }));
    assert!(content.change_parent(2, 1));
    assert!(!content.is_root_node(2));
    assert_eq!(content.find_parent(2).map(|idea| idea.id.clone()), Some(IdeaId::from(1)));
}

// ---- insertIntermediate --------------------------------------------------

#[test]
fn test_insert_intermediate_wraps_idea_in_place() {
    let mut content = content(json!({ "id": 1, "ideas": { "77": { "id": 2 }, "88": { "id": 3 } } }));
    let before = content.document().snapshot();
    let events = record(&mut content);

    let wrapper = content.insert_intermediate(2, Some("Steve"), None).unwrap();
    assert_eq!(wrapper, IdeaId::from(4));
    assert_eq!(rank_of(&content, 1, 4), Some(Rank::from(77)));
    assert_eq!(rank_of(&content, 4, 2), Some(Rank::from(1)));
    assert_eq!(content.find_by_id(4).unwrap().title, "Steve");
    assert_eq!(
        *events.borrow(),
        vec![changed(CommandKind::InsertIntermediate, vec![json!(2), json!("Steve"), json!(4)])]
    );

    assert!(content.undo());
    assert_eq!(content.document(), &before);
}

#[test]
fn test_insert_intermediate_checks_ids() {
    let mut content = content(json!({ "id": 1, "ideas": { "77": { "id": 2 } } }));
    assert_eq!(content.insert_intermediate(2, Some("x"), Some(777.into())), Some(IdeaId::from(777)));
    assert_eq!(content.insert_intermediate(2, Some("x"), Some(1.into())), None);
    assert_eq!(content.insert_intermediate("root", Some("x"), None), None);
    assert_eq!(content.insert_intermediate(99, Some("x"), None), None);
}

#[test]
fn test_insert_intermediate_above_root_idea() {
    let mut content = content(json!({ "id": 1, "ideas": { "1": { "id": 2 } } }));
    let top = content.insert_intermediate(1, Some("top"), None).unwrap();
    assert!(content.is_root_node(&top));
    assert_eq!(content.find_parent(1).map(|idea| idea.id.clone()), Some(top));
}

#[test]
fn test_insert_intermediate_multiple_groups_ideas() {
    let mut content = content(json!({
        "id": 1,
        "ideas": { "1": { "id": 2, "ideas": { "1": { "id": 5 }, "2": { "id": 6 }, "3": { "id": 7 } } } }
    }));
    let before = content.document().snapshot();
    let options = IdeaOptions {
        title: Some("group".to_string()),
        attr: json!({ "group": true }).as_object().cloned(),
    };

    let group = content.insert_intermediate_multiple(&[5.into(), 6.into()], &options).unwrap();
    assert_eq!(group, IdeaId::from(8));
    assert_eq!(rank_of(&content, 2, 8), Some(Rank::from(1)));
    assert_eq!(rank_of(&content, 8, 5), Some(Rank::from(1)));
    assert_eq!(rank_of(&content, 8, 6), Some(Rank::from(2)));
    assert_eq!(content.get_attr_by_id(8, "group"), Some(json!(true)));
    assert_eq!(content.find_by_id(8).unwrap().title, "group");

    assert!(content.undo());
    assert_eq!(content.document(), &before);
    assert!(content.insert_intermediate_multiple(&[], &options).is_none());
}

// ---- paste ---------------------------------------------------------------

fn paste_target(session: Option<&str>) -> Content {
    Content::new(json!({ "id": 1, "ideas": { "-10": { "id": 3 }, "-15": { "id": 4 } } }), session).unwrap()
}

#[test]
fn test_paste_reassigns_ids() {
    let mut content = paste_target(None);
    let events = record(&mut content);
    let copied = json!({ "title": "pasted", "id": 1, "ideas": { "1": { "id": 66, "title": "sub sub" } } });

    assert_eq!(content.paste(3, copied.clone(), None), Some(IdeaId::from(5)));
    assert_eq!(rank_of(&content, 3, 5), Some(Rank::from(1)));
    assert_eq!(rank_of(&content, 5, 6), Some(Rank::from(1)));
    assert_eq!(content.find_by_id(6).unwrap().title, "sub sub");
    assert_eq!(*events.borrow(), vec![changed(CommandKind::Paste, vec![json!(3), copied, json!(5)])]);
}

#[test]
fn test_paste_uses_session_of_instance_or_explicit_id() {
    let mut content = paste_target(Some("sess"));
    assert_eq!(content.paste(3, json!({ "title": "a" }), None), Some(IdeaId::from("5.sess")));

    let copied = json!({ "title": "b", "ideas": { "1": { "title": "c" } } });
    assert_eq!(content.paste(3, copied, Some("781.abc".into())), Some(IdeaId::from("781.abc")));
    assert!(content.contains("782.abc"));

    let mut plain = paste_target(None);
    assert_eq!(plain.paste(3, json!({ "title": "d" }), Some(777.into())), Some(IdeaId::from(777)));
}

#[test]
fn test_paste_with_non_numeric_id_continues_numbering() {
    let mut content = paste_target(None);
    assert_eq!(content.paste(3, json!({ "title": "p" }), Some("abc".into())), Some(IdeaId::from(5)));
    assert_eq!(content.add_sub_idea(1, None, None), Some(IdeaId::from(6)));
}

#[test]
fn test_paste_rejects_ids_that_collide_below_the_explicit_one() {
    let mut content = paste_target(None);
    let before = content.document().snapshot();
    let events = record(&mut content);

    let copied = json!({ "title": "b", "ideas": { "1": { "title": "c" } } });
    assert_eq!(content.paste(3, copied, Some(2.into())), None);
    assert_eq!(content.document(), &before);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_paste_reranks_children_in_sibling_order() {
    let mut content = paste_target(None);
    let pasted = content
        .paste(
            3,
            json!({
                "title": "pasted",
                "ideas": {
                    "77": { "id": 10, "title": "77" },
                    "1": { "id": 11, "title": "1" },
                    "-77": { "id": 12, "title": "-77" },
                    "-1": { "id": 13, "title": "-1" }
                }
            }),
            None,
        )
        .unwrap();

    let titles: Vec<_> = content
        .find_by_id(pasted)
        .unwrap()
        .ideas
        .iter()
        .map(|(rank, idea)| (rank.value(), idea.title.clone()))
        .collect();
    assert_eq!(
        titles,
        vec![
            (1.0, "1".to_string()),
            (2.0, "77".to_string()),
            (3.0, "-1".to_string()),
            (4.0, "-77".to_string())
        ]
    );
}

#[test]
fn test_paste_strips_non_cloned_attributes() {
    let mut content = paste_target(None);
    content.set_configuration(serde_json::from_value(json!({ "nonClonedAttributes": ["noncloned", "xnoncloned"] })).unwrap());

    let pasted = content
        .paste(
            3,
            json!({
                "title": "pasted",
                "attr": { "cloned": "ok", "noncloned": "notok", "position": [1, 2, 3] },
                "ideas": {
                    "1": {
                        "title": "child",
                        "attr": { "xcloned": "ok", "noncloned": "notok", "xnoncloned": "notok" },
                        "ideas": { "1": { "title": "grandchild", "attr": { "noncloned": "notok" } } }
                    }
                }
            }),
            None,
        )
        .unwrap();

    let root = content.find_by_id(&pasted).unwrap();
    assert_eq!(root.attr, json!({ "cloned": "ok" }).as_object().cloned());
    let child = &root.ideas[&Rank::from(1)];
    assert_eq!(child.attr, json!({ "xcloned": "ok" }).as_object().cloned());
    assert!(child.ideas[&Rank::from(1)].attr.is_none());
}

#[test]
fn test_paste_into_document_creates_root_idea() {
    let mut content = paste_target(None);
    let pasted = content.paste("root", json!({ "title": "second map" }), None).unwrap();
    assert!(content.is_root_node(pasted));
}

#[test]
fn test_paste_failures() {
    let mut content = paste_target(None);
    let events = record(&mut content);

    assert_eq!(content.paste(-3, json!({ "title": "x" }), None), None);
    assert_eq!(content.paste(1, Value::Null, None), None);
    assert_eq!(content.paste(1, json!({ "id": 5 }), None), None);
    assert!(events.borrow().is_empty());

    assert!(content.paste(1, json!({ "title": "", "attr": { "x": "y" } }), None).is_some());
}

#[test]
fn test_paste_multiple_is_one_undo_step() {
    let mut content = paste_target(None);
    let before = content.document().snapshot();

    let pasted = content.paste_multiple(3, vec![json!({ "title": "a" }), json!({ "title": "b" }), Value::Null]);
    assert_eq!(pasted, vec![Some(IdeaId::from(5)), Some(IdeaId::from(6)), None]);

    assert!(content.undo());
    assert_eq!(content.document(), &before);
}

// ---- attributes ----------------------------------------------------------

#[test]
fn test_update_attr_sets_and_removes() {
    let mut content = content(json!({ "id": 1 }));
    let events = record(&mut content);

    assert!(content.update_attr(1, "style", json!({ "background": "red" })));
    assert!(!content.update_attr(1, "style", json!({ "background": "red" })));
    assert_eq!(content.get_attr_by_id(1, "style"), Some(json!({ "background": "red" })));

    assert!(content.update_attr(1, "style", json!(false)));
    assert!(content.find_by_id(1).unwrap().attr.is_none());
    assert!(!content.update_attr(1, "style", json!("false")));
    assert!(!content.update_attr(99, "style", json!(true)));

    assert_eq!(
        *events.borrow(),
        vec![
            changed(CommandKind::UpdateAttr, vec![json!(1), json!("style"), json!({ "background": "red" })]),
            changed(CommandKind::UpdateAttr, vec![json!(1), json!("style"), json!(false)])
        ]
    );
}

#[test]
fn test_update_attr_removal_values() {
    let mut content = content(json!({ "id": 1, "attr": { "a": 1, "b": 2, "c": 3, "d": 4 } }));
    assert!(content.update_attr(1, "a", json!("false")));
    assert!(content.update_attr(1, "b", json!({})));
    assert!(content.update_attr(1, "c", Value::Null));
    assert_eq!(content.find_by_id(1).unwrap().attr, json!({ "d": 4 }).as_object().cloned());

    assert!(content.undo());
    assert!(content.undo());
    assert!(content.undo());
    assert_eq!(content.get_attr_by_id(1, "a"), Some(json!(1)));
}

#[test]
fn test_update_attr_on_document_wrapper() {
    let mut content = content(json!({ "id": 1 }));
    assert!(content.update_attr("root", "theme", json!("dark")));
    assert_eq!(content.get_attr_by_id("root", "theme"), Some(json!("dark")));
}

#[test]
fn test_merge_attr_property() {
    let mut content = content(json!({ "id": 1, "attr": { "style": { "color": "red" } } }));

    assert!(content.merge_attr_property(1, "style", "background", json!("blue")));
    assert_eq!(content.get_attr_by_id(1, "style"), Some(json!({ "color": "red", "background": "blue" })));

    assert!(content.merge_attr_property(1, "style", "color", json!(false)));
    assert_eq!(content.get_attr_by_id(1, "style"), Some(json!({ "background": "blue" })));

    assert!(content.merge_attr_property(1, "style", "background", Value::Null));
    assert!(content.find_by_id(1).unwrap().attr.is_none());

    assert!(!content.merge_attr_property(1, "style", "background", Value::Null));
    assert!(content.merge_attr_property(1, "other", "x", json!(1)));
    assert_eq!(content.get_attr_by_id(1, "other"), Some(json!({ "x": 1 })));
}

// ---- links ---------------------------------------------------------------

fn link_map() -> Content {
    content(json!({
        "id": 1,
        "ideas": { "1": { "id": 2, "ideas": { "1": { "id": 3 } } }, "2": { "id": 4 } }
    }))
}

#[test]
fn test_add_link_with_default_style() {
    let mut content = link_map();
    assert!(content.add_link(2, 4));

    let link = &content.links()[0];
    assert_eq!((link.idea_id_from.clone(), link.idea_id_to.clone()), (IdeaId::from(2), IdeaId::from(4)));
    assert_eq!(
        content.get_link_attr(2, 4, "style"),
        Some(json!({ "color": "#FF0000", "lineStyle": "dashed" }))
    );
}

#[test]
fn test_add_link_rejects_invalid_pairs() {
    let mut content = link_map();
    assert!(content.add_link(2, 4));

    assert!(!content.add_link(4, 2));
    assert!(!content.add_link(2, 4));
    assert!(!content.add_link(2, 2));
    assert!(!content.add_link(2, 3));
    assert!(!content.add_link(3, 2));
    assert!(!content.add_link(2, 99));
    assert_eq!(content.links().len(), 1);

    // grandparent to grandchild is fine
    assert!(content.add_link(1, 3));
}

#[test]
fn test_remove_link_is_directional() {
    let mut content = link_map();
    assert!(content.add_link(2, 4));

    assert!(!content.remove_link(4, 2));
    assert!(content.remove_link(2, 4));
    assert!(content.links().is_empty());

    assert!(content.undo());
    assert!(content.find_link(2, 4).is_some());
}

#[test]
fn test_update_link_attr() {
    let mut content = link_map();
    assert!(content.add_link(2, 4));

    assert!(content.update_link_attr(2, 4, "style", json!({ "color": "blue" })));
    assert_eq!(content.get_link_attr(2, 4, "style"), Some(json!({ "color": "blue" })));
    assert_eq!(content.get_link_attr(4, 2, "style"), None);
    assert!(!content.update_link_attr(4, 2, "style", json!({ "color": "green" })));
    assert!(!content.update_link_attr(2, 4, "style", json!({ "color": "blue" })));

    assert!(content.undo());
    assert_eq!(
        content.get_link_attr(2, 4, "style"),
        Some(json!({ "color": "#FF0000", "lineStyle": "dashed" }))
    );
}

#[test]
fn test_undo_add_link_removes_exactly_that_link() {
    let mut content = link_map();
    assert!(content.add_link(2, 4));
    assert!(content.exec_command("addLink", &[json!(1), json!(3)], Some("other")).is_success());

    assert!(content.undo());
    assert_eq!(content.links().len(), 1);
    assert!(content.find_link(1, 3).is_some());
}

// ---- resources -----------------------------------------------------------

#[test]
fn test_store_resource_generates_sequential_keys() {
    let mut content = content(json!({ "id": 1 }));
    let events = record(&mut content);

    let first = content.store_resource(Rc::new(json!({ "data": 1 })), None).unwrap();
    let second = content.store_resource(Rc::new(json!({ "data": 2 })), None).unwrap();

    assert!(first.starts_with("1/"));
    assert!(first.ends_with('/'));
    assert!(second.starts_with("2/"));
    assert_eq!(first.len(), second.len());
    assert_eq!(events.borrow().len(), 2);
}

#[test]
fn test_store_resource_reuses_key_for_equal_body() {
    let mut content = content(json!({ "id": 1 }));
    let body = Rc::new(json!({ "data": 1 }));
    let key = content.store_resource(Rc::clone(&body), None).unwrap();
    let events = record(&mut content);

    assert_eq!(content.store_resource(Rc::clone(&body), None), Some(key.clone()));
    assert_eq!(content.store_resource(Rc::new(json!({ "data": 1 })), None), Some(key));
    assert!(events.borrow().is_empty());
}

#[test]
fn test_store_resource_keeps_reference() {
    let mut content = content(json!({ "id": 1 }));
    let events = record(&mut content);
    let body = Rc::new(json!({ "big": "payload" }));

    let key = content.store_resource(Rc::clone(&body), Some("explicit")).unwrap();
    assert_eq!(key, "explicit");
    assert!(Rc::ptr_eq(&content.get_resource("explicit").unwrap(), &body));

    match &events.borrow()[0] {
        ContentEvent::ResourceStored { body: stored, key, session } => {
            assert!(Rc::ptr_eq(stored, &body));
            assert_eq!(key, "explicit");
            assert_eq!(session, &None);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(!content.can_undo());
}

#[test]
fn test_store_resource_counts_per_session() {
    let mut content = Content::new(
        json!({
            "id": 1,
            "resources": { "5/abc/sess": { "a": 1 }, "9/abc/other": { "b": 1 } }
        }),
        Some("sess"),
    )
    .unwrap();

    let key = content.store_resource(Rc::new(json!({ "c": 1 })), None).unwrap();
    assert!(key.starts_with("6/"));
    assert!(key.ends_with("/sess"));
}

#[test]
fn test_store_resource_by_name() {
    let mut content = content(json!({ "id": 1 }));
    let outcome = content.exec_command("storeResource", &[json!({ "x": 1 }), json!("k")], None);
    assert_eq!(outcome.resource_key(), Some("k".to_string()));
    assert_eq!(content.get_resource("k").as_deref(), Some(&json!({ "x": 1 })));
}
