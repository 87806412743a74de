//! Integration tests for tether-store
//!
//! These tests drive the public store API end to end: entities, tags,
//! interaction types, scores, groups and merging.

use tether_domain::{
    ContactData, DecaySettings, DecayType, EmailAddress, EntitySort, EntityType, EntityUpdate,
    InteractionEdit, InteractionTypeTemplate, ListOptions, NewEntity, PhoneNumber,
};
use tether_store::{SqliteStore, StoreError};

const DAY_MS: i64 = 86_400_000;

fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

fn person(store: &mut SqliteStore, name: &str) -> tether_domain::EntityId {
    store.create_entity(NewEntity::new(name, EntityType::Person)).unwrap()
}

fn now() -> i64 {
    tether_domain::score::now_millis()
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_create_and_get_entity() {
    let mut store = store();
    let id = store
        .create_entity(NewEntity::new("  Alice  ", EntityType::Person).with_details("Met at climbing"))
        .unwrap();

    let alice = store.get_entity(id).unwrap().unwrap();
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.entity_type, EntityType::Person);
    assert_eq!(alice.details.as_deref(), Some("Met at climbing"));
    assert_eq!(alice.interaction_score, 0.0);
    assert_eq!(alice.created_at, alice.updated_at);
}

#[test]
fn test_empty_name_rejected() {
    let mut store = store();
    let result = store.create_entity(NewEntity::new("   ", EntityType::Topic));
    assert!(matches!(result, Err(StoreError::InvalidData(_))));
}

#[test]
fn test_duplicate_with_same_phone_returns_first() {
    let mut store = store();
    let contact = ContactData {
        phone_numbers: vec![PhoneNumber::new("+1 (555) 123-4567")],
        ..Default::default()
    };
    let first = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_contact(contact))
        .unwrap();

    let again = ContactData {
        phone_numbers: vec![PhoneNumber::new("15551234567")],
        ..Default::default()
    };
    let second = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_contact(again))
        .unwrap();
    assert_eq!(first, second);

    // Same name with unrelated details is a different person
    let other = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_details("555-987-6543"))
        .unwrap();
    assert_ne!(first, other);

    let all = store.list_entities(&ListOptions::default()).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_duplicate_found_among_several_numbers() {
    let mut store = store();
    let first = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_details("5551234567 5559876543"))
        .unwrap();
    let second = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_details("5551234567"))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.list_entities(&ListOptions::default()).unwrap().len(), 1);
}

#[test]
fn test_duplicate_requires_same_type() {
    let mut store = store();
    let a = store
        .create_entity(NewEntity::new("Climbing", EntityType::Group).with_details("bob@example.com"))
        .unwrap();
    let b = store
        .create_entity(NewEntity::new("Climbing", EntityType::Topic).with_details("bob@example.com"))
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_contact_only_entity_gets_summary_details() {
    let mut store = store();
    let contact = ContactData {
        emails: vec![EmailAddress::new("alice@example.com")],
        birthday: Some("1990-04-12".to_string()),
        ..Default::default()
    };
    let id = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_contact(contact.clone()))
        .unwrap();

    let alice = store.get_entity(id).unwrap().unwrap();
    assert!(alice.details.unwrap().contains("alice@example.com"));
    assert_eq!(store.contact_data(id).unwrap(), contact);
    assert_eq!(store.birthday(id).unwrap().as_deref(), Some("1990-04-12"));
}

#[test]
fn test_search_by_name_tag_and_contact() {
    let mut store = store();
    let alice = person(&mut store, "Alice Smith");
    let bob = store
        .create_entity(NewEntity::new("Bob", EntityType::Person).with_contact(ContactData {
            phone_numbers: vec![PhoneNumber::new("(555) 123 4567")],
            ..Default::default()
        }))
        .unwrap();
    store.create_entity(NewEntity::new("Smithing", EntityType::Topic)).unwrap();
    store.add_tag_to_entity(alice, "climbing").unwrap();

    let by_name = store.search_entities("smith", None).unwrap();
    assert_eq!(by_name.len(), 2);
    assert_eq!(by_name[0].name, "Alice Smith");

    let people = store.search_entities("smith", Some(EntityType::Person)).unwrap();
    assert_eq!(people.len(), 1);

    let by_tag = store.search_entities("CLIMB", None).unwrap();
    assert_eq!(by_tag.iter().map(|e| e.id).collect::<Vec<_>>(), vec![alice]);

    let by_phone = store.search_entities("555-123", None).unwrap();
    assert_eq!(by_phone.iter().map(|e| e.id).collect::<Vec<_>>(), vec![bob]);

    assert!(store.search_entities("   ", None).unwrap().is_empty());
    assert!(store.search_entities("100%", None).unwrap().is_empty());
}

#[test]
fn test_update_entity() {
    let mut store = store();
    let id = person(&mut store, "Alice");
    let before = store.get_entity(id).unwrap().unwrap();

    store
        .update_entity(
            id,
            EntityUpdate {
                name: Some("Alicia".to_string()),
                details: Some(None),
                ..Default::default()
            },
        )
        .unwrap();

    let after = store.get_entity(id).unwrap().unwrap();
    assert_eq!(after.name, "Alicia");
    assert_eq!(after.details, None);
    assert!(after.updated_at >= before.updated_at);

    let missing = store.update_entity(tether_domain::EntityId::from_value(999), EntityUpdate::default());
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[test]
fn test_corrupt_contact_blob_is_repaired() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tether.db");
    let id = {
        let mut store = SqliteStore::new(&path).unwrap();
        person(&mut store, "Alice")
    };

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE entities SET encrypted_data = '{not json' WHERE id = ?1",
        [id.value()],
    )
    .unwrap();
    drop(conn);

    let mut store = SqliteStore::new(&path).unwrap();
    let contact = store.contact_data(id).unwrap();
    assert_eq!(contact, ContactData::default());

    let alice = store.get_entity(id).unwrap().unwrap();
    assert!(ContactData::parse(alice.contact_blob.as_deref().unwrap()).is_ok());
}

#[test]
fn test_tag_counts_follow_links() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let bob = person(&mut store, "Bob");

    store.add_tag_to_entity(alice, "Climbing").unwrap();
    store.add_tag_to_entity(bob, "climbing").unwrap();
    store.add_tag_to_entity(bob, "  Climbing ").unwrap();

    let tag = store.find_tag_by_name("CLIMBING").unwrap().unwrap();
    assert_eq!(tag.name, "Climbing");
    assert_eq!(tag.count, 2);

    assert!(store.remove_tag_from_entity(alice, "climbing").unwrap());
    assert!(!store.remove_tag_from_entity(alice, "climbing").unwrap());
    assert_eq!(store.find_tag_by_name("climbing").unwrap().unwrap().count, 1);

    store.delete_entity(bob).unwrap();
    assert!(store.find_tag_by_name("climbing").unwrap().is_none());
    assert!(store.list_tags().unwrap().is_empty());
}

#[test]
fn test_new_tag_gets_starter_types() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    store.add_tag_to_entity(alice, "Family").unwrap();

    let names: Vec<String> = store
        .entity_interaction_types(alice)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert!(names.contains(&"Family Dinner".to_string()));
    assert!(names.contains(&"Call".to_string()));

    // Not offered to an untagged person
    let bob = person(&mut store, "Bob");
    let bob_types = store.entity_interaction_types(bob).unwrap();
    assert!(bob_types.iter().all(|t| t.name != "Family Dinner"));
}

#[test]
fn test_group_tags_are_inherited_by_members() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let team = store.create_entity(NewEntity::new("Team", EntityType::Group)).unwrap();
    store.add_tag_to_entity(team, "work").unwrap();
    assert!(store.add_group_member(team, alice).unwrap());
    assert!(!store.add_group_member(team, alice).unwrap());

    let alice_types = store.entity_interaction_types(alice).unwrap();
    assert!(alice_types.iter().any(|t| t.name == "Work Meeting"));

    // A group offers the types of its members' tags
    store.add_tag_to_entity(alice, "book club").unwrap();
    let team_types = store.entity_interaction_types(team).unwrap();
    assert!(team_types.iter().any(|t| t.name == "Book Club"));

    let mut ids: Vec<_> = team_types.iter().map(|t| t.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), team_types.len());
}

#[test]
fn test_restricted_type_only_offered_to_its_entity_type() {
    let mut store = store();
    let topic = store.create_entity(NewEntity::new("Rust", EntityType::Topic)).unwrap();
    let alice = person(&mut store, "Alice");
    let template = InteractionTypeTemplate::new("Read Article", "book").restricted_to(&[EntityType::Topic]);
    store.create_interaction_type(&template, &[]).unwrap();

    assert!(store
        .entity_interaction_types(topic)
        .unwrap()
        .iter()
        .any(|t| t.name == "Read Article"));
    assert!(store
        .entity_interaction_types(alice)
        .unwrap()
        .iter()
        .all(|t| t.name != "Read Article"));
}

#[test]
fn test_group_operations_require_group() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let bob = person(&mut store, "Bob");
    let result = store.add_group_member(alice, bob);
    assert!(matches!(result, Err(StoreError::NotAGroup(_))));

    let team = store.create_entity(NewEntity::new("Team", EntityType::Group)).unwrap();
    assert!(matches!(store.add_group_member(team, team), Err(StoreError::InvalidData(_))));

    store.add_group_member(team, alice).unwrap();
    store.add_group_member(team, bob).unwrap();
    assert_eq!(store.group_members(team).unwrap().len(), 2);
    assert_eq!(store.groups_of(alice).unwrap()[0].id, team);

    assert!(store.remove_group_member(team, bob).unwrap());
    assert_eq!(store.group_members(team).unwrap().len(), 1);
}

#[test]
fn test_group_interaction_fans_out_to_members() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let bob = person(&mut store, "Bob");
    let friends = store.create_entity(NewEntity::new("Friends", EntityType::Group)).unwrap();
    store.add_group_member(friends, alice).unwrap();
    store.add_group_member(friends, bob).unwrap();

    store
        .create_interaction_type(&InteractionTypeTemplate::new("Birthday", "gift").with_score(5), &[])
        .unwrap();
    store.record_interaction(friends, "birthday", None, None).unwrap();

    for id in [alice, bob, friends] {
        let entity = store.get_entity(id).unwrap().unwrap();
        assert_eq!(entity.interaction_score, 5.0, "score of {}", entity.name);
        let logs = store.interaction_logs(id, None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].type_name, "Birthday");
    }
}

#[test]
fn test_unknown_interaction_type_counts_once() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    store.record_interaction(alice, "Skydiving", None, Some("first jump")).unwrap();
    store.record_interaction(alice, "Call", None, None).unwrap();

    let alice_entity = store.get_entity(alice).unwrap().unwrap();
    assert_eq!(alice_entity.interaction_score, 3.0);

    let logs = store.interaction_logs(alice, Some(10)).unwrap();
    let skydive = logs.iter().find(|i| i.type_name == "Skydiving").unwrap();
    assert!(skydive.type_id.is_none());
    assert_eq!(skydive.notes.as_deref(), Some("first jump"));
    assert_eq!(store.interaction_color(skydive).unwrap(), "#9E9E9E");

    let call = logs.iter().find(|i| i.type_name == "Call").unwrap();
    assert_eq!(store.interaction_color(call).unwrap(), "#4CAF50");
}

#[test]
fn test_exponential_decay_score() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    store
        .create_interaction_type(&InteractionTypeTemplate::new("Dinner", "restaurant").with_score(10), &[])
        .unwrap();
    store
        .record_interaction(alice, "Dinner", Some(now() - 10 * DAY_MS), None)
        .unwrap();

    let recomputed = store
        .update_settings(DecaySettings::new(0.1, DecayType::Exponential))
        .unwrap();
    assert_eq!(recomputed, 1);

    let score = store.get_entity(alice).unwrap().unwrap().interaction_score;
    assert!((score - 3.6788).abs() < 0.01, "score was {}", score);

    let undecayed = store.calculate_score(alice, &DecaySettings::default()).unwrap();
    assert_eq!(undecayed, 10.0);
    assert_eq!(store.settings().unwrap().decay_type, DecayType::Exponential);
}

#[test]
fn test_invalid_settings_rejected() {
    let mut store = store();
    let result = store.update_settings(DecaySettings::new(-1.0, DecayType::Linear));
    assert!(matches!(result, Err(StoreError::InvalidData(_))));
    assert_eq!(store.settings().unwrap(), DecaySettings::default());
}

#[test]
fn test_edit_and_delete_interaction_recompute_score() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let id = store.record_interaction(alice, "Message", None, None).unwrap();
    assert_eq!(store.get_entity(alice).unwrap().unwrap().interaction_score, 1.0);

    let edited = store
        .edit_interaction(
            id,
            InteractionEdit {
                type_name: Some("meeting".to_string()),
                notes: Some(Some("planning".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(edited.type_name, "Meeting");
    assert_eq!(store.get_entity(alice).unwrap().unwrap().interaction_score, 3.0);

    store.delete_interaction(id).unwrap();
    assert_eq!(store.get_entity(alice).unwrap().unwrap().interaction_score, 0.0);
    assert!(store.interaction_logs(alice, None).unwrap().is_empty());
}

#[test]
fn test_activity_buckets() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let bob = person(&mut store, "Bob");
    // 2024-01-01T10:00:00Z and 2024-02-03T10:00:00Z
    let jan = 1_704_103_200_000;
    let feb = 1_706_954_400_000;
    store.record_interaction(alice, "Call", Some(jan), None).unwrap();
    store.record_interaction(alice, "Call", Some(jan + 3_600_000), None).unwrap();
    store.record_interaction(bob, "Call", Some(feb), None).unwrap();

    let days = store.interaction_counts_by_day(Some(alice)).unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].period, "2024-01-01");
    assert_eq!(days[0].count, 2);

    let months = store.interaction_counts_by_month(None).unwrap();
    let summary: Vec<(String, u32)> = months.into_iter().map(|b| (b.period, b.count)).collect();
    assert_eq!(summary, vec![("2024-01".to_string(), 2), ("2024-02".to_string(), 1)]);
}

#[test]
fn test_list_sorting_and_favorites() {
    let mut store = store();
    let alice = person(&mut store, "alice");
    let bob = person(&mut store, "Bob");
    let carol = person(&mut store, "Carol");
    store.record_interaction(carol, "Call", Some(now() - DAY_MS), None).unwrap();
    store.record_interaction(bob, "Call", None, None).unwrap();

    let by_name = store.list_entities(&ListOptions::default()).unwrap();
    assert_eq!(by_name.iter().map(|e| e.id).collect::<Vec<_>>(), vec![alice, bob, carol]);

    let recent = store
        .list_entities(&ListOptions { sort: EntitySort::RecentInteraction, ..Default::default() })
        .unwrap();
    assert_eq!(recent.iter().map(|e| e.id).collect::<Vec<_>>(), vec![bob, carol, alice]);

    assert!(store.toggle_favorite(carol).unwrap());
    assert!(store.is_favorite(carol).unwrap());
    let favorites_first = store
        .list_entities(&ListOptions { favorites_first: true, limit: Some(2), ..Default::default() })
        .unwrap();
    assert_eq!(favorites_first.iter().map(|e| e.id).collect::<Vec<_>>(), vec![carol, alice]);
    assert_eq!(store.favorites().unwrap().len(), 1);

    assert!(!store.toggle_favorite(carol).unwrap());
    assert!(store.favorites().unwrap().is_empty());
}

#[test]
fn test_delete_entity_cascades() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let team = store.create_entity(NewEntity::new("Team", EntityType::Group)).unwrap();
    store.add_group_member(team, alice).unwrap();
    store.record_interaction(alice, "Call", None, None).unwrap();
    store.add_photo(alice, "https://example.com/a.jpg", Some("hiking"), None).unwrap();
    store.toggle_favorite(alice).unwrap();

    store.delete_entity(alice).unwrap();
    assert!(store.get_entity(alice).unwrap().is_none());
    assert!(store.group_members(team).unwrap().is_empty());
    assert!(store.favorites().unwrap().is_empty());
    assert!(matches!(store.delete_entity(alice), Err(StoreError::NotFound(_))));
}

#[test]
fn test_photos() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let first = store.add_photo(alice, "file:///tmp/a.jpg", None, Some(1_000)).unwrap();
    store.add_photo(alice, "file:///tmp/b.jpg", Some("beach"), Some(2_000)).unwrap();

    let photos = store.photos(alice).unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].caption.as_deref(), Some("beach"));

    assert!(store.delete_photo(first).unwrap());
    assert!(!store.delete_photo(first).unwrap());
    assert!(matches!(store.add_photo(alice, "  ", None, None), Err(StoreError::InvalidData(_))));
}

#[test]
fn test_merge_unions_and_removes_source() {
    let mut store = store();
    let source = store
        .create_entity(NewEntity::new("Al", EntityType::Person).with_contact(ContactData {
            emails: vec![EmailAddress::new("al@example.com")],
            ..Default::default()
        }))
        .unwrap();
    let target = store
        .create_entity(NewEntity::new("Alice", EntityType::Person).with_contact(ContactData {
            phone_numbers: vec![PhoneNumber::new("555-123-4567")],
            ..Default::default()
        }))
        .unwrap();
    let team = store.create_entity(NewEntity::new("Team", EntityType::Group)).unwrap();

    store.add_tag_to_entity(source, "climbing").unwrap();
    store.add_tag_to_entity(source, "work").unwrap();
    store.add_tag_to_entity(target, "work").unwrap();
    store.add_group_member(team, source).unwrap();
    store.record_interaction(source, "Call", None, None).unwrap();
    store.record_interaction(target, "Message", None, None).unwrap();
    store.add_photo(source, "https://example.com/al.jpg", None, None).unwrap();
    store.toggle_favorite(source).unwrap();

    let summary = store.merge_entities(source, target).unwrap();
    assert_eq!(summary.interactions, 1);
    assert_eq!(summary.photos, 1);
    assert_eq!(summary.tags, 1);
    assert_eq!(summary.memberships, 1);

    assert!(store.get_entity(source).unwrap().is_none());
    let merged = store.get_entity(target).unwrap().unwrap();
    assert_eq!(merged.interaction_score, 3.0);

    let tag_names: Vec<String> = store.entity_tags(target).unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(tag_names, vec!["climbing".to_string(), "work".to_string()]);
    assert_eq!(store.find_tag_by_name("work").unwrap().unwrap().count, 1);

    let contact = store.contact_data(target).unwrap();
    assert_eq!(contact.emails.len(), 1);
    assert_eq!(contact.phone_numbers.len(), 1);

    assert_eq!(store.interaction_logs(target, None).unwrap().len(), 2);
    assert_eq!(store.photos(target).unwrap().len(), 1);
    assert_eq!(store.group_members(team).unwrap()[0].id, target);
    assert!(store.is_favorite(target).unwrap());
}

#[test]
fn test_merge_rejects_type_mismatch() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let team = store.create_entity(NewEntity::new("Team", EntityType::Group)).unwrap();
    store.record_interaction(alice, "Call", None, None).unwrap();

    let result = store.merge_entities(alice, team);
    assert!(matches!(
        result,
        Err(StoreError::TypeMismatch { source_type: EntityType::Person, target_type: EntityType::Group })
    ));
    assert_eq!(store.interaction_logs(alice, None).unwrap().len(), 1);
    assert!(matches!(store.merge_entities(alice, alice), Err(StoreError::InvalidData(_))));
}

#[test]
fn test_interaction_type_crud() {
    let mut store = store();
    let alice = person(&mut store, "Alice");
    let tag = store.add_tag_to_entity(alice, "chess").unwrap();

    let id = store
        .create_interaction_type(&InteractionTypeTemplate::new("Blitz", "game-controller").with_color("#000000"), &[tag])
        .unwrap();
    let blitz = store.interaction_type(id).unwrap().unwrap();
    assert_eq!(blitz.tag_ids, vec![tag]);
    assert_eq!(blitz.score, 1);

    store
        .update_interaction_type(id, &InteractionTypeTemplate::new("Rapid", "game-controller").with_score(4))
        .unwrap();
    assert_eq!(store.interaction_type(id).unwrap().unwrap().name, "Rapid");

    assert!(store.unlink_interaction_type_tag(id, tag).unwrap());
    assert!(store.interaction_type(id).unwrap().unwrap().tag_ids.is_empty());
    assert!(store.link_interaction_type_tag(id, tag).unwrap());

    store.record_interaction(alice, "Rapid", None, None).unwrap();
    store.delete_interaction_type(id).unwrap();
    assert!(store.interaction_type(id).unwrap().is_none());
    let logs = store.interaction_logs(alice, None).unwrap();
    assert_eq!(logs[0].type_name, "Rapid");
    assert!(logs[0].type_id.is_none());
}

/// File-backed store plus a second connection for installing failure triggers
fn store_on_disk(dir: &tempfile::TempDir) -> (SqliteStore, rusqlite::Connection) {
    let path = dir.path().join("tether.db");
    let store = SqliteStore::new(&path).unwrap();
    let side = rusqlite::Connection::open(&path).unwrap();
    (store, side)
}

#[test]
fn test_group_fan_out_rolls_back_when_a_member_insert_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, side) = store_on_disk(&dir);
    let alice = person(&mut store, "Alice");
    let bob = person(&mut store, "Bob");
    let friends = store.create_entity(NewEntity::new("Friends", EntityType::Group)).unwrap();
    store.add_group_member(friends, alice).unwrap();
    store.add_group_member(friends, bob).unwrap();
    store.record_interaction(alice, "Call", None, None).unwrap();

    side.execute_batch(&format!(
        "CREATE TRIGGER refuse_member_interaction BEFORE INSERT ON interactions
         WHEN NEW.entity_id = {} BEGIN SELECT RAISE(ABORT, 'refused'); END;",
        bob.value()
    ))
    .unwrap();

    let result = store.record_interaction(friends, "Call", None, None);
    assert!(matches!(result, Err(StoreError::Database(_))));

    assert!(store.interaction_logs(friends, None).unwrap().is_empty());
    assert_eq!(store.interaction_logs(alice, None).unwrap().len(), 1);
    assert!(store.interaction_logs(bob, None).unwrap().is_empty());
    assert_eq!(store.get_entity(friends).unwrap().unwrap().interaction_score, 0.0);
    assert_eq!(store.get_entity(alice).unwrap().unwrap().interaction_score, 2.0);
    assert_eq!(store.get_entity(bob).unwrap().unwrap().interaction_score, 0.0);
}

#[test]
fn test_merge_rolls_back_when_source_delete_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, side) = store_on_disk(&dir);
    let source = person(&mut store, "Al");
    let target = person(&mut store, "Alice");
    store.add_tag_to_entity(source, "climbing").unwrap();
    store.record_interaction(source, "Call", None, None).unwrap();
    store.add_photo(source, "https://example.com/al.jpg", None, None).unwrap();
    let target_before = store.get_entity(target).unwrap().unwrap();

    side.execute_batch(&format!(
        "CREATE TRIGGER refuse_source_delete BEFORE DELETE ON entities
         WHEN OLD.id = {} BEGIN SELECT RAISE(ABORT, 'refused'); END;",
        source.value()
    ))
    .unwrap();

    assert!(store.merge_entities(source, target).is_err());

    assert!(store.get_entity(source).unwrap().is_some());
    assert_eq!(store.interaction_logs(source, None).unwrap().len(), 1);
    assert!(store.interaction_logs(target, None).unwrap().is_empty());
    assert_eq!(store.photos(source).unwrap().len(), 1);
    assert!(store.photos(target).unwrap().is_empty());
    assert_eq!(store.entity_tags(source).unwrap().len(), 1);
    assert!(store.entity_tags(target).unwrap().is_empty());
    assert_eq!(store.find_tag_by_name("climbing").unwrap().unwrap().count, 1);
    assert_eq!(store.get_entity(target).unwrap().unwrap(), target_before);
}

#[test]
fn test_out_of_range_timestamps_rejected() {
    let mut store = store();
    let alice = person(&mut store, "Alice");

    let result = store.record_interaction(alice, "Call", Some(i64::MIN), None);
    assert!(matches!(result, Err(StoreError::InvalidData(_))));
    assert!(store.interaction_logs(alice, None).unwrap().is_empty());

    let id = store.record_interaction(alice, "Call", None, None).unwrap();
    let edit = InteractionEdit { timestamp: Some(i64::MAX), ..Default::default() };
    assert!(matches!(store.edit_interaction(id, edit), Err(StoreError::InvalidData(_))));
    assert_eq!(store.get_entity(alice).unwrap().unwrap().interaction_score, 2.0);
}

#[test]
fn test_favorites_repair_corrupt_contact_blob() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, side) = store_on_disk(&dir);
    let alice = person(&mut store, "Alice");
    store.toggle_favorite(alice).unwrap();

    side.execute(
        "UPDATE entities SET encrypted_data = '{not json' WHERE id = ?1",
        [alice.value()],
    )
    .unwrap();

    let favorites = store.favorites().unwrap();
    assert_eq!(favorites.len(), 1);
    let blob = favorites[0].contact_blob.as_deref().unwrap();
    assert_eq!(ContactData::parse(blob).unwrap(), ContactData::default());

    let stored: String = side
        .query_row("SELECT encrypted_data FROM entities WHERE id = ?1", [alice.value()], |row| row.get(0))
        .unwrap();
    assert!(ContactData::parse(&stored).is_ok());
}
