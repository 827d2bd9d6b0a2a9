//! Integration tests for the `versions` table.
//!
//! Run against a real database (`DATABASE_URL`):
//! - Ids increase and scope lookups to one entity
//! - Current/previous/list ordering follows id, newest first
//! - Purge removes one entity's history only
//! - The engine drives a full lifecycle through `PgVersionStore`

use std::any::Any;

use serde_json::json;
use sqlx::PgPool;
use versionable_core::memory::MemoryEntityStore;
use versionable_core::snapshot;
use versionable_core::types::Attributes;
use versionable_core::{
    EntityRef, NewVersion, Record, TypeRegistry, VersionAction, Versionable, Versioner,
};
use versionable_db::repositories::VersionRepo;
use versionable_db::PgVersionStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_version(entity: &EntityRef, action: VersionAction, name: &str) -> NewVersion {
    let mut attrs = Attributes::new();
    attrs.insert("name".into(), json!(name));
    NewVersion {
        entity: entity.clone(),
        action,
        user_id: Some(1),
        reason: Some("db test".to_string()),
        url: None,
        ip_address: Some("127.0.0.1".to_string()),
        user_agent: None,
        model_data: snapshot::serialize(&attrs).unwrap(),
        additional_data: snapshot::serialize_additional(Some(&json!({"ticket": 9}))).unwrap(),
    }
}

#[derive(Default)]
struct User {
    record: Record,
}

impl Versionable for User {
    fn type_tag(&self) -> &'static str {
        "user"
    }
    fn record(&self) -> &Record {
        &self.record
    }
    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Test: create returns the stored row
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_create_round_trips_all_columns(pool: PgPool) {
    let entity = EntityRef::new("user", 1);
    let input = new_version(&entity, VersionAction::SoftDelete, "Rodrigo");
    let version = VersionRepo::create(&pool, &input).await.unwrap();

    assert_eq!(version.entity_ref(), entity);
    assert_eq!(version.action, VersionAction::SoftDelete);
    assert_eq!(version.user_id, Some(1));
    assert_eq!(version.reason.as_deref(), Some("db test"));
    assert_eq!(version.ip_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(version.snapshot().unwrap()["name"], "Rodrigo");
    assert_eq!(version.additional_data().unwrap(), Some(json!({"ticket": 9})));

    let found = VersionRepo::find_by_id(&pool, &entity, version.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, version);
}

// ---------------------------------------------------------------------------
// Test: ordering and scoping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_current_previous_and_list_order(pool: PgPool) {
    let a = EntityRef::new("user", 1);
    let b = EntityRef::new("user", 2);

    let v1 = VersionRepo::create(&pool, &new_version(&a, VersionAction::Create, "one"))
        .await
        .unwrap();
    let other = VersionRepo::create(&pool, &new_version(&b, VersionAction::Create, "other"))
        .await
        .unwrap();
    let v3 = VersionRepo::create(&pool, &new_version(&a, VersionAction::Update, "three"))
        .await
        .unwrap();
    assert!(v1.id < other.id && other.id < v3.id);

    let current = VersionRepo::find_current(&pool, &a).await.unwrap().unwrap();
    assert_eq!(current.id, v3.id);
    let previous = VersionRepo::find_previous(&pool, &a).await.unwrap().unwrap();
    assert_eq!(previous.id, v1.id);

    let ids: Vec<i64> = VersionRepo::list_for_entity(&pool, &a, 50, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec![v3.id, v1.id]);

    assert_eq!(VersionRepo::count_for_entity(&pool, &a).await.unwrap(), 2);
    assert!(
        VersionRepo::find_by_id(&pool, &a, other.id)
            .await
            .unwrap()
            .is_none(),
        "find_by_id must not cross entities"
    );
}

// ---------------------------------------------------------------------------
// Test: purge
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_for_entity_purges_one_history(pool: PgPool) {
    let a = EntityRef::new("user", 1);
    let b = EntityRef::new("post", 1);
    for name in ["x", "y"] {
        VersionRepo::create(&pool, &new_version(&a, VersionAction::Update, name))
            .await
            .unwrap();
    }
    VersionRepo::create(&pool, &new_version(&b, VersionAction::Create, "z"))
        .await
        .unwrap();

    assert_eq!(VersionRepo::delete_for_entity(&pool, &a).await.unwrap(), 2);
    assert_eq!(VersionRepo::count_for_entity(&pool, &a).await.unwrap(), 0);
    assert_eq!(VersionRepo::count_for_entity(&pool, &b).await.unwrap(), 1);
    assert!(VersionRepo::find_current(&pool, &a).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: engine over Postgres
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_engine_lifecycle_over_postgres(pool: PgPool) {
    versionable_db::health_check(&pool).await.unwrap();

    let mut registry = TypeRegistry::new();
    registry.register::<User>();
    let versioner = Versioner::new(PgVersionStore::new(pool.clone()), registry);
    let entities = MemoryEntityStore::new();

    let mut user = User::default();
    user.record_mut().set("name", "Rodrigo");
    let first = versioner.save(&entities, &mut user).await.unwrap().unwrap();
    assert_eq!(first.action, VersionAction::Create);

    user.record_mut().set("name", "John");
    versioner.save(&entities, &mut user).await.unwrap();

    let key = user.entity_ref().unwrap();
    let diff = versioner.diff(&first, None).await.unwrap();
    assert_eq!(diff["name"], "Rodrigo");

    versioner.revert(&entities, &first).await.unwrap();
    let latest = versioner.current_version(&key).await.unwrap().unwrap();
    assert_eq!(latest.action, VersionAction::Update);
    assert_eq!(latest.snapshot().unwrap()["name"], "Rodrigo");

    let deleted = versioner.delete(&entities, &mut user).await.unwrap().unwrap();
    assert_eq!(deleted.action, VersionAction::Delete);
    assert_eq!(versioner.version_count(&key).await.unwrap(), 4);
}
