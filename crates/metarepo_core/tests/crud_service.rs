mod common;

use common::{Fixture, Issue, Project};
use metarepo_core::repo::sql_repository::FIND_ONE_BY_ID;
use metarepo_core::{
    id_to_key, Attributes, Cache, CacheConfig, CacheProvider, CacheRegistry, CallContext,
    CrudService, RepoError,
};
use rusqlite::types::Value;

fn registry() -> CacheRegistry {
    let registry = CacheRegistry::new(CacheProvider::Sharded);
    registry.register(CacheConfig::new("projects", 100, 0));
    registry.register(CacheConfig::new("issues", 100, 0));
    registry
}

#[test]
fn get_by_id_reads_through_the_cache() {
    let fixture = Fixture::new();
    let service = CrudService::new(fixture.projects(), registry().named_cache("projects"));
    let ctx = CallContext::background();

    let id = service.create(&ctx, &mut Project::new("Demo", 1)).unwrap();

    let first = service.get_by_id(&ctx, id).unwrap();
    let second = service.get_by_id(&ctx, id).unwrap();
    assert_eq!(first.name, "Demo");
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.metrics.executions("Project", FIND_ONE_BY_ID), 1);
}

#[test]
fn missing_id_is_not_cached() {
    let fixture = Fixture::new();
    let service = CrudService::new(fixture.projects(), registry().named_cache("projects"));
    let ctx = CallContext::background();

    assert!(service.get_by_id(&ctx, 77).unwrap_err().is_not_found());
    assert!(service.cache().get(&id_to_key(77)).is_none());
}

#[test]
fn update_and_delete_invalidate_cached_entry() {
    let fixture = Fixture::new();
    let service = CrudService::new(fixture.projects(), registry().named_cache("projects"));
    let ctx = CallContext::background();

    let id = service.create(&ctx, &mut Project::new("Demo", 1)).unwrap();
    service.get_by_id(&ctx, id).unwrap();

    let updated = service
        .update(&ctx, id, |project| project.name = "Renamed".to_string())
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert!(service.cache().get(&id_to_key(id)).is_none());
    assert_eq!(service.get_by_id(&ctx, id).unwrap().name, "Renamed");

    service.delete(&ctx, id).unwrap();
    assert!(service.cache().get(&id_to_key(id)).is_none());
    assert!(service.get_by_id(&ctx, id).unwrap_err().is_not_found());
}

#[test]
fn update_of_missing_id_fails_with_not_found() {
    let fixture = Fixture::new();
    let service = CrudService::new(fixture.projects(), registry().named_cache("projects"));
    let ctx = CallContext::background();

    let err = service.update(&ctx, 5, |_| {}).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn create_ignores_preset_id_and_versioned_update_advances_version() {
    let fixture = Fixture::new();
    let service = CrudService::new(fixture.issues(), registry().named_cache("issues"));
    let ctx = CallContext::background();

    let mut issue = Issue::new("Flaky test", 1);
    issue.id = 500;
    let id = service.create(&ctx, &mut issue).unwrap();
    assert_ne!(id, 500);

    let updated = service
        .update(&ctx, id, |issue| issue.title = "Fixed flaky test".to_string())
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(service.get_by_id(&ctx, id).unwrap().version, 2);
}

#[test]
fn attribute_search_and_listing() {
    let fixture = Fixture::new();
    let service = CrudService::new(fixture.projects(), registry().named_cache("unconfigured"));
    let ctx = CallContext::background();
    assert!(service.cache().is_noop());

    for (name, status) in [("Alpha", 1), ("Beta", 2), ("Gamma", 1)] {
        service.create(&ctx, &mut Project::new(name, status)).unwrap();
    }

    let mut attrs = Attributes::new();
    attrs.insert("Status".to_string(), Value::Integer(1));

    let active = service.find_all(&ctx, &attrs).unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(service.find_all_paged(&ctx, &attrs, 1, 1).unwrap()[0].name, "Gamma");
    assert_eq!(
        service.find_one(&ctx, &attrs).unwrap().map(|project| project.name),
        Some("Alpha".to_string())
    );

    attrs.insert("Status".to_string(), Value::Integer(9));
    assert!(service.find_one(&ctx, &attrs).unwrap().is_none());

    assert_eq!(service.get_all(&ctx).unwrap().len(), 3);
    assert_eq!(service.get_all_paged(&ctx, 2, 0).unwrap().len(), 2);
}
