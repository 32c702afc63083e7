mod common;

use common::{Fixture, Project};
use metarepo_core::{Attributes, CallContext, RepoError, SaveOutcome, UnknownAttributePolicy};
use rusqlite::types::Value;

fn attrs(pairs: &[(&str, Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn insert_then_find_by_id_round_trips() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    let mut project = Project::new("Demo", 1);
    let outcome = repo.save(&ctx, &mut project).unwrap();

    assert!(project.id > 0);
    assert_eq!(outcome, SaveOutcome::Created { id: project.id });

    let loaded = repo.find_one_by_id(&ctx, project.id).unwrap();
    assert_eq!(loaded.name, "Demo");
    assert_eq!(loaded, project);
}

#[test]
fn missing_id_is_not_found_and_empty_table_lists_nothing() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    let err = repo.find_one_by_id(&ctx, 999).unwrap_err();
    assert!(err.is_not_found());
    assert!(repo.find_all(&ctx).unwrap().is_empty());
    assert!(repo
        .find_all_by_attributes(&ctx, &attrs(&[("Name", Value::Text("x".into()))]))
        .unwrap()
        .is_empty());
}

#[test]
fn update_writes_changed_fields() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    let mut project = Project::new("Demo", 1);
    repo.save(&ctx, &mut project).unwrap();
    project.name = "Renamed".to_string();

    assert_eq!(repo.save(&ctx, &mut project).unwrap(), SaveOutcome::Updated);
    assert_eq!(repo.find_one_by_id(&ctx, project.id).unwrap().name, "Renamed");
}

#[test]
fn update_of_missing_row_is_not_applied_or_not_found_when_checked() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    let mut ghost = Project::new("Ghost", 0);
    ghost.id = 41;
    assert_eq!(repo.save(&ctx, &mut ghost).unwrap(), SaveOutcome::NotApplied);
    assert!(matches!(
        repo.save_checked(&ctx, &mut ghost),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn hard_delete_removes_row() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    let mut project = Project::new("Demo", 1);
    repo.save(&ctx, &mut project).unwrap();
    repo.delete(&ctx, project.id).unwrap();

    assert!(repo.find_one_by_id(&ctx, project.id).unwrap_err().is_not_found());
    repo.delete(&ctx, project.id).expect("deleting twice is not an error");
}

#[test]
fn find_all_uses_default_sort_and_pages() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    for name in ["Gamma", "Alpha", "Beta"] {
        repo.save(&ctx, &mut Project::new(name, 1)).unwrap();
    }

    let names: Vec<String> = repo
        .find_all(&ctx)
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    let page = repo.find_all_paged(&ctx, 2, 1).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "Beta");
    assert_eq!(page[1].name, "Gamma");
}

#[test]
fn find_all_by_attributes_is_deterministic() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    repo.save(&ctx, &mut Project::new("Demo", 1)).unwrap();
    repo.save(&ctx, &mut Project::new("Demo", 2)).unwrap();
    repo.save(&ctx, &mut Project::new("Other", 1)).unwrap();

    let filter = attrs(&[
        ("Status", Value::Integer(1)),
        ("Name", Value::Text("Demo".into())),
    ]);
    let first = repo.find_all_by_attributes(&ctx, &filter).unwrap();
    let second = repo.find_all_by_attributes(&ctx, &filter).unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(first[0].status, 1);

    let everything = repo.find_all_by_attributes(&ctx, &Attributes::new()).unwrap();
    assert_eq!(everything.len(), 3);

    let paged = repo
        .find_all_by_attributes_paged(&ctx, &attrs(&[("Name", Value::Text("Demo".into()))]), 1, 1)
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].status, 2);
}

#[test]
fn unknown_attribute_is_rejected_unless_ignored() {
    let fixture = Fixture::new();
    let ctx = CallContext::background();
    fixture
        .projects()
        .save(&ctx, &mut Project::new("Demo", 1))
        .unwrap();

    let filter = attrs(&[("Owner", Value::Integer(3))]);
    let err = fixture
        .projects()
        .find_all_by_attributes(&ctx, &filter)
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownAttribute(name) if name == "Owner"));

    let lenient = fixture
        .projects()
        .with_unknown_attribute_policy(UnknownAttributePolicy::Ignore);
    assert_eq!(lenient.find_all_by_attributes(&ctx, &filter).unwrap().len(), 1);
}

#[test]
fn find_one_by_attribute_matches_unique_value() {
    let fixture = Fixture::new();
    let repo = fixture.projects();
    let ctx = CallContext::background();

    repo.save(&ctx, &mut Project::new("Alpha", 1)).unwrap();
    repo.save(&ctx, &mut Project::new("Beta", 2)).unwrap();

    let beta = repo.find_one_by_attribute(&ctx, "Name", "Beta".to_string()).unwrap();
    assert_eq!(beta.status, 2);
    assert!(repo
        .find_one_by_attribute(&ctx, "Name", "Zeta".to_string())
        .unwrap_err()
        .is_not_found());
    assert!(matches!(
        repo.find_one_by_attribute(&ctx, "name", "Beta".to_string()),
        Err(RepoError::UnknownAttribute(_))
    ));
}
