#![allow(dead_code)]

use metarepo_core::metadata::shape::{IDENTITY, VERSIONED_TIMESTAMPED};
use metarepo_core::{
    open_db_in_memory, Capabilities, Catalog, DbHandle, Entity, EntityDef, EntityId, EntityShape,
    FieldDecl, MappedRow, QueryMetrics, RepoResult, SqlRepository,
};
use rusqlite::types::Value;
use std::sync::Arc;

pub const SCHEMA_SQL: &str = "
CREATE TABLE project (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status_code INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE issue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version INTEGER NOT NULL DEFAULT 1,
    create_time INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000),
    last_modified_time INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000),
    title TEXT NOT NULL,
    project_id INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub status: i64,
}

impl Project {
    pub fn new(name: &str, status: i64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: format!("{name} description"),
            status,
        }
    }
}

impl Entity for Project {
    const ENTITY_NAME: &'static str = "Project";
    const SHAPE: EntityShape = EntityShape::new(
        &[
            FieldDecl::Embedded(IDENTITY),
            FieldDecl::tagged("Name", "name"),
            FieldDecl::tagged("Description", "description"),
            FieldDecl::tagged("Status", "status_code"),
        ],
        Capabilities::NONE,
    );

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn value_of(&self, field: &str) -> Option<Value> {
        match field {
            "Id" => i64::try_from(self.id).ok().map(Value::Integer),
            "Name" => Some(Value::Text(self.name.clone())),
            "Description" => Some(Value::Text(self.description.clone())),
            "Status" => Some(Value::Integer(self.status)),
            _ => None,
        }
    }

    fn from_row(row: &MappedRow<'_, '_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.id()?,
            name: row.get("Name")?,
            description: row.get("Description")?,
            status: row.get("Status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Issue {
    pub id: EntityId,
    pub version: u32,
    pub create_time: Option<i64>,
    pub last_modified_time: Option<i64>,
    pub title: String,
    pub project_id: i64,
}

impl Issue {
    pub fn new(title: &str, project_id: i64) -> Self {
        Self {
            title: title.to_string(),
            project_id,
            ..Self::default()
        }
    }
}

impl Entity for Issue {
    const ENTITY_NAME: &'static str = "Issue";
    const SHAPE: EntityShape = EntityShape::new(
        &[
            FieldDecl::Embedded(VERSIONED_TIMESTAMPED),
            FieldDecl::tagged("Title", "title"),
            FieldDecl::tagged("ProjectId", "project_id"),
        ],
        Capabilities::VERSIONED_TIMESTAMPED,
    );

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn version(&self) -> Option<u32> {
        Some(self.version)
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn value_of(&self, field: &str) -> Option<Value> {
        match field {
            "Title" => Some(Value::Text(self.title.clone())),
            "ProjectId" => Some(Value::Integer(self.project_id)),
            _ => None,
        }
    }

    fn from_row(row: &MappedRow<'_, '_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.id()?,
            version: row.get("Version")?,
            create_time: row.get("CreateTime")?,
            last_modified_time: row.get("LastModifiedTime")?,
            title: row.get("Title")?,
            project_id: row.get("ProjectId")?,
        })
    }
}

pub fn project_def() -> EntityDef {
    EntityDef::new("Project", "main", "project", "id", "name asc, id asc", false)
}

pub fn issue_def() -> EntityDef {
    EntityDef::new("Issue", "main", "issue", "id", "id desc", true)
}

/// In-memory database with both tables and both entities registered.
pub struct Fixture {
    pub db: DbHandle,
    pub catalog: Catalog,
    pub metrics: Arc<QueryMetrics>,
}

impl Fixture {
    pub fn new() -> Self {
        let db = open_db_in_memory().unwrap();
        db.execute_batch(SCHEMA_SQL).unwrap();

        let catalog = Catalog::new();
        catalog.register_entity_def(project_def()).unwrap();
        catalog.register_entity_def(issue_def()).unwrap();

        Self {
            db,
            catalog,
            metrics: Arc::new(QueryMetrics::new()),
        }
    }

    pub fn projects(&self) -> SqlRepository<Project> {
        SqlRepository::try_new(&self.db, &self.catalog, Arc::clone(&self.metrics)).unwrap()
    }

    pub fn issues(&self) -> SqlRepository<Issue> {
        SqlRepository::try_new(&self.db, &self.catalog, Arc::clone(&self.metrics)).unwrap()
    }

    /// Reads one integer cell with raw SQL, bypassing the repository.
    pub fn scalar(&self, sql: &str, id: EntityId) -> i64 {
        self.db
            .with_conn(|conn| {
                conn.query_row(sql, [id as i64], |row| row.get::<_, i64>(0))
                    .map_err(metarepo_core::DbError::from)
            })
            .unwrap()
    }
}
