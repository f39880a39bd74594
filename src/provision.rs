//! `campusdesk provision`: create the database, collections, attributes and
//! indexes on the backend, one call at a time with a pause between calls.
//!
//! Re-running is safe. A `409` from the backend is reported as
//! "already exists" and does not count as a failure.

use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use crate::config::CollectionMap;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeKind {
    String { size: u32 },
    Integer,
    Float,
    Boolean,
    Datetime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub key: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
    pub array: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub key: &'static str,
    pub unique: bool,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    /// Logical table name, resolved through the collection map.
    pub table: &'static str,
    pub name: &'static str,
    pub attributes: Vec<AttributeSpec>,
    pub indexes: Vec<IndexSpec>,
}

/// Backend schema administration.
pub trait SchemaAdmin {
    fn create_database(&self, name: &str) -> Result<()>;
    fn create_collection(&self, id: &str, name: &str) -> Result<()>;
    fn create_attribute(&self, collection: &str, attr: &AttributeSpec) -> Result<()>;
    fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()>;
}

// ── Attribute shorthands ─────────────────────────────────────────────

fn text(key: &'static str, size: u32, required: bool) -> AttributeSpec {
    AttributeSpec {
        key,
        kind: AttributeKind::String { size },
        required,
        array: false,
        default: None,
    }
}

fn id_ref(key: &'static str) -> AttributeSpec {
    text(key, 64, true)
}

fn text_list(key: &'static str, size: u32) -> AttributeSpec {
    AttributeSpec {
        array: true,
        ..text(key, size, false)
    }
}

fn integer(key: &'static str, required: bool, default: Option<i64>) -> AttributeSpec {
    AttributeSpec {
        key,
        kind: AttributeKind::Integer,
        required,
        array: false,
        default: default.map(|d| json!(d)),
    }
}

fn float(key: &'static str, required: bool) -> AttributeSpec {
    AttributeSpec {
        key,
        kind: AttributeKind::Float,
        required,
        array: false,
        default: None,
    }
}

fn boolean(key: &'static str, default: bool) -> AttributeSpec {
    AttributeSpec {
        key,
        kind: AttributeKind::Boolean,
        required: false,
        array: false,
        default: Some(json!(default)),
    }
}

fn datetime(key: &'static str, required: bool) -> AttributeSpec {
    AttributeSpec {
        key,
        kind: AttributeKind::Datetime,
        required,
        array: false,
        default: None,
    }
}

fn index(key: &'static str, attributes: &[&str]) -> IndexSpec {
    IndexSpec {
        key,
        unique: false,
        attributes: attributes.iter().map(|a| a.to_string()).collect(),
    }
}

/// The full schema, in creation order.
pub fn schema() -> Vec<CollectionSpec> {
    vec![
        CollectionSpec {
            table: "profiles",
            name: "Profiles",
            attributes: vec![
                text("full_name", 255, false),
                text("email", 320, false),
                text("role", 16, false),
                text("avatar_url", 2048, false),
                datetime("last_active_at", false),
            ],
            indexes: vec![index("idx_role", &["role"])],
        },
        CollectionSpec {
            table: "courses",
            name: "Courses",
            attributes: vec![
                text("title", 255, true),
                text("description", 10000, false),
                id_ref("teacher_id"),
                text("category", 64, false),
                text("thumbnail_url", 2048, false),
                boolean("is_published", false),
            ],
            indexes: vec![
                index("idx_teacher", &["teacher_id"]),
                index("idx_published", &["is_published"]),
            ],
        },
        CollectionSpec {
            table: "chapters",
            name: "Chapters",
            attributes: vec![id_ref("course_id"), text("title", 255, true), integer("position", false, Some(0))],
            indexes: vec![index("idx_course", &["course_id"])],
        },
        CollectionSpec {
            table: "lessons",
            name: "Lessons",
            attributes: vec![
                id_ref("chapter_id"),
                id_ref("course_id"),
                text("title", 255, true),
                text("lesson_type", 16, false),
                text("content", 100000, false),
                text("video_url", 2048, false),
                integer("position", false, Some(0)),
            ],
            indexes: vec![index("idx_course", &["course_id"]), index("idx_chapter", &["chapter_id"])],
        },
        CollectionSpec {
            table: "enrollments",
            name: "Enrollments",
            attributes: vec![
                id_ref("student_id"),
                id_ref("course_id"),
                text("status", 16, false),
                datetime("enrolled_at", false),
            ],
            indexes: vec![index("idx_student", &["student_id"]), index("idx_course", &["course_id"])],
        },
        CollectionSpec {
            table: "assignments",
            name: "Assignments",
            attributes: vec![
                id_ref("course_id"),
                text("title", 255, true),
                text("description", 10000, false),
                datetime("due_date", false),
                float("max_points", true),
            ],
            indexes: vec![index("idx_course", &["course_id"])],
        },
        CollectionSpec {
            table: "assignment_submissions",
            name: "Assignment Submissions",
            attributes: vec![
                id_ref("assignment_id"),
                id_ref("student_id"),
                id_ref("course_id"),
                text("content", 100000, false),
                text("file_path", 1024, false),
                datetime("submitted_at", false),
                float("grade", false),
                text("feedback", 10000, false),
                datetime("graded_at", false),
            ],
            indexes: vec![
                index("idx_assignment", &["assignment_id"]),
                index("idx_student_course", &["student_id", "course_id"]),
            ],
        },
        CollectionSpec {
            table: "schedules",
            name: "Schedules",
            attributes: vec![
                id_ref("course_id"),
                text("title", 255, true),
                datetime("starts_at", true),
                datetime("ends_at", true),
                text("location", 255, false),
            ],
            indexes: vec![index("idx_course_start", &["course_id", "starts_at"])],
        },
        CollectionSpec {
            table: "announcements",
            name: "Announcements",
            attributes: vec![
                id_ref("course_id"),
                id_ref("author_id"),
                text("title", 255, true),
                text("body", 10000, false),
                datetime("published_at", false),
            ],
            indexes: vec![index("idx_course", &["course_id"])],
        },
        CollectionSpec {
            table: "quiz_questions",
            name: "Quiz Questions",
            attributes: vec![
                id_ref("lesson_id"),
                text("question", 2000, true),
                text_list("options", 1000),
                text("correct_answer", 1000, true),
                integer("points", false, Some(1)),
                integer("position", false, Some(0)),
            ],
            indexes: vec![index("idx_lesson", &["lesson_id"])],
        },
        CollectionSpec {
            table: "quiz_attempts",
            name: "Quiz Attempts",
            attributes: vec![
                id_ref("lesson_id"),
                id_ref("course_id"),
                id_ref("student_id"),
                text("answers", 20000, false),
                integer("score", true, None),
                integer("total_points", true, None),
                float("percentage", true),
                boolean("passed", false),
                datetime("submitted_at", false),
            ],
            indexes: vec![index("idx_student_course", &["student_id", "course_id"])],
        },
        CollectionSpec {
            table: "lesson_progress",
            name: "Lesson Progress",
            attributes: vec![
                id_ref("student_id"),
                id_ref("lesson_id"),
                id_ref("course_id"),
                boolean("completed", false),
                datetime("completed_at", false),
                float("score", false),
            ],
            indexes: vec![index("idx_student_course", &["student_id", "course_id"])],
        },
        CollectionSpec {
            table: "capstone_projects",
            name: "Capstone Projects",
            attributes: vec![
                id_ref("course_id"),
                text("title", 255, true),
                text("description", 10000, false),
                datetime("due_date", false),
                float("max_points", true),
            ],
            indexes: vec![index("idx_course", &["course_id"])],
        },
        CollectionSpec {
            table: "capstone_submissions",
            name: "Capstone Submissions",
            attributes: vec![
                id_ref("project_id"),
                id_ref("student_id"),
                text("repository_url", 2048, false),
                text("demo_url", 2048, false),
                text("notes", 10000, false),
                datetime("submitted_at", false),
                float("grade", false),
                text("feedback", 10000, false),
            ],
            indexes: vec![index("idx_project", &["project_id"])],
        },
        CollectionSpec {
            table: "user_activity",
            name: "User Activity",
            attributes: vec![id_ref("user_id"), datetime("last_seen_at", true), text("path", 1024, false)],
            indexes: vec![index("idx_user", &["user_id"])],
        },
    ]
}

// ── Runner ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    AlreadyExists,
    Failed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

impl ProvisionReport {
    fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Created => self.created += 1,
            StepOutcome::AlreadyExists => self.existing += 1,
            StepOutcome::Failed => self.failed += 1,
        }
    }

    /// Process exit code: 1 if any step failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

pub struct Provisioner<'a> {
    admin: &'a dyn SchemaAdmin,
    collections: &'a CollectionMap,
    delay: Duration,
}

impl<'a> Provisioner<'a> {
    pub fn new(admin: &'a dyn SchemaAdmin, collections: &'a CollectionMap, delay: Duration) -> Self {
        Provisioner {
            admin,
            collections,
            delay,
        }
    }

    pub fn run(&self, database_name: &str, schema: &[CollectionSpec]) -> ProvisionReport {
        let mut report = ProvisionReport::default();
        report.record(self.step(&format!("database {}", database_name), || {
            self.admin.create_database(database_name)
        }));

        for spec in schema {
            let collection = self.collections.resolve(spec.table);
            let outcome = self.step(&format!("collection {}", collection), || {
                self.admin.create_collection(collection, spec.name)
            });
            report.record(outcome);
            if outcome == StepOutcome::Failed {
                // Attributes of a missing collection would all fail too.
                continue;
            }
            for attr in &spec.attributes {
                report.record(self.step(&format!("attribute {}.{}", collection, attr.key), || {
                    self.admin.create_attribute(collection, attr)
                }));
            }
            for idx in &spec.indexes {
                report.record(self.step(&format!("index {}.{}", collection, idx.key), || {
                    self.admin.create_index(collection, idx)
                }));
            }
        }

        log::info!(
            "[provision] done: {} created, {} already existed, {} failed",
            report.created,
            report.existing,
            report.failed
        );
        report
    }

    fn step<F>(&self, label: &str, call: F) -> StepOutcome
    where
        F: FnOnce() -> Result<()>,
    {
        let outcome = match call() {
            Ok(()) => {
                log::info!("[provision] created {}", label);
                StepOutcome::Created
            }
            Err(e) if e.is_conflict() => {
                log::info!("[provision] {} already exists", label);
                StepOutcome::AlreadyExists
            }
            Err(e) => {
                log::error!("[provision] failed to create {}: {}", label, e);
                StepOutcome::Failed
            }
        };
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        outcome
    }
}
