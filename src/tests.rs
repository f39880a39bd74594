#![cfg(test)]

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Barrier};
use std::time::Duration;

use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::Client;
use serde_json::{json, Map, Value};

use crate::account::{Account, AccountBackend};
use crate::adapter::{Adapter, Query};
use crate::cancel::CancelToken;
use crate::config::{CollectionMap, Config};
use crate::error::{Error, Result};
use crate::files::{FileStore, StoredFile};
use crate::models::assignment::{AssignmentForm, GradeForm, SubmissionForm};
use crate::models::course::{ChapterForm, Course, CourseForm, Lesson, LessonForm, LessonKind};
use crate::models::profile::{Profile, Role};
use crate::models::quiz::QuizQuestionForm;
use crate::routes::AppState;
use crate::services::{assignments, courses, enrollment, grades, progress, quiz, session};
use crate::store::memory::MemoryStore;
use crate::store::{Document, DocumentStore, NativeQuery};

// ═══════════════════════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════════════════════

struct FakeAccounts(HashMap<String, Account>);

impl FakeAccounts {
    fn standard() -> Self {
        let mut m = HashMap::new();
        for (jwt, id, name) in [
            ("student-jwt", "stu1", "Sam Student"),
            ("other-student-jwt", "stu2", "Alex Student"),
            ("teacher-jwt", "tch1", "Terry Teacher"),
            ("other-teacher-jwt", "tch2", "Tove Teacher"),
        ] {
            m.insert(
                jwt.to_string(),
                Account {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: format!("{}@example.com", id),
                },
            );
        }
        FakeAccounts(m)
    }
}

impl AccountBackend for FakeAccounts {
    fn account_for(&self, jwt: &str) -> Result<Account> {
        self.0
            .get(jwt)
            .cloned()
            .ok_or_else(|| Error::Unauthorized("Invalid token passed in the request.".into()))
    }
}

/// Private bucket: signing fails, public view works.
struct FakeFiles;

impl FileStore for FakeFiles {
    fn upload(&self, name: &str, _content_type: &str, bytes: Vec<u8>) -> Result<StoredFile> {
        Ok(StoredFile {
            path: format!("file-{}", name),
            name: name.to_string(),
            size: bytes.len() as u64,
        })
    }

    fn signed_url(&self, _path: &str, _ttl: Duration) -> Result<String> {
        Err(Error::Network("token service unavailable".into()))
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(format!("https://cdn.test/{}", path))
    }
}

fn world() -> (Arc<MemoryStore>, Adapter) {
    let store = Arc::new(MemoryStore::new());
    let adapter = Adapter::new(store.clone(), CollectionMap::default());
    (store, adapter)
}

fn seed_profile(adapter: &Adapter, id: &str, role: Role) -> Profile {
    adapter
        .insert_record(
            &Profile {
                id: id.to_string(),
                full_name: format!("User {}", id),
                email: format!("{}@example.com", id),
                role,
                avatar_url: None,
                last_active_at: None,
            },
            &CancelToken::new(),
        )
        .unwrap()
}

/// A published course with one quiz lesson (five one-point questions whose
/// answer is "a") and one reading lesson. Returns (course, quiz lesson id).
fn seed_course(adapter: &Adapter, teacher: &Profile) -> (Course, String) {
    let c = CancelToken::new();
    let course = courses::create(
        adapter,
        teacher,
        &CourseForm {
            title: "Rust 101".into(),
            description: "Ownership and borrowing".into(),
            category: None,
            thumbnail_url: None,
        },
        &c,
    )
    .unwrap();
    let course = courses::set_published(adapter, teacher, &course.id, true, &c).unwrap();
    let chapter = courses::add_chapter(
        adapter,
        teacher,
        &course.id,
        &ChapterForm {
            title: "Basics".into(),
            position: None,
        },
        &c,
    )
    .unwrap();
    let quiz_lesson = courses::add_lesson(
        adapter,
        teacher,
        &chapter.id,
        &LessonForm {
            title: "Check yourself".into(),
            kind: LessonKind::Quiz,
            content: None,
            video_url: None,
            position: None,
        },
        &c,
    )
    .unwrap();
    courses::add_lesson(
        adapter,
        teacher,
        &chapter.id,
        &LessonForm {
            title: "Reading".into(),
            kind: LessonKind::Reading,
            content: Some("text".into()),
            video_url: None,
            position: None,
        },
        &c,
    )
    .unwrap();
    for i in 0..5 {
        quiz::add_question(
            adapter,
            teacher,
            &quiz_lesson.id,
            &QuizQuestionForm {
                question: format!("Question {}", i),
                options: vec!["a".into(), "b".into()],
                correct_answer: "a".into(),
                points: None,
                position: Some(i),
            },
            &c,
        )
        .unwrap();
    }
    (course, quiz_lesson.id)
}

/// Answers with the first `correct` questions right and the rest wrong.
fn answers(adapter: &Adapter, viewer: &Profile, lesson_id: &str, correct: usize) -> HashMap<String, String> {
    quiz::questions(adapter, viewer, lesson_id, &CancelToken::new())
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, q)| (q.id, if i < correct { "a" } else { "b" }.to_string()))
        .collect()
}

fn fields(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

// ═══════════════════════════════════════════════════════════
// Upsert races
// ═══════════════════════════════════════════════════════════

/// Holds every lister until both racers have listed, so both see "absent".
struct BarrierStore {
    inner: MemoryStore,
    barrier: Barrier,
}

impl DocumentStore for BarrierStore {
    fn backend_name(&self) -> &'static str {
        "barrier"
    }

    fn list_documents(&self, collection: &str, queries: &[NativeQuery]) -> Result<Vec<Document>> {
        let found = self.inner.list_documents(collection, queries);
        self.barrier.wait();
        found
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.get_document(collection, id)
    }

    fn create_document(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<Document> {
        self.inner.create_document(collection, id, data)
    }

    fn update_document(&self, collection: &str, id: &str, patch: &Map<String, Value>) -> Result<Document> {
        self.inner.update_document(collection, id, patch)
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete_document(collection, id)
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn concurrent_filter_upserts_can_duplicate() {
    let store = Arc::new(BarrierStore {
        inner: MemoryStore::new(),
        barrier: Barrier::new(2),
    });
    let adapter = Adapter::new(store.clone(), CollectionMap::default());
    std::thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                adapter
                    .upsert(
                        "lesson_progress",
                        fields(json!({"lesson_id": "l1", "completed": true})),
                        Some(("lesson_id", json!("l1"))),
                        &CancelToken::new(),
                    )
                    .unwrap();
            });
        }
    });
    assert_eq!(store.inner.count("lesson_progress"), 2);
}

#[test]
fn concurrent_keyed_upserts_converge() {
    let (store, adapter) = world();
    std::thread::scope(|s| {
        for path in ["/a", "/b"] {
            let adapter = &adapter;
            s.spawn(move || {
                adapter
                    .upsert_keyed("user_activity", "activity:u1", &fields(json!({"path": path})), &CancelToken::new())
                    .unwrap();
            });
        }
    });
    assert_eq!(store.count("user_activity"), 1);
}

// ═══════════════════════════════════════════════════════════
// Session & activity
// ═══════════════════════════════════════════════════════════

#[test]
fn first_sight_creates_a_student_profile_once() {
    let (store, adapter) = world();
    let accounts = FakeAccounts::standard();
    let c = CancelToken::new();
    let first = session::resolve(&adapter, &accounts, "student-jwt", &c).unwrap();
    assert_eq!(first.id, "stu1");
    assert_eq!(first.role, Role::Student);
    assert_eq!(first.full_name, "Sam Student");
    let again = session::resolve(&adapter, &accounts, "student-jwt", &c).unwrap();
    assert_eq!(again, first);
    assert_eq!(store.count("profiles"), 1);
}

#[test]
fn unknown_or_empty_tokens_are_unauthorized() {
    let (store, adapter) = world();
    let accounts = FakeAccounts::standard();
    let c = CancelToken::new();
    assert!(matches!(
        session::resolve(&adapter, &accounts, "forged", &c),
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(session::resolve(&adapter, &accounts, "  ", &c), Err(Error::Unauthorized(_))));
    assert_eq!(store.count("profiles"), 0);
}

#[test]
fn only_admins_change_roles() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    let admin = seed_profile(&adapter, "adm", Role::Admin);
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    seed_profile(&adapter, "stu", Role::Student);
    assert!(matches!(
        session::set_role(&adapter, &teacher, "stu", Role::Teacher, &c),
        Err(Error::Forbidden(_))
    ));
    let promoted = session::set_role(&adapter, &admin, "stu", Role::Teacher, &c).unwrap();
    assert_eq!(promoted.role, Role::Teacher);
}

#[test]
fn heartbeat_keeps_one_activity_document_and_touches_profile() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    seed_profile(&adapter, "stu", Role::Student);
    crate::services::activity::heartbeat(&adapter, "stu", Some("/courses"), &c).unwrap();
    let latest = crate::services::activity::heartbeat(&adapter, "stu", Some("/grades"), &c).unwrap();
    assert_eq!(latest.path.as_deref(), Some("/grades"));
    assert_eq!(store.count("user_activity"), 1);
    let profile = adapter.get::<Profile>("stu", &c).unwrap().unwrap();
    assert!(profile.last_active_at.is_some());
}

// ═══════════════════════════════════════════════════════════
// Courses & enrollment
// ═══════════════════════════════════════════════════════════

#[test]
fn students_cannot_create_courses() {
    let (_, adapter) = world();
    let student = seed_profile(&adapter, "stu", Role::Student);
    let err = courses::create(
        &adapter,
        &student,
        &CourseForm {
            title: "Nope".into(),
            description: String::new(),
            category: None,
            thumbnail_url: None,
        },
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[test]
fn outline_orders_chapters_and_lessons_by_position() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let course = courses::create(
        &adapter,
        &teacher,
        &CourseForm {
            title: "Go".into(),
            description: String::new(),
            category: None,
            thumbnail_url: None,
        },
        &c,
    )
    .unwrap();
    for (title, pos) in [("Second", 2), ("First", 1)] {
        courses::add_chapter(
            &adapter,
            &teacher,
            &course.id,
            &ChapterForm {
                title: title.into(),
                position: Some(pos),
            },
            &c,
        )
        .unwrap();
    }
    let outline = courses::outline(&adapter, &teacher, &course.id, &c).unwrap();
    let titles: Vec<&str> = outline.chapters.iter().map(|ch| ch.chapter.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second"]);

    let (course, _) = seed_course(&adapter, &teacher);
    let outline = courses::outline(&adapter, &teacher, &course.id, &c).unwrap();
    let lessons: Vec<i64> = outline.chapters[0].lessons.iter().map(|l| l.position).collect();
    assert_eq!(lessons, vec![0, 1]);
}

#[test]
fn drafts_are_hidden_from_students() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let draft = courses::create(
        &adapter,
        &teacher,
        &CourseForm {
            title: "Draft".into(),
            description: String::new(),
            category: None,
            thumbnail_url: None,
        },
        &c,
    )
    .unwrap();
    assert!(matches!(
        courses::outline(&adapter, &student, &draft.id, &c),
        Err(Error::NotFound(_))
    ));
    assert!(enrollment::enroll(&adapter, &student, &draft.id, &c).is_err());
    assert!(courses::list_published(&adapter, &c).unwrap().is_empty());
    assert_eq!(courses::list_taught(&adapter, "tch", &c).unwrap().len(), 1);
}

#[test]
fn enrollment_is_idempotent_and_drop_reactivates() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, _) = seed_course(&adapter, &teacher);

    let first = enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();
    let second = enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.count("enrollments"), 1);

    let mine = enrollment::my_courses(&adapter, "stu", &c).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].course.as_ref().map(|c| c.title.as_str()), Some("Rust 101"));

    enrollment::drop_course(&adapter, &student, &course.id, &c).unwrap();
    assert!(enrollment::my_courses(&adapter, "stu", &c).unwrap().is_empty());
    assert!(!enrollment::is_enrolled(&adapter, "stu", &course.id, &c).unwrap());

    enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();
    assert!(enrollment::is_enrolled(&adapter, "stu", &course.id, &c).unwrap());
    assert_eq!(store.count("enrollments"), 1);

    let roster = enrollment::students(&adapter, &teacher, &course.id, &c).unwrap();
    assert_eq!(roster.len(), 1);
    assert!(matches!(
        enrollment::students(&adapter, &student, &course.id, &c),
        Err(Error::Forbidden(_))
    ));
}

// ═══════════════════════════════════════════════════════════
// Quizzes & progress
// ═══════════════════════════════════════════════════════════

#[test]
fn passing_quiz_records_attempt_and_progress() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, lesson_id) = seed_course(&adapter, &teacher);
    enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();

    let outcome = quiz::submit(&adapter, &student, &lesson_id, &answers(&adapter, &student, &lesson_id, 3), &c).unwrap();
    assert_eq!(outcome.result.score, 3);
    assert_eq!(outcome.result.total_points, 5);
    assert!(outcome.result.passed);
    assert!(outcome.progress.is_some());
    assert_eq!(store.count("quiz_attempts"), 1);
    assert_eq!(store.count("lesson_progress"), 1);

    // Resubmitting adds an attempt; progress stays a single document.
    quiz::submit(&adapter, &student, &lesson_id, &answers(&adapter, &student, &lesson_id, 5), &c).unwrap();
    assert_eq!(store.count("quiz_attempts"), 2);
    assert_eq!(store.count("lesson_progress"), 1);

    let summary = progress::course_progress(&adapter, "stu", &course.id, &c).unwrap();
    assert_eq!(summary.completed_lessons, 1);
    assert_eq!(summary.total_lessons, 2);
    assert_eq!(summary.percent, 50.0);

    let history = quiz::attempts(&adapter, "stu", &lesson_id, &c).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn failing_quiz_records_attempt_only() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, lesson_id) = seed_course(&adapter, &teacher);
    enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();

    let outcome = quiz::submit(&adapter, &student, &lesson_id, &answers(&adapter, &student, &lesson_id, 2), &c).unwrap();
    assert!(!outcome.result.passed);
    assert_eq!(outcome.result.percentage, 40.0);
    assert!(outcome.progress.is_none());
    assert_eq!(store.count("quiz_attempts"), 1);
    assert_eq!(store.count("lesson_progress"), 0);
}

#[test]
fn quiz_requires_enrollment() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (_, lesson_id) = seed_course(&adapter, &teacher);
    let err = quiz::submit(&adapter, &student, &lesson_id, &answers(&adapter, &student, &lesson_id, 5), &c).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert_eq!(store.count("quiz_attempts"), 0);
}

#[test]
fn questions_for_a_reading_lesson_are_rejected() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let (course, _) = seed_course(&adapter, &teacher);
    let reading = courses::lessons_of(&adapter, &course.id, &c)
        .unwrap()
        .into_iter()
        .find(|l| l.kind == LessonKind::Reading)
        .unwrap();
    assert!(matches!(quiz::questions(&adapter, &teacher, &reading.id, &c), Err(Error::Validation(_))));
}

#[test]
fn draft_quiz_questions_are_hidden_from_students() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, lesson_id) = seed_course(&adapter, &teacher);
    courses::set_published(&adapter, &teacher, &course.id, false, &c).unwrap();
    assert!(matches!(
        quiz::questions(&adapter, &student, &lesson_id, &c),
        Err(Error::NotFound(_))
    ));
    assert_eq!(quiz::questions(&adapter, &teacher, &lesson_id, &c).unwrap().len(), 5);
}

#[test]
fn completing_a_lesson_twice_is_one_record() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, _) = seed_course(&adapter, &teacher);
    enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();
    let lessons = courses::lessons_of(&adapter, &course.id, &c).unwrap();
    for lesson in &lessons {
        progress::complete_lesson(&adapter, &student, &lesson.id, None, &c).unwrap();
        progress::complete_lesson(&adapter, &student, &lesson.id, None, &c).unwrap();
    }
    assert_eq!(store.count("lesson_progress"), 2);
    let summary = progress::course_progress(&adapter, "stu", &course.id, &c).unwrap();
    assert_eq!(summary.percent, 100.0);
}

#[test]
fn progress_counts_lessons_beyond_one_backend_page() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    for i in 0..30 {
        adapter
            .insert_record(
                &Lesson {
                    id: format!("lesson-{:02}", i),
                    chapter_id: "ch1".into(),
                    course_id: "c1".into(),
                    title: format!("Lesson {}", i),
                    kind: LessonKind::Reading,
                    content: None,
                    video_url: None,
                    position: i,
                },
                &c,
            )
            .unwrap();
    }
    for i in 0..27 {
        adapter
            .upsert_keyed(
                "lesson_progress",
                &format!("progress:stu:lesson-{:02}", i),
                &fields(json!({
                    "student_id": "stu",
                    "lesson_id": format!("lesson-{:02}", i),
                    "course_id": "c1",
                    "completed": true
                })),
                &c,
            )
            .unwrap();
    }
    let summary = progress::course_progress(&adapter, "stu", "c1", &c).unwrap();
    assert_eq!(summary.total_lessons, 30);
    assert_eq!(summary.completed_lessons, 27);
    assert_eq!(summary.percent, 90.0);
}

// ═══════════════════════════════════════════════════════════
// Assignments & grades
// ═══════════════════════════════════════════════════════════

#[test]
fn assignment_submit_grade_and_summary() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let outsider = seed_profile(&adapter, "tch2", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, lesson_id) = seed_course(&adapter, &teacher);
    enrollment::enroll(&adapter, &student, &course.id, &c).unwrap();

    let assignment = assignments::create(
        &adapter,
        &teacher,
        &course.id,
        &AssignmentForm {
            title: "Essay".into(),
            description: String::new(),
            due_date: None,
            max_points: 50.0,
        },
        &c,
    )
    .unwrap();

    let empty = SubmissionForm {
        content: Some("   ".into()),
        file_path: None,
    };
    assert!(matches!(
        assignments::submit(&adapter, &student, &assignment.id, &empty, &c),
        Err(Error::Validation(_))
    ));

    let work = SubmissionForm {
        content: Some("first draft".into()),
        file_path: None,
    };
    assignments::submit(&adapter, &student, &assignment.id, &work, &c).unwrap();
    let work = SubmissionForm {
        content: Some("final".into()),
        file_path: None,
    };
    let submission = assignments::submit(&adapter, &student, &assignment.id, &work, &c).unwrap();
    assert_eq!(store.count("submissions"), 1);
    assert_eq!(submission.content.as_deref(), Some("final"));

    let too_high = GradeForm {
        grade: 60.0,
        feedback: None,
    };
    assert!(matches!(
        assignments::grade(&adapter, &teacher, &submission.id, &too_high, &c),
        Err(Error::Validation(_))
    ));
    let fair = GradeForm {
        grade: 40.0,
        feedback: Some("good".into()),
    };
    assert!(matches!(
        assignments::grade(&adapter, &outsider, &submission.id, &fair, &c),
        Err(Error::Forbidden(_))
    ));
    let graded = assignments::grade(&adapter, &teacher, &submission.id, &fair, &c).unwrap();
    assert_eq!(graded.grade, Some(40.0));
    assert!(graded.graded_at.is_some());

    quiz::submit(&adapter, &student, &lesson_id, &answers(&adapter, &student, &lesson_id, 3), &c).unwrap();

    let summary = grades::student_summary(&adapter, &student, &course.id, &c).unwrap();
    assert_eq!(summary.quiz_average, Some(60.0));
    assert_eq!(summary.assignment_average, Some(80.0));
    assert_eq!(summary.overall, Some(70.0));

    let book = grades::gradebook(&adapter, &teacher, &course.id, &c).unwrap();
    assert_eq!(book.len(), 1);
    assert_eq!(book[0], summary);
}

#[test]
fn student_without_work_has_no_overall_grade() {
    let (_, adapter) = world();
    let c = CancelToken::new();
    let teacher = seed_profile(&adapter, "tch", Role::Teacher);
    let student = seed_profile(&adapter, "stu", Role::Student);
    let (course, _) = seed_course(&adapter, &teacher);
    let summary = grades::student_summary(&adapter, &student, &course.id, &c).unwrap();
    assert_eq!(summary.overall, None);
}

// ═══════════════════════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════════════════════

#[test]
fn cancelled_requests_stop_before_the_store() {
    let (store, adapter) = world();
    let c = CancelToken::new();
    c.cancel();
    let before = store.calls().len();
    assert_eq!(courses::list_published(&adapter, &c).unwrap_err(), Error::Cancelled);
    assert_eq!(
        adapter
            .update(&Query::from("courses").eq("id", "x"), &Map::new(), &c)
            .unwrap_err(),
        Error::Cancelled
    );
    assert_eq!(store.calls().len(), before);
}

#[test]
fn expired_deadline_counts_as_cancelled() {
    let (_, adapter) = world();
    let c = CancelToken::with_timeout(Duration::ZERO);
    assert_eq!(courses::list_published(&adapter, &c).unwrap_err(), Error::Cancelled);
}

// ═══════════════════════════════════════════════════════════
// HTTP API
// ═══════════════════════════════════════════════════════════

fn app_state() -> (Arc<MemoryStore>, AppState) {
    let (store, adapter) = world();
    seed_profile(&adapter, "tch1", Role::Teacher);
    let config = Config::from_sources("", |k| match k {
        "APPWRITE_PROJECT_ID" => Some("test-project".to_string()),
        "APPWRITE_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState {
        adapter,
        accounts: Arc::new(FakeAccounts::standard()),
        files: Arc::new(FakeFiles),
        config: Arc::new(config),
    };
    (store, state)
}

fn api() -> (Arc<MemoryStore>, Client) {
    let (store, state) = app_state();
    let client = Client::tracked(crate::build_rocket(state)).unwrap();
    (store, client)
}

fn bearer(jwt: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", jwt))
}

#[test]
fn api_requires_a_session() {
    let (_, client) = api();
    let resp = client.get("/api/courses").dispatch();
    assert_eq!(resp.status(), Status::Unauthorized);
    let body: Value = resp.into_json().unwrap();
    assert!(body["data"].is_null());
    assert_eq!(body["error"]["code"], 401);

    let resp = client.get("/api/courses").header(bearer("forged")).dispatch();
    assert_eq!(resp.status(), Status::Unauthorized);
}

#[test]
fn api_me_creates_profile_on_first_call() {
    let (store, client) = api();
    let resp = client.get("/api/me").header(bearer("student-jwt")).dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["id"], "stu1");
    assert_eq!(body["data"]["role"], "student");
    assert!(body["error"].is_null());
    assert_eq!(store.count("profiles"), 2);
}

#[test]
fn api_course_lifecycle() {
    let (_, client) = api();

    let resp = client
        .post("/api/courses")
        .header(bearer("student-jwt"))
        .header(ContentType::JSON)
        .body(json!({"title": "Rust"}).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Forbidden);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"]["type"], "forbidden");

    let resp = client
        .post("/api/courses")
        .header(bearer("teacher-jwt"))
        .header(ContentType::JSON)
        .body(json!({"title": "   "}).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::UnprocessableEntity);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"]["type"], "validation");

    let resp = client
        .post("/api/courses")
        .header(bearer("teacher-jwt"))
        .header(ContentType::JSON)
        .body(json!({"title": "Rust", "description": "Systems"}).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    let course_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["is_published"], false);

    let resp = client
        .post(format!("/api/courses/{}/enroll", course_id))
        .header(bearer("student-jwt"))
        .dispatch();
    assert_eq!(resp.status(), Status::NotFound);

    let resp = client
        .put(format!("/api/courses/{}/published", course_id))
        .header(bearer("teacher-jwt"))
        .header(ContentType::JSON)
        .body(json!({"published": true}).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);

    let resp = client.get("/api/courses").header(bearer("student-jwt")).dispatch();
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = client
        .post(format!("/api/courses/{}/enroll", course_id))
        .header(bearer("student-jwt"))
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["status"], "active");

    let resp = client.get("/api/me/courses").header(bearer("student-jwt")).dispatch();
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"][0]["course"]["title"], "Rust");

    let resp = client
        .get(format!("/api/courses/{}/students", course_id))
        .header(bearer("other-teacher-jwt"))
        .dispatch();
    assert_eq!(resp.status(), Status::Forbidden);
}

#[test]
fn api_download_url_falls_back_to_public() {
    let (_, client) = api();
    let resp = client
        .get("/api/files/url?path=abc123")
        .header(bearer("student-jwt"))
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["url"], "https://cdn.test/abc123");
}

#[test]
fn api_upload_stores_file() {
    let (_, client) = api();
    let resp = client
        .post("/api/files?name=notes.txt")
        .header(bearer("student-jwt"))
        .header(ContentType::Plain)
        .body("hello")
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["path"], "file-notes.txt");
    assert_eq!(body["data"]["size"], 5);
}

#[test]
fn api_health_and_unknown_routes() {
    let (_, client) = api();
    let resp = client.get("/api/health").dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["backend"]["kind"], "memory");

    let resp = client.get("/api/nope").dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"]["code"], 404);
}

#[test]
fn abandoned_request_stops_before_its_next_store_call() {
    let (store, state) = app_state();
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (outcome_tx, outcome_rx) = mpsc::channel::<Result<()>>();
    let rt = rocket::tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    rt.block_on(async {
        let request = crate::routes::run(&state, move |s, c| {
            entered_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            let outcome = s.adapter.select(&Query::from("courses"), c).map(|_| ());
            outcome_tx.send(outcome.clone()).unwrap();
            outcome
        });
        // The work is held on `release_rx`, so the request cannot finish
        // before the timeout drops it.
        let timed_out = rocket::tokio::time::timeout(Duration::from_millis(20), request).await;
        assert!(timed_out.is_err());
    });
    entered_rx.recv().unwrap();
    let calls_before = store.calls().len();
    release_tx.send(()).unwrap();
    assert_eq!(outcome_rx.recv().unwrap(), Err(Error::Cancelled));
    assert_eq!(store.calls().len(), calls_before);
}
