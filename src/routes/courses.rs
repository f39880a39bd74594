use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Deserialize;

use crate::models::announcement::{Announcement, AnnouncementForm};
use crate::models::course::{Chapter, ChapterForm, Course, CourseForm, CourseOutline, Lesson, LessonForm};
use crate::models::enrollment::Enrollment;
use crate::models::profile::Profile;
use crate::models::progress::{CourseProgress, LessonProgress};
use crate::models::schedule::{Schedule, ScheduleForm};
use crate::security::auth::{CurrentUser, TeacherUser};
use crate::services::enrollment::EnrolledCourse;
use crate::services::{announcements, courses, enrollment, progress, schedules, visible_course};

use super::{run, ApiResponse, AppState};

// ── Catalogue ──

#[get("/courses")]
async fn list_published(state: &State<AppState>, _user: CurrentUser) -> ApiResponse<Vec<Course>> {
    run(state, |s, c| courses::list_published(&s.adapter, c)).await
}

#[get("/courses/teaching")]
async fn list_teaching(state: &State<AppState>, teacher: TeacherUser) -> ApiResponse<Vec<Course>> {
    run(state, move |s, c| courses::list_taught(&s.adapter, &teacher.profile.id, c)).await
}

#[post("/courses", data = "<form>")]
async fn create_course(state: &State<AppState>, teacher: TeacherUser, form: Json<CourseForm>) -> ApiResponse<Course> {
    let form = form.into_inner();
    run(state, move |s, c| courses::create(&s.adapter, &teacher.profile, &form, c)).await
}

#[get("/courses/<course_id>")]
async fn outline(state: &State<AppState>, user: CurrentUser, course_id: String) -> ApiResponse<CourseOutline> {
    run(state, move |s, c| courses::outline(&s.adapter, &user.profile, &course_id, c)).await
}

#[derive(Debug, Deserialize)]
pub struct PublishForm {
    pub published: bool,
}

#[put("/courses/<course_id>/published", data = "<form>")]
async fn set_published(
    state: &State<AppState>,
    teacher: TeacherUser,
    course_id: String,
    form: Json<PublishForm>,
) -> ApiResponse<Course> {
    let published = form.published;
    run(state, move |s, c| {
        courses::set_published(&s.adapter, &teacher.profile, &course_id, published, c)
    })
    .await
}

#[post("/courses/<course_id>/chapters", data = "<form>")]
async fn add_chapter(
    state: &State<AppState>,
    teacher: TeacherUser,
    course_id: String,
    form: Json<ChapterForm>,
) -> ApiResponse<Chapter> {
    let form = form.into_inner();
    run(state, move |s, c| courses::add_chapter(&s.adapter, &teacher.profile, &course_id, &form, c)).await
}

#[post("/chapters/<chapter_id>/lessons", data = "<form>")]
async fn add_lesson(
    state: &State<AppState>,
    teacher: TeacherUser,
    chapter_id: String,
    form: Json<LessonForm>,
) -> ApiResponse<Lesson> {
    let form = form.into_inner();
    run(state, move |s, c| courses::add_lesson(&s.adapter, &teacher.profile, &chapter_id, &form, c)).await
}

// ── Enrollment ──

#[post("/courses/<course_id>/enroll")]
async fn enroll(state: &State<AppState>, user: CurrentUser, course_id: String) -> ApiResponse<Enrollment> {
    run(state, move |s, c| enrollment::enroll(&s.adapter, &user.profile, &course_id, c)).await
}

#[delete("/courses/<course_id>/enroll")]
async fn drop_course(state: &State<AppState>, user: CurrentUser, course_id: String) -> ApiResponse<Enrollment> {
    run(state, move |s, c| enrollment::drop_course(&s.adapter, &user.profile, &course_id, c)).await
}

#[get("/me/courses")]
async fn my_courses(state: &State<AppState>, user: CurrentUser) -> ApiResponse<Vec<EnrolledCourse>> {
    run(state, move |s, c| enrollment::my_courses(&s.adapter, &user.profile.id, c)).await
}

#[get("/courses/<course_id>/students")]
async fn students(state: &State<AppState>, teacher: TeacherUser, course_id: String) -> ApiResponse<Vec<Profile>> {
    run(state, move |s, c| enrollment::students(&s.adapter, &teacher.profile, &course_id, c)).await
}

// ── Progress ──

#[derive(Debug, Default, Deserialize)]
pub struct CompleteForm {
    pub score: Option<f64>,
}

#[post("/lessons/<lesson_id>/complete", data = "<form>")]
async fn complete_lesson(
    state: &State<AppState>,
    user: CurrentUser,
    lesson_id: String,
    form: Option<Json<CompleteForm>>,
) -> ApiResponse<LessonProgress> {
    let score = form.and_then(|f| f.into_inner().score);
    run(state, move |s, c| progress::complete_lesson(&s.adapter, &user.profile, &lesson_id, score, c)).await
}

#[get("/courses/<course_id>/progress")]
async fn course_progress(state: &State<AppState>, user: CurrentUser, course_id: String) -> ApiResponse<CourseProgress> {
    run(state, move |s, c| progress::course_progress(&s.adapter, &user.profile.id, &course_id, c)).await
}

#[get("/courses/<course_id>/progress/lessons")]
async fn lesson_progress(
    state: &State<AppState>,
    user: CurrentUser,
    course_id: String,
) -> ApiResponse<Vec<LessonProgress>> {
    run(state, move |s, c| progress::lesson_progress(&s.adapter, &user.profile.id, &course_id, c)).await
}

// ── Announcements & schedules ──

#[get("/courses/<course_id>/announcements")]
async fn list_announcements(
    state: &State<AppState>,
    user: CurrentUser,
    course_id: String,
) -> ApiResponse<Vec<Announcement>> {
    run(state, move |s, c| {
        visible_course(&s.adapter, &user.profile, &course_id, c)?;
        announcements::list(&s.adapter, &course_id, c)
    })
    .await
}

#[post("/courses/<course_id>/announcements", data = "<form>")]
async fn create_announcement(
    state: &State<AppState>,
    teacher: TeacherUser,
    course_id: String,
    form: Json<AnnouncementForm>,
) -> ApiResponse<Announcement> {
    let form = form.into_inner();
    run(state, move |s, c| announcements::create(&s.adapter, &teacher.profile, &course_id, &form, c)).await
}

#[get("/courses/<course_id>/schedules?<upcoming>")]
async fn list_schedules(
    state: &State<AppState>,
    user: CurrentUser,
    course_id: String,
    upcoming: Option<bool>,
) -> ApiResponse<Vec<Schedule>> {
    run(state, move |s, c| {
        visible_course(&s.adapter, &user.profile, &course_id, c)?;
        if upcoming.unwrap_or(false) {
            schedules::upcoming(&s.adapter, &course_id, &crate::models::now_rfc3339(), c)
        } else {
            schedules::list(&s.adapter, &course_id, c)
        }
    })
    .await
}

#[post("/courses/<course_id>/schedules", data = "<form>")]
async fn create_schedule(
    state: &State<AppState>,
    teacher: TeacherUser,
    course_id: String,
    form: Json<ScheduleForm>,
) -> ApiResponse<Schedule> {
    let form = form.into_inner();
    run(state, move |s, c| schedules::create(&s.adapter, &teacher.profile, &course_id, &form, c)).await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_published,
        list_teaching,
        create_course,
        outline,
        set_published,
        add_chapter,
        add_lesson,
        enroll,
        drop_course,
        my_courses,
        students,
        complete_lesson,
        course_progress,
        lesson_progress,
        list_announcements,
        create_announcement,
        list_schedules,
        create_schedule,
    ]
}
