use std::collections::HashMap;

use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Deserialize;

use crate::models::assignment::{Assignment, AssignmentForm, GradeForm, Submission, SubmissionForm};
use crate::models::capstone::{CapstoneForm, CapstoneProject, CapstoneSubmission, CapstoneSubmissionForm};
use crate::models::quiz::{PublicQuestion, QuizAttempt, QuizQuestion, QuizQuestionForm};
use crate::security::auth::{CurrentUser, TeacherUser};
use crate::services::grades::GradeSummary;
use crate::services::quiz::QuizOutcome;
use crate::services::{assignments, capstone, grades, quiz, visible_course};

use super::{run, ApiResponse, AppState};

// ── Quizzes ──

#[get("/lessons/<lesson_id>/questions")]
async fn questions(state: &State<AppState>, user: CurrentUser, lesson_id: String) -> ApiResponse<Vec<PublicQuestion>> {
    run(state, move |s, c| quiz::questions(&s.adapter, &user.profile, &lesson_id, c)).await
}

#[post("/lessons/<lesson_id>/questions", data = "<form>")]
async fn add_question(
    state: &State<AppState>,
    teacher: TeacherUser,
    lesson_id: String,
    form: Json<QuizQuestionForm>,
) -> ApiResponse<QuizQuestion> {
    let form = form.into_inner();
    run(state, move |s, c| quiz::add_question(&s.adapter, &teacher.profile, &lesson_id, &form, c)).await
}

#[derive(Debug, Deserialize)]
pub struct AttemptForm {
    /// Question id → chosen answer.
    pub answers: HashMap<String, String>,
}

#[post("/lessons/<lesson_id>/attempts", data = "<form>")]
async fn submit_quiz(
    state: &State<AppState>,
    user: CurrentUser,
    lesson_id: String,
    form: Json<AttemptForm>,
) -> ApiResponse<QuizOutcome> {
    let answers = form.into_inner().answers;
    run(state, move |s, c| quiz::submit(&s.adapter, &user.profile, &lesson_id, &answers, c)).await
}

#[get("/lessons/<lesson_id>/attempts")]
async fn my_attempts(state: &State<AppState>, user: CurrentUser, lesson_id: String) -> ApiResponse<Vec<QuizAttempt>> {
    run(state, move |s, c| quiz::attempts(&s.adapter, &user.profile.id, &lesson_id, c)).await
}

// ── Assignments ──

#[get("/courses/<course_id>/assignments")]
async fn list_assignments(
    state: &State<AppState>,
    user: CurrentUser,
    course_id: String,
) -> ApiResponse<Vec<Assignment>> {
    run(state, move |s, c| {
        visible_course(&s.adapter, &user.profile, &course_id, c)?;
        assignments::list(&s.adapter, &course_id, c)
    })
    .await
}

#[post("/courses/<course_id>/assignments", data = "<form>")]
async fn create_assignment(
    state: &State<AppState>,
    teacher: TeacherUser,
    course_id: String,
    form: Json<AssignmentForm>,
) -> ApiResponse<Assignment> {
    let form = form.into_inner();
    run(state, move |s, c| assignments::create(&s.adapter, &teacher.profile, &course_id, &form, c)).await
}

#[post("/assignments/<assignment_id>/submissions", data = "<form>")]
async fn submit_assignment(
    state: &State<AppState>,
    user: CurrentUser,
    assignment_id: String,
    form: Json<SubmissionForm>,
) -> ApiResponse<Submission> {
    let form = form.into_inner();
    run(state, move |s, c| assignments::submit(&s.adapter, &user.profile, &assignment_id, &form, c)).await
}

#[get("/assignments/<assignment_id>/submissions")]
async fn assignment_submissions(
    state: &State<AppState>,
    teacher: TeacherUser,
    assignment_id: String,
) -> ApiResponse<Vec<Submission>> {
    run(state, move |s, c| assignments::submissions(&s.adapter, &teacher.profile, &assignment_id, c)).await
}

#[put("/submissions/<submission_id>/grade", data = "<form>")]
async fn grade_submission(
    state: &State<AppState>,
    teacher: TeacherUser,
    submission_id: String,
    form: Json<GradeForm>,
) -> ApiResponse<Submission> {
    let form = form.into_inner();
    run(state, move |s, c| assignments::grade(&s.adapter, &teacher.profile, &submission_id, &form, c)).await
}

// ── Capstone ──

#[get("/courses/<course_id>/capstones")]
async fn list_capstones(
    state: &State<AppState>,
    user: CurrentUser,
    course_id: String,
) -> ApiResponse<Vec<CapstoneProject>> {
    run(state, move |s, c| {
        visible_course(&s.adapter, &user.profile, &course_id, c)?;
        capstone::list(&s.adapter, &course_id, c)
    })
    .await
}

#[post("/courses/<course_id>/capstones", data = "<form>")]
async fn create_capstone(
    state: &State<AppState>,
    teacher: TeacherUser,
    course_id: String,
    form: Json<CapstoneForm>,
) -> ApiResponse<CapstoneProject> {
    let form = form.into_inner();
    run(state, move |s, c| capstone::create(&s.adapter, &teacher.profile, &course_id, &form, c)).await
}

#[post("/capstones/<project_id>/submissions", data = "<form>")]
async fn submit_capstone(
    state: &State<AppState>,
    user: CurrentUser,
    project_id: String,
    form: Json<CapstoneSubmissionForm>,
) -> ApiResponse<CapstoneSubmission> {
    let form = form.into_inner();
    run(state, move |s, c| capstone::submit(&s.adapter, &user.profile, &project_id, &form, c)).await
}

#[get("/capstones/<project_id>/submissions")]
async fn capstone_submissions(
    state: &State<AppState>,
    teacher: TeacherUser,
    project_id: String,
) -> ApiResponse<Vec<CapstoneSubmission>> {
    run(state, move |s, c| capstone::submissions(&s.adapter, &teacher.profile, &project_id, c)).await
}

#[put("/capstone-submissions/<submission_id>/grade", data = "<form>")]
async fn grade_capstone(
    state: &State<AppState>,
    teacher: TeacherUser,
    submission_id: String,
    form: Json<GradeForm>,
) -> ApiResponse<CapstoneSubmission> {
    let form = form.into_inner();
    run(state, move |s, c| capstone::grade(&s.adapter, &teacher.profile, &submission_id, &form, c)).await
}

// ── Grades ──

#[get("/courses/<course_id>/grades/me")]
async fn my_grades(state: &State<AppState>, user: CurrentUser, course_id: String) -> ApiResponse<GradeSummary> {
    run(state, move |s, c| grades::student_summary(&s.adapter, &user.profile, &course_id, c)).await
}

#[get("/courses/<course_id>/grades")]
async fn gradebook(state: &State<AppState>, teacher: TeacherUser, course_id: String) -> ApiResponse<Vec<GradeSummary>> {
    run(state, move |s, c| grades::gradebook(&s.adapter, &teacher.profile, &course_id, c)).await
}

pub fn routes() -> Vec<Route> {
    routes![
        questions,
        add_question,
        submit_quiz,
        my_attempts,
        list_assignments,
        create_assignment,
        submit_assignment,
        assignment_submissions,
        grade_submission,
        list_capstones,
        create_capstone,
        submit_capstone,
        capstone_submissions,
        grade_capstone,
        my_grades,
        gradebook,
    ]
}
