use serde::Serialize;

use crate::adapter::{Adapter, Query};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::grading;
use crate::models::assignment::{Assignment, Submission};
use crate::models::profile::Profile;
use crate::models::quiz::QuizAttempt;

use super::assignments;
use super::enrollment;
use super::managed_course;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,
    pub quiz_average: Option<f64>,
    pub assignment_average: Option<f64>,
    pub overall: Option<f64>,
    pub quiz_attempts: usize,
    pub graded_assignments: usize,
}

fn summarize(
    student: &Profile,
    course_id: &str,
    attempts: &[QuizAttempt],
    assignments: &[Assignment],
    submissions: &[Submission],
) -> GradeSummary {
    let quiz_average = grading::quiz_average(attempts);
    let assignment_average = grading::assignment_average(assignments, submissions);
    GradeSummary {
        student_id: student.id.clone(),
        student_name: student.full_name.clone(),
        course_id: course_id.to_string(),
        quiz_average,
        assignment_average,
        overall: grading::overall_grade(quiz_average, assignment_average),
        quiz_attempts: attempts.len(),
        graded_assignments: submissions.iter().filter(|s| s.grade.is_some()).count(),
    }
}

pub fn student_summary(
    adapter: &Adapter,
    student: &Profile,
    course_id: &str,
    cancel: &CancelToken,
) -> Result<GradeSummary> {
    let attempts: Vec<QuizAttempt> = adapter.fetch_all(
        &Query::from("quiz_attempts")
            .eq("student_id", student.id.as_str())
            .eq("course_id", course_id),
        cancel,
    )?;
    let assignments = assignments::list(adapter, course_id, cancel)?;
    let submissions = assignments::submissions_of_student(adapter, &student.id, course_id, cancel)?;
    Ok(summarize(student, course_id, &attempts, &assignments, &submissions))
}

/// One summary per actively enrolled student. Fetches the course's
/// attempts and submissions once and splits them per student.
pub fn gradebook(adapter: &Adapter, caller: &Profile, course_id: &str, cancel: &CancelToken) -> Result<Vec<GradeSummary>> {
    managed_course(adapter, caller, course_id, cancel)?;
    let students = enrollment::students(adapter, caller, course_id, cancel)?;
    let attempts: Vec<QuizAttempt> =
        adapter.fetch_all(&Query::from("quiz_attempts").eq("course_id", course_id), cancel)?;
    let assignments = assignments::list(adapter, course_id, cancel)?;
    let submissions: Vec<Submission> = adapter.fetch_all(
        &Query::from("assignment_submissions").eq("course_id", course_id),
        cancel,
    )?;

    Ok(students
        .iter()
        .map(|student| {
            let mine: Vec<QuizAttempt> = attempts
                .iter()
                .filter(|a| a.student_id == student.id)
                .cloned()
                .collect();
            let subs: Vec<Submission> = submissions
                .iter()
                .filter(|s| s.student_id == student.id)
                .cloned()
                .collect();
            summarize(student, course_id, &mine, &assignments, &subs)
        })
        .collect())
}
