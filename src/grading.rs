//! Grading and progress arithmetic over already-fetched records.
//!
//! Everything here is pure: services fetch the documents, these functions
//! turn them into numbers.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::assignment::{Assignment, Submission};
use crate::models::quiz::{QuizAttempt, QuizQuestion};

/// Share of total points needed to pass, as the fraction PASS_NUM / PASS_DEN.
const PASS_NUM: u64 = 3;
const PASS_DEN: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub score: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
}

/// Score a set of answers keyed by question id. Answers must match the
/// stored correct answer exactly. Unanswered questions score zero; answers
/// to unknown questions are ignored.
pub fn grade_quiz(questions: &[QuizQuestion], answers: &HashMap<String, String>) -> QuizResult {
    let mut score: u32 = 0;
    let mut total: u32 = 0;
    for q in questions {
        total = total.saturating_add(q.points);
        let correct = answers
            .get(&q.id)
            .map(|a| *a == q.correct_answer)
            .unwrap_or(false);
        if correct {
            score = score.saturating_add(q.points);
        }
    }
    QuizResult {
        score,
        total_points: total,
        percentage: percentage(score as f64, total as f64),
        passed: passes(score, total),
    }
}

/// `score >= 60% of total`, compared in integers so 3/5 is exactly a pass.
pub fn passes(score: u32, total: u32) -> bool {
    PASS_DEN * score as u64 >= PASS_NUM * total as u64
}

pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    round2(part / whole * 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

/// Mean percentage over each lesson's best attempt.
pub fn quiz_average(attempts: &[QuizAttempt]) -> Option<f64> {
    let mut best: HashMap<&str, f64> = HashMap::new();
    for a in attempts {
        let entry = best.entry(a.lesson_id.as_str()).or_insert(a.percentage);
        if a.percentage > *entry {
            *entry = a.percentage;
        }
    }
    let values: Vec<f64> = best.into_values().collect();
    mean(&values)
}

/// Mean of `grade / max_points * 100` over graded submissions. Submissions
/// whose assignment is unknown or has no points are skipped.
pub fn assignment_average(assignments: &[Assignment], submissions: &[Submission]) -> Option<f64> {
    let max_points: HashMap<&str, f64> = assignments
        .iter()
        .map(|a| (a.id.as_str(), a.max_points))
        .collect();
    let values: Vec<f64> = submissions
        .iter()
        .filter_map(|s| {
            let grade = s.grade?;
            let max = *max_points.get(s.assignment_id.as_str())?;
            (max > 0.0).then(|| grade / max * 100.0)
        })
        .collect();
    mean(&values)
}

/// Equal-weight blend of the two averages, falling back to whichever exists.
pub fn overall_grade(quiz_avg: Option<f64>, assignment_avg: Option<f64>) -> Option<f64> {
    match (quiz_avg, assignment_avg) {
        (Some(q), Some(a)) => Some(round2(0.5 * q + 0.5 * a)),
        (Some(q), None) => Some(q),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

pub fn course_progress(completed: usize, total: usize) -> f64 {
    percentage(completed.min(total) as f64, total as f64)
}
