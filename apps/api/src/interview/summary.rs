//! Final-score fold and the templated interview summary.
//!
//! The canonical per-answer scale is 0.0–5.0; the final score is the SUM of
//! the six answer scores (never an average), giving a 30-point maximum.

use crate::interview::session::AnswerRecord;
use crate::interview::tier::QUESTION_COUNT;

/// Maximum attainable final score: 6 questions x 5 points.
pub const MAX_FINAL_SCORE: f64 = QUESTION_COUNT as f64 * 5.0;

/// Sum of recorded per-answer scores.
pub fn final_score(answers: &[AnswerRecord]) -> f64 {
    answers.iter().map(|a| a.score).sum()
}

pub fn percentage(total: f64) -> f64 {
    (total / MAX_FINAL_SCORE) * 100.0
}

/// Performance label thresholds: >=80 Excellent, 60-79 Good, 40-59 Average,
/// below 40 Needs Improvement.
pub fn performance_label(pct: f64) -> &'static str {
    if pct >= 80.0 {
        "Excellent"
    } else if pct >= 60.0 {
        "Good"
    } else if pct >= 40.0 {
        "Average"
    } else {
        "Needs Improvement"
    }
}

/// Renders the interviewer-facing summary from the recorded answers.
/// Purely templated — no LLM call.
pub fn render_summary(candidate_name: Option<&str>, answers: &[AnswerRecord]) -> String {
    let total = final_score(answers);
    let pct = percentage(total);
    let label = performance_label(pct);
    let name = candidate_name.unwrap_or("The candidate");

    let mut summary = format!(
        "{name} answered {} of {QUESTION_COUNT} questions, scoring {total:.1}/{MAX_FINAL_SCORE:.0} ({pct:.1}%). Performance: {label}.",
        answers.iter().filter(|a| !a.timed_out).count(),
    );

    if let Some(best) = answers
        .iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).expect("scores are finite"))
    {
        summary.push_str(&format!(
            " Strongest answer: question {} ({:.1}/5, {}).",
            best.question_index + 1,
            best.score,
            best.tier
        ));
    }
    if let Some(worst) = answers
        .iter()
        .min_by(|a, b| a.score.partial_cmp(&b.score).expect("scores are finite"))
    {
        summary.push_str(&format!(
            " Weakest answer: question {} ({:.1}/5, {}).",
            worst.question_index + 1,
            worst.score,
            worst.tier
        ));
    }

    let timeouts = answers.iter().filter(|a| a.timed_out).count();
    if timeouts > 0 {
        summary.push_str(&format!(" {timeouts} question(s) timed out unanswered."));
    }

    summary
}
