use std::fmt::Write as _;

use cbt_core::model::{AnswerOutcome, TestConfig};
use services::{
    GuestId, IdleView, ResultView, RunningView, SessionView, format_completed_at,
    format_countdown, format_time_taken,
};

/// Render one screen of the read model as plain text.
pub fn render(view: &SessionView, config: &TestConfig, guest: &GuestId) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==  [{}]", config.app_name(), guest);
    match view {
        SessionView::Idle(idle) => render_idle(&mut out, idle),
        SessionView::Running(running) => render_running(&mut out, running),
        SessionView::Completed(result) => render_result(&mut out, config, result),
    }
    out
}

fn render_idle(out: &mut String, idle: &IdleView) {
    let _ = writeln!(out, "{}", idle.test_title);
    let _ = writeln!(
        out,
        "{} questions | {} minutes | {} marks each",
        idle.question_count, idle.duration_minutes, idle.marks_per_question
    );
    if idle.question_count == 0 {
        let _ = writeln!(out, "No questions loaded yet. Try `refresh`.");
    } else {
        let _ = writeln!(out, "Type `start` to begin.");
    }
}

fn render_running(out: &mut String, running: &RunningView) {
    let _ = writeln!(
        out,
        "Time left {}  |  Answered {}/{}  |  {} left",
        format_countdown(running.remaining_secs),
        running.progress.answered,
        running.progress.total,
        running.progress.unanswered
    );

    let Some(question) = &running.question else {
        let _ = writeln!(out, "This attempt has no questions. Type `s` to submit.");
        return;
    };

    let _ = writeln!(out, "Question {} of {}", running.index + 1, running.progress.total);
    let _ = writeln!(out, "{}", question.text());
    for (key, text) in question.options() {
        let marker = if running.selected == Some(key) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}) {text}", key.letter());
    }

    let cells: Vec<String> = running
        .navigator
        .iter()
        .map(|cell| match (cell.current, cell.answered) {
            (true, _) => format!("[{}]", cell.number),
            (false, true) => format!("{}*", cell.number),
            (false, false) => cell.number.to_string(),
        })
        .collect();
    let _ = writeln!(out, "{}", cells.join(" "));

    let back = if running.can_go_back { "p: prev  " } else { "" };
    let forward = if running.can_go_forward { "n: next  " } else { "" };
    let _ = writeln!(out, "{back}{forward}s: submit");
}

fn render_result(out: &mut String, config: &TestConfig, view: &ResultView) {
    let result = &view.result;
    let analytics = result.analytics();
    let _ = writeln!(out, "{} result", config.test_title());
    let _ = writeln!(
        out,
        "{}  {}/{}  ({}%)",
        view.tier.label(),
        result.score(),
        result.total(),
        result.percentage()
    );
    let _ = writeln!(out, "{}", view.tier.message());
    let _ = writeln!(
        out,
        "Correct {}  Wrong {}  Skipped {}  |  Time {}  |  {}",
        view.correct_count,
        view.wrong_count,
        view.skipped_count,
        format_time_taken(analytics.time_taken_ms),
        format_completed_at(result.completed_at())
    );

    for item in &view.review {
        let status = match item.outcome {
            AnswerOutcome::Correct => "correct",
            AnswerOutcome::Wrong => "wrong",
            AnswerOutcome::Skipped => "skipped",
        };
        let _ = write!(out, "{:>3}. {} [{status}]", item.number, item.question.text());
        if let Some(correct) = item.correction() {
            let _ = write!(out, " -> {correct}");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "Type `x` to return to the start screen.");
}
