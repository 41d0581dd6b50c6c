//! Line-oriented front end: quiz loop, dashboard, report.

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use quiz_core::model::{OptionIndex, PerformanceLevel};
use services::{QuizLoopService, QuizReport, QuizSession, StatsDashboard};

/// What the learner typed at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Choice(OptionIndex),
    Quit,
    Unrecognized,
}

fn parse_reply(line: &str) -> Reply {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Reply::Quit;
    }
    OptionIndex::from_label(line).map_or(Reply::Unrecognized, Reply::Choice)
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .await
        .context("failed to read answer")?;
    Ok((read > 0).then_some(line))
}

/// Run one quiz to completion, or until the learner quits or input ends.
///
/// # Errors
///
/// Returns an error if questions cannot be loaded after the learner declines
/// to retry, or if terminal I/O fails.
pub async fn play<R, W>(svc: &QuizLoopService, input: &mut R, out: &mut W) -> anyhow::Result<QuizReport>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = svc.new_session();
    while let Err(err) = svc.start(&mut session).await {
        writeln!(out, "No questions available ({err}). Retry? [y/N]")?;
        let retry = read_line(input)
            .await?
            .is_some_and(|l| l.trim().eq_ignore_ascii_case("y"));
        if !retry {
            return Err(err).context("quiz could not start");
        }
    }

    while !session.phase().is_complete() {
        if svc.present(&mut session).is_none() {
            break;
        }
        render_question(&session, out)?;

        let selected = loop {
            let Some(line) = read_line(input).await? else {
                return finish(&session, out);
            };
            match parse_reply(&line) {
                Reply::Choice(index) => break index,
                Reply::Quit => return finish(&session, out),
                Reply::Unrecognized => writeln!(out, "Answer with A, B, C or D (q to quit).")?,
            }
        };

        let Some(question_id) = session.current_question().map(|q| q.id) else {
            break;
        };
        if let Some(answer) = svc.answer(&mut session, question_id, selected).await {
            render_feedback(&session, answer.outcome.is_correct(), answer.outcome.correct_option, out)?;
            if !answer.is_persisted() {
                writeln!(out, "(result saved locally only)")?;
            }
        }

        while let Err(err) = svc.advance(&mut session).await {
            writeln!(out, "Could not fetch the next question ({err}). Press Enter to retry, q to stop.")?;
            match read_line(input).await? {
                Some(line) if parse_reply(&line) != Reply::Quit => {}
                _ => return finish(&session, out),
            }
        }
    }

    finish(&session, out)
}

fn render_question<W: Write>(session: &QuizSession, out: &mut W) -> anyhow::Result<()> {
    let Some(view) = session.localized_current() else {
        return Ok(());
    };
    let progress = session.progress();
    writeln!(out)?;
    writeln!(out, "[{}/{}] {}", progress.position, progress.planned, view.category)?;
    writeln!(out, "{}", view.prompt)?;
    for (index, text) in view.labelled_options() {
        writeln!(out, "  {}. {text}", index.letter())?;
    }
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn render_feedback<W: Write>(
    session: &QuizSession,
    correct: bool,
    correct_option: OptionIndex,
    out: &mut W,
) -> anyhow::Result<()> {
    if correct {
        writeln!(out, "Correct!")?;
    } else {
        writeln!(out, "Wrong, the answer is {}.", correct_option.letter())?;
    }
    if let Some(view) = session.localized_current() {
        writeln!(out, "{}", view.explanation)?;
    }
    Ok(())
}

fn finish<W: Write>(session: &QuizSession, out: &mut W) -> anyhow::Result<QuizReport> {
    let report = session.report();
    print_report(&report, out)?;
    Ok(report)
}

pub fn print_report<W: Write>(report: &QuizReport, out: &mut W) -> anyhow::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Score: {}/{} ({}%)",
        report.correct, report.answered, report.success_rate
    )?;
    for line in &report.categories {
        writeln!(
            out,
            "  {:<20} {}/{} ({}%)",
            line.category.as_str(),
            line.correct,
            line.total,
            line.rate
        )?;
    }
    Ok(())
}

fn level_label(level: PerformanceLevel) -> &'static str {
    match level {
        PerformanceLevel::Excellent => "excellent",
        PerformanceLevel::Good => "good",
        PerformanceLevel::NeedsWork => "needs work",
    }
}

pub fn print_dashboard<W: Write>(dashboard: &StatsDashboard, out: &mut W) -> anyhow::Result<()> {
    let overall = &dashboard.overall;
    writeln!(
        out,
        "Overall: {}/{} correct ({}%)",
        overall.total_correct, overall.total_questions, overall.overall_percentage
    )?;

    if !dashboard.categories.is_empty() {
        writeln!(out)?;
        writeln!(out, "By category:")?;
    }
    for row in &dashboard.categories {
        writeln!(
            out,
            "  {:<20} {:>4}/{:<4} {:>3}%  {}",
            row.category.as_str(),
            row.correct_answers,
            row.total_questions,
            row.percentage,
            level_label(row.level)
        )?;
    }

    if !dashboard.recent.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recent attempts:")?;
    }
    for recent in &dashboard.recent {
        let attempt = &recent.attempt;
        let category = recent.category.as_ref().map_or("-", |c| c.as_str());
        let latency = attempt
            .response_ms
            .map_or_else(|| "-".to_owned(), |ms| format!("{:.1}s", ms as f64 / 1000.0));
        writeln!(
            out,
            "  {}  #{:<5} {:<20} {:<5} {}",
            attempt.created_at.format("%Y-%m-%d %H:%M"),
            attempt.question_id,
            category,
            if attempt.is_correct { "ok" } else { "miss" },
            latency
        )?;
    }
    Ok(())
}
