//! Terminal chat interface.
//!
//! A question input, the session history and a Markdown answer view, drawn
//! with ratatui over crossterm. Orchestration runs on a worker thread so the
//! screen keeps redrawing while a question is answered.

use std::io;
use std::panic;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self as crossterm_event, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::orchestrator::Orchestrator;

mod app;
pub mod event;
mod ui;

pub use app::{App, Exchange, Focus};
use event::Action;

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal. Must run on every exit path.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Handle to the thread answering questions.
struct Worker {
    questions: Sender<String>,
    answers: Receiver<String>,
}

impl Worker {
    /// Starts a thread that answers each received question in turn.
    fn spawn(orchestrator: Orchestrator) -> Self {
        let (question_tx, question_rx) = mpsc::channel::<String>();
        let (answer_tx, answer_rx) = mpsc::channel::<String>();

        thread::spawn(move || {
            for question in question_rx {
                tracing::info!(question = %question, "answering question");
                let answer = orchestrator.answer(&question);
                if answer_tx.send(answer).is_err() {
                    break;
                }
            }
        });

        Self {
            questions: question_tx,
            answers: answer_rx,
        }
    }

    fn submit(&self, question: String) -> Result<()> {
        self.questions
            .send(question)
            .context("orchestration worker stopped")
    }

    /// Returns a finished answer if one is ready.
    fn poll_answer(&self) -> Result<Option<String>> {
        match self.answers.try_recv() {
            Ok(answer) => Ok(Some(answer)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => anyhow::bail!("orchestration worker stopped"),
        }
    }
}

/// Runs the chat UI until the user quits.
///
/// # Errors
///
/// Returns an error if terminal setup, event polling or rendering fails, or
/// if the worker thread dies. The terminal is restored in every case.
pub fn run(orchestrator: Orchestrator) -> Result<()> {
    init_panic_hook();

    let worker = Worker::spawn(orchestrator);
    let mut app = App::new();
    let mut terminal = init_terminal()?;

    let result = run_event_loop(&mut app, &worker, &mut terminal);

    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Error restoring terminal: {e}");
    }

    result
}

fn run_event_loop(
    app: &mut App,
    worker: &Worker,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    loop {
        if let Some(answer) = worker.poll_answer()? {
            app.receive_answer(answer);
        }

        terminal.draw(|frame| ui::draw(frame, app))?;

        if crossterm_event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = crossterm_event::read()?
        {
            match event::handle_key_event(app, key) {
                Action::Quit => break,
                Action::Submit(question) => worker.submit(question)?,
                Action::None => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn worker_answers_submitted_questions() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"steps": []}"#]));
        let worker = Worker::spawn(Orchestrator::new(Vec::new(), llm, "final"));
        worker.submit("anything?".into()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let answer = loop {
            if let Some(answer) = worker.poll_answer().unwrap() {
                break answer;
            }
            assert!(Instant::now() < deadline, "worker did not answer");
            thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(answer, crate::orchestrator::NO_PLAN_MESSAGE);
    }
}
