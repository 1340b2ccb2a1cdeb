/// One question asked in this session and, once it arrives, its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    question: String,
    answer: Option<String>,
}

impl Exchange {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// `None` while the question is still being answered.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }
}

/// Application state for the chat TUI.
///
/// Holds the question being typed, the session history and which panel has
/// keyboard focus. Only one question may be in flight at a time.
#[derive(Debug, Clone)]
pub struct App {
    input: String,
    exchanges: Vec<Exchange>,
    selected_index: Option<usize>,
    focus: Focus,
    pending: bool,
    answer_scroll: u16,
}

/// Panel focus state for keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Question input; typing edits the question, Enter submits it.
    Input,
    /// History list; j/k move between earlier questions.
    History,
    /// Answer view; j/k scroll.
    Answer,
}

impl App {
    /// Creates an empty session focused on the question input.
    ///
    /// # Examples
    ///
    /// ```
    /// use cloudqa::tui::{App, Focus};
    ///
    /// let app = App::new();
    /// assert!(app.exchanges().is_empty());
    /// assert_eq!(app.focus(), Focus::Input);
    /// ```
    pub fn new() -> Self {
        Self {
            input: String::new(),
            exchanges: Vec::new(),
            selected_index: None,
            focus: Focus::Input,
            pending: false,
            answer_scroll: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Whether a question is waiting for its answer.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn answer_scroll(&self) -> u16 {
        self.answer_scroll
    }

    pub fn selected_exchange(&self) -> Option<&Exchange> {
        self.selected_index.and_then(|i| self.exchanges.get(i))
    }

    pub fn push_input_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input_char(&mut self) {
        self.input.pop();
    }

    /// Takes the typed question for submission.
    ///
    /// Returns `None` when the input is blank or another question is still in
    /// flight; the input is left untouched in that case. Otherwise the input
    /// is cleared, the question is appended to the history and selected, and
    /// the app stays pending until [`App::receive_answer`] is called.
    pub fn take_question(&mut self) -> Option<String> {
        let question = self.input.trim();
        if self.pending || question.is_empty() {
            return None;
        }
        let question = question.to_string();
        self.input.clear();
        self.exchanges.push(Exchange {
            question: question.clone(),
            answer: None,
        });
        self.selected_index = Some(self.exchanges.len() - 1);
        self.answer_scroll = 0;
        self.pending = true;
        Some(question)
    }

    /// Stores the answer for the question in flight.
    pub fn receive_answer(&mut self, answer: String) {
        if let Some(exchange) = self.exchanges.iter_mut().rev().find(|e| e.answer.is_none()) {
            exchange.answer = Some(answer);
        }
        self.pending = false;
    }

    /// Cycles focus: Input → History → Answer → Input.
    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::History,
            Focus::History => Focus::Answer,
            Focus::Answer => Focus::Input,
        };
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Answer,
            Focus::History => Focus::Input,
            Focus::Answer => Focus::History,
        };
    }

    pub fn reset_focus(&mut self) {
        self.focus = Focus::Input;
    }

    /// Moves the history selection down, wrapping to the top.
    pub fn select_next(&mut self) {
        if self.exchanges.is_empty() {
            return;
        }
        self.selected_index = Some(match self.selected_index {
            Some(i) if i + 1 < self.exchanges.len() => i + 1,
            _ => 0,
        });
        self.answer_scroll = 0;
    }

    /// Moves the history selection up, wrapping to the bottom.
    pub fn select_previous(&mut self) {
        if self.exchanges.is_empty() {
            return;
        }
        let last = self.exchanges.len() - 1;
        self.selected_index = Some(match self.selected_index {
            Some(0) | None => last,
            Some(i) => i - 1,
        });
        self.answer_scroll = 0;
    }

    pub fn scroll_answer_down(&mut self, amount: u16) {
        self.answer_scroll = self.answer_scroll.saturating_add(amount);
    }

    pub fn scroll_answer_up(&mut self, amount: u16) {
        self.answer_scroll = self.answer_scroll.saturating_sub(amount);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
