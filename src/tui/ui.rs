//! Rendering for the chat TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use super::app::{App, Focus};

/// Draws the question input, history list, answer view and shortcut bar.
pub fn draw(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(main_chunks[1]);

    render_input(frame, app, main_chunks[0]);
    render_history(frame, app, content_chunks[0]);
    render_answer(frame, app, content_chunks[1]);
    render_shortcut_bar(frame, app, main_chunks[2]);
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style)
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus() == Focus::Input;
    let title = if app.is_pending() {
        "Question (answering...)"
    } else {
        "Question"
    };

    let mut content = app.input().to_string();
    if focused {
        content.push('█');
    }

    let paragraph = Paragraph::new(content).block(focus_block(title, focused));
    frame.render_widget(paragraph, area);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .exchanges()
        .iter()
        .map(|exchange| {
            let style = if exchange.answer().is_none() {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(exchange.question().to_string(), style)))
        })
        .collect();

    let list = List::new(items)
        .block(focus_block("History", app.focus() == Focus::History))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_answer(frame: &mut Frame, app: &App, area: Rect) {
    let block = focus_block("Answer", app.focus() == Focus::Answer);

    let content = match app.selected_exchange() {
        Some(exchange) => match exchange.answer() {
            Some(answer) => tui_markdown::from_str(answer),
            None => Text::from(Span::styled(
                "Working on it...",
                Style::default().fg(Color::DarkGray),
            )),
        },
        None => Text::from("Ask a question about your S3 and Azure data."),
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.answer_scroll(), 0));
    frame.render_widget(paragraph, area);
}

fn render_shortcut_bar(frame: &mut Frame, app: &App, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled("Ctrl+C", key_style),
        Span::raw(": quit"),
        Span::styled(" | ", sep_style),
        Span::styled("Tab", key_style),
        Span::raw(": next panel"),
        Span::styled(" | ", sep_style),
        Span::styled("Esc", key_style),
        Span::raw(": input"),
    ];

    match app.focus() {
        Focus::Input => {
            spans.push(Span::styled(" | ", sep_style));
            spans.push(Span::styled("Enter", key_style));
            spans.push(Span::raw(": ask"));
        }
        Focus::History => {
            spans.push(Span::styled(" | ", sep_style));
            spans.push(Span::styled("j/k", key_style));
            spans.push(Span::raw(": select"));
        }
        Focus::Answer => {
            spans.push(Span::styled(" | ", sep_style));
            spans.push(Span::styled("j/k", key_style));
            spans.push(Span::raw(": scroll"));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
