use chrono::Local;
use ragchat_client::{Backend, Message, Role};
use ragchat_core::{format_file_size, Document, SUGGESTIONS};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, ConnectionStatus, InputMode};

const SIDEBAR_WIDTH: u16 = 32;

pub fn draw<B: Backend>(f: &mut Frame, app: &App<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Sidebar + transcript
            Constraint::Length(3), // Composer
            Constraint::Length(1), // Notification / help line
        ])
        .split(f.size());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);

    draw_header(f, app, chunks[0]);
    draw_sidebar(f, app, body[0]);
    if app.state.messages.is_empty() {
        draw_welcome(f, app, body[1]);
    } else {
        draw_messages(f, app, body[1]);
    }
    draw_input(f, app, chunks[2]);
    draw_status_bar(f, app, chunks[3]);
}

fn document_count_label(count: usize) -> String {
    format!("{} document{} loaded", count, if count == 1 { "" } else { "s" })
}

fn draw_header<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let status_color = match app.status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected => Color::Red,
        ConnectionStatus::Connecting => Color::Yellow,
    };

    let mut spans = vec![
        Span::styled(
            " RAG Assistant",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        ),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
        Span::raw(document_count_label(app.state.documents.len())),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
        Span::styled(app.status.to_string(), Style::default().fg(status_color)),
    ];
    if app.state.is_streaming {
        spans.push(Span::styled("  ◐ Answering...", Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_sidebar<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let (list_area, progress_area) = if app.state.is_uploading {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);
        (split[0], Some(split[1]))
    } else {
        (area, None)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Knowledge Base")
        .border_style(Style::default().fg(Color::Blue));

    if app.state.documents.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(Span::styled(
                "No documents uploaded yet",
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Ctrl+O to upload",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        f.render_widget(empty, list_area);
    } else {
        let width = list_area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = app
            .state
            .documents
            .iter()
            .map(|doc| document_item(doc, app.state.deleting_id.as_deref() == Some(&doc.id), width))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");

        let mut state = ListState::default();
        state.select(Some(app.selected_document));
        f.render_stateful_widget(list, list_area, &mut state);
    }

    if let Some(progress_area) = progress_area {
        let percent = app.state.upload_progress.clamp(0.0, 100.0).round() as u16;
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Uploading"))
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(percent);
        f.render_widget(gauge, progress_area);
    }
}

fn document_item(doc: &Document, deleting: bool, width: usize) -> ListItem<'static> {
    let name_style = if deleting {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    let mut detail = format!(
        "{} · {}",
        doc.doc_type.as_str().to_uppercase(),
        format_file_size(doc.size)
    );
    if deleting {
        detail.push_str(" · deleting");
    }

    ListItem::new(vec![
        Line::from(Span::styled(truncate(&doc.name, width), name_style)),
        Line::from(Span::styled(detail, Style::default().fg(Color::DarkGray))),
    ])
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width || width < 2 {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 2 > width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

fn draw_welcome<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Welcome to RAG Assistant",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from("Upload your documents to the knowledge base, then ask questions about their content."),
        Line::from(""),
    ];

    for (idx, suggestion) in SUGGESTIONS.iter().enumerate() {
        let selected = idx == app.selected_suggestion;
        let marker = if selected { "› " } else { "  " };
        let title_style = if selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Green)),
            Span::styled(suggestion.title, title_style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  {}", suggestion.query),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[Tab] next suggestion  [Enter] ask it",
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    )));

    let welcome = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Chat")
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(welcome, area);
}

fn draw_messages<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let last_index = app.state.messages.len() - 1;
    let mut lines = Vec::new();
    for (idx, msg) in app.state.messages.iter().enumerate() {
        let streaming = app.state.is_streaming && idx == last_index && msg.role == Role::Assistant;
        format_message(msg, streaming, &mut lines);
    }

    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let total = wrapped_height(&lines, inner_width);
    let scroll = total
        .saturating_sub(inner_height)
        .saturating_sub(app.scroll_offset);

    let title = format!("Chat (Session: {}...)", short_id(&app.state.session_id));
    let transcript = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));

    f.render_widget(transcript, area);
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Rows the lines take once wrapped to `width`
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| s.content.width()).sum();
            w.div_ceil(width).max(1)
        })
        .sum()
}

fn format_message<'a>(msg: &'a Message, streaming: bool, lines: &mut Vec<Line<'a>>) {
    let (label, style) = match msg.role {
        Role::User => ("You", Style::default().fg(Color::Cyan)),
        Role::Assistant => ("Assistant", Style::default().fg(Color::Green)),
    };

    let timestamp = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();
    lines.push(Line::from(vec![
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {}", timestamp),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ),
    ]));

    if msg.content.is_empty() && streaming {
        lines.push(Line::from(vec![
            Span::styled("Thinking", Style::default().fg(Color::DarkGray)),
            Span::styled("▌", Style::default().fg(Color::Green)),
        ]));
    } else {
        let mut content_lines: Vec<Line> = msg
            .content
            .lines()
            .map(|text| Line::from(Span::raw(text)))
            .collect();
        if streaming {
            match content_lines.last_mut() {
                Some(last) => last.spans.push(Span::styled("▌", Style::default().fg(Color::Green))),
                None => content_lines.push(Line::from(Span::styled("▌", Style::default().fg(Color::Green)))),
            }
        }
        lines.extend(content_lines);
    }

    // Empty line for separation
    lines.push(Line::from(""));
}

fn draw_input<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let (title, text) = match app.input_mode {
        InputMode::UploadPath => (
            "Upload file or directory  [Enter] upload  [Esc] cancel",
            Line::from(vec![
                Span::styled("path: ", Style::default().fg(Color::Yellow)),
                Span::styled(app.upload_path.as_str(), Style::default().fg(Color::White)),
                Span::styled("▌", Style::default().fg(Color::Yellow)),
            ]),
        ),
        InputMode::Normal if app.state.is_streaming => (
            "Input",
            Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    "Waiting for the answer...",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
                ),
            ]),
        ),
        InputMode::Normal if app.input.is_empty() => (
            "Input",
            Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Green)),
                Span::styled(
                    "Ask a question about your documents...",
                    Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
                ),
            ]),
        ),
        InputMode::Normal => (
            "Input",
            Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Green)),
                Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
                Span::styled("▌", Style::default().fg(Color::Green)),
            ]),
        ),
    };

    let input = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(input, area);
}

fn draw_status_bar<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let status_bar = match app.latest_toast() {
        Some(toast) => {
            let (icon, color) = if toast.notification.is_error() {
                ("✗", Color::Red)
            } else {
                ("✓", Color::Green)
            };
            Paragraph::new(format!(
                " {} {}: {}",
                icon, toast.notification.title, toast.notification.description
            ))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        }
        None => {
            let help = "[Enter] Send  [Ctrl+O] Upload  [Ctrl+D] Delete  [Alt+↑/↓] Select  [Ctrl+R] Refresh  [Ctrl+C] Quit";
            Paragraph::new(help)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::REVERSED))
        }
    };

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_count_label() {
        assert_eq!(document_count_label(0), "0 documents loaded");
        assert_eq!(document_count_label(1), "1 document loaded");
        assert_eq!(document_count_label(3), "3 documents loaded");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.pdf", 20), "short.pdf");
        assert_eq!(truncate("a-very-long-name.pdf", 8), "a-very-…");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("1234567890"), Line::from(""), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
