use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, InputMode, SUGGESTIONS};
use crate::transcript::Role;

/// Convert **bold** markers in a reply line to styled spans. Anything the
/// assistant sends beyond that is rendered literally.
fn styled_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let (before, marked) = rest.split_at(start);
        let after = &marked[2..];
        match after.find("**") {
            Some(end) => {
                if !before.is_empty() {
                    spans.push(Span::raw(before.to_string()));
                }
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after[end + 2..];
            }
            // No closing marker: keep the rest literal
            None => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_reset_confirm {
        render_reset_confirm(frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.is_busy() {
        Span::styled(" waiting ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" online ", Style::default().fg(Color::Green))
    };

    let title = Line::from(vec![
        Span::styled(" LoanNetwork AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} ", app.client.endpoint()),
            Style::default().fg(Color::DarkGray),
        ),
        status,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // The scroll arithmetic needs the inner size, without the borders
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Mortgage Assistant ");

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.conversation.transcript().messages() {
        let (speaker, color) = match msg.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("LoanNetwork AI", Color::Yellow),
        };

        let mut speaker_spans = vec![Span::styled(
            speaker,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];
        if let Some(stamp) = &msg.timestamp {
            speaker_spans.push(Span::styled(
                format!(" · {}", stamp),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(speaker_spans));

        for line in msg.content.lines() {
            match msg.role {
                Role::User => lines.push(Line::from(line.to_string())),
                Role::Assistant => lines.push(styled_line(line)),
            }
        }
        lines.push(Line::default());
    }

    if app.is_busy() {
        lines.push(Line::from(Span::styled(
            "LoanNetwork AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // One to three dots, advanced by the tick timer
        let thinking = format!("Thinking{}", ".".repeat(app.animation_frame as usize + 1));
        lines.push(Line::from(Span::styled(
            thinking,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    if app.show_suggestions() {
        lines.push(Line::from(Span::styled(
            "Quick questions:",
            Style::default().fg(Color::DarkGray),
        )));
        for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}. ", i + 1),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(*suggestion, Style::default().fg(Color::Gray)),
            ]));
        }
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.is_busy() {
        " Message (waiting for reply) "
    } else {
        " Message (Enter to send) "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Long input scrolls horizontally; slide the window left just enough
    // to keep the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = app.cursor.saturating_sub(inner_width.saturating_sub(1));

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // The terminal cursor only makes sense while typing
    if app.input_mode == InputMode::Editing && !app.show_reset_confirm {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.show_reset_confirm {
        vec![
            Span::styled(" y ", key_style),
            Span::styled(" start fresh ", label_style),
            Span::styled(" n ", key_style),
            Span::styled(" keep chatting ", label_style),
        ]
    } else {
        match app.input_mode {
            InputMode::Editing => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" browse ", label_style),
                Span::styled(" Ctrl+r ", key_style),
                Span::styled(" new chat ", label_style),
                Span::styled(" Ctrl+c ", key_style),
                Span::styled(" quit ", label_style),
            ],
            InputMode::Normal => {
                let mut hints = vec![
                    Span::styled(" i ", key_style),
                    Span::styled(" type ", label_style),
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                ];
                if app.show_suggestions() {
                    hints.extend(vec![
                        Span::styled(" 1-3 ", key_style),
                        Span::styled(" quick question ", label_style),
                    ]);
                }
                hints.extend(vec![
                    Span::styled(" r ", key_style),
                    Span::styled(" new chat ", label_style),
                    Span::styled(" q ", key_style),
                    Span::styled(" quit ", label_style),
                ]);
                hints
            }
        }
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_reset_confirm(frame: &mut Frame, area: Rect) {
    // Centered popup, clamped to narrow terminals
    let popup_width = 66.min(area.width.saturating_sub(4));
    let popup_height = 6;
    let popup_area = Rect::new(
        (area.width.saturating_sub(popup_width)) / 2,
        (area.height.saturating_sub(popup_height)) / 2,
        popup_width,
        popup_height,
    );

    // Whatever the chat drew there must not bleed through
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" New Chat ");

    let body = Text::from(vec![
        Line::from("Start a new chat? This will clear your current conversation."),
        Line::default(),
        Line::from(vec![
            Span::styled(" y ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" yes   "),
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" no"),
        ]),
    ]);

    let popup = Paragraph::new(body).block(block).wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}
