use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use guru_core::format::{parse_emphasis, sanitize};
use guru_core::{ChatRole, Message, MessageStatus, Surface};
use crate::app::{App, FormField};

/// Convert a line of reply text to styled spans, rendering **bold** markup
fn styled_line(text: &str, base: Style) -> Line<'static> {
    let spans: Vec<Span<'static>> = parse_emphasis(text)
        .into_iter()
        .map(|segment| {
            let style = if segment.bold {
                base.add_modifier(Modifier::BOLD)
            } else {
                base
            };
            Span::styled(segment.text, style)
        })
        .collect();

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn status_style(status: MessageStatus) -> Style {
    match status {
        MessageStatus::Pending => Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        MessageStatus::Resolved => Style::default(),
        MessageStatus::RateLimited => Style::default().fg(Color::Yellow),
        MessageStatus::Errored => Style::default().fg(Color::Red),
        MessageStatus::ConnectionLost => Style::default().fg(Color::LightRed).add_modifier(Modifier::ITALIC),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view.surface {
        Surface::Login | Surface::Signup => render_form_screen(app, frame, body_area),
        Surface::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.view.alert.is_some() {
        render_alert(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let who = match app.view.surface {
        Surface::Chat => format!(" {} ", app.session.display_name()),
        Surface::Login | Surface::Signup => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" GURU ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(who, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("{} ({})", app.api_url, app.auth_mode.as_str()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode, hints) = match app.view.surface {
        Surface::Login => ("LOG IN", " Tab: switch field | Enter: log in | Ctrl-N: create account | Esc: quit"),
        Surface::Signup => ("SIGN UP", " Tab: switch field | Enter: register | Ctrl-N: back to log in | Esc: quit"),
        Surface::Chat => (
            "CHAT",
            " Enter: send | Ctrl-R: retry | Ctrl-K: clear history | Ctrl-X: log out | PgUp/PgDn: scroll | Esc: quit",
        ),
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", mode), Style::default().bg(Color::Blue).fg(Color::White)),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ];
    if app.is_busy() {
        spans.push(Span::styled("  working", Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_form_screen(app: &App, frame: &mut Frame, area: Rect) {
    let signup = app.view.surface == Surface::Signup;

    let form_width = 50.min(area.width.saturating_sub(4));
    let form_height = 11.min(area.height);
    let form_area = Rect::new(
        area.x + (area.width.saturating_sub(form_width)) / 2,
        area.y + (area.height.saturating_sub(form_height)) / 2,
        form_width,
        form_height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(if signup { " Create Account " } else { " Log In " });
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let [user_area, pass_area, error_area, button_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let field_block = |title: &'static str, focused: bool| {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::DarkGray }))
            .title(title)
    };

    let user_focused = app.view.form_field == FormField::Username;
    let username = Paragraph::new(app.view.username_input.as_str())
        .block(field_block(" Username ", user_focused));
    frame.render_widget(username, user_area);

    // Mask the password
    let masked = "*".repeat(app.view.password_input.chars().count());
    let password = Paragraph::new(masked.as_str())
        .block(field_block(" Password ", !user_focused));
    frame.render_widget(password, pass_area);

    if let Some(error) = &app.view.form_error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, error_area);
    }

    let button_style = if app.view.submit_enabled {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
    } else {
        Style::default().fg(Color::Gray).bg(Color::DarkGray)
    };
    let dots = if app.view.submit_enabled {
        String::new()
    } else {
        ".".repeat((app.animation_frame as usize) + 1)
    };
    let button = Paragraph::new(Line::from(Span::styled(
        format!(" {}{} ", app.view.submit_label.trim_end_matches('.'), dots),
        button_style,
    )))
    .centered();
    frame.render_widget(button, button_area);

    // Show cursor in the focused field when the form accepts input
    if app.view.submit_enabled && app.view.alert.is_none() {
        let (field_area, len) = if user_focused {
            (user_area, app.view.username_input.chars().count())
        } else {
            (pass_area, app.view.password_input.chars().count())
        };
        let max_x = field_area.width.saturating_sub(2) as usize;
        let cursor_x = len.min(max_x) as u16;
        frame.set_cursor_position((field_area.x + 1 + cursor_x, field_area.y + 1));
    }
}

fn message_lines(msg: &Message, animation_frame: u8, lines: &mut Vec<Line<'static>>) {
    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
        }
        ChatRole::Assistant => {
            lines.push(Line::from(Span::styled(
                "GURU:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
        }
    }

    let style = status_style(msg.status);
    let content = sanitize(&msg.content);

    if msg.status == MessageStatus::Pending {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", content.trim_end_matches('.'), dots),
            style,
        )));
    } else if msg.status == MessageStatus::RateLimited {
        lines.push(Line::from(vec![
            Span::styled("! ", style.add_modifier(Modifier::BOLD)),
            Span::styled(content, style),
        ]));
    } else {
        for line in content.lines() {
            lines.push(styled_line(line, style));
        }
    }

    lines.push(Line::default());
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.view.chat_height = chat_area.height.saturating_sub(2);
    app.view.chat_width = chat_area.width.saturating_sub(2);

    if app.view.conversation.take_reveal() {
        app.view.scroll_chat_to_bottom();
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Chat with GURU, {} ", app.session.display_name()));

    let chat_text = if app.view.conversation.is_empty() {
        Text::from(Span::styled(
            "Ask GURU about your studies, projects, clubs or the school...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for msg in app.view.conversation.messages() {
            message_lines(msg, app.animation_frame, &mut lines);
        }
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.view.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Message ");

    // Keep the cursor visible when the input is wider than the box
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let skip = app.view.chat_cursor.saturating_sub(inner_width.saturating_sub(1));
    let visible: String = app.view.chat_input.chars().skip(skip).collect();

    let input = Paragraph::new(visible).block(input_block);
    frame.render_widget(input, input_area);

    if app.view.alert.is_none() {
        let cursor_x = (app.view.chat_cursor - skip) as u16;
        frame.set_cursor_position((input_area.x + 1 + cursor_x, input_area.y + 1));
    }
}

fn render_alert(app: &App, frame: &mut Frame, area: Rect) {
    let Some(message) = &app.view.alert else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" GURU ");

    let text = Text::from(vec![
        Line::from(sanitize(message)),
        Line::default(),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(Color::DarkGray))),
    ]);

    let popup = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .centered();
    frame.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use guru_core::{AuthMode, HttpTransport, Session};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app(session: Session) -> App {
        let transport = HttpTransport::new("http://127.0.0.1:9/api", AuthMode::Bearer).unwrap();
        App::new(session, Arc::new(transport), "http://127.0.0.1:9/api", AuthMode::Bearer)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_styled_line_bold() {
        let line = styled_line("a **b** c", Style::default());
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[1].content, "b");
    }

    #[test]
    fn test_login_form_masks_password() {
        let mut app = app(Session::ephemeral());
        app.view.username_input = "asha".to_string();
        app.view.password_input = "secret".to_string();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("asha"));
        assert!(text.contains("******"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_chat_renders_messages_and_status() {
        let mut session = Session::ephemeral();
        session.set_credential(Some("jwt"), "asha").unwrap();
        let mut app = app(session);

        let log = &mut app.view.conversation;
        log.append(ChatRole::User, "hi");
        let h = log.append_pending(ChatRole::Assistant, "GURU is thinking...");
        log.resolve(h, "GURU is resting: Daily limit reached.", MessageStatus::RateLimited);

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("You:"));
        assert!(text.contains("GURU is resting"));
        assert!(text.contains("asha"));
    }
}
