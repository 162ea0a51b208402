use crate::application::{App, AppMode, UploadLimits, UploadProgress};
use crate::domain::{
    format_file_size, option_label, progress_ratio, Field, FieldKind, FileKind, LifecycleStatus,
    STEPS,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_steps(f, app, chunks[1]);
    render_progress(f, app, chunks[2]);
    if app.mode == AppMode::Complete
        || (app.mode == AppMode::Help && app.session.status() == LifecycleStatus::Completed)
    {
        render_success(f, app, chunks[3]);
    } else {
        render_form(f, app, chunks[3]);
    }
    render_status_bar(f, app, chunks[4]);

    if app.mode == AppMode::Help {
        render_help_popup(f, app.help_scroll, app.uploads.limits());
    }
}

fn save_indicator(app: &App) -> String {
    match (app.session.status(), app.session.last_saved()) {
        (LifecycleStatus::Submitting, _) => "Submitting...".to_string(),
        (_, Some(saved)) => format!("Draft saved {}", saved.format("%H:%M:%S")),
        (_, None) => "Not saved yet".to_string(),
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let step = app.session.step_info();
    let header = Paragraph::new(format!(
        "stepform - Submission | Step {}/{}: {} | {}",
        app.session.current_step() + 1,
        STEPS.len(),
        step.title,
        save_indicator(app)
    ))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn render_steps(f: &mut Frame, app: &App, area: Rect) {
    let current = app.session.current_step();
    let completed = app.session.status() == LifecycleStatus::Completed;
    let mut spans = Vec::new();
    for (index, step) in STEPS.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        let (marker, style) = if completed || index < current {
            ("✓", Style::default().fg(Color::Green))
        } else if index == current {
            (
                "●",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("○", Style::default().fg(Color::DarkGray))
        };
        spans.push(Span::styled(
            format!("{marker} {} {}", index + 1, step.title),
            style,
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_progress(f: &mut Frame, app: &App, area: Rect) {
    let ratio = if app.session.status() == LifecycleStatus::Completed {
        1.0
    } else {
        progress_ratio(app.session.current_step())
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{:.0}%", ratio * 100.0));
    f.render_widget(gauge, area);
}

fn field_value_spans(app: &App, field: Field, focused: bool) -> Vec<Span<'static>> {
    let data = app.session.fields();
    match field.kind() {
        FieldKind::Text | FieldKind::LongText | FieldKind::Date
            if focused && app.mode == AppMode::Editing =>
        {
            let (before, after) = split_at_char(&app.input, app.cursor_position);
            vec![
                Span::styled(before, Style::default().fg(Color::Green)),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                Span::styled(after, Style::default().fg(Color::Green)),
            ]
        }
        FieldKind::Text | FieldKind::LongText => placeholder_or(data.text(field), "(empty)"),
        FieldKind::Date => placeholder_or(data.text(field), "YYYY-MM-DD"),
        FieldKind::Choice(options) => {
            let value = data.text(field);
            let label = option_label(options, value).unwrap_or("Select...");
            vec![Span::raw(format!("◀ {label} ▶"))]
        }
        FieldKind::Flag => {
            let mark = if data.flag(field) { "[x]" } else { "[ ]" };
            vec![Span::raw(mark.to_string())]
        }
        FieldKind::Attachments => {
            let count = data.attachments().len();
            vec![Span::raw(format!(
                "{count}/{} file(s), Enter to attach (images, PDF, DOC, DOCX; max {} each)",
                app.uploads.limits().max_files,
                format_file_size(app.uploads.limits().max_file_bytes)
            ))]
        }
    }
}

fn placeholder_or(value: &str, placeholder: &str) -> Vec<Span<'static>> {
    if value.is_empty() {
        vec![Span::styled(
            placeholder.to_string(),
            Style::default().fg(Color::DarkGray),
        )]
    } else {
        vec![Span::raw(value.to_string())]
    }
}

fn split_at_char(text: &str, chars: usize) -> (String, String) {
    let offset = text
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| offset);
    (text[..offset].to_string(), text[offset..].to_string())
}

fn attachment_lines(app: &App, focused: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, attachment) in app.session.fields().attachments().iter().enumerate() {
        let icon = match attachment.kind() {
            FileKind::Image => "[img]",
            FileKind::Pdf => "[pdf]",
            FileKind::Other => "[doc]",
        };
        let selected = focused && index == app.selected_attachment;
        let style = if selected {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(
                "    {icon} {} ({})",
                attachment.name,
                format_file_size(attachment.size)
            ),
            style,
        )));
    }
    for (name, progress) in app.uploads.progress() {
        let (text, color) = match progress {
            UploadProgress::InFlight => (format!("    ... {name} uploading"), Color::Yellow),
            UploadProgress::Done => continue,
            UploadProgress::Failed(err) => (format!("    ! {name}: {err}"), Color::Red),
        };
        lines.push(Line::from(Span::styled(text, Style::default().fg(color))));
    }
    lines
}

fn render_form(f: &mut Frame, app: &App, area: Rect) {
    let step = app.session.step_info();
    let mut lines: Vec<Line> = Vec::new();

    if app.session.is_review_step() {
        lines.push(Line::from(Span::styled(
            "Summary",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (label, value) in app.review_summary() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {label:<12}"), Style::default().fg(Color::Yellow)),
                Span::raw(value),
            ]));
        }
        lines.push(Line::from(""));
    }

    for (index, field) in app.visible_fields().into_iter().enumerate() {
        let focused = index == app.focused && app.mode != AppMode::Complete;
        let label_style = if focused {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let marker = if focused { "> " } else { "  " };
        let mut spans = vec![Span::styled(format!("{marker}{}", field.label()), label_style)];
        spans.push(Span::raw(": "));
        spans.extend(field_value_spans(app, field, focused));
        lines.push(Line::from(spans));

        if field == Field::Attachments {
            lines.extend(attachment_lines(app, focused));
        }
        if let Some(error) = app.session.error(field) {
            lines.push(Line::from(Span::styled(
                format!("    {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let form = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} - {}", step.title, step.subtitle)),
        );
    f.render_widget(form, area);
}

fn render_success(f: &mut Frame, app: &App, area: Rect) {
    let reference = app.reference_number().unwrap_or_default();
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "✓ Submission received!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Thank you. We will review your submission and get back to you soon."),
        Line::from(""),
        Line::from(vec![
            Span::raw("Reference number: "),
            Span::styled(reference, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from("n: new submission | c: copy reference | q: quit"),
    ];
    let success = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Complete"));
    f.render_widget(success, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let input_text = match app.mode {
        AppMode::Normal => {
            if let Some(ref status) = app.status_message {
                status.clone()
            } else if app.session.is_review_step() {
                "Enter: toggle | Ctrl+S: submit | Ctrl+P: back | F1/?: help | q: quit".to_string()
            } else {
                "↑↓: move | Enter: edit | Ctrl+N: next | Ctrl+P: back | F1/?: help | q: quit"
                    .to_string()
            }
        }
        AppMode::Editing => "Enter to save, Esc to cancel".to_string(),
        AppMode::AttachFile => format!(
            "Attach: {} (comma separated paths, Enter to upload, Esc to cancel)",
            app.path_input
        ),
        AppMode::Help => {
            "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string()
        }
        AppMode::Complete => app
            .status_message
            .clone()
            .unwrap_or_else(|| "n: new submission | c: copy reference | q: quit".to_string()),
    };

    let input = Paragraph::new(input_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Normal => Style::default(),
            AppMode::Editing => Style::default().fg(Color::Green),
            AppMode::AttachFile => Style::default().fg(Color::Yellow),
            AppMode::Help => Style::default().fg(Color::Cyan),
            AppMode::Complete => Style::default().fg(Color::Green),
        });
    f.render_widget(input, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize, limits: UploadLimits) {
    let area = f.area();
    let popup_area = Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    };

    f.render_widget(Clear, popup_area);

    let text = help_text(limits);
    let help_lines: Vec<&str> = text.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let help_widget = Paragraph::new(help_lines[start_line..end_line].join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    "Help (Line {}/{})",
                    start_line + 1,
                    help_lines.len()
                ))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

fn help_text(limits: UploadLimits) -> String {
    format!(
        r#"SUBMISSION FORM

=== STEPS ===
1 Personal Info     Name, email, phone, date of birth
2 Submission Type   Personal, business or partnership
3 Details           Message, priority and attachments
4 Review            Check everything, accept the terms, submit

Moving forward checks the current step. Going back never does.
Your progress is saved as a draft a couple of seconds after each change,
once a first name or email is filled in.

=== FIELDS ===
↑↓, Tab/Shift+Tab  Move between fields
Enter              Edit text, toggle a checkbox, cycle a choice,
                   or open the attach prompt
←→                 Cycle a choice, or select an attachment
Delete             Remove the selected attachment

=== EDITING ===
Enter              Keep the new value
Esc                Discard the change
←→ Home End        Move the cursor

=== NAVIGATION ===
Ctrl+N, PgDn       Next step
Ctrl+P, PgUp       Previous step
1-4                Jump back to an earlier step
Ctrl+S             Submit (review step)
Ctrl+R             Clear the form and the saved draft

=== ATTACHMENTS ===
Up to {max_files} files, {max_size} each. Images, PDF, DOC and DOCX are accepted.
Separate several paths with commas.

=== AFTER SUBMITTING ===
n                  Start a new submission
c                  Copy the reference number
q                  Quit

=== HELP NAVIGATION ===
↑↓ or j/k          Scroll one line
Page Up/Down       Scroll five lines
Home               Jump to the top
Esc/F1/?/q         Close this help"#,
        max_files = limits.max_files,
        max_size = format_file_size(limits.max_file_bytes),
    )
}
