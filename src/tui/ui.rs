use chrono::Datelike;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::calendar::{weekday_index, WEEKDAY_NAMES};
use super::app::{App, InputMode};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Calendar + templates
            Constraint::Length(3)  // Help / status
        ].as_ref())
        .split(f.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(chunks[0]);

    render_calendar(f, app, body[0]);
    render_templates(f, app, body[1]);

    let help_text = match app.input_mode {
        InputMode::Normal if !app.status.is_empty() => app.status.clone(),
        InputMode::Normal => "q: Quit | h/l: Month | t: Today | j/k: Select | Enter: Generate | o: Generate for... | Space: Pause/Resume | d: Del".to_string(),
        InputMode::Editing => "Enter: Generate | Esc: Cancel".to_string(),
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[1]);

    if app.input_mode == InputMode::Editing {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title("Assign this task to (member id)"));
        f.render_widget(input, area);
    }
}

fn render_calendar(f: &mut Frame, app: &App, area: Rect) {
    let highlighted = app.selected_dates();
    let first = app.window.first_day();
    let lead = weekday_index(first) as usize;

    let mut cells: Vec<Cell> = (0..lead).map(|_| Cell::from("")).collect();
    for date in first.iter_days().take(app.window.days() as usize) {
        let mut text = format!("{:>2}", date.day());
        if let Some(titles) = app.occurrences.get(&date) {
            for title in titles.iter().take(2) {
                text.push('\n');
                text.push_str(title);
            }
            if titles.len() > 2 {
                text.push_str(&format!(" +{}", titles.len() - 2));
            }
        }
        let mut style = Style::default();
        if highlighted.contains(&date) {
            style = style.fg(Color::Yellow);
        }
        if date == app.today {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        cells.push(Cell::from(text).style(style));
    }
    while cells.len() % 7 != 0 {
        cells.push(Cell::from(""));
    }

    let mut rows = Vec::new();
    let mut cells = cells.into_iter();
    loop {
        let week: Vec<Cell> = cells.by_ref().take(7).collect();
        if week.is_empty() {
            break;
        }
        rows.push(Row::new(week).height(3));
    }

    let widths = [Constraint::Ratio(1, 7); 7];
    let table = Table::new(rows, widths)
        .header(Row::new(WEEKDAY_NAMES.to_vec())
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(format!("Chorewheel - {} ({})", app.window, app.group_id)));

    f.render_widget(table, area);
}

fn render_templates(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .templates
        .iter()
        .map(|t| {
            let style = if t.is_active {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Row::new(vec![
                Cell::from(t.id.to_string()),
                Cell::from(t.title.clone()),
                Cell::from(t.frequency.name()),
                Cell::from(app.member_name(t.next_suggested_assignee.as_ref())),
                Cell::from(if t.is_active { "Active" } else { "Paused" }),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(12),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(7),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Title", "Freq", "Next Up", "Status"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Templates"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.template_state);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Length(r.height.saturating_sub(height) / 2),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
