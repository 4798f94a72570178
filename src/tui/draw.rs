use crate::analysis::levels::{StockLevel, StockTrend, summarize};
use crate::tui::app::App;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::Color::White;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, Padding, Paragraph, Row, Table};
use std::time::Duration;

pub fn draw_app(frame: &mut Frame, app: &App) {
    let node_rows = app.engine.chain().len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(node_rows + 3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(build_header(app), chunks[0]);
    frame.render_widget(build_node_table(app), chunks[2]);
    frame.render_widget(build_activity(app), chunks[3]);
    frame.render_widget(build_footer(app), chunks[4]);
}

fn clock(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn level_style(level: StockLevel) -> Style {
    match level {
        StockLevel::Empty => Style::default().red().bold(),
        StockLevel::BelowMinimum => Style::default().yellow(),
        StockLevel::Normal => Style::default().fg(Color::Green),
        StockLevel::Full => Style::default().cyan(),
    }
}

fn build_header(app: &'_ App) -> Block<'_> {
    let link = if app.broker.is_offline() {
        Span::raw(" link down ").style(Style::default().red().bold())
    } else {
        Span::raw(" link up ").style(Style::default().add_modifier(Modifier::DIM))
    };
    let state = if app.paused { " paused " } else { " running " };

    Block::new()
        .title(Line::from(vec![
            Span::raw(" Feedchain ").style(Style::default().bold().cyan()),
            Span::raw("|").style(Style::default().add_modifier(Modifier::DIM)),
            Span::raw(" Time: ").style(Style::default().add_modifier(Modifier::DIM)),
            Span::raw(clock(app.engine.now())).style(Style::default().bold()),
            Span::raw(format!(" x{} ", app.speed())),
            Span::raw(state).style(Style::default().add_modifier(Modifier::DIM)),
            link,
        ]))
        .title_alignment(Alignment::Center)
}

fn build_node_table(app: &'_ App) -> Table<'_> {
    let engine = &app.engine;
    let summaries = summarize(
        engine.chain(),
        &engine.current_snapshot(),
        &engine.previous_snapshot(),
    );
    let terminal = engine.chain().terminal();

    let rows: Vec<Row> = summaries
        .iter()
        .map(|summary| {
            let trend = match summary.trend() {
                StockTrend::Up => "  ↗",
                StockTrend::Down => "  ↘",
                StockTrend::Flat => "  →",
            };
            let marker = if summary.id() == terminal { "*" } else { " " };
            let pending = if summary.pending() > 0 {
                summary.pending().to_string()
            } else {
                String::new()
            };

            Row::new(vec![
                Cell::from(format!("{}{}", marker, summary.id().index())),
                Cell::from(summary.name().to_owned()),
                Cell::from(format!("{:>8}", summary.stock())).style(level_style(summary.level())),
                Cell::from(format!("{:>8}", summary.min_capacity())),
                Cell::from(format!("{:>8}", summary.max_capacity())),
                Cell::from(format!("{:>6.2}", summary.fill())),
                Cell::from(trend.to_string()).style(Style::default().bold()),
                Cell::from(format!("{:?}", summary.level())).style(level_style(summary.level())),
                Cell::from(format!("{:>7}", pending)),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(24),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Length(13),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new([
            Cell::from("ID"),
            Cell::from("Name"),
            Cell::from("   Stock"),
            Cell::from("     Min"),
            Cell::from("     Max"),
            Cell::from("  Fill"),
            Cell::from("Trend"),
            Cell::from("Level"),
            Cell::from("  Order"),
        ])
        .style(Style::default().bg(Color::DarkGray).fg(White)),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![
                Span::from(" Feeders ").style(Style::default().bold()),
            ]))
            .padding(Padding::horizontal(1)),
    )
}

fn build_activity(app: &'_ App) -> List<'_> {
    let items: Vec<ListItem> = app
        .engine
        .activity()
        .rev()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::raw(clock(entry.at)).style(Style::default().add_modifier(Modifier::DIM)),
                Span::raw("  "),
                Span::raw(entry.activity.to_string()),
            ]))
        })
        .collect();

    List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![
                Span::from(" Activity ").style(Style::default().bold()),
            ]))
            .padding(Padding::horizontal(1)),
    )
}

fn build_footer(app: &'_ App) -> Paragraph<'_> {
    let mut spans = vec![
        Span::raw(" order: ").style(Style::default().add_modifier(Modifier::DIM)),
        Span::raw(format!("{:<10}", app.input())).style(Style::default().bold()),
    ];
    if let Some(status) = app.status() {
        spans.push(Span::raw(format!(" {status} ")).style(Style::default().yellow()));
    }
    spans.push(
        Span::raw(" [0-9 ⏎] order  [space] step  [p] pause  [+/-] speed  [o] link  [q] quit")
            .style(Style::default().add_modifier(Modifier::DIM)),
    );
    Paragraph::new(Line::from(spans))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_format() {
        assert_eq!("00:00:00", clock(Duration::ZERO));
        assert_eq!("00:01:05", clock(Duration::from_secs(65)));
        assert_eq!("02:00:01", clock(Duration::from_millis(7_201_900)));
    }
}
