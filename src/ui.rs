use std::io::{self, Stdout};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

use crate::app::{Render, TickView, WindowReading};
use crate::error::Result;
use crate::util::{center, format_delta, format_rate, window_label};

const NAME_WIDTH: u16 = 20;
const WINDOW_WIDTH: u16 = 17;

/// Raw mode plus alternate screen; both are undone on drop, on every exit path.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
        let _ = disable_raw_mode();
    }
}

pub struct TerminalUi<B: Backend> {
    terminal: Terminal<B>,
    title: String,
}

impl TerminalUi<CrosstermBackend<Stdout>> {
    pub fn stdout(title: impl Into<String>) -> io::Result<Self> {
        Self::new(CrosstermBackend::new(io::stdout()), title)
    }
}

impl<B: Backend> TerminalUi<B> {
    pub fn new(backend: B, title: impl Into<String>) -> io::Result<Self> {
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            title: title.into(),
        })
    }

    #[cfg(test)]
    fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend> Render for TerminalUi<B> {
    fn render(&mut self, view: &TickView) -> Result<()> {
        let title = &self.title;
        self.terminal.draw(|f| draw(f, title, view))?;
        Ok(())
    }
}

fn draw(f: &mut Frame, title: &str, view: &TickView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(view.raw.len() as u16 + 2), // current values
            Constraint::Min(3),                            // windowed deltas
            Constraint::Length(1),                         // status bar
        ])
        .split(f.size());

    let raw_lines: Vec<Line> = view
        .raw
        .iter()
        .map(|reading| {
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}", reading.counter.to_string(), width = NAME_WIDTH as usize),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    reading.value.to_string(),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
            ])
        })
        .collect();
    let raw_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", title));
    f.render_widget(Paragraph::new(raw_lines).block(raw_block), chunks[0]);

    let header_cells = std::iter::once(Cell::from("")).chain(view.windows.iter().map(|w| {
        Cell::from(center(&window_label(*w), WINDOW_WIDTH as usize))
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }));
    let header = Row::new(header_cells).height(1);

    let rows = view.windowed.iter().map(|reading| {
        let cells = std::iter::once(Cell::from(reading.counter.to_string()).style(Style::default().fg(Color::White)))
            .chain(reading.windows.iter().map(window_cell));
        Row::new(cells).height(1)
    });

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(NAME_WIDTH))
        .chain(view.windows.iter().map(|_| Constraint::Length(WINDOW_WIDTH)))
        .collect();
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(" Deltas ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Blue)),
        );
    f.render_widget(table, chunks[1]);

    let status = Line::from(vec![
        Span::styled(" Updated ", Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} ", view.taken_at.format("%H:%M:%S"))),
        Span::raw("| Press q to quit"),
    ]);
    f.render_widget(Paragraph::new(status).style(Style::default().bg(Color::Rgb(20, 20, 20))), chunks[2]);
}

fn window_cell(reading: &WindowReading) -> Cell<'static> {
    let color = if reading.delta.is_some() { Color::Green } else { Color::DarkGray };
    Cell::from(format!("{}{}", format_delta(reading.delta), format_rate(reading.per_second())))
        .style(Style::default().fg(color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{RawReading, WindowedReading};
    use crate::config::TrackedCounter;
    use chrono::Local;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn screen(ui: &TerminalUi<TestBackend>) -> String {
        let buffer = ui.backend().buffer();
        let width = buffer.area.width as usize;
        let symbols: Vec<&str> = buffer.content.iter().map(|c| c.symbol()).collect();
        symbols.chunks(width).map(|row| row.concat()).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn renders_values_and_unknown_windows() {
        let view = TickView {
            taken_at: Local::now(),
            windows: vec![Duration::from_secs(2), Duration::from_secs(10)],
            raw: vec![RawReading { counter: TrackedCounter::new("Tcp", "CurrEstab"), value: 42 }],
            windowed: vec![WindowedReading {
                counter: TrackedCounter::new("Tcp", "ActiveOpens"),
                windows: vec![
                    WindowReading { window: Duration::from_secs(2), delta: Some(10) },
                    WindowReading { window: Duration::from_secs(10), delta: None },
                ],
            }],
        };

        let mut ui = TerminalUi::new(TestBackend::new(80, 10), "netrate").unwrap();
        ui.render(&view).unwrap();
        let screen = screen(&ui);

        assert!(screen.contains("netrate"));
        assert!(screen.contains("Tcp.CurrEstab"));
        assert!(screen.contains("42"));
        assert!(screen.contains("last 2s"));
        assert!(screen.contains("last 10s"));
        assert!(screen.contains("Tcp.ActiveOpens"));
        assert!(screen.contains("10    5.0/s"));
        assert!(screen.contains("?        ?"));
        assert!(screen.contains("Press q to quit"));
    }
}
