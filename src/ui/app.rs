use ratatui::{
    backend::CrosstermBackend,
    widgets::{Block, Borders, Tabs},
    layout::{Layout, Constraint, Direction},
    style::{Color, Modifier, Style},
    Terminal, Frame,
};
use crossterm::{
    terminal::{enable_raw_mode, disable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    event::{self, Event, KeyCode, KeyEventKind},
    ExecutableCommand,
};
use log::debug;
use std::io;
use std::time::Duration;

use crate::analysis::statistics::TrafficSummary;
use crate::visualization::charts::{ProtocolChart, ProtocolShareChart};

const TAB_TITLES: [&str; 2] = ["1 Protocol Distribution", "2 Protocol Share Between IPs"];

/// Full-screen viewer for the two report charts. Blocks until the user quits.
pub struct ChartApp {
    pub should_quit: bool,
    pub selected_tab: usize,
    protocol_chart: ProtocolChart,
    share_chart: ProtocolShareChart,
}

impl ChartApp {
    pub fn new(summary: &TrafficSummary) -> ChartApp {
        ChartApp {
            should_quit: false,
            selected_tab: 0,
            protocol_chart: ProtocolChart::from_summary(summary),
            share_chart: ProtocolShareChart::from_summary(summary),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let result = match Terminal::new(backend) {
            Ok(mut terminal) => self.event_loop(&mut terminal),
            Err(e) => Err(e.into()),
        };

        // restore the terminal even when drawing failed
        disable_raw_mode()?;
        io::stdout().execute(LeaveAlternateScreen)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> anyhow::Result<()> {
        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        debug!("Chart view closed");
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => {
                self.selected_tab = (self.selected_tab + 1) % TAB_TITLES.len();
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.selected_tab = (self.selected_tab + TAB_TITLES.len() - 1) % TAB_TITLES.len();
            }
            KeyCode::Char('1') => self.selected_tab = 0,
            KeyCode::Char('2') => self.selected_tab = 1,
            _ => {}
        }
    }

    fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
            .split(f.size());

        let tabs = Tabs::new(TAB_TITLES.to_vec())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Traffic Report (q to quit)"),
            )
            .select(self.selected_tab)
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_widget(tabs, chunks[0]);

        match self.selected_tab {
            0 => self.protocol_chart.render(chunks[1], f),
            _ => self.share_chart.render(chunks[1], f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_navigation() {
        let mut app = ChartApp::new(&TrafficSummary::default());
        assert_eq!(app.selected_tab, 0);

        app.handle_key(KeyCode::Tab);
        assert_eq!(app.selected_tab, 1);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.selected_tab, 0);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.selected_tab, 1);
        app.handle_key(KeyCode::Char('1'));
        assert_eq!(app.selected_tab, 0);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = ChartApp::new(&TrafficSummary::default());
        app.handle_key(KeyCode::Char('x'));
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);
    }
}
