// src/ui/mod.rs
//
// Terminal dashboard: five stacked live charts over the shared telemetry
// store, redrawn on a fixed cadence. Sampling is time-driven and decoupled
// from serial arrival - every tick reads whatever the store currently holds,
// so a silent source simply draws flat lines.

pub mod series;

use std::collections::HashMap;
use std::io::Stdout;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

use crate::io::{LinkStatus, SourceId, SourceMessage};
use crate::link::LinkManager;
use crate::logging::set_stderr_logging;
use crate::telemetry::{Channel, TelemetryStore};
use crate::ui::series::ChartSeries;

fn channel_color(channel: Channel) -> Color {
    match channel {
        Channel::Temperature => Color::Red,
        Channel::Humidity => Color::Cyan,
        Channel::SoilMoisture => Color::Yellow,
        Channel::ServoAngle => Color::Magenta,
        Channel::MotorPwm => Color::Green,
    }
}

fn status_color(status: LinkStatus) -> Color {
    match status {
        LinkStatus::Connected => Color::Green,
        LinkStatus::Disconnected => Color::DarkGray,
        LinkStatus::Error => Color::Red,
    }
}

struct Dashboard {
    store: TelemetryStore,
    manager: LinkManager,
    rx: mpsc::Receiver<SourceMessage>,
    series: HashMap<Channel, ChartSeries>,
    started: Instant,
    window_secs: f64,
    /// Last connect/disconnect outcome, shown in the footer
    notice: Option<String>,
}

impl Dashboard {
    fn new(
        store: TelemetryStore,
        manager: LinkManager,
        rx: mpsc::Receiver<SourceMessage>,
        sample_interval: Duration,
        series_window: usize,
    ) -> Self {
        let series = Channel::ALL
            .into_iter()
            .map(|c| (c, ChartSeries::new(series_window)))
            .collect();
        Dashboard {
            store,
            manager,
            rx,
            series,
            started: Instant::now(),
            window_secs: sample_interval.as_secs_f64() * series_window as f64,
            notice: None,
        }
    }

    /// Take one sample of every channel from the current snapshot.
    fn sample(&mut self) {
        let snap = self.store.snapshot();
        let t = self.started.elapsed().as_secs_f64();
        for channel in Channel::ALL {
            if let Some(series) = self.series.get_mut(&channel) {
                series.append(t, channel.sample(&snap));
            }
        }
    }

    fn connect(&mut self, source: SourceId) {
        self.notice = match self.manager.connect(source) {
            Ok(()) => Some(format!("Connecting {}...", source)),
            Err(e) => Some(e),
        };
    }

    fn draw(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.draw_header(frame, rows[0]);
        self.draw_charts(frame, rows[1]);
        self.draw_footer(frame, rows[2]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " greendeck ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for source in SourceId::ALL {
            let status = self.manager.status(source);
            spans.push(Span::raw("  "));
            spans.push(Span::raw(format!("{}: ", source)));
            spans.push(Span::styled(
                status.as_str(),
                Style::default().fg(status_color(status)),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_charts(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, 5); 5])
            .split(area);

        let snap = self.store.snapshot();
        let now = self.started.elapsed().as_secs_f64();
        let x_min = (now - self.window_secs).max(0.0);

        for (channel, chunk) in Channel::ALL.into_iter().zip(chunks.iter()) {
            let points = self
                .series
                .get(&channel)
                .map(|s| s.points())
                .unwrap_or(&[]);
            let (y_min, y_max) = channel.display_range();
            let color = channel_color(channel);

            let dataset = Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(points);

            let chart = Chart::new(vec![dataset])
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(Span::styled(
                            format!(" {} ", channel.readout(&snap)),
                            Style::default().fg(color),
                        )),
                )
                .x_axis(Axis::default().bounds([x_min, now.max(self.window_secs)]))
                .y_axis(
                    Axis::default()
                        .bounds([y_min, y_max])
                        .labels([format!("{}", y_min), format!("{}", y_max)]),
                );

            frame.render_widget(chart, *chunk);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let text = match &self.notice {
            Some(notice) => format!(" {}  |  a: arduino  p: rp2350  d: disconnect  q: quit", notice),
            None => " a: connect arduino  p: connect rp2350  d: disconnect all  q: quit".to_string(),
        };
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }
}

// ============================================================================
// Terminal lifecycle
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, String> {
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;
    Terminal::new(CrosstermBackend::new(stdout))
        .map_err(|e| format!("Failed to create terminal: {}", e))
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(std::io::stdout(), LeaveAlternateScreen);
}

/// Run the dashboard until the user quits. Owns the terminal for the
/// duration; stderr logging is suppressed so log lines cannot corrupt the
/// alternate screen (file logging is unaffected).
pub async fn run_dashboard(
    store: TelemetryStore,
    manager: LinkManager,
    rx: mpsc::Receiver<SourceMessage>,
    sample_interval: Duration,
    series_window: usize,
) -> Result<(), String> {
    let mut terminal = setup_terminal()?;
    set_stderr_logging(false);

    let mut dashboard = Dashboard::new(store, manager, rx, sample_interval, series_window);
    let result = event_loop(&mut terminal, &mut dashboard, sample_interval).await;

    dashboard.manager.disconnect_all().await;
    set_stderr_logging(true);
    restore_terminal();
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    dashboard: &mut Dashboard,
    sample_interval: Duration,
) -> Result<(), String> {
    let mut ticker = tokio::time::interval(sample_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut events = EventStream::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                dashboard.sample();
                terminal
                    .draw(|frame| dashboard.draw(frame))
                    .map_err(|e| format!("Draw failed: {}", e))?;
            }
            msg = dashboard.rx.recv() => {
                if let Some(msg) = msg {
                    dashboard.manager.handle_message(msg);
                }
            }
            event = events.next() => {
                match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                            KeyCode::Char('a') => dashboard.connect(SourceId::Arduino),
                            KeyCode::Char('p') => dashboard.connect(SourceId::Rp2350),
                            KeyCode::Char('d') => {
                                dashboard.manager.disconnect_all().await;
                                dashboard.notice = Some("Disconnected all sources".to_string());
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(format!("Input error: {}", e)),
                    None => return Ok(()),
                }
            }
        }
    }
}
