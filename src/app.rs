use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use iced::time;
use iced::widget::{column, row, text};
use iced::{Alignment, Color, Element, Length, Subscription, Task, Theme};

use plotters::prelude::*;
use plotters::style::ShapeStyle;
use plotters_iced::{Chart, ChartWidget, DrawingBackend};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::driver::{DriverState, PlotDriver, TickOutcome};
use crate::error::DriverError;
use crate::serial::{SerialLink, SerialReader};
use crate::window::RollingWindow;

// ---------------- UI Messages ----------------

#[derive(Debug, Clone)]
pub enum Message {
    /// Periodic poll of the serial reader.
    Tick,
    /// Decode one queued line; re-sent while lines remain so the plot
    /// redraws between samples.
    Advance,
}

// ---------------- App ----------------

pub struct PendulumApp<L: SerialLink> {
    driver: PlotDriver<L>,
    settings: Settings,
    // set when the session ended on a fault rather than on starvation
    faulted: Arc<AtomicBool>,
    error: Option<String>,
}

impl<L: SerialLink> PendulumApp<L> {
    pub fn new(reader: SerialReader<L>, settings: Settings, faulted: Arc<AtomicBool>) -> Self {
        let driver = PlotDriver::new(
            reader,
            settings.window_len,
            settings.idle_ticks_before_exit,
        );
        Self {
            driver,
            settings,
            faulted,
            error: None,
        }
    }

    pub fn title(&self) -> String {
        "Pendulum Angle".to_string()
    }

    pub fn theme(&self) -> Theme {
        Theme::Light
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => match self.driver.tick() {
                Ok(TickOutcome::Received(_)) => Task::done(Message::Advance),
                Ok(TickOutcome::Idle(idle)) => {
                    debug!(idle, "No complete line this tick");
                    Task::none()
                }
                Ok(TickOutcome::Busy) => Task::none(),
                Ok(TickOutcome::Starved) => {
                    info!(samples = self.driver.received(), "Session ended");
                    iced::exit()
                }
                Err(e) => self.fail(e),
            },

            Message::Advance => match self.driver.advance() {
                Ok(Some(_)) if self.driver.has_queued() => Task::done(Message::Advance),
                Ok(_) => Task::none(),
                Err(e) => self.fail(e),
            },
        }
    }

    fn fail(&mut self, e: DriverError) -> Task<Message> {
        self.faulted.store(true, Ordering::SeqCst);
        self.error = Some(e.to_string());
        iced::exit()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let latest_text = match (self.driver.received(), self.driver.window().latest()) {
            (0, _) | (_, None) => "Waiting for data".to_string(),
            (_, Some(s)) => format!("t = {:.3} s   angle = {:.1}°", s.time_s, s.angle),
        };

        let header = row![
            text(latest_text).size(18.0),
            text(format!("Samples: {}", self.driver.received()))
                .size(14.0)
                .color(Color::from_rgb8(120, 120, 120)),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let chart = AngleChart {
            window: self.driver.window(),
            y_range: (self.settings.y_min, self.settings.y_max),
        };

        let plot: Element<Message> = ChartWidget::new(chart)
            .width(Length::Fill)
            .height(Length::Fill)
            .into();

        let mut content = column![header, plot].spacing(10).padding(10);

        if let Some(err) = &self.error {
            content = content.push(text(err).color(Color::from_rgb8(255, 0, 0)));
        }

        content.into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.driver.state() == DriverState::Terminated {
            return Subscription::none();
        }
        time::every(self.settings.tick_interval()).map(|_| Message::Tick)
    }
}

// ---------------- Chart ----------------

struct AngleChart<'a> {
    window: &'a RollingWindow,
    y_range: (f64, f64),
}

impl Chart<Message> for AngleChart<'_> {
    type State = ();

    fn build_chart<DB: DrawingBackend>(
        &self,
        _state: &Self::State,
        mut builder: plotters_iced::ChartBuilder<DB>,
    ) {
        let (t0, t1) = self.window.time_bounds();

        let mut chart = match builder
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(t0..t1, self.y_range.0..self.y_range.1)
        {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to build chart");
                return;
            }
        };

        if let Err(e) = chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc("Angle (°)")
            .axis_desc_style(("sans-serif", 15))
            .draw()
        {
            warn!(error = %e, "Failed to draw mesh");
        }

        let pen = ShapeStyle::from(&RED).stroke_width(2);
        if let Err(e) = chart.draw_series(LineSeries::new(self.window.points(), pen)) {
            warn!(error = %e, "Failed to draw angle curve");
        }
    }
}
