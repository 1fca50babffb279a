use std::collections::VecDeque;

use tracing::{debug, error, warn};

use crate::error::DriverError;
use crate::sample::Sample;
use crate::serial::{SerialLink, SerialReader};
use crate::window::RollingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Initializing,
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Lines were read and queued for `advance`.
    Received(usize),
    /// Lines from an earlier tick are still being processed; nothing was read.
    Busy,
    /// Empty read, still within the idle allowance. Carries the idle count.
    Idle(u32),
    /// Empty read exhausted the allowance; the connection is closed.
    Starved,
}

/// Pulls lines from the serial reader and feeds decoded samples into the
/// rolling window. A tick only reads; `advance` decodes one queued line at a
/// time so the GUI can redraw between samples.
pub struct PlotDriver<L: SerialLink> {
    reader: SerialReader<L>,
    window: RollingWindow,
    queue: VecDeque<String>,
    state: DriverState,
    idle_ticks: u32,
    idle_limit: u32,
    received: u64,
}

impl<L: SerialLink> PlotDriver<L> {
    pub fn new(reader: SerialReader<L>, window_len: usize, idle_limit: u32) -> Self {
        Self {
            reader,
            window: RollingWindow::new(window_len),
            queue: VecDeque::new(),
            state: DriverState::Initializing,
            idle_ticks: 0,
            idle_limit: idle_limit.max(1),
            received: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Samples decoded since start.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    /// The first tick marks the display as up and moves the driver to running.
    pub fn tick(&mut self) -> Result<TickOutcome, DriverError> {
        match self.state {
            DriverState::Terminated => return Ok(TickOutcome::Starved),
            DriverState::Initializing => {
                debug!("First tick, display running");
                self.state = DriverState::Running;
            }
            DriverState::Running => {}
        }

        if self.has_queued() {
            return Ok(TickOutcome::Busy);
        }

        let lines = match self.reader.read() {
            Ok(lines) => lines,
            Err(e) => {
                error!(error = %e, "Serial read failed");
                self.terminate();
                return Err(e.into());
            }
        };

        if lines.is_empty() {
            self.idle_ticks += 1;
            if self.idle_ticks >= self.idle_limit {
                warn!(idle_ticks = self.idle_ticks, "No data received, disconnecting");
                self.terminate();
                return Ok(TickOutcome::Starved);
            }
            return Ok(TickOutcome::Idle(self.idle_ticks));
        }

        self.idle_ticks = 0;
        let n = lines.len();
        self.queue.extend(lines);
        Ok(TickOutcome::Received(n))
    }

    /// Decode the next queued line into the window. `Ok(None)` once the
    /// queue is empty. A malformed line is fatal: the connection is closed
    /// and the driver stops.
    pub fn advance(&mut self) -> Result<Option<Sample>, DriverError> {
        if self.state == DriverState::Terminated {
            return Ok(None);
        }
        let Some(line) = self.queue.pop_front() else {
            return Ok(None);
        };

        match Sample::parse(&line) {
            Ok(sample) => {
                self.window.push(sample);
                self.received += 1;
                Ok(Some(sample))
            }
            Err(e) => {
                error!(error = %e, "Malformed data line");
                self.terminate();
                Err(e.into())
            }
        }
    }

    pub fn terminate(&mut self) {
        if !self.reader.pending().is_empty() {
            debug!(partial = self.reader.pending(), "Dropping unterminated line");
        }
        self.queue.clear();
        self.reader.close();
        self.state = DriverState::Terminated;
        debug!(connection = ?self.reader.state(), "Driver stopped");
    }
}
