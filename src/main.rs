// src/main.rs
//
// Live plot of an inverted pendulum's angle, streamed from a microcontroller
// over a serial link.
//
// Protocol: the controller sends "RDY\r\n" once, then one
// "<millis> <angle>\r\n" line per sample.

mod app;
mod config;
mod driver;
mod error;
mod logging;
mod sample;
mod serial;
mod window;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use iced::{Size, Task};
use serialport::SerialPort;
use tracing::error;

use crate::app::PendulumApp;
use crate::config::Settings;
use crate::error::AppError;

type SerialApp = PendulumApp<Box<dyn SerialPort>>;

fn run() -> Result<ExitCode, AppError> {
    let settings = Settings::load();
    logging::init_tracing(settings.as_ref().map(|s| s.json_logs).unwrap_or(false));
    let settings = settings?;

    // Blocks until the controller says RDY.
    let reader = serial::open(&settings.port_name, settings.baud_rate)?;

    let faulted = Arc::new(AtomicBool::new(false));
    let app = SerialApp::new(reader, settings, faulted.clone());

    iced::application(SerialApp::title, SerialApp::update, SerialApp::view)
        .subscription(SerialApp::subscription)
        .theme(SerialApp::theme)
        .window(iced::window::Settings {
            size: Size::new(900.0, 540.0),
            ..Default::default()
        })
        .antialiasing(true)
        .run_with(move || (app, Task::none()))?;

    Ok(if faulted.load(Ordering::SeqCst) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Quitting");
            ExitCode::FAILURE
        }
    }
}
