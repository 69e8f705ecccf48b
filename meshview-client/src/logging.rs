//! Global logger: timestamped lines on stderr, plus every record mirrored
//! into the log widget's buffer.

use log::LevelFilter;
use meshview_core::dialog::{LogBuffer, LogLevel};

fn format_line(time: &str, level: log::Level, target: &str, message: &std::fmt::Arguments) -> String {
    format!("[{} {:<5} {}] {}", time, level, target, message)
}

/// Installs the logger. Fails if one is already installed.
pub fn setup(level: LevelFilter, buffer: LogBuffer) -> Result<(), log::SetLoggerError> {
    let stderr = fern::Dispatch::new()
        .format(|out, message, record| {
            let time = chrono::Local::now().format("%H:%M:%S").to_string();
            out.finish(format_args!(
                "{}",
                format_line(&time, record.level(), record.target(), message)
            ))
        })
        .chain(std::io::stderr());

    let widget = fern::Dispatch::new().chain(fern::Output::call(move |record| {
        buffer.push(LogLevel::from(record.level()), record.args().to_string());
    }));

    fern::Dispatch::new()
        .level(level)
        .level_for("egui", LevelFilter::Warn)
        .level_for("egui_glow", LevelFilter::Warn)
        .chain(stderr)
        .chain(widget)
        .apply()
}
