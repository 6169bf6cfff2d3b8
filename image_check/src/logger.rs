// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Log to stderr.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;

struct StderrLog;

static LOGGER: StderrLog = StderrLog;

impl Log for StderrLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color = match record.level() {
            Level::Trace => "0",
            Level::Debug => "37",
            Level::Info => "32",
            Level::Warn => "33",
            Level::Error => "31",
        };
        let _ = writeln!(
            std::io::stderr().lock(),
            "\x1b[0m[\x1b[{};1m{:<5}\x1b[0m] {} - {}",
            color,
            record.level(),
            record.module_path().unwrap_or(""),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Level for `verbosity` repetitions of `-v`.
pub fn filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the logger.
pub fn init(verbosity: u8) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(filter(verbosity)))
}
