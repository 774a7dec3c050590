// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

static MAX_LOG_LEVEL: AtomicUsize = AtomicUsize::new(LogLevel::Error as usize);

/// Verbosity of the library's own diagnostics. `Off` is only meaningful as a
/// filter; messages are never emitted at it.
#[repr(usize)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
}

/// Sets the maximum level at which the library logs.
pub fn set_max_level(level: LogLevel) {
    MAX_LOG_LEVEL.store(level as usize, Ordering::Relaxed);
}

/// Whether a message at `level` passes the current filter.
pub fn enabled(level: LogLevel) -> bool {
    level as usize <= MAX_LOG_LEVEL.load(Ordering::Relaxed)
}

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("debug") {
            Ok(LogLevel::Debug)
        } else if s.eq_ignore_ascii_case("info") {
            Ok(LogLevel::Info)
        } else if s.eq_ignore_ascii_case("warn") {
            Ok(LogLevel::Warn)
        } else if s.eq_ignore_ascii_case("error") {
            Ok(LogLevel::Error)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(LogLevel::Off)
        } else {
            Err("log level should be one of DEBUG, INFO, WARN, ERROR, OFF")
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Off => "OFF",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        };

        write!(f, "{level}")
    }
}

#[macro_export]
macro_rules! sampling_log {
    ($lvl:expr, $($arg:tt)+) => {
      let lvl = $lvl;
      if $crate::log::enabled(lvl) {
        if lvl == $crate::log::LogLevel::Error {
          eprintln!("\x1b[91m{}\x1b[0m {}:{} - {}", lvl, file!(), line!(), format!($($arg)*));
        } else {
          println!("\x1b[93m{}\x1b[0m {}:{} - {}", lvl, file!(), line!(), format!($($arg)*));
        }
      }
    };
}

#[macro_export]
macro_rules! sampling_debug {
    ($($arg:tt)+) => {
      $crate::sampling_log!($crate::log::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! sampling_info {
    ($($arg:tt)+) => {
      $crate::sampling_log!($crate::log::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! sampling_warn {
    ($($arg:tt)+) => {
      $crate::sampling_log!($crate::log::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! sampling_error {
    ($($arg:tt)+) => {
      $crate::sampling_log!($crate::log::LogLevel::Error, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::{enabled, set_max_level, LogLevel};

    #[test]
    fn test_default_level() {
        assert!(enabled(LogLevel::Error));
        assert!(!enabled(LogLevel::Debug));
    }

    #[test]
    fn test_set_max_level() {
        set_max_level(LogLevel::Info);
        assert!(enabled(LogLevel::Error));
        assert!(enabled(LogLevel::Info));
        assert!(!enabled(LogLevel::Debug));
        set_max_level(LogLevel::Error);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("Off".parse::<LogLevel>(), Ok(LogLevel::Off));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }
}
