//! Syslog-style severity table
//!
//! Ranks ascend as severity decreases: `emerg` is 0, `http` is 8.
//! A record passes a threshold when its rank is less than or equal to the
//! threshold's rank, so "error and above" covers `emerg` through `error`.
//! Comparison operators follow the rank, which means `Emerg < Http`.

use super::error::LoggerError;
use colored::{Color, ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
    Http = 8,
}

/// Display color for a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelColor {
    pub fg: Color,
    pub bg: Option<Color>,
    pub bold: bool,
}

impl Severity {
    /// Every level, in rank order
    pub const ALL: [Severity; 9] = [
        Severity::Emerg,
        Severity::Alert,
        Severity::Crit,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Info,
        Severity::Debug,
        Severity::Http,
    ];

    #[inline]
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(rank as usize).copied()
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Severity::Emerg => "emerg",
            Severity::Alert => "alert",
            Severity::Crit => "crit",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Info => "info",
            Severity::Debug => "debug",
            Severity::Http => "http",
        }
    }

    /// True when a record at `self` passes a sink configured at `threshold`
    #[inline]
    pub fn passes(&self, threshold: Severity) -> bool {
        self.rank() <= threshold.rank()
    }

    /// Wire severity for syslog headers; `http` has no syslog slot and folds into debug
    pub fn syslog_code(&self) -> u8 {
        match self {
            Severity::Http => 7,
            other => other.rank(),
        }
    }

    pub fn color(&self) -> LevelColor {
        let (fg, bg, bold) = match self {
            Severity::Emerg => (Color::Red, Some(Color::Black), true),
            Severity::Alert => (Color::White, Some(Color::Red), false),
            Severity::Crit => (Color::Yellow, None, true),
            Severity::Error => (Color::Red, None, false),
            Severity::Warning => (Color::Yellow, None, true),
            Severity::Notice => (Color::Blue, None, true),
            Severity::Info => (Color::Green, None, false),
            Severity::Debug => (Color::BrightBlack, None, false),
            Severity::Http => (Color::Magenta, None, false),
        };
        LevelColor { fg, bg, bold }
    }

    /// Apply this level's color to `text`
    pub fn paint(&self, text: &str) -> ColoredString {
        let color = self.color();
        let mut painted = text.color(color.fg);
        if let Some(bg) = color.bg {
            painted = painted.on_color(bg);
        }
        if color.bold {
            painted = painted.bold();
        }
        painted
    }
}

/// Look up the rank of a level name
pub fn rank_of(name: &str) -> Result<u8, LoggerError> {
    name.parse::<Severity>().map(|level| level.rank())
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for Severity {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "emerg" | "emergency" => Ok(Severity::Emerg),
            "alert" => Ok(Severity::Alert),
            "crit" | "critical" => Ok(Severity::Crit),
            "error" | "err" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "notice" => Ok(Severity::Notice),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            "http" => Ok(Severity::Http),
            _ => Err(LoggerError::UnknownSeverity(s.to_string())),
        }
    }
}
