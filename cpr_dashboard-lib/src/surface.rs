use chrono::Local;
use serde::Serialize;

use crate::connection::ConnectionState;
use crate::indicators::{RoscBand, StatusClass};

/// Which of the two metric tiles an update targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Rate,
    Depth,
}

/// Value text, status label and bar for one metric tile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricView {
    pub value:         String,
    pub label:         String,
    pub class:         StatusClass,
    pub bar_width_pct: f64,
    pub bar_color:     &'static str,
}

/// Circular ROSC gauge plus the insight line under it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GaugeView {
    pub value_label: String,
    /// Filled share of the arc, in percent.
    pub fill_pct:    f64,
    pub band:        RoscBand,
    pub color:       &'static str,
    pub insight:     &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostureView {
    pub text:  String,
    pub color: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// A line in the user-facing event log (newest shown first).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub level:   LogLevel,
    pub time:    String,
    pub message: String,
}

impl LogEntry {
    /// Stamp `message` with the local wall-clock time.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            time: Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
        }
    }

    /// `[HH:MM:SS] message`, as the log panel prints it.
    pub fn line(&self) -> String {
        format!("[{}] {}", self.time, self.message)
    }
}

/// Render events a display surface paints.
///
/// Serialized adjacently tagged so subscribers can switch on `type`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum UiEvent {
    Connection { state: ConnectionState },
    Log(LogEntry),
    Chart      { samples: Vec<f64> },
    Metric     { kind: MetricKind, view: MetricView },
    Gauge(GaugeView),
    /// Append to the advisory panel and scroll it to the newest entry.
    Advisory   { message: String },
    Posture(PostureView),
    /// Body-model compression indicator on/off.
    Pulse      { active: bool },
}

impl UiEvent {
    /// Lowercase kind, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            UiEvent::Connection { .. } => "connection",
            UiEvent::Log(_)            => "log",
            UiEvent::Chart { .. }      => "chart",
            UiEvent::Metric { .. }     => "metric",
            UiEvent::Gauge(_)          => "gauge",
            UiEvent::Advisory { .. }   => "advisory",
            UiEvent::Posture(_)        => "posture",
            UiEvent::Pulse { .. }      => "pulse",
        }
    }
}

/// Sink the dashboard paints into.
pub trait DisplaySurface {
    fn render(&mut self, event: UiEvent);
}

/// Records every event; useful for headless runs and tests.
impl DisplaySurface for Vec<UiEvent> {
    fn render(&mut self, event: UiEvent) {
        self.push(event);
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for &mut S {
    fn render(&mut self, event: UiEvent) {
        (**self).render(event);
    }
}
