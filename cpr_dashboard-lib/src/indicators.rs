//! Pure mappings from telemetry values to what the dashboard shows.

use serde::Serialize;

pub const GREEN: &str = "#10b981";
pub const AMBER: &str = "#f59e0b";
pub const RED:   &str = "#ef4444";

/// Elbows straighter than this count as locked arms.
pub const LOCKED_ELBOW_DEGREES: f64 = 160.0;

/// Severity class attached to a metric's status label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Good,
    Warn,
    Bad,
}

impl StatusClass {
    pub fn from_label(label: &str) -> Self {
        if label == "Good" {
            StatusClass::Good
        } else if label.contains("Push") || label.contains("Too") {
            StatusClass::Bad
        } else {
            StatusClass::Warn
        }
    }
}

/// Bars are green only for an exact "Good"; warn and bad share red.
pub fn bar_color(label: &str) -> &'static str {
    if label == "Good" { GREEN } else { RED }
}

/// Width of a metric bar as a percentage of its reference ceiling, within 0..=100.
pub fn bar_width_pct(value: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / ceiling * 100.0).clamp(0.0, 100.0)
}

pub fn format_rate(rate_cpm: f64) -> String {
    format!("{:.0}", rate_cpm)
}

pub fn format_depth(avg_depth: f64) -> String {
    format!("{:.1}", avg_depth)
}

/// ROSC probability bracket; both thresholds are strict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoscBand {
    High,
    Moderate,
    Low,
}

impl RoscBand {
    pub fn from_prediction(pct: f64) -> Self {
        if pct > 75.0 {
            RoscBand::High
        } else if pct > 40.0 {
            RoscBand::Moderate
        } else {
            RoscBand::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RoscBand::High     => GREEN,
            RoscBand::Moderate => AMBER,
            RoscBand::Low      => RED,
        }
    }

    pub fn insight(self) -> &'static str {
        match self {
            RoscBand::High     => "High ROSC Probability. Keep going!",
            RoscBand::Moderate => "Moderate Probability. Improve consistency.",
            RoscBand::Low      => "Low Probability. Check compressions.",
        }
    }
}

pub fn posture_color(elbow_angle: f64) -> &'static str {
    if elbow_angle < LOCKED_ELBOW_DEGREES { RED } else { GREEN }
}
