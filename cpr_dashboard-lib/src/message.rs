use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label used when the producer omits a status for a metric it did send.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Reasons a telemetry frame is rejected.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("invalid telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metrics carry `{present}` without `{missing}`")]
    IncompleteMetrics {
        present: &'static str,
        missing: &'static str,
    },

    #[error("rosc_prediction {0} is outside 0..=100")]
    RoscOutOfRange(f64),

    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
}

/// Compression quality summary computed upstream.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    pub rate_cpm:     f64,
    pub rate_status:  String,
    pub avg_depth:    f64,
    pub depth_status: String,
}

/// Pose estimate for the rescuer's arms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vision {
    pub posture_feedback: String,
    pub elbow_angle:      f64,
}

/// One validated frame of the telemetry stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TelemetryPacket {
    pub waveform: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rosc_prediction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<Vision>,
}

/// Frame shape as the producer sends it, before validation.
#[derive(Debug, Deserialize)]
struct WirePacket {
    waveform: Vec<f64>,
    #[serde(default)]
    metrics: Option<WireMetrics>,
    #[serde(default)]
    rosc_prediction: Option<f64>,
    #[serde(default)]
    ai_feedback: Option<String>,
    #[serde(default)]
    vision: Option<Vision>,
}

// The producer sends `{}` while warming up and omits the labels when it
// detects no compressions, so every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
struct WireMetrics {
    #[serde(default)]
    rate_cpm: Option<f64>,
    #[serde(default)]
    rate_status: Option<String>,
    #[serde(default)]
    avg_depth: Option<f64>,
    #[serde(default)]
    depth_status: Option<String>,
}

impl WireMetrics {
    fn validate(self) -> Result<Option<Metrics>, PacketError> {
        let (rate_cpm, avg_depth) = match (self.rate_cpm, self.avg_depth) {
            (None, None) => return Ok(None),
            (Some(rate), Some(depth)) => (rate, depth),
            (Some(_), None) => {
                return Err(PacketError::IncompleteMetrics {
                    present: "rate_cpm",
                    missing: "avg_depth",
                });
            }
            (None, Some(_)) => {
                return Err(PacketError::IncompleteMetrics {
                    present: "avg_depth",
                    missing: "rate_cpm",
                });
            }
        };
        Ok(Some(Metrics {
            rate_cpm,
            rate_status: self.rate_status.unwrap_or_else(|| UNKNOWN_STATUS.into()),
            avg_depth,
            depth_status: self.depth_status.unwrap_or_else(|| UNKNOWN_STATUS.into()),
        }))
    }
}

impl WirePacket {
    fn validate(self) -> Result<TelemetryPacket, PacketError> {
        let metrics = self.metrics.unwrap_or_default().validate()?;

        if let Some(p) = self.rosc_prediction {
            if !p.is_finite() {
                return Err(PacketError::NonFinite { field: "rosc_prediction" });
            }
            if !(0.0..=100.0).contains(&p) {
                return Err(PacketError::RoscOutOfRange(p));
            }
        }
        if let Some(v) = &self.vision {
            if !v.elbow_angle.is_finite() {
                return Err(PacketError::NonFinite { field: "vision.elbow_angle" });
            }
        }

        Ok(TelemetryPacket {
            waveform: self.waveform,
            metrics,
            rosc_prediction: self.rosc_prediction,
            ai_feedback: self.ai_feedback.filter(|s| !s.is_empty()),
            vision: self.vision,
        })
    }
}

impl TelemetryPacket {
    /// Decode and validate one text frame.
    pub fn from_json(text: &str) -> Result<Self, PacketError> {
        let wire: WirePacket = serde_json::from_str(text)?;
        wire.validate()
    }

    /// Re-encode for producers and fixtures; absent fields are omitted.
    pub fn to_json(&self) -> Result<String, PacketError> {
        Ok(serde_json::to_string(self)?)
    }
}
