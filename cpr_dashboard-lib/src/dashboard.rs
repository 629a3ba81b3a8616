use std::fmt::Display;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::advisory::AdvisoryLog;
use crate::buffer::WaveformBuffer;
use crate::config::DisplaySettings;
use crate::connection::ConnectionState;
use crate::indicators::{self, RoscBand, StatusClass};
use crate::message::{Metrics, PacketError, TelemetryPacket, Vision};
use crate::surface::{
    DisplaySurface, GaugeView, LogEntry, LogLevel, MetricKind, MetricView, PostureView, UiEvent,
};

/// Minimum depth and rate for the body model to show a compression.
const PULSE_MIN_DEPTH: f64 = 10.0;
const PULSE_MIN_RATE:  f64 = 50.0;

/// What applying one packet asked of the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// A compression pulse was switched on and needs a timed clear.
    pub pulse: bool,
}

/// Owns the display surface and everything painted into it.
pub struct Dashboard<S> {
    surface:     S,
    settings:    DisplaySettings,
    waveform:    WaveformBuffer,
    advisories:  AdvisoryLog,
    state:       ConnectionState,
    packets:     u64,
    quarantined: u64,
}

impl<S: DisplaySurface> Dashboard<S> {
    pub fn new(surface: S, settings: DisplaySettings) -> Self {
        Self {
            surface,
            waveform: WaveformBuffer::new(settings.waveform_capacity),
            settings,
            advisories: AdvisoryLog::new(),
            state: ConnectionState::Disconnected,
            packets: 0,
            quarantined: 0,
        }
    }

    pub fn on_open(&mut self) {
        info!("Telemetry stream connected");
        self.set_state(ConnectionState::Connected);
        self.log(LogLevel::Info, "Connected to CPR feedback stream.");
    }

    /// `retry_in` is the reconnect already scheduled, if any.
    pub fn on_close(&mut self, retry_in: Option<Duration>) {
        self.set_state(ConnectionState::Disconnected);
        match retry_in {
            Some(delay) => {
                info!("Telemetry stream closed; reconnecting in {:?}", delay);
                self.log(
                    LogLevel::Error,
                    format!("Connection lost. Reconnecting in {}...", human_delay(delay)),
                );
            }
            None => {
                warn!("Telemetry stream closed; retry policy exhausted");
                self.log(LogLevel::Error, "Connection lost. Giving up on reconnecting.");
            }
        }
    }

    /// Diagnostics only; the close path owns state and reconnection.
    pub fn on_transport_error(&mut self, err: &dyn Display) {
        error!("Telemetry transport error: {}", err);
    }

    /// Decode one text frame and paint it. Malformed frames are counted and dropped.
    pub fn handle_frame(&mut self, text: &str) -> Result<FrameOutcome, PacketError> {
        match TelemetryPacket::from_json(text) {
            Ok(packet) => Ok(self.apply(&packet)),
            Err(e) => {
                self.quarantined += 1;
                warn!("Quarantined telemetry frame #{}: {}", self.quarantined, e);
                Err(e)
            }
        }
    }

    pub fn apply(&mut self, packet: &TelemetryPacket) -> FrameOutcome {
        self.packets += 1;

        // 1. Chart
        self.waveform.extend(&packet.waveform);
        self.surface.render(UiEvent::Chart {
            samples: self.waveform.snapshot(),
        });

        // 2. Metric tiles
        if let Some(m) = &packet.metrics {
            self.render_metrics(m);
        }

        // 3. ROSC gauge
        if let Some(p) = packet.rosc_prediction {
            self.render_gauge(p);
        }

        // 4. Advisory
        if let Some(msg) = packet.ai_feedback.as_deref() {
            if self.advisories.push(msg) {
                self.surface.render(UiEvent::Advisory {
                    message: msg.to_owned(),
                });
            }
        }

        // 5. Posture
        if let Some(v) = &packet.vision {
            self.render_posture(v);
        }

        // 6. Body-model pulse
        let pulse = packet
            .metrics
            .as_ref()
            .is_some_and(|m| m.avg_depth > PULSE_MIN_DEPTH && m.rate_cpm > PULSE_MIN_RATE);
        if pulse {
            self.surface.render(UiEvent::Pulse { active: true });
        }

        FrameOutcome { pulse }
    }

    /// Timed clear for a pulse; repeats are harmless.
    pub fn end_pulse(&mut self) {
        self.surface.render(UiEvent::Pulse { active: false });
    }

    fn render_metrics(&mut self, m: &Metrics) {
        let rate = metric_view(
            indicators::format_rate(m.rate_cpm),
            &m.rate_status,
            indicators::bar_width_pct(m.rate_cpm, self.settings.rate_ceiling),
        );
        let depth = metric_view(
            indicators::format_depth(m.avg_depth),
            &m.depth_status,
            indicators::bar_width_pct(m.avg_depth, self.settings.depth_ceiling),
        );
        self.surface.render(UiEvent::Metric { kind: MetricKind::Rate, view: rate });
        self.surface.render(UiEvent::Metric { kind: MetricKind::Depth, view: depth });
    }

    fn render_gauge(&mut self, pct: f64) {
        let band = RoscBand::from_prediction(pct);
        self.surface.render(UiEvent::Gauge(GaugeView {
            value_label: format!("{:.0}%", pct),
            fill_pct: pct,
            band,
            color: band.color(),
            insight: band.insight(),
        }));
    }

    fn render_posture(&mut self, v: &Vision) {
        self.surface.render(UiEvent::Posture(PostureView {
            text: v.posture_feedback.clone(),
            color: indicators::posture_color(v.elbow_angle),
        }));
    }

    fn set_state(&mut self, state: ConnectionState) {
        debug!("status banner: {}", state.banner());
        self.state = state;
        self.surface.render(UiEvent::Connection { state });
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.surface.render(UiEvent::Log(LogEntry::now(level, message)));
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn waveform(&self) -> &WaveformBuffer {
        &self.waveform
    }

    pub fn advisories(&self) -> &AdvisoryLog {
        &self.advisories
    }

    /// Packets applied so far.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Frames rejected by validation so far.
    pub fn quarantined(&self) -> u64 {
        self.quarantined
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

fn metric_view(value: String, label: &str, bar_width_pct: f64) -> MetricView {
    MetricView {
        value,
        label: label.to_owned(),
        class: StatusClass::from_label(label),
        bar_width_pct,
        bar_color: indicators::bar_color(label),
    }
}

fn human_delay(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{AMBER, GREEN, RED};

    fn dashboard() -> Dashboard<Vec<UiEvent>> {
        Dashboard::new(Vec::new(), DisplaySettings::default())
    }

    fn metric(events: &[UiEvent], want: MetricKind) -> MetricView {
        events
            .iter()
            .find_map(|e| match e {
                UiEvent::Metric { kind, view } if *kind == want => Some(view.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn healthy_packet_end_to_end() {
        let mut dash = dashboard();
        let outcome = dash
            .handle_frame(
                r#"{"waveform":[],"metrics":{"rate_cpm":110,"rate_status":"Good",
                    "avg_depth":52,"depth_status":"Good"},"rosc_prediction":82}"#,
            )
            .unwrap();
        let events = dash.surface();

        let rate = metric(events, MetricKind::Rate);
        assert_eq!(rate.value, "110");
        assert_eq!(rate.bar_width_pct, 55.0);
        assert_eq!(rate.bar_color, GREEN);
        assert_eq!(rate.class, StatusClass::Good);

        let depth = metric(events, MetricKind::Depth);
        assert_eq!(depth.value, "52.0");
        assert_eq!(depth.bar_width_pct, 52.0);

        let gauge = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Gauge(g) => Some(g.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(gauge.fill_pct, 82.0);
        assert_eq!(gauge.value_label, "82%");
        assert_eq!(gauge.color, GREEN);
        assert_eq!(gauge.insight, "High ROSC Probability. Keep going!");

        assert!(outcome.pulse);
        assert_eq!(events.last(), Some(&UiEvent::Pulse { active: true }));
    }

    #[test]
    fn update_order_follows_packet_fields() {
        let mut dash = dashboard();
        dash.handle_frame(
            r#"{"waveform":[1,2],"metrics":{"rate_cpm":90,"rate_status":"Too Slow",
                "avg_depth":45,"depth_status":"Push Harder"},"rosc_prediction":50,
                "ai_feedback":"Push faster","vision":{"posture_feedback":"Bend","elbow_angle":150}}"#,
        )
        .unwrap();
        let kinds: Vec<_> = dash.surface().iter().map(UiEvent::kind).collect();
        assert_eq!(
            kinds,
            ["chart", "metric", "metric", "gauge", "advisory", "posture", "pulse"]
        );

        let rate = metric(dash.surface(), MetricKind::Rate);
        assert_eq!(rate.class, StatusClass::Bad);
        assert_eq!(rate.bar_color, RED);
        assert!(dash.surface().contains(&UiEvent::Posture(PostureView {
            text: "Bend".into(),
            color: RED,
        })));
        assert!(dash.surface().iter().any(
            |e| matches!(e, UiEvent::Gauge(g) if g.color == AMBER && g.band == RoscBand::Moderate)
        ));
    }

    #[test]
    fn absent_fields_leave_displays_untouched() {
        let mut dash = dashboard();
        let outcome = dash.handle_frame(r#"{"waveform":[0.5]}"#).unwrap();
        assert_eq!(dash.surface().as_slice(), [UiEvent::Chart { samples: vec![0.5] }]);
        assert!(!outcome.pulse);
    }

    #[test]
    fn repeated_advice_is_shown_once() {
        let mut dash = dashboard();
        let frame = r#"{"waveform":[],"ai_feedback":"Compressions too shallow"}"#;
        dash.handle_frame(frame).unwrap();
        dash.handle_frame(frame).unwrap();

        assert_eq!(dash.advisories().len(), 1);
        let shown = dash
            .surface()
            .iter()
            .filter(|e| matches!(e, UiEvent::Advisory { .. }))
            .count();
        assert_eq!(shown, 1);
    }

    #[test]
    fn chart_window_is_bounded() {
        let mut dash = Dashboard::new(
            Vec::new(),
            DisplaySettings {
                waveform_capacity: 4,
                ..DisplaySettings::default()
            },
        );
        dash.apply(&TelemetryPacket {
            waveform: vec![1.0, 2.0, 3.0],
            ..Default::default()
        });
        dash.apply(&TelemetryPacket {
            waveform: vec![4.0, 5.0],
            ..Default::default()
        });
        assert_eq!(
            dash.surface().last(),
            Some(&UiEvent::Chart { samples: vec![2.0, 3.0, 4.0, 5.0] })
        );
        assert_eq!(dash.packets(), 2);
    }

    #[test]
    fn no_pulse_for_weak_compressions() {
        let mut dash = dashboard();
        let outcome = dash.apply(&TelemetryPacket {
            metrics: Some(Metrics {
                rate_cpm: 0.0,
                rate_status: "Unknown".into(),
                avg_depth: 0.0,
                depth_status: "Unknown".into(),
            }),
            ..Default::default()
        });
        assert!(!outcome.pulse);
        let rate = metric(dash.surface(), MetricKind::Rate);
        assert_eq!(rate.class, StatusClass::Warn);
        assert_eq!(rate.bar_color, RED);
    }

    #[test]
    fn pulse_thresholds_are_strict() {
        let metrics = |rate_cpm, avg_depth| TelemetryPacket {
            metrics: Some(Metrics {
                rate_cpm,
                rate_status: "Good".into(),
                avg_depth,
                depth_status: "Good".into(),
            }),
            ..Default::default()
        };
        let mut dash = dashboard();

        assert!(!dash.apply(&metrics(110.0, 10.0)).pulse);
        assert!(!dash.apply(&metrics(50.0, 52.0)).pulse);
        assert!(!dash.surface().contains(&UiEvent::Pulse { active: true }));

        assert!(dash.apply(&metrics(50.1, 10.1)).pulse);
        assert_eq!(dash.surface().last(), Some(&UiEvent::Pulse { active: true }));
    }

    #[test]
    fn malformed_frame_is_quarantined() {
        let mut dash = dashboard();
        dash.handle_frame(r#"{"waveform":[7.0]}"#).unwrap();
        let before = dash.surface().len();

        assert!(dash.handle_frame("{\"waveform\": [").is_err());
        assert!(dash.handle_frame(r#"{"waveform":[1],"rosc_prediction":-3}"#).is_err());

        assert_eq!(dash.quarantined(), 2);
        assert_eq!(dash.packets(), 1);
        assert_eq!(dash.surface().len(), before);
        assert_eq!(dash.waveform().snapshot(), vec![7.0]);
    }

    #[test]
    fn lifecycle_logs() {
        let mut dash = dashboard();
        dash.on_open();
        assert_eq!(dash.state(), ConnectionState::Connected);

        dash.on_transport_error(&"reset by peer");
        assert_eq!(dash.state(), ConnectionState::Connected);

        dash.on_close(Some(Duration::from_secs(3)));
        assert_eq!(dash.state(), ConnectionState::Disconnected);

        let logs: Vec<_> = dash
            .surface()
            .iter()
            .filter_map(|e| match e {
                UiEvent::Log(entry) => Some((entry.level, entry.message.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            logs,
            [
                (LogLevel::Info, "Connected to CPR feedback stream."),
                (LogLevel::Error, "Connection lost. Reconnecting in 3s..."),
            ]
        );
        assert!(dash.surface().contains(&UiEvent::Connection {
            state: ConnectionState::Disconnected
        }));
    }

    #[test]
    fn human_delays() {
        assert_eq!(human_delay(Duration::from_secs(3)), "3s");
        assert_eq!(human_delay(Duration::from_millis(1500)), "1500ms");
    }
}
