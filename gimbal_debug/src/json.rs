// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON Lines trace output.
//!
//! [`JsonLinesSink`] implements [`TraceSink`] and writes one standalone JSON
//! object per event (`{"ev": "...", ...}`) to a [`Write`](std::io::Write)
//! destination. The stream is greppable and parseable a line at a time, which
//! suits post-mortem scripts better than one large document.

use std::io::Write;

use serde_json::{Value, json};

use gimbal_core::trace::{
    CapabilityEvent, CrtcResolvedEvent, HandshakeEvent, PanelPreRotatedEvent, PropertyOpEvent,
    RotationAppliedEvent, RotationFailedEvent, RotationRequestEvent, RotationSkippedEvent,
    ScreenSizeHintEvent, StackingPassEvent, TraceSink, TransitionHintEvent,
};

/// Writes one JSON object per event to a [`Write`](std::io::Write) destination.
pub struct JsonLinesSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

impl JsonLinesSink {
    /// Creates a sink that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    fn line(&mut self, value: &Value) {
        let _ = writeln!(self.writer, "{value}");
    }
}

impl<W: Write> TraceSink for JsonLinesSink<W> {
    fn on_capability(&mut self, e: &CapabilityEvent) {
        self.line(&json!({"ev": "capability", "supported": e.supported}));
    }

    fn on_crtc_resolved(&mut self, e: &CrtcResolvedEvent) {
        self.line(&json!({
            "ev": "crtc-resolved",
            "crtc": e.crtc.0,
            "via": format!("{:?}", e.via),
        }));
    }

    fn on_rotation_request(&mut self, e: &RotationRequestEvent) {
        self.line(&json!({
            "ev": "rotation-request",
            "target": format!("{:?}", e.target),
            "apply": e.apply,
        }));
    }

    fn on_panel_pre_rotated(&mut self, e: &PanelPreRotatedEvent) {
        self.line(&json!({
            "ev": "panel-pre-rotated",
            "rotation": format!("{:?}", e.rotation),
        }));
    }

    fn on_rotation_skipped(&mut self, e: &RotationSkippedEvent) {
        self.line(&json!({
            "ev": "rotation-skipped",
            "reason": format!("{:?}", e.reason),
        }));
    }

    fn on_rotation_applied(&mut self, e: &RotationAppliedEvent) {
        self.line(&json!({
            "ev": "rotation-applied",
            "from": format!("{:?}", e.from),
            "to": format!("{:?}", e.to),
        }));
    }

    fn on_rotation_failed(&mut self, e: &RotationFailedEvent) {
        self.line(&json!({
            "ev": "rotation-failed",
            "stage": format!("{:?}", e.stage),
            "error": e.error.to_string(),
            "restored": e.restored,
        }));
    }

    fn on_handshake(&mut self, e: &HandshakeEvent) {
        self.line(&json!({"ev": "handshake", "cleared": e.cleared}));
    }

    fn on_transition_hint(&mut self, e: &TransitionHintEvent) {
        self.line(&json!({"ev": "transition-hint", "active": e.active}));
    }

    fn on_screen_size_hint(&mut self, e: &ScreenSizeHintEvent) {
        self.line(&json!({
            "ev": "screen-size-hint",
            "width": e.width,
            "height": e.height,
        }));
    }

    fn on_stacking_pass(&mut self, e: &StackingPassEvent) {
        self.line(&json!({
            "ev": "stacking-pass",
            "pass": e.pass,
            "layer": format!("{:?}", e.layer),
            "marked": e.marked,
            "cleared": e.cleared,
            "unchanged": e.unchanged,
            "transients": e.transients,
        }));
    }

    fn on_property_op(&mut self, e: &PropertyOpEvent) {
        self.line(&json!({
            "ev": "property-op",
            "window": e.window.0,
            "attribute": e.attribute,
            "op": format!("{:?}", e.op),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimbal_core::display::{DisplayError, Orientation, Rotation, WindowId};
    use gimbal_core::stacking::StackLayer;
    use gimbal_core::trace::{PropertyOp, RotateStage};

    fn parse_lines(sink: JsonLinesSink<Vec<u8>>) -> Vec<Value> {
        let output = String::from_utf8(sink.writer).unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn each_event_is_a_standalone_object() {
        let mut sink = JsonLinesSink::with_writer(Vec::<u8>::new());
        sink.on_rotation_request(&RotationRequestEvent {
            target: Orientation::Portrait,
            apply: true,
        });
        sink.on_rotation_applied(&RotationAppliedEvent {
            from: Rotation::R0,
            to: Rotation::R90,
        });
        sink.on_stacking_pass(&StackingPassEvent {
            pass: 3,
            layer: StackLayer::Mid,
            marked: 2,
            cleared: 1,
            unchanged: 4,
            transients: 1,
        });

        let lines = parse_lines(sink);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["ev"], "rotation-request");
        assert_eq!(lines[0]["target"], "Portrait");
        assert_eq!(lines[1]["ev"], "rotation-applied");
        assert_eq!(lines[1]["to"], "R90");
        assert_eq!(lines[2]["layer"], "Mid");
        assert_eq!(lines[2]["marked"], 2);
    }

    #[test]
    fn failure_lines_carry_the_error_text() {
        let mut sink = JsonLinesSink::with_writer(Vec::<u8>::new());
        sink.on_rotation_failed(&RotationFailedEvent {
            stage: RotateStage::Resize,
            error: DisplayError::CommunicationFailure,
            restored: false,
        });

        let lines = parse_lines(sink);
        assert_eq!(lines[0]["stage"], "Resize");
        assert_eq!(lines[0]["error"], "display-server communication failure");
        assert_eq!(lines[0]["restored"], false);
    }

    #[test]
    fn property_ops_identify_the_window() {
        let mut sink = JsonLinesSink::with_writer(Vec::<u8>::new());
        sink.on_property_op(&PropertyOpEvent {
            window: WindowId(0x2a),
            attribute: "_GIMBAL_ON_CURRENT_DESKTOP",
            op: PropertyOp::Wrote,
        });

        let lines = parse_lines(sink);
        assert_eq!(lines[0]["ev"], "property-op");
        assert_eq!(lines[0]["window"], 42);
        assert_eq!(lines[0]["attribute"], "_GIMBAL_ON_CURRENT_DESKTOP");
        assert_eq!(lines[0]["op"], "Wrote");
    }
}
