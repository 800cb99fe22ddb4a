// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Lines carry
//! a `[tag]` prefix so a mixed log can be grepped by event family.

use std::io::Write;

use gimbal_core::trace::{
    CapabilityEvent, CrtcResolvedEvent, HandshakeEvent, PanelPreRotatedEvent, PropertyOpEvent,
    RotationAppliedEvent, RotationFailedEvent, RotationRequestEvent, RotationSkippedEvent,
    ScreenSizeHintEvent, StackingPassEvent, TraceSink, TransitionHintEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_capability(&mut self, e: &CapabilityEvent) {
        let _ = writeln!(self.writer, "[capability] supported={}", e.supported);
    }

    fn on_crtc_resolved(&mut self, e: &CrtcResolvedEvent) {
        let _ = writeln!(self.writer, "[crtc] {:?} via {:?}", e.crtc, e.via);
    }

    fn on_rotation_request(&mut self, e: &RotationRequestEvent) {
        let _ = writeln!(
            self.writer,
            "[rotate:request] target={:?} apply={}",
            e.target, e.apply,
        );
    }

    fn on_panel_pre_rotated(&mut self, e: &PanelPreRotatedEvent) {
        let _ = writeln!(self.writer, "[panel] pre-rotated at {:?}", e.rotation);
    }

    fn on_rotation_skipped(&mut self, e: &RotationSkippedEvent) {
        let _ = writeln!(self.writer, "[rotate:skip] {:?}", e.reason);
    }

    fn on_rotation_applied(&mut self, e: &RotationAppliedEvent) {
        let _ = writeln!(self.writer, "[rotate:apply] {:?} -> {:?}", e.from, e.to);
    }

    fn on_rotation_failed(&mut self, e: &RotationFailedEvent) {
        let _ = writeln!(
            self.writer,
            "[rotate:fail] stage={:?} error={} restored={}",
            e.stage, e.error, e.restored,
        );
    }

    fn on_handshake(&mut self, e: &HandshakeEvent) {
        let _ = writeln!(self.writer, "[handshake] cleared={}", e.cleared);
    }

    fn on_transition_hint(&mut self, e: &TransitionHintEvent) {
        let _ = writeln!(self.writer, "[hint:transition] active={}", e.active);
    }

    fn on_screen_size_hint(&mut self, e: &ScreenSizeHintEvent) {
        let _ = writeln!(self.writer, "[hint:size] {}x{}", e.width, e.height);
    }

    fn on_stacking_pass(&mut self, e: &StackingPassEvent) {
        let _ = writeln!(
            self.writer,
            "[stacking] pass={} layer={:?} marked={} cleared={} unchanged={} transients={}",
            e.pass, e.layer, e.marked, e.cleared, e.unchanged, e.transients,
        );
    }

    fn on_property_op(&mut self, e: &PropertyOpEvent) {
        let _ = writeln!(self.writer, "[prop] {:?} {} {:?}", e.window, e.attribute, e.op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimbal_core::display::{DisplayError, Rotation};
    use gimbal_core::stacking::StackLayer;
    use gimbal_core::trace::RotateStage;

    #[test]
    fn pretty_print_rotation_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_rotation_applied(&RotationAppliedEvent {
            from: Rotation::R0,
            to: Rotation::R90,
        });
        sink.on_rotation_failed(&RotationFailedEvent {
            stage: RotateStage::Apply,
            error: DisplayError::UnsupportedConfiguration,
            restored: true,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[rotate:apply] R0 -> R90"), "got: {output}");
        assert!(output.contains("stage=Apply"), "got: {output}");
        assert!(output.contains("restored=true"), "got: {output}");
    }

    #[test]
    fn pretty_print_stacking_pass() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_stacking_pass(&StackingPassEvent {
            pass: 4,
            layer: StackLayer::Mid,
            marked: 2,
            cleared: 1,
            unchanged: 3,
            transients: 1,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert_eq!(
            output,
            "[stacking] pass=4 layer=Mid marked=2 cleared=1 unchanged=3 transients=1\n"
        );
    }
}
