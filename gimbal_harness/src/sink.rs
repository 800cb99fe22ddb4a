// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A trace sink that renders every event to a plain string.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "trace-rich")]
use gimbal_core::trace::PropertyOpEvent;
use gimbal_core::trace::{
    CapabilityEvent, CrtcResolvedEvent, HandshakeEvent, PanelPreRotatedEvent,
    RotationAppliedEvent, RotationFailedEvent, RotationRequestEvent, RotationSkippedEvent,
    ScreenSizeHintEvent, StackingPassEvent, TraceSink, TransitionHintEvent,
};

/// A [`TraceSink`] that renders each event to one line of text.
///
/// The lines are meant for demo output and loose shape assertions, not as a
/// stable machine format.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Vec<String>,
}

impl CollectingSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The rendered lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Discards all rendered lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl TraceSink for CollectingSink {
    fn on_capability(&mut self, e: &CapabilityEvent) {
        self.lines
            .push(format!("capability supported={}", e.supported));
    }

    fn on_crtc_resolved(&mut self, e: &CrtcResolvedEvent) {
        self.lines
            .push(format!("crtc-resolved {:?} via {:?}", e.crtc, e.via));
    }

    fn on_rotation_request(&mut self, e: &RotationRequestEvent) {
        self.lines
            .push(format!("rotation-request {:?} apply={}", e.target, e.apply));
    }

    fn on_panel_pre_rotated(&mut self, e: &PanelPreRotatedEvent) {
        self.lines
            .push(format!("panel-pre-rotated at {:?}", e.rotation));
    }

    fn on_rotation_skipped(&mut self, e: &RotationSkippedEvent) {
        self.lines.push(format!("rotation-skipped {:?}", e.reason));
    }

    fn on_rotation_applied(&mut self, e: &RotationAppliedEvent) {
        self.lines
            .push(format!("rotation-applied {:?} -> {:?}", e.from, e.to));
    }

    fn on_rotation_failed(&mut self, e: &RotationFailedEvent) {
        self.lines.push(format!(
            "rotation-failed {:?}: {} restored={}",
            e.stage, e.error, e.restored
        ));
    }

    fn on_handshake(&mut self, e: &HandshakeEvent) {
        self.lines.push(format!("handshake cleared={}", e.cleared));
    }

    fn on_transition_hint(&mut self, e: &TransitionHintEvent) {
        self.lines
            .push(format!("transition-hint active={}", e.active));
    }

    fn on_screen_size_hint(&mut self, e: &ScreenSizeHintEvent) {
        self.lines
            .push(format!("screen-size-hint {}x{}", e.width, e.height));
    }

    fn on_stacking_pass(&mut self, e: &StackingPassEvent) {
        self.lines.push(format!(
            "stacking-pass {} layer={:?} marked={} cleared={} unchanged={} transients={}",
            e.pass, e.layer, e.marked, e.cleared, e.unchanged, e.transients
        ));
    }

    #[cfg(feature = "trace-rich")]
    fn on_property_op(&mut self, e: &PropertyOpEvent) {
        self.lines
            .push(format!("property-op {:?} {} {:?}", e.window, e.attribute, e.op));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimbal_core::display::Rotation;
    use gimbal_core::trace::SkipReason;

    #[test]
    fn renders_one_line_per_event() {
        let mut sink = CollectingSink::new();
        sink.on_capability(&CapabilityEvent { supported: true });
        sink.on_rotation_applied(&RotationAppliedEvent {
            from: Rotation::R0,
            to: Rotation::R90,
        });
        sink.on_rotation_skipped(&RotationSkippedEvent {
            reason: SkipReason::AlreadyActive,
        });

        assert_eq!(
            sink.lines(),
            [
                "capability supported=true",
                "rotation-applied R0 -> R90",
                "rotation-skipped AlreadyActive",
            ]
        );

        sink.clear();
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn stacking_pass_line_carries_all_counters() {
        use gimbal_core::stacking::StackLayer;

        let mut sink = CollectingSink::new();
        sink.on_stacking_pass(&StackingPassEvent {
            pass: 3,
            layer: StackLayer::Mid,
            marked: 2,
            cleared: 1,
            unchanged: 4,
            transients: 1,
        });

        assert_eq!(
            sink.lines(),
            ["stacking-pass 3 layer=Mid marked=2 cleared=1 unchanged=4 transients=1"]
        );
    }
}
