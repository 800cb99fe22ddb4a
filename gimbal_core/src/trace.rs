// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the orientation and stacking coordinators.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! coordinators call as they probe, decide, and touch the server. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! Because every failure in this crate is recovered locally and surfaced to
//! callers as a bare `false`, the trace stream is where the detail lives:
//! which stage failed, with what error, and whether the display was restored.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates the per-property-operation
//!   [`PropertyOpEvent`] plus the corresponding `TraceSink` method.

#[cfg(feature = "trace-rich")]
use crate::display::WindowId;
use crate::display::{CrtcId, DisplayError, Orientation, Rotation};
use crate::property::WriteOutcome;
use crate::stacking::StackLayer;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How the rotation CRTC was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrtcSource {
    /// The server exposes exactly one CRTC.
    SoleCrtc,
    /// An output declared the built-in-panel connector type.
    BuiltinPanel,
    /// Fell back to the server's declared primary output.
    PrimaryOutput,
}

/// Why a rotation request was refused without touching hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The server lacks the rotation extension version.
    CapabilityUnavailable,
    /// No CRTC could be resolved.
    NoCrtc,
    /// A previous rotation has not completed its handshake yet.
    TransitionInFlight,
    /// The target rotation is outside the hardware's supported set.
    Unsupported,
    /// The target rotation is already active.
    AlreadyActive,
}

/// Where in the rotation sequence a failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotateStage {
    /// The capability probe.
    Probe,
    /// CRTC/output discovery.
    Resources,
    /// Reading the CRTC state.
    CrtcState,
    /// The pre-grab synchronization round-trip.
    Sync,
    /// Taking the server grab.
    Grab,
    /// Publishing the suppress-reconfiguration flag.
    Suppress,
    /// Disabling the CRTC.
    Disable,
    /// Resizing the virtual screen.
    Resize,
    /// Applying the new CRTC configuration.
    Apply,
    /// Releasing the server grab.
    Ungrab,
}

/// What a property operation did (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyOp {
    /// The property was written.
    Wrote,
    /// The property was deleted.
    Deleted,
    /// The stored state already matched; no request was issued.
    Skipped,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the rotation capability probe completes.
#[derive(Clone, Copy, Debug)]
pub struct CapabilityEvent {
    /// Whether the server supports CRTC rotation.
    pub supported: bool,
}

/// Emitted when the rotation CRTC is resolved (once per process, cached
/// afterwards).
#[derive(Clone, Copy, Debug)]
pub struct CrtcResolvedEvent {
    /// The chosen CRTC.
    pub crtc: CrtcId,
    /// How it was chosen.
    pub via: CrtcSource,
}

/// Emitted at the start of every orientation request.
#[derive(Clone, Copy, Debug)]
pub struct RotationRequestEvent {
    /// The requested orientation.
    pub target: Orientation,
    /// `false` for a probe-only pass that must not touch hardware.
    pub apply: bool,
}

/// Emitted when the controller detects a firmware-pre-rotated panel and
/// overrides the target rotation.
#[derive(Clone, Copy, Debug)]
pub struct PanelPreRotatedEvent {
    /// The CRTC rotation that triggered the detection.
    pub rotation: Rotation,
}

/// Emitted when a rotation request is refused without touching hardware.
#[derive(Clone, Copy, Debug)]
pub struct RotationSkippedEvent {
    /// Why the request went nowhere.
    pub reason: SkipReason,
}

/// Emitted after the hardware sequence completes successfully.
#[derive(Clone, Copy, Debug)]
pub struct RotationAppliedEvent {
    /// The rotation before the sequence.
    pub from: Rotation,
    /// The rotation now active.
    pub to: Rotation,
}

/// Emitted when the rotation sequence fails.
#[derive(Clone, Copy, Debug)]
pub struct RotationFailedEvent {
    /// The stage that failed.
    pub stage: RotateStage,
    /// The underlying error.
    pub error: DisplayError,
    /// Whether the display was left in its original usable configuration.
    /// Always `true` for failures before the CRTC was disabled.
    pub restored: bool,
}

/// Emitted when the second phase of the rotation handshake runs.
#[derive(Clone, Copy, Debug)]
pub struct HandshakeEvent {
    /// Whether a suppress flag was actually present to clear.
    pub cleared: bool,
}

/// Emitted when the transition-in-progress scheduling hint changes.
#[derive(Clone, Copy, Debug)]
pub struct TransitionHintEvent {
    /// The published hint value.
    pub active: bool,
}

/// Emitted when the advisory screen-size pair is published.
#[derive(Clone, Copy, Debug)]
pub struct ScreenSizeHintEvent {
    /// Published width in pixels.
    pub width: u16,
    /// Published height in pixels.
    pub height: u16,
}

/// Per-pass summary of a desktop-layer restack.
#[derive(Clone, Copy, Debug)]
pub struct StackingPassEvent {
    /// Monotonic pass counter.
    pub pass: u64,
    /// The layer the desktop window was placed in.
    pub layer: StackLayer,
    /// Active-view applets whose mark was written.
    pub marked: u32,
    /// Other-view applets whose mark was deleted.
    pub cleared: u32,
    /// Applets whose mark already matched (no request issued).
    pub unchanged: u32,
    /// Non-applet transient children restacked.
    pub transients: u32,
}

/// A single property operation (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct PropertyOpEvent {
    /// The window the property is attached to.
    pub window: WindowId,
    /// The attribute's wire name.
    pub attribute: &'static str,
    /// What happened.
    pub op: PropertyOp,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the coordinators.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when the capability probe completes.
    fn on_capability(&mut self, e: &CapabilityEvent) {
        _ = e;
    }

    /// Called when the rotation CRTC is resolved.
    fn on_crtc_resolved(&mut self, e: &CrtcResolvedEvent) {
        _ = e;
    }

    /// Called at the start of every orientation request.
    fn on_rotation_request(&mut self, e: &RotationRequestEvent) {
        _ = e;
    }

    /// Called when a firmware-pre-rotated panel is detected.
    fn on_panel_pre_rotated(&mut self, e: &PanelPreRotatedEvent) {
        _ = e;
    }

    /// Called when a rotation request is refused early.
    fn on_rotation_skipped(&mut self, e: &RotationSkippedEvent) {
        _ = e;
    }

    /// Called after a successful hardware rotation.
    fn on_rotation_applied(&mut self, e: &RotationAppliedEvent) {
        _ = e;
    }

    /// Called when the rotation sequence fails.
    fn on_rotation_failed(&mut self, e: &RotationFailedEvent) {
        _ = e;
    }

    /// Called when the handshake completion runs.
    fn on_handshake(&mut self, e: &HandshakeEvent) {
        _ = e;
    }

    /// Called when the transition hint changes.
    fn on_transition_hint(&mut self, e: &TransitionHintEvent) {
        _ = e;
    }

    /// Called when the advisory screen-size pair is published.
    fn on_screen_size_hint(&mut self, e: &ScreenSizeHintEvent) {
        _ = e;
    }

    /// Called with a per-pass stacking summary.
    fn on_stacking_pass(&mut self, e: &StackingPassEvent) {
        _ = e;
    }

    /// Called for every property operation (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_property_op(&mut self, e: &PropertyOpEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`CapabilityEvent`].
    #[inline]
    pub fn capability(&mut self, e: &CapabilityEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_capability(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CrtcResolvedEvent`].
    #[inline]
    pub fn crtc_resolved(&mut self, e: &CrtcResolvedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_crtc_resolved(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RotationRequestEvent`].
    #[inline]
    pub fn rotation_request(&mut self, e: &RotationRequestEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rotation_request(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PanelPreRotatedEvent`].
    #[inline]
    pub fn panel_pre_rotated(&mut self, e: &PanelPreRotatedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_panel_pre_rotated(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RotationSkippedEvent`].
    #[inline]
    pub fn rotation_skipped(&mut self, e: &RotationSkippedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rotation_skipped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RotationAppliedEvent`].
    #[inline]
    pub fn rotation_applied(&mut self, e: &RotationAppliedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rotation_applied(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RotationFailedEvent`].
    #[inline]
    pub fn rotation_failed(&mut self, e: &RotationFailedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rotation_failed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`HandshakeEvent`].
    #[inline]
    pub fn handshake(&mut self, e: &HandshakeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_handshake(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TransitionHintEvent`].
    #[inline]
    pub fn transition_hint(&mut self, e: &TransitionHintEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_transition_hint(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ScreenSizeHintEvent`].
    #[inline]
    pub fn screen_size_hint(&mut self, e: &ScreenSizeHintEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_screen_size_hint(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StackingPassEvent`].
    #[inline]
    pub fn stacking_pass(&mut self, e: &StackingPassEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stacking_pass(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PropertyOpEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn property_op(&mut self, e: &PropertyOpEvent) {
        if let Some(s) = &mut self.sink {
            s.on_property_op(e);
        }
    }
}

// ---------------------------------------------------------------------------
// StackingPassBuilder
// ---------------------------------------------------------------------------

/// Collects per-window outcomes during a stacking pass and produces a
/// [`StackingPassEvent`] at the end.
#[derive(Debug, Default)]
pub struct StackingPassBuilder {
    marked: u32,
    cleared: u32,
    unchanged: u32,
    transients: u32,
}

impl StackingPassBuilder {
    /// Starts an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of marking an active-view applet.
    pub fn record_mark(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Wrote => self.marked += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Records the outcome of clearing an other-view applet's mark.
    pub fn record_clear(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Wrote => self.cleared += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Records one restacked transient child.
    pub fn record_transient(&mut self) {
        self.transients += 1;
    }

    /// Consumes the builder and produces the final [`StackingPassEvent`].
    #[must_use]
    pub fn finish(self, pass: u64, layer: StackLayer) -> StackingPassEvent {
        StackingPassEvent {
            pass,
            layer,
            marked: self.marked,
            cleared: self.cleared,
            unchanged: self.unchanged,
            transients: self.transients,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
