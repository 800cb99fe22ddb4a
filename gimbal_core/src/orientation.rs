// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware display rotation for a touchscreen shell.
//!
//! [`OrientationController`] owns the whole portrait/landscape story: it
//! probes the server's rotation capability once, resolves which CRTC drives
//! the panel, and runs the grab-protected rotation sequence documented on
//! [`DisplayControl`]. It also publishes the shared-property side of the
//! protocol (the reconfiguration suppress flag, the transition scheduling
//! hint, and the advisory screen-size pair).
//!
//! Every failure is recovered locally: callers get `true` when the hardware
//! rotated and `false` otherwise, and the display is left in a usable
//! configuration either way. The detail behind a `false` (which stage, which
//! error, whether the original configuration was restored) goes to the
//! [`Tracer`].
//!
//! All probe state is per-instance. Nothing here lives in statics, so tests
//! run controllers against fake displays side by side.

use crate::display::{
    CrtcId, CrtcState, DisplayControl, DisplayError, Orientation, Rotation, ScreenSize, WindowId,
};
use crate::property::{self, Attribute, WriteOutcome};
use crate::shell::{InputPipeline, RenderStage};
use crate::trace::{
    CapabilityEvent, CrtcResolvedEvent, CrtcSource, HandshakeEvent, PanelPreRotatedEvent,
    RotateStage, RotationAppliedEvent, RotationFailedEvent, RotationRequestEvent,
    RotationSkippedEvent, ScreenSizeHintEvent, SkipReason, TransitionHintEvent, Tracer,
};

// ---------------------------------------------------------------------------
// OrientationController
// ---------------------------------------------------------------------------

/// Coordinates display rotation between the render stage, the input pipeline,
/// and the display server.
///
/// One instance per display connection. The capability answer and the
/// resolved CRTC are cached after the first successful probe; the panel
/// orientation facts ([`panel_is_portrait`](Self::panel_is_portrait),
/// [`initially_rotated`](Self::initially_rotated), the logical landscape
/// frame) are captured from the first CRTC state read and never revised.
#[derive(Debug, Default)]
pub struct OrientationController {
    /// Capability probe answer, cached on first query.
    randr_capable: Option<bool>,
    /// The CRTC all rotation requests target, cached on first resolution.
    crtc: Option<CrtcId>,
    /// Whether the panel scans out portrait natively (firmware pre-rotation).
    panel_is_portrait: bool,
    /// Whether the CRTC was already sideways at the first state read.
    initially_rotated: Option<bool>,
    /// The logical landscape frame, captured once.
    landscape_frame: Option<(u16, u16)>,
    primed: bool,
    in_flight: bool,
}

impl OrientationController {
    /// Creates a controller with no cached probe state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the capability probe, CRTC resolution, and panel-state capture
    /// without touching any hardware configuration.
    ///
    /// Calling this at startup front-loads the probe round-trips and pins
    /// down [`display_frame`](Self::display_frame) before the first rotation
    /// request. It is optional: an unprimed controller probes lazily on the
    /// first request instead.
    ///
    /// Returns `true` when the probe completed and rotation is available.
    ///
    /// # Panics
    ///
    /// Panics when called a second time on the same controller; the captured
    /// state must come from exactly one probe.
    pub fn prime<D: DisplayControl + ?Sized>(
        &mut self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        assert!(!self.primed, "prime called twice on the same controller");
        self.primed = true;

        if self.probe_capability(display, tracer) != Some(true) {
            return false;
        }
        let Some(crtc) = self.resolve_crtc(display, tracer) else {
            return false;
        };
        self.inspect_state(display, tracer, crtc).is_some()
    }

    /// Rotates the display to `target`, running the full grab-protected
    /// sequence documented on [`DisplayControl`].
    ///
    /// Returns `true` when the hardware accepted the new configuration. On
    /// success the rotation is considered in flight until
    /// [`complete_rotation_handshake`](Self::complete_rotation_handshake)
    /// runs; further requests are refused until then.
    ///
    /// Returns `false` when the request was refused (no capability, no CRTC,
    /// unsupported or already-active rotation, a transition in flight) or
    /// when a stage of the sequence failed. After a mid-sequence failure the
    /// original CRTC configuration and screen size are re-applied while the
    /// server is still grabbed, so peers never observe a half-rotated
    /// display.
    pub fn change_orientation<D, R, I>(
        &mut self,
        display: &mut D,
        render: &mut R,
        input: &mut I,
        tracer: &mut Tracer<'_>,
        target: Orientation,
    ) -> bool
    where
        D: DisplayControl + ?Sized,
        R: RenderStage + ?Sized,
        I: InputPipeline + ?Sized,
    {
        tracer.rotation_request(&RotationRequestEvent {
            target,
            apply: true,
        });

        match self.probe_capability(display, tracer) {
            Some(true) => {}
            Some(false) => {
                tracer.rotation_skipped(&RotationSkippedEvent {
                    reason: SkipReason::CapabilityUnavailable,
                });
                return false;
            }
            None => return false,
        }
        let Some(crtc) = self.resolve_crtc(display, tracer) else {
            return false;
        };
        let Some((state, pre_rotated)) = self.inspect_state(display, tracer, crtc) else {
            return false;
        };

        // On a firmware-pre-rotated panel the unrotated scan-out is already
        // portrait, so the orientations map onto R0/R270 instead of R90/R0.
        let want = match (pre_rotated, target.is_portrait()) {
            (true, true) => Rotation::R0,
            (true, false) => Rotation::R270,
            (false, true) => Rotation::R90,
            (false, false) => Rotation::R0,
        };

        if self.in_flight {
            tracer.rotation_skipped(&RotationSkippedEvent {
                reason: SkipReason::TransitionInFlight,
            });
            return false;
        }
        if !state.supported.contains(want) {
            tracer.rotation_skipped(&RotationSkippedEvent {
                reason: SkipReason::Unsupported,
            });
            return false;
        }
        if state.rotation == want {
            tracer.rotation_skipped(&RotationSkippedEvent {
                reason: SkipReason::AlreadyActive,
            });
            return false;
        }

        let size = match display.screen_size() {
            Ok(size) => size,
            Err(error) => {
                tracer.rotation_failed(&RotationFailedEvent {
                    stage: RotateStage::Resize,
                    error,
                    restored: true,
                });
                return false;
            }
        };
        let new_size = if target.is_portrait() {
            size.portraitized()
        } else {
            size.landscapized()
        };

        // Drain both sides before grabbing: pending server events first, then
        // the render pipeline, so nothing draws mid-reconfiguration.
        if let Err(error) = display.sync() {
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Sync,
                error,
                restored: true,
            });
            return false;
        }
        render.finish_pending_draws();
        if let Err(error) = display.grab() {
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Grab,
                error,
                restored: true,
            });
            return false;
        }

        let root = display.root_window();
        // Inside the grab every request is queued; nothing round-trips until
        // the closing sync.
        if let Err(error) =
            property::write_flag(display, root, Attribute::SuppressRootReconfiguration, true)
        {
            abort_rotation(display, root);
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Suppress,
                error,
                restored: true,
            });
            return false;
        }
        if let Err(error) = display.disable_crtc(crtc, state.timestamp) {
            abort_rotation(display, root);
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Disable,
                error,
                restored: true,
            });
            return false;
        }
        if let Err(error) = display.set_screen_size(new_size) {
            // The screen kept its old size; re-enabling the CRTC as it was
            // is the whole restore.
            let restored = display
                .apply_crtc(crtc, &state.config_with_rotation(state.rotation))
                .is_ok();
            abort_rotation(display, root);
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Resize,
                error,
                restored,
            });
            return false;
        }
        if let Err(error) = display.apply_crtc(crtc, &state.config_with_rotation(want)) {
            // The CRTC is still disabled here, so the size rolls back first
            // and the old mode re-applies without ever exceeding the screen.
            let size_restored = display.set_screen_size(size).is_ok();
            let crtc_restored = display
                .apply_crtc(crtc, &state.config_with_rotation(state.rotation))
                .is_ok();
            abort_rotation(display, root);
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Apply,
                error,
                restored: size_restored && crtc_restored,
            });
            return false;
        }

        if let Err(error) = display.ungrab() {
            let _ = display.sync();
            let _ = property::clear(display, root, Attribute::SuppressRootReconfiguration);
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Ungrab,
                error,
                restored: false,
            });
            return false;
        }
        // The closing round-trip is not optional: releasing the grab without
        // flushing leaves the server wedged with the new mode half-announced.
        if let Err(error) = display.sync() {
            let _ = property::clear(display, root, Attribute::SuppressRootReconfiguration);
            tracer.rotation_failed(&RotationFailedEvent {
                stage: RotateStage::Sync,
                error,
                restored: false,
            });
            return false;
        }

        self.in_flight = true;
        input.remap_axes(target);
        render.flip_input_viewport();
        tracer.rotation_applied(&RotationAppliedEvent {
            from: state.rotation,
            to: want,
        });
        true
    }

    /// Completes a rotation: deletes the reconfiguration suppress flag so
    /// peers resume reacting to root geometry, and lifts the in-flight
    /// refusal.
    ///
    /// Call this when the root window's configure notification for the new
    /// size arrives. Running it without a rotation in flight is harmless.
    pub fn complete_rotation_handshake<D: DisplayControl + ?Sized>(
        &mut self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
    ) {
        let root = display.root_window();
        let cleared = matches!(
            property::clear_if_present(display, root, Attribute::SuppressRootReconfiguration),
            Ok(WriteOutcome::Wrote)
        );
        let _ = display.sync();
        self.in_flight = false;
        tracer.handshake(&HandshakeEvent { cleared });
    }

    /// Publishes the transition scheduling hint on the root window.
    ///
    /// The hint tells peers a rotation animation is running so they can
    /// defer heavy work. It has no correctness role, so a failed write is
    /// dropped silently.
    pub fn set_transition_hint<D: DisplayControl + ?Sized>(
        &self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
        active: bool,
    ) {
        let root = display.root_window();
        if property::write_flag(display, root, Attribute::RotationTransition, active).is_ok() {
            tracer.transition_hint(&TransitionHintEvent { active });
        }
    }

    /// Publishes the advisory screen-size pair on the root window, ordered
    /// for `portrait`.
    ///
    /// The pair always describes the captured logical landscape frame, not
    /// the live screen, so peers reading it mid-rotation see the settled
    /// target rather than a transient. Captures the frame first if no probe
    /// has run yet.
    pub fn publish_screen_size<D: DisplayControl + ?Sized>(
        &mut self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
        portrait: bool,
    ) {
        if self.landscape_frame.is_none()
            && let Ok(size) = display.screen_size()
        {
            self.capture_frame(size);
        }
        let Some(frame) = self.landscape_frame else {
            return;
        };
        let root = display.root_window();
        if property::write_screen_size_hint(display, root, portrait, frame).is_ok() {
            let (width, height) = if portrait {
                (frame.1, frame.0)
            } else {
                frame
            };
            tracer.screen_size_hint(&ScreenSizeHintEvent { width, height });
        }
    }

    /// Whether a rotation has been applied but not yet handshaken.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether the panel scans out portrait natively. `false` until a state
    /// read proves otherwise.
    #[must_use]
    pub fn panel_is_portrait(&self) -> bool {
        self.panel_is_portrait
    }

    /// Whether the CRTC was already sideways at the first state read, or
    /// `None` before any read.
    #[must_use]
    pub fn initially_rotated(&self) -> Option<bool> {
        self.initially_rotated
    }

    /// The logical landscape frame `(width, height)`, or `None` before any
    /// capture. Landscape means `width >= height` here even when the panel
    /// hardware is portrait-native.
    #[must_use]
    pub fn display_frame(&self) -> Option<(u16, u16)> {
        self.landscape_frame
    }

    // -----------------------------------------------------------------------
    // Probe internals
    // -----------------------------------------------------------------------

    /// Returns the cached capability answer, querying the server on the
    /// first call. `None` means the query itself failed (and was traced).
    fn probe_capability<D: DisplayControl + ?Sized>(
        &mut self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
    ) -> Option<bool> {
        if let Some(supported) = self.randr_capable {
            return Some(supported);
        }
        match display.rotation_capable() {
            Ok(supported) => {
                self.randr_capable = Some(supported);
                tracer.capability(&CapabilityEvent { supported });
                Some(supported)
            }
            Err(error) => {
                tracer.rotation_failed(&RotationFailedEvent {
                    stage: RotateStage::Probe,
                    error,
                    restored: true,
                });
                None
            }
        }
    }

    /// Returns the cached rotation CRTC, resolving it on the first call.
    fn resolve_crtc<D: DisplayControl + ?Sized>(
        &mut self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
    ) -> Option<CrtcId> {
        if let Some(crtc) = self.crtc {
            return Some(crtc);
        }
        let found = match scan_for_crtc(display) {
            Ok(found) => found,
            Err(error) => {
                tracer.rotation_failed(&RotationFailedEvent {
                    stage: RotateStage::Resources,
                    error,
                    restored: true,
                });
                return None;
            }
        };
        match found {
            Some((crtc, via)) => {
                self.crtc = Some(crtc);
                tracer.crtc_resolved(&CrtcResolvedEvent { crtc, via });
                Some(crtc)
            }
            None => {
                tracer.rotation_skipped(&RotationSkippedEvent {
                    reason: SkipReason::NoCrtc,
                });
                None
            }
        }
    }

    /// Reads the CRTC state and folds it into the captured panel facts.
    ///
    /// Returns the state plus whether the panel is currently in its
    /// firmware-pre-rotated arrangement. The sideways-at-startup answer and
    /// the logical landscape frame are captured on the first read only.
    fn inspect_state<D: DisplayControl + ?Sized>(
        &mut self,
        display: &mut D,
        tracer: &mut Tracer<'_>,
        crtc: CrtcId,
    ) -> Option<(CrtcState, bool)> {
        let state = match display.crtc_state(crtc) {
            Ok(state) => state,
            Err(error) => {
                tracer.rotation_failed(&RotationFailedEvent {
                    stage: RotateStage::CrtcState,
                    error,
                    restored: true,
                });
                return None;
            }
        };

        let pre_rotated = panel_pre_rotated(&state);
        if pre_rotated {
            self.panel_is_portrait = true;
            tracer.panel_pre_rotated(&PanelPreRotatedEvent {
                rotation: state.rotation,
            });
        }
        if self.initially_rotated.is_none() {
            self.initially_rotated = Some(state.rotation.is_sideways());
        }
        if self.landscape_frame.is_none()
            && let Ok(size) = display.screen_size()
        {
            self.capture_frame(size);
        }
        Some((state, pre_rotated))
    }

    /// Stores the logical landscape frame derived from the live screen size.
    ///
    /// The live size is landscape-ordered exactly when the panel's native
    /// orientation matches its sideways-at-capture state, so the pair swaps
    /// in the other two cases.
    fn capture_frame(&mut self, size: ScreenSize) {
        let swap = self.panel_is_portrait != self.initially_rotated.unwrap_or(false);
        self.landscape_frame = Some(if swap {
            (size.height, size.width)
        } else {
            (size.width, size.height)
        });
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// Whether the CRTC sits in a firmware-pre-rotated arrangement: unrotated
/// but scanning out portrait, or rotated a quarter turn back to landscape.
fn panel_pre_rotated(state: &CrtcState) -> bool {
    (state.rotation == Rotation::R0 && state.width < state.height)
        || (state.rotation == Rotation::R270 && state.width > state.height)
}

/// Picks the CRTC that rotation requests should target.
///
/// A server with exactly one CRTC needs no scan. Otherwise the outputs are
/// scanned for a declared built-in panel, then the server's primary output
/// is tried. `Ok(None)` means no candidate carries a CRTC.
fn scan_for_crtc<D: DisplayControl + ?Sized>(
    display: &mut D,
) -> Result<Option<(CrtcId, CrtcSource)>, DisplayError> {
    let resources = display.screen_resources()?;
    if let [sole] = resources.crtcs[..] {
        return Ok(Some((sole, CrtcSource::SoleCrtc)));
    }
    for output in &resources.outputs {
        if display.output_is_builtin_panel(*output)?
            && let Some(crtc) = display.output_crtc(*output)?
        {
            return Ok(Some((crtc, CrtcSource::BuiltinPanel)));
        }
    }
    if let Some(primary) = display.primary_output()?
        && let Some(crtc) = display.output_crtc(primary)?
    {
        return Ok(Some((crtc, CrtcSource::PrimaryOutput)));
    }
    Ok(None)
}

/// Failure cleanup inside the grab: the suppress flag must not outlive a
/// failed sequence, and the grab must always be released.
fn abort_rotation<D: DisplayControl + ?Sized>(display: &mut D, root: WindowId) {
    let _ = property::clear(display, root, Attribute::SuppressRootReconfiguration);
    let _ = display.ungrab();
    let _ = display.sync();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
