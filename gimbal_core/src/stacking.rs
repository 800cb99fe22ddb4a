// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Desktop-layer stacking across virtual-desktop views.
//!
//! Each view hosts its own set of home-screen applets, but the window manager
//! keeps one flat stacking list. [`StackCoordinator::restack_desktop_layer`]
//! recomputes the desktop layer from scratch on every stacking-affecting
//! event: it places the desktop window in the layer the render state asks
//! for, raises the active view's applets in rank order, and keeps the
//! shared-property view marks consistent so other processes can tell which
//! applets are live.
//!
//! A pass is a pure recomputation, not an incremental patch, and it is
//! idempotent: running it twice with unchanged inputs issues zero property
//! writes the second time. That matters because peers watch these properties;
//! redundant writes cost round-trips and wake every listener for nothing.

use alloc::vec::Vec;
use core::fmt;

use crate::display::{PropertyBus, WindowId};
use crate::property::{self, Attribute};
use crate::shell::{RenderStage, ShellWindowing};
#[cfg(feature = "trace-rich")]
use crate::trace::{PropertyOp, PropertyOpEvent};
use crate::trace::{StackingPassBuilder, Tracer};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifies a virtual-desktop view.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ViewId(pub u32);

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

/// The window manager's stacking layers, bottom first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StackLayer {
    /// Below everything; the desktop's home when nothing needs it visible.
    Bottom,
    /// Between the desktop and ordinary application windows.
    BottomMid,
    /// The desktop's home while the render state needs it visible underneath
    /// other content.
    Mid,
    /// Above application windows (dialogs, banners).
    TopMid,
    /// Always-on-top content.
    Top,
}

/// One desktop-layer window as reported by the window manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackEntry {
    /// The applet's window.
    pub window: WindowId,
    /// The view the applet belongs to; `None` means it is present on every
    /// view.
    pub view: Option<ViewId>,
    /// Stacking rank within the desktop layer. Lower ranks stack first;
    /// equal ranks keep window-manager order.
    pub rank: i32,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Recomputes the desktop-layer stacking order and the per-view property
/// marks.
#[derive(Debug, Default)]
pub struct StackCoordinator {
    passes: u64,
}

impl StackCoordinator {
    /// Creates a coordinator with a zeroed pass counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of passes run so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Runs one full stacking pass over the desktop layer.
    ///
    /// In order:
    ///
    /// 1. reads [`RenderStage::desktop_layer_required`] fresh and moves the
    ///    desktop window to [`StackLayer::Mid`] (flagging the desktop
    ///    active) or [`StackLayer::Bottom`] (clearing it);
    /// 2. raises the desktop window within that layer;
    /// 3. restacks the active view's applets in rank order and marks each
    ///    with [`Attribute::OnCurrentDesktop`];
    /// 4. deletes the mark from every other view's applets;
    /// 5. restacks the desktop's non-applet transient children in
    ///    window-manager order.
    ///
    /// Marks go through guarded writes, so a pass with unchanged inputs
    /// issues no property requests; marks deleted by peers are re-published.
    /// Before the window manager has mapped a desktop window the pass only
    /// emits its summary event. Property transport failures are skipped over,
    /// never propagated.
    pub fn restack_desktop_layer<B, W, R>(
        &mut self,
        bus: &mut B,
        windowing: &mut W,
        render: &mut R,
        tracer: &mut Tracer<'_>,
    ) where
        B: PropertyBus + ?Sized,
        W: ShellWindowing + ?Sized,
        R: RenderStage + ?Sized,
    {
        let pass = self.passes;
        self.passes += 1;

        // Never cached: the render state can flip between passes.
        let required = render.desktop_layer_required();
        let layer = if required {
            StackLayer::Mid
        } else {
            StackLayer::Bottom
        };

        let mut builder = StackingPassBuilder::new();
        let Some(desktop) = windowing.desktop_window() else {
            tracer.stacking_pass(&builder.finish(pass, layer));
            return;
        };

        windowing.assign_layer(desktop, layer);
        windowing.set_desktop_active(required);
        windowing.raise_within_layer(desktop);

        let active = windowing.active_view();
        let applets = windowing.applets();

        let mut on_view: Vec<&StackEntry> = applets
            .iter()
            .filter(|entry| entry.view.is_none_or(|view| view == active))
            .collect();
        // Stable sort, so equal ranks keep window-manager order.
        on_view.sort_by_key(|entry| entry.rank);
        for entry in on_view {
            windowing.restack_window(entry.window);
            if let Ok(outcome) = property::write_flag_if_changed(
                bus,
                entry.window,
                Attribute::OnCurrentDesktop,
                true,
            ) {
                builder.record_mark(outcome);
                #[cfg(feature = "trace-rich")]
                tracer.property_op(&PropertyOpEvent {
                    window: entry.window,
                    attribute: Attribute::OnCurrentDesktop.wire_name(),
                    op: match outcome {
                        property::WriteOutcome::Wrote => PropertyOp::Wrote,
                        property::WriteOutcome::Unchanged => PropertyOp::Skipped,
                    },
                });
            }
        }

        for entry in applets
            .iter()
            .filter(|entry| entry.view.is_some_and(|view| view != active))
        {
            if let Ok(outcome) =
                property::clear_if_present(bus, entry.window, Attribute::OnCurrentDesktop)
            {
                builder.record_clear(outcome);
                #[cfg(feature = "trace-rich")]
                tracer.property_op(&PropertyOpEvent {
                    window: entry.window,
                    attribute: Attribute::OnCurrentDesktop.wire_name(),
                    op: match outcome {
                        property::WriteOutcome::Wrote => PropertyOp::Deleted,
                        property::WriteOutcome::Unchanged => PropertyOp::Skipped,
                    },
                });
            }
        }

        for child in windowing.transient_children(desktop) {
            windowing.restack_window(child);
            builder.record_transient();
        }

        tracer.stacking_pass(&builder.finish(pass, layer));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use gimbal_harness::{FailPoint, FakeDisplay, FakeRenderStage, FakeShell, StackOp};

    // The fakes implement the traits of the externally linked `gimbal_core`
    // library, so the tests must use that copy of the crate too.
    use gimbal_core::display::WindowId;
    use gimbal_core::property::{Attribute, PropertyValue, read_flag};
    use gimbal_core::stacking::{StackCoordinator, StackLayer, ViewId};
    use gimbal_core::trace::Tracer;

    const DESKTOP: WindowId = WindowId(0x10);
    const APPLET_A: WindowId = WindowId(0x21);
    const APPLET_B: WindowId = WindowId(0x22);
    const APPLET_C: WindowId = WindowId(0x23);
    const DIALOG: WindowId = WindowId(0x31);

    fn shell_with_two_views() -> FakeShell {
        let mut shell = FakeShell::with_desktop(DESKTOP);
        shell.set_active_view(ViewId(1));
        shell.add_applet(APPLET_A, Some(ViewId(1)), 0);
        shell.add_applet(APPLET_B, Some(ViewId(2)), 0);
        // Present on every view.
        shell.add_applet(APPLET_C, None, 0);
        shell.add_transient(DIALOG);
        shell
    }

    #[test]
    fn pass_marks_only_active_view_applets() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );

        assert!(read_flag(&mut display, APPLET_A, Attribute::OnCurrentDesktop));
        assert!(read_flag(&mut display, APPLET_C, Attribute::OnCurrentDesktop));
        assert!(
            !read_flag(&mut display, APPLET_B, Attribute::OnCurrentDesktop),
            "other-view applet must stay unmarked"
        );
        assert_eq!(coordinator.passes(), 1);
    }

    #[test]
    fn pass_runs_in_documented_order() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );

        assert_eq!(
            shell.ops(),
            &[
                StackOp::LayerAssigned(DESKTOP, StackLayer::Bottom),
                StackOp::DesktopActive(false),
                StackOp::Raised(DESKTOP),
                StackOp::Restacked(APPLET_A),
                StackOp::Restacked(APPLET_C),
                StackOp::Restacked(DIALOG),
            ]
        );
    }

    #[test]
    fn second_pass_with_unchanged_inputs_writes_nothing() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        let writes = display.write_count();
        let deletes = display.delete_count();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        assert_eq!(display.write_count(), writes, "no redundant stores");
        assert_eq!(display.delete_count(), deletes, "no redundant deletes");
        assert_eq!(coordinator.passes(), 2);
    }

    #[test]
    fn externally_deleted_mark_is_republished() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        display.drop_property(APPLET_A, Attribute::OnCurrentDesktop.wire_name());
        let writes = display.write_count();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        assert!(read_flag(&mut display, APPLET_A, Attribute::OnCurrentDesktop));
        assert_eq!(display.write_count(), writes + 1, "exactly the lost mark");
    }

    #[test]
    fn stale_mark_on_other_view_is_cleared() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        // A peer (or an earlier view switch) left a stale mark behind.
        display.poke_property(
            APPLET_B,
            Attribute::OnCurrentDesktop.wire_name(),
            PropertyValue::flag(true),
        );

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        assert!(!read_flag(&mut display, APPLET_B, Attribute::OnCurrentDesktop));
        assert!(
            display
                .property(APPLET_B, Attribute::OnCurrentDesktop.wire_name())
                .is_none(),
            "mark deleted, not zeroed"
        );
    }

    #[test]
    fn desktop_layer_follows_render_state_freshly() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        render.set_desktop_layer_required(true);
        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        assert_eq!(
            shell.ops()[..2],
            [
                StackOp::LayerAssigned(DESKTOP, StackLayer::Mid),
                StackOp::DesktopActive(true),
            ]
        );

        // The flip must be picked up on the very next pass.
        shell.clear_ops();
        render.set_desktop_layer_required(false);
        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        assert_eq!(
            shell.ops()[..2],
            [
                StackOp::LayerAssigned(DESKTOP, StackLayer::Bottom),
                StackOp::DesktopActive(false),
            ]
        );
    }

    #[test]
    fn rank_orders_active_applets_stably() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = FakeShell::with_desktop(DESKTOP);
        shell.set_active_view(ViewId(1));
        // Window-manager order: A, B, C; ranks say B first, then A/C tied.
        shell.add_applet(APPLET_A, Some(ViewId(1)), 5);
        shell.add_applet(APPLET_B, Some(ViewId(1)), 1);
        shell.add_applet(APPLET_C, Some(ViewId(1)), 5);
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );

        let restacks: Vec<WindowId> = shell
            .ops()
            .iter()
            .filter_map(|op| match op {
                StackOp::Restacked(window) => Some(*window),
                _ => None,
            })
            .collect();
        assert_eq!(restacks, vec![APPLET_B, APPLET_A, APPLET_C]);
    }

    #[test]
    fn view_switch_moves_the_marks() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );
        shell.set_active_view(ViewId(2));
        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );

        assert!(!read_flag(&mut display, APPLET_A, Attribute::OnCurrentDesktop));
        assert!(read_flag(&mut display, APPLET_B, Attribute::OnCurrentDesktop));
        assert!(
            read_flag(&mut display, APPLET_C, Attribute::OnCurrentDesktop),
            "all-views applet stays marked across switches"
        );
    }

    #[test]
    fn missing_desktop_window_is_a_quiet_pass() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = FakeShell::new();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );

        assert!(shell.ops().is_empty(), "no stacking requests");
        assert_eq!(display.write_count(), 0);
        assert_eq!(coordinator.passes(), 1, "the pass still counts");
    }

    #[test]
    fn property_failure_does_not_abort_the_pass() {
        let mut display = FakeDisplay::new_landscape();
        let mut shell = shell_with_two_views();
        let mut render = FakeRenderStage::new();
        let mut coordinator = StackCoordinator::new();

        display.fail_next(FailPoint::Store);
        coordinator.restack_desktop_layer(
            &mut display,
            &mut shell,
            &mut render,
            &mut Tracer::none(),
        );

        // The first mark was lost, the rest of the pass went through.
        assert!(read_flag(&mut display, APPLET_C, Attribute::OnCurrentDesktop));
        let restacks = shell
            .ops()
            .iter()
            .filter(|op| matches!(op, StackOp::Restacked(_)))
            .count();
        assert_eq!(restacks, 3, "both applets and the dialog were restacked");
    }
}
