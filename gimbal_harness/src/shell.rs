// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window-manager, render-stage, and input fakes that log what they are
//! asked to do.

use alloc::vec::Vec;

use gimbal_core::display::{Orientation, WindowId};
use gimbal_core::shell::{InputPipeline, RenderStage, ShellWindowing};
use gimbal_core::stacking::{StackEntry, StackLayer, ViewId};

// ---------------------------------------------------------------------------
// FakeShell
// ---------------------------------------------------------------------------

/// One stacking request as received by [`FakeShell`], in call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackOp {
    /// `assign_layer` placed a window in a stacking layer.
    LayerAssigned(WindowId, StackLayer),
    /// `set_desktop_active` toggled desktop interactivity.
    DesktopActive(bool),
    /// `raise_within_layer` raised a window to the top of its layer.
    Raised(WindowId),
    /// `restack_window` re-inserted a window at its computed position.
    Restacked(WindowId),
}

/// A scripted window-manager view of the desktop layer.
///
/// Holds the desktop window, the active view, the applet list, and the
/// desktop's transient children; every stacking request is appended to an
/// ordered [`StackOp`] log for assertion.
#[derive(Debug, Default)]
pub struct FakeShell {
    desktop: Option<WindowId>,
    active_view: ViewId,
    applets: Vec<StackEntry>,
    transients: Vec<WindowId>,
    ops: Vec<StackOp>,
}

impl FakeShell {
    /// A shell with no desktop window mapped yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A shell whose desktop window is already mapped.
    #[must_use]
    pub fn with_desktop(desktop: WindowId) -> Self {
        Self {
            desktop: Some(desktop),
            ..Self::default()
        }
    }

    /// Switches the active view.
    pub fn set_active_view(&mut self, view: ViewId) {
        self.active_view = view;
    }

    /// Adds an applet window pinned to `view` (`None` shows on every view)
    /// with the given stacking rank.
    pub fn add_applet(&mut self, window: WindowId, view: Option<ViewId>, rank: i32) {
        self.applets.push(StackEntry { window, view, rank });
    }

    /// Adds a transient child of the desktop window.
    pub fn add_transient(&mut self, window: WindowId) {
        self.transients.push(window);
    }

    /// The stacking requests received so far, in call order.
    #[must_use]
    pub fn ops(&self) -> &[StackOp] {
        &self.ops
    }

    /// Empties the request log, keeping the scripted windows.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl ShellWindowing for FakeShell {
    fn desktop_window(&mut self) -> Option<WindowId> {
        self.desktop
    }

    fn active_view(&mut self) -> ViewId {
        self.active_view
    }

    fn applets(&mut self) -> Vec<StackEntry> {
        self.applets.clone()
    }

    fn transient_children(&mut self, window: WindowId) -> Vec<WindowId> {
        if self.desktop == Some(window) {
            self.transients.clone()
        } else {
            Vec::new()
        }
    }

    fn raise_within_layer(&mut self, window: WindowId) {
        self.ops.push(StackOp::Raised(window));
    }

    fn restack_window(&mut self, window: WindowId) {
        self.ops.push(StackOp::Restacked(window));
    }

    fn assign_layer(&mut self, window: WindowId, layer: StackLayer) {
        self.ops.push(StackOp::LayerAssigned(window, layer));
    }

    fn set_desktop_active(&mut self, active: bool) {
        self.ops.push(StackOp::DesktopActive(active));
    }
}

// ---------------------------------------------------------------------------
// FakeRenderStage
// ---------------------------------------------------------------------------

/// A render stage that reports a scripted desktop-layer answer and counts
/// pipeline barriers.
#[derive(Debug, Default)]
pub struct FakeRenderStage {
    desktop_layer_required: bool,
    finish_count: u32,
    flip_count: u32,
}

impl FakeRenderStage {
    /// A render stage that does not need the desktop raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the answer [`RenderStage::desktop_layer_required`] returns.
    pub fn set_desktop_layer_required(&mut self, required: bool) {
        self.desktop_layer_required = required;
    }

    /// How many times the pipeline was drained.
    #[must_use]
    pub fn finish_count(&self) -> u32 {
        self.finish_count
    }

    /// How many times the input viewport was flipped.
    #[must_use]
    pub fn flip_count(&self) -> u32 {
        self.flip_count
    }
}

impl RenderStage for FakeRenderStage {
    fn desktop_layer_required(&mut self) -> bool {
        self.desktop_layer_required
    }

    fn finish_pending_draws(&mut self) {
        self.finish_count += 1;
    }

    fn flip_input_viewport(&mut self) {
        self.flip_count += 1;
    }
}

// ---------------------------------------------------------------------------
// FakeInput
// ---------------------------------------------------------------------------

/// An input pipeline that records every axis remap it is asked for.
#[derive(Debug, Default)]
pub struct FakeInput {
    remaps: Vec<Orientation>,
}

impl FakeInput {
    /// An input pipeline with an empty remap log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The orientations remapped to, in call order.
    #[must_use]
    pub fn remaps(&self) -> &[Orientation] {
        &self.remaps
    }
}

impl InputPipeline for FakeInput {
    fn remap_axes(&mut self, orientation: Orientation) {
        self.remaps.push(orientation);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_record_in_call_order() {
        let mut shell = FakeShell::with_desktop(WindowId(0x10));
        shell.assign_layer(WindowId(0x10), StackLayer::Bottom);
        shell.raise_within_layer(WindowId(0x10));
        shell.restack_window(WindowId(0x21));

        assert_eq!(
            shell.ops(),
            [
                StackOp::LayerAssigned(WindowId(0x10), StackLayer::Bottom),
                StackOp::Raised(WindowId(0x10)),
                StackOp::Restacked(WindowId(0x21)),
            ]
        );

        shell.clear_ops();
        assert!(shell.ops().is_empty());
    }

    #[test]
    fn transients_attach_to_the_desktop_only() {
        let mut shell = FakeShell::with_desktop(WindowId(0x10));
        shell.add_transient(WindowId(0x31));

        assert_eq!(shell.transient_children(WindowId(0x10)), [WindowId(0x31)]);
        assert!(shell.transient_children(WindowId(0x99)).is_empty());
    }

    #[test]
    fn input_records_each_remap() {
        let mut input = FakeInput::new();
        input.remap_axes(Orientation::Portrait);
        input.remap_axes(Orientation::Landscape);

        assert_eq!(
            input.remaps(),
            [Orientation::Portrait, Orientation::Landscape]
        );
    }
}
