// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Facades over the shell subsystems the coordinators drive but do not own.
//!
//! The window manager, the render/presentation layer, and the input pipeline
//! all live outside this crate. The coordinators only ever touch them through
//! these three traits, so `gimbal_harness` can stand in scripted fakes and
//! the algorithms stay testable without a compositor.
//!
//! All methods take `&mut self`: the real implementations mutate server or
//! scene state, and the fakes record every call.

use alloc::vec::Vec;

use crate::display::{Orientation, WindowId};
use crate::stacking::{StackEntry, StackLayer, ViewId};

/// Window-manager state and stacking requests.
pub trait ShellWindowing {
    /// The desktop background window, once the window manager has mapped it.
    fn desktop_window(&mut self) -> Option<WindowId>;

    /// The currently active virtual-desktop view.
    fn active_view(&mut self) -> ViewId;

    /// Every desktop-layer applet, in window-manager stacking order,
    /// whichever view it belongs to.
    fn applets(&mut self) -> Vec<StackEntry>;

    /// Transient children of `window` that are not applets, in
    /// window-manager order.
    fn transient_children(&mut self, window: WindowId) -> Vec<WindowId>;

    /// Moves `window` to the top of its current stacking layer.
    fn raise_within_layer(&mut self, window: WindowId);

    /// Re-issues the stacking request for `window` at its computed position.
    fn restack_window(&mut self, window: WindowId);

    /// Moves `window` into `layer`.
    fn assign_layer(&mut self, window: WindowId, layer: StackLayer);

    /// Sets the global "desktop is the active surface" flag other shell
    /// components consult.
    fn set_desktop_active(&mut self, active: bool);
}

/// The render/presentation state the stacking and rotation logic reacts to.
pub trait RenderStage {
    /// Whether the current visual state needs the desktop layer visible
    /// underneath other content. Consulted fresh on every stacking pass;
    /// implementations must not require callers to cache it.
    fn desktop_layer_required(&mut self) -> bool;

    /// Blocks until all submitted drawing has completed. Called before the
    /// display grab so no half-finished frame is scanned out mid-rotation.
    fn finish_pending_draws(&mut self);

    /// Tells the presentation layer the screen geometry flipped and the
    /// input viewport must follow.
    fn flip_input_viewport(&mut self);
}

/// The input subsystem, which must re-derive pointer axes after a rotation.
pub trait InputPipeline {
    /// Remaps device axes for `orientation`.
    fn remap_axes(&mut self, orientation: Orientation);
}
