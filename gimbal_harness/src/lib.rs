// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted fakes for every seam the Gimbal coordinators touch.
//!
//! The coordinators in `gimbal_core` talk to the world through traits:
//! [`DisplayControl`](gimbal_core::display::DisplayControl) for the display
//! server, [`ShellWindowing`](gimbal_core::shell::ShellWindowing) and
//! [`RenderStage`](gimbal_core::shell::RenderStage) for the window-manager
//! side, [`InputPipeline`](gimbal_core::shell::InputPipeline) for touch
//! coordinates. This crate provides in-memory implementations of all of them
//! so tests and demos can run complete rotation and stacking sessions with no
//! display server anywhere.
//!
//! The fakes do two jobs:
//!
//! - **Scripting.** [`FakeDisplay`] models a server with one screen, a
//!   configurable CRTC/output topology, and a real property table.
//!   [`FailPoint`] arms one-shot failures so recovery paths can be driven
//!   deterministically.
//! - **Observation.** Every fake counts or logs what was asked of it:
//!   property round-trips, grab nesting, configuration writes, stacking
//!   requests in call order, input remaps.
//!
//! [`CollectingSink`] rounds this out with a
//! [`TraceSink`](gimbal_core::trace::TraceSink) that renders events to plain
//! strings.

#![no_std]

extern crate alloc;

mod display;
mod shell;
mod sink;

pub use display::{FailPoint, FakeDisplay};
pub use shell::{FakeInput, FakeRenderStage, FakeShell, StackOp};
pub use sink::CollectingSink;
