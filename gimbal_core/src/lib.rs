// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Orientation state machine, property signaling, and desktop stacking for a
//! touch shell.
//!
//! `gimbal_core` is the display-server-agnostic half of a compositing shell's
//! orientation and stacking logic. It is `no_std` compatible (with `alloc`)
//! and talks to the display server exclusively through the traits in
//! [`display`], so the whole engine runs unmodified against the in-memory
//! fakes in `gimbal_harness`.
//!
//! # Architecture
//!
//! Everything executes on the one control thread that owns the display-server
//! connection. "Concurrency" means other processes racing this one through
//! the shared per-window property table, which doubles as a best-effort
//! signaling bus:
//!
//! ```text
//!   embedder event loop
//!       │ rotate / restack / root-configured
//!       ▼
//!   OrientationController ──┐
//!   StackCoordinator ───────┤──► PropertyBus + DisplayControl ──► server
//!       │                   │         (gimbal_backend_x11, fakes)
//!       ▼                   │
//!   ShellWindowing / RenderStage / InputPipeline (embedder facades)
//! ```
//!
//! **[`display`]** — handle newtypes, rotation/size types, the
//! [`PropertyBus`](display::PropertyBus) and
//! [`DisplayControl`](display::DisplayControl) traits, and the error taxonomy.
//!
//! **[`property`]** — the shared-property protocol: attribute table, typed
//! values and expectations, tolerant reads, and idempotent write helpers.
//!
//! **[`orientation`]** — the rotation state machine:
//! [`OrientationController`](orientation::OrientationController) sequences
//! grab → suppress → disable → resize → rotate → ungrab against real
//! hardware, with restoration on failure.
//!
//! **[`stacking`]** — [`StackCoordinator`](stacking::StackCoordinator)
//! recomputes desktop-layer ordering per virtual-desktop view and maintains
//! the on-current-desktop marks.
//!
//! **[`shell`]** — the facades an embedding window manager provides:
//! windowing, render state, and input-device remapping.
//!
//! **[`geometry`]** — landscape/portrait rectangle mapping and transition
//! blending.
//!
//! **[`keyframe`]** — piecewise-linear transition curves parsed from
//! comma-separated specs.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! instrumenting rotations and stacking passes, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Compiles in the `Tracer` dispatch bodies;
//!   without it every emit site is a no-op.
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-property
//!   operation events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod display;
pub mod geometry;
pub mod keyframe;
pub mod orientation;
pub mod property;
pub mod shell;
pub mod stacking;
pub mod trace;
