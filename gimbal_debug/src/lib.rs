// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON export for gimbal trace diagnostics.
//!
//! This crate provides [`TraceSink`](gimbal_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`json::JsonLinesSink`] — one JSON object per event, for scripted
//!   analysis of rotation and stacking sessions.

pub mod json;
pub mod pretty;
