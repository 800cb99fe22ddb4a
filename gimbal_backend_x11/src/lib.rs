// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! X11 backend for gimbal.
//!
//! [`X11Display`] drives a live X server through [`x11rb`] and implements the
//! connection traits the coordinators in [`gimbal_core`] are written against:
//!
//! - [`PropertyBus`] over window properties (`InternAtom`, `GetProperty`,
//!   `ChangeProperty`, `DeleteProperty`)
//! - [`DisplayControl`] over RandR 1.3 (`GetScreenResources`, `GetCrtcInfo`,
//!   `SetCrtcConfig`, `SetScreenSize`) plus the core server grab and
//!   round-trip requests
//!
//! The crate is a request/reply surface only. It owns no event loop and
//! handles no events; hosts keep their own connection for that and hand this
//! one to the coordinators.

mod connection;
mod convert;

pub use connection::X11Display;
pub use gimbal_core::display::{DisplayControl, PropertyBus};
