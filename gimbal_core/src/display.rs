// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-server handles, rotation state, and the connection traits.
//!
//! Everything the engine knows about the display server flows through the two
//! traits at the bottom of this module. [`PropertyBus`] is the shared
//! per-window property table, used here as a best-effort cross-process
//! signaling bus. [`DisplayControl`] adds the output/CRTC configuration
//! surface needed to physically rotate the screen. `gimbal_backend_x11`
//! implements both over a live connection; `gimbal_harness` implements them
//! over scripted in-memory state so the engine is testable in isolation.
//!
//! Each trait method corresponds to one request against the server. Apart
//! from [`root_window`](DisplayControl::root_window) and
//! [`screen_size`](DisplayControl::screen_size) (served from connection-local
//! state), every call is a synchronous round-trip, which is why the rotation
//! critical section keeps its request count to a minimum.

use alloc::vec::Vec;
use core::fmt;

use crate::property::{PropertyExpectation, PropertyValue};

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Identifies a window on the display server.
///
/// The server assigns these; core code passes them through without
/// interpreting the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WindowId(pub u32);

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({:#x})", self.0)
    }
}

/// Identifies a display controller pipe (CRTC), the hardware unit whose
/// rotation and mode are changed to rotate the screen.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CrtcId(pub u32);

impl fmt::Debug for CrtcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrtcId({})", self.0)
    }
}

/// Identifies a physical display connector, associated with zero or one CRTC.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutputId(pub u32);

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self.0)
    }
}

/// Identifies a display mode (resolution + timings) on the server.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ModeId(pub u32);

impl ModeId {
    /// The "no mode" sentinel; applying it disables the CRTC.
    pub const NONE: Self = Self(0);

    /// Whether this is the [`NONE`](Self::NONE) sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ModeId(NONE)")
        } else {
            write!(f, "ModeId({})", self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Orientation & rotation
// ---------------------------------------------------------------------------

/// Logical orientation of the user-visible frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Width exceeds height.
    Landscape,
    /// Height exceeds width.
    Portrait,
}

impl Orientation {
    /// Whether this is [`Portrait`](Self::Portrait).
    #[must_use]
    pub const fn is_portrait(self) -> bool {
        matches!(self, Self::Portrait)
    }

    /// The other orientation.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Landscape => Self::Portrait,
            Self::Portrait => Self::Landscape,
        }
    }
}

/// CRTC rotation, counter-clockwise from the panel's native scan-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    /// Native scan-out orientation.
    #[default]
    R0,
    /// Quarter turn.
    R90,
    /// Half turn.
    R180,
    /// Three-quarter turn.
    R270,
}

impl Rotation {
    /// The wire bit for this rotation in a supported-rotations bitmask.
    #[must_use]
    pub const fn bit(self) -> u16 {
        match self {
            Self::R0 => 1,
            Self::R90 => 1 << 1,
            Self::R180 => 1 << 2,
            Self::R270 => 1 << 3,
        }
    }

    /// Decodes a single wire bit; `None` if it is not exactly one rotation.
    #[must_use]
    pub const fn from_bit(bit: u16) -> Option<Self> {
        match bit {
            1 => Some(Self::R0),
            2 => Some(Self::R90),
            4 => Some(Self::R180),
            8 => Some(Self::R270),
            _ => None,
        }
    }

    /// Whether this rotation swaps the frame's width and height.
    #[must_use]
    pub const fn is_sideways(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }
}

/// A set of rotations, encoded as the wire bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RotationSet(u16);

impl RotationSet {
    /// No rotations.
    pub const EMPTY: Self = Self(0);

    /// All four rotations.
    pub const ALL: Self = Self(0b1111);

    /// Builds a set from raw wire bits; unknown bits are kept verbatim.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// The raw wire bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether the set contains `rotation`.
    #[must_use]
    pub const fn contains(self, rotation: Rotation) -> bool {
        self.0 & rotation.bit() != 0
    }

    /// The set with `rotation` added.
    #[must_use]
    pub const fn with(self, rotation: Rotation) -> Self {
        Self(self.0 | rotation.bit())
    }
}

impl From<Rotation> for RotationSet {
    fn from(rotation: Rotation) -> Self {
        Self(rotation.bit())
    }
}

impl fmt::Debug for RotationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RotationSet(")?;
        let mut first = true;
        for rotation in [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270] {
            if self.contains(rotation) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{rotation:?}")?;
                first = false;
            }
        }
        if first {
            write!(f, "empty")?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Screen geometry
// ---------------------------------------------------------------------------

/// Virtual screen dimensions, in pixels and millimeters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Physical width in millimeters.
    pub mm_width: u32,
    /// Physical height in millimeters.
    pub mm_height: u32,
}

impl ScreenSize {
    /// Creates a screen size.
    #[must_use]
    pub const fn new(width: u16, height: u16, mm_width: u32, mm_height: u32) -> Self {
        Self {
            width,
            height,
            mm_width,
            mm_height,
        }
    }

    /// Whether the size is portrait (width strictly less than height).
    #[must_use]
    pub const fn is_portrait(self) -> bool {
        self.width < self.height
    }

    /// The same physical size with both dimension pairs ordered short-edge
    /// first (the portrait arrangement).
    #[must_use]
    pub const fn portraitized(self) -> Self {
        let (width, height) = if self.width <= self.height {
            (self.width, self.height)
        } else {
            (self.height, self.width)
        };
        let (mm_width, mm_height) = if self.mm_width <= self.mm_height {
            (self.mm_width, self.mm_height)
        } else {
            (self.mm_height, self.mm_width)
        };
        Self {
            width,
            height,
            mm_width,
            mm_height,
        }
    }

    /// The same physical size with both dimension pairs ordered long-edge
    /// first (the landscape arrangement).
    #[must_use]
    pub const fn landscapized(self) -> Self {
        let portrait = self.portraitized();
        Self {
            width: portrait.height,
            height: portrait.width,
            mm_width: portrait.mm_height,
            mm_height: portrait.mm_width,
        }
    }
}

// ---------------------------------------------------------------------------
// CRTC state
// ---------------------------------------------------------------------------

/// The CRTCs and outputs the server currently exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScreenResources {
    /// All CRTCs, in server order.
    pub crtcs: Vec<CrtcId>,
    /// All outputs, in server order.
    pub outputs: Vec<OutputId>,
}

/// Snapshot of a CRTC's configuration as last read from the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrtcState {
    /// Horizontal position within the virtual screen.
    pub x: i16,
    /// Vertical position within the virtual screen.
    pub y: i16,
    /// Scan-out width in pixels, after rotation.
    pub width: u16,
    /// Scan-out height in pixels, after rotation.
    pub height: u16,
    /// The active mode; [`ModeId::NONE`] when the CRTC is disabled.
    pub mode: ModeId,
    /// The active rotation.
    pub rotation: Rotation,
    /// Rotations the hardware supports.
    pub supported: RotationSet,
    /// Outputs driven by this CRTC.
    pub outputs: Vec<OutputId>,
    /// Configuration token from this read; passed back verbatim when the
    /// CRTC is reconfigured so the server can reject stale requests.
    pub timestamp: u32,
}

impl CrtcState {
    /// A configuration that reproduces this snapshot with a different
    /// rotation (position, mode, and outputs unchanged).
    #[must_use]
    pub fn config_with_rotation(&self, rotation: Rotation) -> CrtcConfig {
        CrtcConfig {
            x: self.x,
            y: self.y,
            mode: self.mode,
            rotation,
            outputs: self.outputs.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// A CRTC configuration to apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrtcConfig {
    /// Horizontal position within the virtual screen.
    pub x: i16,
    /// Vertical position within the virtual screen.
    pub y: i16,
    /// Mode to activate.
    pub mode: ModeId,
    /// Rotation to apply.
    pub rotation: Rotation,
    /// Outputs to drive.
    pub outputs: Vec<OutputId>,
    /// Configuration token from the state read this config derives from.
    pub timestamp: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a display-server operation failed.
///
/// The coordinators recover every variant locally: failures surface to their
/// callers as `false`/no-op results, with the detail reported through
/// [`trace`](crate::trace) events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayError {
    /// The server lacks a required extension or extension version.
    /// Permanent until the next capability probe.
    CapabilityUnavailable,
    /// A CRTC, output, or property was missing; often transient.
    ResourceNotFound,
    /// The requested configuration is outside what the hardware reports as
    /// supported.
    UnsupportedConfiguration,
    /// The round-trip to the server failed.
    CommunicationFailure,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::CapabilityUnavailable => "required display-server capability unavailable",
            Self::ResourceNotFound => "display resource not found",
            Self::UnsupportedConfiguration => "configuration not supported by hardware",
            Self::CommunicationFailure => "display-server communication failure",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for DisplayError {}

// ---------------------------------------------------------------------------
// Connection traits
// ---------------------------------------------------------------------------

/// The shared per-window property table.
///
/// Properties are named, typed byte payloads attached to a window, visible to
/// every process with display-server access. The shell uses them as a weak,
/// best-effort message bus: presence with value 1 means "in effect", absence
/// means "false/unset", and no reader may assume it is the only writer.
///
/// [`fetch`](Self::fetch) distinguishes absence (`Ok(None)`, which includes a
/// present property that fails the expectation) from transport failure
/// (`Err`). Most protocol readers should not care and use
/// [`fetch_tolerant`](Self::fetch_tolerant): the target window may be
/// destroyed at any moment by its owning process, and a read racing that
/// destruction must quietly report absence rather than surface a server
/// error.
pub trait PropertyBus {
    /// Reads a property, validating it against `expectation`.
    ///
    /// Returns `Ok(None)` when the property is absent or fails validation,
    /// and `Err` only for transport-level failures.
    fn fetch(
        &mut self,
        window: WindowId,
        attribute: &str,
        expectation: PropertyExpectation,
    ) -> Result<Option<PropertyValue>, DisplayError>;

    /// Replaces a property with `value`.
    fn store(
        &mut self,
        window: WindowId,
        attribute: &str,
        value: &PropertyValue,
    ) -> Result<(), DisplayError>;

    /// Deletes a property. Deleting an absent property succeeds.
    fn delete(&mut self, window: WindowId, attribute: &str) -> Result<(), DisplayError>;

    /// Reads a property, folding every failure mode into absence.
    fn fetch_tolerant(
        &mut self,
        window: WindowId,
        attribute: &str,
        expectation: PropertyExpectation,
    ) -> Option<PropertyValue> {
        self.fetch(window, attribute, expectation).ok().flatten()
    }
}

/// Output/CRTC configuration surface of the display server.
///
/// This is the hardware half of the connection. The rotation sequence in
/// [`OrientationController`](crate::orientation::OrientationController) drives
/// it as:
///
/// ```text
/// sync();
/// grab();                                   // exclusive server access
///     store(root, suppress-flag, 1);
///     disable_crtc(crtc, state.timestamp);
///     set_screen_size(target);
///     apply_crtc(crtc, &config);
/// ungrab();
/// sync();                                   // required; avoids a lock-up
/// ```
///
/// Implementations report hardware refusals from
/// [`apply_crtc`](Self::apply_crtc) as
/// [`DisplayError::UnsupportedConfiguration`] and transport problems
/// everywhere as [`DisplayError::CommunicationFailure`].
pub trait DisplayControl: PropertyBus {
    /// The root window of the screen this connection manages.
    fn root_window(&self) -> WindowId;

    /// Current virtual screen dimensions as known to the connection.
    fn screen_size(&self) -> Result<ScreenSize, DisplayError>;

    /// Whether the server supports CRTC rotation (the resize-and-rotate
    /// extension at version 1.3 or newer).
    fn rotation_capable(&mut self) -> Result<bool, DisplayError>;

    /// Fetches the current CRTC and output lists.
    fn screen_resources(&mut self) -> Result<ScreenResources, DisplayError>;

    /// The CRTC currently driving `output`, if any.
    fn output_crtc(&mut self, output: OutputId) -> Result<Option<CrtcId>, DisplayError>;

    /// Whether `output` declares the built-in-panel connector type.
    ///
    /// Reads a vendor/driver-published connector-type attribute; absence of
    /// the attribute is `false`, not an error.
    fn output_is_builtin_panel(&mut self, output: OutputId) -> Result<bool, DisplayError>;

    /// The output the server declares primary, if any.
    fn primary_output(&mut self) -> Result<Option<OutputId>, DisplayError>;

    /// Reads a CRTC's current configuration.
    fn crtc_state(&mut self, crtc: CrtcId) -> Result<CrtcState, DisplayError>;

    /// Disables `crtc` (no mode, no outputs) so the virtual screen can be
    /// resized underneath it. `timestamp` is the token from the state read
    /// this decision was based on.
    fn disable_crtc(&mut self, crtc: CrtcId, timestamp: u32) -> Result<(), DisplayError>;

    /// Resizes the virtual screen.
    fn set_screen_size(&mut self, size: ScreenSize) -> Result<(), DisplayError>;

    /// Applies `config` to `crtc`, re-enabling it if it was disabled.
    fn apply_crtc(&mut self, crtc: CrtcId, config: &CrtcConfig) -> Result<(), DisplayError>;

    /// Takes exclusive server access. Other clients' requests queue until
    /// [`ungrab`](Self::ungrab).
    fn grab(&mut self) -> Result<(), DisplayError>;

    /// Releases exclusive server access.
    fn ungrab(&mut self) -> Result<(), DisplayError>;

    /// Completes a full round-trip, guaranteeing every previous request has
    /// been processed by the server.
    fn sync(&mut self) -> Result<(), DisplayError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
