// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure conversions between RandR/core-protocol wire values and the
//! [`gimbal_core`] display types.

use gimbal_core::display::{DisplayError, Rotation, RotationSet};
use gimbal_core::property::{PropertyFormat, PropertyKind};
use x11rb::protocol::randr;
use x11rb::protocol::xproto::{Atom, AtomEnum};

/// The bits of a RandR rotation mask that name rotations. The remaining bits
/// are reflections, which are outside the model and stripped.
const ROTATION_BITS: u16 = 0x000f;

/// Encodes a rotation as its RandR wire bit.
pub(crate) fn rotation_to_wire(rotation: Rotation) -> u16 {
    rotation.bit()
}

/// Decodes a RandR rotation value; `None` when the rotation bits do not name
/// exactly one rotation.
pub(crate) fn rotation_from_wire(wire: u16) -> Option<Rotation> {
    Rotation::from_bit(wire & ROTATION_BITS)
}

/// Decodes a RandR supported-rotations mask, dropping reflection bits.
pub(crate) fn rotation_set_from_wire(wire: u16) -> RotationSet {
    RotationSet::from_bits(wire & ROTATION_BITS)
}

/// Whether a negotiated RandR version carries the CRTC configuration and
/// primary-output requests the backend issues.
pub(crate) fn version_supports_rotation(major: u32, minor: u32) -> bool {
    major > 1 || (major == 1 && minor >= 3)
}

/// Maps a `SetCrtcConfig` status byte onto the error taxonomy. Stale
/// timestamps and hardware refusals both come back as non-success statuses.
pub(crate) fn config_status(status: u8) -> Result<(), DisplayError> {
    if status == u8::from(randr::SetConfig::SUCCESS) {
        Ok(())
    } else {
        Err(DisplayError::UnsupportedConfiguration)
    }
}

/// Decodes a property format byte; anything but 8/16/32 reads as absence.
pub(crate) fn format_from_wire(format: u8) -> Option<PropertyFormat> {
    match format {
        8 => Some(PropertyFormat::Format8),
        16 => Some(PropertyFormat::Format16),
        32 => Some(PropertyFormat::Format32),
        _ => None,
    }
}

/// Maps a property's type atom onto a [`PropertyKind`].
pub(crate) fn kind_from_atom(type_: Atom, utf8_string: Atom) -> PropertyKind {
    if type_ == u32::from(AtomEnum::CARDINAL) {
        PropertyKind::Cardinal
    } else if type_ == u32::from(AtomEnum::ATOM) {
        PropertyKind::Atom
    } else if type_ == u32::from(AtomEnum::STRING) || type_ == utf8_string {
        PropertyKind::Text
    } else {
        PropertyKind::Other
    }
}

/// The type atom published for a stored [`PropertyKind`].
///
/// Untyped payloads go out as cardinals; the protocol writers never produce
/// one, so the arm exists only to keep the mapping total.
pub(crate) fn atom_for_kind(kind: PropertyKind, utf8_string: Atom) -> Atom {
    match kind {
        PropertyKind::Cardinal | PropertyKind::Other => u32::from(AtomEnum::CARDINAL),
        PropertyKind::Atom => u32::from(AtomEnum::ATOM),
        PropertyKind::Text => utf8_string,
    }
}

/// Unpacks native-order 16-bit items; trailing bytes that do not fill an item
/// are dropped.
pub(crate) fn words_from_bytes(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect()
}

/// Unpacks native-order 32-bit items; trailing bytes that do not fill an item
/// are dropped.
pub(crate) fn longs_from_bytes(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|quad| u32::from_ne_bytes([quad[0], quad[1], quad[2], quad[3]]))
        .collect()
}

/// Whether an output's connector-type property payload names `expected`.
pub(crate) fn output_connector_is(data: &[u8], format: u8, expected: Atom) -> bool {
    format == 32 && longs_from_bytes(data).first() == Some(&expected)
}
