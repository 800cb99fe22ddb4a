// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed values and helpers for the shared-property signaling protocol.
//!
//! The display server attaches named, typed byte arrays to windows; every
//! process can read, write, and delete them. The shell layers a small
//! protocol on top: [`Attribute`] is the closed set of attribute names this
//! crate speaks, [`PropertyValue`] carries a decoded payload, and
//! [`PropertyExpectation`] is the shape a reader demands before trusting one.
//!
//! Two rules run through everything here. Absence means "false/unset", so
//! readers fold missing and malformed properties into their default instead
//! of failing. And no writer may assume it is the only one, so the
//! `*_if_changed` helpers read before writing and skip redundant round-trips
//! without ever caching presence across calls.

use alloc::string::String;
use alloc::vec::Vec;

use crate::display::{DisplayError, PropertyBus, WindowId};

// ---------------------------------------------------------------------------
// Value model
// ---------------------------------------------------------------------------

/// The type tag of a property, as published alongside its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Unsigned integer items.
    Cardinal,
    /// Interned-name items.
    Atom,
    /// UTF-8 text.
    Text,
    /// Anything else; readers that accept this must work from raw bytes.
    Other,
}

/// The item width of a property payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyFormat {
    /// 8-bit items.
    Format8,
    /// 16-bit items.
    Format16,
    /// 32-bit items.
    Format32,
}

impl PropertyFormat {
    /// Item width in bits (the wire encoding of the format).
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Format8 => 8,
            Self::Format16 => 16,
            Self::Format32 => 32,
        }
    }

    /// Item width in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Format8 => 1,
            Self::Format16 => 2,
            Self::Format32 => 4,
        }
    }
}

/// A decoded property payload: type tag, item width, and packed items in
/// native byte order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyValue {
    /// Type tag.
    pub kind: PropertyKind,
    /// Item width.
    pub format: PropertyFormat,
    /// Packed items, `format.bytes()` each.
    pub data: Vec<u8>,
}

impl PropertyValue {
    /// A 32-bit cardinal list.
    #[must_use]
    pub fn cardinals(items: &[u32]) -> Self {
        let mut data = Vec::with_capacity(items.len() * 4);
        for item in items {
            data.extend_from_slice(&item.to_ne_bytes());
        }
        Self {
            kind: PropertyKind::Cardinal,
            format: PropertyFormat::Format32,
            data,
        }
    }

    /// A single-item boolean flag (`1` or `0` as one cardinal).
    #[must_use]
    pub fn flag(value: bool) -> Self {
        Self::cardinals(&[u32::from(value)])
    }

    /// UTF-8 text.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self {
            kind: PropertyKind::Text,
            format: PropertyFormat::Format8,
            data: text.as_bytes().to_vec(),
        }
    }

    /// A payload from raw parts, for values this module has no constructor
    /// for.
    #[must_use]
    pub const fn from_parts(kind: PropertyKind, format: PropertyFormat, data: Vec<u8>) -> Self {
        Self { kind, format, data }
    }

    /// The number of items in the payload (truncating any ragged tail).
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.data.len() / self.format.bytes()
    }

    /// The first payload byte, if any.
    #[must_use]
    pub fn first_byte(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Decodes the payload as 32-bit items.
    ///
    /// `None` unless the format is 32-bit and the payload length is a
    /// multiple of four; the type tag is not consulted (atoms decode too).
    #[must_use]
    pub fn to_cardinals(&self) -> Option<Vec<u32>> {
        if self.format != PropertyFormat::Format32 || !self.data.len().is_multiple_of(4) {
            return None;
        }
        let items = self
            .data
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(items)
    }

    /// Whether this payload reads as a set boolean flag: a 32-bit first item
    /// with a nonzero value.
    #[must_use]
    pub fn is_truthy_flag(&self) -> bool {
        self.to_cardinals()
            .and_then(|items| items.first().copied())
            .is_some_and(|item| item != 0)
    }
}

/// The shape a reader demands of a property before trusting it.
///
/// `None` fields are wildcards. A value that fails the expectation is treated
/// exactly like an absent one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PropertyExpectation {
    /// Required type tag, if any.
    pub kind: Option<PropertyKind>,
    /// Required item width, if any.
    pub format: Option<PropertyFormat>,
    /// Required item count, if any.
    pub count: Option<usize>,
}

impl PropertyExpectation {
    /// Accepts any value.
    pub const ANY: Self = Self {
        kind: None,
        format: None,
        count: None,
    };

    /// Exactly `count` 32-bit cardinals.
    #[must_use]
    pub const fn cardinal(count: usize) -> Self {
        Self {
            kind: Some(PropertyKind::Cardinal),
            format: Some(PropertyFormat::Format32),
            count: Some(count),
        }
    }

    /// 8-bit text of any length.
    #[must_use]
    pub const fn text() -> Self {
        Self {
            kind: Some(PropertyKind::Text),
            format: Some(PropertyFormat::Format8),
            count: None,
        }
    }

    /// Whether `value` satisfies every constrained field.
    #[must_use]
    pub fn matches(&self, value: &PropertyValue) -> bool {
        self.kind.is_none_or(|kind| kind == value.kind)
            && self.format.is_none_or(|format| format == value.format)
            && self.count.is_none_or(|count| count == value.item_count())
    }
}

// ---------------------------------------------------------------------------
// Protocol attributes
// ---------------------------------------------------------------------------

/// The closed set of protocol attributes this crate publishes or consumes.
///
/// | attribute | encoding | meaning |
/// |---|---|---|
/// | [`RotationTransition`](Self::RotationTransition) | 1 cardinal, 0/1 | a rotation animation is running; scheduling hint only |
/// | [`SuppressRootReconfiguration`](Self::SuppressRootReconfiguration) | 1 cardinal, present = suppress | peers must defer geometry changes until deleted |
/// | [`ScreenSize`](Self::ScreenSize) | 2 cardinals | advisory virtual screen size, ordered by portrait state |
/// | [`OnCurrentDesktop`](Self::OnCurrentDesktop) | 1 cardinal = 1, or absent | window belongs to the active view |
/// | [`VideoOverlay`](Self::VideoOverlay) | any type, first byte boolean | window carries a hardware video overlay |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// A visual rotation transition is in progress.
    RotationTransition,
    /// Peers must defer their own geometry changes while present.
    SuppressRootReconfiguration,
    /// Advisory virtual screen size.
    ScreenSize,
    /// Marks a desktop-layer window as belonging to the active view.
    OnCurrentDesktop,
    /// Marks a window as having a hardware video overlay.
    VideoOverlay,
}

impl Attribute {
    /// The attribute name on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::RotationTransition => "_GIMBAL_ROTATION_TRANSITION",
            Self::SuppressRootReconfiguration => "_GIMBAL_SUPPRESS_ROOT_RECONFIGURATION",
            Self::ScreenSize => "_GIMBAL_SCREEN_SIZE",
            Self::OnCurrentDesktop => "_GIMBAL_ON_CURRENT_DESKTOP",
            Self::VideoOverlay => "_GIMBAL_VIDEO_OVERLAY",
        }
    }

    /// The shape readers of this attribute demand.
    #[must_use]
    pub const fn expectation(self) -> PropertyExpectation {
        match self {
            Self::RotationTransition
            | Self::SuppressRootReconfiguration
            | Self::OnCurrentDesktop => PropertyExpectation::cardinal(1),
            Self::ScreenSize => PropertyExpectation::cardinal(2),
            Self::VideoOverlay => PropertyExpectation::ANY,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus helpers
// ---------------------------------------------------------------------------

/// Whether a guarded write touched the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The property was written or deleted.
    Wrote,
    /// The property already had the desired state; no request was issued.
    Unchanged,
}

/// Reads `attribute` as a boolean flag.
///
/// Absence, a failed expectation, and transport failure all read as `false`.
pub fn read_flag<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    attribute: Attribute,
) -> bool {
    bus.fetch_tolerant(window, attribute.wire_name(), attribute.expectation())
        .is_some_and(|value| value.is_truthy_flag())
}

/// Writes `attribute` as a boolean flag, unconditionally.
pub fn write_flag<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    attribute: Attribute,
    value: bool,
) -> Result<(), DisplayError> {
    bus.store(window, attribute.wire_name(), &PropertyValue::flag(value))
}

/// Deletes `attribute`, unconditionally. Deleting an absent property
/// succeeds.
pub fn clear<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    attribute: Attribute,
) -> Result<(), DisplayError> {
    bus.delete(window, attribute.wire_name())
}

/// Writes `attribute` as a boolean flag unless the stored value is already
/// byte-identical.
///
/// The read is tolerant, so an externally deleted flag is re-published and a
/// read failure degrades to an unconditional write.
pub fn write_flag_if_changed<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    attribute: Attribute,
    value: bool,
) -> Result<WriteOutcome, DisplayError> {
    let desired = PropertyValue::flag(value);
    let current = bus.fetch_tolerant(window, attribute.wire_name(), attribute.expectation());
    if current.as_ref() == Some(&desired) {
        return Ok(WriteOutcome::Unchanged);
    }
    bus.store(window, attribute.wire_name(), &desired)?;
    Ok(WriteOutcome::Wrote)
}

/// Deletes `attribute` if any value is present, malformed ones included.
pub fn clear_if_present<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    attribute: Attribute,
) -> Result<WriteOutcome, DisplayError> {
    if bus
        .fetch_tolerant(window, attribute.wire_name(), PropertyExpectation::ANY)
        .is_none()
    {
        return Ok(WriteOutcome::Unchanged);
    }
    bus.delete(window, attribute.wire_name())?;
    Ok(WriteOutcome::Wrote)
}

/// Publishes the advisory screen-size pair, `(width, height)` ordered by the
/// current portrait state of a canonically landscape frame.
pub fn write_screen_size_hint<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    portrait: bool,
    landscape_frame: (u16, u16),
) -> Result<(), DisplayError> {
    let (width, height) = landscape_frame;
    let pair = if portrait {
        [u32::from(height), u32::from(width)]
    } else {
        [u32::from(width), u32::from(height)]
    };
    bus.store(
        window,
        Attribute::ScreenSize.wire_name(),
        &PropertyValue::cardinals(&pair),
    )
}

/// Reads an arbitrary text property (window titles and the like live outside
/// the [`Attribute`] set). Absence, non-text values, and invalid UTF-8 all
/// read as `None`.
pub fn read_text<B: PropertyBus + ?Sized>(
    bus: &mut B,
    window: WindowId,
    attribute: &str,
) -> Option<String> {
    let value = bus.fetch_tolerant(window, attribute, PropertyExpectation::text())?;
    String::from_utf8(value.data).ok()
}

/// Whether `window` carries the video-overlay flag: any type tag is
/// accepted and the first payload byte is the boolean.
pub fn has_video_overlay<B: PropertyBus + ?Sized>(bus: &mut B, window: WindowId) -> bool {
    bus.fetch_tolerant(
        window,
        Attribute::VideoOverlay.wire_name(),
        PropertyExpectation::ANY,
    )
    .and_then(|value| value.first_byte())
    .is_some_and(|byte| byte != 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use alloc::vec;

    use gimbal_harness::{FailPoint, FakeDisplay};

    // The fakes implement the traits of the externally linked `gimbal_core`
    // library, so the tests must use that copy of the crate too.
    use gimbal_core::display::WindowId;
    use gimbal_core::property::{
        Attribute, PropertyExpectation, PropertyFormat, PropertyKind, PropertyValue,
        WriteOutcome, clear_if_present, has_video_overlay, read_flag, read_text, write_flag,
        write_flag_if_changed, write_screen_size_hint,
    };

    const WIN: WindowId = WindowId(0x100);

    #[test]
    fn cardinals_round_trip() {
        let value = PropertyValue::cardinals(&[800, 480]);
        assert_eq!(value.kind, PropertyKind::Cardinal);
        assert_eq!(value.format, PropertyFormat::Format32);
        assert_eq!(value.item_count(), 2);
        assert_eq!(value.to_cardinals(), Some(vec![800, 480]));
    }

    #[test]
    fn flags_decode_as_truthy() {
        assert!(PropertyValue::flag(true).is_truthy_flag());
        assert!(!PropertyValue::flag(false).is_truthy_flag());
        // Text payloads are never flags, whatever their bytes say.
        assert!(!PropertyValue::text("1").is_truthy_flag());
        // An empty cardinal list is not a set flag.
        assert!(!PropertyValue::cardinals(&[]).is_truthy_flag());
    }

    #[test]
    fn ragged_payload_is_not_cardinals() {
        let value = PropertyValue::from_parts(
            PropertyKind::Cardinal,
            PropertyFormat::Format32,
            vec![1, 2, 3],
        );
        assert_eq!(value.to_cardinals(), None);
        assert_eq!(value.item_count(), 0, "no whole item in three bytes");
    }

    #[test]
    fn expectation_matching() {
        let flag = PropertyValue::flag(true);
        assert!(PropertyExpectation::cardinal(1).matches(&flag));
        assert!(PropertyExpectation::ANY.matches(&flag));
        assert!(
            !PropertyExpectation::cardinal(2).matches(&flag),
            "count mismatch"
        );
        assert!(
            !PropertyExpectation::text().matches(&flag),
            "kind mismatch"
        );
        assert!(PropertyExpectation::text().matches(&PropertyValue::text("hi")));
    }

    #[test]
    fn attribute_wire_names_are_stable() {
        // Peers match on these strings; renaming one is a protocol break.
        assert_eq!(
            Attribute::RotationTransition.wire_name(),
            "_GIMBAL_ROTATION_TRANSITION"
        );
        assert_eq!(
            Attribute::SuppressRootReconfiguration.wire_name(),
            "_GIMBAL_SUPPRESS_ROOT_RECONFIGURATION"
        );
        assert_eq!(Attribute::ScreenSize.wire_name(), "_GIMBAL_SCREEN_SIZE");
        assert_eq!(
            Attribute::OnCurrentDesktop.wire_name(),
            "_GIMBAL_ON_CURRENT_DESKTOP"
        );
        assert_eq!(Attribute::VideoOverlay.wire_name(), "_GIMBAL_VIDEO_OVERLAY");
    }

    #[test]
    fn read_flag_folds_absence_and_failure_to_false() {
        let mut display = FakeDisplay::new_landscape();
        assert!(!read_flag(&mut display, WIN, Attribute::OnCurrentDesktop));

        display.fail_next(FailPoint::Fetch);
        write_flag(&mut display, WIN, Attribute::OnCurrentDesktop, true).unwrap();
        assert!(
            !read_flag(&mut display, WIN, Attribute::OnCurrentDesktop),
            "transport failure reads as false"
        );
        assert!(
            read_flag(&mut display, WIN, Attribute::OnCurrentDesktop),
            "set flag reads as true once the bus recovers"
        );
    }

    #[test]
    fn read_flag_rejects_malformed_values() {
        let mut display = FakeDisplay::new_landscape();
        display.poke_property(
            WIN,
            Attribute::OnCurrentDesktop.wire_name(),
            PropertyValue::text("1"),
        );
        assert!(
            !read_flag(&mut display, WIN, Attribute::OnCurrentDesktop),
            "expectation mismatch reads as absent"
        );
    }

    #[test]
    fn guarded_write_skips_redundant_round_trips() {
        let mut display = FakeDisplay::new_landscape();
        let attr = Attribute::OnCurrentDesktop;

        assert_eq!(
            write_flag_if_changed(&mut display, WIN, attr, true).unwrap(),
            WriteOutcome::Wrote
        );
        let writes = display.write_count();
        assert_eq!(
            write_flag_if_changed(&mut display, WIN, attr, true).unwrap(),
            WriteOutcome::Unchanged
        );
        assert_eq!(display.write_count(), writes, "no second store");

        // An external delete is repaired on the next pass.
        display.drop_property(WIN, attr.wire_name());
        assert_eq!(
            write_flag_if_changed(&mut display, WIN, attr, true).unwrap(),
            WriteOutcome::Wrote
        );
    }

    #[test]
    fn guarded_clear_only_deletes_present_values() {
        let mut display = FakeDisplay::new_landscape();
        let attr = Attribute::OnCurrentDesktop;

        assert_eq!(
            clear_if_present(&mut display, WIN, attr).unwrap(),
            WriteOutcome::Unchanged
        );
        assert_eq!(display.delete_count(), 0);

        // Malformed values are still cleared.
        display.poke_property(WIN, attr.wire_name(), PropertyValue::text("junk"));
        assert_eq!(
            clear_if_present(&mut display, WIN, attr).unwrap(),
            WriteOutcome::Wrote
        );
        assert_eq!(display.delete_count(), 1);
        assert!(display.property(WIN, attr.wire_name()).is_none());
    }

    #[test]
    fn screen_size_hint_orders_by_portrait_state() {
        let mut display = FakeDisplay::new_landscape();
        let name = Attribute::ScreenSize.wire_name();

        write_screen_size_hint(&mut display, WIN, false, (800, 480)).unwrap();
        assert_eq!(
            display.property(WIN, name).unwrap().to_cardinals(),
            Some(vec![800, 480])
        );

        write_screen_size_hint(&mut display, WIN, true, (800, 480)).unwrap();
        assert_eq!(
            display.property(WIN, name).unwrap().to_cardinals(),
            Some(vec![480, 800])
        );
    }

    #[test]
    fn text_properties_round_trip() {
        let mut display = FakeDisplay::new_landscape();
        display.poke_property(WIN, "WM_NAME", PropertyValue::text("gimbal demo"));
        assert_eq!(
            read_text(&mut display, WIN, "WM_NAME").as_deref(),
            Some("gimbal demo")
        );
        assert_eq!(read_text(&mut display, WIN, "WM_CLASS"), None);
    }

    #[test]
    fn video_overlay_checks_first_byte_of_any_type() {
        let mut display = FakeDisplay::new_landscape();
        assert!(!has_video_overlay(&mut display, WIN));

        let name = Attribute::VideoOverlay.wire_name();
        display.poke_property(
            WIN,
            name,
            PropertyValue::from_parts(PropertyKind::Other, PropertyFormat::Format8, vec![1]),
        );
        assert!(has_video_overlay(&mut display, WIN));

        display.poke_property(
            WIN,
            name,
            PropertyValue::from_parts(PropertyKind::Other, PropertyFormat::Format8, vec![0]),
        );
        assert!(!has_video_overlay(&mut display, WIN));
    }
}
