// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory display server with a scriptable failure injector.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use gimbal_core::display::{
    CrtcConfig, CrtcId, CrtcState, DisplayControl, DisplayError, ModeId, OutputId, PropertyBus,
    Rotation, RotationSet, ScreenResources, ScreenSize, WindowId,
};
use gimbal_core::property::{PropertyExpectation, PropertyValue};

// ---------------------------------------------------------------------------
// Failure injection
// ---------------------------------------------------------------------------

/// One operation kind on [`FakeDisplay`] that can be armed to fail.
///
/// Arming a point via [`FakeDisplay::fail_next`] makes the *next* operation
/// of that kind fail with [`DisplayError::CommunicationFailure`] and disarms
/// the point. Operations of other kinds pass through untouched, so a test can
/// arm a point, run unrelated setup, and still hit the intended call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    /// A property read.
    Fetch,
    /// A property write.
    Store,
    /// A property delete.
    Delete,
    /// The rotation capability probe.
    Capability,
    /// Any CRTC/output topology query.
    Resources,
    /// A CRTC state read.
    CrtcState,
    /// Taking the server grab.
    Grab,
    /// Disabling the CRTC.
    Disable,
    /// Resizing the virtual screen.
    Resize,
    /// Applying a CRTC configuration.
    Apply,
    /// Releasing the server grab.
    Ungrab,
    /// A synchronization round-trip.
    Sync,
}

// ---------------------------------------------------------------------------
// FakeDisplay
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct FakeOutput {
    id: OutputId,
    crtc: Option<CrtcId>,
    builtin_panel: bool,
}

/// An in-memory stand-in for a display-server connection.
///
/// Models one screen with a real per-window property table and one scripted
/// panel CRTC whose scan-out size follows its mode and rotation, plus an
/// adjustable CRTC/output topology for exercising CRTC resolution. Every
/// operation that reaches the fake server is counted; [`poke_property`] and
/// [`drop_property`] mutate the table *without* counting, standing in for
/// other clients on the bus.
///
/// [`poke_property`]: Self::poke_property
/// [`drop_property`]: Self::drop_property
#[derive(Debug)]
pub struct FakeDisplay {
    root: WindowId,
    screen: ScreenSize,
    capable: bool,
    crtcs: Vec<CrtcId>,
    outputs: Vec<FakeOutput>,
    primary: Option<OutputId>,
    // The scripted panel CRTC. Scan-out dimensions derive from the native
    // mode size and the current rotation.
    mode: ModeId,
    native_width: u16,
    native_height: u16,
    position: (i16, i16),
    rotation: Rotation,
    supported: RotationSet,
    timestamp: u32,
    configured: Option<CrtcId>,
    properties: BTreeMap<WindowId, BTreeMap<String, PropertyValue>>,
    armed: Option<FailPoint>,
    reads: u32,
    writes: u32,
    deletes: u32,
    config_writes: u32,
    capability_probes: u32,
    syncs: u32,
    grab_depth: u32,
}

impl FakeDisplay {
    /// A landscape device: an 800x480 screen driven by one CRTC at
    /// [`Rotation::R0`], all rotations supported, rotation-capable server.
    #[must_use]
    pub fn new_landscape() -> Self {
        Self::with_panel(ScreenSize::new(800, 480, 77, 46), 800, 480)
    }

    /// A firmware-pre-rotated device: the panel scans out 480x800 at
    /// [`Rotation::R0`], so landscape requires a quarter turn.
    #[must_use]
    pub fn new_portrait_panel() -> Self {
        Self::with_panel(ScreenSize::new(480, 800, 46, 77), 480, 800)
    }

    fn with_panel(screen: ScreenSize, native_width: u16, native_height: u16) -> Self {
        Self {
            root: WindowId(0x1),
            screen,
            capable: true,
            crtcs: vec![CrtcId(1)],
            outputs: vec![FakeOutput {
                id: OutputId(1),
                crtc: Some(CrtcId(1)),
                builtin_panel: false,
            }],
            primary: None,
            mode: ModeId(7),
            native_width,
            native_height,
            position: (0, 0),
            rotation: Rotation::R0,
            supported: RotationSet::ALL,
            timestamp: 1234,
            configured: None,
            properties: BTreeMap::new(),
            armed: None,
            reads: 0,
            writes: 0,
            deletes: 0,
            config_writes: 0,
            capability_probes: 0,
            syncs: 0,
            grab_depth: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Scripting
    // -----------------------------------------------------------------------

    /// Arms `point` to fail on its next matching operation.
    ///
    /// Only one point is armed at a time; arming again replaces the previous
    /// one.
    pub fn fail_next(&mut self, point: FailPoint) {
        self.armed = Some(point);
    }

    /// Scripts the capability probe's answer.
    pub fn set_rotation_capable(&mut self, capable: bool) {
        self.capable = capable;
    }

    /// Scripts the rotation set the panel CRTC reports as supported.
    pub fn set_supported_rotations(&mut self, supported: RotationSet) {
        self.supported = supported;
    }

    /// Appends a CRTC to the advertised list (its state reads mirror the
    /// panel CRTC).
    pub fn push_crtc(&mut self, crtc: CrtcId) {
        self.crtcs.push(crtc);
    }

    /// Appends an output with its driving CRTC and connector declaration.
    pub fn add_output(&mut self, output: OutputId, crtc: Option<CrtcId>, builtin_panel: bool) {
        self.outputs.push(FakeOutput {
            id: output,
            crtc,
            builtin_panel,
        });
    }

    /// Scripts which output the server declares primary.
    pub fn set_primary_output(&mut self, primary: Option<OutputId>) {
        self.primary = primary;
    }

    /// Sets a property as another client would: no counters, no fail points.
    pub fn poke_property(&mut self, window: WindowId, attribute: &str, value: PropertyValue) {
        self.properties
            .entry(window)
            .or_default()
            .insert(String::from(attribute), value);
    }

    /// Deletes a property as another client would: no counters, no fail
    /// points.
    pub fn drop_property(&mut self, window: WindowId, attribute: &str) {
        if let Some(props) = self.properties.get_mut(&window) {
            props.remove(attribute);
        }
    }

    // -----------------------------------------------------------------------
    // Probes
    // -----------------------------------------------------------------------

    /// The current value of a property, if present.
    #[must_use]
    pub fn property(&self, window: WindowId, attribute: &str) -> Option<PropertyValue> {
        self.properties
            .get(&window)
            .and_then(|props| props.get(attribute))
            .cloned()
    }

    /// The panel CRTC's current rotation.
    #[must_use]
    pub fn crtc_rotation(&self) -> Rotation {
        self.rotation
    }

    /// The current virtual screen size.
    #[must_use]
    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    /// The CRTC the last configuration write targeted, if any.
    #[must_use]
    pub fn configured_crtc(&self) -> Option<CrtcId> {
        self.configured
    }

    /// Counted property reads.
    #[must_use]
    pub fn read_count(&self) -> u32 {
        self.reads
    }

    /// Counted property writes.
    #[must_use]
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Counted property deletes.
    #[must_use]
    pub fn delete_count(&self) -> u32 {
        self.deletes
    }

    /// Counted configuration writes: CRTC disables, screen resizes, and CRTC
    /// applies.
    #[must_use]
    pub fn config_write_count(&self) -> u32 {
        self.config_writes
    }

    /// Counted capability probes.
    #[must_use]
    pub fn capability_probe_count(&self) -> u32 {
        self.capability_probes
    }

    /// Counted synchronization round-trips.
    #[must_use]
    pub fn sync_count(&self) -> u32 {
        self.syncs
    }

    /// Current server-grab nesting depth. Zero when nobody holds the grab.
    #[must_use]
    pub fn grab_depth(&self) -> u32 {
        self.grab_depth
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Consumes the armed fail point if it matches `point`.
    fn trip(&mut self, point: FailPoint) -> Result<(), DisplayError> {
        if self.armed == Some(point) {
            self.armed = None;
            return Err(DisplayError::CommunicationFailure);
        }
        Ok(())
    }

    /// Scan-out dimensions of the panel CRTC under its current rotation.
    fn scan_out(&self) -> (u16, u16) {
        if self.rotation.is_sideways() {
            (self.native_height, self.native_width)
        } else {
            (self.native_width, self.native_height)
        }
    }
}

impl PropertyBus for FakeDisplay {
    fn fetch(
        &mut self,
        window: WindowId,
        attribute: &str,
        expectation: PropertyExpectation,
    ) -> Result<Option<PropertyValue>, DisplayError> {
        self.trip(FailPoint::Fetch)?;
        self.reads += 1;
        let value = self
            .properties
            .get(&window)
            .and_then(|props| props.get(attribute));
        Ok(value.filter(|value| expectation.matches(value)).cloned())
    }

    fn store(
        &mut self,
        window: WindowId,
        attribute: &str,
        value: &PropertyValue,
    ) -> Result<(), DisplayError> {
        self.trip(FailPoint::Store)?;
        self.writes += 1;
        self.properties
            .entry(window)
            .or_default()
            .insert(String::from(attribute), value.clone());
        Ok(())
    }

    fn delete(&mut self, window: WindowId, attribute: &str) -> Result<(), DisplayError> {
        self.trip(FailPoint::Delete)?;
        self.deletes += 1;
        if let Some(props) = self.properties.get_mut(&window) {
            props.remove(attribute);
        }
        Ok(())
    }
}

impl DisplayControl for FakeDisplay {
    fn root_window(&self) -> WindowId {
        self.root
    }

    fn screen_size(&self) -> Result<ScreenSize, DisplayError> {
        Ok(self.screen)
    }

    fn rotation_capable(&mut self) -> Result<bool, DisplayError> {
        self.trip(FailPoint::Capability)?;
        self.capability_probes += 1;
        Ok(self.capable)
    }

    fn screen_resources(&mut self) -> Result<ScreenResources, DisplayError> {
        self.trip(FailPoint::Resources)?;
        Ok(ScreenResources {
            crtcs: self.crtcs.clone(),
            outputs: self.outputs.iter().map(|output| output.id).collect(),
        })
    }

    fn output_crtc(&mut self, output: OutputId) -> Result<Option<CrtcId>, DisplayError> {
        self.trip(FailPoint::Resources)?;
        Ok(self
            .outputs
            .iter()
            .find(|candidate| candidate.id == output)
            .and_then(|candidate| candidate.crtc))
    }

    fn output_is_builtin_panel(&mut self, output: OutputId) -> Result<bool, DisplayError> {
        self.trip(FailPoint::Resources)?;
        Ok(self
            .outputs
            .iter()
            .find(|candidate| candidate.id == output)
            .is_some_and(|candidate| candidate.builtin_panel))
    }

    fn primary_output(&mut self) -> Result<Option<OutputId>, DisplayError> {
        self.trip(FailPoint::Resources)?;
        Ok(self.primary)
    }

    fn crtc_state(&mut self, crtc: CrtcId) -> Result<CrtcState, DisplayError> {
        self.trip(FailPoint::CrtcState)?;
        let (width, height) = self.scan_out();
        Ok(CrtcState {
            x: self.position.0,
            y: self.position.1,
            width,
            height,
            mode: self.mode,
            rotation: self.rotation,
            supported: self.supported,
            outputs: self
                .outputs
                .iter()
                .filter(|candidate| candidate.crtc == Some(crtc))
                .map(|candidate| candidate.id)
                .collect(),
            timestamp: self.timestamp,
        })
    }

    fn disable_crtc(&mut self, crtc: CrtcId, timestamp: u32) -> Result<(), DisplayError> {
        self.trip(FailPoint::Disable)?;
        // A real server refuses stale configuration tokens.
        if timestamp != self.timestamp {
            return Err(DisplayError::UnsupportedConfiguration);
        }
        self.config_writes += 1;
        self.configured = Some(crtc);
        self.mode = ModeId::NONE;
        Ok(())
    }

    fn set_screen_size(&mut self, size: ScreenSize) -> Result<(), DisplayError> {
        self.trip(FailPoint::Resize)?;
        self.config_writes += 1;
        self.screen = size;
        Ok(())
    }

    fn apply_crtc(&mut self, crtc: CrtcId, config: &CrtcConfig) -> Result<(), DisplayError> {
        self.trip(FailPoint::Apply)?;
        if config.timestamp != self.timestamp {
            return Err(DisplayError::UnsupportedConfiguration);
        }
        if !self.supported.contains(config.rotation) {
            return Err(DisplayError::UnsupportedConfiguration);
        }
        self.config_writes += 1;
        self.configured = Some(crtc);
        self.position = (config.x, config.y);
        self.mode = config.mode;
        self.rotation = config.rotation;
        Ok(())
    }

    fn grab(&mut self) -> Result<(), DisplayError> {
        self.trip(FailPoint::Grab)?;
        self.grab_depth += 1;
        Ok(())
    }

    fn ungrab(&mut self) -> Result<(), DisplayError> {
        self.trip(FailPoint::Ungrab)?;
        self.grab_depth = self.grab_depth.saturating_sub(1);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DisplayError> {
        self.trip(FailPoint::Sync)?;
        self.syncs += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_points_are_one_shot_and_kind_matched() {
        let mut display = FakeDisplay::new_landscape();
        display.fail_next(FailPoint::Store);

        // A non-matching operation leaves the point armed.
        assert!(
            display
                .fetch(WindowId(0x2), "X", PropertyExpectation::ANY)
                .is_ok()
        );
        assert_eq!(
            display.store(WindowId(0x2), "X", &PropertyValue::flag(true)),
            Err(DisplayError::CommunicationFailure)
        );
        // Consumed: the same operation now succeeds.
        assert!(
            display
                .store(WindowId(0x2), "X", &PropertyValue::flag(true))
                .is_ok()
        );
    }

    #[test]
    fn poked_properties_bypass_the_counters() {
        let mut display = FakeDisplay::new_landscape();
        display.poke_property(WindowId(0x2), "X", PropertyValue::flag(true));
        assert_eq!(display.write_count(), 0);
        assert!(display.property(WindowId(0x2), "X").is_some());

        display.drop_property(WindowId(0x2), "X");
        assert_eq!(display.delete_count(), 0);
        assert!(display.property(WindowId(0x2), "X").is_none());
    }

    #[test]
    fn apply_swaps_scan_out_for_sideways_rotations() {
        let mut display = FakeDisplay::new_landscape();
        let state = display.crtc_state(CrtcId(1)).unwrap();
        assert_eq!((state.width, state.height), (800, 480));

        display
            .apply_crtc(CrtcId(1), &state.config_with_rotation(Rotation::R90))
            .unwrap();

        let rotated = display.crtc_state(CrtcId(1)).unwrap();
        assert_eq!(rotated.rotation, Rotation::R90);
        assert_eq!((rotated.width, rotated.height), (480, 800));
    }

    #[test]
    fn apply_rejects_unsupported_rotations_and_stale_tokens() {
        let mut display = FakeDisplay::new_landscape();
        let state = display.crtc_state(CrtcId(1)).unwrap();

        display.set_supported_rotations(RotationSet::from(Rotation::R0));
        assert_eq!(
            display.apply_crtc(CrtcId(1), &state.config_with_rotation(Rotation::R90)),
            Err(DisplayError::UnsupportedConfiguration)
        );
        assert_eq!(display.crtc_rotation(), Rotation::R0);

        display.set_supported_rotations(RotationSet::ALL);
        let mut stale = state.config_with_rotation(Rotation::R90);
        stale.timestamp = stale.timestamp.wrapping_sub(1);
        assert_eq!(
            display.apply_crtc(CrtcId(1), &stale),
            Err(DisplayError::UnsupportedConfiguration)
        );
    }

    #[test]
    fn grab_depth_nests_and_never_underflows() {
        let mut display = FakeDisplay::new_landscape();
        display.grab().unwrap();
        display.grab().unwrap();
        display.ungrab().unwrap();
        assert_eq!(display.grab_depth(), 1);
        display.ungrab().unwrap();
        display.ungrab().unwrap();
        assert_eq!(display.grab_depth(), 0);
    }
}
