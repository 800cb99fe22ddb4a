// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The live X server connection.

use std::collections::HashMap;
use std::fmt;

use gimbal_core::display::{
    CrtcConfig, CrtcId, CrtcState, DisplayControl, DisplayError, ModeId, OutputId, PropertyBus,
    Rotation, ScreenResources, ScreenSize, WindowId,
};
use gimbal_core::property::{PropertyExpectation, PropertyFormat, PropertyValue};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, PropMode};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::convert;

/// Longest property payload we read, in 32-bit units.
const PROPERTY_READ_LENGTH: u32 = 1024;

/// A connection to a live X server, speaking the property bus over the core
/// protocol and display control over RandR.
///
/// The struct tracks the virtual screen size alongside the socket: the size
/// reported by [`DisplayControl::screen_size`] is the one from connection
/// setup, updated by this connection's own resizes. Resizes issued by other
/// clients are not observed; the orientation coordinator is expected to be
/// the only writer.
///
/// Interned atoms are cached per connection, so repeated protocol traffic on
/// the same attributes costs one round-trip per name overall.
pub struct X11Display {
    conn: RustConnection,
    root: WindowId,
    screen: ScreenSize,
    config_timestamp: u32,
    atoms: HashMap<String, Atom>,
}

impl X11Display {
    /// Connects to the X server named by `display`, or `$DISPLAY` when
    /// `None`, and manages that display's default screen.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::CommunicationFailure`] when the server cannot
    /// be reached.
    pub fn open(display: Option<&str>) -> Result<Self, DisplayError> {
        let (conn, screen_num) = x11rb::connect(display).map_err(transport)?;
        let screen = &conn.setup().roots[screen_num];
        let root = WindowId(screen.root);
        let size = ScreenSize::new(
            screen.width_in_pixels,
            screen.height_in_pixels,
            u32::from(screen.width_in_millimeters),
            u32::from(screen.height_in_millimeters),
        );
        Ok(Self {
            conn,
            root,
            screen: size,
            config_timestamp: 0,
            atoms: HashMap::new(),
        })
    }

    fn atom(&mut self, name: &str) -> Result<Atom, DisplayError> {
        if let Some(&atom) = self.atoms.get(name) {
            return Ok(atom);
        }
        let atom = self
            .conn
            .intern_atom(false, name.as_bytes())
            .map_err(transport)?
            .reply()
            .map_err(transport)?
            .atom;
        self.atoms.insert(String::from(name), atom);
        Ok(atom)
    }
}

impl fmt::Debug for X11Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11Display")
            .field("root", &self.root)
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}

/// Collapses any transport-level failure into the one error the coordinators
/// recover from.
fn transport<E>(_: E) -> DisplayError {
    DisplayError::CommunicationFailure
}

/// Maps a reply error on a resource query: a server-side refusal means the
/// CRTC or output is gone, anything else is transport.
fn resource_error(error: ReplyError) -> DisplayError {
    match error {
        ReplyError::X11Error(_) => DisplayError::ResourceNotFound,
        ReplyError::ConnectionError(_) => DisplayError::CommunicationFailure,
    }
}

impl PropertyBus for X11Display {
    fn fetch(
        &mut self,
        window: WindowId,
        attribute: &str,
        expectation: PropertyExpectation,
    ) -> Result<Option<PropertyValue>, DisplayError> {
        let atom = self.atom(attribute)?;
        let utf8_string = self.atom("UTF8_STRING")?;
        let cookie = self
            .conn
            .get_property(false, window.0, atom, AtomEnum::ANY, 0, PROPERTY_READ_LENGTH)
            .map_err(transport)?;
        let reply = match cookie.reply() {
            Ok(reply) => reply,
            // The owning client may destroy the window between our request
            // and the server processing it; that read reports absence.
            Err(ReplyError::X11Error(_)) => return Ok(None),
            Err(ReplyError::ConnectionError(_)) => return Err(DisplayError::CommunicationFailure),
        };
        if reply.type_ == x11rb::NONE {
            return Ok(None);
        }
        let Some(format) = convert::format_from_wire(reply.format) else {
            return Ok(None);
        };
        let kind = convert::kind_from_atom(reply.type_, utf8_string);
        let value = PropertyValue::from_parts(kind, format, reply.value);
        Ok(Some(value).filter(|value| expectation.matches(value)))
    }

    fn store(
        &mut self,
        window: WindowId,
        attribute: &str,
        value: &PropertyValue,
    ) -> Result<(), DisplayError> {
        let atom = self.atom(attribute)?;
        let utf8_string = self.atom("UTF8_STRING")?;
        let type_ = convert::atom_for_kind(value.kind, utf8_string);
        match value.format {
            PropertyFormat::Format8 => {
                self.conn
                    .change_property8(PropMode::REPLACE, window.0, atom, type_, &value.data)
                    .map_err(transport)?;
            }
            PropertyFormat::Format16 => {
                let items = convert::words_from_bytes(&value.data);
                self.conn
                    .change_property16(PropMode::REPLACE, window.0, atom, type_, &items)
                    .map_err(transport)?;
            }
            PropertyFormat::Format32 => {
                let items = convert::longs_from_bytes(&value.data);
                self.conn
                    .change_property32(PropMode::REPLACE, window.0, atom, type_, &items)
                    .map_err(transport)?;
            }
        }
        // Push the write out now; the bus contract promises delivery without
        // requiring a later barrier. Server-side failures stay unreported.
        self.conn.flush().map_err(transport)
    }

    fn delete(&mut self, window: WindowId, attribute: &str) -> Result<(), DisplayError> {
        let atom = self.atom(attribute)?;
        self.conn.delete_property(window.0, atom).map_err(transport)?;
        self.conn.flush().map_err(transport)
    }
}

impl DisplayControl for X11Display {
    fn root_window(&self) -> WindowId {
        self.root
    }

    fn screen_size(&self) -> Result<ScreenSize, DisplayError> {
        Ok(self.screen)
    }

    fn rotation_capable(&mut self) -> Result<bool, DisplayError> {
        if self
            .conn
            .extension_information(randr::X11_EXTENSION_NAME)
            .map_err(transport)?
            .is_none()
        {
            return Ok(false);
        }
        let version = self
            .conn
            .randr_query_version(1, 3)
            .map_err(transport)?
            .reply()
            .map_err(transport)?;
        Ok(convert::version_supports_rotation(
            version.major_version,
            version.minor_version,
        ))
    }

    fn screen_resources(&mut self) -> Result<ScreenResources, DisplayError> {
        let reply = self
            .conn
            .randr_get_screen_resources(self.root.0)
            .map_err(transport)?
            .reply()
            .map_err(resource_error)?;
        // Later per-output and per-CRTC queries echo this token back so the
        // server can reject them if the hardware has changed since.
        self.config_timestamp = reply.config_timestamp;
        Ok(ScreenResources {
            crtcs: reply.crtcs.iter().map(|&crtc| CrtcId(crtc)).collect(),
            outputs: reply.outputs.iter().map(|&output| OutputId(output)).collect(),
        })
    }

    fn output_crtc(&mut self, output: OutputId) -> Result<Option<CrtcId>, DisplayError> {
        let reply = self
            .conn
            .randr_get_output_info(output.0, self.config_timestamp)
            .map_err(transport)?
            .reply()
            .map_err(resource_error)?;
        Ok((reply.crtc != x11rb::NONE).then_some(CrtcId(reply.crtc)))
    }

    fn output_is_builtin_panel(&mut self, output: OutputId) -> Result<bool, DisplayError> {
        let connector_type = self.atom("ConnectorType")?;
        let panel = self.atom("Panel")?;
        let cookie = self
            .conn
            .randr_get_output_property(output.0, connector_type, AtomEnum::ATOM, 0, 1, false, false)
            .map_err(transport)?;
        let reply = match cookie.reply() {
            Ok(reply) => reply,
            // An output that vanished mid-scan simply is not the panel.
            Err(ReplyError::X11Error(_)) => return Ok(false),
            Err(ReplyError::ConnectionError(_)) => return Err(DisplayError::CommunicationFailure),
        };
        Ok(convert::output_connector_is(&reply.data, reply.format, panel))
    }

    fn primary_output(&mut self) -> Result<Option<OutputId>, DisplayError> {
        let reply = self
            .conn
            .randr_get_output_primary(self.root.0)
            .map_err(transport)?
            .reply()
            .map_err(resource_error)?;
        Ok((reply.output != x11rb::NONE).then_some(OutputId(reply.output)))
    }

    fn crtc_state(&mut self, crtc: CrtcId) -> Result<CrtcState, DisplayError> {
        let reply = self
            .conn
            .randr_get_crtc_info(crtc.0, self.config_timestamp)
            .map_err(transport)?
            .reply()
            .map_err(resource_error)?;
        let rotation = convert::rotation_from_wire(u16::from(reply.rotation))
            .ok_or(DisplayError::UnsupportedConfiguration)?;
        Ok(CrtcState {
            x: reply.x,
            y: reply.y,
            width: reply.width,
            height: reply.height,
            mode: ModeId(reply.mode),
            rotation,
            supported: convert::rotation_set_from_wire(u16::from(reply.rotations)),
            outputs: reply.outputs.iter().map(|&output| OutputId(output)).collect(),
            timestamp: reply.timestamp,
        })
    }

    fn disable_crtc(&mut self, crtc: CrtcId, timestamp: u32) -> Result<(), DisplayError> {
        let reply = self
            .conn
            .randr_set_crtc_config(
                crtc.0,
                timestamp,
                self.config_timestamp,
                0,
                0,
                x11rb::NONE,
                convert::rotation_to_wire(Rotation::R0).into(),
                &[],
            )
            .map_err(transport)?
            .reply()
            .map_err(resource_error)?;
        convert::config_status(u8::from(reply.status))
    }

    fn set_screen_size(&mut self, size: ScreenSize) -> Result<(), DisplayError> {
        self.conn
            .randr_set_screen_size(
                self.root.0,
                size.width,
                size.height,
                size.mm_width,
                size.mm_height,
            )
            .map_err(transport)?;
        self.screen = size;
        Ok(())
    }

    fn apply_crtc(&mut self, crtc: CrtcId, config: &CrtcConfig) -> Result<(), DisplayError> {
        let outputs: Vec<u32> = config.outputs.iter().map(|output| output.0).collect();
        let reply = self
            .conn
            .randr_set_crtc_config(
                crtc.0,
                config.timestamp,
                self.config_timestamp,
                config.x,
                config.y,
                config.mode.0,
                convert::rotation_to_wire(config.rotation).into(),
                &outputs,
            )
            .map_err(transport)?
            .reply()
            .map_err(resource_error)?;
        convert::config_status(u8::from(reply.status))
    }

    fn grab(&mut self) -> Result<(), DisplayError> {
        self.conn.grab_server().map_err(transport)?;
        Ok(())
    }

    fn ungrab(&mut self) -> Result<(), DisplayError> {
        self.conn.ungrab_server().map_err(transport)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DisplayError> {
        self.conn.get_input_focus().map_err(transport)?.reply().map_err(transport)?;
        Ok(())
    }
}
