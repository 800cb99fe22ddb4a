// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted rotation and stacking session over the test fakes.
//!
//! Drives an [`OrientationController`] and a [`StackCoordinator`] against the
//! fakes from `gimbal_harness` with a
//! [`PrettyPrintSink`](gimbal_debug::pretty::PrettyPrintSink) attached, so a
//! full portrait/landscape round trip prints as a readable event log. No
//! display server is involved; this is the trace pipeline end to end.

use gimbal_core::display::{Orientation, WindowId};
use gimbal_core::orientation::OrientationController;
use gimbal_core::stacking::{StackCoordinator, ViewId};
use gimbal_core::trace::Tracer;
use gimbal_debug::pretty::PrettyPrintSink;
use gimbal_harness::{FakeDisplay, FakeInput, FakeRenderStage, FakeShell};

fn main() {
    let mut sink = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut tracer = Tracer::new(&mut sink);

    // -- fakes --------------------------------------------------------------
    let mut display = FakeDisplay::new_landscape();
    let mut shell = FakeShell::with_desktop(WindowId(0x10));
    shell.set_active_view(ViewId(1));
    shell.add_applet(WindowId(0x21), Some(ViewId(1)), 0);
    shell.add_applet(WindowId(0x22), Some(ViewId(2)), 0);
    shell.add_applet(WindowId(0x23), None, 1);
    shell.add_transient(WindowId(0x31));
    let mut render = FakeRenderStage::new();
    let mut input = FakeInput::new();

    // -- coordinators -------------------------------------------------------
    let mut controller = OrientationController::new();
    let mut stacker = StackCoordinator::new();

    // -- scripted session ---------------------------------------------------
    if !controller.prime(&mut display, &mut tracer) {
        eprintln!("rotation unavailable; the script expects the default fake");
        return;
    }
    controller.publish_screen_size(&mut display, &mut tracer, true);

    controller.set_transition_hint(&mut display, &mut tracer, true);
    let rotated = controller.change_orientation(
        &mut display,
        &mut render,
        &mut input,
        &mut tracer,
        Orientation::Portrait,
    );
    assert!(rotated, "the scripted fake accepts the first rotation");
    stacker.restack_desktop_layer(&mut display, &mut shell, &mut render, &mut tracer);
    controller.complete_rotation_handshake(&mut display, &mut tracer);
    controller.set_transition_hint(&mut display, &mut tracer, false);

    controller.publish_screen_size(&mut display, &mut tracer, false);
    let rotated_back = controller.change_orientation(
        &mut display,
        &mut render,
        &mut input,
        &mut tracer,
        Orientation::Landscape,
    );
    assert!(rotated_back, "rotating back stays in the supported set");
    controller.complete_rotation_handshake(&mut display, &mut tracer);

    // Unchanged inputs: every guarded write below should no-op.
    stacker.restack_desktop_layer(&mut display, &mut shell, &mut render, &mut tracer);

    // -- final counters -----------------------------------------------------
    println!("---");
    println!("stacking passes={}", stacker.passes());
    println!(
        "property reads={} writes={} deletes={}",
        display.read_count(),
        display.write_count(),
        display.delete_count(),
    );
    println!(
        "config writes={} syncs={} grab depth={}",
        display.config_write_count(),
        display.sync_count(),
        display.grab_depth(),
    );
    println!(
        "screen={:?} crtc rotation={:?}",
        display.screen(),
        display.crtc_rotation(),
    );
}
