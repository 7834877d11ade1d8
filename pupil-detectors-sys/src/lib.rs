#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

//! Raw FFI bindings for the compiled pupil detector extension.
//!
//! These declarations mirror `include/pupil_detectors.h`. The detector core
//! itself is compiled from the C++ sources declared in `build.toml` when the
//! `compile-native` feature is enabled.

use libc::{c_double, c_int, c_uchar};

/// Opaque handle to a 2d pupil detector instance.
#[repr(C)]
pub struct detector_2d_t {
    _private: [u8; 0],
}

/// Detection result for a single gray frame: the fitted pupil ellipse in
/// pixel coordinates plus the detector's confidence.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct detector_2d_result_t {
    pub center_x: c_double,
    pub center_y: c_double,
    pub axis_major: c_double,
    pub axis_minor: c_double,
    pub angle: c_double,
    pub confidence: c_double,
}

extern "C" {
    pub fn detector_2d_create() -> *mut detector_2d_t;

    /// Run detection on one 8-bit gray frame of `rows` x `cols` pixels.
    /// Returns 0 on success.
    pub fn detector_2d_detect(
        detector: *mut detector_2d_t,
        rows: c_int,
        cols: c_int,
        data: *const c_uchar,
        result: *mut detector_2d_result_t,
    ) -> c_int;

    pub fn detector_2d_destroy(detector: *mut detector_2d_t);
}
