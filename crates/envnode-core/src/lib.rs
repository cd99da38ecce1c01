//! Hardware-independent core library for envnode
//!
//! This crate contains all platform-agnostic logic for the envnode
//! environmental sensor node: peripheral availability tracking, the gas
//! sensor's thermal-compensation calibration, reading acquisition, the
//! binary frame format, CSV persistence formatting, and the boot / cycle
//! orchestration that ties them together.
//!
//! Peripherals are reached only through the capability traits in
//! [`sensors`], [`time_source`] and [`storage`], so the same engine runs on
//! the ESP32-S3 firmware, in the desktop simulator, and under test.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts.

#![no_std]

extern crate alloc;

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod display;
pub mod fault;
pub mod frame;
pub mod hardware;
pub mod node;
pub mod reading;
pub mod schedule;
pub mod sensors;
pub mod storage;
pub mod time_source;
pub mod voltage;

#[cfg(test)]
pub(crate) mod mock;
