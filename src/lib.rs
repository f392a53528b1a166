#![cfg_attr(docsrs, feature(doc_cfg))]
//! # deltaq_lib
//!
//! This crate decodes the CANopen telemetry exchanged between a battery pack
//! and a Delta-Q charger, and the status frame of the pack's serial BMS
//! (Battery Management System). It also provides synchronous and asynchronous
//! clients for polling the BMS over a serial link.
//!
//! ## Features
//!
//! This crate uses a feature-based system to keep dependencies minimal.
//! You need to enable the client you want to use.
//!
//! - `default`: Enables `bin-dependencies`, which is intended for compiling the `deltaq` command-line tool and pulls in `serialport` and the CLI stack.
//!
//! ### Client Features
//! - `serialport`: Enables the **synchronous** BMS client using the `serialport` crate.
//! - `tokio-serial-async`: Enables the **asynchronous** BMS client using `tokio` and `tokio-serial`.

/// Contains error types for the library.
mod error;
/// Decoder for the serial BMS status frame.
pub mod bms;
/// Decoders and encoders for the Delta-Q CANopen message set.
pub mod protocol;
/// Last-known-value tracking for decoded charger traffic.
pub mod state;

pub use error::Error;

/// Synchronous client for polling the BMS.
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
#[cfg(feature = "serialport")]
pub mod serialport;

/// Asynchronous client for polling the BMS.
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-serial-async")))]
#[cfg(feature = "tokio-serial-async")]
pub mod tokio_serial_async;
