//! This is a platform-agnostic Rust driver for the Sensirion SHT40 humidity and temperature
//! digital sensor, written for targets where the I²C bus is serviced by DMA or interrupts and
//! blocking on a transfer is not an option.
//!
//! Unlike most sensor drivers, this one never waits: every operation either initiates a bus
//! transfer and returns, or inspects the state of a transfer started earlier. The caller drives
//! the driver forward by invoking [`Sht40::poll`] from a periodic context (nominally once per
//! millisecond, e.g. a SysTick handler or a scheduler tick). The sensor's conversion time is
//! waited out by counting polls, the read-back is supervised across polls, and decoded values
//! are cached on the instance for the caller to pick up whenever convenient.
//!
//! This driver allows you to:
//! - Trigger a measurement in any of the sensor's three precision modes.
//! - Trigger a heated measurement (three heater powers, two pulse lengths).
//! - Read the unique serial number of the sensor.
//! - Trigger a soft reset.
//! - Read back the last decoded temperature (°C or °F) and relative humidity.
//! - Observe the running count of checksum failures on received frames.
//!
//! The bus itself is abstracted behind the [`Bus`] trait, which models an
//! initiate-then-poll-for-completion transport: `write`/`read` only report whether the transfer
//! was accepted, and completion is observed through the `is_reading`/`is_writing`/`is_failed`
//! probes. Any DMA- or interrupt-driven I²C peripheral wrapper can implement it.
//!
//! ## Features
//!
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! Datasheet: [SHT4x](https://sensirion.com/media/documents/33FD6951/662A593A/HT_DS_Datasheet_SHT4x.pdf)
//!
//! ## Example
//!
//! ```ignore
//! use sht40_nb::{Mode, Sht40};
//!
//! // Platform-specific: any type implementing sht40_nb::Bus
//! let bus = /* DMA-backed I²C wrapper */;
//!
//! let mut sht40 = Sht40::new(bus, 0x44).unwrap();
//! sht40.measure(Mode::HighPrecision).unwrap();
//!
//! // From a 1 kHz periodic context:
//! sht40.poll();
//!
//! // Once the cycle has finished:
//! if !sht40.is_busy() {
//!     println!("{:.1} °C, {:.1} %RH", sht40.temperature_celsius(), sht40.humidity());
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

mod bus;
mod device_impl;
mod hw_def;
mod types;

pub use crate::{bus::*, hw_def::*, types::*};
