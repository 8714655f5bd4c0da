//! SHT40 command codes, timing and conversion equations.
//!
//! Codes and timings are from the SHT4x datasheet (version 6.6, April 2024); the conversion
//! equations are equations 1 and 2 on page 12.

/// Read the 32-bit unique serial number.
pub(crate) const CMD_READ_SERIAL_NUMBER: u8 = 0x89;
/// Soft reset. The sensor answers nothing; the command is fire-and-forget.
pub(crate) const CMD_SOFT_RESET: u8 = 0x94;

pub(crate) const CMD_MEASURE_HIGH_PRECISION: u8 = 0xFD;
pub(crate) const CMD_MEASURE_MEDIUM_PRECISION: u8 = 0xF6;
pub(crate) const CMD_MEASURE_LOW_PRECISION: u8 = 0xE0;

pub(crate) const CMD_HEATER_200MW_1S: u8 = 0x39;
pub(crate) const CMD_HEATER_200MW_100MS: u8 = 0x32;
pub(crate) const CMD_HEATER_110MW_1S: u8 = 0x2F;
pub(crate) const CMD_HEATER_110MW_100MS: u8 = 0x24;
pub(crate) const CMD_HEATER_20MW_1S: u8 = 0x1E;
pub(crate) const CMD_HEATER_20MW_100MS: u8 = 0x15;

/// Every answer from the sensor is two 16-bit words, each followed by its CRC byte.
pub(crate) const FRAME_LEN: usize = 6;

/// Conversion time in polls (at the nominal 1 kHz poll rate, milliseconds) per command class.
pub(crate) const POLLS_HIGH_PRECISION: u16 = 8;
pub(crate) const POLLS_MEDIUM_PRECISION: u16 = 4;
pub(crate) const POLLS_LOW_PRECISION: u16 = 2;
pub(crate) const POLLS_HEATER_1S: u16 = 1100;
pub(crate) const POLLS_HEATER_100MS: u16 = 110;
/// Commands without a conversion phase (serial number read) still get one poll of grace.
pub(crate) const POLLS_DEFAULT: u16 = 1;

/// Cached temperature before the first successful measurement.
pub(crate) const TEMPERATURE_SENTINEL_C: f32 = -273.15;
/// Cached relative humidity before the first successful measurement.
pub(crate) const HUMIDITY_SENTINEL_PERCENT: f32 = -1.0;

/// Convert a raw humidity register value to percent relative humidity.
///
/// The result is not clamped: calibration can push readings slightly outside the physical
/// [0, 100] range, and the datasheet only considers such excursions meaningful when comparing
/// distributions between sensors. Clamping, if wanted, is the caller's call.
pub fn raw_humidity_to_percent(raw: u16) -> f32 {
    (raw as f32) * 125.0 / 65535.0 - 6.0
}

/// Convert a raw temperature register value to degrees Celsius. Not clamped.
pub fn raw_temp_to_celsius(raw: u16) -> f32 {
    (raw as f32) * 175.0 / 65535.0 - 45.0
}

/// Convert a temperature in degrees Celsius to degrees Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    32.0 + celsius * 9.0 / 5.0
}

/// Assemble the serial number from a validated 6-byte frame.
///
/// The frame carries the two serial words big-endian at bytes [0,1] and [3,4]; bytes 2 and 5
/// are their CRCs and do not contribute.
pub(crate) fn serial_number_from_frame(frame: &[u8; FRAME_LEN]) -> u32 {
    (frame[0] as u32) << 24 | (frame[1] as u32) << 16 | (frame[3] as u32) << 8 | frame[4] as u32
}

/// Extract the raw big-endian temperature word (bytes [0,1]) from a validated frame.
pub(crate) fn raw_temp_from_frame(frame: &[u8; FRAME_LEN]) -> u16 {
    (frame[0] as u16) << 8 | frame[1] as u16
}

/// Extract the raw big-endian humidity word (bytes [3,4]) from a validated frame.
pub(crate) fn raw_humidity_from_frame(frame: &[u8; FRAME_LEN]) -> u16 {
    (frame[3] as u16) << 8 | frame[4] as u16
}
