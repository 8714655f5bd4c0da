use crate::hw_def::*;

#[cfg(feature = "defmt")]
use defmt::Format;

/// SHT40 device driver.
///
/// The driver owns its [`Bus`](crate::Bus) handle and a record of the last decoded readings.
/// It is single-owner state: command methods and [`poll`](Sht40::poll) must be called from the
/// same execution context (or be externally serialized).
#[derive(Debug)]
pub struct Sht40<B> {
    pub(crate) bus: B,
    pub(crate) address: u8,
    pub(crate) phase: Phase,
    pub(crate) errors: u32,
    pub(crate) serial_number: u32,
    pub(crate) temperature_c: f32,
    pub(crate) humidity: f32,
}

/// All possible errors in this crate.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub enum Error<E> {
    /// The bus peripheral rejected the transfer request.
    Bus(E),
    /// The device address given at construction was zero.
    InvalidAddress,
    /// A measurement or serial-number cycle is still outstanding.
    Busy,
}

/// Measurement command selecting precision, or a heater pulse followed by a high-precision
/// measurement.
///
/// Precision refers to the repeatability of consecutive measurements in constant conditions;
/// the sensor's accuracy is fixed. Heater modes dissipate condensation by driving the internal
/// heating element at the given power for the given duration, then measure at high precision
/// just before the heater switches off.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// High repeatability, ~8 ms conversion.
    HighPrecision,
    /// Medium repeatability, ~4 ms conversion.
    MediumPrecision,
    /// Low repeatability, ~2 ms conversion.
    LowPrecision,
    /// Heater at 200 mW for 1 s.
    Heater200mw1s,
    /// Heater at 200 mW for 0.1 s.
    Heater200mw100ms,
    /// Heater at 110 mW for 1 s.
    Heater110mw1s,
    /// Heater at 110 mW for 0.1 s.
    Heater110mw100ms,
    /// Heater at 20 mW for 1 s.
    Heater20mw1s,
    /// Heater at 20 mW for 0.1 s.
    Heater20mw100ms,
}

impl Mode {
    /// The command code written to the sensor for this mode.
    pub fn code(self) -> u8 {
        match self {
            Mode::HighPrecision => CMD_MEASURE_HIGH_PRECISION,
            Mode::MediumPrecision => CMD_MEASURE_MEDIUM_PRECISION,
            Mode::LowPrecision => CMD_MEASURE_LOW_PRECISION,
            Mode::Heater200mw1s => CMD_HEATER_200MW_1S,
            Mode::Heater200mw100ms => CMD_HEATER_200MW_100MS,
            Mode::Heater110mw1s => CMD_HEATER_110MW_1S,
            Mode::Heater110mw100ms => CMD_HEATER_110MW_100MS,
            Mode::Heater20mw1s => CMD_HEATER_20MW_1S,
            Mode::Heater20mw100ms => CMD_HEATER_20MW_100MS,
        }
    }

    /// Look up the mode for a raw command code.
    ///
    /// Returns `None` for anything that is not one of the nine measurement codes — in
    /// particular for the serial-number (0x89) and soft-reset (0x94) codes, which must go
    /// through their dedicated driver methods.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CMD_MEASURE_HIGH_PRECISION => Some(Mode::HighPrecision),
            CMD_MEASURE_MEDIUM_PRECISION => Some(Mode::MediumPrecision),
            CMD_MEASURE_LOW_PRECISION => Some(Mode::LowPrecision),
            CMD_HEATER_200MW_1S => Some(Mode::Heater200mw1s),
            CMD_HEATER_200MW_100MS => Some(Mode::Heater200mw100ms),
            CMD_HEATER_110MW_1S => Some(Mode::Heater110mw1s),
            CMD_HEATER_110MW_100MS => Some(Mode::Heater110mw100ms),
            CMD_HEATER_20MW_1S => Some(Mode::Heater20mw1s),
            CMD_HEATER_20MW_100MS => Some(Mode::Heater20mw100ms),
            _ => None,
        }
    }

    /// Worst-case conversion time for this mode, in polls at the nominal 1 kHz rate.
    pub(crate) fn conversion_polls(self) -> u16 {
        match self {
            Mode::HighPrecision => POLLS_HIGH_PRECISION,
            Mode::MediumPrecision => POLLS_MEDIUM_PRECISION,
            Mode::LowPrecision => POLLS_LOW_PRECISION,
            Mode::Heater200mw1s | Mode::Heater110mw1s | Mode::Heater20mw1s => POLLS_HEATER_1S,
            Mode::Heater200mw100ms | Mode::Heater110mw100ms | Mode::Heater20mw100ms => {
                POLLS_HEATER_100MS
            }
        }
    }
}

/// A command with a read-back phase, as tracked across polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    ReadSerialNumber,
    Measure(Mode),
}

impl Command {
    pub(crate) fn code(self) -> u8 {
        match self {
            Command::ReadSerialNumber => CMD_READ_SERIAL_NUMBER,
            Command::Measure(mode) => mode.code(),
        }
    }

    pub(crate) fn conversion_polls(self) -> u16 {
        match self {
            Command::ReadSerialNumber => POLLS_DEFAULT,
            Command::Measure(mode) => mode.conversion_polls(),
        }
    }
}

/// Where the driver is within a command cycle.
///
/// The command travels inside the active variants, so "a transfer pending with no command
/// outstanding" and similar contradictions cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// No command outstanding.
    Idle,
    /// Command written; counting polls until the sensor's conversion time has elapsed.
    AwaitingConversion { command: Command, elapsed: u16 },
    /// Read-back issued to the bus; waiting for the transfer to complete.
    AwaitingTransfer { command: Command },
}
