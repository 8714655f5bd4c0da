use crate::bus::Bus;
use crate::hw_def::*;
use crate::types::*;

use crc::{CRC_8_NRSC_5, Crc};

#[cfg(feature = "defmt")]
use defmt::{trace, warn};
#[cfg(feature = "log")]
use log::{trace, warn};
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

impl<B, E> Sht40<B>
where
    B: Bus<Error = E>,
{
    /// Create a new SHT40 driver instance for the device at `address` on `bus`.
    ///
    /// The SHT40 answers on 0x44 (SHT4x-Axxx product numbers) or 0x45 (SHT4x-Bxxx); a zero
    /// address is rejected. Temperature and humidity read back as the "never measured"
    /// sentinels (−273.15 °C, −1 %RH) until a measurement cycle completes.
    pub fn new(bus: B, address: u8) -> Result<Self, Error<E>> {
        if address == 0 {
            return Err(Error::InvalidAddress);
        }
        Ok(Self {
            bus,
            address,
            phase: Phase::Idle,
            errors: 0,
            serial_number: 0,
            temperature_c: TEMPERATURE_SENTINEL_C,
            humidity: HUMIDITY_SENTINEL_PERCENT,
        })
    }

    /// Write a one-byte command. `follow_up` carries the command identity into the conversion
    /// wait when the sensor will answer with a frame; `None` means fire-and-forget.
    fn send_command(&mut self, code: u8, follow_up: Option<Command>) -> Result<(), Error<E>> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(Error::Busy);
        }

        self.bus
            .write(self.address, &[code], true)
            .map_err(Error::Bus)?;
        trace!("sht40: command {:#x} accepted by bus", code);

        if let Some(command) = follow_up {
            self.phase = Phase::AwaitingConversion {
                command,
                elapsed: 0,
            };
        }
        Ok(())
    }

    /// Dispatch a command that the sensor answers with a frame, so the command's own code is
    /// the one the read-back cycle gets tagged with.
    fn start_cycle(&mut self, command: Command) -> Result<(), Error<E>> {
        self.send_command(command.code(), Some(command))
    }

    /// Start reading the unique 32-bit serial number.
    ///
    /// The result is picked up by [`poll`](Self::poll) and cached for
    /// [`serial_number`](Self::serial_number).
    pub fn read_serial_number(&mut self) -> Result<(), Error<E>> {
        self.start_cycle(Command::ReadSerialNumber)
    }

    /// Trigger a soft reset of the sensor.
    ///
    /// Fire-and-forget: the sensor sends no answer, so no read-back cycle is started and the
    /// driver stays idle.
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(CMD_SOFT_RESET, None)
    }

    /// Start a measurement in the given mode.
    ///
    /// Fails with [`Error::Busy`] while a previous cycle is outstanding. The decoded values
    /// are picked up by [`poll`](Self::poll) and cached for the accessors.
    pub fn measure(&mut self, mode: Mode) -> Result<(), Error<E>> {
        self.start_cycle(Command::Measure(mode))
    }

    /// Advance the driver. Call from a periodic context, nominally once per millisecond.
    ///
    /// While a command is outstanding this counts down the sensor's conversion time, then
    /// initiates the 6-byte read-back, then consumes the completed transfer exactly once:
    /// the frame is checksum-validated and decoded into the cached readings. Polls while the
    /// bus reports a transfer in progress do nothing. A rejected read-back request or a failed
    /// transfer abandons the cycle, keeping the previously cached values.
    pub fn poll(&mut self) {
        if matches!(self.phase, Phase::Idle) {
            return;
        }
        if self.bus.is_reading() || self.bus.is_writing() {
            return;
        }

        match self.phase {
            Phase::Idle => {}
            Phase::AwaitingConversion { command, elapsed } => {
                let elapsed = elapsed + 1;
                if elapsed >= command.conversion_polls() {
                    match self.bus.read(self.address, FRAME_LEN) {
                        Ok(()) => self.phase = Phase::AwaitingTransfer { command },
                        Err(_) => {
                            warn!("sht40: read-back request rejected, cycle abandoned");
                            self.phase = Phase::Idle;
                        }
                    }
                } else {
                    self.phase = Phase::AwaitingConversion { command, elapsed };
                }
            }
            Phase::AwaitingTransfer { command } => {
                // Consume exactly once, whatever the outcome.
                self.phase = Phase::Idle;
                self.consume_transfer(command);
            }
        }
    }

    fn consume_transfer(&mut self, command: Command) {
        if self.bus.is_failed() {
            warn!("sht40: read-back transfer failed, keeping previous values");
            return;
        }

        let received = self.bus.received_data();
        if received.len() < FRAME_LEN {
            warn!("sht40: short read-back, keeping previous values");
            return;
        }
        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(&received[..FRAME_LEN]);

        if !self.validate_frame(&frame) {
            return;
        }

        match command {
            Command::ReadSerialNumber => {
                self.serial_number = serial_number_from_frame(&frame);
                trace!("sht40: serial number {:#x}", self.serial_number);
            }
            Command::Measure(_) => {
                self.temperature_c = raw_temp_to_celsius(raw_temp_from_frame(&frame));
                self.humidity = raw_humidity_to_percent(raw_humidity_from_frame(&frame));
            }
        }
    }

    /// Check both `data,data,crc` triplets of a frame. Any mismatch discards the frame whole
    /// and bumps the error counter once; neither half is trusted on its own.
    fn validate_frame(&mut self, frame: &[u8; FRAME_LEN]) -> bool {
        for word in frame.chunks_exact(3) {
            if CRC.checksum(&word[..2]) != word[2] {
                warn!("sht40: frame checksum mismatch, frame discarded");
                self.errors += 1;
                return false;
            }
        }
        true
    }

    /// Whether a command cycle is outstanding.
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Last decoded relative humidity in percent; −1.0 until the first successful measurement.
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    /// Last decoded temperature in degrees Celsius; −273.15 until the first successful
    /// measurement.
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature_c
    }

    /// Last decoded temperature in degrees Fahrenheit, derived from the cached Celsius value.
    pub fn temperature_fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature_c)
    }

    /// Last successfully read serial number; 0 until [`read_serial_number`](Self::read_serial_number)
    /// completes.
    pub fn serial_number(&self) -> u32 {
        self.serial_number
    }

    /// Running count of frames discarded for checksum mismatch.
    pub fn error_count(&self) -> u32 {
        self.errors
    }

    /// Release the bus handle, consuming the driver.
    pub fn release(self) -> B {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    const ADDR: u8 = 0x44;

    /// Scripted stand-in for a DMA-backed bus. Transfers complete instantly between polls
    /// unless a test holds `writing`/`reading` high or scripts a rejection or failure.
    #[derive(Debug, Default)]
    struct FakeBus {
        writes: Vec<(u8, Vec<u8>, bool)>,
        read_requests: Vec<(u8, usize)>,
        frame: Vec<u8>,
        reject_writes: bool,
        reject_reads: bool,
        writing: bool,
        reading: bool,
        failed: bool,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Rejected;

    impl Bus for FakeBus {
        type Error = Rejected;

        fn write(&mut self, address: u8, bytes: &[u8], stop: bool) -> Result<(), Rejected> {
            if self.reject_writes {
                return Err(Rejected);
            }
            self.writes.push((address, bytes.to_vec(), stop));
            Ok(())
        }

        fn read(&mut self, address: u8, len: usize) -> Result<(), Rejected> {
            if self.reject_reads {
                return Err(Rejected);
            }
            self.read_requests.push((address, len));
            Ok(())
        }

        fn is_reading(&self) -> bool {
            self.reading
        }

        fn is_writing(&self) -> bool {
            self.writing
        }

        fn is_failed(&self) -> bool {
            self.failed
        }

        fn received_data(&self) -> &[u8] {
            &self.frame
        }
    }

    fn driver() -> Sht40<FakeBus> {
        Sht40::new(FakeBus::default(), ADDR).unwrap()
    }

    fn measurement_frame(temp_raw: u16, hum_raw: u16) -> Vec<u8> {
        let t = temp_raw.to_be_bytes();
        let h = hum_raw.to_be_bytes();
        vec![t[0], t[1], CRC.checksum(&t), h[0], h[1], CRC.checksum(&h)]
    }

    fn serial_frame(word_a: u16, word_b: u16) -> Vec<u8> {
        let a = word_a.to_be_bytes();
        let b = word_b.to_be_bytes();
        vec![a[0], a[1], CRC.checksum(&a), b[0], b[1], CRC.checksum(&b)]
    }

    #[test]
    fn crc_matches_datasheet_vector() {
        // SHT4x datasheet: crc(0xBE, 0xEF) == 0x92
        assert_eq!(CRC.checksum(&[0xBE, 0xEF]), 0x92);
        assert_eq!(CRC.checksum(&[0xBE, 0xEF]), CRC.checksum(&[0xBE, 0xEF]));
    }

    #[test]
    fn construction_rejects_zero_address() {
        assert!(matches!(
            Sht40::new(FakeBus::default(), 0),
            Err(Error::InvalidAddress)
        ));
    }

    #[test]
    fn mode_codes_round_trip_and_reserved_codes_are_rejected() {
        assert_eq!(Mode::from_code(0xFD), Some(Mode::HighPrecision));
        assert_eq!(Mode::from_code(0xF6), Some(Mode::MediumPrecision));
        assert_eq!(Mode::from_code(0x15), Some(Mode::Heater20mw100ms));
        // serial-number and soft-reset codes are not measurement modes
        assert_eq!(Mode::from_code(0x89), None);
        assert_eq!(Mode::from_code(0x94), None);
        assert_eq!(Mode::from_code(0x00), None);
    }

    #[test]
    fn dispatch_writes_single_command_byte() {
        let mut sht = driver();
        sht.measure(Mode::HighPrecision).unwrap();
        assert_eq!(sht.bus.writes, vec![(ADDR, vec![0xFD], true)]);
        assert!(sht.is_busy());
    }

    #[test]
    fn dispatch_while_busy_fails_and_leaves_cycle_untouched() {
        let mut sht = driver();
        sht.measure(Mode::HighPrecision).unwrap();

        assert!(matches!(sht.measure(Mode::LowPrecision), Err(Error::Busy)));
        assert!(matches!(sht.read_serial_number(), Err(Error::Busy)));
        assert!(matches!(sht.soft_reset(), Err(Error::Busy)));

        // no second write went out and the original cycle still runs to its own threshold
        assert_eq!(sht.bus.writes.len(), 1);
        assert_eq!(
            sht.phase,
            Phase::AwaitingConversion {
                command: Command::Measure(Mode::HighPrecision),
                elapsed: 0
            }
        );
    }

    #[test]
    fn rejected_write_propagates_and_stays_idle() {
        let mut sht = driver();
        sht.bus.reject_writes = true;
        assert!(matches!(
            sht.measure(Mode::MediumPrecision),
            Err(Error::Bus(Rejected))
        ));
        assert!(!sht.is_busy());
    }

    #[test]
    fn soft_reset_is_fire_and_forget() {
        let mut sht = driver();
        sht.soft_reset().unwrap();
        assert_eq!(sht.bus.writes, vec![(ADDR, vec![0x94], true)]);
        assert!(!sht.is_busy());

        sht.poll();
        assert!(sht.bus.read_requests.is_empty());
    }

    #[test]
    fn read_back_starts_exactly_at_the_conversion_threshold() {
        let mut sht = driver();
        sht.measure(Mode::HighPrecision).unwrap();

        for _ in 0..7 {
            sht.poll();
        }
        assert!(sht.bus.read_requests.is_empty());

        sht.poll();
        assert_eq!(sht.bus.read_requests, vec![(ADDR, 6)]);
    }

    #[test]
    fn heater_short_pulse_waits_110_polls() {
        let mut sht = driver();
        sht.measure(Mode::Heater200mw100ms).unwrap();

        for _ in 0..109 {
            sht.poll();
        }
        assert!(sht.bus.read_requests.is_empty());

        sht.poll();
        assert_eq!(sht.bus.read_requests, vec![(ADDR, 6)]);
    }

    #[test]
    fn medium_precision_waits_4_polls() {
        let mut sht = driver();
        sht.measure(Mode::MediumPrecision).unwrap();

        for _ in 0..3 {
            sht.poll();
        }
        assert!(sht.bus.read_requests.is_empty());

        sht.poll();
        assert_eq!(sht.bus.read_requests, vec![(ADDR, 6)]);
    }

    #[test]
    fn heater_long_pulse_waits_1100_polls() {
        let mut sht = driver();
        sht.measure(Mode::Heater20mw1s).unwrap();

        for _ in 0..1099 {
            sht.poll();
        }
        assert!(sht.bus.read_requests.is_empty());

        sht.poll();
        assert_eq!(sht.bus.read_requests, vec![(ADDR, 6)]);
    }

    #[test]
    fn polls_while_bus_transfer_in_flight_do_not_advance_the_wait() {
        let mut sht = driver();
        sht.measure(Mode::LowPrecision).unwrap();

        // command byte still going out on the wire
        sht.bus.writing = true;
        for _ in 0..10 {
            sht.poll();
        }
        assert!(sht.bus.read_requests.is_empty());

        // once the write completes, the 2-poll wait starts from scratch
        sht.bus.writing = false;
        sht.poll();
        assert!(sht.bus.read_requests.is_empty());
        sht.poll();
        assert_eq!(sht.bus.read_requests.len(), 1);
    }

    #[test]
    fn measurement_cycle_decodes_temperature_and_humidity() {
        let mut sht = driver();
        sht.bus.frame = measurement_frame(0x6000, 0x6000);
        sht.measure(Mode::HighPrecision).unwrap();

        for _ in 0..8 {
            sht.poll();
        }
        assert_eq!(sht.bus.read_requests.len(), 1);
        assert!(sht.is_busy());

        // transfer completed successfully before the next poll
        sht.poll();
        assert!(!sht.is_busy());
        assert_eq!(sht.error_count(), 0);

        let expected_t = 0x6000 as f32 * 175.0 / 65535.0 - 45.0;
        let expected_rh = 0x6000 as f32 * 125.0 / 65535.0 - 6.0;
        assert!(approx_eq!(
            f32,
            sht.temperature_celsius(),
            expected_t,
            epsilon = 1e-3
        ));
        assert!(approx_eq!(f32, sht.humidity(), expected_rh, epsilon = 1e-3));
        assert!(approx_eq!(
            f32,
            sht.temperature_fahrenheit(),
            32.0 + expected_t * 9.0 / 5.0,
            epsilon = 1e-3
        ));
    }

    #[test]
    fn corrupted_checksum_discards_frame_and_counts_one_error() {
        let mut sht = driver();
        let mut frame = measurement_frame(0x6000, 0x6000);
        frame[2] ^= 0xFF;
        sht.bus.frame = frame;

        sht.measure(Mode::LowPrecision).unwrap();
        for _ in 0..3 {
            sht.poll();
        }

        assert!(!sht.is_busy());
        assert_eq!(sht.error_count(), 1);
        // cached values untouched: still the "never measured" sentinels
        assert!(approx_eq!(f32, sht.temperature_celsius(), -273.15));
        assert!(approx_eq!(f32, sht.humidity(), -1.0));
    }

    #[test]
    fn serial_number_cycle_assembles_big_endian_word() {
        let mut sht = driver();
        sht.bus.frame = serial_frame(0x4A21, 0x8F0C);

        sht.read_serial_number().unwrap();
        assert_eq!(sht.bus.writes, vec![(ADDR, vec![0x89], true)]);

        // one poll of wait, then the read-back, then the decode
        sht.poll();
        assert_eq!(sht.bus.read_requests, vec![(ADDR, 6)]);
        sht.poll();

        assert!(!sht.is_busy());
        assert_eq!(sht.serial_number(), 0x4A21_8F0C);
        assert_eq!(sht.error_count(), 0);
    }

    #[test]
    fn rejected_read_back_abandons_the_cycle() {
        let mut sht = driver();
        sht.bus.reject_reads = true;
        sht.measure(Mode::LowPrecision).unwrap();

        sht.poll();
        assert!(sht.is_busy());
        sht.poll();
        assert!(!sht.is_busy());

        // driver is immediately reusable
        sht.bus.reject_reads = false;
        sht.measure(Mode::LowPrecision).unwrap();
        assert_eq!(sht.bus.writes.len(), 2);
    }

    #[test]
    fn failed_transfer_is_absorbed_without_touching_values() {
        let mut sht = driver();
        sht.bus.frame = measurement_frame(0x6000, 0x6000);
        sht.bus.failed = true;

        sht.measure(Mode::LowPrecision).unwrap();
        for _ in 0..3 {
            sht.poll();
        }

        assert!(!sht.is_busy());
        assert_eq!(sht.error_count(), 0);
        assert!(approx_eq!(f32, sht.temperature_celsius(), -273.15));
        assert!(approx_eq!(f32, sht.humidity(), -1.0));
    }

    #[test]
    fn short_payload_is_treated_as_a_failed_transfer() {
        let mut sht = driver();
        sht.bus.frame = vec![0x60, 0x00];

        sht.read_serial_number().unwrap();
        sht.poll();
        sht.poll();

        assert!(!sht.is_busy());
        assert_eq!(sht.serial_number(), 0);
        assert_eq!(sht.error_count(), 0);
    }

    #[test]
    fn poll_without_outstanding_command_is_a_no_op() {
        let mut sht = driver();
        sht.poll();
        assert!(sht.bus.read_requests.is_empty());
        assert!(!sht.is_busy());
    }
}
