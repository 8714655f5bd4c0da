//! The transport seam between the driver and the physical two-wire bus.

/// A non-blocking two-wire bus serviced by DMA or interrupts.
///
/// [`write`](Bus::write) and [`read`](Bus::read) only *initiate* a transfer: their return value
/// says whether the peripheral accepted the request, not whether the bytes moved. Completion is
/// observed later through [`is_writing`](Bus::is_writing) / [`is_reading`](Bus::is_reading)
/// going false, at which point [`is_failed`](Bus::is_failed) reports the outcome of that
/// transfer and, for reads, [`received_data`](Bus::received_data) exposes the payload.
///
/// Implementations typically wrap a vendor HAL's DMA- or interrupt-driven I²C peripheral. The
/// driver issues at most one transfer at a time and never initiates a new one while either
/// probe reports a transfer in progress.
pub trait Bus {
    /// Error reported when the peripheral rejects a transfer request.
    type Error;

    /// Initiate a write of `bytes` to the device at `address`.
    ///
    /// `stop` requests a stop condition after the last byte (the SHT40 is always addressed
    /// with single complete transactions, so this driver passes `true`).
    fn write(&mut self, address: u8, bytes: &[u8], stop: bool) -> Result<(), Self::Error>;

    /// Initiate a read of `len` bytes from the device at `address`.
    fn read(&mut self, address: u8, len: usize) -> Result<(), Self::Error>;

    /// Whether a read transfer is still in progress.
    fn is_reading(&self) -> bool;

    /// Whether a write transfer is still in progress.
    fn is_writing(&self) -> bool;

    /// Whether the most recently completed transfer ended in error.
    fn is_failed(&self) -> bool;

    /// The payload of the last completed read.
    ///
    /// Only valid between the completion of a read and the initiation of the next transfer.
    fn received_data(&self) -> &[u8];
}
