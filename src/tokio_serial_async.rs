//! Asynchronous BMS poll client built on Tokio and `tokio-serial`.
//!
//! # Example
//!
//! ```no_run
//! use deltaq_lib::tokio_serial_async::{BmsClient, Error};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut bms = BmsClient::new("/dev/ttyUSB0")?;
//!     bms.set_timeout(Duration::from_secs(1));
//!
//!     let status = bms.get_status().await?;
//!     println!("SOC: {}%", status.soc_pct);
//!     Ok(())
//! }
//! ```

use crate::bms::{BmsStatus, BAUD_RATE, MINIMUM_DELAY, STATUS_REPLY_LEN, STATUS_REQUEST};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;

/// Errors specific to the asynchronous Tokio serial port client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error, typically from the serial port communication.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// An error from the `tokio-serial` crate.
    #[error("Tokio serial error: {0}")]
    TokioSerial(#[from] tokio_serial::Error),
    /// An error indicating that a Tokio timeout elapsed during an I/O operation.
    #[error("Tokio timeout elapsed: {0}")]
    TokioElapsed(#[from] tokio::time::error::Elapsed),
}

type Result<T> = std::result::Result<T, Error>;

/// Asynchronous poll client for the serial BMS.
#[derive(Debug)]
pub struct BmsClient {
    serial: tokio_serial::SerialStream,
    last_execution: Instant,
    io_timeout: Duration,
    delay: Duration,
    retries: u8,
}

impl BmsClient {
    pub fn new(port: &str) -> Result<Self> {
        Ok(Self {
            serial: tokio_serial::new(port, BAUD_RATE)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()?,
            last_execution: Instant::now(),
            io_timeout: Duration::from_secs(1),
            delay: MINIMUM_DELAY,
            retries: 3,
        })
    }

    /// Timeout applied to each individual read or write.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.io_timeout = timeout;
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Duration::max(delay, MINIMUM_DELAY);
    }

    pub fn set_retries(&mut self, retries: u8) {
        self.retries = retries;
    }

    async fn await_delay(&self) {
        let last_exec_diff = Instant::now().duration_since(self.last_execution);
        if let Some(time_until_delay_reached) = self.delay.checked_sub(last_exec_diff) {
            tokio::time::sleep(time_until_delay_reached).await;
        }
    }

    async fn send_and_receive(&mut self) -> Result<[u8; STATUS_REPLY_LEN]> {
        self.await_delay().await;
        tokio::time::timeout(self.io_timeout, self.serial.write_all(&STATUS_REQUEST)).await??;

        let mut rx_buffer = [0u8; STATUS_REPLY_LEN];
        tokio::time::timeout(self.io_timeout, self.serial.read_exact(&mut rx_buffer)).await??;
        self.last_execution = Instant::now();
        log::trace!("receive_bytes: {:02X?}", rx_buffer);
        Ok(rx_buffer)
    }

    /// Poll the BMS once, retrying transient I/O failures.
    pub async fn get_status(&mut self) -> Result<BmsStatus> {
        for t in 0..self.retries {
            match self.send_and_receive().await {
                Ok(rx_buffer) => return Ok(BmsStatus::decode(&rx_buffer)),
                Err(err) => {
                    log::trace!("Failed try {} of {}, repeating ({err})", t + 1, self.retries);
                }
            }
        }
        Ok(BmsStatus::decode(&self.send_and_receive().await?))
    }
}
