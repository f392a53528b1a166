use crate::bms::{BmsStatus, BAUD_RATE, MINIMUM_DELAY, STATUS_REPLY_LEN, STATUS_REQUEST};
use crate::Error;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Synchronous poll client for the serial BMS.
#[derive(Debug)]
pub struct BmsClient {
    serial: Box<dyn serialport::SerialPort>,
    last_execution: Instant,
    delay: Duration,
}

impl BmsClient {
    pub fn new(port: &str) -> Result<Self, Error> {
        Ok(Self {
            serial: serialport::new(port, BAUD_RATE)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .open()
                .map_err(std::io::Error::from)?,
            last_execution: Instant::now(),
            delay: MINIMUM_DELAY,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        self.serial
            .set_timeout(timeout)
            .map_err(std::io::Error::from)?;
        Ok(())
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Duration::max(delay, MINIMUM_DELAY);
    }

    fn await_delay(&self) {
        let last_exec_diff = Instant::now().duration_since(self.last_execution);
        if let Some(time_until_delay_reached) = self.delay.checked_sub(last_exec_diff) {
            std::thread::sleep(time_until_delay_reached);
        }
    }

    fn send_request(&mut self) -> Result<(), Error> {
        // clear all incoming serial to avoid data collision
        loop {
            let pending = self.serial.bytes_to_read().map_err(std::io::Error::from)?;
            if pending == 0 {
                break;
            }
            log::trace!("Got {} pending bytes", pending);
            let mut buf: Vec<u8> = vec![0; 64];
            let received = self.serial.read(buf.as_mut_slice())?;
            log::trace!("Read {} pending bytes", received);
        }
        self.await_delay();
        self.serial.write_all(&STATUS_REQUEST)?;
        Ok(())
    }

    /// Poll the BMS once and decode its status reply.
    pub fn get_status(&mut self) -> Result<BmsStatus, Error> {
        self.send_request()?;
        let mut rx_buffer = [0u8; STATUS_REPLY_LEN];
        self.serial.read_exact(&mut rx_buffer)?;
        self.last_execution = Instant::now();
        log::trace!("receive_bytes: {:02X?}", rx_buffer);
        Ok(BmsStatus::decode(&rx_buffer))
    }
}
