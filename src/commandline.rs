use crate::mqtt;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Show a BMS summary: pack voltage, current, SOC and MOS/balance states
    Status,
    /// Show individual cell voltages with the highest/lowest cell marked
    Cells,
    /// Show the raw temperature words reported by the BMS sensors
    Temperatures,
    /// Show physical, remaining and cyclic capacity
    Capacity,
    /// Show everything decoded from one BMS status frame
    All,
    /// Decode a single CAN frame given as identifier and hex payload
    DecodeFrame {
        /// CAN identifier (decimal or 0x-prefixed hex, e.g. 0x18A)
        #[arg(value_parser = clap_num::maybe_hex::<u32>)]
        id: u32,
        /// Payload bytes as a hex string (e.g. "00014C005250A001")
        data: String,
    },
    /// Look up the display text for a charger fault code
    FaultCode {
        /// Fault code (decimal or 0x-prefixed hex)
        #[arg(value_parser = clap_num::maybe_hex::<u32>)]
        code: u32,
    },
    /// Run in daemon mode, periodically polling the BMS and outputting metrics
    Daemon {
        /// Output destination for metrics
        #[command(subcommand)]
        output: DaemonOutput,
        /// Interval between BMS polls (e.g., "10s", "1m")
        #[clap(long, short, value_parser = humantime::parse_duration, default_value = "10s")]
        interval: Duration,
        /// Comma-separated list of metrics to report (status,cells,temperatures,capacity or all)
        #[clap(long, short, use_value_delimiter = true, default_value = "status")]
        metrics: Vec<String>,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, PartialEq)]
pub enum MqttFormat {
    Simple,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DaemonOutput {
    /// Continuously read metrics and print them to the standard output (console).
    Console,
    /// Continuously read metrics and publish them to an MQTT broker.
    Mqtt {
        /// The configuration file for the MQTT broker
        #[arg(long, default_value_t = mqtt::MqttConfig::DEFAULT_CONFIG_FILE.to_string())]
        config_file: String,
        /// Output format for MQTT messages
        #[arg(long, value_enum, default_value_t = MqttFormat::Simple)]
        format: MqttFormat,
    },
}

const fn about_text() -> &'static str {
    "delta-q charger / BMS command line tool"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Serial port device path (e.g., /dev/ttyUSB0 on Linux, COM1 on Windows)
    #[arg(short, long, default_value_t = default_device_name())]
    pub device: String,

    #[command(subcommand)]
    pub command: CliCommands,

    /// Timeout for serial I/O operations (e.g., "500ms", "1s", "2s 500ms")
    #[arg(value_parser = humantime::parse_duration, long, default_value = "1s")]
    pub timeout: Duration,

    /// Delay between BMS polls (the BMS needs time to assemble its reply)
    #[arg(value_parser = humantime::parse_duration, long, default_value = "300ms")]
    pub delay: Duration,
}
