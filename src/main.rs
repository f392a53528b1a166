use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{ops::Deref, panic};

mod commandline;
mod daemon;
mod mqtt;

use commandline::{CliArgs, CliCommands};
use deltaq_lib::bms::BmsStatus;
use deltaq_lib::protocol;
use deltaq_lib::serialport::BmsClient;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn parse_payload(hex: &str) -> Result<Vec<u8>> {
    let cleaned: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        bail!("payload hex must have an even number of digits");
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &cleaned[i..i + 2]))
        })
        .collect()
}

fn print_status(status: &BmsStatus) {
    println!(
        "Pack: {:.1} V  {:.1} A  SOC {}%",
        status.pack_voltage_v, status.pack_current_a, status.soc_pct
    );
    println!(
        "Charge MOS: {}  Discharge MOS: {}  Balancing: {}",
        status.charge_mos_status, status.discharge_mos_status, status.balance_status
    );
}

fn print_cells(status: &BmsStatus) {
    for (i, voltage) in status.cell_voltages_v.iter().enumerate() {
        println!("Cell {:2}: {:.3} V", i + 1, voltage);
    }
    println!(
        "Highest: cell {} at {:.3} V",
        status.high_cell_num, status.high_cell_voltage_v
    );
    println!(
        "Lowest:  cell {} at {:.3} V",
        status.low_cell_num, status.low_cell_voltage_v
    );
}

fn print_temperatures(status: &BmsStatus) {
    println!("MOS temperature (raw): {}", status.mos_temperature_raw);
    println!(
        "Balance temperature (raw): {}",
        status.balance_temperature_raw
    );
    for (i, temp) in status.external_temperatures_raw.iter().enumerate() {
        println!("External sensor {} (raw): {}", i + 1, temp);
    }
}

fn print_capacity(status: &BmsStatus) {
    println!("Physical capacity:  {:.3} Ah", status.physical_capacity_ah);
    println!("Remaining capacity: {:.3} Ah", status.remaining_capacity_ah);
    println!("Cyclic capacity:    {:.3} Ah", status.cyclic_capacity_ah);
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    // The serial port is only opened for commands that talk to the BMS.
    let connect = || -> Result<BmsClient> {
        let mut bms = BmsClient::new(&args.device)
            .with_context(|| format!("Cannot open serial port '{}'", args.device))?;
        bms.set_timeout(args.timeout)?;
        bms.set_delay(args.delay);
        Ok(bms)
    };

    match args.command {
        CliCommands::DecodeFrame { id, ref data } => {
            let payload = parse_payload(data)?;
            match protocol::decode_frame(id, &payload) {
                Ok(message) => println!("{message:#?}"),
                Err(e) => println!("Not decoded: {e}"),
            }
        }
        CliCommands::FaultCode { code } => println!("{}", protocol::fault_code_text(code)),
        CliCommands::Status => print_status(
            &connect()?
                .get_status()
                .with_context(|| "Cannot get BMS status")?,
        ),
        CliCommands::Cells => print_cells(
            &connect()?
                .get_status()
                .with_context(|| "Cannot get BMS status")?,
        ),
        CliCommands::Temperatures => print_temperatures(
            &connect()?
                .get_status()
                .with_context(|| "Cannot get BMS status")?,
        ),
        CliCommands::Capacity => print_capacity(
            &connect()?
                .get_status()
                .with_context(|| "Cannot get BMS status")?,
        ),
        CliCommands::All => {
            let status = connect()?
                .get_status()
                .with_context(|| "Cannot get BMS status")?;
            print_status(&status);
            print_cells(&status);
            print_temperatures(&status);
            print_capacity(&status);
        }
        CliCommands::Daemon {
            ref output,
            interval,
            ref metrics,
        } => daemon::run(connect()?, output.clone(), interval, metrics.clone())?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_payload;

    #[test]
    fn parse_payload_accepts_hex_with_spaces() {
        assert_eq!(
            parse_payload("00 01 4C FF").unwrap(),
            vec![0x00, 0x01, 0x4C, 0xFF]
        );
        assert_eq!(parse_payload("0001").unwrap(), vec![0x00, 0x01]);
    }

    #[test]
    fn parse_payload_rejects_bad_input() {
        assert!(parse_payload("001").is_err());
        assert!(parse_payload("zz").is_err());
    }
}
