//! Delta-Q charger CANopen message set.
//!
//! Every decoder here is a pure function over the frame payload: the frame's
//! declared length is checked against the message minimum before any byte is
//! read, and all multi-byte CAN signals are little-endian (Intel layout) per
//! the charger's DBC. Scale and offset constants are protocol fixtures taken
//! from the DBC signal definitions and must not be changed.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

// ----------------------------- COB identifiers -----------------------------

pub const ID_NMT_START: u32 = 0x000; // Battery -> Charger (2 bytes)
pub const ID_FAULT_REGISTER: u32 = 0x08A; // Charger -> Battery (8 bytes)
pub const ID_TPDO1: u32 = 0x18A; // Charger -> Battery
pub const ID_RPDO1: u32 = 0x20A; // Battery -> Charger
pub const ID_TPDO2: u32 = 0x28A; // Charger -> Battery
pub const ID_RPDO2: u32 = 0x30A; // Battery -> Charger
pub const ID_TPDO3: u32 = 0x38A; // Charger -> Battery
pub const ID_HEARTBEAT_BATTERY: u32 = 0x701; // Battery -> Charger (1 byte)
pub const ID_HEARTBEAT_CHARGER: u32 = 0x70A; // Charger -> Battery (1 byte)

// ------------------------------ signal scales ------------------------------

/// Volts per LSB for battery/charger voltage signals (1/256).
const VOLTAGE_SCALE: f32 = 0.003_906_25;
/// Amps per LSB for measured charging current (1/256).
const CURRENT_SCALE: f32 = 0.003_906_25;
/// Amps per LSB for the battery's current request (1/16).
const CURRENT_REQUEST_SCALE: f32 = 0.0625;
/// Volts AC per LSB (1/16).
const AC_VOLTAGE_SCALE: f32 = 0.0625;
/// Seconds per LSB of elapsed charge time.
const ELAPSED_TIME_SCALE: f32 = 10.0;
/// Amp-hours per LSB (1/8).
const AH_SCALE: f32 = 0.125;
/// Watt-hours per LSB (1/16).
const WH_SCALE: f32 = 0.0625;
/// Degrees C per LSB of battery temperature (signed raw).
const TEMPERATURE_SCALE: f32 = 0.125;
/// Bias applied after scaling so sub-zero temperatures fit the raw range.
const TEMPERATURE_OFFSET: f32 = -40.0;

// ----------------------------- field assembly ------------------------------

fn le_u16(d: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([d[offset], d[offset + 1]])
}

fn le_i16(d: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([d[offset], d[offset + 1]])
}

fn le_u32(d: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([d[offset], d[offset + 1], d[offset + 2], d[offset + 3]])
}

/// Extract `width` bits of `byte` starting at bit `offset` (LSB first).
macro_rules! read_bits {
    ($byte:expr,$offset:expr,$width:expr) => {
        ($byte >> $offset) & ((1u8 << $width) - 1)
    };
}

fn validate_len(id: u32, data: &[u8], required: usize) -> Result<(), Error> {
    if data.len() < required {
        log::warn!(
            "Frame 0x{:03X} too short - required={} received={}",
            id,
            required,
            data.len()
        );
        return Err(Error::FrameTooShort {
            id,
            required,
            received: data.len(),
        });
    }
    Ok(())
}

// ------------------------------- value tables ------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryStatus {
    Disabled,
    Enabled,
}

impl BatteryStatus {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 1 {
            BatteryStatus::Enabled
        } else {
            BatteryStatus::Disabled
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            BatteryStatus::Disabled => 0,
            BatteryStatus::Enabled => 1,
        }
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatteryStatus::Enabled => write!(f, "Enabled"),
            BatteryStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerHardwareShutdownStatus {
    Running,
    ShutDown,
}

impl fmt::Display for ChargerHardwareShutdownStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChargerHardwareShutdownStatus::ShutDown => write!(f, "Charger hardware has shut down"),
            ChargerHardwareShutdownStatus::Running => write!(f, "Charger is running normally"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerDeratingStatus {
    NotDerating,
    Derating,
}

impl fmt::Display for ChargerDeratingStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChargerDeratingStatus::Derating => write!(f, "Charger is derating output"),
            ChargerDeratingStatus::NotDerating => write!(f, "Charger is not derating"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcConnectionStatus {
    NoAc,
    AcDetected,
}

impl fmt::Display for AcConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AcConnectionStatus::AcDetected => write!(f, "AC Detected"),
            AcConnectionStatus::NoAc => write!(f, "No AC Detected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerStatus {
    Disabled,
    Enabled,
}

impl fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChargerStatus::Enabled => write!(f, "Enabled"),
            ChargerStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideStatus {
    Disabled,
    Enabled,
}

impl fmt::Display for OverrideStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OverrideStatus::Enabled => write!(f, "Enabled"),
            OverrideStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

/// Front-panel charge indication, a 4-bit signal with values 0-7 assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeIndication {
    Inactive,
    LessThan80,
    MoreThan80,
    Finishing,
    Complete,
    Resting,
    Equalize,
    PowerSupplyMode,
    Unknown(u8),
}

impl ChargeIndication {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ChargeIndication::Inactive,
            1 => ChargeIndication::LessThan80,
            2 => ChargeIndication::MoreThan80,
            3 => ChargeIndication::Finishing,
            4 => ChargeIndication::Complete,
            5 => ChargeIndication::Resting,
            6 => ChargeIndication::Equalize,
            7 => ChargeIndication::PowerSupplyMode,
            other => ChargeIndication::Unknown(other),
        }
    }
}

impl fmt::Display for ChargeIndication {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChargeIndication::Inactive => write!(f, "Inactive"),
            ChargeIndication::LessThan80 => write!(f, "Less than 80%"),
            ChargeIndication::MoreThan80 => write!(f, "More than 80%"),
            ChargeIndication::Finishing => write!(f, "Finishing"),
            ChargeIndication::Complete => write!(f, "Complete"),
            ChargeIndication::Resting => write!(f, "Resting"),
            ChargeIndication::Equalize => write!(f, "Equalize"),
            ChargeIndication::PowerSupplyMode => write!(f, "Power Supply Mode"),
            ChargeIndication::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeCycleType {
    NoActiveCycle,
    Charge,
    Description0x2,
    Unknown(u8),
}

impl ChargeCycleType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ChargeCycleType::NoActiveCycle,
            1 => ChargeCycleType::Charge,
            2 => ChargeCycleType::Description0x2,
            other => ChargeCycleType::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            ChargeCycleType::NoActiveCycle => 0,
            ChargeCycleType::Charge => 1,
            ChargeCycleType::Description0x2 => 2,
            ChargeCycleType::Unknown(raw) => *raw,
        }
    }
}

impl fmt::Display for ChargeCycleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChargeCycleType::NoActiveCycle => write!(f, "No Active Cycle"),
            ChargeCycleType::Charge => write!(f, "Charge"),
            ChargeCycleType::Description0x2 => write!(f, "Description for the value '0x2'"),
            ChargeCycleType::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NmtCommand {
    Start,
    Unknown(u8),
}

impl NmtCommand {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => NmtCommand::Start,
            other => NmtCommand::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            NmtCommand::Start => 1,
            NmtCommand::Unknown(raw) => *raw,
        }
    }
}

impl fmt::Display for NmtCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NmtCommand::Start => write!(f, "Start"),
            NmtCommand::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatState {
    Operational,
    PreOperational,
    Unknown(u8),
}

impl HeartbeatState {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            5 => HeartbeatState::Operational,
            127 => HeartbeatState::PreOperational,
            other => HeartbeatState::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            HeartbeatState::Operational => 5,
            HeartbeatState::PreOperational => 127,
            HeartbeatState::Unknown(raw) => *raw,
        }
    }
}

impl fmt::Display for HeartbeatState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HeartbeatState::Operational => write!(f, "Operational"),
            HeartbeatState::PreOperational => write!(f, "Pre-operational"),
            HeartbeatState::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Resolve a charger error code to its display text.
///
/// The pairs come from the Delta-Q DBC value table for `Current_Error` and
/// are shown verbatim to operators; codes missing from the table fall back to
/// a numeric rendering and never fail.
pub fn fault_code_text(code: u32) -> String {
    let text = match code {
        394301440 => "E-0-2-3 High AC voltage error ( >270VAC ) 9000h External error – generic",
        411045888 => "E-0-2-4 Charger failed to initialize 1000h Generic error",
        427855872 => "E-0-2-5 Low AC voltage oscillation error 9000h External error – generic",
        444596224 => "E-0-2-6 USB Script Error 0000h error",
        461373440 => "E-0-2-7 USB Over Current 0000h error",
        478154752 => "E-0-2-8 Incompatible algorithm error 1000h Generic error",
        494964736 => "E-0-2-9 Communication CAN-bus error 9000h External error – generic",
        511738160 => {
            "E-0-3-0 Communication battery module error 8130h Monitoring – Comms – Heartbeat Error"
        }
        528486400 => "E-0-3-1 Reference out of range error 1000h Generic error",
        545292592 => {
            "E-0-3-2 Communication heartbeat lost error 8130h Monitoring – Comms – Heartbeat Error"
        }
        562040832 => "E-0-3-3 Target voltage configuration too high 1000h Generic error",
        578818048 => "E-0-3-4 Battery capacity configuration not set 1000h Generic error",
        595595264 => "E-0-3-5 Target voltage configuration too low 1000h Generic error",
        612405248 => "E-0-3-6 Battery temperature sensor not installed 9000h External error – generic",
        629170176 => "E-0-3-7 CAN Download Failed 6000h SW Generic error",
        645959680 => "E-0-3-8 Fan error 9000h External error – generic",
        662704128 => "E-0-3-9 Button stuck down 1000h Generic error",
        679481344 => "E-0-4-0 Fan Supply Voltage Low 1000h Generic error",
        696279040 => "E-0-4-1 Software Internal Error 6000h SW Generic error",
        713056256 => "E-0-4-2 CAN Configuration Error 6000h SW Generic error",
        729845760 => "E-0-4-3 PDO CRC Error 9000h External error – generic",
        746622976 => "E-0-4-4 PDO Sequence Count Error 9000h External error – generic",
        763400192 => "E-0-4-5 Battery Disconnected Alarm 9000h External error - generic",
        780173840 => "E-0-4-6 Invalid PDO Length 8210h Monitoring – Protocol – PDO Length Error",
        29380608 => "F-0-0-1 Output Stage Error 5000h CANopen Device Hardware",
        46157824 => "F-0-0-2 Input Stage Error 5000h CANopen Device Hardware",
        62935040 => "F-0-0-3 Input Stage Error 5000h CANopen Device Hardware",
        79712256 => "F-0-0-4 Current Measurement Error 5000h CANopen Device Hardware",
        96489472 => {
            "F-0-0-5 DC Output Relay Test Error (High voltage across closed relay) 5000h CANopen Device Hardware"
        }
        1342179008 => "F-0-0-6 Output Current Error 5000h CANopen Device Hardware",
        _ => return format!("Unknown error code: {}", code),
    };
    text.to_string()
}

// -------------------------------- messages ---------------------------------

/// RPDO2 @ 0x30A: battery measurements mirrored to the charger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rpdo2 {
    pub charging_current_a: f32,
    pub battery_voltage_v: f32,
    pub temperature_c: f32,
}

impl Rpdo2 {
    const MIN_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_RPDO2, data, Self::MIN_LEN)?;
        // current @ bytes [2..3], voltage @ [4..5], temperature @ [6..7] signed
        Ok(Self {
            charging_current_a: le_u16(data, 2) as f32 * CURRENT_SCALE,
            battery_voltage_v: le_u16(data, 4) as f32 * VOLTAGE_SCALE,
            temperature_c: le_i16(data, 6) as f32 * TEMPERATURE_SCALE + TEMPERATURE_OFFSET,
        })
    }

    pub fn encode(&self) -> [u8; 8] {
        let current = encode_u16(self.charging_current_a, CURRENT_SCALE);
        let voltage = encode_u16(self.battery_voltage_v, VOLTAGE_SCALE);
        let temperature = encode_temperature(self.temperature_c);
        let mut d = [0u8; 8];
        d[2..4].copy_from_slice(&current.to_le_bytes());
        d[4..6].copy_from_slice(&voltage.to_le_bytes());
        d[6..8].copy_from_slice(&temperature.to_le_bytes());
        d
    }
}

/// RPDO1 @ 0x20A: battery charge request sent to the charger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rpdo1 {
    pub battery_soc_pct: u8,
    pub charge_cycle_type: ChargeCycleType,
    pub voltage_request_v: f32,
    pub current_request_a: f32,
    pub battery_status: BatteryStatus,
}

impl Rpdo1 {
    const MIN_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_RPDO1, data, Self::MIN_LEN)?;
        Ok(Self {
            battery_soc_pct: data[1],
            charge_cycle_type: ChargeCycleType::from_raw(data[2]),
            voltage_request_v: le_u16(data, 3) as f32 * VOLTAGE_SCALE,
            current_request_a: le_u16(data, 5) as f32 * CURRENT_REQUEST_SCALE,
            battery_status: BatteryStatus::from_raw(data[7]),
        })
    }

    pub fn encode(&self) -> [u8; 8] {
        let voltage = encode_u16(self.voltage_request_v, VOLTAGE_SCALE);
        let current = encode_u16(self.current_request_a, CURRENT_REQUEST_SCALE);
        let mut d = [0u8; 8];
        d[1] = self.battery_soc_pct.min(100);
        d[2] = self.charge_cycle_type.raw();
        d[3..5].copy_from_slice(&voltage.to_le_bytes());
        d[5..7].copy_from_slice(&current.to_le_bytes());
        d[7] = self.battery_status.raw();
        d
    }
}

/// TPDO1 @ 0x18A: charger output measurements and packed status bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tpdo1 {
    pub charging_current_a: f32,
    pub battery_voltage_v: f32,
    pub hw_shutdown: ChargerHardwareShutdownStatus,
    pub derating: ChargerDeratingStatus,
    pub ac_status: AcConnectionStatus,
    pub charger_status: ChargerStatus,
    pub override_status: OverrideStatus,
    pub charge_indication: ChargeIndication,
    pub charge_cycle_type: ChargeCycleType,
}

impl Tpdo1 {
    const MIN_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_TPDO1, data, Self::MIN_LEN)?;

        // Status bits start at bit 34 of the frame. With Intel layout that is
        // byte 4 bit 2 upward:
        //   byte4 bit2 hw shutdown, bit3 derating, bit4 AC, bit5 charger
        //   byte4 bits6..7 override (2 bits, only 0/1 defined)
        //   byte5 bits0..3 charge indication, bits4..7 charge cycle type
        let b4 = data[4];
        let b5 = data[5];

        let cycle_raw = read_bits!(b5, 4, 4);
        Ok(Self {
            charging_current_a: le_u16(data, 0) as f32 * CURRENT_SCALE,
            battery_voltage_v: le_u16(data, 2) as f32 * VOLTAGE_SCALE,
            hw_shutdown: if read_bits!(b4, 2, 1) != 0 {
                ChargerHardwareShutdownStatus::ShutDown
            } else {
                ChargerHardwareShutdownStatus::Running
            },
            derating: if read_bits!(b4, 3, 1) != 0 {
                ChargerDeratingStatus::Derating
            } else {
                ChargerDeratingStatus::NotDerating
            },
            ac_status: if read_bits!(b4, 4, 1) != 0 {
                AcConnectionStatus::AcDetected
            } else {
                AcConnectionStatus::NoAc
            },
            charger_status: if read_bits!(b4, 5, 1) != 0 {
                ChargerStatus::Enabled
            } else {
                ChargerStatus::Disabled
            },
            override_status: if read_bits!(b4, 6, 2) != 0 {
                OverrideStatus::Enabled
            } else {
                OverrideStatus::Disabled
            },
            charge_indication: ChargeIndication::from_raw(read_bits!(b5, 0, 4)),
            // The value table only defines 0..2 for this 4-bit signal. Values
            // 3..15 are forced to NoActiveCycle, a lossy compatibility shim
            // kept for parity with the charger's own tooling.
            charge_cycle_type: ChargeCycleType::from_raw(if cycle_raw <= 2 { cycle_raw } else { 0 }),
        })
    }
}

/// TPDO2 @ 0x28A: accumulated charge statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tpdo2 {
    pub elapsed_time_s: f32,
    pub ah_returned: f32,
    pub wh_returned: f32,
}

impl Tpdo2 {
    const MIN_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_TPDO2, data, Self::MIN_LEN)?;
        Ok(Self {
            elapsed_time_s: le_u16(data, 0) as f32 * ELAPSED_TIME_SCALE,
            ah_returned: le_u32(data, 2) as f32 * AH_SCALE,
            wh_returned: le_u16(data, 6) as f32 * WH_SCALE,
        })
    }
}

/// TPDO3 @ 0x38A: charger error report with AC line voltage and SOC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tpdo3 {
    pub error_code: u32,
    pub ac_voltage_vac: f32,
    pub charger_soc_pct: u8,
    /// Human-readable expansion of `error_code`, always populated.
    pub error_text: String,
}

impl Tpdo3 {
    const MIN_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_TPDO3, data, Self::MIN_LEN)?;
        let error_code = le_u32(data, 0);
        Ok(Self {
            error_code,
            ac_voltage_vac: le_u16(data, 4) as f32 * AC_VOLTAGE_SCALE,
            charger_soc_pct: data[6],
            error_text: fault_code_text(error_code),
        })
    }
}

/// NMT start command @ 0x000.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmtStart {
    pub command: NmtCommand,
    pub node_id: u8,
}

impl NmtStart {
    const MIN_LEN: usize = 2;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_NMT_START, data, Self::MIN_LEN)?;
        Ok(Self {
            command: NmtCommand::from_raw(data[0]),
            node_id: data[1],
        })
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.command.raw(), self.node_id]
    }
}

/// Fault register @ 0x08A: 8 undecoded status bytes.
///
/// The DBC maps this as a single 64-bit blob with no scaling; interpretation
/// is left to the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultRegister {
    pub raw: [u8; 8],
}

impl FaultRegister {
    const MIN_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        validate_len(ID_FAULT_REGISTER, data, Self::MIN_LEN)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data[..8]);
        Ok(Self { raw })
    }
}

/// CANopen heartbeat, used on both 0x701 (battery) and 0x70A (charger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub state: HeartbeatState,
}

impl Heartbeat {
    const MIN_LEN: usize = 1;

    pub fn decode(id: u32, data: &[u8]) -> Result<Self, Error> {
        validate_len(id, data, Self::MIN_LEN)?;
        Ok(Self {
            state: HeartbeatState::from_raw(data[0]),
        })
    }

    pub fn encode(&self) -> [u8; 1] {
        [self.state.raw()]
    }
}

// -------------------------------- dispatch ---------------------------------

/// One decoded CAN message of any recognized kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CanMessage {
    Rpdo1(Rpdo1),
    Rpdo2(Rpdo2),
    Tpdo1(Tpdo1),
    Tpdo2(Tpdo2),
    Tpdo3(Tpdo3),
    NmtStart(NmtStart),
    FaultRegister(FaultRegister),
    BatteryHeartbeat(Heartbeat),
    ChargerHeartbeat(Heartbeat),
}

/// Route a received frame to the decoder for its identifier.
///
/// Identifiers outside the message set yield [`Error::UnrecognizedId`]
/// without touching the payload.
pub fn decode_frame(id: u32, data: &[u8]) -> Result<CanMessage, Error> {
    match id {
        ID_RPDO1 => Rpdo1::decode(data).map(CanMessage::Rpdo1),
        ID_RPDO2 => Rpdo2::decode(data).map(CanMessage::Rpdo2),
        ID_TPDO1 => Tpdo1::decode(data).map(CanMessage::Tpdo1),
        ID_TPDO2 => Tpdo2::decode(data).map(CanMessage::Tpdo2),
        ID_TPDO3 => Tpdo3::decode(data).map(CanMessage::Tpdo3),
        ID_NMT_START => NmtStart::decode(data).map(CanMessage::NmtStart),
        ID_FAULT_REGISTER => FaultRegister::decode(data).map(CanMessage::FaultRegister),
        ID_HEARTBEAT_BATTERY => Heartbeat::decode(id, data).map(CanMessage::BatteryHeartbeat),
        ID_HEARTBEAT_CHARGER => Heartbeat::decode(id, data).map(CanMessage::ChargerHeartbeat),
        _ => Err(Error::UnrecognizedId(id)),
    }
}

// ----------------------------- encode helpers ------------------------------

fn encode_u16(value: f32, scale: f32) -> u16 {
    (value / scale).round().clamp(0.0, u16::MAX as f32) as u16
}

fn encode_temperature(value: f32) -> i16 {
    ((value - TEMPERATURE_OFFSET) / TEMPERATURE_SCALE)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpdo2_worked_example() {
        let data = [0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x01, 0x90];
        let msg = Rpdo2::decode(&data).unwrap();
        // raw 0x0100 = 256 -> 1.0 A, raw 0x0200 = 512 -> 2.0 V
        assert!((msg.charging_current_a - 1.0).abs() < 1e-6);
        assert!((msg.battery_voltage_v - 2.0).abs() < 1e-6);
        // raw 0x9001 as i16 = -28671 -> -28671 * 0.125 - 40
        assert!((msg.temperature_c - (-3623.875)).abs() < 1e-3);
    }

    #[test]
    fn rpdo1_fields() {
        let data = [0x00, 76, 0x01, 0x00, 0x52, 0x50, 0x00, 0x01];
        let msg = Rpdo1::decode(&data).unwrap();
        assert_eq!(msg.battery_soc_pct, 76);
        assert_eq!(msg.charge_cycle_type, ChargeCycleType::Charge);
        // 0x5200 = 20992 -> 82.0 V, 0x0050 = 80 -> 5.0 A
        assert!((msg.voltage_request_v - 82.0).abs() < 1e-4);
        assert!((msg.current_request_a - 5.0).abs() < 1e-4);
        assert_eq!(msg.battery_status, BatteryStatus::Enabled);
    }

    #[test]
    fn tpdo1_status_bits() {
        // byte4: bit2 shutdown, bit4 AC, bit5 charger enabled -> 0b0011_0100
        // byte5: indication 5 (Resting), cycle type 1 (Charge) -> 0b0001_0101
        let data = [0x00, 0x01, 0x00, 0x52, 0b0011_0100, 0b0001_0101, 0x00, 0x00];
        let msg = Tpdo1::decode(&data).unwrap();
        assert_eq!(msg.hw_shutdown, ChargerHardwareShutdownStatus::ShutDown);
        assert_eq!(msg.derating, ChargerDeratingStatus::NotDerating);
        assert_eq!(msg.ac_status, AcConnectionStatus::AcDetected);
        assert_eq!(msg.charger_status, ChargerStatus::Enabled);
        assert_eq!(msg.override_status, OverrideStatus::Disabled);
        assert_eq!(msg.charge_indication, ChargeIndication::Resting);
        assert_eq!(msg.charge_cycle_type, ChargeCycleType::Charge);
    }

    #[test]
    fn tpdo1_override_and_derating_bits() {
        // byte4: bit3 derating, bits6..7 = 0b10 (override nonzero)
        let data = [0x00, 0x00, 0x00, 0x00, 0b1000_1000, 0x00, 0x00, 0x00];
        let msg = Tpdo1::decode(&data).unwrap();
        assert_eq!(msg.derating, ChargerDeratingStatus::Derating);
        assert_eq!(msg.override_status, OverrideStatus::Enabled);
        assert_eq!(msg.hw_shutdown, ChargerHardwareShutdownStatus::Running);
        assert_eq!(msg.charger_status, ChargerStatus::Disabled);
    }

    #[test]
    fn tpdo1_cycle_type_out_of_table() {
        // cycle type nibble = 7, outside the 0..2 value table
        let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0b0111_0000, 0x00, 0x00];
        let msg = Tpdo1::decode(&data).unwrap();
        assert_eq!(msg.charge_cycle_type, ChargeCycleType::NoActiveCycle);
    }

    #[test]
    fn tpdo2_accumulators() {
        // elapsed 0x0012 = 18 -> 180 s, Ah 0x00000010 = 16 -> 2.0, Wh 0x0020 = 32 -> 2.0
        let data = [0x12, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x00];
        let msg = Tpdo2::decode(&data).unwrap();
        assert!((msg.elapsed_time_s - 180.0).abs() < 1e-6);
        assert!((msg.ah_returned - 2.0).abs() < 1e-6);
        assert!((msg.wh_returned - 2.0).abs() < 1e-6);
    }

    #[test]
    fn tpdo3_known_fault_code() {
        let code: u32 = 394301440;
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&code.to_le_bytes());
        data[4..6].copy_from_slice(&3840u16.to_le_bytes()); // 240.0 VAC
        data[6] = 88;
        let msg = Tpdo3::decode(&data).unwrap();
        assert_eq!(msg.error_code, code);
        assert!((msg.ac_voltage_vac - 240.0).abs() < 1e-4);
        assert_eq!(msg.charger_soc_pct, 88);
        assert_eq!(
            msg.error_text,
            "E-0-2-3 High AC voltage error ( >270VAC ) 9000h External error – generic"
        );
    }

    #[test]
    fn tpdo3_unknown_fault_code() {
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&999u32.to_le_bytes());
        let msg = Tpdo3::decode(&data).unwrap();
        assert!(msg.error_text.contains("999"));
    }

    #[test]
    fn fault_code_lookup_is_total() {
        for code in [0u32, 1, 999, u32::MAX, 29380608, 1342179008] {
            assert!(!fault_code_text(code).is_empty());
        }
        assert_eq!(
            fault_code_text(29380608),
            "F-0-0-1 Output Stage Error 5000h CANopen Device Hardware"
        );
    }

    #[test]
    fn heartbeat_states() {
        let msg = Heartbeat::decode(ID_HEARTBEAT_CHARGER, &[5]).unwrap();
        assert_eq!(msg.state.to_string(), "Operational");
        let msg = Heartbeat::decode(ID_HEARTBEAT_CHARGER, &[127]).unwrap();
        assert_eq!(msg.state.to_string(), "Pre-operational");
        let msg = Heartbeat::decode(ID_HEARTBEAT_CHARGER, &[6]).unwrap();
        assert_eq!(msg.state.to_string(), "Unknown");
    }

    #[test]
    fn enumerations_are_total() {
        for raw in 0..=u8::MAX {
            assert!(!ChargeIndication::from_raw(raw).to_string().is_empty());
            assert!(!ChargeCycleType::from_raw(raw).to_string().is_empty());
            assert!(!HeartbeatState::from_raw(raw).to_string().is_empty());
            assert!(!NmtCommand::from_raw(raw).to_string().is_empty());
            assert!(!BatteryStatus::from_raw(raw).to_string().is_empty());
        }
    }

    #[test]
    fn nmt_start_round_trip() {
        let msg = NmtStart {
            command: NmtCommand::Start,
            node_id: 0x0A,
        };
        let decoded = NmtStart::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.command, NmtCommand::Start);
        assert_eq!(decoded.node_id, 0x0A);
    }

    #[test]
    fn fault_register_pass_through() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let msg = FaultRegister::decode(&data).unwrap();
        assert_eq!(msg.raw, data);
    }

    #[test]
    fn short_frames_are_rejected() {
        let data = [0u8; 8];
        for (id, min) in [
            (ID_RPDO1, 8),
            (ID_RPDO2, 8),
            (ID_TPDO1, 8),
            (ID_TPDO2, 8),
            (ID_TPDO3, 8),
            (ID_FAULT_REGISTER, 8),
            (ID_NMT_START, 2),
            (ID_HEARTBEAT_BATTERY, 1),
            (ID_HEARTBEAT_CHARGER, 1),
        ] {
            let result = decode_frame(id, &data[..min - 1]);
            assert!(
                matches!(result, Err(Error::FrameTooShort { .. })),
                "id 0x{:03X} accepted a {}-byte frame",
                id,
                min - 1
            );
            assert!(decode_frame(id, &data[..min]).is_ok());
        }
    }

    #[test]
    fn unrecognized_ids() {
        for id in [0x001u32, 0x123, 0x180, 0x7FF] {
            assert!(matches!(
                decode_frame(id, &[0xFF; 8]),
                Err(Error::UnrecognizedId(got)) if got == id
            ));
        }
    }

    #[test]
    fn rpdo1_round_trip_within_quantization() {
        let msg = Rpdo1 {
            battery_soc_pct: 76,
            charge_cycle_type: ChargeCycleType::Charge,
            voltage_request_v: 82.3,
            current_request_a: 5.7,
            battery_status: BatteryStatus::Enabled,
        };
        let decoded = Rpdo1::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.battery_soc_pct, 76);
        assert_eq!(decoded.charge_cycle_type, ChargeCycleType::Charge);
        assert!((decoded.voltage_request_v - 82.3).abs() <= VOLTAGE_SCALE);
        assert!((decoded.current_request_a - 5.7).abs() <= CURRENT_REQUEST_SCALE);
        assert_eq!(decoded.battery_status, BatteryStatus::Enabled);
    }

    #[test]
    fn rpdo2_round_trip_within_quantization() {
        let msg = Rpdo2 {
            charging_current_a: 10.03,
            battery_voltage_v: 81.97,
            temperature_c: -12.4,
        };
        let decoded = Rpdo2::decode(&msg.encode()).unwrap();
        assert!((decoded.charging_current_a - 10.03).abs() <= CURRENT_SCALE);
        assert!((decoded.battery_voltage_v - 81.97).abs() <= VOLTAGE_SCALE);
        assert!((decoded.temperature_c - (-12.4)).abs() <= TEMPERATURE_SCALE);
    }

    #[test]
    fn heartbeat_round_trip() {
        let msg = Heartbeat {
            state: HeartbeatState::Operational,
        };
        let decoded = Heartbeat::decode(ID_HEARTBEAT_BATTERY, &msg.encode()).unwrap();
        assert_eq!(decoded.state, HeartbeatState::Operational);
    }
}
