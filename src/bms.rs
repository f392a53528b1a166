//! Serial BMS status frame.
//!
//! The pack's BMS answers a fixed 6-byte poll with one long status frame. All
//! multi-byte quantities are assembled high byte first, and every field sits
//! at an absolute byte offset in the reply; the offsets below mirror the
//! vendor's frame layout and must not be rearranged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed poll command, written verbatim to the serial port.
pub const STATUS_REQUEST: [u8; 6] = [0x5A, 0x5A, 0x00, 0x00, 0x00, 0x00];

/// Serial settings of the BMS link.
pub const BAUD_RATE: u32 = 19_200;

/// The BMS needs time to assemble its reply after a poll; polling faster
/// than this returns truncated frames.
pub const MINIMUM_DELAY: std::time::Duration = std::time::Duration::from_millis(300);

/// Full reply length produced by the BMS.
pub const STATUS_REPLY_LEN: usize = 140;

/// Bytes required before any field can be extracted.
const MIN_FRAME_LEN: usize = 121;

/// Number of cell voltage words in the frame.
pub const CELL_COUNT: usize = 20;

fn be_u16(d: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([d[offset], d[offset + 1]])
}

fn be_u32(d: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([d[offset], d[offset + 1], d[offset + 2], d[offset + 3]])
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeMosStatus {
    #[default]
    Close,
    Open,
    CellOvervoltage,
    Overcurrent,
    MosError,
    Unknown(u8),
}

impl ChargeMosStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ChargeMosStatus::Close,
            1 => ChargeMosStatus::Open,
            2 => ChargeMosStatus::CellOvervoltage,
            3 => ChargeMosStatus::Overcurrent,
            13 => ChargeMosStatus::MosError,
            other => ChargeMosStatus::Unknown(other),
        }
    }
}

impl fmt::Display for ChargeMosStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChargeMosStatus::Close => write!(f, "Close"),
            ChargeMosStatus::Open => write!(f, "Open"),
            ChargeMosStatus::CellOvervoltage => write!(f, "Overvoltage of the single cell"),
            ChargeMosStatus::Overcurrent => write!(f, "Over current"),
            ChargeMosStatus::MosError => write!(f, "Charging MOS Error"),
            ChargeMosStatus::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DischargeMosStatus {
    #[default]
    Close,
    Open,
    CellUndervoltage,
    Overcurrent,
    MosError,
    Unknown(u8),
}

impl DischargeMosStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => DischargeMosStatus::Close,
            1 => DischargeMosStatus::Open,
            2 => DischargeMosStatus::CellUndervoltage,
            3 => DischargeMosStatus::Overcurrent,
            13 => DischargeMosStatus::MosError,
            other => DischargeMosStatus::Unknown(other),
        }
    }
}

impl fmt::Display for DischargeMosStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DischargeMosStatus::Close => write!(f, "Close"),
            DischargeMosStatus::Open => write!(f, "Open"),
            DischargeMosStatus::CellUndervoltage => write!(f, "Under-voltage of the single cell"),
            DischargeMosStatus::Overcurrent => write!(f, "Over current"),
            DischargeMosStatus::MosError => write!(f, "Discharge MOS Error"),
            DischargeMosStatus::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStatus {
    #[default]
    Close,
    BalanceLimit,
    AutoBalance,
    Unknown(u8),
}

impl BalanceStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => BalanceStatus::Close,
            1 => BalanceStatus::BalanceLimit,
            4 => BalanceStatus::AutoBalance,
            other => BalanceStatus::Unknown(other),
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BalanceStatus::Close => write!(f, "Close"),
            BalanceStatus::BalanceLimit => write!(f, "Balance limit"),
            BalanceStatus::AutoBalance => write!(f, "Auto Balance"),
            BalanceStatus::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// One decoded BMS status snapshot.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BmsStatus {
    pub pack_voltage_v: f32,
    pub pack_current_a: f32,
    pub soc_pct: u8,
    pub cell_voltages_v: [f32; CELL_COUNT],
    /// Raw MOS temperature word, no vendor scaling documented.
    pub mos_temperature_raw: u16,
    pub balance_temperature_raw: u16,
    pub external_temperatures_raw: [u16; 4],
    pub physical_capacity_ah: f32,
    pub remaining_capacity_ah: f32,
    pub cyclic_capacity_ah: f32,
    pub charge_mos_status: ChargeMosStatus,
    pub discharge_mos_status: DischargeMosStatus,
    pub balance_status: BalanceStatus,
    pub high_cell_num: u8,
    pub high_cell_voltage_v: f32,
    pub low_cell_num: u8,
    pub low_cell_voltage_v: f32,
}

impl BmsStatus {
    /// Decode one status frame.
    ///
    /// Buffers shorter than the 121 bytes covered by the offset table yield
    /// the all-default snapshot; there is no separate failure signal on this
    /// path, callers that need a guarantee should check the reply length
    /// themselves.
    pub fn decode(data: &[u8]) -> Self {
        if data.len() < MIN_FRAME_LEN {
            log::warn!(
                "BMS frame too short - required={} received={}",
                MIN_FRAME_LEN,
                data.len()
            );
            return Self::default();
        }

        let mut cell_voltages_v = [0f32; CELL_COUNT];
        for (i, cell) in cell_voltages_v.iter_mut().enumerate() {
            *cell = be_u16(data, 6 + i * 2) as f32 / 1000.0;
        }

        let mut external_temperatures_raw = [0u16; 4];
        for (i, temp) in external_temperatures_raw.iter_mut().enumerate() {
            *temp = be_u16(data, 95 + i * 2);
        }

        Self {
            pack_voltage_v: be_u16(data, 4) as f32 / 10.0,
            pack_current_a: be_u16(data, 72) as f32 / 10.0,
            soc_pct: data[74],
            cell_voltages_v,
            mos_temperature_raw: be_u16(data, 91),
            balance_temperature_raw: be_u16(data, 93),
            external_temperatures_raw,
            physical_capacity_ah: be_u32(data, 75) as f32 * 1e-6,
            remaining_capacity_ah: be_u32(data, 79) as f32 * 1e-6,
            cyclic_capacity_ah: be_u32(data, 83) as f32 * 1e-6,
            charge_mos_status: ChargeMosStatus::from_raw(data[103]),
            discharge_mos_status: DischargeMosStatus::from_raw(data[104]),
            balance_status: BalanceStatus::from_raw(data[105]),
            high_cell_num: data[115],
            high_cell_voltage_v: be_u16(data, 116) as f32 / 1000.0,
            low_cell_num: data[118],
            low_cell_voltage_v: be_u16(data, 119) as f32 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Vec<u8> {
        let mut d = vec![0u8; STATUS_REPLY_LEN];
        d[4..6].copy_from_slice(&800u16.to_be_bytes()); // 80.0 V
        for i in 0..CELL_COUNT {
            let raw = 3300 + i as u16;
            d[6 + i * 2..8 + i * 2].copy_from_slice(&raw.to_be_bytes());
        }
        d[72..74].copy_from_slice(&105u16.to_be_bytes()); // 10.5 A
        d[74] = 76;
        d[75..79].copy_from_slice(&100_000_000u32.to_be_bytes()); // 100.0 Ah
        d[79..83].copy_from_slice(&76_000_000u32.to_be_bytes()); // 76.0 Ah
        d[83..87].copy_from_slice(&5_000_000u32.to_be_bytes()); // 5.0 Ah
        d[91..93].copy_from_slice(&25u16.to_be_bytes());
        d[93..95].copy_from_slice(&26u16.to_be_bytes());
        for i in 0..4 {
            let raw = 30 + i as u16;
            d[95 + i * 2..97 + i * 2].copy_from_slice(&raw.to_be_bytes());
        }
        d[103] = 1;
        d[104] = 13;
        d[105] = 4;
        d[115] = 7;
        d[116..118].copy_from_slice(&3412u16.to_be_bytes());
        d[118] = 3;
        d[119..121].copy_from_slice(&3298u16.to_be_bytes());
        d
    }

    #[test]
    fn decodes_sample_frame() {
        let status = BmsStatus::decode(&sample_frame());
        assert!((status.pack_voltage_v - 80.0).abs() < 1e-4);
        assert!((status.pack_current_a - 10.5).abs() < 1e-4);
        assert_eq!(status.soc_pct, 76);
        assert!((status.cell_voltages_v[0] - 3.300).abs() < 1e-4);
        assert!((status.cell_voltages_v[19] - 3.319).abs() < 1e-4);
        assert_eq!(status.mos_temperature_raw, 25);
        assert_eq!(status.balance_temperature_raw, 26);
        assert_eq!(status.external_temperatures_raw, [30, 31, 32, 33]);
        assert!((status.physical_capacity_ah - 100.0).abs() < 1e-3);
        assert!((status.remaining_capacity_ah - 76.0).abs() < 1e-3);
        assert!((status.cyclic_capacity_ah - 5.0).abs() < 1e-3);
        assert_eq!(status.charge_mos_status, ChargeMosStatus::Open);
        assert_eq!(status.discharge_mos_status, DischargeMosStatus::MosError);
        assert_eq!(
            status.discharge_mos_status.to_string(),
            "Discharge MOS Error"
        );
        assert_eq!(status.balance_status, BalanceStatus::AutoBalance);
        assert_eq!(status.high_cell_num, 7);
        assert!((status.high_cell_voltage_v - 3.412).abs() < 1e-4);
        assert_eq!(status.low_cell_num, 3);
        assert!((status.low_cell_voltage_v - 3.298).abs() < 1e-4);
    }

    #[test]
    fn short_buffer_yields_default() {
        let status = BmsStatus::decode(&[0xFF; 120]);
        assert_eq!(status.pack_voltage_v, 0.0);
        assert_eq!(status.soc_pct, 0);
        assert_eq!(status.charge_mos_status, ChargeMosStatus::Close);
    }

    #[test]
    fn status_tables_are_total() {
        for raw in 0..=u8::MAX {
            assert!(!ChargeMosStatus::from_raw(raw).to_string().is_empty());
            assert!(!DischargeMosStatus::from_raw(raw).to_string().is_empty());
            assert!(!BalanceStatus::from_raw(raw).to_string().is_empty());
        }
        assert_eq!(ChargeMosStatus::from_raw(9).to_string(), "Unknown");
        assert_eq!(BalanceStatus::from_raw(2).to_string(), "Unknown");
    }
}
