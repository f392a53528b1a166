//! Last-known-value state for charger traffic.
//!
//! The charger broadcasts its PDOs periodically; consumers usually care about
//! the latest reading of each kind rather than the frame stream itself. A
//! [`ChargerState`] starts with every slot empty and fills in as messages are
//! applied, so `None` doubles as the validity flag for a kind that has not
//! been seen yet.

use crate::protocol::{
    CanMessage, FaultRegister, Heartbeat, NmtStart, Rpdo1, Rpdo2, Tpdo1, Tpdo2, Tpdo3,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ChargerState {
    pub rpdo1: Option<Rpdo1>,
    pub rpdo2: Option<Rpdo2>,
    pub tpdo1: Option<Tpdo1>,
    pub tpdo2: Option<Tpdo2>,
    pub tpdo3: Option<Tpdo3>,
    pub nmt_start: Option<NmtStart>,
    pub fault_register: Option<FaultRegister>,
    pub battery_heartbeat: Option<Heartbeat>,
    pub charger_heartbeat: Option<Heartbeat>,
}

impl ChargerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one decoded message into the state, replacing the previous
    /// reading of the same kind.
    pub fn apply(&mut self, message: CanMessage) {
        match message {
            CanMessage::Rpdo1(m) => self.rpdo1 = Some(m),
            CanMessage::Rpdo2(m) => self.rpdo2 = Some(m),
            CanMessage::Tpdo1(m) => self.tpdo1 = Some(m),
            CanMessage::Tpdo2(m) => self.tpdo2 = Some(m),
            CanMessage::Tpdo3(m) => self.tpdo3 = Some(m),
            CanMessage::NmtStart(m) => self.nmt_start = Some(m),
            CanMessage::FaultRegister(m) => self.fault_register = Some(m),
            CanMessage::BatteryHeartbeat(m) => self.battery_heartbeat = Some(m),
            CanMessage::ChargerHeartbeat(m) => self.charger_heartbeat = Some(m),
        }
    }
}

impl fmt::Display for ChargerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(m) = &self.tpdo1 {
            writeln!(
                f,
                "Charger output: {:.2} A @ {:.2} V ({}, {})",
                m.charging_current_a, m.battery_voltage_v, m.charger_status, m.charge_indication
            )?;
        }
        if let Some(m) = &self.tpdo2 {
            writeln!(
                f,
                "Charge cycle: {:.0} s elapsed, {:.2} Ah / {:.1} Wh returned",
                m.elapsed_time_s, m.ah_returned, m.wh_returned
            )?;
        }
        if let Some(m) = &self.tpdo3 {
            writeln!(
                f,
                "Charger report: AC {:.1} VAC, SOC {}%, {}",
                m.ac_voltage_vac, m.charger_soc_pct, m.error_text
            )?;
        }
        if let Some(m) = &self.charger_heartbeat {
            writeln!(f, "Charger heartbeat: {}", m.state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{self, decode_frame};

    #[test]
    fn apply_fills_slots() {
        let mut state = ChargerState::new();
        assert!(state.tpdo2.is_none());

        let tpdo2 = decode_frame(
            protocol::ID_TPDO2,
            &[0x12, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x00],
        )
        .unwrap();
        state.apply(tpdo2);
        assert!(state.tpdo2.is_some());
        assert!(state.tpdo1.is_none());

        let hb = decode_frame(protocol::ID_HEARTBEAT_CHARGER, &[5]).unwrap();
        state.apply(hb);
        assert!(state.charger_heartbeat.is_some());
        assert!(state.battery_heartbeat.is_none());
    }

    #[test]
    fn apply_replaces_previous_reading() {
        let mut state = ChargerState::new();
        state.apply(decode_frame(protocol::ID_HEARTBEAT_CHARGER, &[127]).unwrap());
        state.apply(decode_frame(protocol::ID_HEARTBEAT_CHARGER, &[5]).unwrap());
        assert_eq!(
            state.charger_heartbeat.unwrap().state,
            protocol::HeartbeatState::Operational
        );
    }
}
