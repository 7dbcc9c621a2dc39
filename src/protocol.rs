//! Wire constants for the heat pump serial link.
//!
//! ```text
//! device -> controller:  5C 00 ADDR CMD LEN PAYLOAD.. CSUM
//! controller -> device:  C0 CMD LEN PAYLOAD.. CSUM
//! ```

/// First byte of every frame sent by the heat pump.
pub const START: u8 = 0x5C;
/// Second byte of the inbound start marker.
pub const FILL: u8 = 0x00;
/// Start byte of frames sent by the controller.
pub const OUTBOUND_START: u8 = 0xC0;

pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

/// START, FILL, ADDR, CMD, LEN
pub const INBOUND_HEADER_SIZE: usize = 5;
/// START', CMD, LEN
pub const OUTBOUND_HEADER_SIZE: usize = 3;
/// size field is a u8, so max amount of payload is u8::MAX (255)
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;
pub const MAX_INBOUND_FRAME_SIZE: usize = INBOUND_HEADER_SIZE + MAX_PAYLOAD_SIZE + 1;
pub const MAX_OUTBOUND_FRAME_SIZE: usize = OUTBOUND_HEADER_SIZE + MAX_PAYLOAD_SIZE + 1;

pub const ADDR_SMS40: u8 = 0x16;
pub const ADDR_RMU40_S1: u8 = 0x19;
pub const ADDR_RMU40_S4: u8 = 0x1C;
pub const ADDR_MODBUS40: u8 = 0x20;

pub const CMD_RMU_DATA_MSG: u8 = 0x62;
pub const CMD_RMU_DATA_REQ: u8 = 0x63;
pub const CMD_MODBUS_DATA_MSG: u8 = 0x68;
pub const CMD_MODBUS_READ_REQ: u8 = 0x69;
pub const CMD_MODBUS_READ_RESP: u8 = 0x6A;
pub const CMD_MODBUS_WRITE_REQ: u8 = 0x6B;
pub const CMD_MODBUS_WRITE_RESP: u8 = 0x6C;
pub const CMD_PRODUCT_INFO_MSG: u8 = 0x6D;
pub const CMD_ACCESSORY_VERSION_REQ: u8 = 0xEE;

/// Which end of the link produced a frame. Each direction has its own
/// start byte and checksum coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Heat pump to controller.
    Inbound,
    /// Controller to heat pump.
    Outbound,
}

/// Device class identified by the address byte of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAddress {
    Sms40,
    /// Room unit, system 1 to 4.
    Rmu40(u8),
    Modbus40,
    Other(u8),
}

impl From<u8> for DeviceAddress {
    fn from(value: u8) -> Self {
        match value {
            ADDR_SMS40 => DeviceAddress::Sms40,
            ADDR_RMU40_S1..=ADDR_RMU40_S4 => DeviceAddress::Rmu40(value - ADDR_RMU40_S1 + 1),
            ADDR_MODBUS40 => DeviceAddress::Modbus40,
            x => DeviceAddress::Other(x),
        }
    }
}

impl From<DeviceAddress> for u8 {
    fn from(value: DeviceAddress) -> Self {
        match value {
            DeviceAddress::Sms40 => ADDR_SMS40,
            DeviceAddress::Rmu40(system) => ADDR_RMU40_S1 + system.saturating_sub(1),
            DeviceAddress::Modbus40 => ADDR_MODBUS40,
            DeviceAddress::Other(x) => x,
        }
    }
}

/// Classification of a frame that already passed checksum validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A command from the known catalogue of device messages.
    Telemetry,
    /// The device is ready to accept a queued write request.
    WritePoll,
    /// The device is ready to accept a queued read request.
    ReadPoll,
    /// Valid framing, command not in the catalogue. Still acknowledged.
    Unrecognized,
}

impl FrameKind {
    pub fn classify(address: u8, command: u8, poll_address: u8) -> FrameKind {
        match (address, command) {
            (a, CMD_MODBUS_WRITE_REQ) if a == poll_address => FrameKind::WritePoll,
            (a, CMD_MODBUS_READ_REQ) if a == poll_address => FrameKind::ReadPoll,
            (
                _,
                CMD_RMU_DATA_MSG
                | CMD_RMU_DATA_REQ
                | CMD_MODBUS_DATA_MSG
                | CMD_MODBUS_READ_RESP
                | CMD_MODBUS_WRITE_RESP
                | CMD_PRODUCT_INFO_MSG
                | CMD_ACCESSORY_VERSION_REQ,
            ) => FrameKind::Telemetry,
            _ => FrameKind::Unrecognized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polls_only_match_the_poll_address() {
        assert_eq!(FrameKind::classify(0x20, 0x6B, 0x20), FrameKind::WritePoll);
        assert_eq!(FrameKind::classify(0x20, 0x69, 0x20), FrameKind::ReadPoll);
        assert_eq!(FrameKind::classify(0x19, 0x6B, 0x20), FrameKind::Unrecognized);
        assert_eq!(FrameKind::classify(0x19, 0x69, 0x19), FrameKind::ReadPoll);
    }

    #[test]
    fn catalogue_and_unknown_commands() {
        assert_eq!(FrameKind::classify(0x19, 0x62, 0x20), FrameKind::Telemetry);
        assert_eq!(FrameKind::classify(0x20, 0x68, 0x20), FrameKind::Telemetry);
        assert_eq!(FrameKind::classify(0x20, 0x99, 0x20), FrameKind::Unrecognized);
    }

    #[test]
    fn device_address_classes() {
        assert_eq!(DeviceAddress::from(0x16), DeviceAddress::Sms40);
        assert_eq!(DeviceAddress::from(0x1A), DeviceAddress::Rmu40(2));
        assert_eq!(DeviceAddress::from(0x20), DeviceAddress::Modbus40);
        assert_eq!(DeviceAddress::from(0x42), DeviceAddress::Other(0x42));
        assert_eq!(u8::from(DeviceAddress::Rmu40(4)), 0x1C);
    }
}
