//! Wire-level constants for the Nordic UART Service (NUS) profile and the
//! attribute-protocol/link-layer overheads that bound how many application
//! bytes fit in one notification.

/// Nordic UART Service UUID.
pub const NUS_SERVICE_UUID: &str = "6E400001-B5A3-F393-E0A9-E50E24DCCA9E";
/// RX characteristic (peer -> device), write / write-without-response.
pub const NUS_RX_CHARACTERISTIC_UUID: &str = "6E400002-B5A3-F393-E0A9-E50E24DCCA9E";
/// TX characteristic (device -> peer), notify.
pub const NUS_TX_CHARACTERISTIC_UUID: &str = "6E400003-B5A3-F393-E0A9-E50E24DCCA9E";

/// Generic Sensor, used in the advertising payload.
pub const APPEARANCE_GENERIC_SENSOR: u16 = 0x0540;

/// Bytes consumed by the ATT header on every notification.
pub const ATT_HEADER: usize = 3;
/// Bytes consumed by the L2CAP header on every link-layer PDU.
pub const L2CAP_HDR: usize = 4;
/// Extra bytes consumed by link-layer encryption (MIC) when the
/// connection is secured.
pub const ENCRYPT_OVERHEAD: usize = 4;

/// Smallest legal ATT MTU.
pub const MIN_MTU: u16 = 23;
/// Largest ATT MTU this crate will negotiate towards.
pub const MAX_MTU: u16 = 517;

/// Advertising payload passed to [`crate::host::HostStack::start_advertising`].
#[derive(Debug, Clone)]
pub struct AdvConfig {
    pub device_name: heapless_name::Name,
    pub appearance: u16,
    pub service_uuid: &'static str,
    pub tx_power_dbm: i8,
}

impl AdvConfig {
    pub fn new(device_name: heapless_name::Name, tx_power_dbm: i8) -> Self {
        AdvConfig {
            device_name,
            appearance: APPEARANCE_GENERIC_SENSOR,
            service_uuid: NUS_SERVICE_UUID,
            tx_power_dbm,
        }
    }
}

/// A small fixed-capacity string type for the advertised device name, so
/// this module doesn't have to pull in `alloc` just to hold a name the
/// advertising payload caps at 29 bytes anyway.
pub mod heapless_name {
    /// Maximum length of an advertised device name that still leaves room
    /// for the flags AD structure and the service UUID in a 31-byte
    /// advertising packet; longer names are expected to move into the
    /// scan response, which this crate does not manage.
    pub const MAX_NAME_LEN: usize = 20;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Name {
        buf: [u8; MAX_NAME_LEN],
        len: u8,
    }

    impl Name {
        pub fn new(s: &str) -> Option<Self> {
            let bytes = s.as_bytes();
            if bytes.len() > MAX_NAME_LEN {
                return None;
            }
            let mut buf = [0u8; MAX_NAME_LEN];
            buf[..bytes.len()].copy_from_slice(bytes);
            Some(Name {
                buf,
                len: bytes.len() as u8,
            })
        }

        pub fn as_str(&self) -> &str {
            core::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rejects_too_long() {
        assert!(heapless_name::Name::new("this-name-is-definitely-too-long").is_none());
    }

    #[test]
    fn name_round_trips() {
        let n = heapless_name::Name::new("sensor1").unwrap();
        assert_eq!(n.as_str(), "sensor1");
    }
}
