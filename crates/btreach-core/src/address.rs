//! Hardware address validation.
//!
//! Addresses are accepted as six colon-separated hex pairs in either case and
//! stored as raw bytes, so `aa:bb:cc:dd:ee:ff` and `AA:BB:CC:DD:EE:FF` name the
//! same device.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::ReachError;

static MAC_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("MAC address pattern is valid")
});

/// Returns `true` if `value` is a well-formed hardware address.
///
/// The whole string must match; surrounding whitespace or extra lines are
/// rejected.
#[must_use]
pub fn is_valid_mac_address(value: &str) -> bool {
    MAC_ADDRESS_RE.is_match(value)
}

/// A validated hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl FromStr for MacAddress {
    type Err = ReachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_mac_address(s) {
            return Err(ReachError::InvalidAddress(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (octet, group) in octets.iter_mut().zip(s.split(':')) {
            *octet = u8::from_str_radix(group, 16)
                .map_err(|_| ReachError::InvalidAddress(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_mac_address("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac_address("aa:bb:cc:dd:ee:ff"));
        assert!(is_valid_mac_address("00:1a:7D:da:71:13"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_mac_address(""));
        assert!(!is_valid_mac_address("not-a-mac"));
        assert!(!is_valid_mac_address("AA:BB:CC:DD:EE"));
        assert!(!is_valid_mac_address("AA:BB:CC:DD:EE:FF:00"));
        assert!(!is_valid_mac_address("AA-BB-CC-DD-EE-FF"));
        assert!(!is_valid_mac_address("AABBCCDDEEFF"));
        assert!(!is_valid_mac_address("GG:BB:CC:DD:EE:FF"));
        assert!(!is_valid_mac_address("A:BB:CC:DD:EE:FFF"));
        assert!(!is_valid_mac_address(" AA:BB:CC:DD:EE:FF"));
        assert!(!is_valid_mac_address("AA:BB:CC:DD:EE:FF\n"));
        assert!(!is_valid_mac_address("junk\nAA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_parse_normalizes_case() {
        let lower: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let upper: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let err = "12:34".parse::<MacAddress>().unwrap_err();
        assert!(matches!(err, ReachError::InvalidAddress(ref s) if s == "12:34"));
    }

    #[test]
    fn test_serializes_as_string() {
        let addr: MacAddress = "0a:0b:0c:0d:0e:0f".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"0A:0B:0C:0D:0E:0F\""
        );
    }
}
