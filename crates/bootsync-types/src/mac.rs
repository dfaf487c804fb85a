//! Hardware addresses as they appear in the inventory and in DHCP host entries.

use crate::ParseError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// Accepts colon or hyphen separated octets in either case and always
/// prints lowercase colon form, the spelling dhcpd expects in
/// `hardware ethernet`. Ordering is byte-wise, which keeps generated scopes
/// stable.
///
/// ```
/// use bootsync_types::MacAddress;
///
/// let mac: MacAddress = "AA-BB-CC-DD-EE-0F".parse().unwrap();
/// assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:0f");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());

        // one separator style per address; "aa:bb-cc..." is rejected
        let sep = match (s.contains(':'), s.contains('-')) {
            (true, false) => ':',
            (false, true) => '-',
            _ => return Err(invalid()),
        };

        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split(sep) {
            let slot = octets.get_mut(count).ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
            count += 1;
        }
        if count != octets.len() {
            return Err(invalid());
        }
        Ok(MacAddress(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

/// Deserializes an optional MAC where `null` and `""` both mean "no address".
///
/// Inventory records routinely carry an empty hardware address for
/// interfaces that cannot be booted.
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<MacAddress>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
