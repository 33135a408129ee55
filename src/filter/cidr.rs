//! CIDR entries as binary prefixes.
//!
//! An `ip[/mask]` string becomes a string of `mask` binary digits, most
//! significant bit first. Two addresses share a prefix when one bit string
//! starts with the other.

use std::net::Ipv4Addr;

/// Prefix length used when none is given or the given one is unusable.
pub const FULL_MASK: u8 = 32;

/// Split `ip[/mask]` into its address text and prefix length.
///
/// The mask is read from the leading digits after `/`. Missing, empty or
/// out-of-range masks become 32.
pub fn split_entry(entry: &str) -> (&str, u8) {
    match entry.split_once('/') {
        Some((ip, mask)) => (ip, parse_mask(mask)),
        None => (entry, FULL_MASK),
    }
}

fn parse_mask(mask: &str) -> u8 {
    let digits_len = mask.bytes().take_while(|b| b.is_ascii_digit()).count();
    mask[..digits_len]
        .parse::<u32>()
        .ok()
        .filter(|m| *m <= u32::from(FULL_MASK))
        .map(|m| m as u8)
        .unwrap_or(FULL_MASK)
}

/// First `mask` bits of `ip`, as `'0'`/`'1'` characters.
pub fn ip_bits(ip: Ipv4Addr, mask: u8) -> String {
    let mask = usize::from(mask.min(FULL_MASK));
    let mut bits = format!("{:032b}", u32::from(ip));
    bits.truncate(mask);
    bits
}

/// Bit string of an `ip[/mask]` entry, or `None` if the address part is not IPv4.
pub fn to_bit_string(entry: &str) -> Option<String> {
    let (ip, mask) = split_entry(entry);
    let ip: Ipv4Addr = ip.parse().ok()?;
    Some(ip_bits(ip, mask))
}

/// `ip` written as a single-host CIDR entry.
pub fn host_entry(ip: Ipv4Addr) -> String {
    format!("{ip}/{FULL_MASK}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_entries_to_bits() {
        assert_eq!(to_bit_string("192.168.1.0/24").unwrap(), "110000001010100000000001");
        assert_eq!(to_bit_string("10.0.0.1/8").unwrap(), "00001010");
        assert_eq!(to_bit_string("0.0.0.0/0").unwrap(), "");
        assert_eq!(to_bit_string("255.255.255.255").unwrap().len(), 32);
    }

    #[test]
    fn unusable_masks_clamp_to_32() {
        assert_eq!(split_entry("10.0.0.0/33"), ("10.0.0.0", 32));
        assert_eq!(split_entry("10.0.0.0/"), ("10.0.0.0", 32));
        assert_eq!(split_entry("10.0.0.0/x"), ("10.0.0.0", 32));
        assert_eq!(split_entry("10.0.0.0/-4"), ("10.0.0.0", 32));
        assert_eq!(split_entry("10.0.0.0/16 "), ("10.0.0.0", 16));
    }

    #[test]
    fn rejects_non_ipv4() {
        assert!(to_bit_string("1example.com").is_none());
        assert!(to_bit_string("300.1.1.1/8").is_none());
    }

    #[test]
    fn host_entry_is_slash_32() {
        let entry = host_entry(Ipv4Addr::new(192, 168, 1, 5));
        assert_eq!(entry, "192.168.1.5/32");
        assert_eq!(to_bit_string(&entry).unwrap(), ip_bits(Ipv4Addr::new(192, 168, 1, 5), 32));
    }
}
