//! Line-21 odd parity and the XDS packet checksum.
//!
//! Every byte carried on line 21 holds 7 data bits plus an odd parity bit
//! in the MSB. XDS packets additionally carry a 7-bit two's complement
//! checksum over every byte from the start code through the end code.

/// Strip the parity bit from a line-21 byte.
///
/// Returns `None` when the byte does not have odd parity.
#[inline]
pub fn unpar8(byte: u8) -> Option<u8> {
    if byte.count_ones() & 1 == 1 {
        Some(byte & 0x7F)
    } else {
        None
    }
}

/// Set the parity bit of a 7-bit value so the result has odd parity.
#[inline]
pub fn par8(value: u8) -> u8 {
    let value = value & 0x7F;
    if value.count_ones() & 1 == 1 {
        value
    } else {
        value | 0x80
    }
}

/// Unpack a line-21 byte pair, reporting the first byte that fails parity.
pub fn unpar_pair(pair: [u8; 2]) -> (Option<u8>, Option<u8>) {
    (unpar8(pair[0]), unpar8(pair[1]))
}

/// Running checksum of an XDS packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XdsChecksum {
    sum: u8,
}

impl XdsChecksum {
    /// Start a new checksum with the two bytes of a start code.
    pub fn start(class: u8, kind: u8) -> Self {
        let mut sum = Self::default();
        sum.push(class);
        sum.push(kind);
        sum
    }

    /// Add one byte to the checksum.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
    }

    /// Add a byte pair.
    #[inline]
    pub fn push_pair(&mut self, d1: u8, d2: u8) {
        self.push(d1);
        self.push(d2);
    }

    /// The raw 8-bit sum so far.
    pub fn sum(&self) -> u8 {
        self.sum
    }

    /// The checksum a transmitter would send for the bytes seen so far.
    pub fn expected(&self) -> u8 {
        (!self.sum).wrapping_add(1) & 0x7F
    }

    /// Whether `received` matches the bytes seen so far.
    pub fn matches(&self, received: u8) -> bool {
        self.expected() == received & 0x7F
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpar8() {
        // 0x80 is the usual filler: 0x00 with the parity bit set.
        assert_eq!(unpar8(0x80), Some(0x00));
        assert_eq!(unpar8(0x00), None);
        assert_eq!(unpar8(0x01), Some(0x01));
        assert_eq!(unpar8(0x94), Some(0x14));
        assert_eq!(unpar8(0x14), None);
    }

    #[test]
    fn test_par8_produces_odd_parity() {
        for value in 0u8..0x80 {
            let coded = par8(value);
            assert_eq!(coded.count_ones() & 1, 1, "value 0x{:02X}", value);
            assert_eq!(unpar8(coded), Some(value));
        }
    }

    #[test]
    fn test_unpar_pair() {
        assert_eq!(unpar_pair([0x94, 0x2C]), (Some(0x14), None));
        assert_eq!(unpar_pair([par8(b'H'), par8(b'I')]), (Some(b'H'), Some(b'I')));
    }

    #[test]
    fn test_xds_checksum() {
        // Current class, program identification number, 5:03 on Feb 1.
        let mut sum = XdsChecksum::start(0x01, 0x01);
        sum.push_pair(0x45, 0x43);
        sum.push_pair(0x41, 0x42);
        sum.push(0x0F);
        let total: u32 = [0x01u32, 0x01, 0x45, 0x43, 0x41, 0x42, 0x0F].iter().sum();
        assert_eq!(sum.sum(), (total & 0xFF) as u8);
        let expected = ((!(total as u8)).wrapping_add(1)) & 0x7F;
        assert_eq!(sum.expected(), expected);
        assert!(sum.matches(expected));
        assert!(!sum.matches(expected ^ 1));
    }

    #[test]
    fn test_xds_checksum_completes_to_zero() {
        let mut sum = XdsChecksum::start(0x05, 0x01);
        for b in b"KQED" {
            sum.push(*b);
        }
        sum.push(0x0F);
        let check = sum.expected();
        sum.push(check);
        assert_eq!(sum.sum() & 0x7F, 0);
    }
}
