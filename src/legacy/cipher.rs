//! # Scrambling Cipher
//!
//! Keyed, reversible whitening of the legacy payload.
//!
//! The first 32-bit word of a packet (address, message type, address type)
//! travels in the clear so that a receiver can derive the key selector
//! before touching the rest of the payload. The remaining five words are
//! mixed with a 128-bit block key derived from:
//!
//! - one bank of the 12-word key table (words 0-7 for version 6, 8-11 for
//!   version 7),
//! - the sender address and the current 64-second time slot,
//! - the two scalar constants, via a multiply/xor-shift finalizer.
//!
//! The block transform is an XXTEA-style network over little-endian words
//! with neighbour chaining. It is not meant to be secure; it decorrelates
//! the payload and keeps casual listeners out.

use super::protocol::LEGACY_PAYLOAD_SIZE;

/// Number of clear bytes at the start of the payload
pub const CLEAR_HEADER_SIZE: usize = 4;

/// Number of scrambled 32-bit words following the clear header
const SCRAMBLED_WORDS: usize = (LEGACY_PAYLOAD_SIZE - CLEAR_HEADER_SIZE) / 4;

/// Seconds covered by one key time slot
pub const KEY_SLOT_S: u32 = 64;

/// Distance from a slot edge within which the neighbouring slot is also tried
pub const SLOT_EDGE_S: u32 = 8;

const DELTA: u32 = 0x9e37_79b9;

const ROUNDS: u32 = 6;

/// Process-wide key material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScramblingKeySet {
    /// Primary key table: 8 words for version 6 followed by 4 for version 7
    pub table: [u32; 12],
    /// Multiplier of the key finalizer
    pub mix: u32,
    /// Mask applied to every derived key word
    pub mask: u32,
}

/// Published legacy key material
pub const LEGACY_KEYS: ScramblingKeySet = ScramblingKeySet {
    table: [
        0xe432_76df, 0xdca8_3759, 0x9802_b8ac, 0x4675_a56b, // V6
        0xfc78_ea65, 0x804b_90ea, 0xb765_42cd, 0x329d_fa32, // V6
        0xA5F9_B21C, 0xAB3F_9D12, 0xC6F3_4E34, 0xD72F_A378, // V7
    ],
    mix: 0x045d_9f3b,
    mask: 0x87b5_62f4,
};

/// Which part of the key table a layout version draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBank {
    V6,
    V7,
}

/// Address-derived selector of the block key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySelector {
    pub bank: KeyBank,
    /// 24-bit sender address from the clear header
    pub address: u32,
    /// UNIX time in seconds
    pub epoch: u32,
}

impl KeySelector {
    pub fn new(bank: KeyBank, address: u32, epoch: u32) -> Self {
        Self {
            bank,
            address: address & 0x00FF_FFFF,
            epoch,
        }
    }

    /// Table index of key word `i`
    fn table_index(&self, i: usize) -> usize {
        match self.bank {
            KeyBank::V6 if (self.epoch >> 23) & 1 == 1 => i + 4,
            KeyBank::V6 => i,
            KeyBank::V7 => 8 + i,
        }
    }

    /// Value xored into every table word before finalization
    fn tweak(&self) -> u32 {
        (self.epoch >> 6) ^ ((self.address << 8) & 0x00FF_FFFF)
    }
}

fn obscure(key: u32, seed: u32) -> u32 {
    let m1 = seed.wrapping_mul(key ^ (key >> 16));
    let m2 = seed.wrapping_mul(m1 ^ (m1 >> 16));
    m2 ^ (m2 >> 16)
}

/// Derive the 128-bit block key for a selector
pub fn derive_key(keys: &ScramblingKeySet, selector: &KeySelector) -> [u32; 4] {
    let tweak = selector.tweak();
    let mut key = [0u32; 4];

    for (i, word) in key.iter_mut().enumerate() {
        let base = keys.table[selector.table_index(i)];
        *word = obscure(base ^ tweak, keys.mix) ^ keys.mask;
    }

    key
}

#[inline]
fn mx(sum: u32, y: u32, z: u32, p: usize, e: usize, key: &[u32; 4]) -> u32 {
    (((z >> 5) ^ (y << 2)).wrapping_add((y >> 3) ^ (z << 4)))
        ^ ((sum ^ y).wrapping_add(key[(p & 3) ^ e] ^ z))
}

fn load_words(buffer: &[u8; LEGACY_PAYLOAD_SIZE]) -> [u32; SCRAMBLED_WORDS] {
    let mut words = [0u32; SCRAMBLED_WORDS];
    for (i, word) in words.iter_mut().enumerate() {
        let start = CLEAR_HEADER_SIZE + i * 4;
        *word = u32::from_le_bytes([
            buffer[start],
            buffer[start + 1],
            buffer[start + 2],
            buffer[start + 3],
        ]);
    }
    words
}

fn store_words(buffer: &mut [u8; LEGACY_PAYLOAD_SIZE], words: &[u32; SCRAMBLED_WORDS]) {
    for (i, word) in words.iter().enumerate() {
        let start = CLEAR_HEADER_SIZE + i * 4;
        buffer[start..start + 4].copy_from_slice(&word.to_le_bytes());
    }
}

fn encipher(v: &mut [u32; SCRAMBLED_WORDS], key: &[u32; 4]) {
    let n = v.len();
    let mut sum: u32 = 0;
    let mut z = v[n - 1];

    for _ in 0..ROUNDS {
        sum = sum.wrapping_add(DELTA);
        let e = ((sum >> 2) & 3) as usize;
        for p in 0..n - 1 {
            let y = v[p + 1];
            v[p] = v[p].wrapping_add(mx(sum, y, z, p, e, key));
            z = v[p];
        }
        let y = v[0];
        v[n - 1] = v[n - 1].wrapping_add(mx(sum, y, z, n - 1, e, key));
        z = v[n - 1];
    }
}

fn decipher(v: &mut [u32; SCRAMBLED_WORDS], key: &[u32; 4]) {
    let n = v.len();
    let mut sum = ROUNDS.wrapping_mul(DELTA);
    let mut y = v[0];

    for _ in 0..ROUNDS {
        let e = ((sum >> 2) & 3) as usize;
        for p in (1..n).rev() {
            let z = v[p - 1];
            v[p] = v[p].wrapping_sub(mx(sum, y, z, p, e, key));
            y = v[p];
        }
        let z = v[n - 1];
        v[0] = v[0].wrapping_sub(mx(sum, y, z, 0, e, key));
        y = v[0];
        sum = sum.wrapping_sub(DELTA);
    }
}

/// Scramble a plaintext payload in place
///
/// # Examples
///
/// ```
/// use rf_legacy::legacy::cipher::{descramble, scramble, KeyBank, KeySelector, LEGACY_KEYS};
///
/// let mut buffer = [0x42u8; 24];
/// let selector = KeySelector::new(KeyBank::V6, 0xDD1234, 1_700_000_000);
/// scramble(&mut buffer, &LEGACY_KEYS, &selector);
/// descramble(&mut buffer, &LEGACY_KEYS, &selector);
/// assert_eq!(buffer, [0x42u8; 24]);
/// ```
pub fn scramble(
    buffer: &mut [u8; LEGACY_PAYLOAD_SIZE],
    keys: &ScramblingKeySet,
    selector: &KeySelector,
) {
    let key = derive_key(keys, selector);
    let mut words = load_words(buffer);
    encipher(&mut words, &key);
    store_words(buffer, &words);
}

/// Reverse [`scramble`] in place
pub fn descramble(
    buffer: &mut [u8; LEGACY_PAYLOAD_SIZE],
    keys: &ScramblingKeySet,
    selector: &KeySelector,
) {
    let key = derive_key(keys, selector);
    let mut words = load_words(buffer);
    decipher(&mut words, &key);
    store_words(buffer, &words);
}

/// Epoch inside the neighbouring key slot, when `epoch` is close to a slot edge
///
/// Sender and receiver clocks may straddle an edge; the receiver then needs
/// the key of the slot next to its own.
pub fn adjacent_slot_epoch(epoch: u32) -> Option<u32> {
    let into_slot = epoch % KEY_SLOT_S;
    if into_slot < SLOT_EDGE_S {
        epoch.checked_sub(KEY_SLOT_S)
    } else if into_slot >= KEY_SLOT_S - SLOT_EDGE_S {
        epoch.checked_add(KEY_SLOT_S)
    } else {
        None
    }
}

/// Read the sender address from the clear header
pub fn header_address(buffer: &[u8; LEGACY_PAYLOAD_SIZE]) -> u32 {
    u32::from_le_bytes([buffer[0], buffer[1], buffer[2], 0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buffer(seed: u8) -> [u8; LEGACY_PAYLOAD_SIZE] {
        let mut buffer = [0u8; LEGACY_PAYLOAD_SIZE];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = seed.wrapping_mul(31).wrapping_add((i as u8).wrapping_mul(17));
        }
        buffer
    }

    #[test]
    fn test_descramble_inverts_scramble() {
        let epochs = [0u32, 63, 64, 1_700_000_000, 1 << 23, u32::MAX];
        let addresses = [0u32, 1, 0x00DD_1234, 0x00FF_FFFF];

        for bank in [KeyBank::V6, KeyBank::V7] {
            for &epoch in &epochs {
                for &address in &addresses {
                    let selector = KeySelector::new(bank, address, epoch);
                    for seed in 0..8u8 {
                        let original = sample_buffer(seed);
                        let mut buffer = original;
                        scramble(&mut buffer, &LEGACY_KEYS, &selector);
                        descramble(&mut buffer, &LEGACY_KEYS, &selector);
                        assert_eq!(buffer, original, "{:?}", selector);
                    }
                }
            }
        }
    }

    #[test]
    fn test_clear_header_untouched() {
        let original = sample_buffer(3);
        let mut buffer = original;
        let selector = KeySelector::new(KeyBank::V7, 0x00AB_CDEF, 1_700_000_000);
        scramble(&mut buffer, &LEGACY_KEYS, &selector);

        assert_eq!(buffer[..CLEAR_HEADER_SIZE], original[..CLEAR_HEADER_SIZE]);
        assert_ne!(buffer[CLEAR_HEADER_SIZE..], original[CLEAR_HEADER_SIZE..]);
    }

    #[test]
    fn test_wrong_time_slot_does_not_descramble() {
        let original = sample_buffer(5);
        let mut buffer = original;
        scramble(&mut buffer, &LEGACY_KEYS, &KeySelector::new(KeyBank::V6, 0x123456, 6400));
        descramble(&mut buffer, &LEGACY_KEYS, &KeySelector::new(KeyBank::V6, 0x123456, 6464));
        assert_ne!(buffer, original);
    }

    #[test]
    fn test_same_time_slot_shares_key() {
        let a = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V6, 0x123456, 6400));
        let b = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V6, 0x123456, 6463));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_banks_differ() {
        let v6 = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V6, 0x123456, 6400));
        let v6_hi = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V6, 0x123456, 6400 | 1 << 23));
        let v7 = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V7, 0x123456, 6400));
        assert_ne!(v6, v7);
        assert_ne!(v6, v6_hi);
    }

    #[test]
    fn test_adjacent_slot_epoch() {
        // 1_700_000_000 is the first second of a slot
        assert_eq!(adjacent_slot_epoch(1_700_000_000), Some(1_699_999_936));
        assert_eq!(adjacent_slot_epoch(1_700_000_007), Some(1_699_999_943));
        assert_eq!(adjacent_slot_epoch(1_700_000_008), None);
        assert_eq!(adjacent_slot_epoch(1_700_000_055), None);
        assert_eq!(adjacent_slot_epoch(1_700_000_056), Some(1_700_000_120));
        assert_eq!(adjacent_slot_epoch(3), None);
        assert_eq!(adjacent_slot_epoch(u32::MAX), None);
    }

    #[test]
    fn test_adjacent_slot_has_other_key() {
        let epoch = 1_700_000_000;
        let adjacent = adjacent_slot_epoch(epoch).unwrap();
        let own = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V7, 0x123456, epoch));
        let other = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V7, 0x123456, adjacent));
        let sender = derive_key(&LEGACY_KEYS, &KeySelector::new(KeyBank::V7, 0x123456, epoch - 1));
        assert_ne!(own, other);
        assert_eq!(other, sender);
    }

    #[test]
    fn test_header_address() {
        let mut buffer = [0u8; LEGACY_PAYLOAD_SIZE];
        buffer[..4].copy_from_slice(&0xA5DD_1234u32.to_le_bytes());
        assert_eq!(header_address(&buffer), 0x00DD_1234);
    }
}
