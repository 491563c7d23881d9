//! Helper module to compute a CRC32 checksum
//!
//! The reflected polynomial `0xEDB88320` with initial value and final xor
//! `0xFFFFFFFF`, i.e. the CRC-32 used by GZIP and ZIP. The 256-entry byte
//! table is built at compile time.

/// One table entry per byte value.
const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                0xEDB8_8320 ^ (crc >> 1)
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Streaming CRC-32 state.
///
/// The internal state stays *unfinalized* between [`update`](Crc32::update)
/// calls; the final xor happens only in [`finalize`](Crc32::finalize). The
/// two representations differ by `^ 0xFFFFFFFF`, and mixing them is a
/// classic source of silent mismatches — which is why the unfinalized value
/// is never exposed.
#[derive(Clone, Copy, Debug)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Start a fresh checksum.
    pub fn new() -> Self {
        Crc32 { state: 0xFFFF_FFFF }
    }

    /// Feed `data` into the running state.
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.state;
        for &byte in data {
            crc = TABLE[usize::from((crc ^ u32::from(byte)) as u8)] ^ (crc >> 8);
        }
        self.state = crc;
    }

    /// Finish and return the checksum.
    pub fn finalize(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}
