//! Canonical Huffman decoding per RFC 1951 §3.2.2.

use crate::inflate::bitstream::BitReader;
use crate::result::{Error, ZipResult};

/// Deflate uses at most 288 symbols.
const MAX_SYMBOLS: usize = 288;
/// No deflate codeword is longer than 15 bits.
const MAX_BITS: usize = 15;

/// A canonical prefix-code decoder built from a code-length vector.
///
/// Canonical assignment makes every codeword of a given length a consecutive
/// integer, so the whole code is captured by three small per-length tables:
/// how many codewords have that length, the first codeword of that length,
/// and where that length's symbol run starts in `syms`.
pub struct HuffmanDecoder {
    count: [u16; MAX_BITS + 1],
    first_code: [u32; MAX_BITS + 1],
    first_sym: [u16; MAX_BITS + 1],
    /// Symbols with a non-zero length, in ascending (length, symbol) order.
    syms: [u16; MAX_SYMBOLS],
}

impl HuffmanDecoder {
    /// Build the decoder for the code described by `lengths`. Fails if any
    /// length exceeds 15 bits or no symbol has a non-zero length.
    pub fn new(lengths: &[u8]) -> ZipResult<Self> {
        debug_assert!(lengths.len() <= MAX_SYMBOLS);

        let mut count = [0u16; MAX_BITS + 1];
        for &len in lengths {
            if usize::from(len) > MAX_BITS {
                return Err(Error::InvalidHuffmanCode);
            }
            count[usize::from(len)] += 1;
        }
        count[0] = 0; // zero length means the symbol is absent
        if count.iter().all(|&c| c == 0) {
            return Err(Error::InvalidHuffmanCode);
        }

        // next_code[l] = (next_code[l-1] + count[l-1]) << 1, with the
        // symbol runs packed back to back in the same order.
        let mut first_code = [0u32; MAX_BITS + 1];
        let mut first_sym = [0u16; MAX_BITS + 1];
        for len in 1..=MAX_BITS {
            first_code[len] = (first_code[len - 1] + u32::from(count[len - 1])) << 1;
            first_sym[len] = first_sym[len - 1] + count[len - 1];
        }

        let mut next_sym = first_sym;
        let mut syms = [0u16; MAX_SYMBOLS];
        for (sym, &len) in lengths.iter().enumerate() {
            if len != 0 {
                let len = usize::from(len);
                syms[usize::from(next_sym[len])] = sym as u16;
                next_sym[len] += 1;
            }
        }

        Ok(HuffmanDecoder {
            count,
            first_code,
            first_sym,
            syms,
        })
    }

    /// Decode one symbol, pulling bits MSB-first into an accumulator until
    /// it matches a codeword. Fails after 15 bits without a match.
    pub fn decode(&self, br: &mut BitReader) -> ZipResult<u16> {
        let mut code = 0u32;
        for len in 1..=MAX_BITS {
            code = (code << 1) | br.read_bit()?;
            let count = u32::from(self.count[len]);
            let first = self.first_code[len];
            if count != 0 && code >= first && code - first < count {
                let index = u32::from(self.first_sym[len]) + (code - first);
                return Ok(self.syms[index as usize]);
            }
        }
        Err(Error::InvalidHuffmanCode)
    }
}
