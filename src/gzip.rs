//! The GZIP envelope (RFC 1952) around a DEFLATE stream.

use crate::crc32::Crc32;
use crate::inflate::{self, BitReader};
use crate::mem::{Arena, ArenaBuf};
use crate::result::{Error, ZipResult};

const MAGIC: [u8; 2] = [0x1F, 0x8B];
const METHOD_DEFLATE: u8 = 0x08;

/// Header flag bits.
const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
/// Bits 5..=7 are reserved and must be zero.
const FRESERVED: u8 = 0xE0;

/// Decompress one GZIP member, verifying the CRC-32 and ISIZE trailer.
///
/// The decompressed bytes live in `arena`, above the position it held on
/// entry; transient buffer growth is reclaimed before returning. Trailing
/// bytes after the member are ignored.
pub fn decompress<'a>(data: &[u8], arena: &'a Arena) -> ZipResult<&'a [u8]> {
    let checkpoint = arena.pos();
    match member(data, arena) {
        Ok(out) => out.settle(checkpoint),
        Err(err) => {
            // Nothing handed out above the checkpoint survives this frame.
            unsafe { arena.rewind_unchecked(checkpoint) };
            Err(err)
        }
    }
}

fn member<'a>(data: &[u8], arena: &'a Arena) -> ZipResult<ArenaBuf<'a>> {
    let mut br = BitReader::new(data);

    let mut header = [0u8; 10];
    br.read_bytes(&mut header)?;
    if header[0..2] != MAGIC {
        return Err(Error::InvalidMagic);
    }
    if header[2] != METHOD_DEFLATE {
        return Err(Error::UnsupportedMethod(u16::from(header[2])));
    }
    let flags = header[3];
    if flags & FRESERVED != 0 {
        return Err(Error::InvalidHeader);
    }
    // mtime, xfl and os carry no information we act on.

    if flags & FEXTRA != 0 {
        let extra_len = br.read_u16_le()?;
        br.read_slice(usize::from(extra_len))?;
    }
    if flags & FNAME != 0 {
        skip_zero_terminated(&mut br)?;
    }
    if flags & FCOMMENT != 0 {
        skip_zero_terminated(&mut br)?;
    }
    if flags & FHCRC != 0 {
        br.read_slice(2)?;
    }

    // Inflate block by block, folding each newly appended range into the
    // running (unfinalized) checksum.
    let mut out = ArenaBuf::with_capacity(arena, data.len().saturating_mul(4).max(64))?;
    let mut crc = Crc32::new();
    loop {
        let appended_from = out.len();
        let finished = inflate::inflate_block(&mut br, &mut out)?;
        crc.update(&out.as_slice()[appended_from..]);
        if finished {
            break;
        }
    }

    let stored_crc = br.read_u32_le()?;
    let stored_size = br.read_u32_le()?;
    let actual = crc.finalize();
    if actual != stored_crc {
        return Err(Error::InvalidChecksum {
            expected: stored_crc,
            actual,
        });
    }
    if stored_size != out.len() as u32 {
        return Err(Error::InvalidSize);
    }
    Ok(out)
}

/// Skip a NUL-terminated header field.
fn skip_zero_terminated(br: &mut BitReader) -> ZipResult<()> {
    loop {
        let byte = br.read_slice(1)?;
        if byte[0] == 0 {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn arena() -> Arena {
        Arena::with_capacity(1 << 22, 1 << 16).unwrap()
    }

    #[test]
    fn reserved_flag_bits_are_rejected() {
        let mut data = vec![0x1F, 0x8B, 0x08, 0x20, 0, 0, 0, 0, 0, 3];
        data.extend_from_slice(&[0x03, 0x00]);
        let arena = arena();
        assert!(matches!(
            decompress(&data, &arena),
            Err(Error::InvalidHeader)
        ));
    }

    #[test]
    fn failure_leaves_no_allocation_behind() {
        let mut arena = arena();
        let mark = arena.pos();
        assert!(decompress(&[0x1F, 0x8B], &arena).is_err());
        assert_eq!(arena.pos(), mark);
        arena.clear();
    }
}
