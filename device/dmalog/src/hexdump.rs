//! ```txt
//! 00000000  02 03 1F 00 0D 00 00 00  00 00 00 00 00 00 00 00   |................|
//! 00000010  68 65 6C 6C 6F                                     |hello|
//! ```

use core::fmt;
use core::fmt::{Display, Formatter, Write};

const BYTES_PER_LINE: usize = 16;

/// One row of a dump: up to sixteen bytes and the address of the first.
#[derive(Debug, Copy, Clone)]
pub struct HexdumpLine<'a> {
    address: u32,
    bytes: &'a [u8],
}

impl<'a> HexdumpLine<'a> {
    pub fn address(&self) -> u32 {
        self.address
    }
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl Display for HexdumpLine<'_> {
    /// Formats the row without a trailing line feed.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}  ", self.address)?;
        for (i, b) in self.bytes.iter().enumerate() {
            write!(f, "{b:02X} ")?;
            if i == 7 {
                f.write_char(' ')?;
            }
        }
        let shown = self.bytes.len();
        for _ in shown..BYTES_PER_LINE {
            f.write_str("   ")?;
        }
        if shown < 8 {
            f.write_char(' ')?;
        }
        f.write_str("  |")?;
        for &b in self.bytes {
            f.write_char(if (b' '..=b'~').contains(&b) {
                b as char
            } else {
                '.'
            })?;
        }
        f.write_char('|')
    }
}

/// Rows of a dump of `bytes`, numbering addresses from `base`.
pub fn lines(bytes: &[u8], base: u32) -> impl Iterator<Item = HexdumpLine<'_>> {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(move |(i, chunk)| HexdumpLine {
            address: base.wrapping_add((i * BYTES_PER_LINE) as u32),
            bytes: chunk,
        })
}

/// Write a dump of `bytes` to `out`, addresses starting at zero, one line feed per row.
pub fn hexdump<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    hexdump_at(out, bytes, 0)
}

pub fn hexdump_at<W: Write + ?Sized>(out: &mut W, bytes: &[u8], base: u32) -> fmt::Result {
    for line in lines(bytes, base) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
