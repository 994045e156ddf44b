use std::cmp;
use std::fmt::Write;

/// Canonical hex display (`hexdump -C` style): the offset in hexadecimal, sixteen
/// space-separated two-column bytes, followed by the same bytes as printable characters
/// enclosed in `|` characters.
///
/// `offset` is added to the addresses shown, so a slice of a larger buffer keeps its real
/// positions.
pub fn hexdump(data: &[u8], offset: usize) -> String {
    let mut out = String::new();
    let mut address = 0;

    while address < data.len() {
        let end = cmp::min(address + 16, data.len());
        write_line(&mut out, &data[address..end], address + offset);
        address += 16;
    }

    out
}

/// A hexdump of up to `radius` bytes on each side of `position`, used to show where decoding
/// stopped.
pub fn hexdump_around(data: &[u8], position: usize, radius: usize) -> String {
    let position = cmp::min(position, data.len());
    let start = position.saturating_sub(radius) & !0xf;
    let end = cmp::min(position + radius, data.len());
    hexdump(&data[start..end], start)
}

fn write_line(out: &mut String, line: &[u8], address: usize) {
    let _ = write!(out, "{:08x}:", address);

    for b in line {
        let _ = write!(out, " {:02x}", b);
    }

    // align
    for _ in line.len()..16 {
        out.push_str("   ");
    }

    out.push_str("  |");
    for &c in line {
        // replace all control chars with dots
        if c.is_ascii_graphic() || c == b' ' {
            out.push(c as char);
        } else {
            out.push('.');
        }
    }
    out.push_str("|\n");
}
