mod byte_cursor;
mod byte_writer;
pub(crate) mod bytes;
mod hexdump;

pub use self::byte_cursor::{ByteCursor, Endian, decode_text};
pub use self::byte_writer::{ByteWriter, encode_text};
pub use self::hexdump::{hexdump, hexdump_around};
