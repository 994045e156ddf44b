use std::fmt;

use encoding::EncodingRef;
use encoding::all::MAC_ROMAN;

use crate::utils::Endian;

/// Default upper bound on how many groups a single counter or list may materialize.
pub const DEFAULT_MAX_REPETITIONS: usize = 1 << 20;

#[derive(Clone)]
pub struct CodecSettings {
    endian: Endian,
    text_codec: EncodingRef,
    max_repetitions: usize,
    verify_round_trip: bool,
}

impl fmt::Debug for CodecSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSettings")
            .field("endian", &self.endian)
            .field("text_codec", &self.text_codec.name())
            .field("max_repetitions", &self.max_repetitions)
            .field("verify_round_trip", &self.verify_round_trip)
            .finish()
    }
}

impl PartialEq for CodecSettings {
    fn eq(&self, other: &Self) -> bool {
        self.endian == other.endian
            && self.text_codec.name() == other.text_codec.name()
            && self.max_repetitions == other.max_repetitions
            && self.verify_round_trip == other.verify_round_trip
    }
}

impl Default for CodecSettings {
    fn default() -> Self {
        CodecSettings {
            endian: Endian::Big,
            text_codec: MAC_ROMAN,
            max_repetitions: DEFAULT_MAX_REPETITIONS,
            verify_round_trip: false,
        }
    }
}

impl CodecSettings {
    pub fn new() -> Self {
        CodecSettings::default()
    }

    /// Byte order used by every multi-byte element and by the template definition itself.
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Text encoding for labels and string elements. Defaults to Mac OS Roman.
    pub fn text_codec(mut self, text_codec: EncodingRef) -> Self {
        self.text_codec = text_codec;
        self
    }

    /// Counters or lists that would materialize more groups than this fail to decode.
    pub fn max_repetitions(mut self, max_repetitions: usize) -> Self {
        self.max_repetitions = max_repetitions.max(1);
        self
    }

    /// When set, [`Session::decode`](crate::Session::decode) re-encodes the tree right away and
    /// logs a warning if the bytes differ from the input.
    pub fn verify_round_trip(mut self, verify: bool) -> Self {
        self.verify_round_trip = verify;
        self
    }

    pub fn get_endian(&self) -> Endian {
        self.endian
    }

    pub fn get_text_codec(&self) -> EncodingRef {
        self.text_codec
    }

    pub fn get_max_repetitions(&self) -> usize {
        self.max_repetitions
    }

    pub fn should_verify_round_trip(&self) -> bool {
        self.verify_round_trip
    }
}
