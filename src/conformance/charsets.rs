//! Character pools and random string generation for conformance inputs

use rand::seq::SliceRandom;
use rand::Rng;

/// ASCII letters and digits
pub const DEFAULT_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Literal forms so `concat!` can join them at compile time
macro_rules! whitespace_chars {
    () => {
        " \t\n\r\u{b}\u{c}"
    };
}

macro_rules! punctuation_chars {
    () => {
        "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~"
    };
}

pub const WHITESPACE_CHARS: &str = whitespace_chars!();

pub const PUNCTUATION_CHARS: &str = punctuation_chars!();

/// Whitespace plus punctuation
pub const DIFFICULT_CHARS: &str = concat!(whitespace_chars!(), punctuation_chars!());

/// Non-ASCII only: Hebrew, Greek, Russian and Bulgarian pangrams
pub const UNICODE_CHARS: &str = concat!(
    "זהכיףסתםלשמועאיךתנצחקרפדעץטובבגן",
    "ξεσκεπάζωτηνψυχοφθόραβδελυγμία",
    "Съешьжеещёэтихмягкихфранцузскихбулокдавыпейчаю",
    "Жълтатадюлябешещастливачепухъткойтоцъфназамръзнакатогьон",
);

// A UTF-8 string holds an ASCII char iff it holds a byte below 0x80.
const _: () = assert!(
    contains_no_ascii(UNICODE_CHARS),
    "UNICODE_CHARS must not contain ASCII characters"
);

/// True when no char in `s` is ASCII (code point <= 127)
pub const fn contains_no_ascii(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] < 0x80 {
            return false;
        }
        i += 1;
    }
    true
}

/// Input domain used to generate service, username and password strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharPool {
    Default,
    Difficult,
    Unicode,
    /// Equal parts Unicode, default and difficult characters
    Mixed,
}

impl CharPool {
    pub const ALL: [CharPool; 4] = [Self::Default, Self::Difficult, Self::Unicode, Self::Mixed];

    /// Build the character source for this pool.
    ///
    /// `Mixed` draws a fresh 30-character source (10 from each of the other
    /// pools) every call.
    pub fn source<R: Rng + ?Sized>(self, rng: &mut R) -> String {
        match self {
            Self::Default => DEFAULT_CHARS.to_string(),
            Self::Difficult => DIFFICULT_CHARS.to_string(),
            Self::Unicode => UNICODE_CHARS.to_string(),
            Self::Mixed => {
                let mut source = random_string(rng, 10, UNICODE_CHARS);
                source.push_str(&random_string(rng, 10, DEFAULT_CHARS));
                source.push_str(&random_string(rng, 10, DIFFICULT_CHARS));
                source
            }
        }
    }
}

/// `len` characters drawn with replacement from `pool`
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize, pool: &str) -> String {
    let chars: Vec<char> = pool.chars().collect();
    (0..len).filter_map(|_| chars.choose(rng)).collect()
}
