//! Parent access codes.
//!
//! A code is seven uppercase ASCII letters followed by one symbol from
//! `{$, @, #, *}`, e.g. `QWERTYU#`. That is about 34.9 bits of entropy:
//! 7·log2(26) + log2(4). Codes are case-sensitive and only leading/trailing
//! whitespace is tolerated.

use rand::Rng;

pub const ACCESS_CODE_LENGTH: usize = 8;
pub const ACCESS_CODE_LETTERS: usize = 7;
pub const ACCESS_CODE_SYMBOLS: [char; 4] = ['$', '@', '#', '*'];

/// Generate a fresh code from the thread-local RNG.
/// Uniqueness is not checked here.
pub fn generate_access_code() -> String {
    generate_access_code_with(&mut rand::rng())
}

pub fn generate_access_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(ACCESS_CODE_LENGTH);
    for _ in 0..ACCESS_CODE_LETTERS {
        code.push(char::from(b'A' + rng.random_range(0..26u8)));
    }
    code.push(ACCESS_CODE_SYMBOLS[rng.random_range(0..ACCESS_CODE_SYMBOLS.len())]);
    code
}

/// True iff the trimmed input is exactly `[A-Z]{7}[$@#*]`. Never fails.
pub fn validate_access_code(code: &str) -> bool {
    let bytes = code.trim().as_bytes();
    if bytes.len() != ACCESS_CODE_LENGTH {
        return false;
    }

    let (letters, symbol) = bytes.split_at(ACCESS_CODE_LETTERS);
    letters.iter().all(u8::is_ascii_uppercase)
        && symbol[0].is_ascii()
        && ACCESS_CODE_SYMBOLS.contains(&char::from(symbol[0]))
}
