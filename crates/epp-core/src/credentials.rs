//! Random auth-info passwords and object ids
//!
//! Registries reject weak auth-info, so every generated password mixes
//! all four character classes. Generation needs no I/O and never fails.

use rand::Rng;
use rand::seq::SliceRandom;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!=+-";

/// Literal prefix of every generated password
pub const PASSWORD_PREFIX: &str = "aA1";

/// Length of generated object ids
pub const OBJECT_ID_LEN: usize = 12;

/// Generate an auth-info password with the thread-local RNG
pub fn generate_password() -> String {
    generate_password_with(&mut rand::thread_rng())
}

/// Generate an auth-info password from `rng`
///
/// `aA1` followed by a shuffled body of 10 to 13 characters holding at
/// least one uppercase letter, lowercase letter, digit and symbol.
pub fn generate_password_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let body_len = rng.gen_range(10..=13);

    let mut body: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS]
        .iter()
        .map(|class| pick(rng, class))
        .collect();

    let alphabet: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();
    while body.len() < body_len {
        body.push(pick(rng, &alphabet));
    }
    body.shuffle(rng);

    let mut password = String::with_capacity(PASSWORD_PREFIX.len() + body.len());
    password.push_str(PASSWORD_PREFIX);
    password.extend(body.into_iter().map(char::from));
    password
}

/// Generate a contact/object id with the thread-local RNG
pub fn generate_object_id() -> String {
    generate_object_id_with(&mut rand::thread_rng())
}

/// Generate a 12-character id over `A-Z0-9` from `rng`
pub fn generate_object_id_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let alphabet: Vec<u8> = [UPPER, DIGITS].concat();
    (0..OBJECT_ID_LEN)
        .map(|_| char::from(pick(rng, &alphabet)))
        .collect()
}

fn pick<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8]) -> u8 {
    alphabet[rng.gen_range(0..alphabet.len())]
}
