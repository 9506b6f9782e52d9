use rand::Rng;
use sqlx::SqlitePool;

use crate::db;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 8;

/// One draw of an 8-character code from the 36-symbol alphabet.
pub fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Draws codes until one is absent from the store. The UNIQUE column is
/// still the final guard: an insert race remains possible and the caller
/// retries on that specific violation.
pub async fn issue(db: &SqlitePool) -> Result<String, sqlx::Error> {
    loop {
        let code = random_code();
        if !db::classes::invite_code_exists(db, &code).await? {
            return Ok(code);
        }
    }
}
