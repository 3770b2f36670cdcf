/// Microblog Crypto Library
///
/// Credential hashing for accounts. Passwords are stored as Argon2id PHC
/// strings with a per-hash random salt; plaintext never leaves this crate.

pub mod password;

pub use password::{PasswordError, PasswordHasher, hash_password, verify_password};
