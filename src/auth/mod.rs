pub mod extractor;
pub mod jwt;
pub mod notifier;
pub mod password;
pub mod service;

use sha2::{Digest, Sha256};

pub use extractor::AuthUser;
pub use jwt::{TokenCodec, TokenKind};
pub use notifier::{LogNotifier, MailNotifier, ResetNotifier};
pub use service::AuthService;

/// 32 random bytes, hex encoded. Used for password-reset tokens.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Digest persisted in place of a bearer token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
