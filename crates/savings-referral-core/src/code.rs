//! Referral code generation.

use rand::Rng;

use crate::{ReferralCode, REFERRAL_CODE_LENGTH};

/// Characters allowed in generated codes (URL-safe).
pub const CODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Source of candidate referral codes.
///
/// Candidates need not be unique; the store rejects collisions and the caller
/// asks for another.
pub trait CodeGenerator: Send + Sync {
    /// Produce a candidate code.
    fn generate(&self) -> ReferralCode;
}

/// Generates random codes of [`REFERRAL_CODE_LENGTH`] characters from
/// [`CODE_ALPHABET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> ReferralCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..REFERRAL_CODE_LENGTH)
            .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
            .collect();
        ReferralCode(code)
    }
}
