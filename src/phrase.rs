//! # Recovery Phrase (BIP39)
//!
//! Generation and validation of the 12-word recovery phrase that keys the
//! main store.
//!
//! | Aspect   | Value                                        |
//! |----------|----------------------------------------------|
//! | Entropy  | 128 bits from the OS CSPRNG                  |
//! | Checksum | 4 bits (catches typos and swapped words)     |
//! | Wordlist | BIP39 English, 2048 words                    |
//! | Display  | Show once, never log                         |
//!
//! The phrase's text is the secret itself: store keys are derived from the
//! normalized sentence, not from the BIP39 PBKDF2 seed. Two phrases that
//! differ in a single word therefore produce unrelated keys.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Number of words in a recovery phrase
pub const WORD_COUNT: usize = 12;

/// Entropy size in bytes for 12 words (128 bits)
const ENTROPY_BYTES: usize = 16;

/// A BIP39 recovery phrase
///
/// ## Security Warning
///
/// - This phrase can fully recover the vault's main store
/// - Should be shown to the user exactly once
/// - Should never be logged or stored in plaintext outside the seed store
#[derive(ZeroizeOnDrop)]
pub struct RecoveryPhrase {
    /// The underlying BIP39 mnemonic
    #[zeroize(skip)] // bip39::Mnemonic doesn't implement Zeroize
    mnemonic: Mnemonic,
}

impl RecoveryPhrase {
    /// Generate a new random recovery phrase
    pub fn generate() -> Result<Self> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| Error::KeyDerivationFailed(format!("Failed to generate mnemonic: {}", e)))?;

        Ok(Self { mnemonic })
    }

    /// Parse a recovery phrase from its sentence form
    ///
    /// ## Validation
    ///
    /// - Must be exactly 12 words
    /// - All words must be in the BIP39 English wordlist
    /// - Checksum must be valid
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)
            .map_err(|e| Error::InvalidRecoveryPhrase(format!("{}", e)))?;

        if mnemonic.word_count() != WORD_COUNT {
            return Err(Error::InvalidRecoveryPhrase(format!(
                "Expected {} words, got {}",
                WORD_COUNT,
                mnemonic.word_count()
            )));
        }

        Ok(Self { mnemonic })
    }

    /// Parse from a list of words
    pub fn from_words(words: &[&str]) -> Result<Self> {
        if words.len() != WORD_COUNT {
            return Err(Error::InvalidRecoveryPhrase(format!(
                "Expected {} words, got {}",
                WORD_COUNT,
                words.len()
            )));
        }

        let phrase = words.join(" ");
        Self::from_phrase(&phrase)
    }

    /// Get the words as a vector
    pub fn words(&self) -> Vec<&'static str> {
        self.mnemonic.words().collect()
    }

    /// Get the phrase as a single string (words separated by spaces)
    ///
    /// Only use this for display and for handing to the vault. Never log.
    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    /// Validate a phrase without creating a `RecoveryPhrase`
    ///
    /// Useful for UI validation before submission.
    pub fn validate(phrase: &str) -> Result<()> {
        Self::from_phrase(phrase)?;
        Ok(())
    }

    /// Check if a single word is in the BIP39 wordlist
    pub fn is_valid_word(word: &str) -> bool {
        let word_lower = word.to_lowercase();
        Language::English
            .word_list()
            .iter()
            .any(|w| *w == word_lower)
    }

    /// Get word suggestions for autocomplete
    ///
    /// Returns up to ten wordlist entries starting with the given prefix.
    pub fn suggest_words(prefix: &str) -> Vec<&'static str> {
        if prefix.is_empty() {
            return vec![];
        }

        let prefix_lower = prefix.to_lowercase();
        let mut suggestions = Vec::new();

        for word in Language::English.word_list().iter() {
            if word.starts_with(&prefix_lower) {
                suggestions.push(*word);
                if suggestions.len() >= 10 {
                    break;
                }
            }
        }

        suggestions
    }
}

// Prevent accidental logging
impl std::fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoveryPhrase([REDACTED])")
    }
}

// ============================================================================
// TESTS
// ============================================================================
