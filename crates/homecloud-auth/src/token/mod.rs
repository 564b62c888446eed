//! Random one-shot tokens for email validation and password reset.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Generates URL-safe alphanumeric tokens of a fixed length.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    length: usize,
}

impl TokenGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    /// A fresh token of `[0-9A-Za-z]`.
    pub fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        for length in [1, 32, 50] {
            let token = TokenGenerator::new(length).generate();
            assert_eq!(token.len(), length);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_uses_full_alphabet() {
        let token = TokenGenerator::new(2000).generate();
        assert!(token.chars().any(|c| c.is_ascii_uppercase()));
        assert!(token.chars().any(|c| ('g'..='z').contains(&c)));
    }

    #[test]
    fn test_tokens_differ() {
        let generator = TokenGenerator::new(32);
        assert_ne!(generator.generate(), generator.generate());
    }
}
