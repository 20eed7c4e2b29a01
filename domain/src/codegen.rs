//! Short code generation strategies.

use rand::Rng;

use crate::{CodeGenerator, ShortCode};

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Default code length; 62^7 leaves collisions rare for small stores.
pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Returns the base62 alphabet as bytes.
pub fn alphabet() -> &'static [u8] {
    &ALPHABET[..]
}

/// Uniformly random base62 codes of a fixed length. Not coordinated with the
/// store; callers handle collisions at insert time.
#[derive(Clone, Debug)]
pub struct RandomCodeGenerator {
    length: usize,
    /// Codes that must never be handed out, e.g. ones shadowed by routes.
    reserved: Vec<String>,
}

impl RandomCodeGenerator {
    /// A zero length is bumped to one so every code is well formed.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
            reserved: Vec::new(),
        }
    }

    /// Redraw whenever one of `codes` comes up. At least one code of the
    /// configured length must stay unreserved.
    pub fn with_reserved<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_reserved(&self, code: &str) -> bool {
        self.reserved.iter().any(|r| r == code)
    }

    fn draw(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> ShortCode {
        let mut code = self.draw();
        while self.is_reserved(&code) {
            code = self.draw();
        }
        // alphanumeric by construction
        ShortCode(code)
    }
}
