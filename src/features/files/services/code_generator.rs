use rand::Rng;

/// Characters a share code is drawn from (uppercase letters and digits)
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of candidate share codes
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;

    /// Length of every code this generator produces
    fn code_length(&self) -> usize;
}

/// Uniform random codes over [`CODE_ALPHABET`]. Not cryptographically strong;
/// codes are lookup keys, not secrets.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    fn code_length(&self) -> usize {
        self.length
    }
}

/// Trim and uppercase a caller-supplied code for lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// True when `code` could have been issued by a generator of `length`
pub fn is_well_formed(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}
