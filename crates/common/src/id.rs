//! ID and secret generation utilities.

use rand::{Rng, distributions::Alphanumeric, seq::SliceRandom};
use ulid::Ulid;
use uuid::Uuid;

/// Default length of a poll modification code.
pub const DEFAULT_MODIFICATION_CODE_LENGTH: usize = 8;

const ADJECTIVES: &[&str] = &[
    "Quick", "Clever", "Wise", "Happy", "Sunny", "Brave", "Calm", "Eager", "Gentle", "Jolly",
    "Keen", "Lively", "Merry", "Nice", "Proud", "Silly", "Witty", "Zany", "Sparkling", "Vivid",
    "Radiant", "Playful", "Dynamic",
];

const NOUNS: &[&str] = &[
    "Fox", "Owl", "Panda", "Tiger", "Lion", "Bear", "Wolf", "Eagle", "Hawk", "Robin", "Sparrow",
    "Badger", "Beaver", "Otter", "Quokka", "Koala", "Lemur", "Meerkat", "Penguin", "Dolphin",
    "Whale", "Unicorn", "Dragon",
];

/// Generator for entity IDs, voter tokens and modification codes.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    code_length: usize,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code_length: DEFAULT_MODIFICATION_CODE_LENGTH,
        }
    }

    /// Create a generator producing modification codes of the given length.
    #[must_use]
    pub const fn with_code_length(code_length: usize) -> Self {
        Self { code_length }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable and shorter than UUIDs when
    /// represented as strings.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an opaque voter token.
    ///
    /// Random UUID v4, no time component.
    #[must_use]
    pub fn generate_voter_token(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a modification code from the thread-local CSPRNG.
    #[must_use]
    pub fn generate_modification_code(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.code_length)
            .map(char::from)
            .collect()
    }

    /// Generate a random "Adjective Noun" display name.
    #[must_use]
    pub fn generate_display_name(&self) -> String {
        let mut rng = rand::thread_rng();
        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Quick");
        let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Fox");
        format!("{adjective} {noun}")
    }
}
