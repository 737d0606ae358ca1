//! The fixed character alphabet, its integer index, and alphabet projection.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{QavecError, Result};
use crate::normalize::collapse_spaces;

/// Integer identifier assigned to an alphabet character.
pub type CharId = u32;

/// Index value reserved for padding and unknown characters; never assigned
/// to an alphabet member.
pub const PAD_ID: CharId = 0;

/// Replacement for URL-like substrings during normalization. Deliberately
/// outside the alphabet, so it survives only until projection.
pub const URL_TOKEN: char = '§';

/// Question-side marker for characters outside the alphabet. Also outside
/// the alphabet, so it encodes to [`PAD_ID`] and stays maskable.
pub const OOV_TOKEN: char = 'ü';

/// Printable ASCII in canonical order: digits, lowercase, uppercase,
/// punctuation, whitespace.
const PRINTABLE: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ \t\n\r\x0b\x0c";

/// Punctuation block removed from the printable set.
const EXCLUDED_PUNCTUATION: &str = "[\\]^_`{|}~";
/// Whitespace control characters removed from the printable set.
const EXCLUDED_WHITESPACE: &str = "\t\n\r\x0b\x0c";
/// Comparator characters removed from the printable set.
const EXCLUDED_COMPARATORS: &str = ";<=>";
/// Arithmetic characters removed from the printable set.
const EXCLUDED_ARITHMETIC: &str = "*+";

/// The ordered set of characters a trained model is allowed to see.
///
/// Construction is deterministic and parameter-free: printable ASCII minus
/// uppercase Latin letters and the fixed exclusion sets, preserving the
/// canonical printable order. Read-only after construction and shared by
/// reference across every normalization and vectorization call of a run.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
    members: FxHashSet<char>,
}

impl Alphabet {
    /// Builds the fixed alphabet. Identical output on every call.
    pub fn generate() -> Self {
        let excluded: FxHashSet<char> = EXCLUDED_PUNCTUATION
            .chars()
            .chain(EXCLUDED_WHITESPACE.chars())
            .chain(EXCLUDED_COMPARATORS.chars())
            .chain(EXCLUDED_ARITHMETIC.chars())
            .collect();
        let chars: Vec<char> = PRINTABLE
            .chars()
            .filter(|c| !c.is_ascii_uppercase() && !excluded.contains(c))
            .collect();
        let members = chars.iter().copied().collect();
        Self { chars, members }
    }

    /// Rebuilds an alphabet from an explicit member list, for example the
    /// ordering carried by a persisted character index.
    pub fn from_chars(chars: &[char]) -> Self {
        Self {
            chars: chars.to_vec(),
            members: chars.iter().copied().collect(),
        }
    }

    /// Returns true when `c` is an alphabet member.
    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        self.members.contains(&c)
    }

    /// Returns the members in index order.
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns true when the alphabet has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Question-side projection: characters outside the alphabet are replaced
    /// with [`OOV_TOKEN`] so the encoder keeps the positional signal, then
    /// space runs are collapsed and the result trimmed.
    #[must_use]
    pub fn project_question(&self, text: &str) -> String {
        let marked: String = text
            .chars()
            .map(|c| if self.contains(c) { c } else { OOV_TOKEN })
            .collect();
        collapse_spaces(&marked)
    }

    /// Answer-side projection: characters outside the alphabet are replaced
    /// with a space so the decoder never has to reproduce denoising
    /// artifacts, then space runs are collapsed and the result trimmed.
    #[must_use]
    pub fn project_answer(&self, text: &str) -> String {
        let scrubbed: String = text
            .chars()
            .map(|c| if self.contains(c) { c } else { ' ' })
            .collect();
        collapse_spaces(&scrubbed)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::generate()
    }
}

/// Bijection from alphabet characters to identifiers in `[1, |alphabet|]`.
///
/// Identifier 0 is [`PAD_ID`]; [`CharIndex::char_of`] never resolves it.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharIndex {
    forward: FxHashMap<char, CharId>,
    chars: Vec<char>,
}

impl CharIndex {
    /// Derives the index from an alphabet, assigning identifiers in member
    /// order starting at 1.
    pub fn from_alphabet(alphabet: &Alphabet) -> Self {
        let mut forward = FxHashMap::default();
        let mut next: CharId = PAD_ID;
        for &c in alphabet.chars() {
            next += 1;
            forward.insert(c, next);
        }
        Self {
            forward,
            chars: alphabet.chars().to_vec(),
        }
    }

    /// Rebuilds an index from a previously persisted member ordering.
    pub fn from_ordered_chars(chars: Vec<char>) -> Result<Self> {
        let mut forward = FxHashMap::default();
        let mut next: CharId = PAD_ID;
        for &c in &chars {
            next += 1;
            if forward.insert(c, next).is_some() {
                return Err(QavecError::Serialization(format!(
                    "character {c:?} appears twice in the persisted index"
                )));
            }
        }
        Ok(Self { forward, chars })
    }

    /// Returns the identifier assigned to `c`, if `c` is indexed.
    #[must_use]
    pub fn id_of(&self, c: char) -> Option<CharId> {
        self.forward.get(&c).copied()
    }

    /// Returns the character assigned to `id`; [`PAD_ID`] resolves to `None`.
    #[must_use]
    pub fn char_of(&self, id: CharId) -> Option<char> {
        if id == PAD_ID {
            return None;
        }
        self.chars.get(id as usize - 1).copied()
    }

    /// Returns the indexed characters in identifier order.
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Returns the number of indexed characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns true when no character is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}
