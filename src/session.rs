//! Session bookkeeping: which letters are selected, under which session
//! identifier, and what gets persisted on commit.

use core::fmt;

use rand::{seq::SliceRandom, Rng, RngCore};

use crate::{key_codes::Letter, time::Timestamp};

const ADJECTIVES: [&str; 10] =
    ["Quick", "Happy", "Bright", "Calm", "Sharp", "Brave", "Smart", "Kind", "Loyal", "Wise"];
const ANIMALS: [&str; 10] =
    ["Fox", "Bear", "Wolf", "Eagle", "Tiger", "Lion", "Deer", "Owl", "Hawk", "Shark"];

/// The letters chosen in the current session.
///
/// Only letters can be stored, so control keys can never end up selected.
/// Iteration is in alphabetical order.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelectionSet {
    bits: u32,
}

impl SelectionSet {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn contains(&self, letter: Letter) -> bool {
        self.bits & (1 << letter.index()) != 0
    }

    /// Returns `true` if the letter was not already selected.
    pub fn insert(&mut self, letter: Letter) -> bool {
        let added = !self.contains(letter);
        self.bits |= 1 << letter.index();
        added
    }

    /// Returns `true` if the letter was selected.
    pub fn remove(&mut self, letter: Letter) -> bool {
        let removed = self.contains(letter);
        self.bits &= !(1 << letter.index());
        removed
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Letter> + '_ {
        Letter::ALL.into_iter().filter(|letter| self.contains(*letter))
    }
}

impl FromIterator<Letter> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = Letter>>(iter: T) -> Self {
        let mut set = SelectionSet::new();
        for letter in iter {
            set.insert(letter);
        }
        set
    }
}

/// Concatenated letters, e.g. `ACK`.
impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|letter| write!(f, "{letter}"))
    }
}

impl fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectionSet({self})")
    }
}

/// Human-readable session token such as `BraveOwl4821`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionId {
    adjective: &'static str,
    animal: &'static str,
    number: u16,
}

impl SessionId {
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        Self {
            adjective: ADJECTIVES.choose(rng).copied().unwrap_or(ADJECTIVES[0]),
            animal: ANIMALS.choose(rng).copied().unwrap_or(ANIMALS[0]),
            number: rng.gen_range(1000..=9999),
        }
    }

    /// Generate an identifier guaranteed to differ from `previous`.
    pub fn generate_after<R: RngCore>(previous: &SessionId, rng: &mut R) -> Self {
        loop {
            let id = Self::generate(rng);
            if id != *previous {
                return id;
            }
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.adjective, self.animal, self.number)
    }
}

/// A committed session, written once to the session log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionRecord {
    session_id: SessionId,
    keys: SelectionSet,
    timestamp: Timestamp,
}

impl SessionRecord {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn keys(&self) -> SelectionSet {
        self.keys
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// One log line without the terminator: `session_id,KEYS,YYYY-MM-DD HH:MM:SS`.
impl fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.session_id, self.keys, self.timestamp)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Nothing selected
    Idle,
    /// At least one letter selected
    Selecting,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Toggle {
    Selected,
    Deselected,
}

/// Selection and identity of the session in progress.
pub struct SessionState<R> {
    selection: SelectionSet,
    session_id: SessionId,
    rng: R,
}

impl<R: RngCore> SessionState<R> {
    pub fn new(mut rng: R) -> Self {
        let session_id = SessionId::generate(&mut rng);
        Self { selection: SelectionSet::new(), session_id, rng }
    }

    pub fn selection(&self) -> SelectionSet {
        self.selection
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn phase(&self) -> Phase {
        if self.selection.is_empty() {
            Phase::Idle
        } else {
            Phase::Selecting
        }
    }

    pub fn toggle(&mut self, letter: Letter) -> Toggle {
        if self.selection.remove(letter) {
            Toggle::Deselected
        } else {
            self.selection.insert(letter);
            Toggle::Selected
        }
    }

    /// Close the session.
    ///
    /// With nothing selected this is a no-op and the session keeps its
    /// identifier. Otherwise the selection is turned into a record stamped
    /// with `timestamp`, cleared, and a fresh identifier is drawn.
    pub fn commit(&mut self, timestamp: Timestamp) -> Option<SessionRecord> {
        if self.selection.is_empty() {
            return None;
        }

        let record = SessionRecord { session_id: self.session_id, keys: self.selection, timestamp };
        self.selection.clear();
        self.session_id = SessionId::generate_after(&record.session_id, &mut self.rng);
        Some(record)
    }

    /// Drop the selection. The session identifier is kept.
    pub fn erase(&mut self) {
        self.selection.clear();
    }
}
