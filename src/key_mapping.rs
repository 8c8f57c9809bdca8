//! Static wiring of the recorder: which key sits at which matrix cell, and
//! which LED on the strip lights it.
//!
//! The LED tables follow the strip's physical routing (it snakes back along
//! the middle row), so they are a permutation of the scan order and must not
//! be "tidied".

use crate::{
    error::LayoutError,
    key_codes::{
        Key::{self, Commit, Erase},
        Letter::{self, *},
    },
};

const fn k(letter: Letter) -> Key {
    Key::Letter(letter)
}

pub const PRIMARY_ROWS: usize = 3;
pub const PRIMARY_COLS: usize = 7;
pub const AUXILIARY_ROWS: usize = 2;
pub const AUXILIARY_COLS: usize = 2;
pub const NUM_PIXELS: usize = 26;

#[rustfmt::skip]
pub const PRIMARY_KEYS: [[Key; PRIMARY_COLS]; PRIMARY_ROWS] = [
    [k(A), k(B), k(C), k(D), k(E), k(F), k(G)],
    [k(I), k(J), k(K), k(L), k(M), k(N), k(O)],
    [k(P), k(Q), k(R), k(S), k(T), k(U), k(V)],
];

#[rustfmt::skip]
pub const PRIMARY_LEDS: [[u8; PRIMARY_COLS]; PRIMARY_ROWS] = [
    [ 0,  1,  2,  3,  4,  5,  6],
    [16, 15, 14, 13, 12, 11, 10],
    [17, 18, 19, 20, 21, 22, 23],
];

#[rustfmt::skip]
pub const AUXILIARY_KEYS: [[Key; AUXILIARY_COLS]; AUXILIARY_ROWS] = [
    [k(H), Commit],
    [k(X), Erase],
];

#[rustfmt::skip]
pub const AUXILIARY_LEDS: [[u8; AUXILIARY_COLS]; AUXILIARY_ROWS] = [
    [ 7,  8],
    [24, 25],
];

/// The layout of the recorder board.
pub type RecorderLayout =
    KeyLayout<PRIMARY_ROWS, PRIMARY_COLS, AUXILIARY_ROWS, AUXILIARY_COLS>;

/// Builds and validates the recorder board's layout.
pub fn recorder_layout() -> Result<RecorderLayout, LayoutError> {
    KeyLayout::new(
        GridMap { keys: PRIMARY_KEYS, leds: PRIMARY_LEDS },
        GridMap { keys: AUXILIARY_KEYS, leds: AUXILIARY_LEDS },
        NUM_PIXELS,
    )
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Grid {
    Primary,
    Auxiliary,
}

/// A physical button, addressed by its grid and its row/column line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixPosition {
    pub grid: Grid,
    pub row: usize,
    pub col: usize,
}

impl MatrixPosition {
    pub const fn new(grid: Grid, row: usize, col: usize) -> Self {
        Self { grid, row, col }
    }
}

/// Index of a pixel on the LED strip.
///
/// A strip holds at most [`LedIndex::SLOTS`] pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedIndex(pub u8);

impl LedIndex {
    pub const SLOTS: usize = u8::MAX as usize + 1;

    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

/// Key and LED assignment of one grid, indexed `[row][col]`.
#[derive(Copy, Clone, Debug)]
pub struct GridMap<const ROWS: usize, const COLS: usize> {
    pub keys: [[Key; COLS]; ROWS],
    pub leds: [[u8; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> GridMap<ROWS, COLS> {
    fn cells(&self) -> impl Iterator<Item = (usize, usize, Key, u8)> + '_ {
        self.keys.iter().zip(self.leds.iter()).enumerate().flat_map(|(row, (keys, leds))| {
            let cells = keys.iter().zip(leds.iter()).enumerate();
            cells.map(move |(col, (key, led))| (row, col, *key, *led))
        })
    }

    fn placed(&self, grid: Grid) -> impl Iterator<Item = (MatrixPosition, Key, u8)> + '_ {
        self.cells()
            .map(move |(row, col, key, led)| (MatrixPosition::new(grid, row, col), key, led))
    }
}

/// Validated bijection between keys, matrix positions and LEDs.
///
/// Built once at startup; lookups never fail for a key the table binds.
#[derive(Clone, Debug)]
pub struct KeyLayout<const PR: usize, const PC: usize, const AR: usize, const AC: usize> {
    primary: GridMap<PR, PC>,
    auxiliary: GridMap<AR, AC>,
    num_pixels: usize,
    positions: [Option<MatrixPosition>; Key::COUNT],
    leds: [Option<LedIndex>; Key::COUNT],
    commit_led: LedIndex,
    erase_led: LedIndex,
}

impl<const PR: usize, const PC: usize, const AR: usize, const AC: usize>
    KeyLayout<PR, PC, AR, AC>
{
    /// Validate the two grid tables against a strip of `num_pixels` LEDs.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if a key is bound twice, two keys share an
    /// LED, an LED lies beyond the strip, a control key is missing, or the
    /// strip is longer than [`LedIndex`] can address.
    pub fn new(
        primary: GridMap<PR, PC>,
        auxiliary: GridMap<AR, AC>,
        num_pixels: usize,
    ) -> Result<Self, LayoutError> {
        if num_pixels > LedIndex::SLOTS {
            return Err(LayoutError::StripTooLong { num_pixels });
        }

        let mut positions = [None; Key::COUNT];
        let mut leds = [None; Key::COUNT];
        let mut led_owner: [Option<Key>; LedIndex::SLOTS] = [None; LedIndex::SLOTS];

        let cells = primary.placed(Grid::Primary).chain(auxiliary.placed(Grid::Auxiliary));

        for (position, key, led) in cells {
            if led as usize >= num_pixels {
                return Err(LayoutError::LedOutOfRange { key, led, num_pixels });
            }
            if positions[key.index()].is_some() {
                return Err(LayoutError::DuplicateKey { key });
            }
            if let Some(first) = led_owner[led as usize] {
                return Err(LayoutError::DuplicateLed { led, first, second: key });
            }

            led_owner[led as usize] = Some(key);
            positions[key.index()] = Some(position);
            leds[key.index()] = Some(LedIndex(led));
        }

        let control_led = |key: Key| leds[key.index()].ok_or(LayoutError::MissingControlKey(key));
        let commit_led = control_led(Key::Commit)?;
        let erase_led = control_led(Key::Erase)?;

        Ok(Self { primary, auxiliary, num_pixels, positions, leds, commit_led, erase_led })
    }

    pub fn position_of(&self, key: Key) -> Option<MatrixPosition> {
        self.positions[key.index()]
    }

    pub fn led_of(&self, key: Key) -> Option<LedIndex> {
        self.leds[key.index()]
    }

    pub fn key_at(&self, position: MatrixPosition) -> Option<Key> {
        let MatrixPosition { grid, row, col } = position;
        match grid {
            Grid::Primary => self.primary.keys.get(row)?.get(col).copied(),
            Grid::Auxiliary => self.auxiliary.keys.get(row)?.get(col).copied(),
        }
    }

    /// Every key bound by this layout, in dense key order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        (0..Key::COUNT).filter_map(|index| {
            self.positions[index].and_then(|_| Key::from_index(index))
        })
    }

    pub fn num_pixels(&self) -> usize {
        self.num_pixels
    }

    pub fn commit_led(&self) -> LedIndex {
        self.commit_led
    }

    pub fn erase_led(&self) -> LedIndex {
        self.erase_led
    }
}
