use core::fmt;

/// One of the 26 selectable letter keys.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Letter {
    A = 0,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
}

impl Letter {
    pub const COUNT: usize = 26;

    #[rustfmt::skip]
    pub const ALL: [Letter; Letter::COUNT] = {
        use Letter::*;
        [A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z]
    };

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    pub const fn as_char(self) -> char {
        (b'A' + self as u8) as char
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Logical identifier of a physical button.
///
/// Letters toggle the selection; `Commit` and `Erase` are control keys and
/// never enter a selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    Letter(Letter),
    Commit,
    Erase,
}

impl Key {
    /// Number of distinct key identifiers, letters plus the two control keys.
    pub const COUNT: usize = Letter::COUNT + 2;

    /// Dense index in `0..Key::COUNT`, used for the reverse lookup tables.
    pub const fn index(self) -> usize {
        match self {
            Key::Letter(letter) => letter.index(),
            Key::Commit => Letter::COUNT,
            Key::Erase => Letter::COUNT + 1,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            i if i < Letter::COUNT => Some(Key::Letter(Letter::ALL[i])),
            i if i == Letter::COUNT => Some(Key::Commit),
            i if i == Letter::COUNT + 1 => Some(Key::Erase),
            _ => None,
        }
    }

    pub const fn is_control(self) -> bool {
        matches!(self, Key::Commit | Key::Erase)
    }
}

impl From<Letter> for Key {
    fn from(letter: Letter) -> Self {
        Key::Letter(letter)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Letter(letter) => fmt::Display::fmt(letter, f),
            Key::Commit => f.write_str("RETURN"),
            Key::Erase => f.write_str("BACKSPACE"),
        }
    }
}
