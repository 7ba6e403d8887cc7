use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit set of flags accepted by `predict` and `prefix_search`.
///
/// The numeric values are part of the external interface and never change.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PredictOptions(u32);

impl PredictOptions {
    pub const NONE: Self = Self(0);
    /// Fold case on both the prefix and the candidate word.
    pub const CASE_INSENSITIVE: Self = Self(1 << 0);
    /// Fold case only where the prefix character is lowercase.
    pub const CASE_INSENSITIVE_SMART: Self = Self(1 << 1);
    /// Strip accents on both the prefix and the candidate word.
    pub const ACCENT_INSENSITIVE: Self = Self(1 << 2);
    /// Strip accents only where the prefix character is unaccented.
    pub const ACCENT_INSENSITIVE_SMART: Self = Self(1 << 3);
    /// Drop words starting with an uppercase letter.
    pub const IGNORE_CAPITALIZED: Self = Self(1 << 4);
    /// Drop words not starting with an uppercase letter.
    pub const IGNORE_NON_CAPITALIZED: Self = Self(1 << 5);
    pub const INCLUDE_CONTROL_WORDS: Self = Self(1 << 6);
    /// Leave results in candidate order.
    pub const NO_SORT: Self = Self(1 << 7);
    pub const NORMALIZE: Self = Self(1 << 8);

    /// Options that force a filtering pass over the vocabulary even
    /// without a prefix.
    pub const FILTER_OPTIONS: Self = Self(
        Self::CASE_INSENSITIVE.0
            | Self::CASE_INSENSITIVE_SMART.0
            | Self::ACCENT_INSENSITIVE.0
            | Self::ACCENT_INSENSITIVE_SMART.0
            | Self::IGNORE_CAPITALIZED.0
            | Self::IGNORE_NON_CAPITALIZED.0,
    );

    const NAMES: [(Self, &'static str); 9] = [
        (Self::CASE_INSENSITIVE, "CASE_INSENSITIVE"),
        (Self::CASE_INSENSITIVE_SMART, "CASE_INSENSITIVE_SMART"),
        (Self::ACCENT_INSENSITIVE, "ACCENT_INSENSITIVE"),
        (Self::ACCENT_INSENSITIVE_SMART, "ACCENT_INSENSITIVE_SMART"),
        (Self::IGNORE_CAPITALIZED, "IGNORE_CAPITALIZED"),
        (Self::IGNORE_NON_CAPITALIZED, "IGNORE_NON_CAPITALIZED"),
        (Self::INCLUDE_CONTROL_WORDS, "INCLUDE_CONTROL_WORDS"),
        (Self::NO_SORT, "NO_SORT"),
        (Self::NORMALIZE, "NORMALIZE"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag in `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for PredictOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for PredictOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

impl From<u32> for PredictOptions {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for PredictOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "PredictOptions({})", names.join(" | "))
    }
}
