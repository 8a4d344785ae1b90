//! Level notation parsing.
//!
//! Content files describe valid levels with the dot notation printed in the
//! rulebooks:
//!
//! | Notation        | Meaning                                   |
//! |-----------------|-------------------------------------------|
//! | `•••`           | fixed: exactly three dots                 |
//! | `• - •••••`     | range: one to five dots                   |
//! | `• or •••`      | choice: one or three dots                 |
//! | `• +`           | repeatable: one dot per instance          |
//! | `• - ••• +`     | repeatable: one to three dots per instance|
//!
//! Digits may replace dots (`1-5`, `3`, `2+`). Anything that does not parse
//! falls back to [`LevelNotation::FALLBACK`].

use core::fmt;

const DOT: char = '•';
const DOT_ALT: char = '●';

/// Errors raised while parsing a level notation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NotationError {
    #[error("notation is empty")]
    Empty,

    #[error("unexpected character {0:?} in notation")]
    InvalidCharacter(char),

    #[error("range {min}..{max} is inverted")]
    InvertedRange { min: u8, max: u8 },

    #[error("level {0} is not allowed here")]
    InvalidLevel(u8),

    #[error("too many range separators")]
    MalformedRange,
}

/// Semantic description of the levels a catalog entry accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum LevelNotation {
    /// Single valid level.
    Fixed(u8),
    /// Every level from `min` to `max` inclusive.
    Range { min: u8, max: u8 },
    /// An explicit set of allowed levels, sorted ascending, at least two entries.
    Choice(Vec<u8>),
    /// Any number of independent instances, each from `min` to `max`.
    Repeatable { min: u8, max: u8 },
}

impl LevelNotation {
    /// Documented fallback for notations that cannot be parsed.
    pub const FALLBACK: LevelNotation = LevelNotation::Range { min: 1, max: 5 };

    /// Parses a notation, falling back to [`Self::FALLBACK`] when ambiguous.
    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or(Self::FALLBACK)
    }

    /// Parses a notation, reporting why it is invalid.
    pub fn try_parse(raw: &str) -> Result<Self, NotationError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(NotationError::Empty);
        }

        if let Some(rest) = text.strip_suffix('+') {
            let (min, max) = match parse_span(rest)? {
                Span::Single(level) => (level, level),
                Span::Between(min, max) => (min, max),
            };
            if min == 0 {
                return Err(NotationError::InvalidLevel(0));
            }
            return Ok(Self::Repeatable { min, max });
        }

        if text.contains(',') || text.contains(" or ") {
            let mut levels = Vec::new();
            for part in text.split(',').flat_map(|part| part.split(" or ")) {
                if part.trim().is_empty() {
                    continue;
                }
                let level = parse_level(part)?;
                if level == 0 {
                    return Err(NotationError::InvalidLevel(0));
                }
                levels.push(level);
            }
            levels.sort_unstable();
            levels.dedup();
            return match levels.as_slice() {
                [] => Err(NotationError::Empty),
                [single] => Ok(Self::Fixed(*single)),
                _ => Ok(Self::Choice(levels)),
            };
        }

        match parse_span(text)? {
            Span::Single(0) => Err(NotationError::InvalidLevel(0)),
            Span::Single(level) => Ok(Self::Fixed(level)),
            Span::Between(min, max) => Ok(Self::Range { min, max }),
        }
    }

    /// Smallest level the notation admits.
    pub fn min(&self) -> u8 {
        match self {
            Self::Fixed(level) => *level,
            Self::Range { min, .. } | Self::Repeatable { min, .. } => *min,
            Self::Choice(levels) => levels.first().copied().unwrap_or(0),
        }
    }

    /// Largest level the notation admits.
    pub fn max(&self) -> u8 {
        match self {
            Self::Fixed(level) => *level,
            Self::Range { max, .. } | Self::Repeatable { max, .. } => *max,
            Self::Choice(levels) => levels.last().copied().unwrap_or(0),
        }
    }

    /// Whether `level` is one of the levels this notation admits.
    pub fn accepts(&self, level: u8) -> bool {
        match self {
            Self::Fixed(fixed) => level == *fixed,
            Self::Range { min, max } | Self::Repeatable { min, max } => {
                (*min..=*max).contains(&level)
            }
            Self::Choice(levels) => levels.contains(&level),
        }
    }

    pub fn is_repeatable(&self) -> bool {
        matches!(self, Self::Repeatable { .. })
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    /// Allowed levels in ascending order.
    pub fn levels(&self) -> Vec<u8> {
        match self {
            Self::Fixed(level) => vec![*level],
            Self::Range { min, max } | Self::Repeatable { min, max } => (*min..=*max).collect(),
            Self::Choice(levels) => levels.clone(),
        }
    }
}

impl Default for LevelNotation {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for LevelNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(level) => write_dots(f, *level),
            Self::Range { min, max } => {
                write_dots(f, *min)?;
                f.write_str(" - ")?;
                write_dots(f, *max)
            }
            Self::Choice(levels) => {
                for (i, level) in levels.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write_dots(f, *level)?;
                }
                Ok(())
            }
            Self::Repeatable { min, max } => {
                write_dots(f, *min)?;
                if max > min {
                    f.write_str(" - ")?;
                    write_dots(f, *max)?;
                }
                f.write_str(" +")
            }
        }
    }
}

/// Renders `level` as filled dots (`0` for zero).
pub fn dots(level: u8) -> String {
    if level == 0 {
        return "0".to_string();
    }
    core::iter::repeat_n(DOT, usize::from(level)).collect()
}

fn write_dots(f: &mut fmt::Formatter<'_>, level: u8) -> fmt::Result {
    f.write_str(&dots(level))
}

enum Span {
    Single(u8),
    Between(u8, u8),
}

fn parse_span(text: &str) -> Result<Span, NotationError> {
    let parts: Vec<&str> = text.split(['-', '–']).collect();
    match parts.as_slice() {
        [single] => Ok(Span::Single(parse_level(single)?)),
        [low, high] => {
            let min = parse_level(low)?;
            let max = parse_level(high)?;
            if min > max {
                return Err(NotationError::InvertedRange { min, max });
            }
            Ok(Span::Between(min, max))
        }
        _ => Err(NotationError::MalformedRange),
    }
}

fn parse_level(text: &str) -> Result<u8, NotationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(NotationError::Empty);
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return text
            .parse::<u8>()
            .map_err(|_| NotationError::InvalidCharacter(text.chars().next().unwrap_or('?')));
    }

    let mut count: u8 = 0;
    for c in text.chars() {
        match c {
            DOT | DOT_ALT => count = count.saturating_add(1),
            c if c.is_whitespace() => {}
            other => return Err(NotationError::InvalidCharacter(other)),
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed() {
        assert_eq!(LevelNotation::parse("•••"), LevelNotation::Fixed(3));
        assert_eq!(LevelNotation::parse("2"), LevelNotation::Fixed(2));
    }

    #[test]
    fn parses_range() {
        assert_eq!(
            LevelNotation::parse("• - •••••"),
            LevelNotation::Range { min: 1, max: 5 }
        );
        assert_eq!(
            LevelNotation::parse("0-10"),
            LevelNotation::Range { min: 0, max: 10 }
        );
        assert_eq!(
            LevelNotation::parse("•• – ••••"),
            LevelNotation::Range { min: 2, max: 4 }
        );
    }

    #[test]
    fn parses_choice() {
        assert_eq!(
            LevelNotation::parse("• or •••"),
            LevelNotation::Choice(vec![1, 3])
        );
        assert_eq!(
            LevelNotation::parse("•••, •, •••"),
            LevelNotation::Choice(vec![1, 3])
        );
        // A choice with a single distinct level collapses to fixed
        assert_eq!(LevelNotation::parse("•• or ••"), LevelNotation::Fixed(2));
    }

    #[test]
    fn parses_repeatable() {
        assert_eq!(
            LevelNotation::parse("• +"),
            LevelNotation::Repeatable { min: 1, max: 1 }
        );
        assert_eq!(
            LevelNotation::parse("• - ••• +"),
            LevelNotation::Repeatable { min: 1, max: 3 }
        );
        assert_eq!(
            LevelNotation::parse("2+"),
            LevelNotation::Repeatable { min: 2, max: 2 }
        );
    }

    #[test]
    fn ambiguous_notation_falls_back() {
        for raw in ["", "   ", "lots", "••• - •", "• - •• - •••", "0", "0 +"] {
            assert_eq!(
                LevelNotation::parse(raw),
                LevelNotation::FALLBACK,
                "notation {raw:?}"
            );
        }
        assert!(!LevelNotation::FALLBACK.is_repeatable());
        assert_eq!(LevelNotation::FALLBACK.min(), 1);
        assert_eq!(LevelNotation::FALLBACK.max(), 5);
    }

    #[test]
    fn try_parse_reports_reason() {
        assert_eq!(
            LevelNotation::try_parse("••• - •"),
            Err(NotationError::InvertedRange { min: 3, max: 1 })
        );
        assert_eq!(
            LevelNotation::try_parse("x"),
            Err(NotationError::InvalidCharacter('x'))
        );
    }

    #[test]
    fn acceptance_and_bounds() {
        let choice = LevelNotation::Choice(vec![1, 3, 5]);
        assert!(choice.accepts(3));
        assert!(!choice.accepts(2));
        assert_eq!(choice.min(), 1);
        assert_eq!(choice.max(), 5);
        assert_eq!(choice.levels(), vec![1, 3, 5]);

        let range = LevelNotation::Range { min: 1, max: 5 };
        assert!(range.accepts(5));
        assert!(!range.accepts(0));
        assert!(!range.accepts(6));
    }

    #[test]
    fn displays_as_dots() {
        assert_eq!(LevelNotation::Fixed(3).to_string(), "•••");
        assert_eq!(
            LevelNotation::Range { min: 1, max: 3 }.to_string(),
            "• - •••"
        );
        assert_eq!(LevelNotation::Choice(vec![1, 3]).to_string(), "• or •••");
        assert_eq!(
            LevelNotation::Repeatable { min: 1, max: 1 }.to_string(),
            "• +"
        );
        assert_eq!(LevelNotation::parse(&LevelNotation::Choice(vec![2, 4]).to_string()), LevelNotation::Choice(vec![2, 4]));
    }
}
