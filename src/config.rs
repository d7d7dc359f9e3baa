//! Model configuration.
//!
//! A [`ModelConfig`] fixes everything the encoder and decoder must agree on
//! out of band: the alphabet, the context depth and the escape policy. The
//! compressed stream carries none of it.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Largest alphabet the coder can represent.
///
/// The order -1 fallback codes over `alphabet_size + 1` slots, which must stay
/// well inside the coder's frequency precision.
pub const MAX_ALPHABET_SIZE: u32 = 1 << 24;

/// Deepest supported context.
pub const MAX_ORDER: usize = 64;

/// Escape probability estimator.
///
/// | Method | Escape weight | Count increment |
/// |--------|---------------|-----------------|
/// | `A` | 1 | 1 |
/// | `B` | candidate symbols at the node | 1 |
/// | `C` | distinct symbols ever seen at the node | 1 |
/// | `D` | half the candidate symbols, rounded, at least 1 | 2 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EscapeMethod {
    A,
    B,
    C,
    #[default]
    D,
}

impl EscapeMethod {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }

    /// Amount added to a symbol's count each time it is coded.
    #[inline]
    pub fn increment(self) -> u32 {
        match self {
            Self::A | Self::B | Self::C => 1,
            Self::D => 2,
        }
    }

    /// Escape weight at a node.
    ///
    /// `candidates` is the number of symbols still offered at the node after
    /// exclusions, `distinct_seen` the node's lifetime distinct counter.
    #[inline]
    pub fn escape_weight(self, candidates: u32, distinct_seen: u32) -> u32 {
        match self {
            Self::A => 1,
            Self::B => candidates.max(1),
            Self::C => distinct_seen.max(1),
            Self::D => candidates.div_ceil(2).max(1),
        }
    }
}

impl fmt::Display for EscapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for EscapeMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::from_char(c).ok_or_else(|| ConfigError::UnknownEscapeMethod(s.to_string()))
            }
            _ => Err(ConfigError::UnknownEscapeMethod(s.to_string())),
        }
    }
}

/// Validated model parameters.
///
/// Built with [`ModelConfig::try_new`] (or [`Default`]), so an instance is
/// always usable; the exclusion switches can be changed afterwards since
/// every combination is valid.
///
/// ```rust
/// use ppm_stream::{EscapeMethod, ModelConfig};
///
/// let config = ModelConfig::try_new(256, 3, "C")?
///     .with_full_exclusions(false);
/// assert_eq!(config.escape_method(), EscapeMethod::C);
/// # Ok::<(), ppm_stream::PpmError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelConfig {
    alphabet_size: u32,
    max_order: usize,
    escape_method: EscapeMethod,
    full_exclusions: bool,
    update_exclusions: bool,
}

impl ModelConfig {
    /// Validate raw parameters.
    ///
    /// Signed inputs are accepted so that negative values coming from user
    /// input are reported as configuration errors instead of wrapping.
    pub fn try_new(alphabet_size: i64, max_order: i64, escape_method: &str) -> Result<Self> {
        let escape_method = escape_method.parse::<EscapeMethod>()?;
        let alphabet_size = Self::check_alphabet(alphabet_size)?;
        let max_order = Self::check_order(max_order)?;
        Ok(Self {
            alphabet_size,
            max_order,
            escape_method,
            full_exclusions: true,
            update_exclusions: true,
        })
    }

    pub(crate) fn from_parts(
        alphabet_size: i64,
        max_order: i64,
        escape_method: EscapeMethod,
        full_exclusions: bool,
        update_exclusions: bool,
    ) -> Result<Self> {
        Ok(Self {
            alphabet_size: Self::check_alphabet(alphabet_size)?,
            max_order: Self::check_order(max_order)?,
            escape_method,
            full_exclusions,
            update_exclusions,
        })
    }

    fn check_alphabet(size: i64) -> std::result::Result<u32, ConfigError> {
        if size <= 0 {
            return Err(ConfigError::NonPositiveAlphabet(size));
        }
        if size > i64::from(MAX_ALPHABET_SIZE) {
            return Err(ConfigError::AlphabetTooLarge {
                size,
                max: MAX_ALPHABET_SIZE,
            });
        }
        Ok(size as u32)
    }

    fn check_order(order: i64) -> std::result::Result<usize, ConfigError> {
        if order < 0 {
            return Err(ConfigError::NegativeOrder(order));
        }
        if order > MAX_ORDER as i64 {
            return Err(ConfigError::OrderTooLarge {
                order,
                max: MAX_ORDER,
            });
        }
        Ok(order as usize)
    }

    pub fn with_escape_method(mut self, method: EscapeMethod) -> Self {
        self.escape_method = method;
        self
    }

    pub fn with_full_exclusions(mut self, enabled: bool) -> Self {
        self.full_exclusions = enabled;
        self
    }

    pub fn with_update_exclusions(mut self, enabled: bool) -> Self {
        self.update_exclusions = enabled;
        self
    }

    #[inline]
    pub fn alphabet_size(&self) -> u32 {
        self.alphabet_size
    }

    #[inline]
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    #[inline]
    pub fn escape_method(&self) -> EscapeMethod {
        self.escape_method
    }

    #[inline]
    pub fn full_exclusions(&self) -> bool {
        self.full_exclusions
    }

    #[inline]
    pub fn update_exclusions(&self) -> bool {
        self.update_exclusions
    }
}

impl Default for ModelConfig {
    /// Byte alphabet, order 5, method D, both exclusion modes on.
    fn default() -> Self {
        Self {
            alphabet_size: 256,
            max_order: 5,
            escape_method: EscapeMethod::D,
            full_exclusions: true,
            update_exclusions: true,
        }
    }
}
