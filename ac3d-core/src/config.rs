/// Parser configuration

/// Crease angle, in degrees, given to objects that do not set one.
pub const DEFAULT_CREASE: f32 = 61.0;

/// Deepest object nesting accepted by default
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// How malformed numeric tokens are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericMode {
    /// Malformed numbers abort the parse with `FormatError::NumericParse`
    #[default]
    Strict,
    /// Malformed floats read as NaN and malformed integers as 0, matching
    /// older loaders that never rejected a file on a bad number
    Lenient,
}

/// Options controlling how a scene file is parsed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    pub default_crease: f32,
    pub numeric_mode: NumericMode,
    /// Reject files whose first token does not start with `AC3D`
    pub require_magic: bool,
    /// Objects nested deeper than this fail with `FormatError::NestingTooDeep`.
    /// Top-level objects are at depth 1.
    pub max_depth: usize,
}

impl ParseOptions {
    pub fn lenient() -> Self {
        Self {
            numeric_mode: NumericMode::Lenient,
            ..Self::default()
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_crease: DEFAULT_CREASE,
            numeric_mode: NumericMode::Strict,
            require_magic: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
