/*!
The stable error taxonomy.

Every failure that crosses the compile/match/allocation boundaries is
reported through a single [`ErrorCode`] (a stable, numeric POSIX-shaped
taxonomy) wrapped in an [`Error`] that carries a byte offset into the
pattern when one is meaningful.

A small struct with a private-ish kind and hand-written `Display`, rather
than `thiserror`.
*/

use core::fmt;

/// The stable, numeric error taxonomy.
///
/// Values are stable and part of the public contract: callers may match on
/// the numeric code (e.g. when embedding this engine behind a C-style ABI,
/// the way the original `rx_regcomp` family does), so variants must never be
/// reordered.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    NoError = 0,
    NoMatch = 1,
    BadPattern = 2,
    ECollate = 3,
    ECType = 4,
    EEscape = 5,
    ESubReg = 6,
    EBrack = 7,
    EParen = 8,
    EBrace = 9,
    BadBR = 10,
    ERange = 11,
    ESpace = 12,
    BadRpt = 13,
    EEnd = 14,
    ESize = 15,
    /// Internal only: an unmatched `)` under ordinary dialects. `regcomp`
    /// never returns this to callers; it is remapped to [`ErrorCode::EParen`]
    /// at the public boundary.
    ERParen = 16,
}

impl ErrorCode {
    /// The canonical, user-facing message for this code.
    pub fn message(self) -> &'static str {
        use ErrorCode::*;
        match self {
            NoError => "success",
            NoMatch => "no match",
            BadPattern => "invalid regular expression",
            ECollate => "invalid collating element",
            ECType => "invalid character class name",
            EEscape => "trailing backslash",
            ESubReg => "invalid back reference",
            EBrack => "unmatched [, [^, [:, [., or [=",
            EParen => "unmatched ( or \\(",
            EBrace => "unmatched \\{",
            BadBR => "invalid content of \\{\\}",
            ERange => "invalid range end",
            ESpace => "out of memory",
            BadRpt => "repetition-operator operand invalid",
            EEnd => "premature end of pattern",
            ESize => "compiled pattern bigger than 2^31 bytes",
            ERParen => "unmatched )",
        }
    }

    /// Public boundary remapping: `regcomp` never surfaces `ERParen`.
    pub fn public(self) -> ErrorCode {
        if self == ErrorCode::ERParen {
            ErrorCode::EParen
        } else {
            self
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// An error produced by [`crate::compile`], [`crate::Compiled::match_at`] or
/// [`crate::Compiled::search`].
///
/// Carries the byte offset in the pattern (for compile errors) at which the
/// parser gave up, when that is known. A `None` offset means the error arose
/// after parsing (NFA build, cache growth, or a solver `Bogus` result).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Error {
    code: ErrorCode,
    offset: Option<usize>,
}

impl Error {
    pub(crate) fn new(code: ErrorCode) -> Error {
        Error { code: code.public(), offset: None }
    }

    pub(crate) fn at(code: ErrorCode, offset: usize) -> Error {
        Error { code: code.public(), offset: Some(offset) }
    }

    /// The stable numeric code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The byte offset into the pattern string at which parsing failed, if
    /// applicable.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(off) => write!(f, "{} (at byte {})", self.code, off),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

/// A free function so callers that only have a numeric code (e.g. across an
/// FFI boundary) can still recover the canonical message without
/// reconstructing an [`Error`].
pub fn error_text(code: ErrorCode) -> &'static str {
    code.message()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erparen_remaps_at_public_boundary() {
        let e = Error::at(ErrorCode::ERParen, 3);
        assert_eq!(e.code(), ErrorCode::EParen);
    }

    #[test]
    fn message_table_is_populated() {
        for code in [
            ErrorCode::NoError,
            ErrorCode::NoMatch,
            ErrorCode::BadPattern,
            ErrorCode::ECollate,
            ErrorCode::ECType,
            ErrorCode::EEscape,
            ErrorCode::ESubReg,
            ErrorCode::EBrack,
            ErrorCode::EParen,
            ErrorCode::EBrace,
            ErrorCode::BadBR,
            ErrorCode::ERange,
            ErrorCode::ESpace,
            ErrorCode::BadRpt,
            ErrorCode::EEnd,
            ErrorCode::ESize,
        ] {
            assert!(!code.message().is_empty());
        }
    }
}
