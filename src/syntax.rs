/*!
Syntax flag-sets and the named dialects built from them.

A `bitflags`-shaped immutable value, with named presets built by `const fn`
combination rather than a derive macro, since the semantics here (named
POSIX/historical dialects as specific bit combinations) are a closed set
rather than an open one a builder API would suit better.
*/

use core::ops::{BitOr, BitOrAssign};

macro_rules! syntax_flags {
    ($($(#[$meta:meta])* $name:ident = $bit:expr;)*) => {
        /// A configurable set of parser behaviors. Each
        /// dialect (`Syntax::EMACS`, `Syntax::POSIX_EXTENDED`, ...) is a
        /// fixed combination of these bits.
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
        pub struct Syntax(u32);

        impl Syntax {
            pub const NONE: Syntax = Syntax(0);
            $(
                $(#[$meta])*
                pub const $name: Syntax = Syntax(1 << $bit);
            )*

            /// Returns true if every flag in `other` is also set in `self`.
            pub fn contains(self, other: Syntax) -> bool {
                self.0 & other.0 == other.0
            }

            /// `self` with every flag in `other` cleared.
            pub fn without(self, other: Syntax) -> Syntax {
                Syntax(self.0 & !other.0)
            }
        }

        impl BitOr for Syntax {
            type Output = Syntax;
            fn bitor(self, rhs: Syntax) -> Syntax {
                Syntax(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for Syntax {
            fn bitor_assign(&mut self, rhs: Syntax) {
                self.0 |= rhs.0;
            }
        }
    };
}

syntax_flags! {
    /// `\(...\)`, `\|`, `\{m,n\}` are literal; unescaped `(`, `|`, `{` are
    /// the operators. Cleared by [`Syntax::NO_BK_PARENS`] et al, which
    /// invert the escaping convention for that operator individually.
    BACKSLASH_ESCAPE_IN_LISTS = 0;
    /// `\+` and `\?` are additional operators on top of basic-RE `*`.
    BK_PLUS_QM = 1;
    /// `[:class:]` POSIX character class names are recognized in brackets.
    CHAR_CLASSES = 2;
    /// `^`/`$` are anchors regardless of position in the pattern.
    CONTEXT_INDEP_ANCHORS = 3;
    /// `*`, `+`, `?`, `{` are always operators (never literal) regardless of
    /// what precedes them.
    CONTEXT_INDEP_OPS = 4;
    /// A repetition operator with nothing to repeat is a parse error rather
    /// than silently treated as a literal.
    CONTEXT_INVALID_OPS = 5;
    /// `.` matches newline.
    DOT_NEWLINE = 6;
    /// `.` does not match the NUL byte (irrelevant for byte-oriented
    /// matching over `&[u8]`, kept for dialect fidelity).
    DOT_NOT_NULL = 7;
    /// A negated bracket expression `[^...]` never matches newline.
    HAT_LISTS_NOT_NEWLINE = 8;
    /// `{m,n}` counted-repetition syntax is recognized at all (else `{` is
    /// always literal).
    INTERVALS = 9;
    /// Only basic operators are allowed; `|`, `+`, `?` are rejected even if
    /// otherwise enabled (used to build the "minimal" dialects).
    LIMITED_OPS = 10;
    /// A bare newline in the pattern acts like `\|` (alternation).
    NEWLINE_ALT = 11;
    /// `{m,n}` is spelled without backslashes (extended-RE convention);
    /// cleared means `\{m,n\}` (basic-RE convention).
    NO_BK_BRACES = 12;
    /// `(...)` is spelled without backslashes (extended-RE convention);
    /// cleared means `\(...\)`.
    NO_BK_PARENS = 13;
    /// `\1`..`\9` back-references are disabled (always literal digits).
    NO_BK_REFS = 14;
    /// `|` is spelled without a backslash (extended-RE convention); cleared
    /// means `\|`.
    NO_BK_VBAR = 15;
    /// `a-b` with `a > b` is a parse error rather than an empty range.
    NO_EMPTY_RANGES = 16;
    /// An unmatched `)` is ordinary (literal) rather than a parse error.
    UNMATCHED_RIGHT_PAREN_ORD = 17;
}

impl Syntax {
    /// `emacs` (approximately): backslashed groups/alternation, `CHAR_CLASSES`,
    /// context-dependent operators, backslashed intervals.
    pub const EMACS: Syntax = Syntax(
        Syntax::CHAR_CLASSES.0
            | Syntax::CONTEXT_INDEP_ANCHORS.0
            | Syntax::CONTEXT_INDEP_OPS.0,
    );

    /// `awk`: POSIX extended operators, no backreferences.
    pub const AWK: Syntax = Syntax(
        Syntax::POSIX_EXTENDED.0 & !Syntax::CHAR_CLASSES.0
            | Syntax::CHAR_CLASSES.0,
    );

    /// `grep` (historical BRE with `NEWLINE_ALT`).
    pub const GREP: Syntax = Syntax(Syntax::POSIX_BASIC.0 | Syntax::NEWLINE_ALT.0);

    /// `egrep` (historical ERE with `NEWLINE_ALT`).
    pub const EGREP: Syntax =
        Syntax(Syntax::POSIX_EXTENDED.0 | Syntax::NEWLINE_ALT.0);

    /// POSIX Basic Regular Expressions.
    pub const POSIX_BASIC: Syntax = Syntax(
        Syntax::BK_PLUS_QM.0
            | Syntax::CHAR_CLASSES.0
            | Syntax::INTERVALS.0
            | Syntax::NO_EMPTY_RANGES.0,
    );

    /// POSIX Extended Regular Expressions.
    pub const POSIX_EXTENDED: Syntax = Syntax(
        Syntax::CHAR_CLASSES.0
            | Syntax::CONTEXT_INDEP_ANCHORS.0
            | Syntax::CONTEXT_INDEP_OPS.0
            | Syntax::NO_BK_BRACES.0
            | Syntax::NO_BK_PARENS.0
            | Syntax::NO_BK_REFS.0
            | Syntax::NO_BK_VBAR.0
            | Syntax::INTERVALS.0
            | Syntax::NO_EMPTY_RANGES.0
            | Syntax::UNMATCHED_RIGHT_PAREN_ORD.0,
    );

    /// POSIX Minimal Basic Regular Expressions (no intervals).
    pub const POSIX_MINIMAL_BASIC: Syntax =
        Syntax(Syntax::CHAR_CLASSES.0 | Syntax::LIMITED_OPS.0);

    /// POSIX Minimal Extended Regular Expressions (no intervals).
    pub const POSIX_MINIMAL_EXTENDED: Syntax = Syntax(
        Syntax::CHAR_CLASSES.0
            | Syntax::CONTEXT_INDEP_ANCHORS.0
            | Syntax::CONTEXT_INDEP_OPS.0
            | Syntax::NO_BK_PARENS.0
            | Syntax::NO_BK_VBAR.0
            | Syntax::UNMATCHED_RIGHT_PAREN_ORD.0,
    );

    /// `sed`: basic RE, no context-independent ops, newline is literal.
    pub const SED: Syntax = Syntax(
        Syntax::BK_PLUS_QM.0 | Syntax::CHAR_CLASSES.0 | Syntax::INTERVALS.0,
    );

    /// `POSIX awk`: extended RE, no GNU backslash extensions.
    pub const POSIX_AWK: Syntax = Syntax::POSIX_EXTENDED;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialects_compose_from_bits() {
        assert!(Syntax::POSIX_EXTENDED.contains(Syntax::NO_BK_PARENS));
        assert!(Syntax::POSIX_EXTENDED.contains(Syntax::INTERVALS));
        assert!(!Syntax::POSIX_BASIC.contains(Syntax::NO_BK_PARENS));
        assert!(Syntax::EGREP.contains(Syntax::NEWLINE_ALT));
        assert!(!Syntax::GREP.contains(Syntax::NO_BK_PARENS));
    }

    #[test]
    fn bitor_unions_flags() {
        let custom = Syntax::INTERVALS | Syntax::NO_BK_REFS;
        assert!(custom.contains(Syntax::INTERVALS));
        assert!(custom.contains(Syntax::NO_BK_REFS));
        assert!(!custom.contains(Syntax::CHAR_CLASSES));
    }
}
