/*!
The public surface: `compile`, `match_at`, `search`, and the compile/exec
flag bitmasks a caller assembles a pattern and a match request from.

A [`Compiled`] pattern owns its parsed/simplified [`Tree`]; `match_at`/
`search` hand that tree to the solver fresh on every call rather than
keeping a warm cache across calls, since nothing here outlives a single
match request (see DESIGN.md for the tradeoff against a longer-lived
NFA/cache pairing).
*/

use core::ops::{BitOr, BitOrAssign};

use log::debug;

use crate::error::Error;
use crate::nfa::Nfa;
use crate::parser::Parser;
use crate::solver::{self, MatchFlags};
use crate::syntax::Syntax;
use crate::tables::{SyntaxTable, Translate};
use crate::tree::{analyze, collect_subexps, Tree};

macro_rules! flag_set {
    ($name:ident, $($flag:ident = $bit:expr;)*) => {
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const NONE: $name = $name(0);
            $(pub const $flag: $name = $name(1 << $bit);)*

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    };
}

flag_set! { CompileFlags,
    /// Use the extended (ERE-like) dialect rather than basic.
    EXTENDED = 0;
    /// Case-insensitive: both the pattern and the subject are matched
    /// through an ASCII case-fold table.
    IGNORE_CASE = 1;
    /// `^`/`$` also match after/before embedded newlines, and `.`/negated
    /// bracket expressions never match `\n`.
    NEWLINE = 2;
    /// Capturing parens are parsed (for dialect purposes) but no capture
    /// slots are populated; `match_at`/`search` return only the overall span.
    NO_SUB = 3;
}

flag_set! { ExecFlags,
    /// `^`/`\`` must not match at `start` (the subject continues a larger
    /// buffer to the left).
    NOT_BOL = 0;
    /// `$`/`\'` must not match at `end`.
    NOT_EOL = 1;
    /// Reserved for parity with the `regmatch` convention that capture
    /// storage is caller-allocated; this engine always returns capture data,
    /// so the flag only documents intent.
    ALLOC_REGS = 2;
}

/// `{ start_offset, end_offset, final_tag }`, `-1`/`-1` when unset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CaptureSlot {
    pub start_offset: i64,
    pub end_offset: i64,
}

impl CaptureSlot {
    const UNSET: CaptureSlot = CaptureSlot { start_offset: -1, end_offset: -1 };
}

/// The capture table returned by a successful `match_at`/`search`: index `0`
/// is the whole match, indices `1..` are capturing groups in open-paren
/// order.
#[derive(Clone, Debug)]
pub struct Captures {
    slots: Vec<CaptureSlot>,
    pub final_tag: i32,
}

impl Captures {
    pub fn get(&self, group: usize) -> CaptureSlot {
        self.slots.get(group).copied().unwrap_or(CaptureSlot::UNSET)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A pattern parsed, simplified, and ready to be matched against input.
/// `match_at`/`search` build a fresh NFA-backed cache per call from the
/// stored tree rather than keeping one cache warm across calls.
///
/// Doesn't carry a `fastmap` or `is_anchored`/`is_nullable` precomputed
/// flag: `search` always scans every position rather than skipping ones a
/// leading-byte or anchor analysis could rule out. See DESIGN.md.
pub struct Compiled {
    tree: Tree,
    group_count: u32,
    translate: Option<Translate>,
    syntax_table: SyntaxTable,
    newline_anchor: bool,
    no_sub: bool,
    alphabet_size: usize,
    byte_budget: usize,
}

const DEFAULT_BYTE_BUDGET: usize = 1 << 20;
const ALPHABET_SIZE: usize = 256;

/// Parses `pattern`, builds its expression tree, and prepares the NFA used
/// by every subsequent `match_at`/`search` call.
pub fn compile(pattern: &[u8], compile_flags: CompileFlags) -> Result<Compiled, Error> {
    let syntax = if compile_flags.contains(CompileFlags::EXTENDED) {
        // Strict POSIX EREs have no back-references at all, but this
        // engine's public `EXTENDED` dialect keeps `\1`..`\9` available the
        // way basic REs do, rather than dropping to literal digits.
        Syntax::POSIX_EXTENDED.without(Syntax::NO_BK_REFS)
    } else {
        Syntax::POSIX_BASIC
    };
    let translate = if compile_flags.contains(CompileFlags::IGNORE_CASE) {
        Some(Translate::ascii_case_fold())
    } else {
        None
    };
    let parser = Parser::new(pattern, syntax, ALPHABET_SIZE, translate.as_ref());
    let parsed = parser.parse()?;
    let tree = parsed.tree;

    let mut table = Vec::new();
    collect_subexps(&tree, &mut table);
    let simplified = tree.simplify(&table);
    let mut next_id = 0;
    analyze(&simplified, &mut next_id);

    debug!(
        "rx: compiled pattern into {} NFA states, {} capture groups",
        Nfa::build(&simplified).states.len(),
        parsed.group_count
    );

    Ok(Compiled {
        tree: simplified,
        group_count: parsed.group_count,
        translate,
        syntax_table: SyntaxTable::default_ascii(),
        newline_anchor: compile_flags.contains(CompileFlags::NEWLINE),
        no_sub: compile_flags.contains(CompileFlags::NO_SUB),
        alphabet_size: ALPHABET_SIZE,
        byte_budget: DEFAULT_BYTE_BUDGET,
    })
}

impl Compiled {
    fn match_flags(&self, exec_flags: ExecFlags) -> MatchFlags {
        MatchFlags {
            not_bol: exec_flags.contains(ExecFlags::NOT_BOL),
            not_eol: exec_flags.contains(ExecFlags::NOT_EOL),
            newline_anchor: self.newline_anchor,
        }
    }

    /// Tests the pattern anchored at `start`: succeeds only if some prefix
    /// of `input[start..end)` is accepted, trying the longest prefix first
    /// per the solver's split-enumeration order (leftmost-longest).
    pub fn match_at(
        &self,
        input: &[u8],
        start: usize,
        end: usize,
        exec_flags: ExecFlags,
    ) -> Result<Option<Captures>, Error> {
        let flags = self.match_flags(exec_flags);
        let group_count = if self.no_sub { 0 } else { self.group_count };
        let mut k = end;
        loop {
            let result = solver::solve(
                &self.tree,
                input,
                start,
                k,
                group_count,
                self.translate.as_ref(),
                &self.syntax_table,
                flags,
                self.alphabet_size,
                self.byte_budget,
            )?;
            if let Some((regs, final_tag)) = result {
                return Ok(Some(self.finish(regs, group_count, final_tag)));
            }
            if k == start {
                return Ok(None);
            }
            k -= 1;
        }
    }

    /// Scans start positions left to right looking for the first one
    /// `match_at` succeeds at.
    pub fn search(
        &self,
        input: &[u8],
        start: usize,
        end: usize,
        exec_flags: ExecFlags,
    ) -> Result<Option<Captures>, Error> {
        let mut pos = start;
        loop {
            if let Some(caps) = self.match_at(input, pos, end, exec_flags)? {
                return Ok(Some(caps));
            }
            if pos >= end {
                return Ok(None);
            }
            pos += 1;
        }
    }

    fn finish(&self, regs: solver::Captures, group_count: u32, final_tag: i32) -> Captures {
        let mut slots = vec![CaptureSlot::UNSET; group_count as usize + 1];
        for (i, r) in regs.iter().enumerate().take(slots.len()) {
            if let Some((s, e)) = r {
                slots[i] = CaptureSlot { start_offset: *s as i64, end_offset: *e as i64 };
            }
        }
        Captures { slots, final_tag }
    }
}
