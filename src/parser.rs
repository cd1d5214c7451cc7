/*!
The pattern parser.

A single-pass parser with an explicit stack of paren frames (`Frame`, pushed
on `(`/`\(`, popped on `)`/`\)`) rather than recursive descent, so arbitrarily
deep nesting doesn't consume Rust stack frames. Three pieces of state are
threaded through one pass over the pattern bytes, one level per paren
nesting:

- `pending`: the atom currently being accumulated (a literal run, or a
  completed sub-tree) — not yet folded into anything.
- `concat`: the fully-folded concatenation of complete atoms in the current
  alternation branch, excluding `pending`.
- `alt`: the fully-folded alternation of complete branches at this nesting
  level, excluding the branch still being built in `concat`.

A repetition operator asks [`Parser::take_repeatable_atom`] for the
rightmost atom (factoring the trailing byte out of a literal run so the
operator binds to just that byte) and wraps it; adjacent operators fold
into the same wrapped node by tracking `(base, zero_ok, many_ok)` in
`last_repeat` rather than allocating a new `Opt`/`Star`/`Plus` shell each
time, so that a run like `*+?` collapses to one node.
*/

use crate::bitset::Bitset;
use crate::error::{Error, ErrorCode};
use crate::syntax::Syntax;
use crate::tables::Translate;
use crate::tree::{ContextKind, Tree, DUP_MAX};

/// A single paren-stack frame: the state saved when `(`/`\(` is opened, to
/// be restored when the matching `)`/`\)` is found.
struct Frame {
    saved_alt: Option<Tree>,
    saved_concat: Option<Tree>,
    saved_pending: PendingAtom,
    saved_last_repeat: Option<(Tree, bool, bool)>,
    /// Cursor position of the opening token, used only for error reporting
    /// (an unmatched `(` is reported as `EParen` at end-of-pattern).
    start_cursor: usize,
    /// `0` for the syntactic-only `[:(:]`/`[:):]` grouping form; otherwise
    /// the 1-based capture slot assigned when the paren opened.
    group_index: u32,
}

#[derive(Clone)]
enum PendingAtom {
    None,
    /// A run of literal bytes not yet folded into `concat`. Non-empty.
    Literal(Vec<u8>),
    /// A completed sub-tree and whether it is a valid target for a
    /// repetition operator (anchors and other zero-width predicates are
    /// not, since repeating a zero-width match is pointless).
    Node(Tree, bool),
}

/// What a bracket expression parses to. Ordinarily a character set, but the
/// two engine-specific forms (`[:cut N:]`, `[:(:]`/`[:):]`) let a whole
/// `[...]` stand in for a `Cut` node or for syntactic-only grouping.
enum BracketResult {
    Set(Bitset),
    Cut(i32),
    GroupOpen,
    GroupClose,
}

pub struct Parser<'a> {
    pat: &'a [u8],
    pos: usize,
    syntax: Syntax,
    alphabet_size: usize,
    translate: Option<&'a Translate>,
    next_group: u32,
    stack: Vec<Frame>,
    pending: PendingAtom,
    concat: Option<Tree>,
    alt: Option<Tree>,
    last_repeat: Option<(Tree, bool, bool)>,
}

/// The result of a successful parse: the tree and the number of capturing
/// groups assigned.
pub struct Parsed {
    pub tree: Tree,
    pub group_count: u32,
}

impl<'a> Parser<'a> {
    pub fn new(
        pattern: &'a [u8],
        syntax: Syntax,
        alphabet_size: usize,
        translate: Option<&'a Translate>,
    ) -> Parser<'a> {
        Parser {
            pat: pattern,
            pos: 0,
            syntax,
            alphabet_size,
            translate,
            next_group: 0,
            stack: Vec::new(),
            pending: PendingAtom::None,
            concat: None,
            alt: None,
            last_repeat: None,
        }
    }

    /// True for the "extended" family of dialects (POSIX ERE and its
    /// relatives): `(`, `)`, `|`, `+`, `?`, `{` are bare operators rather
    /// than requiring a backslash.
    fn extended(&self) -> bool {
        self.syntax.contains(Syntax::NO_BK_PARENS)
    }

    fn err(&self, code: ErrorCode) -> Error {
        Error::at(code, self.pos)
    }

    fn fold_byte(&self, b: u8) -> u8 {
        match self.translate {
            Some(t) => t.apply(b),
            None => b,
        }
    }

    /// Expands `b` through the inverse of the case-fold table so that, e.g.,
    /// a case-insensitive compile of `a` also accepts `A`.
    fn fold_class(&self, set: &mut Bitset, b: u8) {
        match self.translate {
            Some(t) => {
                for eq in t.inverse_class(b) {
                    set.insert(eq as usize);
                }
            }
            None => set.insert(b as usize),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.pat.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.pat.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn starts_with(&self, s: &[u8]) -> bool {
        self.pat[self.pos..].starts_with(s)
    }

    // ----- atom-accumulation state machine -----

    fn is_repeatable(&self) -> bool {
        match &self.pending {
            PendingAtom::None => false,
            PendingAtom::Literal(buf) => !buf.is_empty(),
            PendingAtom::Node(_, r) => *r,
        }
    }

    fn fold_concat(&mut self, node: Tree) {
        self.concat = Some(match self.concat.take() {
            Some(c) => Tree::concat(c, node),
            None => node,
        });
    }

    fn commit_pending(&mut self) {
        self.last_repeat = None;
        match core::mem::replace(&mut self.pending, PendingAtom::None) {
            PendingAtom::None => {}
            PendingAtom::Literal(buf) => {
                if !buf.is_empty() {
                    self.fold_concat(Tree::literal_run(buf));
                }
            }
            PendingAtom::Node(n, _) => self.fold_concat(n),
        }
    }

    fn push_literal_byte(&mut self, b: u8) {
        match &mut self.pending {
            PendingAtom::Literal(buf) => buf.push(b),
            _ => {
                self.commit_pending();
                self.pending = PendingAtom::Literal(vec![b]);
            }
        }
    }

    fn push_literal_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_literal_byte(b);
        }
    }

    fn push_node_atom(&mut self, node: Tree, repeatable: bool) {
        self.commit_pending();
        self.pending = PendingAtom::Node(node, repeatable);
    }

    /// Extracts the rightmost atom for a repetition operator to wrap,
    /// factoring the trailing byte out of a pending literal run so the
    /// repeat binds to just that byte. Clears `last_repeat`:
    /// callers that want adjacency-collapsing must check it first.
    fn take_repeatable_atom(&mut self) -> Tree {
        self.last_repeat = None;
        match core::mem::replace(&mut self.pending, PendingAtom::None) {
            PendingAtom::Literal(mut buf) => {
                let last = buf.pop().expect("is_repeatable ensures non-empty");
                if !buf.is_empty() {
                    let run = if buf.len() == 1 {
                        Tree::char_set(singleton(self.alphabet_size, buf[0]))
                    } else {
                        Tree::literal_run(buf)
                    };
                    self.fold_concat(run);
                }
                Tree::char_set(singleton(self.alphabet_size, last))
            }
            PendingAtom::Node(n, _) => n,
            PendingAtom::None => unreachable!("checked by is_repeatable"),
        }
    }

    fn build_repeat(base: Tree, zero_ok: bool, many_ok: bool) -> Tree {
        match (zero_ok, many_ok) {
            (true, true) => Tree::star(base),
            (false, true) => Tree::plus(base),
            (true, false) => Tree::opt(base),
            (false, false) => base,
        }
    }

    /// Applies `*`/`+`/`?`, collapsing a run of adjacent operators onto one node.
    /// `raw` is the original source bytes of the operator token, used only
    /// to fall back to a literal re-emission when the dialect says an
    /// operator in an invalid position is just an ordinary character.
    fn apply_repeat(
        &mut self,
        zero_ok: bool,
        many_ok: bool,
        raw: &[u8],
    ) -> Result<(), Error> {
        if let Some((base, z, m)) = self.last_repeat.take() {
            let (nz, nm) = (z || zero_ok, m || many_ok);
            self.last_repeat = Some((base.clone(), nz, nm));
            self.pending =
                PendingAtom::Node(Self::build_repeat(base, nz, nm), true);
            return Ok(());
        }
        if !self.is_repeatable() {
            if self.syntax.contains(Syntax::CONTEXT_INVALID_OPS) {
                return Err(self.err(ErrorCode::BadRpt));
            } else if !self.syntax.contains(Syntax::CONTEXT_INDEP_OPS) {
                self.push_literal_bytes(raw);
                return Ok(());
            }
            let base = Tree::literal_run(Vec::new());
            self.last_repeat = Some((base.clone(), zero_ok, many_ok));
            self.pending = PendingAtom::Node(
                Self::build_repeat(base, zero_ok, many_ok),
                true,
            );
            return Ok(());
        }
        let base = self.take_repeatable_atom();
        self.last_repeat = Some((base.clone(), zero_ok, many_ok));
        self.pending = PendingAtom::Node(
            Self::build_repeat(base, zero_ok, many_ok),
            true,
        );
        Ok(())
    }

    fn apply_interval(
        &mut self,
        min: u32,
        max: u32,
        raw: &[u8],
    ) -> Result<(), Error> {
        if !self.is_repeatable() && self.last_repeat.is_none() {
            if self.syntax.contains(Syntax::CONTEXT_INVALID_OPS) {
                return Err(self.err(ErrorCode::BadRpt));
            } else if !self.syntax.contains(Syntax::CONTEXT_INDEP_OPS) {
                self.push_literal_bytes(raw);
                return Ok(());
            }
            let base = Tree::literal_run(Vec::new());
            self.pending =
                PendingAtom::Node(Tree::interval(base, min, max), true);
            self.last_repeat = None;
            return Ok(());
        }
        let base = self.take_repeatable_atom();
        self.pending =
            PendingAtom::Node(Tree::interval(base, min, max), true);
        Ok(())
    }

    fn finish_alt_branch(&mut self) {
        self.commit_pending();
        let branch =
            self.concat.take().unwrap_or_else(|| Tree::literal_run(Vec::new()));
        self.alt = Some(match self.alt.take() {
            Some(a) => Tree::alt(a, branch),
            None => branch,
        });
    }

    // ----- paren handling -----

    fn open_group(&mut self, capturing: bool) {
        let group_index = if capturing {
            self.next_group += 1;
            self.next_group
        } else {
            0
        };
        self.stack.push(Frame {
            saved_alt: self.alt.take(),
            saved_concat: self.concat.take(),
            saved_pending: core::mem::replace(
                &mut self.pending,
                PendingAtom::None,
            ),
            saved_last_repeat: self.last_repeat.take(),
            start_cursor: self.pos,
            group_index,
        });
    }

    fn close_group(&mut self) -> Result<(), Error> {
        if self.stack.is_empty() {
            return if self.syntax.contains(Syntax::UNMATCHED_RIGHT_PAREN_ORD)
            {
                self.push_literal_byte(b')');
                Ok(())
            } else {
                Err(self.err(ErrorCode::ERParen))
            };
        }
        self.finish_alt_branch();
        let inner =
            self.alt.take().unwrap_or_else(|| Tree::literal_run(Vec::new()));
        let frame = self.stack.pop().unwrap();
        let node = Tree::parens(inner, frame.group_index);
        self.alt = frame.saved_alt;
        self.concat = frame.saved_concat;
        self.pending = frame.saved_pending;
        self.last_repeat = frame.saved_last_repeat;
        self.push_node_atom(node, true);
        Ok(())
    }

    fn group_is_open(&self, n: u32) -> bool {
        self.stack.iter().any(|f| f.group_index == n)
    }

    // ----- main loop -----

    pub fn parse(mut self) -> Result<Parsed, Error> {
        while let Some(b) = self.peek() {
            if self.starts_with(b"[:(:]") {
                self.pos += 5;
                self.open_group(false);
                continue;
            }
            if self.starts_with(b"[:):]") {
                self.pos += 5;
                self.close_group()?;
                continue;
            }
            match b {
                b'\\' => self.parse_escape()?,
                b'[' => self.parse_bracket_atom()?,
                b'.' => {
                    self.pos += 1;
                    let mut set = Bitset::universe(self.alphabet_size);
                    if !self.syntax.contains(Syntax::DOT_NEWLINE) {
                        set.remove(b'\n' as usize);
                    }
                    if self.syntax.contains(Syntax::DOT_NOT_NULL) {
                        set.remove(0);
                    }
                    self.push_node_atom(Tree::char_set(set), true);
                }
                b'*' => {
                    self.pos += 1;
                    self.apply_repeat(true, true, b"*")?;
                }
                b'+' if self.plus_qm_enabled() => {
                    self.pos += 1;
                    self.apply_repeat(false, true, b"+")?;
                }
                b'?' if self.plus_qm_enabled() => {
                    self.pos += 1;
                    self.apply_repeat(true, false, b"?")?;
                }
                b'(' if self.extended() => {
                    self.pos += 1;
                    self.open_group(true);
                }
                b')' if self.extended() => {
                    self.pos += 1;
                    self.close_group()?;
                }
                b'|' if self.syntax.contains(Syntax::NO_BK_VBAR) => {
                    self.pos += 1;
                    self.finish_alt_branch();
                }
                b'{' if self.extended()
                    && self.syntax.contains(Syntax::INTERVALS) =>
                {
                    self.parse_interval(false)?;
                }
                b'\n' if self.syntax.contains(Syntax::NEWLINE_ALT) => {
                    self.pos += 1;
                    self.finish_alt_branch();
                }
                b'^' => {
                    self.pos += 1;
                    if self.anchor_allowed_here(true) {
                        self.push_node_atom(
                            Tree::context(ContextKind::BeginLine),
                            false,
                        );
                    } else {
                        self.push_literal_byte(self.fold_byte(b'^'));
                    }
                }
                b'$' => {
                    self.pos += 1;
                    if self.anchor_allowed_here(false) {
                        self.push_node_atom(
                            Tree::context(ContextKind::EndLine),
                            false,
                        );
                    } else {
                        self.push_literal_byte(self.fold_byte(b'$'));
                    }
                }
                _ => {
                    self.pos += 1;
                    self.push_literal_byte(self.fold_byte(b));
                }
            }
        }
        if !self.stack.is_empty() {
            return Err(self.err(ErrorCode::EParen));
        }
        self.finish_alt_branch();
        let tree =
            self.alt.take().unwrap_or_else(|| Tree::literal_run(Vec::new()));
        Ok(Parsed { tree, group_count: self.next_group })
    }

    /// Bare `+`/`?` are operators only in the extended (ERE-like) dialects;
    /// basic dialects use `\+`/`\?` instead, gated by `BK_PLUS_QM` in
    /// `parse_escape`.
    fn plus_qm_enabled(&self) -> bool {
        self.extended()
    }

    /// `^` is an anchor unconditionally under `CONTEXT_INDEP_ANCHORS`, else
    /// only at the start of the pattern or immediately after `(`/`\(`/`|`.
    /// `$` mirrors this for end-of-pattern/`)`/`\)`/`|`.
    fn anchor_allowed_here(&self, is_caret: bool) -> bool {
        if self.syntax.contains(Syntax::CONTEXT_INDEP_ANCHORS) {
            return true;
        }
        if is_caret {
            self.at_branch_start()
        } else {
            self.at_branch_end()
        }
    }

    fn at_branch_start(&self) -> bool {
        // True if nothing has been accumulated yet in the current branch:
        // `^` just opened a group, or follows `|`, or starts the pattern.
        matches!(self.pending, PendingAtom::None)
            && self.concat.is_none()
    }

    fn at_branch_end(&self) -> bool {
        // `$` is only a canonical end-anchor if nothing follows except a
        // closing delimiter or another alternation branch.
        let rest = &self.pat[self.pos..];
        rest.is_empty()
            || rest.starts_with(b")")
            || rest.starts_with(b"\\)")
            || rest.starts_with(b"|")
            || rest.starts_with(b"\\|")
            || rest.starts_with(b"[:):]")
    }

    fn parse_escape(&mut self) -> Result<(), Error> {
        self.pos += 1; // consume backslash
        let b = match self.bump() {
            Some(b) => b,
            None => return Err(self.err(ErrorCode::EEscape)),
        };
        match b {
            b'(' if !self.extended() => {
                self.open_group(true);
            }
            b')' if !self.extended() => {
                self.close_group()?;
            }
            b'|' if !self.syntax.contains(Syntax::NO_BK_VBAR) => {
                self.finish_alt_branch();
            }
            b'+' if !self.plus_qm_enabled()
                && self.syntax.contains(Syntax::BK_PLUS_QM) =>
            {
                self.apply_repeat(false, true, b"\\+")?;
            }
            b'?' if !self.plus_qm_enabled()
                && self.syntax.contains(Syntax::BK_PLUS_QM) =>
            {
                self.apply_repeat(true, false, b"\\?")?;
            }
            b'{' if !self.extended() && self.syntax.contains(Syntax::INTERVALS) => {
                self.parse_interval(true)?;
            }
            b'1'..=b'9' => {
                let n = (b - b'0') as u32;
                if self.syntax.contains(Syntax::NO_BK_REFS) {
                    self.push_literal_byte(b);
                } else if self.group_is_open(n) {
                    self.push_literal_byte(b);
                } else if n > self.next_group {
                    return Err(self.err(ErrorCode::ESubReg));
                } else {
                    self.push_node_atom(
                        Tree::context(ContextKind::BackRef(n)),
                        false,
                    );
                }
            }
            b'<' => self.push_node_atom(
                Tree::context(ContextKind::WordStart),
                false,
            ),
            b'>' => {
                self.push_node_atom(Tree::context(ContextKind::WordEnd), false)
            }
            b'b' => self.push_node_atom(
                Tree::context(ContextKind::WordBoundary),
                false,
            ),
            b'B' => self.push_node_atom(
                Tree::context(ContextKind::NotWordBoundary),
                false,
            ),
            b'`' => self.push_node_atom(
                Tree::context(ContextKind::BufferStart),
                false,
            ),
            b'\'' => self.push_node_atom(
                Tree::context(ContextKind::BufferEnd),
                false,
            ),
            b'=' => self.push_node_atom(
                Tree::context(ContextKind::EqualPoint),
                false,
            ),
            b'w' => {
                self.push_node_atom(
                    Tree::char_set(word_bitset(self.alphabet_size)),
                    true,
                );
            }
            b'W' => {
                let mut set = word_bitset(self.alphabet_size);
                set.complement();
                self.push_node_atom(Tree::char_set(set), true);
            }
            b's' => {
                self.push_node_atom(
                    Tree::char_set(space_bitset(self.alphabet_size)),
                    true,
                );
            }
            b'S' => {
                let mut set = space_bitset(self.alphabet_size);
                set.complement();
                self.push_node_atom(Tree::char_set(set), true);
            }
            other => self.push_literal_byte(self.fold_byte(other)),
        }
        Ok(())
    }

    /// Parses `{m,n}` (bare, extended dialects) or `\{m,n\}` (basic
    /// dialects, `escaped == true`). Leaves `self.pos` just past the
    /// closing delimiter on success.
    fn parse_interval(&mut self, escaped: bool) -> Result<(), Error> {
        let token_start = self.pos;
        self.pos += if escaped { 2 } else { 1 }; // consume '\{' or '{'
        let digits_start = self.pos;
        let min = self.parse_digits();
        let (min, max) = if self.peek() == Some(b',') {
            self.pos += 1;
            if self.digit_follows() {
                let max = self.parse_digits();
                (min, max)
            } else {
                (min, None)
            }
        } else {
            (min, min)
        };
        let closer: &[u8] = if escaped { b"\\}" } else { b"}" };
        if !self.starts_with(closer) {
            return Err(self.err(ErrorCode::EBrace));
        }
        self.pos += closer.len();
        let min = match min {
            Some(m) => m,
            None if self.pos > digits_start => {
                return Err(self.err(ErrorCode::BadBR))
            }
            None => return Err(self.err(ErrorCode::BadBR)),
        };
        let max = max.unwrap_or(DUP_MAX);
        if min > max || max > DUP_MAX {
            return Err(self.err(ErrorCode::BadBR));
        }
        let raw = &self.pat[token_start..self.pos];
        let raw = raw.to_vec();
        self.apply_interval(min, max, &raw)
    }

    fn digit_follows(&self) -> bool {
        matches!(self.peek(), Some(b'0'..=b'9'))
    }

    fn parse_digits(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut v: u32 = 0;
        while let Some(d @ b'0'..=b'9') = self.peek() {
            v = v.saturating_mul(10).saturating_add((d - b'0') as u32);
            self.pos += 1;
        }
        if self.pos == start {
            None
        } else {
            Some(v)
        }
    }

    fn parse_bracket_atom(&mut self) -> Result<(), Error> {
        match self.parse_bracket()? {
            BracketResult::Set(set) => {
                self.push_node_atom(Tree::char_set(set), true);
            }
            BracketResult::Cut(n) => {
                self.push_node_atom(Tree::cut(n), false);
            }
            BracketResult::GroupOpen => self.open_group(false),
            BracketResult::GroupClose => self.close_group()?,
        }
        Ok(())
    }

    fn parse_bracket(&mut self) -> Result<BracketResult, Error> {
        debug_assert_eq!(self.peek(), Some(b'['));
        self.pos += 1;
        let negate = if self.peek() == Some(b'^') {
            self.pos += 1;
            true
        } else {
            false
        };
        let mut set = Bitset::new(self.alphabet_size);
        let mut first = true;
        let mut sole_special: Option<BracketResult> = None;
        let mut member_count = 0usize;
        loop {
            let b = match self.peek() {
                Some(b) => b,
                None => return Err(self.err(ErrorCode::EBrack)),
            };
            if b == b']' && !first {
                self.pos += 1;
                break;
            }
            first = false;
            if b == b'[' && self.syntax.contains(Syntax::CHAR_CLASSES) {
                if let Some(special) = self.try_parse_class(&mut set)? {
                    sole_special = Some(special);
                    member_count += 1;
                    continue;
                }
            }
            if self.starts_with(b"[.") || self.starts_with(b"[=") {
                return Err(self.err(ErrorCode::ECollate));
            }
            if b == b'\\'
                && self.syntax.contains(Syntax::BACKSLASH_ESCAPE_IN_LISTS)
            {
                self.pos += 1;
                let esc = match self.bump() {
                    Some(b) => b,
                    None => return Err(self.err(ErrorCode::EEscape)),
                };
                self.fold_class(&mut set, esc);
                member_count += 1;
                continue;
            }
            self.pos += 1;
            // a-b range
            if self.peek() == Some(b'-') && self.peek_at(1).is_some()
                && self.peek_at(1) != Some(b']')
            {
                self.pos += 1;
                let hi = self.bump().unwrap();
                if b > hi {
                    if self.syntax.contains(Syntax::NO_EMPTY_RANGES) {
                        return Err(self.err(ErrorCode::ERange));
                    }
                } else {
                    let mut c = b;
                    loop {
                        self.fold_class(&mut set, c);
                        if c == hi {
                            break;
                        }
                        c += 1;
                    }
                }
            } else {
                self.fold_class(&mut set, b);
            }
            member_count += 1;
        }
        if member_count == 1 {
            if let Some(special) = sole_special {
                return Ok(special);
            }
        }
        if negate {
            set.complement();
            if self.syntax.contains(Syntax::HAT_LISTS_NOT_NEWLINE) {
                set.remove(b'\n' as usize);
            }
        }
        Ok(BracketResult::Set(set))
    }

    /// Tries to parse a `[:name:]` token at the current position. Returns
    /// `Ok(None)` if the current position isn't actually such a token (so
    /// the caller falls back to treating `[` as an ordinary bracket
    /// member), `Ok(Some(..))` for the engine-specific sole-content forms
    /// (`cut N`, `(`, `)`), or mutates `set` in place and returns
    /// `Ok(Some)` with a dummy placeholder... rather: returns `Ok(Some)`
    /// only for the two sole-content special forms; ordinary class names
    /// mutate `set` and return `Ok(None)` so the caller's member bookkeeping
    /// still applies.
    fn try_parse_class(
        &mut self,
        set: &mut Bitset,
    ) -> Result<Option<BracketResult>, Error> {
        if !self.starts_with(b"[:") {
            return Ok(None);
        }
        let rest = &self.pat[self.pos + 2..];
        let end = match rest.windows(2).position(|w| w == b":]") {
            Some(i) => i,
            None => return Err(self.err(ErrorCode::EBrack)),
        };
        let name = &rest[..end];
        self.pos += 2 + end + 2;
        if let Some(n) = name.strip_prefix(b"cut ") {
            let n: i32 = std::str::from_utf8(n)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| self.err(ErrorCode::ECType))?;
            return Ok(Some(BracketResult::Cut(n)));
        }
        if name == b"(" {
            return Ok(Some(BracketResult::GroupOpen));
        }
        if name == b")" {
            return Ok(Some(BracketResult::GroupClose));
        }
        add_posix_class(set, name).map_err(|_| self.err(ErrorCode::ECType))?;
        Ok(None)
    }
}

fn singleton(alphabet_size: usize, b: u8) -> Bitset {
    let mut s = Bitset::new(alphabet_size);
    s.insert(b as usize);
    s
}

fn word_bitset(alphabet_size: usize) -> Bitset {
    let mut s = Bitset::new(alphabet_size);
    for b in b'0'..=b'9' {
        s.insert(b as usize);
    }
    for b in b'a'..=b'z' {
        s.insert(b as usize);
    }
    for b in b'A'..=b'Z' {
        s.insert(b as usize);
    }
    s.insert(b'_' as usize);
    s
}

fn space_bitset(alphabet_size: usize) -> Bitset {
    let mut s = Bitset::new(alphabet_size);
    for b in [b' ', b'\t', b'\n', b'\r', 0x0b, 0x0c] {
        s.insert(b as usize);
    }
    s
}

fn add_posix_class(set: &mut Bitset, name: &[u8]) -> Result<(), ()> {
    let ranges: &[(u8, u8)] = match name {
        b"alnum" => &[(b'0', b'9'), (b'a', b'z'), (b'A', b'Z')],
        b"alpha" => &[(b'a', b'z'), (b'A', b'Z')],
        b"blank" => &[(b' ', b' '), (b'\t', b'\t')],
        b"cntrl" => &[(0x00, 0x1f), (0x7f, 0x7f)],
        b"digit" => &[(b'0', b'9')],
        b"graph" => &[(0x21, 0x7e)],
        b"lower" => &[(b'a', b'z')],
        b"print" => &[(0x20, 0x7e)],
        b"punct" => &[(0x21, 0x2f), (0x3a, 0x40), (0x5b, 0x60), (0x7b, 0x7e)],
        b"space" => &[
            (b' ', b' '),
            (b'\t', b'\t'),
            (b'\n', b'\n'),
            (b'\r', b'\r'),
            (0x0b, 0x0c),
        ],
        b"upper" => &[(b'A', b'Z')],
        b"xdigit" => &[(b'0', b'9'), (b'a', b'f'), (b'A', b'F')],
        _ => return Err(()),
    };
    for &(lo, hi) in ranges {
        set.insert_range(lo as usize, hi as usize);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    fn parse(pat: &str, syntax: Syntax) -> Parsed {
        Parser::new(pat.as_bytes(), syntax, 256, None).parse().unwrap()
    }

    #[test]
    fn literal_compaction() {
        let p = parse("abc", Syntax::POSIX_EXTENDED);
        match p.tree.kind() {
            NodeKind::LiteralRun(b) => assert_eq!(b, b"abc"),
            other => panic!("expected LiteralRun, got {:?}", other),
        }
    }

    #[test]
    fn star_factors_trailing_byte() {
        let p = parse("ab*", Syntax::POSIX_EXTENDED);
        match p.tree.kind() {
            NodeKind::Concat(l, r) => {
                assert!(matches!(l.kind(), NodeKind::CharSet(_)));
                match r.kind() {
                    NodeKind::Star(inner) => {
                        assert!(matches!(inner.kind(), NodeKind::CharSet(_)))
                    }
                    other => panic!("expected Star, got {:?}", other),
                }
            }
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn adjacent_repeats_collapse() {
        let p = parse("a*+?", Syntax::EMACS | Syntax::BK_PLUS_QM);
        // Under EMACS-like dialects + is bare-operator disabled by default;
        // use POSIX_EXTENDED instead so *, +, ? are all bare operators.
        let p2 = parse("a*+?", Syntax::POSIX_EXTENDED);
        assert!(matches!(p2.tree.kind(), NodeKind::Star(_)));
        let _ = p; // keep first parse (documents EMACS collapsing too)
    }

    #[test]
    fn capturing_groups_are_numbered_left_to_right() {
        let p = parse("(a)(b(c))", Syntax::POSIX_EXTENDED);
        assert_eq!(p.group_count, 3);
    }

    #[test]
    fn backreference_to_open_group_is_literal() {
        // \1 inside its own still-open group must be literal, not BackRef.
        let p =
            Parser::new(br"\(a\1\)", Syntax::POSIX_BASIC, 256, None).parse();
        assert!(p.is_ok());
    }

    #[test]
    fn unmatched_open_paren_is_eparen() {
        let err = Parser::new(b"(a", Syntax::POSIX_EXTENDED, 256, None)
            .parse()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EParen);
    }

    #[test]
    fn unmatched_close_paren_is_parse_error_by_default() {
        // POSIX_EXTENDED sets UNMATCHED_RIGHT_PAREN_ORD itself, so exercise
        // a bare extended-paren dialect without it.
        let err = Parser::new(b"a)", Syntax::NO_BK_PARENS, 256, None)
            .parse()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EParen);
    }

    #[test]
    fn unmatched_close_paren_literal_when_ordinary() {
        let syntax = Syntax::POSIX_EXTENDED | Syntax::UNMATCHED_RIGHT_PAREN_ORD;
        let p = Parser::new(b"a)", syntax, 256, None).parse().unwrap();
        match p.tree.kind() {
            NodeKind::LiteralRun(b) => assert_eq!(b, b"a)"),
            other => panic!("expected LiteralRun, got {:?}", other),
        }
    }

    #[test]
    fn bracket_cut_produces_cut_node() {
        let p = parse("[[:cut 7:]]foo", Syntax::POSIX_EXTENDED);
        match p.tree.kind() {
            NodeKind::Concat(l, _) => {
                assert!(matches!(l.kind(), NodeKind::Cut(7)))
            }
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn interval_bounds() {
        let p = parse("a{2,4}", Syntax::POSIX_EXTENDED);
        assert!(matches!(p.tree.kind(), NodeKind::Interval(_, 2, 4)));
    }

    #[test]
    fn interval_out_of_order_is_badbr() {
        let err = Parser::new(b"a{4,2}", Syntax::POSIX_EXTENDED, 256, None)
            .parse()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadBR);
    }

    #[test]
    fn unterminated_bracket_is_ebrack() {
        let err = Parser::new(b"[abc", Syntax::POSIX_EXTENDED, 256, None)
            .parse()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EBrack);
    }

    #[test]
    fn collation_elements_are_rejected() {
        let err = Parser::new(b"[[.ch.]]", Syntax::POSIX_EXTENDED, 256, None)
            .parse()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ECollate);
    }
}
