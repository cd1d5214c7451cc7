/*!
The backtracking solver.

Each observable node type is defined by recursing on a *sub-tree* (its own
right child, or itself) rather than on free-standing continuation state, so
plain recursive descent over the tree gives the priority order a
backtracking engine wants (`Alt` tries `L` exhaustively before `R`;
`Concat`/`Plus`/`Star` try the longest split first) without needing a
hand-rolled coroutine object. This solver returns on the first successful
derivation rather than staying resumable for a "next solution" query, which
the public surface (`match_at`, `search`) never asks for. This
simplification is recorded in DESIGN.md.

Layered as a byte-budgeted fallback path on top of the fast DFA path for
non-observable sub-trees.
*/

use std::collections::HashMap;
use std::rc::Rc;

use crate::cache::Cache;
use crate::error::Error;
use crate::matcher::fit_p_tagged;
use crate::nfa::Nfa;
use crate::tables::{SyntaxTable, Translate};
use crate::tree::{ContextKind, NodeKind, Tree};

pub type Captures = Vec<Option<(usize, usize)>>;

#[derive(Clone, Copy, Debug, Default)]
pub struct MatchFlags {
    pub not_bol: bool,
    pub not_eol: bool,
    pub newline_anchor: bool,
}

struct Solver<'a> {
    input: &'a [u8],
    regs: Captures,
    translate: Option<&'a Translate>,
    syntax_table: &'a SyntaxTable,
    flags: MatchFlags,
    subtree_nfas: HashMap<i32, Rc<Nfa>>,
    alphabet_size: usize,
    byte_budget: usize,
    /// The `final_tag` of the most recent successful fast-path check (set by
    /// a `Cut` node reached along some matched sub-tree); `0` if no `Cut` was
    /// ever reached. Reported alongside the overall match on success.
    last_tag: i32,
}

/// Runs the solver over `tree` for the candidate span `[start, end)`.
/// Returns the capture table (`regs[0]` is always the whole-match span) on
/// success, or `None` if `tree` does not match that exact span.
pub fn solve(
    tree: &Tree,
    input: &[u8],
    start: usize,
    end: usize,
    group_count: u32,
    translate: Option<&Translate>,
    syntax_table: &SyntaxTable,
    flags: MatchFlags,
    alphabet_size: usize,
    byte_budget: usize,
) -> Result<Option<(Captures, i32)>, Error> {
    let mut solver = Solver {
        input,
        regs: vec![None; group_count as usize + 1],
        translate,
        syntax_table,
        flags,
        subtree_nfas: HashMap::new(),
        alphabet_size,
        byte_budget,
        last_tag: 0,
    };
    if solver.matches(tree, start, end)? {
        solver.regs[0] = Some((start, end));
        Ok(Some((solver.regs, solver.last_tag)))
    } else {
        Ok(None)
    }
}

impl<'a> Solver<'a> {
    fn fold(&self, b: u8) -> u8 {
        match self.translate {
            Some(t) => t.apply(b),
            None => b,
        }
    }

    fn set_reg(&mut self, g: usize, val: Option<(usize, usize)>) {
        if g < self.regs.len() {
            self.regs[g] = val;
        }
    }

    /// The solver's fast path: a non-observable sub-tree is pure-regular,
    /// so whether it matches `[start, end)` is answerable by a single DFA
    /// fit test rather than tree recursion. The NFA for a given sub-tree is
    /// memoized per solve by tree id; the superstate cache itself is
    /// rebuilt per call (this solver does not persist the lazy cache across
    /// fast-path checks — see DESIGN.md).
    fn fast_path_match(&mut self, tree: &Tree, start: usize, end: usize) -> bool {
        let id = tree.id();
        let nfa = self
            .subtree_nfas
            .entry(id)
            .or_insert_with(|| Rc::new(Nfa::build(tree)))
            .clone();
        let mut cache = Cache::new(nfa, self.alphabet_size, self.byte_budget);
        let start_state = cache.start_superstate();
        match fit_p_tagged(&mut cache, start_state, self.input, start, end) {
            Some(tag) => {
                if tag != 0 {
                    self.last_tag = tag;
                }
                true
            }
            None => false,
        }
    }

    fn matches(&mut self, tree: &Tree, start: usize, end: usize) -> Result<bool, Error> {
        let fixed_len = tree.fixed_len();
        if fixed_len >= 0 && fixed_len != (end - start) as i64 {
            return Ok(false);
        }
        if !tree.is_observable() {
            return Ok(self.fast_path_match(tree, start, end));
        }
        match tree.kind() {
            // The simplifier resolves back-references before the solver
            // ever sees a tree, so a non-observable-looking leaf reaching
            // here with `is_observable() == true` only happens if its
            // parent (e.g. an Interval with bounds other than 1..=1) forced
            // this branch; the DFA fast path is still correct for it.
            NodeKind::CharSet(_) | NodeKind::LiteralRun(_) | NodeKind::Cut(_) => {
                Ok(self.fast_path_match(tree, start, end))
            }
            NodeKind::Parens(inner, g) => {
                let g = *g as usize;
                let saved = self.regs.get(g).copied().flatten();
                if self.matches(inner, start, end)? {
                    self.set_reg(g, Some((start, end)));
                    Ok(true)
                } else {
                    self.set_reg(g, saved);
                    Ok(false)
                }
            }
            NodeKind::Opt(inner) => {
                if self.matches(inner, start, end)? {
                    return Ok(true);
                }
                Ok(start == end)
            }
            NodeKind::Alt(l, r) => {
                if self.matches(l, start, end)? {
                    return Ok(true);
                }
                self.matches(r, start, end)
            }
            NodeKind::Concat(l, r) => {
                let mut k = end;
                loop {
                    if self.matches(l, start, k)? && self.matches(r, k, end)? {
                        return Ok(true);
                    }
                    if k == start {
                        return Ok(false);
                    }
                    k -= 1;
                }
            }
            NodeKind::Plus(child) => self.matches_plus_or_star(tree, child, start, end, false),
            NodeKind::Star(child) => self.matches_plus_or_star(tree, child, start, end, true),
            NodeKind::Interval(child, min, max) => {
                self.matches_interval(child, *min, *max, 0, start, end)
            }
            NodeKind::Context(kind) => self.matches_context(kind, start, end),
        }
    }

    /// `Plus`/`Star`: recurse on the same node for the remainder rather
    /// than switching shape — the right-hand side recurses on the same node,
    /// not on `child`.
    fn matches_plus_or_star(
        &mut self,
        node: &Tree,
        child: &Tree,
        start: usize,
        end: usize,
        allow_zero: bool,
    ) -> Result<bool, Error> {
        if allow_zero && start == end {
            return Ok(true);
        }
        let mut k = end;
        while k > start {
            if self.matches(child, start, k)? {
                if k == end || self.matches(node, k, end)? {
                    return Ok(true);
                }
            }
            k -= 1;
        }
        Ok(false)
    }

    /// `Interval(child, min, max)` with iteration counter `x`. The
    /// `n == x && m > x` base case is unreachable given the parser's
    /// `min <= max` invariant, so it's folded into the general `x >= max`
    /// guard rather than surfaced as a distinct error.
    fn matches_interval(
        &mut self,
        child: &Tree,
        min: u32,
        max: u32,
        x: u32,
        start: usize,
        end: usize,
    ) -> Result<bool, Error> {
        if x >= max {
            return Ok(min <= x && start == end);
        }
        if min <= x && start == end {
            return Ok(true);
        }
        let mut k = end;
        while k > start {
            if self.matches(child, start, k)?
                && self.matches_interval(child, min, max, x + 1, k, end)?
            {
                return Ok(true);
            }
            k -= 1;
        }
        Ok(false)
    }

    fn matches_context(&mut self, kind: &ContextKind, start: usize, end: usize) -> Result<bool, Error> {
        // BackRef is the one Context predicate that isn't zero-width: it
        // consumes exactly as many bytes as its referent captured.
        if let ContextKind::BackRef(n) = kind {
            let (rs, re) = match self.regs.get(*n as usize).copied().flatten() {
                Some(r) => r,
                None => return Ok(false),
            };
            if re - rs != end - start {
                return Ok(false);
            }
            for i in 0..(re - rs) {
                if self.fold(self.input[rs + i]) != self.fold(self.input[start + i]) {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        if start != end {
            return Ok(false);
        }
        let len = self.input.len();
        Ok(match kind {
            ContextKind::BeginLine => {
                (start == 0 && !self.flags.not_bol)
                    || (self.flags.newline_anchor && start > 0 && self.input[start - 1] == b'\n')
            }
            ContextKind::EndLine => {
                (end == len && !self.flags.not_eol)
                    || (self.flags.newline_anchor && end < len && self.input[end] == b'\n')
            }
            ContextKind::BufferStart => start == 0 && !self.flags.not_bol,
            ContextKind::BufferEnd => end == len && !self.flags.not_eol,
            ContextKind::WordStart => !self.word_before(start) && self.word_after(start),
            ContextKind::WordEnd => self.word_before(start) && !self.word_after(start),
            ContextKind::WordBoundary => self.word_before(start) != self.word_after(start),
            ContextKind::NotWordBoundary => self.word_before(start) == self.word_after(start),
            // Matches the empty string at exactly the current point; `start
            // == end` is already established above, so there's nothing
            // further to check.
            ContextKind::EqualPoint => true,
            ContextKind::BackRef(_) => unreachable!("handled above"),
        })
    }

    fn word_before(&self, pos: usize) -> bool {
        pos > 0 && self.syntax_table.is_word(self.input[pos - 1])
    }

    fn word_after(&self, pos: usize) -> bool {
        pos < self.input.len() && self.syntax_table.is_word(self.input[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::Bitset;
    use crate::tree::{analyze, collect_subexps};

    fn singleton(b: u8) -> Tree {
        let mut s = Bitset::new(256);
        s.insert(b as usize);
        Tree::char_set(s)
    }

    fn prep(tree: Tree) -> Tree {
        let mut id = 0;
        analyze(&tree, &mut id);
        tree
    }

    fn run(tree: &Tree, input: &[u8]) -> Option<Captures> {
        let mut table = vec![];
        collect_subexps(tree, &mut table);
        let simplified = tree.simplify(&table);
        let mut id = 0;
        analyze(&simplified, &mut id);
        solve(
            &simplified,
            input,
            0,
            input.len(),
            table.len().saturating_sub(1) as u32,
            None,
            &SyntaxTable::default_ascii(),
            MatchFlags::default(),
            256,
            1 << 16,
        )
        .unwrap()
        .map(|(caps, _tag)| caps)
    }

    #[test]
    fn capturing_group_records_span() {
        let tree = prep(Tree::concat(
            Tree::parens(Tree::literal_run(b"ab".to_vec()), 1),
            Tree::literal_run(b"c".to_vec()),
        ));
        let caps = run(&tree, b"abc").unwrap();
        assert_eq!(caps[1], Some((0, 2)));
        assert_eq!(caps[0], Some((0, 3)));
    }

    #[test]
    fn backreference_requires_equal_bytes() {
        // (a+)-\1 against "aa-aa"
        let group = Tree::plus(singleton(b'a'));
        let tree = prep(Tree::concat(
            Tree::concat(Tree::parens(group, 1), Tree::literal_run(b"-".to_vec())),
            Tree::context(ContextKind::BackRef(1)),
        ));
        assert!(run(&tree, b"aa-aa").is_some());
        assert!(run(&tree, b"aa-ab").is_none());
    }

    #[test]
    fn star_accepts_empty_and_greedy_match() {
        let tree = prep(Tree::star(singleton(b'a')));
        assert!(run(&tree, b"").is_some());
        assert!(run(&tree, b"aaaa").is_some());
    }

    #[test]
    fn interval_enforces_bounds() {
        let tree = prep(Tree::interval(singleton(b'a'), 2, 4));
        assert!(run(&tree, b"aa").is_some());
        assert!(run(&tree, b"aaaa").is_some());
        assert!(run(&tree, b"a").is_none());
        assert!(run(&tree, b"aaaaa").is_none());
    }

    #[test]
    fn begin_line_anchor() {
        let tree = prep(Tree::concat(
            Tree::context(ContextKind::BeginLine),
            Tree::literal_run(b"abc".to_vec()),
        ));
        assert!(run(&tree, b"abc").is_some());
    }
}
