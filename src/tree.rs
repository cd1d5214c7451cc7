/*!
The expression tree.

A [`Tree`] is a reference-counted handle to a [`NodeKind`]-tagged node: every
sub-expression may be shared by `Concat`/`Alt`/`Parens` parents built on top
of it, so an `Rc` clone is how sharing a sub-expression works; dropping the
last `Tree` handle releases it.

A `Tree` is single-threaded by construction (the core here is
single-threaded and cooperative), so `Rc`/`Cell`/`RefCell` are the right
tools rather than `Arc`/atomics.
*/

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::bitset::Bitset;

/// The maximum permitted interval repetition bound.
pub const DUP_MAX: u32 = 32767;

/// Zero-width predicates and side-effecting constructs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ContextKind {
    BeginLine,
    EndLine,
    WordStart,
    WordEnd,
    WordBoundary,
    NotWordBoundary,
    BufferStart,
    BufferEnd,
    /// `\1`..`\9`, 1-based.
    BackRef(u32),
    /// `\=` in the Emacs-flavored dialects: the empty match at exactly the
    /// current point (distinct from `BufferStart`/`BufferEnd`, which pin to
    /// the ends of the whole haystack).
    EqualPoint,
}

/// The tagged variant of an expression tree node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    CharSet(Bitset),
    LiteralRun(Vec<u8>),
    Concat(Tree, Tree),
    Alt(Tree, Tree),
    Opt(Tree),
    Star(Tree),
    Plus(Tree),
    /// `0 <= min <= max <= DUP_MAX`.
    Interval(Tree, u32, u32),
    /// `group_index == 0` means syntactic grouping only (no capture);
    /// otherwise it is the 1-based capture slot.
    Parens(Tree, u32),
    Context(ContextKind),
    /// A tagged final marker: "match succeeded with flavor N".
    Cut(i32),
}

struct NodeData {
    kind: NodeKind,
    /// Assigned during [`analyze`]; negative means "not directly
    /// observable" (not yet analyzed, or intentionally excluded from direct
    /// dispatch, e.g. shared sub-nodes reached only through `simplify`).
    id: Cell<i32>,
    /// The exact match length if known, else `-1`.
    fixed_len: Cell<i64>,
    /// True if any sub-node carries a side effect (captures, back-refs,
    /// anchors, intervals whose bounds are not both exactly once).
    observable: Cell<bool>,
    /// Cached output of [`Tree::simplify`], keyed implicitly by the subexp
    /// table used to build it (callers only ever simplify once per compile).
    simplified: RefCell<Option<Tree>>,
}

/// A reference-counted handle to an expression tree node.
///
/// Cloning a `Tree` is O(1) (it bumps an `Rc` strong count) and is how a
/// node is shared between multiple parents; this is the Rust analogue of the
/// source's `save`/`release` pair. Structural equality (see
/// [`Tree::structural_equal`]) is independent of which handle you hold.
#[derive(Clone)]
pub struct Tree(Rc<NodeData>);

impl Tree {
    fn new(kind: NodeKind) -> Tree {
        Tree(Rc::new(NodeData {
            kind,
            id: Cell::new(-1),
            fixed_len: Cell::new(-1),
            observable: Cell::new(false),
            simplified: RefCell::new(None),
        }))
    }

    pub fn char_set(set: Bitset) -> Tree {
        Tree::new(NodeKind::CharSet(set))
    }

    pub fn literal_run(bytes: Vec<u8>) -> Tree {
        Tree::new(NodeKind::LiteralRun(bytes))
    }

    pub fn concat(left: Tree, right: Tree) -> Tree {
        Tree::new(NodeKind::Concat(left, right))
    }

    pub fn alt(left: Tree, right: Tree) -> Tree {
        Tree::new(NodeKind::Alt(left, right))
    }

    pub fn opt(child: Tree) -> Tree {
        Tree::new(NodeKind::Opt(child))
    }

    pub fn star(child: Tree) -> Tree {
        Tree::new(NodeKind::Star(child))
    }

    pub fn plus(child: Tree) -> Tree {
        Tree::new(NodeKind::Plus(child))
    }

    pub fn interval(child: Tree, min: u32, max: u32) -> Tree {
        debug_assert!(min <= max && max <= DUP_MAX);
        Tree::new(NodeKind::Interval(child, min, max))
    }

    pub fn parens(child: Tree, group_index: u32) -> Tree {
        Tree::new(NodeKind::Parens(child, group_index))
    }

    pub fn context(kind: ContextKind) -> Tree {
        Tree::new(NodeKind::Context(kind))
    }

    pub fn cut(tag: i32) -> Tree {
        Tree::new(NodeKind::Cut(tag))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn id(&self) -> i32 {
        self.0.id.get()
    }

    pub fn fixed_len(&self) -> i64 {
        self.0.fixed_len.get()
    }

    pub fn is_observable(&self) -> bool {
        self.0.observable.get()
    }

    /// Pointer identity, used to short-circuit [`Tree::structural_equal`] on
    /// interned pointer equality before falling back to a full comparison.
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Structural equality: recursive, short-circuiting on pointer identity.
    pub fn structural_equal(&self, other: &Tree) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (NodeKind::CharSet(a), NodeKind::CharSet(b)) => a.is_equal(b),
            (NodeKind::LiteralRun(a), NodeKind::LiteralRun(b)) => a == b,
            (NodeKind::Concat(al, ar), NodeKind::Concat(bl, br)) => {
                al.structural_equal(bl) && ar.structural_equal(br)
            }
            (NodeKind::Alt(al, ar), NodeKind::Alt(bl, br)) => {
                al.structural_equal(bl) && ar.structural_equal(br)
            }
            (NodeKind::Opt(a), NodeKind::Opt(b)) => a.structural_equal(b),
            (NodeKind::Star(a), NodeKind::Star(b)) => a.structural_equal(b),
            (NodeKind::Plus(a), NodeKind::Plus(b)) => a.structural_equal(b),
            (
                NodeKind::Interval(a, amin, amax),
                NodeKind::Interval(b, bmin, bmax),
            ) => amin == bmin && amax == bmax && a.structural_equal(b),
            (NodeKind::Parens(a, ag), NodeKind::Parens(b, bg)) => {
                ag == bg && a.structural_equal(b)
            }
            (NodeKind::Context(a), NodeKind::Context(b)) => a == b,
            (NodeKind::Cut(a), NodeKind::Cut(b)) => a == b,
            _ => false,
        }
    }

    /// Mixes left, right, bitset-hash, the node's integer params, the type
    /// tag and `id` into `seed`. Used to hash-cons compiled-DFA caches keyed
    /// by sub-expression.
    pub fn structural_hash(&self, seed: u64) -> u64 {
        fn mix(h: u64, x: u64) -> u64 {
            // A SplitMix64-style mixing step: cheap, decent avalanche, no
            // cryptographic requirement.
            let mut z = h ^ x;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            z ^ (z >> 31)
        }
        let mut h = seed;
        match self.kind() {
            NodeKind::CharSet(set) => {
                h = mix(h, 1);
                h = mix(h, set.hash_value());
            }
            NodeKind::LiteralRun(bytes) => {
                h = mix(h, 2);
                for &b in bytes {
                    h = mix(h, b as u64);
                }
            }
            NodeKind::Concat(l, r) => {
                h = mix(h, 3);
                h = l.structural_hash(h);
                h = r.structural_hash(h);
            }
            NodeKind::Alt(l, r) => {
                h = mix(h, 4);
                h = l.structural_hash(h);
                h = r.structural_hash(h);
            }
            NodeKind::Opt(c) => {
                h = mix(h, 5);
                h = c.structural_hash(h);
            }
            NodeKind::Star(c) => {
                h = mix(h, 6);
                h = c.structural_hash(h);
            }
            NodeKind::Plus(c) => {
                h = mix(h, 7);
                h = c.structural_hash(h);
            }
            NodeKind::Interval(c, min, max) => {
                h = mix(h, 8);
                h = mix(h, *min as u64);
                h = mix(h, *max as u64);
                h = c.structural_hash(h);
            }
            NodeKind::Parens(c, g) => {
                h = mix(h, 9);
                h = mix(h, *g as u64);
                h = c.structural_hash(h);
            }
            NodeKind::Context(k) => {
                h = mix(h, 10);
                h = mix(h, context_tag(k));
            }
            NodeKind::Cut(tag) => {
                h = mix(h, 11);
                h = mix(h, *tag as u64);
            }
        }
        mix(h, self.id() as i64 as u64)
    }

    /// Rewrites every `BackRef(n)` node to (a fresh copy of) the tree rooted
    /// at capture group `n`'s sub-expression, so that a
    /// pure-regular sub-tree can still be handed to the DFA even when it
    /// textually contains back-references elsewhere in the pattern. The
    /// result is cached on the node so repeated solver visits don't
    /// re-substitute.
    ///
    /// `subexps[n]` is `None` for group `0` (unused) and for any group index
    /// not present in the pattern.
    pub fn simplify(&self, subexps: &[Option<Tree>]) -> Tree {
        if let Some(cached) = self.0.simplified.borrow().as_ref() {
            return cached.clone();
        }
        let out = match self.kind() {
            NodeKind::Context(ContextKind::BackRef(n)) => {
                match subexps.get(*n as usize).and_then(|o| o.as_ref()) {
                    Some(sub) => sub.simplify(subexps),
                    // An out-of-range back-reference was already rejected by
                    // the parser; reaching here during simplify means the
                    // referent simply never matched, so treat it as
                    // matching nothing (distinct from matching the empty
                    // string).
                    None => Tree::char_set(Bitset::new(256)),
                }
            }
            NodeKind::Concat(l, r) => {
                Tree::concat(l.simplify(subexps), r.simplify(subexps))
            }
            NodeKind::Alt(l, r) => {
                Tree::alt(l.simplify(subexps), r.simplify(subexps))
            }
            NodeKind::Opt(c) => Tree::opt(c.simplify(subexps)),
            NodeKind::Star(c) => Tree::star(c.simplify(subexps)),
            NodeKind::Plus(c) => Tree::plus(c.simplify(subexps)),
            NodeKind::Interval(c, min, max) => {
                Tree::interval(c.simplify(subexps), *min, *max)
            }
            NodeKind::Parens(c, g) => Tree::parens(c.simplify(subexps), *g),
            NodeKind::CharSet(_)
            | NodeKind::LiteralRun(_)
            | NodeKind::Context(_)
            | NodeKind::Cut(_) => self.clone(),
        };
        *self.0.simplified.borrow_mut() = Some(out.clone());
        out
    }
}

pub(crate) fn context_tag(k: &ContextKind) -> u64 {
    match k {
        ContextKind::BeginLine => 0,
        ContextKind::EndLine => 1,
        ContextKind::WordStart => 2,
        ContextKind::WordEnd => 3,
        ContextKind::WordBoundary => 4,
        ContextKind::NotWordBoundary => 5,
        ContextKind::BufferStart => 6,
        ContextKind::BufferEnd => 7,
        ContextKind::BackRef(n) => 8u64.wrapping_add((*n as u64) << 8),
        ContextKind::EqualPoint => 9,
    }
}

/// Returns true for the regular subset that may appear unmodified inside an
/// NFA. Every other variant either becomes a `Side` edge (`Context`) or must
/// be handled by the solver.
pub fn is_regular(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::CharSet(_)
            | NodeKind::LiteralRun(_)
            | NodeKind::Concat(_, _)
            | NodeKind::Alt(_, _)
            | NodeKind::Opt(_)
            | NodeKind::Star(_)
            | NodeKind::Plus(_)
    )
}

/// Bottom-up analysis pass: assigns stable ids, `fixed_len` and the
/// `observable` flag. `next_id` is threaded through so that ids are
/// assigned in a single depth-first post-order traversal and therefore
/// stable across repeated `analyze` calls on structurally-identical trees
/// built the same way.
pub fn analyze(tree: &Tree, next_id: &mut i32) {
    if tree.id() >= 0 {
        return;
    }
    let (fixed_len, observable): (i64, bool) = match tree.kind() {
        NodeKind::CharSet(_) => (1, false),
        NodeKind::LiteralRun(bytes) => (bytes.len() as i64, false),
        NodeKind::Concat(l, r) => {
            analyze(l, next_id);
            analyze(r, next_id);
            let len = match (l.fixed_len(), r.fixed_len()) {
                (a, b) if a >= 0 && b >= 0 => a + b,
                _ => -1,
            };
            (len, l.is_observable() || r.is_observable())
        }
        NodeKind::Alt(l, r) => {
            analyze(l, next_id);
            analyze(r, next_id);
            let len = if l.fixed_len() >= 0 && l.fixed_len() == r.fixed_len()
            {
                l.fixed_len()
            } else {
                -1
            };
            (len, l.is_observable() || r.is_observable())
        }
        NodeKind::Opt(c) => {
            analyze(c, next_id);
            (-1, c.is_observable())
        }
        NodeKind::Star(c) => {
            analyze(c, next_id);
            (-1, c.is_observable())
        }
        NodeKind::Plus(c) => {
            analyze(c, next_id);
            (-1, c.is_observable())
        }
        NodeKind::Interval(c, min, max) => {
            analyze(c, next_id);
            let len = if *min == *max && c.fixed_len() >= 0 {
                c.fixed_len() * (*min as i64)
            } else {
                -1
            };
            // An interval is only non-observable if it degenerates to
            // exactly-once (min == max == 1); any other bound requires the
            // solver's counter-carrying `Solutions` machinery.
            let observable = !(*min == 1 && *max == 1) || c.is_observable();
            (len, observable)
        }
        NodeKind::Parens(c, _) => {
            analyze(c, next_id);
            // Any capturing or non-capturing group is itself observable
            // only if it captures (group_index != 0); syntactic-only
            // grouping is transparent.
            let captures = matches!(tree.kind(), NodeKind::Parens(_, g) if *g != 0);
            (c.fixed_len(), captures || c.is_observable())
        }
        NodeKind::Context(_) => (0, true),
        NodeKind::Cut(_) => (0, false),
    };
    tree.0.fixed_len.set(fixed_len);
    tree.0.observable.set(observable);
    tree.0.id.set(*next_id);
    *next_id += 1;
}

/// Walks `tree` collecting `Parens(_, g)` sub-trees into `table[g]`
/// (`table[0]` is always `None`; indices grow to accommodate the largest
/// group seen). This is the "subexp table" used by [`Tree::simplify`] to
/// resolve back-references.
pub fn collect_subexps(tree: &Tree, table: &mut Vec<Option<Tree>>) {
    match tree.kind() {
        NodeKind::Parens(c, g) => {
            if *g != 0 {
                let g = *g as usize;
                if table.len() <= g {
                    table.resize(g + 1, None);
                }
                table[g] = Some(c.clone());
            }
            collect_subexps(c, table);
        }
        NodeKind::Concat(l, r) | NodeKind::Alt(l, r) => {
            collect_subexps(l, table);
            collect_subexps(r, table);
        }
        NodeKind::Opt(c)
        | NodeKind::Star(c)
        | NodeKind::Plus(c)
        | NodeKind::Interval(c, _, _) => collect_subexps(c, table),
        NodeKind::CharSet(_) | NodeKind::LiteralRun(_) | NodeKind::Context(_)
        | NodeKind::Cut(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(b: &str) -> Tree {
        Tree::literal_run(b.as_bytes().to_vec())
    }

    #[test]
    fn structural_equal_ignores_identity() {
        let a = Tree::concat(lit("ab"), lit("c"));
        let b = Tree::concat(lit("ab"), lit("c"));
        assert!(!a.ptr_eq(&b));
        assert!(a.structural_equal(&b));
    }

    #[test]
    fn structural_hash_matches_for_equal_trees() {
        let a = Tree::star(lit("x"));
        let b = Tree::star(lit("x"));
        assert_eq!(a.structural_hash(0), b.structural_hash(0));
    }

    #[test]
    fn analyze_computes_fixed_len_and_observable() {
        let tree = Tree::concat(lit("ab"), Tree::parens(lit("c"), 1));
        let mut next_id = 0;
        analyze(&tree, &mut next_id);
        assert_eq!(tree.fixed_len(), 3);
        assert!(tree.is_observable());
    }

    #[test]
    fn simplify_substitutes_backref() {
        let group = lit("ab");
        let pattern = Tree::concat(
            Tree::parens(group.clone(), 1),
            Tree::context(ContextKind::BackRef(1)),
        );
        let mut table = vec![];
        collect_subexps(&pattern, &mut table);
        let simplified = pattern.simplify(&table);
        match simplified.kind() {
            NodeKind::Concat(_, r) => {
                assert!(r.structural_equal(&group));
            }
            _ => panic!("expected Concat"),
        }
    }
}
