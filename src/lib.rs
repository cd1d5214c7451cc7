/*!
A POSIX-flavored regular expression engine built from four pieces that
hand off to each other: a parser that turns pattern bytes into an
expression tree, a Thompson-style NFA built from that tree, a lazily
grown DFA cache ("superstate" cache) that fast-paths the pure-regular
parts of a match, and a backtracking solver that drives the cache and
handles the parts a DFA can't: captures, back-references, and anchors.

```
use rx::{compile, CompileFlags, ExecFlags};

let re = compile(b"(a+)(b+)", CompileFlags::EXTENDED).unwrap();
let caps = re.match_at(b"aaabb", 0, 5, ExecFlags::NONE).unwrap().unwrap();
assert_eq!(caps.get(1).start_offset, 0);
assert_eq!(caps.get(2).end_offset, 5);
```

See `DESIGN.md` in the repository root for how the pieces are grounded
and where this engine's design departs from a no-compromises ideal.
*/

mod bitset;
mod cache;
mod closure;
mod error;
mod matcher;
mod nfa;
mod parser;
mod regex;
mod solver;
mod syntax;
mod tables;
mod tree;

pub use error::{error_text, Error, ErrorCode};
pub use regex::{compile, CaptureSlot, Captures, Compiled, CompileFlags, ExecFlags};
pub use syntax::Syntax;
pub use tree::DUP_MAX;
