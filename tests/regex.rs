use rx::{compile, CompileFlags, ExecFlags};

fn ere(pattern: &str) -> rx::Compiled {
    compile(pattern.as_bytes(), CompileFlags::EXTENDED).unwrap()
}

fn bre(pattern: &str) -> rx::Compiled {
    compile(pattern.as_bytes(), CompileFlags::NONE).unwrap()
}

#[test]
fn literal_matches_exactly() {
    let re = ere("table");
    let input = b"table";
    let caps = re.match_at(input, 0, input.len(), ExecFlags::NONE).unwrap().unwrap();
    assert_eq!(caps.get(0).start_offset, 0);
    assert_eq!(caps.get(0).end_offset, 5);
}

#[test]
fn alternation_and_plus_capture_groups() {
    let re = ere("a(b|c)+d");
    let input = b"abccbd";
    let caps = re.match_at(input, 0, input.len(), ExecFlags::NONE).unwrap().unwrap();
    assert_eq!(caps.get(0).start_offset, 0);
    assert_eq!(caps.get(0).end_offset, 6);
    // The last iteration of the + group is what's recorded.
    let g1 = caps.get(1);
    assert_eq!(&input[g1.start_offset as usize..g1.end_offset as usize], b"b");
}

#[test]
fn backreference_requires_equal_text() {
    // Back-references are spelled `\(...\)...\1` in the basic dialect.
    let re = bre("\\([a-z]\\+\\)-\\1");
    assert!(re.match_at(b"ab-ab", 0, 5, ExecFlags::NONE).unwrap().is_some());
    assert!(re.match_at(b"ab-ac", 0, 5, ExecFlags::NONE).unwrap().is_none());
}

#[test]
fn extended_dialect_also_supports_backreferences() {
    // Unlike strict POSIX ERE, this engine's extended dialect keeps \1..\9
    // available rather than dropping to literal digits.
    let re = ere("([a-z]+)-\\1");
    let input = b"foo-foo";
    let caps = re.match_at(input, 0, input.len(), ExecFlags::NONE).unwrap().unwrap();
    assert_eq!(caps.get(0).start_offset, 0);
    assert_eq!(caps.get(0).end_offset, 7);
    assert_eq!(caps.get(1).start_offset, 0);
    assert_eq!(caps.get(1).end_offset, 3);
    assert!(re.match_at(b"foo-bar", 0, 7, ExecFlags::NONE).unwrap().is_none());
}

#[test]
fn begin_line_anchor_with_newline_flag() {
    let re = compile(b"^abc", CompileFlags::EXTENDED | CompileFlags::NEWLINE).unwrap();
    let input = b"xyz\nabc";
    let caps = re.search(input, 0, input.len(), ExecFlags::NONE).unwrap().unwrap();
    assert_eq!(caps.get(0).start_offset, 4);
    assert_eq!(caps.get(0).end_offset, 7);
}

#[test]
fn interval_enforces_bounds() {
    let re = ere("a{2,4}");
    assert!(re.match_at(b"a", 0, 1, ExecFlags::NONE).unwrap().is_none());
    let caps = re.match_at(b"aaaaa", 0, 5, ExecFlags::NONE).unwrap().unwrap();
    // Greedy: takes as many as allowed, not all five.
    assert_eq!(caps.get(0).end_offset, 4);
}

#[test]
fn search_scans_for_first_match_position() {
    let re = ere("[0-9]+");
    let input = b"no digits here, just 42 and 7";
    let caps = re.search(input, 0, input.len(), ExecFlags::NONE).unwrap().unwrap();
    let s = caps.get(0).start_offset as usize;
    let e = caps.get(0).end_offset as usize;
    assert_eq!(&input[s..e], b"42");
}

#[test]
fn no_sub_returns_only_whole_match() {
    let re = compile(b"(a)(b)", CompileFlags::EXTENDED | CompileFlags::NO_SUB).unwrap();
    let caps = re.match_at(b"ab", 0, 2, ExecFlags::NONE).unwrap().unwrap();
    assert_eq!(caps.len(), 1);
}

#[test]
fn ignore_case_folds_both_sides() {
    let re = compile(b"HELLO", CompileFlags::EXTENDED | CompileFlags::IGNORE_CASE).unwrap();
    assert!(re.match_at(b"hello", 0, 5, ExecFlags::NONE).unwrap().is_some());
    assert!(re.match_at(b"HeLLo", 0, 5, ExecFlags::NONE).unwrap().is_some());
}

#[test]
fn basic_dialect_treats_plus_as_literal() {
    // In the basic (non-extended) dialect, `+` has no special meaning.
    let re = bre("a+b");
    assert!(re.match_at(b"a+b", 0, 3, ExecFlags::NONE).unwrap().is_some());
    assert!(re.match_at(b"aab", 0, 3, ExecFlags::NONE).unwrap().is_none());
}

#[test]
fn basic_dialect_backreference_via_escaped_group() {
    let re = bre("\\([a-z]*\\)end\\1");
    assert!(re.match_at(b"abendab", 0, 7, ExecFlags::NONE).unwrap().is_some());
    assert!(re.match_at(b"abendxy", 0, 7, ExecFlags::NONE).unwrap().is_none());
}

#[test]
fn not_bol_blocks_caret_anchor() {
    let re = ere("^abc");
    assert!(re.match_at(b"abc", 0, 3, ExecFlags::NOT_BOL).unwrap().is_none());
    assert!(re.match_at(b"abc", 0, 3, ExecFlags::NONE).unwrap().is_some());
}

#[test]
fn optional_group_prefers_present_over_empty() {
    let re = ere("colou?r");
    assert!(re.match_at(b"color", 0, 5, ExecFlags::NONE).unwrap().is_some());
    assert!(re.match_at(b"colour", 0, 6, ExecFlags::NONE).unwrap().is_some());
}

#[test]
fn cut_marker_surfaces_as_final_tag() {
    // The cut fires before "foo" is even consumed, so the accepting state
    // at the end of the match is the literal run's own (untagged) terminal;
    // the tag has to survive from the earlier, already-passed-through state.
    let re = ere("[[:cut 7:]]foo");
    let caps = re.match_at(b"foo", 0, 3, ExecFlags::NONE).unwrap().unwrap();
    assert_eq!(caps.final_tag, 7);
}

#[test]
fn invalid_pattern_reports_offset() {
    let err = compile(b"a(b", CompileFlags::EXTENDED).unwrap_err();
    assert!(err.offset().is_some());
}
