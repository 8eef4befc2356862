//! Pattern code validation.

use std::sync::OnceLock;

use regex::Regex;

use synthmob_types::{SlotType, Validation};

/// Maximum pattern length in characters.
pub const MAX_PATTERN_LEN: usize = 560;

/// Host-language constructs that would allow sandbox escape or runtime
/// mutation. Matched on word boundaries anywhere in the code.
const BANNED_CONSTRUCTS: [&str; 30] = [
    "eval",
    "Function",
    "import",
    "require",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "window",
    "globalThis",
    "document",
    "process",
    "__proto__",
    "prototype",
    "constructor",
    "function",
    "class",
    "new",
    "this",
    "var",
    "let",
    "const",
    "if",
    "else",
    "for",
    "while",
    "do",
    "switch",
    "return",
    "throw",
    "try",
];

/// Functions that are never available.
const HARD_BANNED: [&str; 3] = ["voicings", "samples", "soundAlias"];

/// Functions the runtime does not support, with their replacements.
const UNSUPPORTED: [(&str, &str); 3] = [
    ("space", "pan"),
    ("feedback", "delayfeedback"),
    ("reverb", "room"),
];

/// Value-like signal identifiers that must not be called.
const SIGNALS: [&str; 7] = ["sine", "cosine", "saw", "square", "tri", "rand", "irand"];

struct Res {
    leading_call: Regex,
    banned: Regex,
    hard_banned: Regex,
    unsupported: Regex,
    signal_call: Regex,
    arrow: Regex,
    numeric: Regex,
    fraction_tuple: Regex,
    decimal_tuple: Regex,
    pitched: Regex,
    s_open: Regex,
    note_open: Regex,
    n_open: Regex,
}

fn res() -> &'static Res {
    static RES: OnceLock<Res> = OnceLock::new();
    RES.get_or_init(|| Res {
        leading_call: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\(").unwrap(),
        banned: Regex::new(&format!(r"\b(?:{})\b", BANNED_CONSTRUCTS.join("|"))).unwrap(),
        hard_banned: Regex::new(&format!(r"\b({})\s*\(", HARD_BANNED.join("|"))).unwrap(),
        unsupported: Regex::new(r"\b(space|feedback|reverb)\s*\(").unwrap(),
        signal_call: Regex::new(&format!(r"\b({})\s*\(", SIGNALS.join("|"))).unwrap(),
        arrow: Regex::new(r"=>").unwrap(),
        numeric: Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap(),
        fraction_tuple: Regex::new(r"\(\s*\d+\s*/\s*\d+\s*,").unwrap(),
        decimal_tuple: Regex::new(r"[A-Za-z_][A-Za-z0-9_]*\(\s*-?\d*\.\d+\s*,").unwrap(),
        pitched: Regex::new(r"\b([A-Ga-g])([#b]?)(\d)\b").unwrap(),
        s_open: Regex::new(r"\bs\s*\(").unwrap(),
        note_open: Regex::new(r"\bnote\s*\(").unwrap(),
        n_open: Regex::new(r"\bn\s*\(").unwrap(),
    })
}

fn head_open(head: &str) -> &'static Regex {
    match head {
        "s" => &res().s_open,
        "note" => &res().note_open,
        _ => &res().n_open,
    }
}

/// Validate pattern code, optionally against a slot type's constraints.
pub fn validate_pattern(code: &str, slot_type: Option<SlotType>) -> Validation {
    let mut v = Validation::ok();

    let len = code.chars().count();
    if len > MAX_PATTERN_LEN {
        v.error(format!(
            "pattern exceeds {} characters (got {})",
            MAX_PATTERN_LEN, len
        ));
        return v;
    }

    if !res().leading_call.is_match(code) {
        v.error("pattern must begin with a function call, e.g. s(\"bd sd\")");
        return v;
    }

    if let Err(msg) = check_balance(code) {
        v.error(msg);
        return v;
    }

    if let Some(m) = res().banned.find(code) {
        v.error(format!("disallowed construct: {}", m.as_str()));
    }
    if res().arrow.is_match(code) {
        v.error("disallowed construct: =>");
    }

    if let Some(c) = res().hard_banned.captures(code) {
        v.error(format!("function {} is not available", &c[1]));
    }
    if let Some(c) = res().unsupported.captures(code) {
        let name = c.get(1).map(|m| m.as_str()).unwrap_or_default();
        let replacement = UNSUPPORTED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| *r)
            .unwrap_or("another function");
        v.error(format!(
            "{} is not supported here; use {} instead",
            name, replacement
        ));
    }
    if let Some(c) = res().signal_call.captures(code) {
        v.error(format!(
            "{} is a signal value and cannot be called; use it bare",
            &c[1]
        ));
    }

    for head in ["s", "note", "n"] {
        check_head_calls(code, head, &mut v);
    }

    if let Some(slot_type) = slot_type {
        check_slot_rules(code, slot_type, &mut v);
    }

    v
}

/// Quote-aware paren balance check. Both quote styles terminate on their
/// own kind; parens inside strings do not count.
fn check_balance(code: &str) -> Result<(), String> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    for ch in code.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err("unbalanced parentheses".to_string());
                    }
                }
                _ => {}
            },
        }
    }
    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    if depth != 0 {
        return Err("unbalanced parentheses".to_string());
    }
    Ok(())
}

/// Find every call of `head` and return the inner argument source spans.
fn call_args(code: &str, head: &str) -> Vec<String> {
    let mut spans = Vec::new();
    for m in head_open(head).find_iter(code) {
        let open = m.end(); // index just past '('
        let mut depth = 1;
        let mut quote: Option<char> = None;
        let mut end = None;
        for (i, ch) in code[open..].char_indices() {
            match quote {
                Some(q) => {
                    if ch == q {
                        quote = None;
                    }
                }
                None => match ch {
                    '"' | '\'' => quote = Some(ch),
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(open + i);
                            break;
                        }
                    }
                    _ => {}
                },
            }
        }
        if let Some(end) = end {
            spans.push(code[open..end].to_string());
        }
    }
    spans
}

/// First top-level argument of an argument-list source.
fn first_arg(args: &str) -> &str {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (i, ch) in args.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                ',' if depth == 0 => return args[..i].trim(),
                _ => {}
            },
        }
    }
    args.trim()
}

/// Rules for the quoted first argument of `s`, `note`, and `n`.
fn check_head_calls(code: &str, head: &str, v: &mut Validation) {
    for args in call_args(code, head) {
        let first = first_arg(&args);
        if first.is_empty() {
            continue;
        }
        if res().numeric.is_match(first) {
            continue;
        }
        let quoted = (first.starts_with('"') && first.ends_with('"') && first.len() >= 2)
            || (first.starts_with('\'') && first.ends_with('\'') && first.len() >= 2);
        if !quoted {
            // Nested calls like s(note(...)) are judged by their own head.
            if res().leading_call.is_match(first) {
                continue;
            }
            v.error(format!(
                "first argument to {} must be quoted: {}(\"...\")",
                head, head
            ));
            continue;
        }
        let inner = &first[1..first.len() - 1];
        check_quoted_content(inner, head, v);
    }
}

/// Mini-notation rules inside a quoted pattern string.
fn check_quoted_content(inner: &str, head: &str, v: &mut Validation) {
    if inner.contains("()") {
        v.error("empty group () in pattern string");
    }

    let mut paren_depth: i32 = 0;
    let mut bracket_depth: i32 = 0;
    let mut comma_reported = false;
    for ch in inner.chars() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            '[' => bracket_depth += 1,
            ']' => bracket_depth -= 1,
            ',' if bracket_depth > 0 && !comma_reported => {
                v.error("comma-separated groups inside [...] are not supported; use spaces");
                comma_reported = true;
            }
            _ => {}
        }
        if paren_depth < 0 {
            break;
        }
    }
    if paren_depth != 0 {
        v.error("unbalanced parentheses inside pattern string");
    }

    if res().fraction_tuple.is_match(inner) {
        v.error("fraction groups with commas like (1/4,1/8) are not supported");
    }
    if head == "s" && res().decimal_tuple.is_match(inner) {
        v.error("decimal tuple forms are not supported inside s(...)");
    }
    if (head == "note" || head == "n") && inner.contains(',') {
        v.error(format!("commas are not allowed inside {}(\"...\")", head));
    }
}

/// MIDI number of a pitched token like `c3` or `F#4` (C4 = 60).
fn midi_of(letter: char, accidental: &str, octave: u32) -> i32 {
    let pc = match letter.to_ascii_lowercase() {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        _ => 11,
    };
    let adjust = match accidental {
        "#" => 1,
        "b" => -1,
        _ => 0,
    };
    (octave as i32 + 1) * 12 + pc + adjust
}

/// Per-slot pitch constraints: drums reject pitched notes outright, the
/// tonal slots warn when notes leave their typical register.
fn check_slot_rules(code: &str, slot_type: SlotType, v: &mut Validation) {
    let (lo, hi, range_name) = match slot_type {
        SlotType::Drums => {
            for head in ["note", "n"] {
                for args in call_args(code, head) {
                    if res().pitched.is_match(&args) {
                        v.error("pitched notes are not allowed in drum slots");
                        return;
                    }
                }
            }
            return;
        }
        SlotType::Bass => (24, 48, "C1-C3"),
        SlotType::Chords => (48, 72, "C3-C5"),
        SlotType::Melody => (60, 96, "C4-C7"),
        SlotType::Wild => return,
    };

    for head in ["note", "n"] {
        for args in call_args(code, head) {
            for cap in res().pitched.captures_iter(&args) {
                let letter = cap[1].chars().next().unwrap_or('c');
                let octave: u32 = cap[3].parse().unwrap_or(0);
                let midi = midi_of(letter, &cap[2], octave);
                if midi < lo || midi > hi {
                    v.warn(format!(
                        "note {} is outside the typical {} range {}",
                        &cap[0],
                        slot_type.as_str(),
                        range_name
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(code: &str) -> Validation {
        validate_pattern(code, None)
    }

    #[test]
    fn accepts_basic_patterns() {
        assert!(ok(r#"s("bd sd")"#).accepted);
        assert!(ok(r#"s("bd*4").gain(0.8)"#).accepted);
        assert!(ok(r#"note("c3 e3 g3").s("sawtooth")"#).accepted);
        assert!(ok(r#"n(0).s("dusty_piano")"#).accepted);
    }

    #[test]
    fn length_boundary_is_560() {
        let exactly = format!(r#"s("{}")"#, "x".repeat(MAX_PATTERN_LEN - 5));
        assert_eq!(exactly.chars().count(), 560);
        assert!(validate_pattern(&exactly, None).accepted);

        let over = format!(r#"s("{}")"#, "x".repeat(MAX_PATTERN_LEN - 4));
        assert_eq!(over.chars().count(), 561);
        assert!(!validate_pattern(&over, None).accepted);
    }

    #[test]
    fn must_begin_with_a_call() {
        assert!(!ok(r#""bd sd""#).accepted);
        assert!(!ok(r#"  s("bd")"#).accepted);
        assert!(!ok("42").accepted);
    }

    #[test]
    fn unbalanced_parens_rejected() {
        assert!(!ok(r#"s("bd""#).accepted);
        assert!(!ok(r#"s("bd"))"#).accepted);
        assert!(!ok(r#"s("bd)"#).accepted); // unterminated via quote
    }

    #[test]
    fn parens_inside_strings_do_not_count() {
        assert!(ok(r#"s("bd(3,8)")"#).accepted);
    }

    #[test]
    fn host_constructs_rejected() {
        assert!(!ok(r#"s("bd").then(x => eval(x))"#).accepted);
        assert!(!ok(r#"s(require('fs'))"#).accepted);
        assert!(!ok(r#"s("bd").constructor"#).accepted);
        assert!(!ok(r#"note(this)"#).accepted);
        assert!(!ok(r#"s(window.location)"#).accepted);
    }

    #[test]
    fn hard_banned_and_unsupported_calls() {
        assert!(!ok(r#"voicings("c e g")"#).accepted);
        let v = ok(r#"s("bd").reverb(0.5)"#);
        assert!(!v.accepted);
        assert!(v.errors[0].contains("room"));
        let v = ok(r#"s("bd").space(0.5)"#);
        assert!(v.errors[0].contains("pan"));
    }

    #[test]
    fn bare_signals_cannot_be_called() {
        assert!(!ok(r#"s("bd").gain(sine(4))"#).accepted);
        assert!(ok(r#"s("bd").gain(sine)"#).accepted);
    }

    #[test]
    fn non_numeric_first_arg_must_be_quoted() {
        assert!(!ok(r#"s(bd sd)"#).accepted);
        assert!(ok(r#"n(3).s("808")"#).accepted);
        assert!(ok(r#"s(note("c3"))"#).accepted);
    }

    #[test]
    fn quoted_content_rules() {
        assert!(!ok(r#"s("bd () sd")"#).accepted);
        assert!(!ok(r#"s("bd (sd")"#).accepted);
        assert!(!ok(r#"s("(1/4,1/8)")"#).accepted);
        assert!(!ok(r#"s("fm(0.5,0.2,0.4,0.7)")"#).accepted);
        assert!(!ok(r#"s("[bd,sd] hh")"#).accepted);
        assert!(!ok(r#"note("c3,e3")"#).accepted);
        assert!(ok(r#"note("c3 e3")"#).accepted);
    }

    #[test]
    fn drums_reject_pitched_notes() {
        let v = validate_pattern(r#"note("c3 e3")"#, Some(SlotType::Drums));
        assert!(!v.accepted);
        let v = validate_pattern(r#"s("bd sd hh")"#, Some(SlotType::Drums));
        assert!(v.accepted);
    }

    #[test]
    fn tonal_slots_warn_outside_register() {
        let v = validate_pattern(r#"note("c5")"#, Some(SlotType::Bass));
        assert!(v.accepted);
        assert_eq!(v.warnings.len(), 1);
        assert!(v.warnings[0].contains("C1-C3"));

        let v = validate_pattern(r#"note("c2 e2 g2")"#, Some(SlotType::Bass));
        assert!(v.accepted);
        assert!(v.warnings.is_empty());

        let v = validate_pattern(r#"note("c8")"#, Some(SlotType::Melody));
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn midi_math() {
        assert_eq!(midi_of('c', "", 4), 60);
        assert_eq!(midi_of('a', "", 4), 69);
        assert_eq!(midi_of('c', "#", 3), 49);
        assert_eq!(midi_of('e', "b", 2), 39);
    }
}
