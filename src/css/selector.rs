//! Selector model: a declaration splits into comma-separated selectors, each
//! selector into combinator-separated parts, and each part into fragments
//! (`div`, `.class`, `#id`, `[attr="x"]`, `:hover`, `::before`).
//!
//! Every level is parsed lazily on first access.

use std::cell::OnceCell;
use std::fmt;

use super::scanner::strip_comments;

/// Index just past the group opened at `b[open]`, skipping quoted strings.
fn skip_pair(b: &[u8], open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < b.len() {
        match b[i] {
            c if c == open_ch => depth += 1,
            c if c == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            q @ (b'"' | b'\'') => {
                i += 1;
                while i < b.len() && b[i] != q {
                    if b[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_separator(b: u8) -> bool {
    matches!(b, b'>' | b'+' | b'~') || b.is_ascii_whitespace()
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_declaration(decl: &str) -> Vec<Selector> {
    let b = decl.as_bytes();
    let mut out = Vec::new();
    let mut push = |text: &str| {
        if !text.trim().is_empty() {
            out.push(Selector::new(text));
        }
    };

    let mut start = 0;
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'(' => i = skip_pair(b, i, b'(', b')').unwrap_or(i + 1),
            b'[' => i = skip_pair(b, i, b'[', b']').unwrap_or(i + 1),
            b',' => {
                push(&decl[start..i]);
                i += 1;
                start = i;
            }
            q @ (b'"' | b'\'') => {
                i += 1;
                while i < b.len() && b[i] != q {
                    i += if b[i] == b'\\' { 2 } else { 1 };
                }
                i = (i + 1).min(b.len());
            }
            _ => i += 1,
        }
    }
    push(&decl[start..]);
    out
}

fn split_parts(sel: &str) -> Vec<SelectorPart> {
    let b = sel.as_bytes();
    let mut parts = Vec::new();
    let mut op = String::new();
    let mut start = 0;
    let mut i = 0;

    while i < b.len() {
        match b[i] {
            c if is_separator(c) => {
                if start < i {
                    parts.push(SelectorPart::new(&sel[start..i], &op));
                }
                let from = i;
                while i < b.len() && is_separator(b[i]) {
                    i += 1;
                }
                op = sel[from..i].to_owned();
                start = i;
            }
            b'[' | b'(' => {
                let close = if b[i] == b'[' { b']' } else { b')' };
                match skip_pair(b, i, b[i], close) {
                    Some(end) => i = end,
                    None => break,
                }
            }
            _ => i += 1,
        }
    }
    if start < b.len() {
        parts.push(SelectorPart::new(&sel[start..], &op));
    }
    parts
}

/// `[ name = 'value' ]` becomes `[name="value"]`.
fn normalize_attribute(attr: &str) -> String {
    let inner = attr
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(attr)
        .trim();
    let b = inner.as_bytes();

    let name_end = b.iter().position(|&c| !is_word(c)).unwrap_or(b.len());
    let rest = inner[name_end..].trim_start();
    let op_len = match rest.as_bytes() {
        [b'=', ..] => 1,
        [c, b'=', ..] if !is_word(*c) => 2,
        _ => 0,
    };
    if name_end == 0 || op_len == 0 {
        return format!("[{inner}]");
    }

    let value = rest[op_len..].trim_start();
    let unquoted = match value.as_bytes() {
        [q @ (b'"' | b'\''), .., last] if last == q && value.len() > 1 => &value[1..value.len() - 1],
        _ => value,
    };
    let value = if unquoted.is_empty() || unquoted.contains(['"', ' ', '\t']) {
        value.to_owned()
    } else {
        format!("\"{unquoted}\"")
    };
    format!("[{}{}{value}]", &inner[..name_end], &rest[..op_len])
}

fn unify_part(part: &str) -> String {
    let b = part.as_bytes();
    let mut out = String::with_capacity(part.len());
    let mut i = 0;
    let mut copied = 0;
    while i < b.len() {
        if b[i] == b'[' {
            if let Some(end) = skip_pair(b, i, b'[', b']') {
                out.push_str(&part[copied..i]);
                out.push_str(&normalize_attribute(&part[i..end]));
                i = end;
                copied = end;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&part[copied..]);
    out
}

fn parse_part(part: &str) -> Vec<String> {
    let part = unify_part(part);
    let b = part.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < b.len() {
        match b[i] {
            b'.' | b'#' | b'%' | b':' => {
                out.push(part[start..i].to_owned());
                start = i;
                i += if b[i] == b':' && b.get(i + 1) == Some(&b':') { 2 } else { 1 };
            }
            b'[' => {
                out.push(part[start..i].to_owned());
                let Some(end) = skip_pair(b, i, b'[', b']') else {
                    start = i;
                    break;
                };
                out.push(part[i..end].to_owned());
                start = end;
                i = end;
            }
            b'(' => match skip_pair(b, i, b'(', b')') {
                Some(end) => i = end,
                None => break,
            },
            _ => i += 1,
        }
    }
    out.push(part[start..].to_owned());
    out.retain(|f| !f.is_empty());
    out
}

/// Collapse whitespace runs; a lone space is the descendant combinator.
fn normalize_operator(op: &str) -> String {
    let mut out = String::with_capacity(op.len());
    for ch in op.chars() {
        if !ch.is_whitespace() {
            out.push(ch);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if out == " " {
        out
    } else {
        out.trim().to_owned()
    }
}

// ---------------------------------------------------------------------------
// SelectorDeclaration
// ---------------------------------------------------------------------------

/// A comma-separated selector list such as `body, div.content`.
///
/// Comments are removed and whitespace runs collapsed on construction.
#[derive(Debug, Clone, Default)]
pub struct SelectorDeclaration {
    decl: String,
    list: OnceCell<Vec<Selector>>,
}

impl SelectorDeclaration {
    pub fn new(raw: &str) -> Self {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let decl = strip_comments(&normalized, None).unwrap_or(normalized);
        Self {
            decl,
            list: OnceCell::new(),
        }
    }

    pub fn selectors(&self) -> &[Selector] {
        self.list.get_or_init(|| parse_declaration(&self.decl))
    }

    /// Number of selectors.
    pub fn len(&self) -> usize {
        self.selectors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors().is_empty()
    }

    /// Append a selector to the list.
    pub fn add(&mut self, selector: &str) {
        let mut list = self
            .list
            .take()
            .unwrap_or_else(|| parse_declaration(&self.decl));
        list.push(Selector::new(selector));
        self.list = OnceCell::from(list);
    }
}

impl fmt::Display for SelectorDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// One selector of a declaration, e.g. `#nav > li a`.
#[derive(Debug, Clone)]
pub struct Selector {
    text: String,
    parts: OnceCell<Vec<SelectorPart>>,
}

impl Selector {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.trim().to_owned(),
            parts: OnceCell::new(),
        }
    }

    /// Combinator-separated parts: `#nav > li a` has `#nav`, `li` and `a`.
    pub fn parts(&self) -> &[SelectorPart] {
        self.parts.get_or_init(|| split_parts(&self.text))
    }

    /// Fragments of every part with the combinators in between.
    /// Concatenated, they spell the selector.
    pub fn fragments(&self) -> Vec<String> {
        let mut out = Vec::new();
        for part in self.parts() {
            match part.op() {
                "" => {}
                " " => out.push(" ".to_owned()),
                op => out.push(format!(" {op} ")),
            }
            out.extend(part.fragments().iter().cloned());
        }
        out
    }

    /// Drop every part whose value is `value`, optionally only those preceded by `op`.
    pub fn remove_part(&mut self, value: &str, op: Option<&str>) {
        let parts: Vec<SelectorPart> = self
            .parts()
            .iter()
            .filter(|p| !(p.value() == value && op.is_none_or(|op| p.op() == op)))
            .cloned()
            .collect();
        self.parts = OnceCell::from(parts);
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .parts()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(text.trim())
    }
}

// ---------------------------------------------------------------------------
// SelectorPart
// ---------------------------------------------------------------------------

/// A compound selector with the combinator in front of it,
/// e.g. `div[data-info]:hover` after `>`.
#[derive(Debug, Clone)]
pub struct SelectorPart {
    op: String,
    text: String,
    fragments: OnceCell<Vec<String>>,
}

impl SelectorPart {
    pub fn new(text: &str, op: &str) -> Self {
        Self {
            op: normalize_operator(op),
            text: text.trim().to_owned(),
            fragments: OnceCell::new(),
        }
    }

    /// The preceding combinator: `""`, `" "`, `">"`, `"+"` or `"~"`.
    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn fragments(&self) -> &[String] {
        self.fragments.get_or_init(|| parse_part(&self.text))
    }

    fn set_fragments(&mut self, fragments: Vec<String>) {
        self.fragments = OnceCell::from(fragments);
    }

    /// The part without its combinator.
    pub fn value(&self) -> String {
        self.fragments().concat()
    }

    /// The part without the fragments matching `skip`.
    pub fn value_without(&self, skip: impl Fn(&str) -> bool) -> String {
        self.fragments()
            .iter()
            .filter(|f| !skip(f))
            .map(String::as_str)
            .collect()
    }

    pub fn equals(&self, other: &SelectorPart) -> bool {
        self.op == other.op && self.value() == other.value()
    }

    /// Move pseudo-classes, then pseudo-elements, to the end.
    pub fn order(&mut self) -> &mut Self {
        let mut rest = Vec::new();
        let mut classes = Vec::new();
        let mut elements = Vec::new();
        for fragment in self.fragments() {
            if fragment.starts_with("::") {
                elements.push(fragment.clone());
            } else if fragment.starts_with(':') {
                classes.push(fragment.clone());
            } else {
                rest.push(fragment.clone());
            }
        }
        rest.extend(classes);
        rest.extend(elements);
        self.set_fragments(rest);
        self
    }

    /// Remove the fragments that also appear in `other`. Returns the index of
    /// the last removal, a natural place to insert replacements.
    pub fn remove_fragments(&mut self, other: &SelectorPart) -> Option<usize> {
        let mut fragments = self.fragments().to_vec();
        let mut removed = None;
        for fragment in other.fragments().iter().rev() {
            if let Some(ix) = fragments.iter().position(|f| f == fragment) {
                fragments.remove(ix);
                removed = Some(ix);
            }
        }
        self.set_fragments(fragments);
        removed
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.op.as_str() {
            "" | " " => format!("{}{}", self.op, self.value()),
            op => format!("{op} {}", self.value()),
        };
        f.write_str(text.trim())
    }
}
