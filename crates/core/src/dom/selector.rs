//! The CSS subset snapshot queries understand.
//!
//! Type, class, id, universal and attribute selectors (`=`, `*=`, `^=`, `$=`,
//! `~=`, `|=`), the four combinators and comma-separated lists. Pseudo-classes
//! parse but never narrow a match.

use std::iter::Peekable;
use std::str::Chars;

use super::{Document, Node, NodeId};

type Cursor<'s> = Peekable<Chars<'s>>;

/// One complex selector: compounds left to right, joined by combinators.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` to `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    /// `+`
    Adjacent,
    /// `~`
    Sibling,
}

/// Simple selectors that must all hold for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttrTest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrTest {
    pub name: String,
    /// `None` tests presence only.
    pub value: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
    DashPrefix,
}

impl AttrOp {
    fn from_prefix(c: char) -> Option<Self> {
        match c {
            '*' => Some(AttrOp::Contains),
            '^' => Some(AttrOp::Prefix),
            '$' => Some(AttrOp::Suffix),
            '~' => Some(AttrOp::Word),
            '|' => Some(AttrOp::DashPrefix),
            _ => None,
        }
    }

    fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Word => actual.split_whitespace().any(|w| w == expected),
            AttrOp::DashPrefix => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        if !node.is_element() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !node.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.get_attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| node.has_class(c))
            && self.attributes.iter().all(|attr| match node.get_attr(&attr.name) {
                None => false,
                Some(actual) => attr
                    .value
                    .as_ref()
                    .map_or(true, |(op, expected)| op.test(actual, expected)),
            })
    }
}

impl Selector {
    fn matches_at(&self, doc: &Document, id: NodeId, index: usize) -> bool {
        let Some(node) = doc.node(id) else {
            return false;
        };
        if !self.compounds[index].matches(node) {
            return false;
        }
        let Some(left) = index.checked_sub(1) else {
            return true;
        };
        match self.combinators[left] {
            Combinator::Child => node.parent.is_some_and(|p| self.matches_at(doc, p, left)),
            Combinator::Descendant => doc
                .ancestors(id)
                .into_iter()
                .any(|a| self.matches_at(doc, a, left)),
            Combinator::Adjacent => doc
                .previous_siblings(id)
                .first()
                .is_some_and(|&s| self.matches_at(doc, s, left)),
            Combinator::Sibling => doc
                .previous_siblings(id)
                .into_iter()
                .any(|s| self.matches_at(doc, s, left)),
        }
    }
}

/// Whether element `id` of `doc` matches `selector`.
pub fn matches(doc: &Document, id: NodeId, selector: &Selector) -> bool {
    selector.matches_at(doc, id, selector.compounds.len() - 1)
}

/// Parse a comma-separated list. Entries that do not parse are dropped;
/// `None` when nothing is left.
pub fn parse_selector_list(input: &str) -> Option<Vec<Selector>> {
    let selectors: Vec<Selector> = split_list(input)
        .iter()
        .filter_map(|s| parse_selector(s))
        .collect();
    (!selectors.is_empty()).then_some(selectors)
}

/// Split on commas outside brackets, parentheses and quotes.
fn split_list(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') | (None, '(') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') | (None, ')') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, ',') if depth == 0 => out.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    out.push(current);
    out
}

fn parse_selector(input: &str) -> Option<Selector> {
    let mut cursor = input.trim().chars().peekable();
    let mut compounds = vec![parse_compound(&mut cursor)?];
    let mut combinators = Vec::new();

    while let Some(combinator) = parse_combinator(&mut cursor)? {
        combinators.push(combinator);
        compounds.push(parse_compound(&mut cursor)?);
    }
    Some(Selector {
        compounds,
        combinators,
    })
}

/// `Some(None)` at the end of input, `None` on an unexpected character.
fn parse_combinator(cursor: &mut Cursor<'_>) -> Option<Option<Combinator>> {
    let spaced = skip_whitespace(cursor);
    let combinator = match cursor.peek() {
        None => return Some(None),
        Some('>') => Combinator::Child,
        Some('+') => Combinator::Adjacent,
        Some('~') => Combinator::Sibling,
        Some(_) if spaced => return Some(Some(Combinator::Descendant)),
        Some(_) => return None,
    };
    cursor.next();
    skip_whitespace(cursor);
    Some(Some(combinator))
}

fn parse_compound(cursor: &mut Cursor<'_>) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut empty = true;

    while let Some(&c) = cursor.peek() {
        match c {
            '*' => {
                cursor.next();
            }
            '.' => {
                cursor.next();
                compound.classes.push(non_empty(read_ident(cursor))?);
            }
            '#' => {
                cursor.next();
                compound.id = Some(non_empty(read_ident(cursor))?);
            }
            '[' => {
                cursor.next();
                compound.attributes.push(parse_attribute(cursor)?);
            }
            ':' => {
                cursor.next();
                if cursor.peek() == Some(&':') {
                    cursor.next();
                }
                read_ident(cursor);
                if cursor.peek() == Some(&'(') {
                    skip_parenthesised(cursor);
                }
            }
            c if empty && is_ident_char(c) => {
                compound.tag = Some(read_ident(cursor).to_ascii_lowercase());
            }
            _ => break,
        }
        empty = false;
    }
    (!empty).then_some(compound)
}

/// Body of `[...]` after the opening bracket, through the closing one.
fn parse_attribute(cursor: &mut Cursor<'_>) -> Option<AttrTest> {
    skip_whitespace(cursor);
    let name = non_empty(read_ident(cursor))?;
    skip_whitespace(cursor);

    let op = match cursor.next()? {
        ']' => return Some(AttrTest { name, value: None }),
        '=' => AttrOp::Equals,
        c => {
            let op = AttrOp::from_prefix(c)?;
            if cursor.next()? != '=' {
                return None;
            }
            op
        }
    };
    skip_whitespace(cursor);

    let value = match cursor.peek().copied() {
        Some(q @ ('"' | '\'')) => {
            cursor.next();
            let mut value = String::new();
            loop {
                match cursor.next()? {
                    c if c == q => break,
                    c => value.push(c),
                }
            }
            value
        }
        _ => {
            let mut value = String::new();
            while let Some(&c) = cursor.peek() {
                if c == ']' || c.is_whitespace() {
                    break;
                }
                value.push(c);
                cursor.next();
            }
            value
        }
    };

    // Case flags (`i`, `s`) are accepted and ignored.
    skip_whitespace(cursor);
    read_ident(cursor);
    skip_whitespace(cursor);
    (cursor.next()? == ']').then_some(AttrTest {
        name,
        value: Some((op, value)),
    })
}

fn skip_parenthesised(cursor: &mut Cursor<'_>) {
    let mut depth = 0usize;
    for c in cursor.by_ref() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(cursor: &mut Cursor<'_>) -> String {
    let mut ident = String::new();
    while let Some(&c) = cursor.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        cursor.next();
    }
    ident
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Returns whether anything was skipped.
fn skip_whitespace(cursor: &mut Cursor<'_>) -> bool {
    let mut skipped = false;
    while cursor.peek().is_some_and(|c| c.is_whitespace()) {
        cursor.next();
        skipped = true;
    }
    skipped
}
