//! Statement templating.
//!
//! A role stores its statements as one blob of text. [`split_statements`]
//! breaks that blob into individual statements and [`render`] substitutes
//! `{{key}}` placeholders from an explicit [`Bindings`] map. The two steps are
//! independent so each can be tested on its own.
//!
//! Values are inserted verbatim. Only engine-generated values (principal,
//! secret, expiration) are ever bound, never caller free text.

use std::collections::BTreeMap;

use crate::error::TemplateError;

/// Placeholder bound to the generated principal name.
pub const NAME_KEY: &str = "name";
/// Placeholder bound to the generated secret.
pub const PASSWORD_KEY: &str = "password";
/// Placeholder bound to the formatted expiration timestamp.
pub const EXPIRATION_KEY: &str = "expiration";

/// Named substitution values for a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `value`, replacing any earlier binding.
    pub fn bind(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lexer state shared by the splitter and the malformed-statement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
}

impl Lex {
    fn step(self, c: char, next: Option<char>) -> Lex {
        match (self, c) {
            (Lex::Code, '\'') => Lex::SingleQuoted,
            (Lex::Code, '"') => Lex::DoubleQuoted,
            (Lex::Code, '-') if next == Some('-') => Lex::LineComment,
            (Lex::SingleQuoted, '\'') | (Lex::DoubleQuoted, '"') => Lex::Code,
            (Lex::LineComment, '\n') => Lex::Code,
            (state, _) => state,
        }
    }
}

/// Split template text into individual statements.
///
/// Splits on `;` outside quoted literals, quoted identifiers and `--`
/// comments. Segments are trimmed, and segments holding nothing but
/// whitespace or comments are dropped, so a trailing `;` or a closing
/// comment is harmless.
pub fn split_statements(template: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = Lex::Code;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if state == Lex::Code && c == ';' {
            push_trimmed(&mut statements, &current);
            current.clear();
            continue;
        }
        state = state.step(c, chars.peek().copied());
        current.push(c);
    }
    push_trimmed(&mut statements, &current);

    statements
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if has_code(trimmed) {
        out.push(trimmed.to_string());
    }
}

/// True if `segment` has anything besides whitespace outside `--` comments.
fn has_code(segment: &str) -> bool {
    let mut state = Lex::Code;
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        let next = state.step(c, chars.peek().copied());
        if state == Lex::Code && next != Lex::LineComment && !c.is_whitespace() {
            return true;
        }
        state = next;
    }
    false
}

/// Render a single statement.
///
/// Every `{{key}}` whose key is bound is replaced by its value in one pass;
/// substituted text is never re-scanned. Unbound placeholders are left in
/// place.
pub fn render(statement: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    render_statement(0, statement, bindings)
}

/// Split `template` and render every statement in order.
pub fn render_all(template: &str, bindings: &Bindings) -> Result<Vec<String>, TemplateError> {
    let statements = split_statements(template);
    if statements.is_empty() {
        return Err(TemplateError::NoStatements);
    }

    statements
        .iter()
        .enumerate()
        .map(|(index, statement)| render_statement(index, statement, bindings))
        .collect()
}

fn render_statement(
    index: usize,
    statement: &str,
    bindings: &Bindings,
) -> Result<String, TemplateError> {
    let rendered = substitute(statement, bindings);
    check_rendered(index, &rendered)?;
    Ok(rendered)
}

fn substitute(statement: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(statement.len());
    let mut rest = statement;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after_open[..close];
        match bindings.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }
    out.push_str(rest);

    out
}

fn check_rendered(index: usize, rendered: &str) -> Result<(), TemplateError> {
    if rendered.trim().is_empty() {
        return Err(TemplateError::Empty { index });
    }
    if rendered.contains('\0') {
        return Err(TemplateError::Malformed {
            index,
            reason: "contains a NUL byte".into(),
        });
    }

    let mut state = Lex::Code;
    let mut chars = rendered.chars().peekable();
    while let Some(c) = chars.next() {
        state = state.step(c, chars.peek().copied());
    }
    match state {
        Lex::SingleQuoted => Err(TemplateError::Malformed {
            index,
            reason: "unterminated string literal".into(),
        }),
        Lex::DoubleQuoted => Err(TemplateError::Malformed {
            index,
            reason: "unterminated quoted identifier".into(),
        }),
        Lex::Code | Lex::LineComment => Ok(()),
    }
}
