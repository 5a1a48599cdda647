//! A small principal-management dialect understood by the in-memory backend.
//!
//! Supported statements (keywords are case-insensitive, names may be
//! double-quoted, literals are single-quoted):
//!
//! ```text
//! CREATE USER|ROLE <name> [WITH] [LOGIN] [PASSWORD '<pw>'] [VALID UNTIL '<ts>']
//! ALTER USER|ROLE <name> [WITH] VALID UNTIL '<ts>'
//! GRANT <privilege> [ON <object>] TO <name>
//! REVOKE <privilege> [ON <object>] FROM <name>
//! DROP USER|ROLE [IF EXISTS] <name>
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, StoreError};

/// Privileges a grant may name.
pub const KNOWN_PRIVILEGES: &[&str] = &[
    "ALL", "SELECT", "INSERT", "UPDATE", "DELETE", "TRUNCATE", "REFERENCES", "TRIGGER", "USAGE",
    "CONNECT", "CREATE", "TEMPORARY", "EXECUTE",
];

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CreateUser {
        name: String,
        password: Option<String>,
        valid_until: Option<String>,
    },
    AlterUser {
        name: String,
        valid_until: String,
    },
    Grant {
        privilege: String,
        object: Option<String>,
        name: String,
    },
    Revoke {
        privilege: String,
        object: Option<String>,
        name: String,
    },
    DropUser {
        name: String,
        if_exists: bool,
    },
}

/// A principal held by the in-memory backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalRecord {
    pub password: Option<String>,
    pub valid_until: Option<String>,
    pub grants: BTreeSet<String>,
}

/// All principals known to a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    principals: BTreeMap<String, PrincipalRecord>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&PrincipalRecord> {
        self.principals.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.principals.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.principals.keys().map(String::as_str)
    }

    /// Apply one operation, or leave the registry untouched on error.
    pub fn apply(&mut self, op: &Op) -> Result<()> {
        match op {
            Op::CreateUser {
                name,
                password,
                valid_until,
            } => {
                if self.principals.contains_key(name) {
                    return Err(StoreError::Rejected(format!(
                        "role \"{}\" already exists",
                        name
                    )));
                }
                self.principals.insert(
                    name.clone(),
                    PrincipalRecord {
                        password: password.clone(),
                        valid_until: valid_until.clone(),
                        grants: BTreeSet::new(),
                    },
                );
            }
            Op::AlterUser { name, valid_until } => {
                self.existing_mut(name)?.valid_until = Some(valid_until.clone());
            }
            Op::Grant {
                privilege,
                object,
                name,
            } => {
                let grant = grant_key(privilege, object.as_deref());
                self.existing_mut(name)?.grants.insert(grant);
            }
            Op::Revoke {
                privilege,
                object,
                name,
            } => {
                let grant = grant_key(privilege, object.as_deref());
                let record = self.existing_mut(name)?;
                if privilege == "ALL" {
                    record.grants.clear();
                } else {
                    record.grants.remove(&grant);
                }
            }
            Op::DropUser { name, if_exists } => {
                if self.principals.remove(name).is_none() && !if_exists {
                    return Err(StoreError::Rejected(format!(
                        "role \"{}\" does not exist",
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    fn existing_mut(&mut self, name: &str) -> Result<&mut PrincipalRecord> {
        self.principals
            .get_mut(name)
            .ok_or_else(|| StoreError::Rejected(format!("role \"{}\" does not exist", name)))
    }
}

fn grant_key(privilege: &str, object: Option<&str>) -> String {
    match object {
        Some(object) => format!("{} ON {}", privilege, object),
        None => privilege.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Ident(String),
    Literal(String),
}

impl Token {
    fn keyword(&self) -> Option<String> {
        match self {
            Token::Word(w) => Some(w.to_ascii_uppercase()),
            _ => None,
        }
    }

    fn name(self) -> Option<String> {
        match self {
            Token::Word(w) | Token::Ident(w) => Some(w),
            Token::Literal(_) => None,
        }
    }

    fn literal(self) -> Option<String> {
        match self {
            Token::Literal(l) => Some(l),
            _ => None,
        }
    }
}

fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = sql.trim().trim_end_matches(';').chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '-' && chars.clone().nth(1) == Some('-') {
            for ch in chars.by_ref() {
                if ch == '\n' {
                    break;
                }
            }
            continue;
        }
        if c == '\'' || c == '"' {
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                if ch == c {
                    // A doubled quote is an escaped quote.
                    if chars.peek() == Some(&c) {
                        chars.next();
                        value.push(c);
                        continue;
                    }
                    closed = true;
                    break;
                }
                value.push(ch);
            }
            if !closed {
                return Err(StoreError::Rejected("unterminated quoted string".into()));
            }
            tokens.push(if c == '\'' {
                Token::Literal(value)
            } else {
                Token::Ident(value)
            });
            continue;
        }

        let mut word = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() || ch == '\'' || ch == '"' {
                break;
            }
            word.push(ch);
            chars.next();
        }
        tokens.push(Token::Word(word));
    }

    Ok(tokens)
}

struct Parser {
    tokens: std::vec::IntoIter<Token>,
    peeked: Option<Token>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            peeked: None,
        }
    }

    fn next(&mut self) -> Option<Token> {
        self.peeked.take().or_else(|| self.tokens.next())
    }

    fn peek_keyword(&mut self) -> Option<String> {
        if self.peeked.is_none() {
            self.peeked = self.tokens.next();
        }
        self.peeked.as_ref().and_then(Token::keyword)
    }

    fn accept(&mut self, keyword: &str) -> bool {
        if self.peek_keyword().as_deref() == Some(keyword) {
            self.peeked = None;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, keyword: &str) -> Result<()> {
        if self.accept(keyword) {
            Ok(())
        } else {
            Err(syntax(format!("expected {}", keyword)))
        }
    }

    fn name(&mut self) -> Result<String> {
        self.next()
            .and_then(Token::name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| syntax("expected a role name"))
    }

    fn literal(&mut self) -> Result<String> {
        self.next()
            .and_then(Token::literal)
            .ok_or_else(|| syntax("expected a quoted literal"))
    }

    fn finish(&mut self) -> Result<()> {
        match self.next() {
            None => Ok(()),
            Some(tok) => Err(syntax(format!("unexpected trailing token {:?}", tok))),
        }
    }
}

fn syntax(msg: impl Into<String>) -> StoreError {
    StoreError::Rejected(format!("syntax error: {}", msg.into()))
}

/// Parse a statement of the dialect.
pub fn parse(sql: &str) -> Result<Op> {
    let mut p = Parser::new(tokenize(sql)?);
    let verb = p.peek_keyword().ok_or_else(|| syntax("empty statement"))?;
    p.next();

    let op = match verb.as_str() {
        "CREATE" => {
            principal_kind(&mut p)?;
            let name = p.name()?;
            p.accept("WITH");
            p.accept("LOGIN");
            let mut password = None;
            let mut valid_until = None;
            loop {
                if p.accept("PASSWORD") {
                    password = Some(p.literal()?);
                } else if p.accept("VALID") {
                    p.expect("UNTIL")?;
                    valid_until = Some(p.literal()?);
                } else {
                    break;
                }
            }
            Op::CreateUser {
                name,
                password,
                valid_until,
            }
        }
        "ALTER" => {
            principal_kind(&mut p)?;
            let name = p.name()?;
            p.accept("WITH");
            p.expect("VALID")?;
            p.expect("UNTIL")?;
            Op::AlterUser {
                name,
                valid_until: p.literal()?,
            }
        }
        "GRANT" | "REVOKE" => {
            let privilege = p
                .next()
                .and_then(|t| t.keyword())
                .ok_or_else(|| syntax("expected a privilege"))?;
            if !KNOWN_PRIVILEGES.contains(&privilege.as_str()) {
                return Err(StoreError::Rejected(format!(
                    "unrecognized privilege type \"{}\"",
                    privilege
                )));
            }
            p.accept("PRIVILEGES");
            let object = if p.accept("ON") {
                Some(p.name()?)
            } else {
                None
            };
            let name = if verb == "GRANT" {
                p.expect("TO")?;
                p.name()?
            } else {
                p.expect("FROM")?;
                p.name()?
            };
            if verb == "GRANT" {
                Op::Grant {
                    privilege,
                    object,
                    name,
                }
            } else {
                Op::Revoke {
                    privilege,
                    object,
                    name,
                }
            }
        }
        "DROP" => {
            principal_kind(&mut p)?;
            let if_exists = if p.accept("IF") {
                p.expect("EXISTS")?;
                true
            } else {
                false
            };
            Op::DropUser {
                name: p.name()?,
                if_exists,
            }
        }
        other => {
            return Err(StoreError::Rejected(format!(
                "unsupported statement {}",
                other
            )))
        }
    };

    p.finish()?;
    Ok(op)
}

fn principal_kind(p: &mut Parser) -> Result<()> {
    if p.accept("USER") || p.accept("ROLE") {
        Ok(())
    } else {
        Err(syntax("expected USER or ROLE"))
    }
}
