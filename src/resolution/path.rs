//! # Value Paths
//!
//! Parser for the addressing language used by parameter mappings:
//!
//! ```text
//! path    := segment ("." segment)*
//! segment := name ("[" digits "]")*
//! name    := one or more characters other than '.', '[' and ']'
//! ```
//!
//! The first segment names the root: `initial` for the run's initial parameters,
//! anything else is a step id whose recorded result becomes the root. Every later
//! name is a key lookup and every bracketed number is a positional lookup.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Root segment that addresses the run's initial parameters
pub const INITIAL_ROOT: &str = "initial";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathRoot {
    Initial,
    Step(String),
}

impl PathRoot {
    /// Step id this root refers to, if it is not `initial`
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::Initial => None,
            Self::Step(id) => Some(id),
        }
    }
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str(INITIAL_ROOT),
            Self::Step(id) => f.write_str(id),
        }
    }
}

/// One access token applied after the root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathSyntaxError {
    #[error("Path is empty")]
    Empty,
    #[error("Empty segment at position {position} in '{path}'")]
    EmptySegment { path: String, position: usize },
    #[error("Unterminated index starting at position {position} in '{path}'")]
    UnterminatedIndex { path: String, position: usize },
    #[error("Invalid index '[{index}]' in '{path}'")]
    InvalidIndex { path: String, index: String },
    #[error("Unexpected character '{found}' at position {position} in '{path}'")]
    UnexpectedCharacter {
        path: String,
        position: usize,
        found: char,
    },
}

/// A parsed address such as `dns_records.results[0].records[0]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValuePath {
    root: PathRoot,
    accessors: Vec<Accessor>,
}

impl ValuePath {
    pub fn parse(input: &str) -> Result<Self, PathSyntaxError> {
        if input.is_empty() {
            return Err(PathSyntaxError::Empty);
        }

        let mut tokens = Parser::new(input).parse()?.into_iter();

        let root = match tokens.next() {
            Some(Accessor::Key(name)) if name == INITIAL_ROOT => PathRoot::Initial,
            Some(Accessor::Key(name)) => PathRoot::Step(name),
            // The parser always starts with a name
            _ => return Err(PathSyntaxError::Empty),
        };

        Ok(Self {
            root,
            accessors: tokens.collect(),
        })
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// Render the path up to (but excluding) accessor `depth`
    pub(crate) fn prefix(&self, depth: usize) -> String {
        let mut rendered = self.root.to_string();
        for accessor in self.accessors.iter().take(depth) {
            push_accessor(&mut rendered, accessor);
        }
        rendered
    }
}

fn push_accessor(out: &mut String, accessor: &Accessor) {
    match accessor {
        Accessor::Key(key) => {
            out.push('.');
            out.push_str(key);
        }
        Accessor::Index(index) => {
            out.push('[');
            out.push_str(&index.to_string());
            out.push(']');
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.accessors.len()))
    }
}

impl FromStr for ValuePath {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ValuePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn parse(mut self) -> Result<Vec<Accessor>, PathSyntaxError> {
        let mut tokens = Vec::new();

        loop {
            tokens.push(Accessor::Key(self.name()?));

            while self.peek() == Some(b'[') {
                tokens.push(Accessor::Index(self.index()?));
            }

            match self.peek() {
                None => return Ok(tokens),
                Some(b'.') => self.pos += 1,
                Some(_) => {
                    let found = self.input[self.pos..].chars().next().unwrap_or(']');
                    return Err(PathSyntaxError::UnexpectedCharacter {
                        path: self.input.to_string(),
                        position: self.pos,
                        found,
                    });
                }
            }
        }
    }

    fn name(&mut self) -> Result<String, PathSyntaxError> {
        let start = self.pos;
        // Delimiters are ASCII, so byte positions always land on char boundaries
        while let Some(byte) = self.peek() {
            if matches!(byte, b'.' | b'[' | b']') {
                break;
            }
            self.pos += 1;
        }

        if self.pos == start {
            return Err(PathSyntaxError::EmptySegment {
                path: self.input.to_string(),
                position: start,
            });
        }

        Ok(self.input[start..self.pos].to_string())
    }

    fn index(&mut self) -> Result<usize, PathSyntaxError> {
        let open = self.pos;
        self.pos += 1;

        let Some(len) = self.input[self.pos..].find(']') else {
            return Err(PathSyntaxError::UnterminatedIndex {
                path: self.input.to_string(),
                position: open,
            });
        };

        let digits = &self.input[self.pos..self.pos + len];
        self.pos += len + 1;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PathSyntaxError::InvalidIndex {
                path: self.input.to_string(),
                index: digits.to_string(),
            });
        }

        digits
            .parse::<usize>()
            .map_err(|_| PathSyntaxError::InvalidIndex {
                path: self.input.to_string(),
                index: digits.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_initial_root() {
        let path = ValuePath::parse("initial.x").unwrap();
        assert_eq!(path.root(), &PathRoot::Initial);
        assert_eq!(path.accessors(), &[Accessor::Key("x".to_string())]);
    }

    #[test]
    fn test_parse_nested_indices() {
        let path = ValuePath::parse("dns_records.results[0].records[12]").unwrap();
        assert_eq!(path.root(), &PathRoot::Step("dns_records".to_string()));
        assert_eq!(
            path.accessors(),
            &[
                Accessor::Key("results".to_string()),
                Accessor::Index(0),
                Accessor::Key("records".to_string()),
                Accessor::Index(12),
            ]
        );
        assert_eq!(path.to_string(), "dns_records.results[0].records[12]");
    }

    #[test]
    fn test_parse_root_only_and_root_index() {
        let path = ValuePath::parse("whois").unwrap();
        assert!(path.accessors().is_empty());

        let path = ValuePath::parse("scan[1][2]").unwrap();
        assert_eq!(path.root().step_id(), Some("scan"));
        assert_eq!(path.accessors(), &[Accessor::Index(1), Accessor::Index(2)]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ValuePath::parse(""), Err(PathSyntaxError::Empty));
        assert!(matches!(
            ValuePath::parse("a..b"),
            Err(PathSyntaxError::EmptySegment { position: 2, .. })
        ));
        assert!(matches!(
            ValuePath::parse("a.b."),
            Err(PathSyntaxError::EmptySegment { position: 4, .. })
        ));
        assert!(matches!(
            ValuePath::parse("a.b[0"),
            Err(PathSyntaxError::UnterminatedIndex { position: 3, .. })
        ));
        assert!(matches!(
            ValuePath::parse("a.b[-1]"),
            Err(PathSyntaxError::InvalidIndex { .. })
        ));
        assert!(matches!(
            ValuePath::parse("a.b[]"),
            Err(PathSyntaxError::InvalidIndex { .. })
        ));
        assert!(matches!(
            ValuePath::parse("a.b[0]c"),
            Err(PathSyntaxError::UnexpectedCharacter { found: 'c', .. })
        ));
        assert!(matches!(
            ValuePath::parse("a]"),
            Err(PathSyntaxError::UnexpectedCharacter { found: ']', .. })
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let path: ValuePath = serde_json::from_str("\"A.value\"").unwrap();
        assert_eq!(path.root().step_id(), Some("A"));
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"A.value\"");

        assert!(serde_json::from_str::<ValuePath>("\"A..value\"").is_err());
    }
}
