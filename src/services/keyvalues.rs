//! Reader for Valve's KeyValues text format (the `.vdf` files Steam writes).
//!
//! Only what the save-file reader needs: quoted and bare tokens, nested
//! objects, `//` comments and `[$PLATFORM]` conditionals (skipped). Object key
//! order is preserved. Repeated sections in the same object are merged into
//! one, member by member. A repeated string key becomes a
//! [`KvValue::Sequence`] holding every value in file order.
//!
//! ```ignore
//! let root = keyvalues::parse(r#""Store" { "Name" "Invoker" }"#)?;
//! let name = root.get("Store").and_then(KvValue::as_object)
//!     .and_then(|s| s.get("Name")).and_then(KvValue::as_str);
//! assert_eq!(name, Some("Invoker"));
//! ```

use indexmap::IndexMap;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// An object: ordered key -> value map.
pub type KvObject = IndexMap<String, KvValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvValue {
    Str(String),
    Object(KvObject),
    /// All values of a key that was repeated within one object.
    Sequence(Vec<KvValue>),
}

impl KvValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KvValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&KvObject> {
        match self {
            KvValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[KvValue]> {
        match self {
            KvValue::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyValuesError {
    #[error("Unterminated string starting on line {line}")]
    UnterminatedString { line: usize },

    #[error("Unexpected '{{' on line {line}")]
    UnexpectedOpen { line: usize },

    #[error("Unexpected '}}' on line {line}")]
    UnexpectedClose { line: usize },

    #[error("Key \"{key}\" on line {line} has no value")]
    MissingValue { key: String, line: usize },

    #[error("Object opened on line {line} is never closed")]
    UnterminatedObject { line: usize },
}

/// Look up `key`, falling back to an ASCII case-insensitive match.
///
/// Steam is not consistent about key casing (`Name` vs `name`).
pub fn lookup<'a>(object: &'a KvObject, key: &str) -> Option<&'a KvValue> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Parse a KeyValues document into its top-level object.
pub fn parse(input: &str) -> Result<KvObject, KeyValuesError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lexer = Lexer::new(input);
    parse_object(&mut lexer, None)
}

#[derive(Debug, PartialEq)]
enum Token {
    Str(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Next token and the line it started on.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, KeyValuesError> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok(None);
            };
            let line = self.line;

            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '{' => {
                    self.bump();
                    return Ok(Some((Token::Open, line)));
                }
                '}' => {
                    self.bump();
                    return Ok(Some((Token::Close, line)));
                }
                '"' => {
                    self.bump();
                    return self.quoted(line).map(|s| Some((Token::Str(s), line)));
                }
                '[' => {
                    // [$WIN32] style conditional
                    while let Some(c) = self.bump() {
                        if c == ']' || c == '\n' {
                            break;
                        }
                    }
                }
                '/' => {
                    self.bump();
                    if self.chars.peek() == Some(&'/') {
                        self.skip_line();
                    } else {
                        let word = self.bare(String::from("/"));
                        return Ok(Some((Token::Str(word), line)));
                    }
                }
                _ => {
                    let word = self.bare(String::new());
                    return Ok(Some((Token::Str(word), line)));
                }
            }
        }
    }

    fn quoted(&mut self, start_line: usize) -> Result<String, KeyValuesError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(KeyValuesError::UnterminatedString { line: start_line }),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(KeyValuesError::UnterminatedString { line: start_line }),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn bare(&mut self, mut out: String) -> String {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c == '{' || c == '}' || c == '"' {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }
}

/// Parse object members until the matching `}` (or EOF for the top level,
/// where `opened_on` is `None`).
fn parse_object(
    lexer: &mut Lexer<'_>,
    opened_on: Option<usize>,
) -> Result<KvObject, KeyValuesError> {
    let mut object = KvObject::new();

    loop {
        match lexer.next_token()? {
            None => {
                return match opened_on {
                    None => Ok(object),
                    Some(line) => Err(KeyValuesError::UnterminatedObject { line }),
                };
            }
            Some((Token::Close, line)) => {
                return match opened_on {
                    None => Err(KeyValuesError::UnexpectedClose { line }),
                    Some(_) => Ok(object),
                };
            }
            Some((Token::Open, line)) => return Err(KeyValuesError::UnexpectedOpen { line }),
            Some((Token::Str(key), key_line)) => {
                let value = match lexer.next_token()? {
                    Some((Token::Str(s), _)) => KvValue::Str(s),
                    Some((Token::Open, line)) => KvValue::Object(parse_object(lexer, Some(line))?),
                    Some((Token::Close, _)) | None => {
                        return Err(KeyValuesError::MissingValue {
                            key,
                            line: key_line,
                        });
                    }
                };
                insert(&mut object, key, value);
            }
        }
    }
}

fn insert(object: &mut KvObject, key: String, value: KvValue) {
    let Some(existing) = object.get_mut(&key) else {
        object.insert(key, value);
        return;
    };

    match (existing, value) {
        (KvValue::Object(current), KvValue::Object(incoming)) => {
            for (k, v) in incoming {
                insert(current, k, v);
            }
        }
        (KvValue::Sequence(items), KvValue::Str(s)) => items.push(KvValue::Str(s)),
        (existing, KvValue::Str(s)) if matches!(existing, KvValue::Str(_)) => {
            let first = std::mem::replace(existing, KvValue::Sequence(Vec::with_capacity(2)));
            *existing = KvValue::Sequence(vec![first, KvValue::Str(s)]);
        }
        // mixed kinds: the later value wins
        (existing, value) => *existing = value,
    }
}
