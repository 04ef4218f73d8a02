//! A small CSS selector model covering what the plugin emits: comma-separated
//! compound selectors built from a tag, classes and attribute conditions.
//!
//! Combinators and pseudo-classes are not supported; the plugin never needs
//! them and the parser reports them as unexpected input.

use std::fmt;
use thiserror::Error;

/// Errors raised while parsing a selector string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty compound selector at position {0}")]
    EmptyCompound(usize),
    #[error("unexpected character '{ch}' at position {pos}")]
    Unexpected { ch: char, pos: usize },
    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),
    #[error("unclosed attribute selector starting at position {0}")]
    UnclosedAttribute(usize),
    #[error("unexpected end of selector")]
    UnexpectedEnd,
}

/// Comparison performed by an attribute selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    /// `[attr]`
    Exists,
    /// `[attr="v"]`
    Equals,
    /// `[attr^="v"]`
    Prefix,
    /// `[attr$="v"]`
    Suffix,
    /// `[attr*="v"]`
    Substring,
}

impl AttrOperator {
    fn as_str(self) -> &'static str {
        match self {
            AttrOperator::Exists => "",
            AttrOperator::Equals => "=",
            AttrOperator::Prefix => "^=",
            AttrOperator::Suffix => "$=",
            AttrOperator::Substring => "*=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: AttrOperator,
    pub value: String,
    /// The ` i` flag: compare ASCII letters case-insensitively.
    pub case_insensitive: bool,
}

impl AttributeSelector {
    /// Tests an attribute value against this condition.
    ///
    /// As in CSS, `^=`, `$=` and `*=` with an empty value never match.
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };

        if self.operator == AttrOperator::Exists {
            return true;
        }

        let (actual, expected) = if self.case_insensitive {
            (actual.to_ascii_lowercase(), self.value.to_ascii_lowercase())
        } else {
            (actual.to_string(), self.value.clone())
        };

        match self.operator {
            AttrOperator::Exists => true,
            AttrOperator::Equals => actual == expected,
            AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOperator::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

impl fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == AttrOperator::Exists {
            return write!(f, "[{}]", self.name);
        }

        write!(f, "[{}{}\"", self.name, self.operator.as_str())?;
        for ch in self.value.chars() {
            if ch == '"' || ch == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{ch}")?;
        }
        write!(f, "\"")?;
        if self.case_insensitive {
            write!(f, " i")?;
        }
        write!(f, "]")
    }
}

/// Anything a compound selector can be evaluated against.
pub trait SelectorTarget {
    fn tag_name(&self) -> &str;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// A tag and any number of classes and attribute conditions, all of which
/// must hold for the same element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
}

impl CompoundSelector {
    pub fn matches(&self, target: &dyn SelectorTarget) -> bool {
        if let Some(tag) = &self.tag
            && !tag.eq_ignore_ascii_case(target.tag_name())
        {
            return false;
        }

        self.classes.iter().all(|class| target.has_class(class))
            && self
                .attributes
                .iter()
                .all(|attr| attr.matches(target.attribute(&attr.name)))
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{tag}")?,
            None if self.classes.is_empty() && self.attributes.is_empty() => write!(f, "*")?,
            None => {}
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attributes {
            write!(f, "{attr}")?;
        }
        Ok(())
    }
}

/// A comma-separated group of compound selectors. An element matches when
/// any member matches; the empty list matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList(Vec<CompoundSelector>);

impl SelectorList {
    pub fn new(compounds: Vec<CompoundSelector>) -> Self {
        Self(compounds)
    }

    pub fn compounds(&self) -> &[CompoundSelector] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends every member of `other` to this list.
    pub fn extend(&mut self, other: SelectorList) {
        self.0.extend(other.0);
    }

    pub fn matches(&self, target: &dyn SelectorTarget) -> bool {
        self.0.iter().any(|compound| compound.matches(target))
    }

    /// Parses a selector string. Blank input yields the empty list.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse_list()
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::Unexpected { ch, pos: self.pos },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut compounds = Vec::new();

        self.skip_whitespace();
        if self.peek().is_none() {
            return Ok(SelectorList::default());
        }

        loop {
            compounds.push(self.parse_compound()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                Some(_) => return Err(self.unexpected()),
            }
        }

        Ok(SelectorList(compounds))
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();
        let mut universal = false;

        if self.peek() == Some('*') {
            self.pos += 1;
            universal = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?);
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => compound.attributes.push(self.parse_attribute()?),
                _ => break,
            }
        }

        if !universal && compound == CompoundSelector::default() {
            return match self.peek() {
                None => Err(SelectorError::UnexpectedEnd),
                Some(',') => Err(SelectorError::EmptyCompound(start)),
                Some(_) => Err(self.unexpected()),
            };
        }

        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.unexpected());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        let open = self.pos;
        self.pos += 1; // '['
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();

        let operator = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    operator: AttrOperator::Exists,
                    value: String::new(),
                    case_insensitive: false,
                });
            }
            Some('=') => {
                self.pos += 1;
                AttrOperator::Equals
            }
            Some(op @ ('^' | '$' | '*')) if self.chars.get(self.pos + 1) == Some(&'=') => {
                self.pos += 2;
                match op {
                    '^' => AttrOperator::Prefix,
                    '$' => AttrOperator::Suffix,
                    _ => AttrOperator::Substring,
                }
            }
            None => return Err(SelectorError::UnclosedAttribute(open)),
            Some(_) => return Err(self.unexpected()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote)?,
            None => return Err(SelectorError::UnclosedAttribute(open)),
            Some(_) => self.parse_ident()?,
        };

        self.skip_whitespace();
        let mut case_insensitive = false;
        match self.peek() {
            Some('i' | 'I') => {
                case_insensitive = true;
                self.pos += 1;
            }
            Some('s' | 'S') => self.pos += 1,
            _ => {}
        }

        self.skip_whitespace();
        match self.peek() {
            Some(']') => self.pos += 1,
            None => return Err(SelectorError::UnclosedAttribute(open)),
            Some(_) => return Err(self.unexpected()),
        }

        Ok(AttributeSelector {
            name,
            operator,
            value,
            case_insensitive,
        })
    }

    fn parse_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(SelectorError::UnterminatedString(start)),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self
                        .peek()
                        .ok_or(SelectorError::UnterminatedString(start))?;
                    value.push(escaped);
                    self.pos += 1;
                }
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some(ch) => {
                    value.push(ch);
                    self.pos += 1;
                }
            }
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}
