//! Property paths: explicit, runtime descriptors of a property access such as
//! `orders.items.price`.
//!
//! A path is an ordered list of segment names. Every segment but the last
//! names a relation to traverse; the last names the property compared,
//! selected or ordered by.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Ordered, non-empty list of property segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

/// Collection traversal written as `.map(x => x.` once whitespace is stripped
static COLLECTION_TRAVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.map\([A-Za-z0-9_]+=>[A-Za-z0-9_]+").expect("valid regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Whether `text` is a plain SQL identifier
pub(crate) fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

impl PropertyPath {
    /// Build a path from segment names
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::invalid_query("property path must not be empty"));
        }
        if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
            return Err(Error::invalid_query(format!(
                "invalid property path segment '{}'",
                bad
            )));
        }
        Ok(Self { segments })
    }

    /// Parse a dotted path.
    ///
    /// Collection traversal may be spelled `orders.map(o => o.items)` or
    /// `orders[].items`; both become the segments `orders`, `items`.
    ///
    /// # Examples
    /// ```
    /// use linqrs_core::PropertyPath;
    ///
    /// let path = PropertyPath::parse("orders.map(o => o.items).price").unwrap();
    /// assert_eq!(path.to_string(), "orders.items.price");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let flattened = COLLECTION_TRAVERSAL
            .replace_all(&compact, "")
            .replace(')', "")
            .replace("[]", "");
        if flattened.is_empty() {
            return Err(Error::invalid_query("property path must not be empty"));
        }
        Self::new(flattened.split('.'))
    }

    #[doc(hidden)]
    pub fn from_idents(idents: &[&str]) -> Self {
        Self {
            segments: idents.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Relation segments traversed before the leaf
    pub fn relations(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The final property name
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for PropertyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Allow string literals for paths; a malformed literal is a programming error
impl From<&str> for PropertyPath {
    fn from(text: &str) -> Self {
        match Self::parse(text) {
            Ok(path) => path,
            Err(err) => panic!("Invalid property path '{}': {}", text, err),
        }
    }
}

impl From<String> for PropertyPath {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

/// Build a [`PropertyPath`] from bare identifiers.
///
/// ```
/// use linqrs_core::path;
///
/// let p = path!(customer.address.city);
/// assert_eq!(p.leaf(), "city");
/// ```
#[macro_export]
macro_rules! path {
    ($first:ident $(. $rest:ident)*) => {
        $crate::PropertyPath::from_idents(&[stringify!($first) $(, stringify!($rest))*])
    };
}

/// What a join or include call navigates to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// A relation path; every segment is joined in turn
    Path(PropertyPath),
    /// A relation name used verbatim
    Raw(String),
}

impl JoinTarget {
    pub(crate) fn segments(&self) -> Vec<&str> {
        match self {
            JoinTarget::Path(path) => path.segments().iter().map(String::as_str).collect(),
            JoinTarget::Raw(name) => vec![name.as_str()],
        }
    }
}

impl From<PropertyPath> for JoinTarget {
    fn from(path: PropertyPath) -> Self {
        JoinTarget::Path(path)
    }
}

impl From<&str> for JoinTarget {
    fn from(name: &str) -> Self {
        JoinTarget::Raw(name.to_string())
    }
}

impl From<String> for JoinTarget {
    fn from(name: String) -> Self {
        JoinTarget::Raw(name)
    }
}
