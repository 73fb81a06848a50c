//! Slash-delimited paths into the state tree.

use std::fmt;

/// A normalized path into a state tree.
///
/// Parsing strips leading and trailing slashes, collapses runs of interior
/// slashes and splits the remainder into non-empty fragments. Any string is
/// accepted; there is no validation of fragment contents because paths double
/// as regular-expression sources when used to subscribe.
///
/// A path with no fragments denotes the root of the tree.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StorePath {
    pub fragments: Vec<String>,
}

impl StorePath {
    /// Parse and normalize a path string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pathstate_core_store::StorePath;
    ///
    /// let path = StorePath::parse("//users/123//name/");
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path.to_string(), "users/123/name");
    ///
    /// assert!(StorePath::parse("/").is_root());
    /// ```
    pub fn parse(s: &str) -> Self {
        StorePath {
            fragments: s
                .split('/')
                .filter(|f| !f.is_empty())
                .map(|f| f.to_string())
                .collect(),
        }
    }

    /// The root path.
    pub fn root() -> Self {
        StorePath::default()
    }

    /// Check if this path is the root (no fragments).
    pub fn is_root(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Get the number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if this path has no fragments. Same as [`StorePath::is_root`].
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Iterate over fragments.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.fragments.iter()
    }

    /// Split into the fragments leading to the parent and the final fragment.
    ///
    /// Returns `None` for the root.
    pub fn split_last(&self) -> Option<(&String, &[String])> {
        self.fragments.split_last()
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &StorePath) -> StorePath {
        let mut fragments = self.fragments.clone();
        fragments.extend(other.fragments.iter().cloned());
        StorePath { fragments }
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &StorePath) -> bool {
        prefix.fragments.len() <= self.fragments.len()
            && prefix.fragments == self.fragments[..prefix.fragments.len()]
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fragments.join("/"))
    }
}

impl From<&str> for StorePath {
    fn from(s: &str) -> Self {
        StorePath::parse(s)
    }
}

impl std::ops::Index<usize> for StorePath {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.fragments[i]
    }
}

/// Normalize a path string without splitting it into fragments.
///
/// This is the form used for committed paths and subscription patterns.
pub fn normalize(s: &str) -> String {
    StorePath::parse(s).to_string()
}
