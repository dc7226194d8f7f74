//! Named codeset references

use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::ops::BitOr;

/// One or more codeset names; an event matches if it belongs to any of them.
///
/// Rules often accept alternative code families for one clinical concept,
/// e.g. `CodesetRef::from("CtColonography") | "CMS130v6CtColonography"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawCodesetRef", into = "RawCodesetRef")]
pub struct CodesetRef {
    names: SmallVec<[String; 2]>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCodesetRef {
    One(String),
    Many(Vec<String>),
}

impl From<RawCodesetRef> for CodesetRef {
    fn from(raw: RawCodesetRef) -> Self {
        match raw {
            RawCodesetRef::One(name) => Self::new(name),
            RawCodesetRef::Many(names) => names.into_iter().collect(),
        }
    }
}

impl From<CodesetRef> for RawCodesetRef {
    fn from(codesets: CodesetRef) -> Self {
        if codesets.names.len() == 1 {
            RawCodesetRef::One(codesets.names.into_iter().next().unwrap_or_default())
        } else {
            RawCodesetRef::Many(codesets.names.into_vec())
        }
    }
}

impl CodesetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: smallvec![name.into()],
        }
    }

    /// Add an alternative codeset; duplicates are ignored
    pub fn or(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Name of the first codeset, used in narratives
    pub fn primary(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<&str> for CodesetRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CodesetRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl<S: Into<String>> FromIterator<S> for CodesetRef {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter().fold(
            Self {
                names: SmallVec::new(),
            },
            CodesetRef::or,
        )
    }
}

impl<R: Into<CodesetRef>> BitOr<R> for CodesetRef {
    type Output = CodesetRef;

    fn bitor(self, rhs: R) -> Self::Output {
        rhs.into().names.into_iter().fold(self, CodesetRef::or)
    }
}

impl fmt::Display for CodesetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", name)?;
        }
        Ok(())
    }
}
