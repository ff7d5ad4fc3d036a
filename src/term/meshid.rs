use core::fmt::Debug;
use std::fmt::Display;

use crate::{CrosswalkError, CrosswalkResult};

/// Unique identifier of a MeSH descriptor, e.g. `D001943`
///
/// Descriptor UIs consist of a `D` followed by either 6 or 9 digits.
/// Both widths are preserved, so that `D000077195` is displayed
/// the same way it was parsed.
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MeshId {
    inner: u32,
    wide: bool,
}

impl MeshId {
    /// Returns the numerical part of the descriptor UI
    pub fn as_u32(&self) -> u32 {
        self.inner
    }
}

impl TryFrom<&str> for MeshId {
    type Error = CrosswalkError;
    fn try_from(s: &str) -> CrosswalkResult<Self> {
        let Some(digits) = s.strip_prefix('D') else {
            return Err(CrosswalkError::InvalidId(format!("{s} is not a MeSH descriptor")));
        };
        let wide = match digits.len() {
            6 => false,
            9 => true,
            _ => return Err(CrosswalkError::InvalidId(format!("{s} is not a MeSH descriptor"))),
        };
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CrosswalkError::InvalidId(format!("{s} is not a MeSH descriptor")));
        }
        Ok(MeshId {
            inner: digits.parse::<u32>()?,
            wide,
        })
    }
}

impl Debug for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MeshId({})", self)
    }
}

impl Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.wide {
            write!(f, "D{:09}", self.inner)
        } else {
            write!(f, "D{:06}", self.inner)
        }
    }
}

impl PartialEq<str> for MeshId {
    fn eq(&self, other: &str) -> bool {
        MeshId::try_from(other).map_or(false, |other| *self == other)
    }
}

impl PartialEq<&str> for MeshId {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_short_id() {
        let id = MeshId::try_from("D001943").expect("valid descriptor");
        assert_eq!(id.as_u32(), 1943);
        assert_eq!(id.to_string(), "D001943");
    }

    #[test]
    fn parse_wide_id() {
        let id = MeshId::try_from("D000077195").expect("valid descriptor");
        assert_eq!(id.as_u32(), 77195);
        assert_eq!(id.to_string(), "D000077195");
        assert_ne!(id, MeshId::try_from("D077195").expect("valid descriptor"));
    }

    #[test]
    fn reject_supplementary_concept() {
        assert!(MeshId::try_from("C538231").is_err());
    }

    #[test]
    fn reject_invalid_width() {
        assert!(MeshId::try_from("D1943").is_err());
        assert!(MeshId::try_from("D0019430").is_err());
        assert!(MeshId::try_from("D00194A").is_err());
        assert!(MeshId::try_from("D+01943").is_err());
        assert!(MeshId::try_from("").is_err());
    }

    #[test]
    fn compare_with_str() {
        let id = MeshId::try_from("D009369").expect("valid descriptor");
        assert_eq!(id, "D009369");
        assert!(id != "D009370");
        assert!(id != "foobar");
    }
}
