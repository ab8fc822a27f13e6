//! Review areas and their fixed total order.
//!
//! Every project must pass through each configured area independently.
//! The sequence below defines the "next stage" used in notifications;
//! it does not constrain which area may act first.

use crate::error::CoreError;

/// One of the fixed organizational review domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Area {
    Architecture,
    Infrastructure,
    Security,
    Quality,
    Operations,
}

/// All areas in review order. A stage exists per project per entry.
pub const REVIEW_SEQUENCE: &[Area] = &[
    Area::Architecture,
    Area::Infrastructure,
    Area::Security,
    Area::Quality,
    Area::Operations,
];

impl Area {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Architecture => "architecture",
            Area::Infrastructure => "infrastructure",
            Area::Security => "security",
            Area::Quality => "quality",
            Area::Operations => "operations",
        }
    }

    /// Parse from a stored string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "architecture" => Ok(Area::Architecture),
            "infrastructure" => Ok(Area::Infrastructure),
            "security" => Ok(Area::Security),
            "quality" => Ok(Area::Quality),
            "operations" => Ok(Area::Operations),
            other => Err(CoreError::Validation(format!("Unknown area: '{other}'"))),
        }
    }

    /// The first area after `self` in [`REVIEW_SEQUENCE`], or `None` when
    /// `self` is the last one.
    pub fn next(&self) -> Option<Area> {
        let pos = REVIEW_SEQUENCE.iter().position(|a| a == self)?;
        REVIEW_SEQUENCE.get(pos + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_from_str_round_trip() {
        for area in REVIEW_SEQUENCE {
            assert_eq!(Area::from_str(area.as_str()).unwrap(), *area);
        }
    }

    #[test]
    fn unknown_area_rejected() {
        assert!(Area::from_str("marketing").is_err());
        assert!(Area::from_str("").is_err());
    }

    #[test]
    fn next_follows_review_sequence() {
        assert_eq!(Area::Architecture.next(), Some(Area::Infrastructure));
        assert_eq!(Area::Infrastructure.next(), Some(Area::Security));
        assert_eq!(Area::Security.next(), Some(Area::Quality));
        assert_eq!(Area::Quality.next(), Some(Area::Operations));
    }

    #[test]
    fn last_area_has_no_next() {
        assert_eq!(Area::Operations.next(), None);
    }

    #[test]
    fn sequence_has_no_duplicates() {
        let mut seen = REVIEW_SEQUENCE.to_vec();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), REVIEW_SEQUENCE.len());
    }
}
