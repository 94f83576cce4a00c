//! Search condition documents: the range tables and enumerations clients
//! pick filters from.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

const BUNDLED_CHAIR_CONDITIONS: &str = include_str!("../../fixtures/chair_condition.json");
const BUNDLED_ESTATE_CONDITIONS: &str = include_str!("../../fixtures/estate_condition.json");

/// A half-open `[min, max)` bucket; `-1` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub id: i64,
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub fn lower(&self) -> Option<i64> {
        (self.min != -1).then_some(self.min)
    }

    pub fn upper(&self) -> Option<i64> {
        (self.max != -1).then_some(self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeCondition {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    pub ranges: Vec<Range>,
}

impl RangeCondition {
    /// Resolve a client supplied range id (the bucket index) into its bounds.
    pub fn resolve(&self, raw: &str, parameter: &'static str) -> Result<Range, DomainError> {
        let index: usize = raw.trim().parse().map_err(|_| {
            DomainError::validation(format!("`{parameter}` must be a range index, got `{raw}`"))
        })?;
        self.ranges.get(index).copied().ok_or_else(|| {
            DomainError::validation(format!("`{parameter}` {index} is not a known range"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCondition {
    pub list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChairSearchCondition {
    pub width: RangeCondition,
    pub height: RangeCondition,
    pub depth: RangeCondition,
    pub price: RangeCondition,
    pub color: ListCondition,
    pub feature: ListCondition,
    pub kind: ListCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstateSearchCondition {
    pub door_width: RangeCondition,
    pub door_height: RangeCondition,
    pub rent: RangeCondition,
    pub feature: ListCondition,
}

/// Parsed condition documents together with their serialized form, which is
/// served as-is by the condition endpoints.
#[derive(Debug, Clone)]
pub struct SearchConditions {
    pub chair: ChairSearchCondition,
    pub estate: EstateSearchCondition,
    chair_json: Bytes,
    estate_json: Bytes,
}

impl SearchConditions {
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_CHAIR_CONDITIONS, BUNDLED_ESTATE_CONDITIONS)
    }

    pub fn from_json(chair: &str, estate: &str) -> Result<Self, serde_json::Error> {
        let chair: ChairSearchCondition = serde_json::from_str(chair)?;
        let estate: EstateSearchCondition = serde_json::from_str(estate)?;
        let chair_json = Bytes::from(serde_json::to_vec(&chair)?);
        let estate_json = Bytes::from(serde_json::to_vec(&estate)?);
        Ok(Self {
            chair,
            estate,
            chair_json,
            estate_json,
        })
    }

    pub fn chair_json(&self) -> Bytes {
        self.chair_json.clone()
    }

    pub fn estate_json(&self) -> Bytes {
        self.estate_json.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_documents_parse() {
        let conditions = SearchConditions::bundled().expect("bundled conditions");
        assert!(!conditions.chair.price.ranges.is_empty());
        assert!(!conditions.estate.rent.ranges.is_empty());
        assert!(!conditions.chair_json().is_empty());
    }

    #[test]
    fn resolve_rejects_unknown_and_garbage_ids() {
        let conditions = SearchConditions::bundled().expect("bundled conditions");
        let price = &conditions.chair.price;

        assert!(price.resolve("0", "priceRangeId").is_ok());
        assert!(price.resolve("-1", "priceRangeId").is_err());
        assert!(price.resolve("abc", "priceRangeId").is_err());
        assert!(price.resolve("999", "priceRangeId").is_err());
    }

    #[test]
    fn unbounded_sides_are_dropped() {
        let open_low = Range {
            id: 0,
            min: -1,
            max: 3000,
        };
        assert_eq!(open_low.lower(), None);
        assert_eq!(open_low.upper(), Some(3000));
    }
}
