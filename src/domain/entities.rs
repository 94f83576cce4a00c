//! Catalog entities mirrored from persistent storage.

use serde::Serialize;

pub use catalogd_api_types::{
    Chair, ChairListResponse, ChairSearchResponse, Estate, EstateListResponse,
    EstateSearchResponse,
};

/// Maximum number of items in the low-priced and recommendation lists.
pub const LIST_LIMIT: i64 = 20;

/// Maximum number of estates returned by a map-area search.
pub const AREA_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Chair,
    Estate,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Chair => "chair",
            EntityKind::Estate => "estate",
        }
    }
}

/// A record owned by the entity cache and served from the catalog endpoints.
///
/// The associated page types fix the JSON envelope each entity kind is
/// returned in (`{"count", "chairs"}` versus `{"count", "estates"}`).
pub trait CatalogEntity: Clone + Send + Sync + Serialize + 'static {
    const KIND: EntityKind;

    type SearchPage: Serialize + Send;
    type ListPage: Serialize + Send;

    fn id(&self) -> i64;

    fn search_page(count: i64, items: Vec<Self>) -> Self::SearchPage;

    fn list_page(items: Vec<Self>) -> Self::ListPage;
}

impl CatalogEntity for Chair {
    const KIND: EntityKind = EntityKind::Chair;

    type SearchPage = ChairSearchResponse;
    type ListPage = ChairListResponse;

    fn id(&self) -> i64 {
        self.id
    }

    fn search_page(count: i64, items: Vec<Self>) -> Self::SearchPage {
        ChairSearchResponse {
            count,
            chairs: items,
        }
    }

    fn list_page(items: Vec<Self>) -> Self::ListPage {
        ChairListResponse { chairs: items }
    }
}

impl CatalogEntity for Estate {
    const KIND: EntityKind = EntityKind::Estate;

    type SearchPage = EstateSearchResponse;
    type ListPage = EstateListResponse;

    fn id(&self) -> i64 {
        self.id
    }

    fn search_page(count: i64, items: Vec<Self>) -> Self::SearchPage {
        EstateSearchResponse {
            count,
            estates: items,
        }
    }

    fn list_page(items: Vec<Self>) -> Self::ListPage {
        EstateListResponse { estates: items }
    }
}

/// The two smallest dimensions of a chair, which decide whether it fits
/// through a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorFit {
    pub shortest: i64,
    pub middle: i64,
}

impl DoorFit {
    pub fn for_chair(chair: &Chair) -> Self {
        let mut dims = [chair.width, chair.height, chair.depth];
        dims.sort_unstable();
        Self {
            shortest: dims[0],
            middle: dims[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_fit_picks_two_smallest_dimensions() {
        let chair = Chair {
            id: 1,
            name: String::new(),
            description: String::new(),
            thumbnail: String::new(),
            price: 0,
            height: 120,
            width: 60,
            depth: 80,
            color: String::new(),
            features: String::new(),
            kind: String::new(),
            popularity: 0,
            stock: 1,
        };

        let fit = DoorFit::for_chair(&chair);
        assert_eq!(fit, DoorFit { shortest: 60, middle: 80 });
    }

    #[test]
    fn list_page_wraps_items_under_kind_name() {
        let page = Estate::list_page(Vec::new());
        let value = serde_json::to_value(&page).expect("serialize");
        assert!(value["estates"].as_array().is_some_and(|items| items.is_empty()));
    }
}
