//! Wire types shared between the catalogd server and its clients.
//!
//! Entities mirror the relational rows one to one. Fields the service keeps
//! for ranking or inventory (`popularity`, `stock`) never leave the server.

use serde::{Deserialize, Serialize};

/// A chair listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Chair {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    pub price: i64,
    pub height: i64,
    pub width: i64,
    pub depth: i64,
    pub color: String,
    pub features: String,
    pub kind: String,
    #[serde(skip_serializing, default)]
    pub popularity: i64,
    #[serde(skip_serializing, default)]
    pub stock: i64,
}

/// An estate listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Estate {
    pub id: i64,
    pub thumbnail: String,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub rent: i64,
    pub door_height: i64,
    pub door_width: i64,
    pub features: String,
    #[serde(skip_serializing, default)]
    pub popularity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChairSearchResponse {
    pub count: i64,
    pub chairs: Vec<Chair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChairListResponse {
    pub chairs: Vec<Chair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstateSearchResponse {
    pub count: i64,
    pub estates: Vec<Estate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstateListResponse {
    pub estates: Vec<Estate>,
}

/// Body of `POST /initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub language: String,
}

/// Body accepted by the purchase and document-request endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Polygon used by the map-area search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinates {
    pub coordinates: Vec<Coordinate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chair_hides_inventory_fields() {
        let chair = Chair {
            id: 1,
            name: "stool".into(),
            description: "".into(),
            thumbnail: "/c.png".into(),
            price: 1000,
            height: 40,
            width: 30,
            depth: 30,
            color: "black".into(),
            features: "".into(),
            kind: "stool".into(),
            popularity: 9,
            stock: 3,
        };
        let value = serde_json::to_value(&chair).expect("serialize chair");
        assert!(value.get("popularity").is_none());
        assert!(value.get("stock").is_none());
        assert_eq!(value["price"], 1000);
    }

    #[test]
    fn estate_uses_camel_case_doors() {
        let estate = Estate {
            id: 7,
            thumbnail: "".into(),
            name: "loft".into(),
            description: "".into(),
            latitude: 35.0,
            longitude: 139.0,
            address: "".into(),
            rent: 50_000,
            door_height: 200,
            door_width: 90,
            features: "".into(),
            popularity: 1,
        };
        let value = serde_json::to_value(&estate).expect("serialize estate");
        assert_eq!(value["doorHeight"], 200);
        assert_eq!(value["doorWidth"], 90);
        assert!(value.get("popularity").is_none());
    }
}
