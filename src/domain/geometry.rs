//! Map-area search geometry.

use catalogd_api_types::Coordinate;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Coordinate> for Point {
    fn from(value: &Coordinate) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

/// Axis-aligned bounds, inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl BoundingBox {
    pub fn contains(&self, point: Point) -> bool {
        point.latitude >= self.top_left.latitude
            && point.latitude <= self.bottom_right.latitude
            && point.longitude >= self.top_left.longitude
            && point.longitude <= self.bottom_right.longitude
    }
}

/// A closed polygon given by its vertices in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Result<Self, DomainError> {
        if vertices.len() < 3 {
            return Err(DomainError::validation(
                "a polygon needs at least three coordinates",
            ));
        }
        if vertices
            .iter()
            .any(|point| !point.latitude.is_finite() || !point.longitude.is_finite())
        {
            return Err(DomainError::validation("coordinates must be finite numbers"));
        }
        Ok(Self { vertices })
    }

    pub fn from_coordinates(coordinates: &[Coordinate]) -> Result<Self, DomainError> {
        Self::new(coordinates.iter().map(Point::from).collect())
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.vertices[0];
        let (mut top_left, mut bottom_right) = (first, first);
        for point in &self.vertices[1..] {
            top_left.latitude = top_left.latitude.min(point.latitude);
            top_left.longitude = top_left.longitude.min(point.longitude);
            bottom_right.latitude = bottom_right.latitude.max(point.latitude);
            bottom_right.longitude = bottom_right.longitude.max(point.longitude);
        }
        BoundingBox {
            top_left,
            bottom_right,
        }
    }

    /// Even-odd ray casting; points exactly on an edge may fall either way.
    pub fn contains(&self, point: Point) -> bool {
        let mut inside = false;
        let mut previous = self.vertices[self.vertices.len() - 1];
        for &current in &self.vertices {
            let crosses = (current.longitude > point.longitude)
                != (previous.longitude > point.longitude);
            if crosses {
                let at = (previous.latitude - current.latitude)
                    * (point.longitude - current.longitude)
                    / (previous.longitude - current.longitude)
                    + current.latitude;
                if point.latitude < at {
                    inside = !inside;
                }
            }
            previous = current;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> Point {
        Point {
            latitude,
            longitude,
        }
    }

    fn square() -> Polygon {
        Polygon::new(vec![
            point(0.0, 0.0),
            point(0.0, 10.0),
            point(10.0, 10.0),
            point(10.0, 0.0),
        ])
        .expect("valid polygon")
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(Polygon::new(vec![point(0.0, 0.0), point(1.0, 1.0)]).is_err());
        assert!(
            Polygon::new(vec![point(0.0, 0.0), point(1.0, f64::NAN), point(2.0, 0.0)]).is_err()
        );
    }

    #[test]
    fn bounding_box_spans_all_vertices() {
        let triangle = Polygon::new(vec![point(35.0, 139.0), point(36.5, 138.2), point(35.7, 140.1)])
            .expect("valid polygon");
        let bbox = triangle.bounding_box();
        assert_eq!(bbox.top_left, point(35.0, 138.2));
        assert_eq!(bbox.bottom_right, point(36.5, 140.1));
        assert!(bbox.contains(point(36.0, 139.0)));
        assert!(!bbox.contains(point(37.0, 139.0)));
    }

    #[test]
    fn ray_casting_separates_inside_and_outside() {
        let square = square();
        assert!(square.contains(point(5.0, 5.0)));
        assert!(!square.contains(point(15.0, 5.0)));
        assert!(!square.contains(point(5.0, -1.0)));
    }

    #[test]
    fn concave_notch_is_outside() {
        let notched = Polygon::new(vec![
            point(0.0, 0.0),
            point(0.0, 10.0),
            point(10.0, 10.0),
            point(5.0, 5.0),
            point(10.0, 0.0),
        ])
        .expect("valid polygon");
        assert!(notched.contains(point(2.0, 5.0)));
        assert!(!notched.contains(point(8.0, 5.0)));
    }
}
