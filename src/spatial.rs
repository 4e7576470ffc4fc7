use geo::{Coord, Intersects, MultiPolygon, Point, Polygon, Rect};

/// Anything with a longitude/latitude position.
pub trait Located {
    fn location(&self) -> Point<f64>;
}

impl Located for Point<f64> {
    fn location(&self) -> Point<f64> {
        *self
    }
}

/// Query region in longitude/latitude degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    shape: MultiPolygon<f64>,
}

impl Region {
    /// Rectangle spanning `(min_lon, min_lat)` to `(max_lon, max_lat)`.
    pub fn bounding_box(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        let rect = Rect::new(
            Coord {
                x: min_lon,
                y: min_lat,
            },
            Coord {
                x: max_lon,
                y: max_lat,
            },
        );
        Self::from(rect.to_polygon())
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty()
    }

    /// Boundary points count as inside.
    pub fn contains_point(&self, point: &Point<f64>) -> bool {
        self.shape.intersects(point)
    }

    pub fn contains<T: Located>(&self, item: &T) -> bool {
        self.contains_point(&item.location())
    }
}

impl From<Polygon<f64>> for Region {
    fn from(polygon: Polygon<f64>) -> Self {
        Self {
            shape: MultiPolygon::new(vec![polygon]),
        }
    }
}

impl From<MultiPolygon<f64>> for Region {
    fn from(shape: MultiPolygon<f64>) -> Self {
        Self { shape }
    }
}

/// Keep the items located within, or on the boundary of, `region`.
pub fn filter_within<T, I>(items: I, region: &Region) -> Vec<T>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .filter(|item| region.contains(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon};

    #[derive(Debug, Clone, PartialEq)]
    struct Gauge {
        id: &'static str,
        lon: f64,
        lat: f64,
    }

    impl Located for Gauge {
        fn location(&self) -> Point<f64> {
            Point::new(self.lon, self.lat)
        }
    }

    fn gauges() -> Vec<Gauge> {
        vec![
            Gauge {
                id: "inside",
                lon: -80.0,
                lat: 26.0,
            },
            Gauge {
                id: "edge",
                lon: -75.0,
                lat: 26.0,
            },
            Gauge {
                id: "corner",
                lon: -85.0,
                lat: 20.0,
            },
            Gauge {
                id: "outside",
                lon: -70.0,
                lat: 26.0,
            },
        ]
    }

    #[test]
    fn test_boundary_points_are_inside() {
        let region = Region::bounding_box(-85.0, 20.0, -75.0, 30.0);
        let kept = filter_within(gauges(), &region);
        let ids: Vec<_> = kept.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["inside", "edge", "corner"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let region = Region::bounding_box(-85.0, 20.0, -75.0, 30.0);
        let once = filter_within(gauges(), &region);
        let twice = filter_within(once.clone(), &region);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_triangle_region() {
        let region = Region::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
        ]);
        assert!(region.contains_point(&point!(x: 2.0, y: 2.0)));
        assert!(region.contains_point(&point!(x: 5.0, y: 5.0)));
        assert!(!region.contains_point(&point!(x: 6.0, y: 6.0)));
    }

    #[test]
    fn test_empty_region_contains_nothing() {
        let region = Region::from(MultiPolygon::<f64>::new(vec![]));
        assert!(region.is_empty());
        assert!(filter_within(gauges(), &region).is_empty());
    }
}
