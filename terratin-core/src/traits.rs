//! Core traits for terratin

use crate::{point::*, point_cloud::*, mesh::*};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Bounding box of a slice of points, `None` when empty
    pub fn from_points(points: &[Point3f]) -> Option<Self> {
        let first = *points.first()?;
        let mut min = first;
        let mut max = first;

        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Length of the diagonal of the XY footprint
    pub fn xy_diagonal(&self) -> f32 {
        self.width().hypot(self.height())
    }

    pub fn center(&self) -> Point3f {
        Point3f::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }
}

/// Trait for objects with a spatial extent
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> Option<Aabb>;
}

impl Bounded for [Point3f] {
    fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(self)
    }
}

impl Bounded for PointCloud<Point3f> {
    fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.points)
    }
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 4.0, 1.0),
            Point3f::new(3.0, 0.0, -1.0),
        ]);
        let bbox = cloud.bounding_box().unwrap();
        assert_eq!(bbox.min, Point3f::new(0.0, 0.0, -1.0));
        assert_eq!(bbox.max, Point3f::new(3.0, 4.0, 1.0));
        assert_eq!(bbox.xy_diagonal(), 5.0);
        assert_eq!(bbox.center(), Point3f::new(1.5, 2.0, 0.0));
    }

    #[test]
    fn test_empty_has_no_bounds() {
        assert!(PointCloud3f::new().bounding_box().is_none());
    }
}
