//! Convex polygons and their splitting planes.

use litho_mesh::{Point3, Triangle, Vec3};

/// Distance below which a point counts as lying on a plane (mm).
pub const PLANE_EPSILON: f64 = 1e-6;

/// Oriented plane `normal . p = w`. Points with a positive distance are in
/// front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Offset along the normal.
    pub w: f64,
}

impl Plane {
    /// Plane through three points, oriented counter-clockwise. `None` for
    /// collinear points.
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < 1e-12 {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    /// Signed distance from the plane.
    pub fn distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.w
    }

    /// Reverse the orientation.
    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Classify `polygon` against this plane, splitting it if it spans.
    pub fn split(&self, polygon: Polygon) -> Split {
        let sides: Vec<Side> = polygon
            .vertices
            .iter()
            .map(|v| Side::of(self.distance(v)))
            .collect();
        let combined = sides.iter().fold(Side::Coplanar, |acc, &s| acc.join(s));

        match combined {
            Side::Coplanar => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    Split::CoplanarFront(polygon)
                } else {
                    Split::CoplanarBack(polygon)
                }
            }
            Side::Front => Split::Front(polygon),
            Side::Back => Split::Back(polygon),
            Side::Spanning => {
                let n = polygon.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);

                for i in 0..n {
                    let j = (i + 1) % n;
                    let (si, sj) = (sides[i], sides[j]);
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];

                    if si != Side::Back {
                        front.push(vi);
                    }
                    if si != Side::Front {
                        back.push(vi);
                    }
                    if si.join(sj) == Side::Spanning {
                        let t = (self.w - self.normal.dot(&vi.coords))
                            / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        front.push(v);
                        back.push(v);
                    }
                }

                Split::Spanning {
                    front: Polygon::with_plane(front, polygon.plane),
                    back: Polygon::with_plane(back, polygon.plane),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Coplanar,
    Front,
    Back,
    Spanning,
}

impl Side {
    fn of(distance: f64) -> Self {
        if distance < -PLANE_EPSILON {
            Side::Back
        } else if distance > PLANE_EPSILON {
            Side::Front
        } else {
            Side::Coplanar
        }
    }

    fn join(self, other: Side) -> Side {
        match (self, other) {
            (Side::Coplanar, s) | (s, Side::Coplanar) => s,
            (a, b) if a == b => a,
            _ => Side::Spanning,
        }
    }
}

/// Where a polygon ended up relative to a plane.
#[derive(Debug, Clone)]
pub enum Split {
    /// On the plane, facing the same way.
    CoplanarFront(Polygon),
    /// On the plane, facing the other way.
    CoplanarBack(Polygon),
    /// Entirely in front.
    Front(Polygon),
    /// Entirely behind.
    Back(Polygon),
    /// Cut in two. Either piece may be degenerate and dropped.
    Spanning {
        /// Piece in front of the plane.
        front: Option<Polygon>,
        /// Piece behind the plane.
        back: Option<Polygon>,
    },
}

/// Convex planar polygon with counter-clockwise vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Vertices, at least 3.
    pub vertices: Vec<Point3>,
    /// Supporting plane.
    pub plane: Plane,
}

impl Polygon {
    /// Polygon for a triangle. `None` for degenerate triangles.
    pub fn from_triangle([a, b, c]: &Triangle) -> Option<Self> {
        Plane::from_points(a, b, c).map(|plane| Self {
            vertices: vec![*a, *b, *c],
            plane,
        })
    }

    fn with_plane(vertices: Vec<Point3>, plane: Plane) -> Option<Self> {
        (vertices.len() >= 3).then_some(Self { vertices, plane })
    }

    /// Reverse winding and plane.
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    /// Fan triangulation.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        let first = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .map(move |pair| [first, pair[0], pair[1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn xy_plane() -> Plane {
        Plane {
            normal: Vec3::z(),
            w: 0.0,
        }
    }

    fn triangle(z: [f64; 3]) -> Polygon {
        Polygon::from_triangle(&[
            Point3::new(0.0, 0.0, z[0]),
            Point3::new(1.0, 0.0, z[1]),
            Point3::new(0.0, 1.0, z[2]),
        ])
        .unwrap()
    }

    #[test]
    fn test_plane_from_points() {
        let plane = Plane::from_points(
            &Point3::new(0.0, 0.0, 2.0),
            &Point3::new(1.0, 0.0, 2.0),
            &Point3::new(0.0, 1.0, 2.0),
        )
        .unwrap();
        assert_relative_eq!(plane.normal, Vec3::z());
        assert_relative_eq!(plane.w, 2.0);
        assert_relative_eq!(plane.distance(&Point3::new(5.0, 5.0, 3.0)), 1.0);
    }

    #[test]
    fn test_collinear_points_have_no_plane() {
        let p = Point3::origin();
        assert!(Plane::from_points(&p, &Point3::new(1.0, 0.0, 0.0), &Point3::new(2.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_classification() {
        let plane = xy_plane();
        assert!(matches!(plane.split(triangle([1.0, 1.0, 1.0])), Split::Front(_)));
        assert!(matches!(plane.split(triangle([-1.0, -1.0, -1.0])), Split::Back(_)));
        assert!(matches!(plane.split(triangle([0.0, 0.0, 0.0])), Split::CoplanarFront(_)));

        let mut flipped = triangle([0.0, 0.0, 0.0]);
        flipped.flip();
        assert!(matches!(plane.split(flipped), Split::CoplanarBack(_)));

        // Touching the plane with one vertex is not spanning
        assert!(matches!(plane.split(triangle([0.0, 1.0, 1.0])), Split::Front(_)));
    }

    #[test]
    fn test_spanning_split() {
        let split = xy_plane().split(triangle([-1.0, 1.0, 1.0]));
        let Split::Spanning {
            front: Some(front),
            back: Some(back),
        } = split
        else {
            panic!("expected two pieces");
        };

        // Back piece is the corner triangle, front piece a quad
        assert_eq!(back.vertices.len(), 3);
        assert_eq!(front.vertices.len(), 4);
        for v in front.vertices.iter().chain(&back.vertices) {
            if v.z.abs() < 1e-12 {
                // Cut points sit halfway along the crossing edges
                assert_relative_eq!(v.x + v.y, 0.5, epsilon = 1e-12);
            }
        }
        assert_eq!(front.plane, back.plane);
    }

    #[test]
    fn test_fan_triangles() {
        let quad = Polygon {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            plane: xy_plane(),
        };
        let tris: Vec<_> = quad.triangles().collect();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1], [quad.vertices[0], quad.vertices[2], quad.vertices[3]]);
    }
}
