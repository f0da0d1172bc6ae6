/// A colored point cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points, one per point.
    colors: Vec<[u8; 3]>,
}

impl PointCloud {
    /// Create a new point cloud from points and their colors.
    ///
    /// PRECONDITION: `points` and `colors` have the same length.
    pub fn new(points: Vec<[f64; 3]>, colors: Vec<[u8; 3]>) -> Self {
        assert_eq!(
            points.len(),
            colors.len(),
            "points and colors must have the same length"
        );
        Self { points, colors }
    }

    /// Create an empty point cloud with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a single colored point.
    #[inline]
    pub fn push(&mut self, point: [f64; 3], color: [u8; 3]) {
        self.points.push(point);
        self.colors.push(color);
    }

    /// Append all the points of another cloud, keeping their order.
    pub fn extend(&mut self, other: PointCloud) {
        self.points.extend(other.points);
        self.colors.extend(other.colors);
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Iterate over `(point, color)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64; 3], &[u8; 3])> {
        self.points.iter().zip(self.colors.iter())
    }

    /// Get the component-wise minimum and maximum of the points.
    ///
    /// Returns `None` for an empty cloud.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                [lo[0].min(p[0]), lo[1].min(p[1]), lo[2].min(p[2])],
                [hi[0].max(p[0]), hi[1].max(p[1]), hi[2].max(p[2])],
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let mut pointcloud = PointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![[255, 0, 0], [0, 255, 0]],
        );
        pointcloud.push([-1.0, 2.0, 0.5], [0, 0, 255]);

        assert_eq!(pointcloud.len(), 3);
        assert_eq!(pointcloud.colors()[2], [0, 0, 255]);
        assert_eq!(
            pointcloud.bounds(),
            Some(([-1.0, 0.0, 0.0], [1.0, 2.0, 0.5]))
        );
        assert_eq!(PointCloud::default().bounds(), None);
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut a = PointCloud::new(vec![[0.0; 3]], vec![[1, 1, 1]]);
        let b = PointCloud::new(vec![[1.0; 3], [2.0; 3]], vec![[2, 2, 2], [3, 3, 3]]);
        a.extend(b);
        assert_eq!(a.points(), &[[0.0; 3], [1.0; 3], [2.0; 3]]);
        assert_eq!(a.iter().last(), Some((&[2.0; 3], &[3, 3, 3])));
    }
}
