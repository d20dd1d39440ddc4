use glam::DVec2;

/// An axis-aligned bounding box in normalized image coordinates.
///
/// `min` is the top-left corner `(x0, y0)` and `max` the bottom-right corner
/// `(x1, y1)`. Boxes with zero width or height are valid; every metric on them
/// evaluates to `0.0` instead of dividing by zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bbox {
    /// The minimum point of the bounding box (top-left corner).
    pub min: DVec2,
    /// The maximum point of the bounding box (bottom-right corner).
    pub max: DVec2,
}

impl Bbox {
    /// Creates a new bounding box from minimum and maximum points.
    ///
    /// # Example
    /// ```
    /// use glam::DVec2;
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(DVec2::new(0.1, 0.2), DVec2::new(0.5, 0.6));
    /// ```
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from the four edges in annotation order
    /// (`XMin`, `XMax`, `YMin`, `YMax`).
    ///
    /// # Example
    /// ```
    /// use glam::DVec2;
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_extents(0.2, 0.4, 0.3, 0.5);
    /// assert_eq!(bbox.min, DVec2::new(0.2, 0.3));
    /// assert_eq!(bbox.max, DVec2::new(0.4, 0.5));
    /// ```
    pub fn from_extents(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        Self::new(DVec2::new(x0, y0), DVec2::new(x1, y1))
    }

    /// Width of the box (`x1 - x0`).
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box (`y1 - y0`).
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Calculates the area of the bounding box.
    ///
    /// # Example
    /// ```
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_extents(0.0, 0.5, 0.0, 0.5);
    /// assert_eq!(bbox.area(), 0.25);
    /// ```
    pub fn area(&self) -> f64 {
        let length = self.max - self.min;

        length.x * length.y
    }

    /// Calculates the center point of the bounding box.
    ///
    /// # Example
    /// ```
    /// use glam::DVec2;
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_extents(0.0, 0.5, 0.0, 0.25);
    /// assert_eq!(bbox.center(), DVec2::new(0.25, 0.125));
    /// ```
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    /// Calculates the area of intersection between this bounding box and another.
    ///
    /// Boxes that only touch along an edge, and degenerate boxes, intersect
    /// with area `0.0`.
    ///
    /// # Example
    /// ```
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox1 = Bbox::from_extents(0.0, 0.4, 0.0, 0.4);
    /// let bbox2 = Bbox::from_extents(0.2, 0.6, 0.2, 0.6);
    /// assert!((bbox1.intersection(&bbox2) - 0.04).abs() < 1e-12);
    /// ```
    pub fn intersection(&self, other: &Self) -> f64 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Calculates the Intersection over Union (IoU) between this bounding box and another.
    ///
    /// # Returns
    /// A value in `[0.0, 1.0]`; `0.0` when the union is empty.
    ///
    /// # Formula
    /// IoU = Intersection Area / (Area1 + Area2 - Intersection Area)
    ///
    /// # Example
    /// ```
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox1 = Bbox::from_extents(0.1, 0.3, 0.1, 0.3);
    /// let bbox2 = Bbox::from_extents(0.1, 0.3, 0.1, 0.3);
    /// assert_eq!(bbox1.iou(&bbox2), 1.0);
    /// ```
    pub fn iou(&self, other: &Self) -> f64 {
        let intersection_area = self.intersection(other);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    /// Calculates the Intersection over Minimum area (IoM) between this bounding box and another.
    ///
    /// Unlike IoU, the denominator is the smaller of the two areas, so a small
    /// box lying completely inside a large one scores `1.0` regardless of the
    /// size difference. This makes it the natural measure for "part of".
    ///
    /// # Formula
    /// IoM = Intersection Area / min(Area1, Area2)
    ///
    /// # Example
    /// ```
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let large = Bbox::from_extents(0.0, 1.0, 0.0, 1.0);
    /// let small = Bbox::from_extents(0.1, 0.2, 0.1, 0.2);
    /// assert_eq!(large.iom(&small), 1.0);
    /// assert!(large.iom(&small) > large.iou(&small));
    /// ```
    pub fn iom(&self, other: &Self) -> f64 {
        let intersection_area = self.intersection(other);
        let min_area = self.area().min(other.area());

        if min_area > 0.0 {
            intersection_area / min_area
        } else {
            0.0
        }
    }

    /// Checks if this bounding box completely contains another bounding box.
    ///
    /// Shared edges count as contained, so identical boxes contain each other.
    ///
    /// # Example
    /// ```
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let outer = Bbox::from_extents(0.1, 0.5, 0.1, 0.5);
    /// let inner = Bbox::from_extents(0.2, 0.4, 0.3, 0.5);
    /// assert!(outer.contains(&inner));
    /// assert!(!inner.contains(&outer));
    /// ```
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Checks if a point lies inside the closed box (edges included).
    ///
    /// # Example
    /// ```
    /// use glam::DVec2;
    /// use hierobj_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_extents(0.1, 0.5, 0.1, 0.5);
    /// assert!(bbox.contains_point(DVec2::new(0.5, 0.3)));
    /// assert!(!bbox.contains_point(DVec2::new(0.2, 0.6)));
    /// ```
    pub fn contains_point(&self, point: DVec2) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
    }

    /// Checks if the center of `other` lies inside this box.
    pub fn contains_center(&self, other: &Self) -> bool {
        self.contains_point(other.center())
    }
}
