// THEORY:
// The `RegionExtractor` is the engine of the spatial grouping stage. It turns the cleaned
// binary mask into a list of `DetectedRegion`s using plain connected-component labelling:
//
// 1.  **Raster Scan (Seeding)**: Pixels are visited left to right, top to bottom. The
//     first unvisited matched pixel of a component becomes its seed, so components are
//     always emitted in the order of their top-most, left-most pixel. Two runs over the
//     same mask return the same list in the same order.
// 2.  **Flood Fill**: From each seed the component is grown over 4-connected neighbors
//     (no diagonals) with an explicit stack. Painted areas can cover most of a large
//     template, which would overflow the call stack if this were recursive.
// 3.  **Data Aggregation**: While filling, only the extremes and the pixel count are
//     kept; member pixels are not stored. The region's box, center and density-based
//     confidence are derived from those.
// 4.  **Area Filtering**: Components smaller than `min_area` (leftover speckle) or larger
//     than `max_area` (background that happens to be green) are dropped.
// 5.  **Stateless Utility**: `find_regions` has no memory between calls.

use crate::core_modules::mask::Mask;
use crate::core_modules::region::{DetectedRegion, Point};

pub mod region_extractor {
    use super::*; // Make structs from parent module available.

    /// Labels all 4-connected components of `mask` and returns those whose pixel
    /// count lies within `min_area..=max_area`, in raster order of their seed pixel.
    pub fn find_regions(mask: &Mask, min_area: u64, max_area: u64) -> Vec<DetectedRegion> {
        let width = mask.width();
        let height = mask.height();
        let mut visited = vec![false; width as usize * height as usize];
        let mut stack: Vec<Point> = Vec::new();
        let mut regions = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = mask.index(x, y);
                if visited[index] || !mask.is_matched(x, y) {
                    continue;
                }

                let (min, max, area) = flood_fill(mask, Point { x, y }, &mut visited, &mut stack);
                if (min_area..=max_area).contains(&area) {
                    regions.push(DetectedRegion::from_extent(min, max, area));
                }
            }
        }

        regions
    }

    /// Fills the component containing `seed`, returning its extremes and pixel count.
    fn flood_fill(
        mask: &Mask,
        seed: Point,
        visited: &mut [bool],
        stack: &mut Vec<Point>,
    ) -> (Point, Point, u64) {
        let width = mask.width();
        let height = mask.height();
        let mut min = seed;
        let mut max = seed;
        let mut area = 0u64;

        visited[mask.index(seed.x, seed.y)] = true;
        stack.push(seed);

        while let Some(current) = stack.pop() {
            area += 1;
            min.x = min.x.min(current.x);
            min.y = min.y.min(current.y);
            max.x = max.x.max(current.x);
            max.y = max.y.max(current.y);

            // Check all 4 direct neighbors (not diagonals).
            for (dx, dy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                let nx = current.x as i64 + dx;
                let ny = current.y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }

                let neighbor = Point {
                    x: nx as u32,
                    y: ny as u32,
                };
                let index = mask.index(neighbor.x, neighbor.y);
                if !visited[index] && mask.is_matched(neighbor.x, neighbor.y) {
                    visited[index] = true;
                    stack.push(neighbor);
                }
            }
        }

        (min, max, area)
    }
}

#[cfg(test)]
mod tests {
    use super::region_extractor::find_regions;
    use super::*;

    #[test]
    fn separates_disjoint_squares() {
        let mut mask = Mask::new(200, 200);
        mask.fill_rect(20, 30, 20, 20);
        mask.fill_rect(120, 10, 20, 20);

        let regions = find_regions(&mask, 50, 50_000);
        assert_eq!(regions.len(), 2);
        // The square whose first row comes first in raster order is emitted first.
        assert_eq!((regions[0].x, regions[0].y), (120, 10));
        assert_eq!((regions[1].x, regions[1].y), (20, 30));
        for region in &regions {
            assert_eq!(region.area, 400);
            assert_eq!(region.confidence, 100);
        }
    }

    #[test]
    fn diagonal_neighbors_are_not_connected() {
        let mask = Mask::from_art(&["#.", ".#"]);
        let regions = find_regions(&mask, 1, 10);
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.area == 1));
    }

    #[test]
    fn area_bounds_are_inclusive_filters() {
        let mut mask = Mask::new(40, 10);
        mask.fill_rect(0, 0, 2, 2);
        mask.fill_rect(10, 0, 5, 5);
        mask.fill_rect(20, 0, 10, 10);

        let regions = find_regions(&mask, 25, 99);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 25);

        assert_eq!(find_regions(&mask, 4, 100).len(), 3);
        assert_eq!(find_regions(&mask, 101, 1000).len(), 0);
    }

    #[test]
    fn l_shape_confidence_reflects_density() {
        let mask = Mask::from_art(&["#...", "#...", "#...", "####"]);
        let regions = find_regions(&mask, 1, 100);
        assert_eq!(regions.len(), 1);
        let region = regions[0];
        assert_eq!(region.area, 7);
        assert_eq!((region.width, region.height), (4, 4));
        assert_eq!(region.confidence, 44);
        assert_eq!(region.center, Point { x: 2, y: 2 });
    }

    #[test]
    fn large_component_does_not_overflow() {
        let mut mask = Mask::new(1000, 1000);
        mask.fill_rect(0, 0, 1000, 1000);
        let regions = find_regions(&mask, 1, u64::MAX);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 1_000_000);
    }

    #[test]
    fn regions_stay_inside_the_image() {
        let mask = Mask::from_art(&[
            "##..#",
            "#..##",
            "..#..",
            "###.#",
        ]);
        for region in find_regions(&mask, 1, 100) {
            assert!(region.bounding_box.x2 < mask.width());
            assert!(region.bounding_box.y2 < mask.height());
            assert!(region.area <= region.bounding_box_area());
            assert!(region.confidence <= 100);
        }
    }

    #[test]
    fn empty_mask_has_no_regions() {
        assert!(find_regions(&Mask::new(50, 50), 1, 100).is_empty());
        assert!(find_regions(&Mask::new(0, 0), 0, 100).is_empty());
    }
}
