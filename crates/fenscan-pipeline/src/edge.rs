//! Canny edge detection and edge dilation.
//!
//! Edges are extracted from the Otsu-binarized image, then dilated so the
//! board's outer boundary becomes one continuous closed band that contour
//! tracing can follow.
//!
//! The Canny here is Sobel gradients from `imageproc` followed by local
//! non-maximum suppression and an 8-connected hysteresis pass. Unlike
//! `imageproc::edges::canny` it does not blur internally (the pipeline
//! already did) and its hysteresis bounds-checks every neighbor, so edges
//! touching the image border are safe.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Minimum allowed Canny threshold.
///
/// A zero low threshold turns every pixel with any gradient into a
/// candidate edge.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge. Pixels
/// with gradient magnitude at or above `high_threshold` are definite
/// edges; those at or above `low_threshold` are kept only when connected
/// to a definite edge.
///
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(a, b)| f32::from(a.0[0]).hypot(f32::from(b.0[0])))
        .collect();

    let grid = Grid {
        width: w as usize,
        height: h as usize,
    };
    let thinned = non_maximum_suppression(&magnitude, &gx, &gy, grid);
    hysteresis(&thinned, grid, low, high)
}

/// Dilate a binary edge map with a square structuring element of the
/// given L-infinity radius. Radius 0 returns the map unchanged.
#[must_use = "returns the dilated edge map"]
pub fn dilate(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    imageproc::morphology::dilate(edges, Norm::LInf, radius)
}

/// Number of edge pixels (value 255) in a binary map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] == 255)).sum()
}

#[derive(Clone, Copy)]
struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    const fn index(self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

/// Keep only pixels that are local maxima along the gradient direction.
/// Border pixels are always suppressed.
fn non_maximum_suppression(
    magnitude: &[f32],
    gx: &imageproc::definitions::Image<Luma<i16>>,
    gy: &imageproc::definitions::Image<Luma<i16>>,
    grid: Grid,
) -> Vec<f32> {
    let mut out = vec![0.0; magnitude.len()];
    for y in 1..grid.height - 1 {
        for x in 1..grid.width - 1 {
            let here = magnitude[grid.index(x, y)];
            if here <= 0.0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let (dx, dy) = (
                f32::from(gx.get_pixel(x as u32, y as u32).0[0]),
                f32::from(gy.get_pixel(x as u32, y as u32).0[0]),
            );
            let mut angle = dy.atan2(dx).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }
            let (a, b) = if !(22.5..157.5).contains(&angle) {
                ((x - 1, y), (x + 1, y))
            } else if angle < 67.5 {
                ((x + 1, y + 1), (x - 1, y - 1))
            } else if angle < 112.5 {
                ((x, y - 1), (x, y + 1))
            } else {
                ((x - 1, y + 1), (x + 1, y - 1))
            };
            if here >= magnitude[grid.index(a.0, a.1)] && here >= magnitude[grid.index(b.0, b.1)] {
                out[grid.index(x, y)] = here;
            }
        }
    }
    out
}

/// Promote strong pixels to edges and grow them through weak pixels,
/// 8-connected, with an explicit stack.
fn hysteresis(thinned: &[f32], grid: Grid, low: f32, high: f32) -> GrayImage {
    let mut marked = vec![false; thinned.len()];
    let mut stack = Vec::new();

    for start in 0..thinned.len() {
        if thinned[start] < high || marked[start] {
            continue;
        }
        marked[start] = true;
        stack.push(start);
        while let Some(i) = stack.pop() {
            let (x, y) = (i % grid.width, i / grid.width);
            for ny in y.saturating_sub(1)..=(y + 1).min(grid.height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(grid.width - 1) {
                    let j = grid.index(nx, ny);
                    if !marked[j] && thinned[j] >= low {
                        marked[j] = true;
                        stack.push(j);
                    }
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    GrayImage::from_fn(grid.width as u32, grid.height as u32, |x, y| {
        if marked[grid.index(x as usize, y as usize)] {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn blank_image_produces_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        let edges = canny(&img, 50.0, 150.0);
        assert_eq!(edges.dimensions(), (20, 20));
        assert_eq!(count_edge_pixels(&edges), 0);
    }

    #[test]
    fn sharp_edge_detected_near_boundary() {
        let edges = canny(&sharp_edge_image(), 50.0, 150.0);
        assert!(count_edge_pixels(&edges) > 0);
        for (x, _, p) in edges.enumerate_pixels() {
            if p.0[0] == 255 {
                assert!((8..=11).contains(&x), "edge pixel far from boundary at x={x}");
            }
        }
    }

    #[test]
    fn edge_touching_border_does_not_panic() {
        let img = GrayImage::from_fn(10, 10, |x, _| {
            if x == 1 { Luma([255]) } else { Luma([0]) }
        });
        let edges = canny(&img, 1.0, 2.0);
        assert_eq!(edges.dimensions(), (10, 10));
    }

    #[test]
    fn tiny_images_produce_empty_maps() {
        let edges = canny(&GrayImage::new(2, 5), 50.0, 150.0);
        assert_eq!(edges.dimensions(), (2, 5));
        assert_eq!(count_edge_pixels(&edges), 0);
    }

    #[test]
    fn low_above_high_is_clamped() {
        let img = sharp_edge_image();
        assert_eq!(canny(&img, 200.0, 100.0), canny(&img, 100.0, 100.0));
    }

    #[test]
    fn dilate_grows_single_pixel_into_square() {
        let mut img = GrayImage::new(11, 11);
        img.put_pixel(5, 5, Luma([255]));
        let dilated = dilate(&img, 2);
        assert_eq!(count_edge_pixels(&dilated), 25);
        assert_eq!(dilated.get_pixel(3, 3).0[0], 255);
        assert_eq!(dilated.get_pixel(7, 7).0[0], 255);
        assert_eq!(dilated.get_pixel(2, 5).0[0], 0);
    }

    #[test]
    fn dilate_radius_zero_is_identity() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        assert_eq!(dilate(&img, 0), img);
    }
}
