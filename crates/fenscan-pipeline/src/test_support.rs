//! Synthetic boards, photos, and a color-keyed model for tests.
//!
//! Pieces are drawn as flat discs, one distinct color per class, so a
//! model that only looks at the middle of a tile can label it exactly.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::geometric_transformations::{Interpolation, warp_into};

use crate::board::{BoardOrientation, BoardState, Color, EMPTY_CLASS, Piece, PieceKind};
use crate::classify::{ClassifyError, NormalizedTile, PieceModel};
use crate::homography::Homography;
use crate::rectify::destination_corners;
use crate::types::Point;

pub const BACKGROUND: Rgb<u8> = Rgb([235, 235, 235]);
pub const LIGHT_SQUARE: Rgb<u8> = Rgb([110, 110, 110]);
pub const DARK_SQUARE: Rgb<u8> = Rgb([40, 40, 40]);

pub fn piece_color(piece: Piece) -> Rgb<u8> {
    match (piece.color, piece.kind) {
        (Color::White, PieceKind::Pawn) => Rgb([255, 255, 0]),
        (Color::White, PieceKind::Knight) => Rgb([255, 165, 0]),
        (Color::White, PieceKind::Bishop) => Rgb([255, 0, 255]),
        (Color::White, PieceKind::Rook) => Rgb([0, 255, 255]),
        (Color::White, PieceKind::Queen) => Rgb([255, 255, 255]),
        (Color::White, PieceKind::King) => Rgb([0, 255, 0]),
        (Color::Black, PieceKind::Pawn) => Rgb([128, 0, 0]),
        (Color::Black, PieceKind::Knight) => Rgb([0, 0, 128]),
        (Color::Black, PieceKind::Bishop) => Rgb([128, 0, 128]),
        (Color::Black, PieceKind::Rook) => Rgb([0, 128, 128]),
        (Color::Black, PieceKind::Queen) => Rgb([90, 50, 0]),
        (Color::Black, PieceKind::King) => Rgb([255, 0, 0]),
    }
}

/// Top-down board image, white at the bottom.
pub fn render_board(board: &BoardState, size: u32) -> RgbImage {
    let tile = size / 8;
    let mut img = RgbImage::from_fn(size, size, |x, y| {
        let (row, col) = ((y / tile).min(7), (x / tile).min(7));
        if (row + col) % 2 == 0 {
            LIGHT_SQUARE
        } else {
            DARK_SQUARE
        }
    });
    let radius = (f64::from(tile) * 0.3) as i32;
    for row in 0..8_u8 {
        for col in 0..8_u8 {
            let square = BoardOrientation::WhiteBottom.square_at(row, col).unwrap();
            if let Some(piece) = board.piece_at(square) {
                let cx = (u32::from(col) * tile + tile / 2) as i32;
                let cy = (u32::from(row) * tile + tile / 2) as i32;
                draw_filled_circle_mut(&mut img, (cx, cy), radius, piece_color(piece));
            }
        }
    }
    img
}

/// Place `board` on a `width x height` background: centered head-on,
/// or projected onto `quad` (TL, TR, BR, BL).
pub fn render_photo(
    board: &RgbImage,
    width: u32,
    height: u32,
    quad: Option<[Point; 4]>,
) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    match quad {
        None => {
            let x = i64::from((width - board.width()) / 2);
            let y = i64::from((height - board.height()) / 2);
            image::imageops::replace(&mut canvas, board, x, y);
        }
        Some(quad) => {
            let h = Homography::from_correspondences(&destination_corners(board.width()), &quad)
                .unwrap();
            warp_into(
                board,
                &h.to_projection().unwrap(),
                Interpolation::Bilinear,
                BACKGROUND,
                &mut canvas,
            );
        }
    }
    canvas
}

pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Labels a tile by the average color of its central patch.
pub struct ColorKeyModel {
    names: Vec<String>,
    keys: Vec<Vec<[f32; 3]>>,
}

impl ColorKeyModel {
    pub fn new() -> Self {
        let to_unit = |c: Rgb<u8>| c.0.map(|v| f32::from(v) / 255.0);
        let mut names = vec![EMPTY_CLASS.to_string()];
        let mut keys = vec![vec![to_unit(LIGHT_SQUARE), to_unit(DARK_SQUARE)]];
        for color in [Color::White, Color::Black] {
            for kind in PieceKind::ALL {
                let piece = Piece::new(color, kind);
                names.push(piece.code());
                keys.push(vec![to_unit(piece_color(piece))]);
            }
        }
        Self { names, keys }
    }
}

impl PieceModel for ColorKeyModel {
    fn class_names(&self) -> &[String] {
        &self.names
    }

    #[allow(clippy::cast_precision_loss)]
    fn infer(&self, tile: &NormalizedTile) -> Result<Vec<f32>, ClassifyError> {
        let size = tile.size();
        let (lo, hi) = (size * 3 / 8, size * 5 / 8);
        let mut sum = [0.0_f32; 3];
        let mut n = 0.0_f32;
        for y in lo..hi {
            for x in lo..hi {
                for (c, s) in sum.iter_mut().enumerate() {
                    *s += tile
                        .get(x, y, c)
                        .ok_or_else(|| ClassifyError::Inference("tile too small".into()))?;
                }
                n += 1.0;
            }
        }
        if n == 0.0 {
            return Err(ClassifyError::Inference("tile too small".into()));
        }
        let mean = sum.map(|s| s / n);
        Ok(self
            .keys
            .iter()
            .map(|refs| {
                refs.iter()
                    .map(|k| {
                        let d: f32 = k.iter().zip(mean).map(|(a, b)| (a - b) * (a - b)).sum();
                        -d * 100.0
                    })
                    .fold(f32::NEG_INFINITY, f32::max)
            })
            .collect())
    }
}
