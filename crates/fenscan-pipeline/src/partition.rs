//! Splitting the rectified board into its 64 square tiles.

use image::RgbImage;

use crate::board::{BoardOrientation, Square};

/// Number of rows and columns on a chess board.
pub const GRID: u32 = 8;

/// One square's crop of the rectified board.
#[derive(Debug, Clone)]
pub struct SquareTile {
    pub square: Square,
    /// Grid row (0 = top) the tile was cut from.
    pub row: u8,
    /// Grid column (0 = left) the tile was cut from.
    pub col: u8,
    pub image: RgbImage,
}

/// Cut `board` into an 8x8 grid of equal tiles.
///
/// Tiles are `width / 8` by `height / 8` pixels, so any remainder
/// columns on the right and rows at the bottom are dropped. Tiles are
/// returned row-major from the top-left; each carries the square that
/// `orientation` assigns to its grid position.
#[must_use]
pub fn extract_squares(board: &RgbImage, orientation: BoardOrientation) -> Vec<SquareTile> {
    let tile_w = board.width() / GRID;
    let tile_h = board.height() / GRID;

    let mut tiles: Vec<SquareTile> = Square::all()
        .map(|square| {
            let (row, col) = orientation.grid_position(square);
            let image = image::imageops::crop_imm(
                board,
                u32::from(col) * tile_w,
                u32::from(row) * tile_h,
                tile_w,
                tile_h,
            )
            .to_image();
            SquareTile {
                square,
                row,
                col,
                image,
            }
        })
        .collect();
    tiles.sort_by_key(|t| (t.row, t.col));
    tiles
}
