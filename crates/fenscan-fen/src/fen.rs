//! FEN placement serializer and parser.
//!
//! The placement field lists ranks 8 down to 1, files a to h within a
//! rank, separated by `/`. Runs of empty squares collapse to a digit.
//!
//! This is pure string handling with no I/O.

use std::fmt::Write;

use fenscan_pipeline::{BoardState, Color, ParseSquareError, Piece, PieceKind, Square};

/// Placement field of the standard starting position.
pub const STARTING_BOARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

/// Errors from parsing FEN text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    /// The placement field was empty.
    #[error("FEN placement is empty")]
    Empty,

    /// The placement did not contain exactly eight ranks.
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),

    /// A rank described more or fewer than eight squares.
    #[error("rank {rank} covers {squares} squares, expected 8")]
    RankLength { rank: u8, squares: usize },

    /// A character is neither a piece symbol nor a digit 1-8.
    #[error("invalid FEN symbol {0:?}")]
    InvalidSymbol(char),

    /// A square name did not parse.
    #[error(transparent)]
    InvalidSquare(#[from] ParseSquareError),
}

/// How the castling field is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Castling {
    /// Always `-`.
    #[default]
    None,
    /// Grant every right whose king and rook stand on their home squares.
    FromPlacement,
}

/// FEN fields that a photograph cannot reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenOptions {
    pub side_to_move: Color,
    pub castling: Castling,
    /// Fullmove number; the halfmove clock is always 0.
    pub fullmove: u32,
}

impl FenOptions {
    pub const DEFAULT_FULLMOVE: u32 = 1;
}

impl Default for FenOptions {
    fn default() -> Self {
        Self {
            side_to_move: Color::White,
            castling: Castling::None,
            fullmove: Self::DEFAULT_FULLMOVE,
        }
    }
}

/// Placement field for `board`.
///
/// ```
/// use fenscan_fen::{BoardState, board_fen};
///
/// assert_eq!(board_fen(&BoardState::empty()), "8/8/8/8/8/8/8/8");
/// ```
#[must_use]
pub fn board_fen(board: &BoardState) -> String {
    let mut out = String::with_capacity(64);
    for rank in (0..8_u8).rev() {
        let mut empty = 0_u8;
        for file in 0..8_u8 {
            match Square::new(file, rank).and_then(|sq| board.piece_at(sq)) {
                Some(piece) => {
                    if empty > 0 {
                        let _ = write!(out, "{empty}");
                        empty = 0;
                    }
                    out.push(piece.symbol());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            let _ = write!(out, "{empty}");
        }
        if rank > 0 {
            out.push('/');
        }
    }
    out
}

/// Castling rights implied by piece placement alone, or `-`.
///
/// A right is granted when the king is on its home square and the
/// matching rook is in its corner. Whether either has moved cannot be
/// known from a single position.
#[must_use]
pub fn castling_rights(board: &BoardState) -> String {
    let at = |name: &str| name.parse::<Square>().ok().and_then(|sq| board.piece_at(sq));
    let mut rights = String::new();
    for (color, rank) in [(Color::White, '1'), (Color::Black, '8')] {
        let king = Piece::new(color, PieceKind::King);
        let rook = Some(Piece::new(color, PieceKind::Rook));
        if at(&format!("e{rank}")) != Some(king) {
            continue;
        }
        for (file, right) in [('h', PieceKind::King), ('a', PieceKind::Queen)] {
            if at(&format!("{file}{rank}")) == rook {
                rights.push(Piece::new(color, right).symbol());
            }
        }
    }
    if rights.is_empty() {
        rights.push('-');
    }
    rights
}

/// Full six-field FEN for `board`.
///
/// En passant is always `-` and the halfmove clock always `0`.
#[must_use]
pub fn to_fen(board: &BoardState, options: &FenOptions) -> String {
    let castling = match options.castling {
        Castling::None => "-".to_string(),
        Castling::FromPlacement => castling_rights(board),
    };
    format!(
        "{} {} {castling} - 0 {}",
        board_fen(board),
        options.side_to_move.code(),
        options.fullmove
    )
}

/// Parse a placement field. Any fields after the first space are
/// ignored, so a full FEN is accepted too.
///
/// # Errors
///
/// Returns [`FenError`] for empty input, a wrong rank count, a rank that
/// does not cover exactly eight squares, or an unknown symbol.
pub fn parse_board_fen(fen: &str) -> Result<BoardState, FenError> {
    let placement = fen.split_whitespace().next().ok_or(FenError::Empty)?;
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut board = BoardState::empty();
    for (i, text) in ranks.iter().enumerate() {
        // First listed rank is rank 8.
        let rank = 7 - u8::try_from(i).map_err(|_| FenError::RankCount(ranks.len()))?;
        let mut file = 0_usize;
        for c in text.chars() {
            if let Some(run) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                file += run as usize;
                continue;
            }
            let piece = Piece::from_symbol(c).ok_or(FenError::InvalidSymbol(c))?;
            let square = u8::try_from(file)
                .ok()
                .and_then(|f| Square::new(f, rank))
                .ok_or(FenError::RankLength {
                    rank: rank + 1,
                    squares: file + 1,
                })?;
            board = board.with_piece_at(square, Some(piece));
            file += 1;
        }
        if file != 8 {
            return Err(FenError::RankLength {
                rank: rank + 1,
                squares: file,
            });
        }
    }
    Ok(board)
}

/// Parse an algebraic square name such as `e4`.
///
/// # Errors
///
/// Returns [`FenError::InvalidSquare`] for anything outside `a1`..`h8`.
pub fn parse_square(name: &str) -> Result<Square, FenError> {
    Ok(name.parse()?)
}
