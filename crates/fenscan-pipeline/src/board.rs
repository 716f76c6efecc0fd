//! Chess domain types: colors, pieces, squares, and the board state.
//!
//! These are the shapes the pipeline produces. Notation (FEN) lives in
//! `fenscan-fen`; this module only knows about algebraic square names
//! and the two-character class codes the classifier speaks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Side a piece belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// White pieces (uppercase in FEN).
    White,
    /// Black pieces (lowercase in FEN).
    Black,
}

impl Color {
    /// Single-letter code used in class names and FEN (`w` / `b`).
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }

    /// Parse a `w` / `b` code.
    #[must_use]
    pub const fn from_code(c: char) -> Option<Self> {
        match c {
            'w' => Some(Self::White),
            'b' => Some(Self::Black),
            _ => None,
        }
    }
}

/// Piece type, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// All six piece kinds in conventional order.
    pub const ALL: [Self; 6] = [
        Self::Pawn,
        Self::Knight,
        Self::Bishop,
        Self::Rook,
        Self::Queen,
        Self::King,
    ];

    /// Uppercase letter for this kind (`P N B R Q K`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    /// Parse an uppercase or lowercase piece letter.
    #[must_use]
    pub const fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(Self::Pawn),
            'N' => Some(Self::Knight),
            'B' => Some(Self::Bishop),
            'R' => Some(Self::Rook),
            'Q' => Some(Self::Queen),
            'K' => Some(Self::King),
            _ => None,
        }
    }
}

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    #[must_use]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// FEN symbol: uppercase for white, lowercase for black.
    #[must_use]
    pub const fn symbol(self) -> char {
        let letter = self.kind.letter();
        match self.color {
            Color::White => letter,
            Color::Black => letter.to_ascii_lowercase(),
        }
    }

    /// Parse a FEN symbol (`K`, `q`, ...).
    #[must_use]
    pub const fn from_symbol(c: char) -> Option<Self> {
        let Some(kind) = PieceKind::from_letter(c) else {
            return None;
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { color, kind })
    }

    /// Two-character class code, e.g. `wP` or `bK`.
    #[must_use]
    pub fn code(self) -> String {
        let mut s = String::with_capacity(2);
        s.push(self.color.code());
        s.push(self.kind.letter());
        s
    }
}

/// Class name the classifier uses for an empty square.
pub const EMPTY_CLASS: &str = "xx";

/// What occupies a single square: nothing, or one colored piece.
///
/// This is the 13-valued output of the piece classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PieceLabel {
    #[default]
    Empty,
    Occupied(Piece),
}

impl PieceLabel {
    /// Parse a classifier class name (`xx`, `wP`, `bQ`, ...).
    #[must_use]
    pub fn from_class_name(name: &str) -> Option<Self> {
        if name == EMPTY_CLASS {
            return Some(Self::Empty);
        }
        let mut chars = name.chars();
        let color = Color::from_code(chars.next()?)?;
        let letter = chars.next()?;
        if chars.next().is_some() || !letter.is_ascii_uppercase() {
            return None;
        }
        let kind = PieceKind::from_letter(letter)?;
        Some(Self::Occupied(Piece::new(color, kind)))
    }

    /// Class name for this label.
    #[must_use]
    pub fn class_name(self) -> String {
        match self {
            Self::Empty => EMPTY_CLASS.to_string(),
            Self::Occupied(piece) => piece.code(),
        }
    }

    /// The piece, if any.
    #[must_use]
    pub const fn piece(self) -> Option<Piece> {
        match self {
            Self::Empty => None,
            Self::Occupied(piece) => Some(piece),
        }
    }
}

impl From<Option<Piece>> for PieceLabel {
    fn from(piece: Option<Piece>) -> Self {
        piece.map_or(Self::Empty, Self::Occupied)
    }
}

/// Error returned when a square name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid square name {0:?}")]
pub struct ParseSquareError(pub String);

/// One of the 64 board squares.
///
/// Indexed `a1 = 0`, `b1 = 1`, ..., `h8 = 63`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Square from zero-based file (`a = 0`) and rank (`1 = 0`).
    #[must_use]
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self(rank * 8 + file))
        } else {
            None
        }
    }

    /// Square from its `a1 = 0` index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 { Some(Self(index)) } else { None }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Zero-based file (`a = 0`).
    #[must_use]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Zero-based rank (`1 = 0`).
    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// All squares in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..64).map(Self)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file()),
            char::from(b'1' + self.rank())
        )
    }
}

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseSquareError(s.to_string()));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Self::new(file, rank).ok_or_else(|| ParseSquareError(s.to_string()))
    }
}

/// How the board sits in the photograph.
///
/// The rectified image is read with a fixed mapping from grid position to
/// square; orientation is never detected from the picture itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoardOrientation {
    /// White's side along the bottom edge: top-left tile is `a8`.
    #[default]
    WhiteBottom,
    /// Black's side along the bottom edge: top-left tile is `h1`.
    BlackBottom,
}

impl BoardOrientation {
    /// Square shown at `row` (0 = top) and `col` (0 = left) of the
    /// rectified 8x8 grid.
    #[must_use]
    pub const fn square_at(self, row: u8, col: u8) -> Option<Square> {
        if row >= 8 || col >= 8 {
            return None;
        }
        match self {
            Self::WhiteBottom => Square::new(col, 7 - row),
            Self::BlackBottom => Square::new(7 - col, row),
        }
    }

    /// Grid `(row, col)` at which `square` is shown; the inverse of
    /// [`square_at`](Self::square_at).
    #[must_use]
    pub const fn grid_position(self, square: Square) -> (u8, u8) {
        match self {
            Self::WhiteBottom => (7 - square.rank(), square.file()),
            Self::BlackBottom => (square.rank(), 7 - square.file()),
        }
    }
}

/// Piece placement on all 64 squares.
///
/// Every square always has an entry; unoccupied squares hold `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardState {
    squares: [Option<Piece>; 64],
}

impl Default for BoardState {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoardState {
    /// A board with no pieces.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            squares: [None; 64],
        }
    }

    /// Build a board from a full `a1 = 0` indexed placement array.
    #[must_use]
    pub const fn from_squares(squares: [Option<Piece>; 64]) -> Self {
        Self { squares }
    }

    /// Return a copy with `square` set to `piece`.
    #[must_use]
    pub const fn with_piece_at(mut self, square: Square, piece: Option<Piece>) -> Self {
        self.squares[square.index()] = piece;
        self
    }

    #[must_use]
    pub const fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    #[must_use]
    pub const fn label_at(&self, square: Square) -> PieceLabel {
        match self.squares[square.index()] {
            Some(piece) => PieceLabel::Occupied(piece),
            None => PieceLabel::Empty,
        }
    }

    /// Occupied squares in index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// Number of occupied squares.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.squares.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn square_names_round_trip_through_display() {
        for sq in Square::all() {
            let parsed: Square = sq.to_string().parse().unwrap();
            assert_eq!(parsed, sq);
        }
    }

    #[test]
    fn square_index_convention_is_a1_zero() {
        assert_eq!("a1".parse::<Square>().unwrap().index(), 0);
        assert_eq!("h1".parse::<Square>().unwrap().index(), 7);
        assert_eq!("a8".parse::<Square>().unwrap().index(), 56);
        assert_eq!("h8".parse::<Square>().unwrap().index(), 63);
    }

    #[test]
    fn bad_square_names_are_rejected() {
        for name in ["", "a", "i1", "a9", "a0", "A1", "e44"] {
            assert!(name.parse::<Square>().is_err(), "{name:?} should not parse");
        }
    }

    #[test]
    fn class_names_cover_thirteen_labels() {
        let mut names = vec![EMPTY_CLASS.to_string()];
        for color in [Color::White, Color::Black] {
            for kind in PieceKind::ALL {
                names.push(Piece::new(color, kind).code());
            }
        }
        assert_eq!(names.len(), 13);
        for name in &names {
            let label = PieceLabel::from_class_name(name).unwrap();
            assert_eq!(&label.class_name(), name);
        }
    }

    #[test]
    fn malformed_class_names_are_rejected() {
        for name in ["", "w", "wp", "xP", "wPP", "XX", "bX"] {
            assert!(
                PieceLabel::from_class_name(name).is_none(),
                "{name:?} should not parse"
            );
        }
    }

    #[test]
    fn piece_symbols_follow_fen_case() {
        assert_eq!(Piece::new(Color::White, PieceKind::Knight).symbol(), 'N');
        assert_eq!(Piece::new(Color::Black, PieceKind::Queen).symbol(), 'q');
        assert_eq!(
            Piece::from_symbol('k'),
            Some(Piece::new(Color::Black, PieceKind::King))
        );
        assert_eq!(Piece::from_symbol('x'), None);
    }

    #[test]
    fn white_bottom_maps_top_left_to_a8() {
        let o = BoardOrientation::WhiteBottom;
        assert_eq!(o.square_at(0, 0).unwrap().to_string(), "a8");
        assert_eq!(o.square_at(0, 7).unwrap().to_string(), "h8");
        assert_eq!(o.square_at(7, 0).unwrap().to_string(), "a1");
        assert_eq!(o.square_at(7, 7).unwrap().to_string(), "h1");
    }

    #[test]
    fn black_bottom_maps_top_left_to_h1() {
        let o = BoardOrientation::BlackBottom;
        assert_eq!(o.square_at(0, 0).unwrap().to_string(), "h1");
        assert_eq!(o.square_at(7, 7).unwrap().to_string(), "a8");
        assert!(o.square_at(8, 0).is_none());
    }

    #[test]
    fn every_orientation_covers_all_squares_once() {
        for o in [BoardOrientation::WhiteBottom, BoardOrientation::BlackBottom] {
            let mut seen = [false; 64];
            for row in 0..8 {
                for col in 0..8 {
                    let sq = o.square_at(row, col).unwrap();
                    assert!(!seen[sq.index()], "{sq} mapped twice");
                    seen[sq.index()] = true;
                }
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn grid_position_inverts_square_at() {
        for o in [BoardOrientation::WhiteBottom, BoardOrientation::BlackBottom] {
            for sq in Square::all() {
                let (row, col) = o.grid_position(sq);
                assert_eq!(o.square_at(row, col), Some(sq));
            }
        }
    }

    #[test]
    fn board_state_defaults_to_empty() {
        let board = BoardState::default();
        assert_eq!(board.occupied_count(), 0);
        assert_eq!(board.pieces().count(), 0);
        assert_eq!(
            board.label_at("e4".parse().unwrap()),
            PieceLabel::Empty
        );
    }

    #[test]
    fn with_piece_at_sets_single_square() {
        let e4: Square = "e4".parse().unwrap();
        let pawn = Piece::new(Color::White, PieceKind::Pawn);
        let board = BoardState::empty().with_piece_at(e4, Some(pawn));
        assert_eq!(board.piece_at(e4), Some(pawn));
        assert_eq!(board.occupied_count(), 1);
        assert_eq!(board.pieces().collect::<Vec<_>>(), vec![(e4, pawn)]);
    }
}
