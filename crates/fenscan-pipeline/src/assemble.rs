//! Folding per-square labels into a board state.

use crate::board::{BoardState, PieceLabel, Square};

/// Build a board from `(square, label)` pairs.
///
/// Empty labels contribute nothing, so they never clear a piece placed
/// earlier. When a square receives more than one piece, the last one
/// wins. Squares never given a piece stay empty.
#[must_use]
pub fn assemble<I>(labels: I) -> BoardState
where
    I: IntoIterator<Item = (Square, PieceLabel)>,
{
    labels
        .into_iter()
        .fold(BoardState::empty(), |board, (square, label)| {
            match label.piece() {
                Some(piece) => board.with_piece_at(square, Some(piece)),
                None => board,
            }
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::board::{Color, Piece, PieceKind};

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn label(color: Color, kind: PieceKind) -> PieceLabel {
        PieceLabel::Occupied(Piece::new(color, kind))
    }

    #[test]
    fn empty_labels_add_nothing() {
        let board = assemble(Square::all().map(|s| (s, PieceLabel::Empty)));
        assert_eq!(board, BoardState::empty());
    }

    #[test]
    fn occupied_labels_are_placed() {
        let board = assemble([
            (sq("e1"), label(Color::White, PieceKind::King)),
            (sq("e8"), label(Color::Black, PieceKind::King)),
            (sq("d4"), PieceLabel::Empty),
        ]);
        assert_eq!(board.occupied_count(), 2);
        assert_eq!(
            board.piece_at(sq("e8")),
            Some(Piece::new(Color::Black, PieceKind::King))
        );
        assert_eq!(board.piece_at(sq("d4")), None);
    }

    #[test]
    fn duplicate_squares_last_write_wins() {
        let board = assemble([
            (sq("a1"), label(Color::White, PieceKind::Rook)),
            (sq("a1"), label(Color::Black, PieceKind::Queen)),
        ]);
        assert_eq!(
            board.piece_at(sq("a1")),
            Some(Piece::new(Color::Black, PieceKind::Queen))
        );

    }

    #[test]
    fn later_empty_label_keeps_earlier_piece() {
        let board = assemble([
            (sq("a1"), label(Color::White, PieceKind::Rook)),
            (sq("a1"), PieceLabel::Empty),
        ]);
        assert_eq!(board.occupied_count(), 1);
        assert_eq!(
            board.piece_at(sq("a1")),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
    }
}
