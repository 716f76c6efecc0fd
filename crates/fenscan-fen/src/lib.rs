//! fenscan-fen: FEN serialization and parsing (sans-IO).
//!
//! Turns a [`BoardState`] read by `fenscan-pipeline` into FEN text and
//! back. Only the piece placement can be recovered from a photograph;
//! the remaining FEN fields come from [`FenOptions`].

pub mod fen;

pub use fen::{
    Castling, FenError, FenOptions, STARTING_BOARD_FEN, board_fen, castling_rights,
    parse_board_fen, parse_square, to_fen,
};
pub use fenscan_pipeline::{BoardState, Color, Piece, PieceKind, Square};
