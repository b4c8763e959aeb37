//! Static board topology: track size, seat offsets and special squares.
//!
//! Special squares are compiled into a fixed-size table indexed by cell
//! number when the topology is built, so move validation never consults a
//! keyed map.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::types::Seat;

/// Effect class of a special square.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SquareKind {
    /// Pieces resting here cannot be captured; stacking is allowed.
    Safe,
    /// In KILL games, captures here pay a bonus.
    Kill,
}

/// A special square on the shared track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SpecialSquare {
    /// Absolute track cell.
    cell: u16,
    /// Effect class.
    kind: SquareKind,
    /// Bonus points paid by a kill square (falls back to the rule set's kill bonus).
    #[serde(default)]
    points: Option<u32>,
    /// Free-form effect tag carried through to clients.
    #[serde(default)]
    effect: Option<String>,
}

impl SpecialSquare {
    /// Creates a special square.
    pub fn new(cell: u16, kind: SquareKind) -> Self {
        Self {
            cell,
            kind,
            points: None,
            effect: None,
        }
    }

    /// Sets the bonus points.
    pub fn with_points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    /// Sets the effect tag.
    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }
}

/// Error building a board topology.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// Track has too few cells.
    #[display("Track must have at least 2 cells, got {}", _0)]
    TrackTooShort(u16),
    /// The private home column is empty.
    #[display("Home column must have at least one cell")]
    EmptyHomeColumn,
    /// Piece count out of range.
    #[display("Pieces per player must be between 1 and 6, got {}", _0)]
    PieceCount(u8),
    /// A seat offset lies outside the track.
    #[display("Seat offset {} is outside a track of {} cells", offset, track_cells)]
    OffsetOutOfRange {
        /// Offending offset.
        offset: u16,
        /// Track length.
        track_cells: u16,
    },
    /// Two seats share a start cell.
    #[display("Seat offset {} is used twice", _0)]
    DuplicateOffset(u16),
    /// A special square lies outside the track.
    #[display("Special square at cell {} is outside the track", _0)]
    SquareOutOfRange(u16),
    /// Two special squares claim the same cell.
    #[display("Cell {} has more than one special square", _0)]
    DuplicateSquare(u16),
    /// Ring plus home column is longer than a path can count.
    #[display("Path of {} ring cells and {} home cells is too long", track_cells, home_column)]
    PathTooLong {
        /// Ring length.
        track_cells: u16,
        /// Home column length.
        home_column: u16,
    },
}

impl std::error::Error for BoardError {}

/// Immutable board description for one game type.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct BoardTopology {
    /// Cells on the shared ring.
    track_cells: u16,
    /// Private cells each seat walks after leaving the ring.
    home_column: u16,
    /// Pieces each player owns.
    pieces_per_player: u8,
    /// Start cell of each seat, indexed by seat.
    seat_offsets: Vec<u16>,
    #[getter(skip)]
    squares: Box<[Option<SpecialSquare>]>,
}

impl BoardTopology {
    /// Builds a topology, compiling special squares into the lookup table.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] if the dimensions are degenerate, an offset or
    /// square lies off the track, or a cell is claimed twice.
    #[instrument(skip(seat_offsets, specials), fields(seats = seat_offsets.len(), specials = specials.len()))]
    pub fn new(
        track_cells: u16,
        home_column: u16,
        pieces_per_player: u8,
        seat_offsets: Vec<u16>,
        specials: Vec<SpecialSquare>,
    ) -> Result<Self, BoardError> {
        if track_cells < 2 {
            return Err(BoardError::TrackTooShort(track_cells));
        }
        if home_column == 0 {
            return Err(BoardError::EmptyHomeColumn);
        }
        if (track_cells - 1).checked_add(home_column).is_none() {
            return Err(BoardError::PathTooLong {
                track_cells,
                home_column,
            });
        }
        if !(1..=6).contains(&pieces_per_player) {
            return Err(BoardError::PieceCount(pieces_per_player));
        }
        for (i, &offset) in seat_offsets.iter().enumerate() {
            if offset >= track_cells {
                return Err(BoardError::OffsetOutOfRange {
                    offset,
                    track_cells,
                });
            }
            if seat_offsets[..i].contains(&offset) {
                return Err(BoardError::DuplicateOffset(offset));
            }
        }

        let mut squares = vec![None; usize::from(track_cells)].into_boxed_slice();
        for square in specials {
            let slot = squares
                .get_mut(usize::from(square.cell))
                .ok_or(BoardError::SquareOutOfRange(square.cell))?;
            if slot.is_some() {
                return Err(BoardError::DuplicateSquare(square.cell));
            }
            *slot = Some(square);
        }

        debug!(track_cells, home_column, pieces_per_player, "Board topology built");
        Ok(Self {
            track_cells,
            home_column,
            pieces_per_player,
            seat_offsets,
            squares,
        })
    }

    /// The familiar cross-shaped board: 52 ring cells, a 6-cell home column,
    /// four pieces per seat, start cells 13 apart and safe squares on every
    /// start cell plus the star eight cells past it.
    pub fn standard() -> Self {
        let seat_offsets = vec![0, 13, 26, 39];
        let specials = seat_offsets
            .iter()
            .flat_map(|&start| [start, start + 8])
            .map(|cell| SpecialSquare::new(cell, SquareKind::Safe))
            .collect();
        Self::new(52, 6, 4, seat_offsets, specials)
            .unwrap_or_else(|e| unreachable!("standard board is valid: {e}"))
    }

    /// Number of steps from the start cell to home.
    ///
    /// Progress values `0..path_length` are on the path, `path_length` is home.
    pub fn path_length(&self) -> u16 {
        (self.track_cells - 1).saturating_add(self.home_column)
    }

    /// Number of seats the board has start cells for.
    pub fn seats(&self) -> usize {
        self.seat_offsets.len()
    }

    /// Maps a seat's progress to an absolute ring cell.
    ///
    /// Returns `None` for progress inside the private home column (or past
    /// it), where no other seat can ever be.
    pub fn absolute_cell(&self, seat: Seat, progress: u16) -> Option<u16> {
        let offset = *self.seat_offsets.get(seat.index())?;
        if progress >= self.track_cells - 1 {
            return None;
        }
        let cell = (u32::from(offset) + u32::from(progress)) % u32::from(self.track_cells);
        u16::try_from(cell).ok()
    }

    /// Looks up the special square on a ring cell.
    pub fn square(&self, cell: u16) -> Option<&SpecialSquare> {
        self.squares.get(usize::from(cell))?.as_ref()
    }

    /// True if pieces on `cell` cannot be captured.
    pub fn is_safe(&self, cell: u16) -> bool {
        matches!(self.square(cell).map(|s| s.kind), Some(SquareKind::Safe))
    }

    /// Iterates special squares in cell order.
    pub fn special_squares(&self) -> impl Iterator<Item = &SpecialSquare> {
        self.squares.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_board_dimensions() {
        let board = BoardTopology::standard();
        assert_eq!(board.path_length(), 57);
        assert_eq!(board.seats(), 4);
        assert!(board.is_safe(0));
        assert!(board.is_safe(21));
        assert!(!board.is_safe(1));
    }

    #[test]
    fn absolute_cell_wraps_and_stops_at_home_column() {
        let board = BoardTopology::standard();
        assert_eq!(board.absolute_cell(Seat(1), 0), Some(13));
        assert_eq!(board.absolute_cell(Seat(3), 20), Some(7));
        assert_eq!(board.absolute_cell(Seat(0), 50), Some(50));
        assert_eq!(board.absolute_cell(Seat(0), 51), None);
    }

    #[test]
    fn duplicate_square_rejected() {
        let result = BoardTopology::new(
            16,
            2,
            1,
            vec![0, 8],
            vec![
                SpecialSquare::new(3, SquareKind::Safe),
                SpecialSquare::new(3, SquareKind::Kill),
            ],
        );
        assert_eq!(result, Err(BoardError::DuplicateSquare(3)));
    }

    #[test]
    fn square_off_track_rejected() {
        let result = BoardTopology::new(
            16,
            2,
            1,
            vec![0, 8],
            vec![SpecialSquare::new(16, SquareKind::Safe)],
        );
        assert_eq!(result, Err(BoardError::SquareOutOfRange(16)));
    }

    #[test]
    fn kill_square_points_are_kept() {
        let board = BoardTopology::new(
            16,
            2,
            1,
            vec![0, 8],
            vec![SpecialSquare::new(5, SquareKind::Kill).with_points(25)],
        )
        .unwrap();
        let square = board.square(5).unwrap();
        assert_eq!(*square.kind(), SquareKind::Kill);
        assert_eq!(*square.points(), Some(25));
        assert!(board.square(6).is_none());
    }

    #[test]
    fn path_longer_than_u16_rejected() {
        let result = BoardTopology::new(u16::MAX, 6, 1, vec![0, 8], Vec::new());
        assert_eq!(
            result,
            Err(BoardError::PathTooLong {
                track_cells: u16::MAX,
                home_column: 6
            })
        );
        assert!(BoardTopology::new(u16::MAX, 1, 1, vec![0], Vec::new()).is_ok());
    }

    #[test]
    fn large_ring_wraps_without_overflow() {
        let board = BoardTopology::new(60_000, 4, 1, vec![0, 59_000], Vec::new()).unwrap();
        assert_eq!(board.path_length(), 60_003);
        assert_eq!(board.absolute_cell(Seat(1), 1_500), Some(500));
        assert_eq!(board.absolute_cell(Seat(1), 59_998), Some(58_998));
        assert_eq!(board.absolute_cell(Seat(1), 59_999), None);
    }
}
