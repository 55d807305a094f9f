//! Input and output records shared by the assignment and filtering stages.

pub mod fragment;
pub mod piece;
pub mod quadrant;

pub use fragment::{Fragment, FragmentKind};
pub use piece::{Grounding, Piece};
pub use quadrant::{Quadrant, QuadrantMap};
