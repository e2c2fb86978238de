pub mod cell;
pub mod schema;
pub mod tuple;

pub use cell::Cell;
pub use schema::{Field, Schema, Type};
pub use tuple::{Tuple, WrappedTuple};
