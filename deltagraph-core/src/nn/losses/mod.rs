pub mod square_error;

pub use square_error::SquareError;
