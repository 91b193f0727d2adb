pub mod colors;
pub mod formatting;
pub mod table;
pub mod time;

pub use formatting::{describe_inside, hours2readable};
