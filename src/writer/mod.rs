pub mod fountain_writer;
pub mod fdx_writer;

pub use fountain_writer::{FountainWriter, write_fountain};
pub use fdx_writer::{FdxWriter, write_fdx};
