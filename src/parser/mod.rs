pub mod fountain_parser;
pub mod fdx_parser;
pub mod ordering;

pub use fountain_parser::{FountainParser, parse_fountain};
pub use fdx_parser::{FdxParser, parse_fdx};
pub use ordering::assign_chapter_order;
