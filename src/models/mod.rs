pub mod element;
pub mod collection;
pub mod conf;

pub use element::{Element, ElementKind, OrderKey};
pub use collection::{ElementCollection, SourceMetadata, TitlePageEntry};
pub use conf::Conf;
