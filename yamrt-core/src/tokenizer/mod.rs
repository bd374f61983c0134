pub(crate) mod char_utils;
mod parser;
mod scanner;
mod source;

pub use parser::Parser;
pub use scanner::{LineBreak, Scanner, SkipTabs};
pub use source::{InputSource, Source};
