pub mod hybrid;
pub mod keywords;
pub mod lexical;
