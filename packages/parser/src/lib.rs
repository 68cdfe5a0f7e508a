pub mod ast;
pub mod dom;
pub mod dom_parser;
pub mod error;
pub mod fragment;
pub mod languages;
pub mod parser;
pub mod schema;
pub mod serializer;
pub mod tokenizer;

#[cfg(test)]
mod tests_serializer;

pub use ast::{content_size, AttrValue, Attrs, Mark, Node, NodeType};
pub use error::{ParseError, ParseResult, SchemaError};
pub use parser::{parse, parse_dom, parse_with_schema, Parser};
pub use schema::{Schema, CALLOUT_KINDS};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};
