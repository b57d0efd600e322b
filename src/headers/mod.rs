//! Operator header block parsing
//!
//! Turns a human-typed block of `Name: value` lines into validated header
//! pairs and sorts each one into body metadata or request metadata.

pub mod codec;


pub use codec::{
    ClassifiedHeader, HeaderClass, HeaderError, RawHeaderLine, is_valid_header_name,
    parse_header_block,
};
