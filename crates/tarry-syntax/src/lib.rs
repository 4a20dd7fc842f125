//! `tarry-syntax` - Lexer and reader for the tarry expression language.
//!
//! The language is a small s-expression dialect used both for programs run by
//! the evaluation server and for the expressions a debugging client types at a
//! suspended breakpoint. `#break` tags the following form as a breakpoint site.
//!
//! # Example
//!
//! ```
//! use tarry_syntax::{parse_form, Form};
//!
//! let form = parse_form("(let [x 1] #break (+ x 1))").unwrap();
//! assert_eq!(form.breakpoint_count(), 1);
//! assert!(matches!(form, Form::List(_)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod form;
pub mod lexer;
pub mod parser;

pub use form::Form;
pub use parser::{parse_form, parse_forms, ParseError};
pub use text_size::TextRange;
