/*!
# Rust Language Module

This Rust module handles the text of a story file: ZSCII characters,
packed Z-strings, abbreviations and the dictionary tokeniser. It also
holds the error type shared by the whole crate.

*/

#[macro_use]
mod error;
mod alphabet;
mod dictionary;
mod text;
mod zscii;

pub use alphabet::Alphabet;
pub use dictionary::Dictionaries;
pub use dictionary::Dictionary;
pub use dictionary::Token;
pub use error::Error;
pub use error::ErrorCode;
pub use text::Codec;
pub use zscii::unicode_to_lower;
pub use zscii::UnicodeTable;
