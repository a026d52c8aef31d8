pub mod ooxml;
pub mod spreadsheet;
pub mod text;
