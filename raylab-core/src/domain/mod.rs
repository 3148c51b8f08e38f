//! Domain types: stations and time-indexed tables.

pub mod station;
pub mod table;

pub use station::Station;
pub use table::{Column, ColumnData, TableError, TimeTable};
