//! Row structs for the `versions` table.

pub mod version;
