//! Pure field-level normalization used by the fragrance importer.
//!
//! Nothing in here touches I/O; every function maps raw CSV text to the value
//! stored in the `perfumes` table.
pub mod fragrantica;
pub mod gender;
pub mod perfumers;
pub mod text;
