pub mod db;
pub mod fragrance;
