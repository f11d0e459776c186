pub mod entry;
pub mod inspection;
pub mod photo;
