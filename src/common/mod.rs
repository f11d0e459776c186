pub mod dates;
pub mod image_utils;
pub mod settings;
