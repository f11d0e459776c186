pub mod vision;
pub mod vision_structs;
pub mod weather;
