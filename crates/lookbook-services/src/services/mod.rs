pub mod background_removal;
pub mod image_host;
pub mod vision;
pub mod wardrobe;
