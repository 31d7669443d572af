pub mod garment;

pub use garment::{GarmentRecord, HostedImageRef, NewClothingRecord, PersistenceFailure};
