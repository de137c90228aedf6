pub mod augment;
pub mod dataset;
pub mod image_folder;
pub mod loader;

pub use augment::Augmentation;
pub use dataset::{Batch, Dataset, ImageShape, Split};
pub use image_folder::ImageFolder;
pub use loader::{BatchSource, DataLoader};
