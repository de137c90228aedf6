pub mod classifier;
pub mod metadata;
pub mod network;
pub mod spec;

pub use classifier::{Classifier, Parameter};
pub use metadata::{InputType, ModelMetadata};
pub use network::Network;
pub use spec::{NetworkSpec, LayerSpec};
