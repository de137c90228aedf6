pub mod cross_entropy;
pub mod mixup;

pub use cross_entropy::CrossEntropyLoss;
pub use mixup::{mixup_criterion, mixup_cross_entropy, mixup_gradient, mixup_correct};
