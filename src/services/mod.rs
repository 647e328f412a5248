pub mod config_editor;
pub mod frame_encoder;
pub mod orientation;
pub mod plate_layout;
pub mod progress;

pub use frame_encoder::FrameTransformEncoder;
pub use orientation::{OrientationCheck, OrientationClassifier};
pub use plate_layout::PlateLayout;
pub use progress::ProgressTracker;
