//! Layer pairing and image reconstruction.
//!
//! For each page:
//! 1. The scanner resolves every embedded image with its placement rectangle
//! 2. The grouper buckets images by their rounded top-left corner
//! 3. Two-image groups are split into base and overlay by the classifier
//! 4. The overlay's black matte is made transparent and it is composited onto the base
//! 5. Text directly below the pair becomes its caption
//!
//! Single images are passed through untouched when the request asks for them.

pub mod caption;
pub mod classifier;
pub mod compositing;
pub mod grouping;
pub mod matte;
pub mod page;
pub mod scanner;
pub mod types;

pub use caption::read_caption;
pub use classifier::is_likely_overlay;
pub use compositing::composite_layers;
pub use grouping::{LayerGroupKey, LayerGroups, group_layers};
pub use matte::remove_black_matte;
pub use page::PageProcessor;
pub use scanner::{PageScan, ScanWarning, scan_page};
pub use types::{ProcessedImage, RawImage};
