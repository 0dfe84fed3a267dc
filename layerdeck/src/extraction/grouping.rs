//! Layer grouping by placement.
//!
//! Overlay layers are drawn at the same spot as the artwork they annotate, so
//! images are bucketed by their top-left corner rounded to two decimal places.
//! Rounding absorbs float noise from the producer without merging images that
//! genuinely sit apart.

use indexmap::IndexMap;

use super::RawImage;

/// Top-left corner of a placement rectangle quantized to hundredths of a point.
///
/// Storing the rounded coordinates as integers makes key equality exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerGroupKey {
    x: i64,
    y: i64,
}

impl LayerGroupKey {
    pub fn from_corner(x: f64, y: f64) -> Self {
        Self {
            x: quantize(x),
            y: quantize(y),
        }
    }

    pub fn of(image: &RawImage) -> Self {
        Self::from_corner(image.placement.x1, image.placement.y1)
    }

    /// Rounded x coordinate
    pub fn x(&self) -> f64 {
        self.x as f64 / 100.0
    }

    /// Rounded y coordinate
    pub fn y(&self) -> f64 {
        self.y as f64 / 100.0
    }
}

fn quantize(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Images of one page keyed by rounded corner, in first-seen order
pub type LayerGroups = IndexMap<LayerGroupKey, Vec<RawImage>>;

/// Group a page's images by rounded placement.
///
/// Groups iterate in the order their first image was scanned and keep scan
/// order inside each group. This follows the content stream, which is not
/// necessarily the visual reading order of the page.
pub fn group_layers(images: Vec<RawImage>) -> LayerGroups {
    let mut groups = LayerGroups::new();
    for image in images {
        groups.entry(LayerGroupKey::of(&image)).or_default().push(image);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Rectangle;
    use image::ImageFormat;

    fn image_at(reference: usize, x: f64, y: f64) -> RawImage {
        RawImage {
            reference,
            bytes: vec![],
            format: ImageFormat::Png,
            placement: Rectangle::new(x, y, x + 100.0, y + 100.0),
        }
    }

    #[test]
    fn test_co_located_images_share_group() {
        let groups = group_layers(vec![
            image_at(0, 72.001, 144.004),
            image_at(1, 72.0, 144.0),
        ]);

        assert_eq!(groups.len(), 1);
        let (key, members) = groups.first().unwrap();
        assert_eq!(key.x(), 72.0);
        assert_eq!(key.y(), 144.0);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].reference, 0);
        assert_eq!(members[1].reference, 1);
    }

    #[test]
    fn test_distinct_corners_split() {
        let groups = group_layers(vec![
            image_at(0, 72.0, 144.0),
            image_at(1, 72.02, 144.0),
            image_at(2, 72.0, 144.02),
        ]);

        assert_eq!(groups.len(), 3);
        assert!(groups.values().all(|members| members.len() == 1));
    }

    #[test]
    fn test_group_order_follows_first_scan() {
        let groups = group_layers(vec![
            image_at(0, 300.0, 10.0),
            image_at(1, 10.0, 10.0),
            image_at(2, 300.0, 10.0),
        ]);

        let keys: Vec<f64> = groups.keys().map(|k| k.x()).collect();
        assert_eq!(keys, vec![300.0, 10.0]);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][1].reference, 2);
    }

    #[test]
    fn test_empty_page() {
        assert!(group_layers(vec![]).is_empty());
    }
}
