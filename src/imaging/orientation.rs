//! EXIF orientation correction.
//!
//! Cameras store the sensor readout as-is and record how to display it in
//! TIFF tag `0x0112` (EXIF code 274). The eight standard codes map to a
//! flip and/or quarter-turn:
//!
//! | Code | Transform |
//! |---|---|
//! | 1 | identity |
//! | 2 | flip horizontal |
//! | 3 | rotate 180° |
//! | 4 | flip vertical |
//! | 5 | flip horizontal, then rotate 270° |
//! | 6 | rotate 90° |
//! | 7 | flip horizontal, then rotate 90° |
//! | 8 | rotate 270° |
//!
//! Anything else, a missing tag, or unreadable EXIF is treated as identity.

use image::DynamicImage;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

/// Display transform decoded from the EXIF orientation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    FlipHorizontalRotate270,
    Rotate90,
    FlipHorizontalRotate90,
    Rotate270,
}

impl Orientation {
    /// Map an EXIF orientation code. Out-of-range codes fall back to identity.
    pub fn from_exif(code: u32) -> Self {
        match code {
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::FlipHorizontalRotate270,
            6 => Self::Rotate90,
            7 => Self::FlipHorizontalRotate90,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    /// The EXIF code this transform corresponds to.
    pub fn exif_code(self) -> u16 {
        match self {
            Self::Normal => 1,
            Self::FlipHorizontal => 2,
            Self::Rotate180 => 3,
            Self::FlipVertical => 4,
            Self::FlipHorizontalRotate270 => 5,
            Self::Rotate90 => 6,
            Self::FlipHorizontalRotate90 => 7,
            Self::Rotate270 => 8,
        }
    }

    /// Whether the transform exchanges width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::FlipHorizontalRotate270
                | Self::Rotate90
                | Self::FlipHorizontalRotate90
                | Self::Rotate270
        )
    }

    /// Apply the transform, producing a new image.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => image,
            Self::FlipHorizontal => image.fliph(),
            Self::Rotate180 => image.rotate180(),
            Self::FlipVertical => image.flipv(),
            Self::FlipHorizontalRotate270 => image.fliph().rotate270(),
            Self::Rotate90 => image.rotate90(),
            Self::FlipHorizontalRotate90 => image.fliph().rotate90(),
            Self::Rotate270 => image.rotate270(),
        }
    }
}

/// Read the orientation tag from an image file on disk.
///
/// Returns `None` when the file can't be opened, carries no EXIF, or has no
/// orientation tag, so callers can try another source before defaulting.
pub fn read_orientation(path: &Path) -> Option<Orientation> {
    let file = File::open(path).ok()?;
    orientation_from_reader(&mut BufReader::new(file))
}

/// Read the orientation tag from an in-memory container (JPEG or TIFF-based RAW).
pub fn orientation_from_bytes(bytes: &[u8]) -> Option<Orientation> {
    orientation_from_reader(&mut Cursor::new(bytes))
}

fn orientation_from_reader<R: BufRead + Seek>(reader: &mut R) -> Option<Orientation> {
    let exif = exif::Reader::new().read_from_container(reader).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0).map(Orientation::from_exif)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ExifFields, gradient_image, jpeg_bytes_with_exif, write_jpeg};
    use image::GenericImageView;

    fn sample_points(img: &DynamicImage) -> Vec<(u32, u32)> {
        let (w, h) = img.dimensions();
        vec![(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1), (w / 2, h / 3)]
    }

    #[test]
    fn codes_round_trip() {
        for code in 1..=8u32 {
            assert_eq!(Orientation::from_exif(code).exif_code() as u32, code);
        }
    }

    #[test]
    fn out_of_range_codes_are_identity() {
        assert_eq!(Orientation::from_exif(0), Orientation::Normal);
        assert_eq!(Orientation::from_exif(9), Orientation::Normal);
        assert_eq!(Orientation::from_exif(274), Orientation::Normal);
    }

    #[test]
    fn rotate_180_twice_is_identity() {
        let original = DynamicImage::ImageRgba8(gradient_image(7, 5));
        let once = Orientation::Rotate180.apply(original.clone());
        let twice = Orientation::Rotate180.apply(once);

        for (x, y) in sample_points(&original) {
            assert_eq!(original.get_pixel(x, y), twice.get_pixel(x, y), "({x},{y})");
        }
    }

    #[test]
    fn rotate_90_moves_bottom_left_to_top_left() {
        let original = DynamicImage::ImageRgba8(gradient_image(4, 3));
        let rotated = Orientation::Rotate90.apply(original.clone());

        assert_eq!(rotated.dimensions(), (3, 4));
        // Clockwise: the bottom-left pixel ends up top-left.
        assert_eq!(rotated.get_pixel(0, 0), original.get_pixel(0, 2));
    }

    #[test]
    fn flip_horizontal_mirrors_columns() {
        let original = DynamicImage::ImageRgba8(gradient_image(4, 3));
        let flipped = Orientation::FlipHorizontal.apply(original.clone());
        assert_eq!(flipped.get_pixel(0, 1), original.get_pixel(3, 1));
    }

    #[test]
    fn code_5_is_a_transpose() {
        let original = DynamicImage::ImageRgba8(gradient_image(4, 3));
        let out = Orientation::FlipHorizontalRotate270.apply(original.clone());
        assert_eq!(out.dimensions(), (3, 4));
        for (x, y) in [(0, 0), (1, 2), (3, 1)] {
            assert_eq!(out.get_pixel(y, x), original.get_pixel(x, y));
        }
    }

    #[test]
    fn swaps_axes_only_for_quarter_turns() {
        let swapping: Vec<u32> = (1..=8)
            .filter(|c| Orientation::from_exif(*c).swaps_axes())
            .collect();
        assert_eq!(swapping, vec![5, 6, 7, 8]);
    }

    #[test]
    fn read_orientation_from_jpeg_exif() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rotated.jpg");
        let exif = ExifFields {
            orientation: Some(6),
            ..Default::default()
        };
        std::fs::write(&path, jpeg_bytes_with_exif(16, 8, &exif)).unwrap();

        assert_eq!(read_orientation(&path), Some(Orientation::Rotate90));
    }

    #[test]
    fn read_orientation_none_without_exif() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.jpg");
        write_jpeg(&path, 16, 8);

        assert_eq!(read_orientation(&path), None);
    }

    #[test]
    fn read_orientation_none_for_missing_file() {
        assert_eq!(read_orientation(Path::new("/nonexistent/a.jpg")), None);
    }

    #[test]
    fn orientation_from_garbage_bytes_is_none() {
        assert_eq!(orientation_from_bytes(b"definitely not an image"), None);
    }
}
