//! Pre-rendered report images shown alongside the computed views.

use std::path::PathBuf;

use crate::config::ReportImageConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportImage {
    pub title: String,
    pub path: PathBuf,
    /// Pixel size, or the reason the image could not be read.
    pub dimensions: Result<(u32, u32), String>,
}

/// Probe every configured image. Unreadable images are logged and reported,
/// never fatal.
pub fn inspect(images: &[ReportImageConfig]) -> Vec<ReportImage> {
    images
        .iter()
        .map(|img| {
            let dimensions = image::image_dimensions(&img.path).map_err(|e| e.to_string());
            if let Err(e) = &dimensions {
                log::warn!("Report image '{}' ({}) unavailable: {e}", img.title, img.path.display());
            }
            ReportImage {
                title: img.title.clone(),
                path: img.path.clone(),
                dimensions,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dimensions_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("graph3.png");
        image::RgbImage::new(12, 7).save(&present).unwrap();

        let report = inspect(&[
            ReportImageConfig {
                title: "daily".to_string(),
                path: present,
            },
            ReportImageConfig {
                title: "colours".to_string(),
                path: dir.path().join("graph4.png"),
            },
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].dimensions, Ok((12, 7)));
        assert!(report[1].dimensions.is_err());
    }
}
