use alignpress_aruco::{decode_marker_quad, DictionarySet, Matcher, QuadDecodeConfig};
use alignpress_core::GrayImageView;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::chessboard::{
    detect_chessboard, refine_corners_subpixel, ChessboardConfig, SubpixelConfig,
};
use crate::contours::{find_external_contours, Contour};
use crate::markers::find_marker_quads;
use crate::rect::min_area_rect;
use crate::{DecodedMarker, PatternSize, RotatedRect, VisionPrimitives};

/// Pure-Rust [`VisionPrimitives`].
///
/// The default instance decodes against the built-in dictionaries.
#[derive(Clone, Debug)]
pub struct NativeVision {
    pub dictionaries: DictionarySet,
    pub chessboard: ChessboardConfig,
    pub subpixel: SubpixelConfig,
    pub decode: QuadDecodeConfig,
    /// Smallest dark region (polygon area, px²) considered as a marker candidate.
    pub min_marker_area: f64,
}

impl Default for NativeVision {
    fn default() -> Self {
        Self::new(DictionarySet::builtin())
    }
}

impl NativeVision {
    pub fn new(dictionaries: DictionarySet) -> Self {
        Self {
            dictionaries,
            chessboard: ChessboardConfig::default(),
            subpixel: SubpixelConfig::default(),
            decode: QuadDecodeConfig::default(),
            min_marker_area: 64.0,
        }
    }
}

impl VisionPrimitives for NativeVision {
    fn find_chessboard_corners(
        &self,
        image: &GrayImageView<'_>,
        pattern: PatternSize,
    ) -> Option<Vec<Point2<f32>>> {
        detect_chessboard(image, pattern, &self.chessboard)
    }

    fn refine_subpixel(&self, image: &GrayImageView<'_>, corners: &mut [Point2<f32>]) {
        refine_corners_subpixel(image, corners, &self.subpixel);
    }

    fn find_external_contours(&self, binary: &GrayImageView<'_>) -> Vec<Contour> {
        find_external_contours(binary)
    }

    fn min_area_rect(&self, points: &[Point2<f32>]) -> Option<RotatedRect> {
        min_area_rect(points)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, image),
            fields(width = image.width, height = image.height)
        )
    )]
    fn decode_markers(&self, image: &GrayImageView<'_>, dictionary: &str) -> Vec<DecodedMarker> {
        let Some(dict) = self.dictionaries.get(dictionary) else {
            log::warn!("marker dictionary {dictionary:?} is not loaded");
            return Vec::new();
        };
        let matcher = Matcher::with_dictionary_correction(dict);
        let quads = find_marker_quads(image, self.min_marker_area);
        let markers: Vec<DecodedMarker> = quads
            .iter()
            .filter_map(|q| decode_marker_quad(image, q, &self.decode, &matcher))
            .map(|m| DecodedMarker {
                id: m.id,
                corners: m.corners,
            })
            .collect();
        log::debug!(
            "decoded {} of {} marker candidates ({dictionary})",
            markers.len(),
            quads.len()
        );
        markers
    }
}
