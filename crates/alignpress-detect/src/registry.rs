use std::sync::Arc;

use alignpress_core::{DetectionOutcome, DetectorParams, GrayImageView, Roi};
use alignpress_vision::VisionPrimitives;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::contour::ContourDetector;
use crate::marker::MarkerDetector;
use crate::{DetectError, PoseDetector};

/// Named strategies in registration order.
///
/// Registries are plain values; each aligner holds its own (usually shared
/// through an `Arc`).
#[derive(Clone, Default)]
pub struct DetectorRegistry {
    entries: Vec<(String, Arc<dyn PoseDetector>)>,
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `contour` then `marker`, both backed by `vision`.
    pub fn with_builtins(vision: Arc<dyn VisionPrimitives>) -> Self {
        let mut registry = Self::new();
        registry.register(ContourDetector::NAME, Arc::new(ContourDetector::new(vision.clone())));
        registry.register(MarkerDetector::NAME, Arc::new(MarkerDetector::new(vision)));
        registry
    }

    /// Add a strategy; re-registering a name replaces it in place.
    pub fn register(&mut self, name: impl Into<String>, detector: Arc<dyn PoseDetector>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = detector,
            None => self.entries.push((name, detector)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PoseDetector>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `primary` first, then every other registered name in registration order.
    ///
    /// `primary` is listed even when nothing is registered under it.
    pub fn detection_order<'a>(&'a self, primary: &'a str) -> Vec<&'a str> {
        std::iter::once(primary)
            .chain(self.names().filter(|n| *n != primary))
            .collect()
    }

    /// Run the fallback chain over `roi`, clamped to the frame first.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame, params),
            fields(roi = ?roi, primary = primary)
        )
    )]
    pub fn detect(
        &self,
        frame: &GrayImageView<'_>,
        roi: Roi,
        params: &DetectorParams,
        primary: &str,
    ) -> DetectionOutcome {
        let Some(clamped) = roi.clamp_to(frame.width, frame.height) else {
            log::debug!("roi {roi:?} does not overlap the {}x{} frame", frame.width, frame.height);
            return DetectionOutcome::NotFound;
        };
        for name in self.detection_order(primary) {
            let Some(detector) = self.get(name) else {
                log::debug!("no detector registered as {name:?}, skipping");
                continue;
            };
            if let Some(pose) = detector.detect(frame, clamped, params.for_detector(name)) {
                log::debug!("{name} found pose at ({:.1}, {:.1})", pose.center.x, pose.center.y);
                return DetectionOutcome::found(pose, name);
            }
        }
        DetectionOutcome::NotFound
    }

    /// Check that every strategy reachable from `primary` accepts its params.
    pub fn validate(&self, params: &DetectorParams, primary: &str) -> Result<(), DetectError> {
        for name in self.detection_order(primary) {
            if let Some(detector) = self.get(name) {
                detector.validate_params(params.for_detector(name))?;
            }
        }
        Ok(())
    }
}
