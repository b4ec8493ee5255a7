//! Sequential batch runs over a frame source.

use serde::{Deserialize, Serialize};
use serde_json::json;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::aligner::{Aligner, FrameAnalysis};
use crate::sink::{ResultLogError, ResultSink};
use crate::source::{FramePacket, SourceError};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sink(#[from] ResultLogError),
}

/// Keys added to every record of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub preset_name: String,
    pub dataset_path: String,
}

/// Drives one [`Aligner`] over a frame sequence.
pub struct SessionRunner<'a> {
    aligner: &'a Aligner,
    context: SessionContext,
    max_frames: Option<usize>,
}

impl<'a> SessionRunner<'a> {
    pub fn new(aligner: &'a Aligner, context: SessionContext) -> Self {
        Self {
            aligner,
            context,
            max_frames: None,
        }
    }

    /// Stop after `n` frames.
    pub fn with_max_frames(mut self, n: Option<usize>) -> Self {
        self.max_frames = n;
        self
    }

    /// Process frames in order, forwarding each record to `sink`.
    ///
    /// The sink is opened before the first frame and closed exactly once,
    /// also when the source or the sink fails midway. The first error wins.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(session = %self.context.session_id))
    )]
    pub fn run<I, S>(&self, frames: I, sink: &mut S) -> Result<Vec<FrameAnalysis>, SessionError>
    where
        I: IntoIterator<Item = Result<FramePacket, SourceError>>,
        S: ResultSink + ?Sized,
    {
        sink.open()?;
        let mut analyses = Vec::new();
        let outcome = self.drive(frames, sink, &mut analyses);
        let closed = sink.close();
        outcome?;
        closed?;
        log::info!(
            "session {}: {} frame(s) processed",
            self.context.session_id,
            analyses.len()
        );
        Ok(analyses)
    }

    fn drive<I, S>(
        &self,
        frames: I,
        sink: &mut S,
        analyses: &mut Vec<FrameAnalysis>,
    ) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = Result<FramePacket, SourceError>>,
        S: ResultSink + ?Sized,
    {
        if self.max_frames == Some(0) {
            return Ok(());
        }
        for packet in frames {
            let packet = packet?;
            let analysis = self
                .aligner
                .process(&packet.image.view(), packet.timestamp, packet.frame_id);
            let mut record = analysis.to_record();
            record.insert("session_id".into(), json!(self.context.session_id));
            record.insert("preset_name".into(), json!(self.context.preset_name));
            record.insert("dataset_path".into(), json!(self.context.dataset_path));
            sink.record(&record)?;
            analyses.push(analysis);
            if self.max_frames.is_some_and(|max| analyses.len() >= max) {
                break;
            }
        }
        Ok(())
    }
}
