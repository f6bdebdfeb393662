//! FileSink - writes raw frames plus a JSON-lines index to disk

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{CameraError, Frame, FrameGeometry, FrameMetadata, FrameSink, SinkStatus};
use serde::Serialize;
use tracing::{debug, instrument};

/// Name of the metadata index inside the output directory
pub const INDEX_FILE: &str = "frames.jsonl";

/// One line of the metadata index
#[derive(Debug, Serialize)]
struct IndexRecord<'a> {
    file: &'a str,
    geometry: &'a FrameGeometry,
    metadata: &'a FrameMetadata,
}

/// Sink that writes frames to disk files
pub struct FileSink {
    name: String,
    base_path: PathBuf,
    index: BufWriter<File>,
}

impl FileSink {
    /// Create a new FileSink writing under `base_path`
    pub fn new(name: impl Into<String>, base_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        let index = File::options()
            .create(true)
            .append(true)
            .open(base_path.join(INDEX_FILE))?;

        Ok(Self {
            name: name.into(),
            base_path,
            index: BufWriter::new(index),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File name used for a frame
    pub fn frame_file_name(frame_index: u64) -> String {
        format!("frame_{frame_index:06}.raw")
    }

    fn write_frame_to_disk(&mut self, frame: &Frame) -> std::io::Result<()> {
        let file_name = Self::frame_file_name(frame.metadata.frame_index);
        fs::write(self.base_path.join(&file_name), &frame.data)?;

        let record = IndexRecord {
            file: &file_name,
            geometry: &frame.geometry,
            metadata: &frame.metadata,
        };
        serde_json::to_writer(&mut self.index, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.index.write_all(b"\n")?;
        Ok(())
    }

    fn sink_error(&self, e: std::io::Error) -> CameraError {
        CameraError::sink_write(&self.name, e.to_string())
    }
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_insert",
        skip(self, frame),
        fields(sink = %self.name, frame_index = frame.metadata.frame_index)
    )]
    fn insert(&mut self, frame: &Frame) -> Result<SinkStatus, CameraError> {
        self.write_frame_to_disk(frame)
            .map_err(|e| self.sink_error(e))?;
        Ok(SinkStatus::Accepted)
    }

    fn clear(&mut self) -> Result<(), CameraError> {
        // Written frames are not reclaimed
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CameraError> {
        self.index.flush().map_err(|e| self.sink_error(e))?;
        debug!(sink = %self.name, path = %self.base_path.display(), "FileSink flushed");
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.index.flush();
    }
}
