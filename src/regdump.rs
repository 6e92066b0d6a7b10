//! Raw register dumps
//!
//! The plainest possible song format: R0-R15 for each frame, 16 bytes per
//! frame, frames back to back. An R13 byte of `0xFF` means the envelope shape
//! was not written that frame.

use std::path::Path;

use crate::{Result, SynthError};

/// Bytes per frame.
pub const FRAME_SIZE: usize = 16;

/// Split a dump into frames.
pub fn parse_frames(data: &[u8]) -> Result<Vec<[u8; FRAME_SIZE]>> {
    if data.len() % FRAME_SIZE != 0 {
        return Err(SynthError::ParseError(format!(
            "register dump length {} is not a multiple of {}",
            data.len(),
            FRAME_SIZE
        )));
    }
    let frames: Vec<[u8; FRAME_SIZE]> = data
        .chunks_exact(FRAME_SIZE)
        .map(|chunk| {
            let mut frame = [0u8; FRAME_SIZE];
            frame.copy_from_slice(chunk);
            frame
        })
        .collect();
    tracing::debug!(frames = frames.len(), "parsed register dump");
    Ok(frames)
}

/// Read and split a dump file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<[u8; FRAME_SIZE]>> {
    let data = std::fs::read(path)?;
    parse_frames(&data)
}

/// Flatten frames back into dump bytes.
pub fn to_bytes(frames: &[[u8; FRAME_SIZE]]) -> Vec<u8> {
    frames.iter().flatten().copied().collect()
}
