//! Reading of the subheaders named on the command line
use log::{debug, info, warn};
use memmap2::Mmap;
use nitf_imhdr::{CodecError, CodecResult, ImageSegmentHeader, Policy, Version};
use rayon::prelude::*;
use serde_json::{json, Value as Json};
use std::fs::File;

use crate::cli::Cli;

/// Top level handler for all program logic
pub struct Handler {
    /// Input file path
    pub input: std::path::PathBuf,
    /// Memory map of the input file
    pub mmap: Mmap,
    /// Subheader offsets
    pub offsets: Vec<usize>,
    /// Subheader version
    pub version: Version,
    /// Correction policy
    pub policy: Policy,
    /// Decode mask subheaders
    pub mask: bool,
}

impl Handler {
    fn segment(&self, offset: usize) -> CodecResult<Json> {
        let bytes = &self.mmap[..];
        let (mut header, consumed) =
            ImageSegmentHeader::from_bytes(bytes, offset, self.version, self.policy)?;
        info!(
            "Subheader at {offset}: {} bytes, {} band(s), IC={}",
            consumed,
            header.band_count(),
            header.ic()
        );
        if self.mask && header.is_masked() {
            let mask_len = header.read_mask_subheader(bytes, offset + consumed)?;
            debug!("Mask subheader at {}: {mask_len} bytes", offset + consumed);
        } else if self.mask {
            debug!("Subheader at {offset} is not masked");
        }
        Ok(json!({
            "offset": offset,
            "length": consumed,
            "complexity_level": header.complexity_level(),
            "uncompressed_size": header.full_uncompressed_image_size(),
            "header": header.to_json(),
        }))
    }

    /// Decode every requested subheader, in parallel
    pub fn run(&self) -> CodecResult<Vec<Json>> {
        self.offsets
            .par_iter()
            .map(|&offset| {
                self.segment(offset).map_err(|e| {
                    warn!("Failed to read subheader at {offset}: {e}");
                    e
                })
            })
            .collect()
    }
}

impl TryFrom<&Cli> for Handler {
    type Error = CodecError;
    fn try_from(args: &Cli) -> CodecResult<Self> {
        let file = File::open(&args.input)?;
        // The map is read only and dropped before the process exits
        let mmap = unsafe { Mmap::map(&file)? };
        debug!("Mapped {} bytes of {:?}", mmap.len(), args.input);
        Ok(Self {
            input: args.input.clone(),
            mmap,
            offsets: args.offset.clone(),
            version: args.version(),
            policy: args.policy.into(),
            mask: args.mask,
        })
    }
}
