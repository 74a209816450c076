//! Domain logic for segment staging and reassembly.

pub mod errors;
pub mod reassembler;

pub use errors::ReassemblyError;
pub use reassembler::{
    Assembly, CompleteMessage, SegmentReassembler, StageOutcome, StagedSegment,
};
