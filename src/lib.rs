//! Batch conversion of sketch images into illustrated pages through a
//! streaming responses API, with skip-on-exists resumability.

mod error;
mod http;

pub mod batch;
pub mod client;
pub mod config;
pub mod decoder;
pub mod event;
pub mod request;
pub mod sse;

#[doc(hidden)]
pub mod test_support;

pub use error::{IllustrateError, Result};

pub use batch::{BatchDriver, BatchReport, FileOutcome, FileReport, OutputEntry};
pub use client::{ImageGenerator, ResponsesImageClient};
pub use config::{BatchSettings, Config, Env};
pub use decoder::{DecodedStream, ImageStreamDecoder, decode_image_stream};
pub use event::{CompletedResponse, OutputItem, StreamEvent};
pub use request::{ContentBlock, GenerationRequest, ImageMediaType, MessageTurn, ToolDirective};
