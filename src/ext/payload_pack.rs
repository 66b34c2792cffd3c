//! Call contract for the lossless payload-compression helper.

// self
use crate::_prelude::*;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Raised when packing or unpacking a payload fails.
#[derive(Debug, ThisError)]
#[error("Payload {operation} failed.")]
pub struct PackError {
	/// Which transform failed: `pack` or `unpack`.
	pub operation: &'static str,
	/// Underlying codec failure.
	#[source]
	pub source: BoxError,
}
impl PackError {
	/// Wraps a codec-specific failure for the given operation.
	pub fn new(operation: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self { operation, source: Box::new(src) }
	}
}

/// Pure byte-transform contract for lossless payload packing.
///
/// Implementations must round-trip exactly: `unpack(pack(x)) == x` for every input.
pub trait PayloadPacker
where
	Self: Send + Sync,
{
	/// Compresses a payload.
	fn pack(&self, bytes: &[u8]) -> Result<Vec<u8>, PackError>;

	/// Restores a payload produced by [`PayloadPacker::pack`].
	fn unpack(&self, bytes: &[u8]) -> Result<Vec<u8>, PackError>;
}
