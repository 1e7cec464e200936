use crate::error::TransferError;

/// A finite byte source the sender side reads from. Implementations know
/// their own length, so they report whether a chunk is the transfer's last
/// one instead of the engine inferring it from a short read.
#[allow(async_fn_in_trait)]
pub trait ByteSource: Send {
    async fn read_chunk(&mut self, max: usize) -> Result<(Vec<u8>, bool), TransferError>;
}

/// The receiver side's output. One call per in-order DATA payload.
#[allow(async_fn_in_trait)]
pub trait ByteSink: Send {
    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), TransferError>;
}

/// An in-memory [`ByteSource`]/[`ByteSink`] pair, used by engine unit tests
/// and available to integration tests in the binary crates.
pub struct MemorySource {
    data: Vec<u8>,
    offset: usize,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        MemorySource { data, offset: 0 }
    }
}

impl ByteSource for MemorySource {
    async fn read_chunk(&mut self, max: usize) -> Result<(Vec<u8>, bool), TransferError> {
        let remaining = self.data.len() - self.offset;
        let take = remaining.min(max);
        let chunk = self.data[self.offset..self.offset + take].to_vec();
        self.offset += take;
        let is_last = self.offset == self.data.len();
        Ok((chunk, is_last))
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub data: Vec<u8>,
}

impl ByteSink for MemorySink {
    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.data.extend_from_slice(data);
        Ok(())
    }
}
