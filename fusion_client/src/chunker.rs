use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of parts a payload of `total` bytes splits into; the final part may be shorter.
pub fn part_count(total: u64, part_size: u64) -> u64 {
    total.div_ceil(part_size.max(1))
}

/// Splits a byte stream into sequential parts of exactly `part_size` bytes, except for a shorter
/// final part.  Part numbers start at 1 and follow read order.
pub struct ChunkReader<R> {
    reader: R,
    part_size: u64,
    parts_read: u32,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, part_size: u64) -> Self {
        Self {
            reader,
            part_size: part_size.max(1),
            parts_read: 0,
        }
    }

    /// The next numbered part, or `None` once the stream is exhausted.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<(u32, Bytes)>> {
        let mut buffer = Vec::with_capacity(self.part_size.min(usize::MAX as u64) as usize);
        (&mut self.reader).take(self.part_size).read_to_end(&mut buffer).await?;
        if buffer.is_empty() {
            return Ok(None);
        }

        let part_no = self.parts_read.checked_add(1).ok_or_else(|| {
            std::io::Error::other(format!("payload exceeds {} parts of {} bytes", u32::MAX, self.part_size))
        })?;
        self.parts_read = part_no;
        Ok(Some((part_no, buffer.into())))
    }

    /// Number of parts produced so far.
    pub fn parts_read(&self) -> u32 {
        self.parts_read
    }
}
