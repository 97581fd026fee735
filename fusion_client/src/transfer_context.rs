use std::fmt::{Display, Formatter};

use fusion_types::{Operation, UploadedPart};

use crate::error::{FusionClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Initiated,
    InProgress,
    Transferred,
    Completed,
    Aborted,
    InError,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Aborted | TransferStatus::InError)
    }
}

impl Display for TransferStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransferStatus::Initiated => "INITIATED",
            TransferStatus::InProgress => "IN_PROGRESS",
            TransferStatus::Transferred => "TRANSFERRED",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Aborted => "ABORTED",
            TransferStatus::InError => "IN_ERROR",
        };
        f.write_str(name)
    }
}

/// A part acknowledged by the server, with the raw digest computed for it before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPartContext {
    pub part_no: u32,
    pub digest: Vec<u8>,
    pub part: UploadedPart,
}

/// Progress of one multipart upload session.
///
/// Owned by a single orchestrator task; workers hand their results back rather than
/// touching the context.
#[derive(Debug, Clone)]
pub struct TransferContext {
    operation: Option<Operation>,
    status: TransferStatus,
    parts: Vec<UploadedPartContext>,
    chunk_size_bytes: u64,
    total_bytes_transferred: u64,
    total_parts_count: u32,
}

impl TransferContext {
    pub fn started(operation: Operation) -> Self {
        Self::with_status(Some(operation), TransferStatus::Initiated)
    }

    pub fn in_error() -> Self {
        Self::with_status(None, TransferStatus::InError)
    }

    fn with_status(operation: Option<Operation>, status: TransferStatus) -> Self {
        Self {
            operation,
            status,
            parts: Vec::new(),
            chunk_size_bytes: 0,
            total_bytes_transferred: 0,
            total_parts_count: 0,
        }
    }

    fn illegal(&self, transition: &str) -> FusionClientError {
        FusionClientError::IllegalState(format!("cannot move to {transition} from {}", self.status))
    }

    pub fn in_progress(&mut self) -> Result<()> {
        match self.status {
            TransferStatus::Initiated | TransferStatus::InProgress => {
                self.status = TransferStatus::InProgress;
                Ok(())
            },
            _ => Err(self.illegal("IN_PROGRESS")),
        }
    }

    pub fn part_uploaded(&mut self, part: UploadedPartContext) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("IN_PROGRESS"));
        }
        self.parts.push(part);
        self.status = TransferStatus::InProgress;
        Ok(())
    }

    pub fn transferred(&mut self, chunk_size_bytes: u64, total_bytes: u64, parts_count: u32) -> Result<()> {
        let legal = match self.status {
            TransferStatus::InProgress => true,
            TransferStatus::Initiated => !self.parts.is_empty(),
            _ => false,
        };
        if !legal {
            return Err(self.illegal("TRANSFERRED"));
        }
        self.chunk_size_bytes = chunk_size_bytes;
        self.total_bytes_transferred = total_bytes;
        self.total_parts_count = parts_count;
        self.status = TransferStatus::Transferred;
        Ok(())
    }

    pub fn completed(&mut self) -> Result<()> {
        if !self.can_proceed_to_complete() {
            return Err(self.illegal("COMPLETED"));
        }
        self.status = TransferStatus::Completed;
        Ok(())
    }

    pub fn aborted(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("ABORTED"));
        }
        self.status = TransferStatus::Aborted;
        Ok(())
    }

    pub fn can_proceed_to_transfer(&self) -> bool {
        self.status == TransferStatus::Initiated
    }

    pub fn can_proceed_to_complete(&self) -> bool {
        self.status == TransferStatus::Transferred && !self.parts.is_empty()
    }

    /// Raw part digests concatenated in part-number order, whatever order the parts finished in.
    pub fn digests(&self) -> Vec<u8> {
        self.sorted().flat_map(|p| p.digest.iter().copied()).collect()
    }

    /// The server part descriptors in part-number order.
    pub fn sorted_parts(&self) -> Vec<UploadedPart> {
        self.sorted().map(|p| p.part.clone()).collect()
    }

    fn sorted(&self) -> impl Iterator<Item = &UploadedPartContext> {
        let mut parts: Vec<_> = self.parts.iter().collect();
        parts.sort_by_key(|p| p.part_no);
        parts.into_iter()
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn parts(&self) -> &[UploadedPartContext] {
        &self.parts
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_bytes
    }

    pub fn total_bytes_transferred(&self) -> u64 {
        self.total_bytes_transferred
    }

    pub fn total_parts_count(&self) -> u32 {
        self.total_parts_count
    }
}
