//! Raw payload buffer with reserved head and tail room
//!
//! ```text
//! |<- prebuffer ->|<------- logical data ------->|<- postbuffer ->|
//! 0               offset                                          total
//! ```
//!
//! Headers can be prepended by moving `offset` back into the prebuffer,
//! without shifting the data already written. The three regions always add
//! up to the total capacity.

/// Fixed-size byte buffer with head and tail room
#[derive(Debug, Clone)]
pub struct RawPayloadBuffer {
    storage: Box<[u8]>,
    prebuffer: usize,
    size: usize,
}

impl RawPayloadBuffer {
    /// Allocate a zeroed buffer of `size` logical bytes plus head and tail room
    pub fn new(prebuffer: usize, size: usize, postbuffer: usize) -> Self {
        Self {
            storage: vec![0u8; prebuffer + size + postbuffer].into_boxed_slice(),
            prebuffer,
            size,
        }
    }

    /// Logical data
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.prebuffer..self.prebuffer + self.size]
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn prebuffer_capacity(&self) -> usize {
        self.prebuffer
    }

    pub fn postbuffer_capacity(&self) -> usize {
        self.storage.len() - self.prebuffer - self.size
    }

    pub fn total_capacity(&self) -> usize {
        self.storage.len()
    }

    /// Replace the logical data, leaving `prebuffer` bytes of head room
    ///
    /// Returns false (and leaves the buffer untouched) if the data does not
    /// fit behind that head room.
    pub fn fill(&mut self, data: &[u8], prebuffer: usize) -> bool {
        if prebuffer + data.len() > self.storage.len() {
            return false;
        }
        self.storage[prebuffer..prebuffer + data.len()].copy_from_slice(data);
        self.prebuffer = prebuffer;
        self.size = data.len();
        true
    }

    /// Write `header` directly in front of the logical data
    pub fn prepend(&mut self, header: &[u8]) -> bool {
        if header.len() > self.prebuffer {
            return false;
        }
        let start = self.prebuffer - header.len();
        self.storage[start..self.prebuffer].copy_from_slice(header);
        self.prebuffer = start;
        self.size += header.len();
        true
    }

    /// Write `trailer` directly after the logical data
    pub fn append(&mut self, trailer: &[u8]) -> bool {
        if trailer.len() > self.postbuffer_capacity() {
            return false;
        }
        let end = self.prebuffer + self.size;
        self.storage[end..end + trailer.len()].copy_from_slice(trailer);
        self.size += trailer.len();
        true
    }
}
