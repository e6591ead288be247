use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;

use crate::models::image_log::ImageLog;

/// Bounded, in-memory record of received and produced files. The oldest
/// entry is dropped once `capacity` is reached.
pub struct AuditLog {
    entries: Mutex<VecDeque<ImageLog>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn record(&self, filename: &str, operation: &str, processed: bool) -> ImageLog {
        let entry = ImageLog {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            filename: filename.to_string(),
            operation: operation.to_string(),
            processed,
            created_at: Utc::now().to_rfc3339(),
        };
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Newest first, at most `limit` entries.
    pub fn list(&self, limit: usize) -> Vec<ImageLog> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
