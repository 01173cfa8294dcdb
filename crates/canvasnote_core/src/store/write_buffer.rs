//! Write coalescing schedule.
//!
//! # Invariants
//! - A write arriving when the last flush is at least `min_interval_ms` old is
//!   due immediately (at the next turn), so same-turn writes share a batch.
//! - Otherwise the batch is due at `last_flush + min_interval_ms`.
//! - Coalescing keeps one op per key: the last one queued.

use std::collections::HashMap;

use crate::store::backend::{WriteKey, WriteOp};

/// Queued write with the notification it produces once durable.
#[derive(Debug, Clone)]
pub(crate) struct QueuedWrite<N> {
    pub op: WriteOp,
    pub notice: N,
}

#[derive(Debug)]
pub(crate) struct WriteBuffer<N> {
    min_interval_ms: i64,
    queue: Vec<QueuedWrite<N>>,
    last_flush_ms: Option<i64>,
    due_at_ms: Option<i64>,
}

impl<N> WriteBuffer<N> {
    pub fn new(min_interval_ms: i64) -> Self {
        Self {
            min_interval_ms: min_interval_ms.max(0),
            queue: Vec::new(),
            last_flush_ms: None,
            due_at_ms: None,
        }
    }

    pub fn enqueue(&mut self, write: QueuedWrite<N>, now_ms: i64) {
        self.queue.push(write);
        if self.due_at_ms.is_none() {
            self.due_at_ms = Some(self.next_slot(now_ms));
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn due_at(&self) -> Option<i64> {
        self.due_at_ms
    }

    pub fn is_due(&self, now_ms: i64) -> bool {
        self.due_at_ms.is_some_and(|due| due <= now_ms)
    }

    /// Removes the whole queue and marks `now_ms` as the flush time.
    pub fn take_batch(&mut self, now_ms: i64) -> Vec<QueuedWrite<N>> {
        self.due_at_ms = None;
        self.last_flush_ms = Some(now_ms);
        std::mem::take(&mut self.queue)
    }

    /// Puts a failed batch back in front of anything queued since, and
    /// schedules a retry one window later.
    pub fn restore(&mut self, mut batch: Vec<QueuedWrite<N>>, now_ms: i64) {
        batch.append(&mut self.queue);
        self.queue = batch;
        self.due_at_ms = Some(now_ms + self.min_interval_ms);
    }

    fn next_slot(&self, now_ms: i64) -> i64 {
        match self.last_flush_ms {
            Some(last) if now_ms - last < self.min_interval_ms => last + self.min_interval_ms,
            _ => now_ms,
        }
    }
}

/// Collapses a batch to the last op per key, ordered by each key's last
/// arrival.
pub(crate) fn coalesce<N>(batch: &[QueuedWrite<N>]) -> Vec<WriteOp> {
    let mut last_index: HashMap<WriteKey, usize> = HashMap::new();
    for (index, write) in batch.iter().enumerate() {
        last_index.insert(write.op.key(), index);
    }
    batch
        .iter()
        .enumerate()
        .filter(|(index, write)| last_index.get(&write.op.key()) == Some(index))
        .map(|(_, write)| write.op.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{coalesce, QueuedWrite, WriteBuffer};
    use crate::store::backend::{SerializedConcept, WriteOp};
    use uuid::Uuid;

    fn put(id: Uuid, json: &str) -> QueuedWrite<()> {
        QueuedWrite {
            op: WriteOp::PutConcept(SerializedConcept {
                id,
                kind: "text".to_string(),
                json: json.to_string(),
            }),
            notice: (),
        }
    }

    #[test]
    fn first_write_is_due_immediately() {
        let mut buffer = WriteBuffer::new(500);
        buffer.enqueue(put(Uuid::new_v4(), "{}"), 1_000);
        assert_eq!(buffer.due_at(), Some(1_000));
        assert!(buffer.is_due(1_000));
    }

    #[test]
    fn write_after_recent_flush_waits_for_window() {
        let mut buffer = WriteBuffer::new(500);
        buffer.enqueue(put(Uuid::new_v4(), "{}"), 1_000);
        let _ = buffer.take_batch(1_000);

        buffer.enqueue(put(Uuid::new_v4(), "{}"), 1_200);
        assert_eq!(buffer.due_at(), Some(1_500));
        assert!(!buffer.is_due(1_499));
        assert!(buffer.is_due(1_500));
    }

    #[test]
    fn write_after_quiet_period_is_due_immediately() {
        let mut buffer = WriteBuffer::new(500);
        buffer.enqueue(put(Uuid::new_v4(), "{}"), 1_000);
        let _ = buffer.take_batch(1_000);

        buffer.enqueue(put(Uuid::new_v4(), "{}"), 2_000);
        assert_eq!(buffer.due_at(), Some(2_000));
    }

    #[test]
    fn restore_keeps_order_and_delays_retry() {
        let mut buffer = WriteBuffer::new(500);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        buffer.enqueue(put(first, "{}"), 0);
        let failed = buffer.take_batch(0);
        buffer.enqueue(put(second, "{}"), 10);
        buffer.restore(failed, 10);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.due_at(), Some(510));
        let batch = buffer.take_batch(510);
        assert!(matches!(&batch[0].op, WriteOp::PutConcept(concept) if concept.id == first));
    }

    #[test]
    fn coalesce_keeps_last_write_per_key() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let batch = vec![put(id, "1"), put(other, "a"), put(id, "2"), put(id, "3")];
        let ops = coalesce(&batch);

        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], WriteOp::PutConcept(concept) if concept.id == other));
        assert!(matches!(&ops[1], WriteOp::PutConcept(concept) if concept.json == "3"));
    }
}
