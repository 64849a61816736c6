#![allow(dead_code)]

use async_trait::async_trait;
use loghub_shipper::record::CanonicalRecord;
use loghub_shipper::sink::LogSink;
use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;

/// Keeps every record it receives.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<CanonicalRecord>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<CanonicalRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Poll until `count` records arrived or two seconds passed.
    pub async fn wait_for(&self, count: usize) -> Vec<CanonicalRecord> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.len() < count && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.records()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn send(&self, record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Never completes a send.
pub struct HangingSink;

#[async_trait]
impl LogSink for HangingSink {
    async fn send(&self, _record: &CanonicalRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
