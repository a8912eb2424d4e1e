#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use regkit::{
    DiscoverySettings, InstanceDescriptor, LocalAddressResolver, OperationKind, RegistryClient,
    RegistryFailure,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone)]
pub struct Call {
    pub op: OperationKind,
    pub service: String,
    pub group: String,
    pub instance: InstanceDescriptor,
}

/// Records every call; optionally rejects adds or removes.
#[derive(Default)]
pub struct RecordingRegistry {
    calls: Mutex<Vec<Call>>,
    pub fail_add: bool,
    pub fail_remove: bool,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_add() -> Arc<Self> {
        Arc::new(Self {
            fail_add: true,
            ..Self::default()
        })
    }

    pub fn failing_remove() -> Arc<Self> {
        Arc::new(Self {
            fail_remove: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn record(&self, op: OperationKind, service: &str, group: &str, instance: &InstanceDescriptor) {
        self.calls.lock().push(Call {
            op,
            service: service.to_string(),
            group: group.to_string(),
            instance: instance.clone(),
        });
    }
}

#[async_trait]
impl RegistryClient for RecordingRegistry {
    async fn add_instance(
        &self,
        service_name: &str,
        group_name: &str,
        instance: &InstanceDescriptor,
    ) -> Result<(), RegistryFailure> {
        self.record(OperationKind::Register, service_name, group_name, instance);
        if self.fail_add {
            return Err(RegistryFailure::Rejected {
                code: 500,
                message: "add refused".into(),
            });
        }
        Ok(())
    }

    async fn remove_instance(
        &self,
        service_name: &str,
        group_name: &str,
        instance: &InstanceDescriptor,
    ) -> Result<(), RegistryFailure> {
        self.record(OperationKind::Deregister, service_name, group_name, instance);
        if self.fail_remove {
            return Err(RegistryFailure::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

/// Hands out `10.0.0.1`, `10.0.0.2`, ... one per lookup.
#[derive(Default)]
pub struct SequenceResolver(AtomicUsize);

impl LocalAddressResolver for SequenceResolver {
    fn current_machine_address(&self) -> String {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        format!("10.0.0.{n}")
    }
}

pub fn settings(enabled: bool, template: InstanceDescriptor, app: &str) -> Arc<DiscoverySettings> {
    Arc::new(DiscoverySettings::new(enabled, template, app).unwrap())
}

/// In-memory sink for a thread-local fmt subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

pub struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.0.clone())
    }
}

/// Capture logs emitted on the current thread until the guard drops.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buf = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buf, guard)
}
