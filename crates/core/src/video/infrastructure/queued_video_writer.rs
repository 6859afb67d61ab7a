use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Moves encoding off the caller's thread.
///
/// The inner writer is opened synchronously, then owned by a dedicated
/// thread that drains a bounded queue in FIFO order. A full queue makes
/// [`is_ready_for_input`](VideoWriter::is_ready_for_input) return `false`,
/// which is how the recording engine learns to skip a frame instead of
/// blocking the tick. If the inner writer fails, the next append reports
/// the failure.
pub struct QueuedVideoWriter {
    inner: Option<Box<dyn VideoWriter>>,
    capacity: usize,
    frame_tx: Option<crossbeam_channel::Sender<(Frame, Duration)>>,
    handle: Option<JoinHandle<Box<dyn VideoWriter>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl QueuedVideoWriter {
    pub fn new(inner: Box<dyn VideoWriter>, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            frame_tx: None,
            handle: None,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    fn failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Closes the queue and waits for the writer thread to hand the inner
    /// writer back.
    fn join_writer(&mut self) -> Result<Box<dyn VideoWriter>, Box<dyn std::error::Error>> {
        drop(self.frame_tx.take());
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| "QueuedVideoWriter: writer thread panicked".into()),
            None => self
                .inner
                .take()
                .ok_or_else(|| "QueuedVideoWriter: not opened".into()),
        }
    }
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: crossbeam_channel::Receiver<(Frame, Duration)>,
    failure: Arc<Mutex<Option<String>>>,
) -> JoinHandle<Box<dyn VideoWriter>> {
    std::thread::spawn(move || {
        for (frame, timestamp) in write_rx {
            if let Err(e) = writer.write(&frame, timestamp) {
                log::error!("Writer thread failed at {timestamp:?}: {e}");
                *failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(e.to_string());
                break;
            }
        }
        writer
    })
}

impl VideoWriter for QueuedVideoWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = self
            .inner
            .take()
            .ok_or("QueuedVideoWriter: already opened")?;
        if let Err(e) = writer.open(path, metadata) {
            self.inner = Some(writer);
            return Err(e);
        }

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(self.capacity);
        self.handle = Some(spawn_writer(writer, frame_rx, Arc::clone(&self.failure)));
        self.frame_tx = Some(frame_tx);
        Ok(())
    }

    fn is_ready_for_input(&self) -> bool {
        self.frame_tx.as_ref().is_some_and(|tx| !tx.is_full())
    }

    fn write(
        &mut self,
        frame: &Frame,
        timestamp: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(message) = self.failure() {
            return Err(message.into());
        }
        let tx = self.frame_tx.as_ref().ok_or("QueuedVideoWriter: not opened")?;
        tx.try_send((frame.clone(), timestamp))
            .map_err(|e| -> Box<dyn std::error::Error> {
                match e {
                    crossbeam_channel::TrySendError::Full(_) => {
                        "QueuedVideoWriter: queue full".into()
                    }
                    crossbeam_channel::TrySendError::Disconnected(_) => self
                        .failure()
                        .unwrap_or_else(|| "QueuedVideoWriter: writer thread stopped".to_string())
                        .into(),
                }
            })
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.frame_tx.is_none() && self.handle.is_none() {
            return Ok(());
        }
        let mut writer = self.join_writer()?;
        if let Some(message) = self.failure() {
            writer.abort();
            return Err(message.into());
        }
        writer.close()
    }

    fn abort(&mut self) {
        match self.join_writer() {
            Ok(mut writer) => writer.abort(),
            Err(e) => log::warn!("Abort without a running writer: {e}"),
        }
    }
}

impl Drop for QueuedVideoWriter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        opened: bool,
        timestamps: Vec<Duration>,
        closed: bool,
        aborted: bool,
    }

    /// Writes are held until the test releases them through `gate`.
    struct GatedWriter {
        log: Arc<Mutex<Log>>,
        gate: Option<crossbeam_channel::Receiver<()>>,
        fail_on_write: bool,
        fail_on_open: bool,
    }

    impl GatedWriter {
        fn new(log: Arc<Mutex<Log>>) -> Self {
            Self {
                log,
                gate: None,
                fail_on_write: false,
                fail_on_open: false,
            }
        }
    }

    impl VideoWriter for GatedWriter {
        fn open(&mut self, _: &Path, _: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_on_open {
                return Err("cannot open".into());
            }
            self.log.lock().unwrap().opened = true;
            Ok(())
        }

        fn write(&mut self, _: &Frame, ts: Duration) -> Result<(), Box<dyn std::error::Error>> {
            if let Some(gate) = &self.gate {
                gate.recv().ok();
            }
            if self.fail_on_write {
                return Err("disk full".into());
            }
            self.log.lock().unwrap().timestamps.push(ts);
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().closed = true;
            Ok(())
        }

        fn abort(&mut self) {
            self.log.lock().unwrap().aborted = true;
        }
    }

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            width: 2,
            height: 2,
            fps: 30.0,
            duration: None,
            codec: String::new(),
            source: None,
        }
    }

    fn frame(i: usize) -> Frame {
        Frame::new(vec![0; 12], 2, 2, 3, i)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_writes_in_order_and_closes_inner() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut writer = QueuedVideoWriter::new(Box::new(GatedWriter::new(log.clone())), 4);
        writer.open(Path::new("/tmp/x.mp4"), &metadata()).unwrap();

        for i in 0..3 {
            writer.write(&frame(i), ms(i as u64 * 10 + 1)).unwrap();
        }
        writer.close().unwrap();

        let log = log.lock().unwrap();
        assert!(log.opened && log.closed && !log.aborted);
        assert_eq!(log.timestamps, vec![ms(1), ms(11), ms(21)]);
    }

    #[test]
    fn test_full_queue_is_not_ready() {
        let log = Arc::new(Mutex::new(Log::default()));
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let mut inner = GatedWriter::new(log.clone());
        inner.gate = Some(gate_rx);
        let mut writer = QueuedVideoWriter::new(Box::new(inner), 1);
        writer.open(Path::new("/tmp/x.mp4"), &metadata()).unwrap();

        // First frame is taken by the writer thread and blocks on the gate,
        // the second fills the queue.
        writer.write(&frame(0), ms(1)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !writer.is_ready_for_input() && std::time::Instant::now() < deadline {
            std::thread::sleep(ms(1));
        }
        writer.write(&frame(1), ms(2)).unwrap();
        assert!(!writer.is_ready_for_input());
        assert!(writer.write(&frame(2), ms(3)).is_err());

        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        writer.close().unwrap();
        assert_eq!(log.lock().unwrap().timestamps, vec![ms(1), ms(2)]);
    }

    #[test]
    fn test_open_failure_is_reported_synchronously() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut inner = GatedWriter::new(log);
        inner.fail_on_open = true;
        let mut writer = QueuedVideoWriter::new(Box::new(inner), 1);
        assert!(writer.open(Path::new("/tmp/x.mp4"), &metadata()).is_err());
        assert!(!writer.is_ready_for_input());
    }

    #[test]
    fn test_inner_failure_surfaces_on_next_write_and_close() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut inner = GatedWriter::new(log.clone());
        inner.fail_on_write = true;
        let mut writer = QueuedVideoWriter::new(Box::new(inner), 1);
        writer.open(Path::new("/tmp/x.mp4"), &metadata()).unwrap();
        writer.write(&frame(0), ms(1)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while writer.failure().is_none() && std::time::Instant::now() < deadline {
            std::thread::sleep(ms(1));
        }
        assert!(writer.write(&frame(1), ms(2)).is_err());
        assert!(writer.close().is_err());
        assert!(log.lock().unwrap().aborted);
    }

    #[test]
    fn test_abort_reaches_inner_writer() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut writer = QueuedVideoWriter::new(Box::new(GatedWriter::new(log.clone())), 1);
        writer.open(Path::new("/tmp/x.mp4"), &metadata()).unwrap();
        writer.abort();
        let log = log.lock().unwrap();
        assert!(log.aborted && !log.closed);
    }

    #[test]
    fn test_drop_aborts_running_writer() {
        let log = Arc::new(Mutex::new(Log::default()));
        {
            let mut writer =
                QueuedVideoWriter::new(Box::new(GatedWriter::new(log.clone())), 1);
            writer.open(Path::new("/tmp/x.mp4"), &metadata()).unwrap();
        }
        assert!(log.lock().unwrap().aborted);
    }

    #[test]
    fn test_write_before_open_fails() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut writer = QueuedVideoWriter::new(Box::new(GatedWriter::new(log)), 1);
        assert!(writer.write(&frame(0), ms(1)).is_err());
    }
}
