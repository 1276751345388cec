// node.rs

use tokio::time::{interval, MissedTickBehavior};

use crate::*;

/// What one telemetry cycle did, mostly for logs and tests.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle: u32,
    pub link_up: bool,
    pub record: TelemetryRecord,
    /// None when the link was down and nothing was sent
    pub upload: Option<UploadOutcome>,
}

pub struct TelemetryNode<L, S, C> {
    config: NodeConfig,
    link: L,
    sensors: S,
    transport: Transport<C>,
    clock: SyncedClock,
    cycles: u32,
}

impl<L: Link, S: Sensors, C: Connector> TelemetryNode<L, S, C> {
    pub fn new(config: NodeConfig, link: L, sensors: S, connector: C) -> Self {
        let transport = Transport::new(connector, &config);
        Self {
            config,
            link,
            sensors,
            transport,
            clock: SyncedClock::new(),
            cycles: 0,
        }
    }

    pub fn clock(&self) -> &SyncedClock {
        &self.clock
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    /// Boot sequence: bring up the link, say hello to the collector, sync time once.
    pub async fn start(&mut self) {
        if !ensure_link(&mut self.link, &self.config).await {
            warn!("Starting without network, time stays unsynced");
            return;
        }
        let sync = TimeSync::new(&self.transport, &self.config);
        sync.probe_health().await;
        sync.sync(&mut self.clock).await;
    }

    pub async fn sync_clock(&mut self) -> bool {
        TimeSync::new(&self.transport, &self.config)
            .sync(&mut self.clock)
            .await
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle = self.cycles;
        self.cycles = self.cycles.wrapping_add(1);
        info!("#{cycle} measurement cycle");

        let link_up = ensure_link(&mut self.link, &self.config).await;

        let resync = self.config.resync_cycles;
        if link_up && resync > 0 && cycle > 0 && cycle % resync == 0 {
            self.sync_clock().await;
        }

        let record = build_record(&mut self.sensors, &self.clock);
        if record.timestamp() == 0 {
            debug!("#{cycle} clock never synced, timestamp is 0");
        }

        let upload = if link_up {
            Some(
                TelemetryUploader::new(&self.transport, &self.config)
                    .upload(&record)
                    .await,
            )
        } else {
            warn!("#{cycle} no link, record not sent");
            None
        };

        CycleReport {
            cycle,
            link_up,
            record,
            upload,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        self.start().await;

        let mut ticker = interval(self.config.telemetry_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    NoFrame,
    LinkDown,
    Uploaded,
    Failed,
}

pub struct CameraNode<L, F, C> {
    config: NodeConfig,
    link: L,
    camera: F,
    transport: Transport<C>,
    boundaries: BoundaryGen,
    frames: u32,
}

impl<L: Link, F: FrameSource, C: Connector> CameraNode<L, F, C> {
    pub fn new(config: NodeConfig, link: L, camera: F, connector: C) -> Self {
        let transport = Transport::new(connector, &config);
        Self {
            config,
            link,
            camera,
            transport,
            boundaries: BoundaryGen::new(),
            frames: 0,
        }
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    /// Capture, ship, release. A frame that cannot be sent is dropped.
    pub async fn run_cycle(&mut self) -> CaptureOutcome {
        let cnt = self.frames;
        self.frames = self.frames.wrapping_add(1);
        info!("#{cnt} capturing frame");

        let Some(frame) = self.camera.capture() else {
            error!("#{cnt} no frame from camera");
            return CaptureOutcome::NoFrame;
        };

        if !ensure_link(&mut self.link, &self.config).await {
            warn!("#{cnt} no link, frame dropped");
            return CaptureOutcome::LinkDown;
        }

        let ok = ImageUploader::new(&self.transport, &self.config, &mut self.boundaries)
            .upload(frame.as_ref())
            .await;
        drop(frame);

        if ok {
            CaptureOutcome::Uploaded
        } else {
            CaptureOutcome::Failed
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        ensure_link(&mut self.link, &self.config).await;

        // first tick fires right away, so the first frame goes out at boot
        let mut ticker = interval(self.config.capture_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::{
        link::tests::FlakyLink,
        record::tests::FixedSensors,
        transport::tests::{Canned, Refusing},
    };

    const TIME_OK: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Length: 28\r\n\r\n{\"unix\":1700000000000,\"a\":1}";

    fn config() -> NodeConfig {
        NodeConfig {
            server_host: "10.0.0.2".into(),
            wifi_attempts: 2,
            wifi_retry_ms: 1,
            exchange_timeout_ms: 500,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn boot_sync_stamps_records() {
        let (conn, mut seen) = Canned::new(TIME_OK);
        let mut node = TelemetryNode::new(
            config(),
            FlakyLink::down(1),
            FixedSensors::scenario_a(),
            conn,
        );

        node.start().await;
        assert_eq!(node.clock().value(), 1_700_000_000_000);
        assert!(node.clock().last_sync_succeeded());
        // health probe + time
        assert_eq!(node.transport().connector().connects(), 2);
        assert!(seen.recv().await.unwrap().starts_with(b"GET /api/health HTTP/1.1\r\n"));
        assert!(seen.recv().await.unwrap().starts_with(b"GET /api/time/ HTTP/1.1\r\n"));

        let report = node.run_cycle().await;
        assert!(report.link_up);
        assert_eq!(report.upload, Some(UploadOutcome::Delivered(Some(200))));
        assert_eq!(report.record.timestamp(), 1_700_000_000_000);

        let post = String::from_utf8(seen.recv().await.unwrap()).unwrap();
        assert!(post.starts_with("POST /api/data/ HTTP/1.1\r\nHost: 10.0.0.2:3000\r\n"));
        assert!(post.ends_with(r#"{"sensor_name":"light_sensor","value":1}]}"#));
        assert!(post.contains(r#"{"timestamp":1700000000000,"sensors":["#));
    }

    #[tokio::test]
    async fn unreachable_collector_keeps_looping() {
        let mut node = TelemetryNode::new(
            config(),
            FlakyLink::up(),
            FixedSensors::scenario_a(),
            Refusing,
        );

        node.start().await;
        assert_eq!(node.clock().value(), 0);
        assert!(!node.clock().last_sync_succeeded());

        for cycle in 0..2 {
            let report = node.run_cycle().await;
            assert_eq!(report.cycle, cycle);
            assert_eq!(report.upload, Some(UploadOutcome::Failed));
            assert_eq!(report.record.timestamp(), 0);
            assert_eq!(report.record.readings().len(), 7);
        }
    }

    #[tokio::test]
    async fn dead_link_skips_upload() {
        let (conn, _seen) = Canned::new(TIME_OK);
        let mut node = TelemetryNode::new(
            config(),
            FlakyLink::down(u32::MAX),
            FixedSensors::scenario_a(),
            conn,
        );

        let report = node.run_cycle().await;
        assert!(!report.link_up);
        assert_eq!(report.upload, None);
        assert_eq!(report.record.failed_reads(), 0);
        assert_eq!(node.transport().connector().connects(), 0);
    }

    #[tokio::test]
    async fn resync_on_schedule() {
        let (conn, _seen) = Canned::new(TIME_OK);
        let mut node = TelemetryNode::new(
            NodeConfig {
                resync_cycles: 2,
                ..config()
            },
            FlakyLink::up(),
            FixedSensors::scenario_a(),
            conn,
        );

        for _ in 0..5 {
            node.run_cycle().await;
        }
        // five posts plus syncs in cycles 2 and 4
        assert_eq!(node.transport().connector().connects(), 7);
        assert!(node.clock().last_sync_succeeded());
    }

    /// Hands out its frames once; tracks whether a frame is still out.
    struct FakeCamera {
        frames: Vec<Vec<u8>>,
        out: Rc<Cell<bool>>,
    }

    struct FakeFrame<'a> {
        data: &'a [u8],
        out: Rc<Cell<bool>>,
    }

    impl AsRef<[u8]> for FakeFrame<'_> {
        fn as_ref(&self) -> &[u8] {
            self.data
        }
    }

    impl Drop for FakeFrame<'_> {
        fn drop(&mut self) {
            self.out.set(false);
        }
    }

    impl FrameSource for FakeCamera {
        type Frame<'a> = FakeFrame<'a>;

        fn capture(&mut self) -> Option<FakeFrame<'_>> {
            let data = self.frames.pop()?;
            self.frames.insert(0, data);
            self.out.set(true);
            Some(FakeFrame {
                data: &self.frames[0],
                out: self.out.clone(),
            })
        }
    }

    fn camera(frames: Vec<Vec<u8>>) -> (FakeCamera, Rc<Cell<bool>>) {
        let out = Rc::new(Cell::new(false));
        (
            FakeCamera {
                frames,
                out: out.clone(),
            },
            out,
        )
    }

    #[tokio::test]
    async fn frame_uploaded_and_released() {
        let (conn, mut seen) =
            Canned::new(b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\n{}");
        let (cam, out) = camera(vec![b"\xff\xd8frame\xff\xd9".to_vec()]);
        let mut node = CameraNode::new(config(), FlakyLink::up(), cam, conn);

        assert_eq!(node.run_cycle().await, CaptureOutcome::Uploaded);
        assert!(!out.get());

        let wire = seen.recv().await.unwrap();
        let text = String::from_utf8_lossy(&wire);
        assert!(text.starts_with("POST /api/uploadImage HTTP/1.1\r\n"));
        assert!(text.contains("filename=\"esp32cam.jpg\""));
    }

    #[tokio::test]
    async fn non_2xx_is_a_failed_upload() {
        let (conn, _seen) = Canned::new(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        let (cam, out) = camera(vec![b"jpeg".to_vec()]);
        let mut node = CameraNode::new(config(), FlakyLink::up(), cam, conn);

        assert_eq!(node.run_cycle().await, CaptureOutcome::Failed);
        assert!(!out.get());
    }

    #[tokio::test]
    async fn no_frame_no_connection() {
        let (conn, _seen) = Canned::new(b"HTTP/1.1 201 Created\r\n\r\n");
        let (cam, _out) = camera(Vec::new());
        let mut node = CameraNode::new(config(), FlakyLink::up(), cam, conn);

        assert_eq!(node.run_cycle().await, CaptureOutcome::NoFrame);
        assert_eq!(node.transport().connector().connects(), 0);
    }

    #[tokio::test]
    async fn link_down_drops_frame() {
        let (cam, out) = camera(vec![b"jpeg".to_vec()]);
        let mut node = CameraNode::new(config(), FlakyLink::down(u32::MAX), cam, Refusing);

        assert_eq!(node.run_cycle().await, CaptureOutcome::LinkDown);
        assert!(!out.get());
    }
}

// EOF
