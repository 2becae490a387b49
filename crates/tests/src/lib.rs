//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置到 session 的契约测试
//! - 基于 mock 模拟器的端到端 session 场景（无需 CARLA）

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::SessionConfig;

    #[test]
    fn test_empty_config_is_default_session() {
        let config = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        let default = SessionConfig::default();
        assert_eq!(config.town, default.town);
        assert_eq!(config.capture_size(), (1280, 720));
        assert!(config.validation_mode);
        assert!(!config.enable_recording);
    }

    #[test]
    fn test_toml_roundtrip_through_loader() {
        let mut config = SessionConfig::default();
        config.town = "Town04".to_string();
        config.vehicle.spawn_seed = Some(11);

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let loaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(loaded.town, "Town04");
        assert_eq!(loaded.vehicle.spawn_seed, Some(11));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use actor_factory::{
        ActorLifecycleManager, DeliveryMode, MockCameraConfig, MockConfig, MockSimulationClient,
        SimCall, SimulationClient,
    };
    use contracts::{
        FrameValidator, ProcessedFrame, RecordingFormat, SessionConfig, SimulationSettings,
        Transform, ValidationState,
    };
    use display::{
        Canvas, ChannelOrder, FrameRecorder, HeadlessCanvas, RecordingSummary, RenderError,
    };
    use session::{
        ControlInputTranslator, HeldKeys, InputSnapshot, InputSource, Key, SessionController,
        SessionError, SetupStage, StopHandle, StopReason,
    };

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;

    fn session_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.camera.width = WIDTH;
        config.camera.height = HEIGHT;
        config.pacing.target_fps = 0;
        config.vehicle.spawn_seed = Some(3);
        config
    }

    fn mock_client(config: MockConfig) -> Arc<MockSimulationClient> {
        Arc::new(MockSimulationClient::with_config(MockConfig {
            camera: MockCameraConfig {
                width: WIDTH,
                height: HEIGHT,
                delivery: DeliveryMode::Inline,
                corrupt_frames: vec![],
            },
            ..config
        }))
    }

    /// Last settings applied to the world and the final traffic manager mode
    fn assert_restored(client: &MockSimulationClient) {
        let last_settings = client
            .journal()
            .iter()
            .rev()
            .find_map(|call| match call {
                SimCall::ApplySettings(settings) => Some(*settings),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_settings, SimulationSettings::free_running());
        assert!(!last_settings.synchronous_mode);
        assert_eq!(last_settings.fixed_delta_seconds, None);
        assert!(!client.traffic_manager_sync());
        assert_eq!(client.current_settings(), SimulationSettings::free_running());
    }

    #[derive(Clone, Default)]
    struct RecordingValidator {
        calls: Arc<Mutex<Vec<(f64, u64)>>>,
    }

    impl FrameValidator for RecordingValidator {
        fn run_validation(
            &mut self,
            sim_time: f64,
            frame: Option<&ProcessedFrame>,
            mut state: ValidationState,
        ) -> ValidationState {
            if frame.is_some() {
                state.frame_id += 1;
            }
            self.calls.lock().unwrap().push((sim_time, state.frame_id));
            state
        }
    }

    /// Requests an interrupt from inside iteration `at` (1-based)
    struct InterruptAt {
        at: u64,
        polled: u64,
        stop: StopHandle,
    }

    impl InputSource for InterruptAt {
        fn poll(&mut self) -> InputSnapshot {
            self.polled += 1;
            if self.polled == self.at {
                self.stop.request(StopReason::Interrupt);
            }
            InputSnapshot::default()
        }
    }

    /// Canvas whose `present` fails on every other frame
    struct FlakyCanvas {
        inner: HeadlessCanvas,
        presents: u64,
    }

    impl Canvas for FlakyCanvas {
        fn size(&self) -> (u32, u32) {
            self.inner.size()
        }

        fn blit(&mut self, image: &contracts::RgbImage, x: u32, y: u32) -> Result<(), RenderError> {
            self.inner.blit(image, x, y)
        }

        fn draw_text(&mut self, text: &str, x: u32, y: u32) -> Result<(), RenderError> {
            self.inner.draw_text(text, x, y)
        }

        fn present(&mut self) -> Result<(), RenderError> {
            self.presents += 1;
            if self.presents % 2 == 0 {
                return Err(RenderError::canvas("window closed"));
            }
            self.inner.present()
        }
    }

    /// Keeps appended frame sizes in memory
    #[derive(Clone, Default)]
    struct MemoryRecorder {
        frames: Arc<Mutex<Vec<(usize, u32, u32)>>>,
    }

    impl FrameRecorder for MemoryRecorder {
        fn channel_order(&self) -> ChannelOrder {
            ChannelOrder::Rgb
        }

        fn append(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<(), RenderError> {
            self.frames.lock().unwrap().push((pixels.len(), width, height));
            Ok(())
        }

        fn finish(&mut self) -> Result<RecordingSummary, RenderError> {
            Ok(RecordingSummary {
                path: self.path().to_path_buf(),
                width: WIDTH,
                height: HEIGHT,
                fps: 20.0,
                pixel_format: "rgb24",
                frames: self.frames.lock().unwrap().len() as u64,
            })
        }

        fn path(&self) -> &std::path::Path {
            std::path::Path::new("memory")
        }
    }

    /// N iterations issue exactly N ticks
    #[tokio::test]
    async fn test_advance_once_per_iteration() {
        let client = mock_client(MockConfig::default());
        let report = SessionController::new(session_config(), client.clone())
            .with_max_ticks(37)
            .run()
            .await
            .unwrap();

        let ticks: Vec<u64> = client
            .journal()
            .iter()
            .filter_map(|call| match call {
                SimCall::Tick(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, (1..=37).collect::<Vec<_>>());
        assert_eq!(report.stats.ticks, 37);
    }

    /// 120 ticks at 20 Hz: silent for the first 5.0 s, one call per tick after
    #[tokio::test]
    async fn test_validation_gate_over_six_seconds() {
        let client = mock_client(MockConfig::default());
        let validator = RecordingValidator::default();
        let report = SessionController::new(session_config(), client.clone())
            .with_validator(Box::new(validator.clone()))
            .with_max_ticks(120)
            .run()
            .await
            .unwrap();

        let calls = validator.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 20);
        assert!(calls.iter().all(|(t, _)| *t > 5.0));
        assert!((calls[0].0 - 5.05).abs() < 1e-9);
        assert!((report.stats.sim_time - 6.0).abs() < 1e-9);
        assert!(calls.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(report.validation.frame_id, calls.last().unwrap().1);
        assert_eq!(report.stats.validation_runs, 20);
    }

    #[tokio::test]
    async fn test_validation_disabled_never_calls_validator() {
        let mut config = session_config();
        config.validation_mode = false;
        let validator = RecordingValidator::default();
        let report = SessionController::new(config, mock_client(MockConfig::default()))
            .with_validator(Box::new(validator.clone()))
            .with_max_ticks(120)
            .run()
            .await
            .unwrap();

        assert!(validator.calls.lock().unwrap().is_empty());
        assert_eq!(report.validation, ValidationState::default());
    }

    #[tokio::test]
    async fn test_teardown_restores_after_normal_run() {
        let client = mock_client(MockConfig::default());
        let report = SessionController::new(session_config(), client.clone())
            .with_max_ticks(10)
            .run()
            .await
            .unwrap();

        assert!(report.teardown_failures.is_empty());
        assert_eq!(client.actor_count(), 0);
        assert_restored(&client);
    }

    #[tokio::test]
    async fn test_teardown_restores_after_interrupt() {
        let client = mock_client(MockConfig::default());
        let controller = SessionController::new(session_config(), client.clone());
        let input = InterruptAt {
            at: 4,
            polled: 0,
            stop: controller.stop_handle(),
        };
        let report = controller
            .with_input(Box::new(input))
            .with_max_ticks(1000)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.stop_reason, Some(StopReason::Interrupt));
        // The iteration that saw the interrupt still completes
        assert_eq!(report.stats.ticks, 4);
        assert_eq!(client.actor_count(), 0);
        assert_restored(&client);
    }

    #[tokio::test]
    async fn test_teardown_restores_after_camera_spawn_failure() {
        let client = mock_client(MockConfig {
            fail_sensor_spawn: true,
            ..Default::default()
        });
        let err = SessionController::new(session_config(), client.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Setup {
                stage: SetupStage::Camera,
                ..
            }
        ));
        assert_eq!(client.tick_count(), 0);
        // The vehicle spawned before the failure is released
        assert_eq!(client.destroy_order().len(), 1);
        assert_eq!(client.actor_count(), 0);
        assert_restored(&client);
    }

    #[tokio::test]
    async fn test_restore_failure_is_reported_not_raised() {
        let client = mock_client(MockConfig {
            fail_restore_settings: true,
            ..Default::default()
        });
        let report = SessionController::new(session_config(), client.clone())
            .with_max_ticks(3)
            .run()
            .await
            .unwrap();

        assert_eq!(report.teardown_failures.len(), 1);
        assert_eq!(report.stats.teardown_failures, 1);
        assert_eq!(client.actor_count(), 0);
        assert!(!client.traffic_manager_sync());
    }

    #[tokio::test]
    async fn test_reverse_destroy_order_survives_failed_destroy() {
        let client = mock_client(MockConfig {
            fail_destroy: vec![1001],
            ..Default::default()
        });
        client
            .connect("localhost", 2000, std::time::Duration::from_secs(1))
            .await
            .unwrap();
        client.load_world("Town03").await.unwrap();

        let mut manager = ActorLifecycleManager::new(client.clone());
        let vehicle = manager
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        let mut sensors = Vec::new();
        for _ in 0..2 {
            sensors.push(
                manager
                    .spawn_sensor(
                        "sensor.camera.rgb",
                        Transform::default(),
                        &vehicle,
                        &HashMap::new(),
                    )
                    .await
                    .unwrap(),
            );
        }

        let report = manager.teardown().await;
        assert_eq!(
            client.destroy_order(),
            vec![sensors[1].id, sensors[0].id, vehicle.id]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.released.len(), 2);
    }

    #[test]
    fn test_translator_autopilot_on_ignores_held_keys() {
        let translator = ControlInputTranslator::new();
        let held = HeldKeys {
            forward: true,
            brake: true,
            left: true,
            right: true,
        };
        let decision = translator.translate(&InputSnapshot::holding(held), true);
        assert!(decision.autopilot_enabled);
        assert_eq!(decision.manual, None);
    }

    #[test]
    fn test_translator_toggle_off_then_forward_left() {
        let translator = ControlInputTranslator::new();
        let toggled = translator.translate(&InputSnapshot::key(Key::Space), true);
        assert!(!toggled.autopilot_enabled);

        let held = HeldKeys {
            forward: true,
            left: true,
            ..Default::default()
        };
        let decision =
            translator.translate(&InputSnapshot::holding(held), toggled.autopilot_enabled);
        let control = decision.manual.unwrap();
        assert_eq!(control.throttle, 1.0);
        assert_eq!(control.brake, 0.0);
        assert_eq!(control.steer, 0.3);
    }

    #[tokio::test]
    async fn test_recording_written_for_every_rendered_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = session_config();
        config.enable_recording = true;
        config.recording.output_dir = dir.path().to_path_buf();
        config.recording.format = RecordingFormat::RawBgr;

        let report = SessionController::new(config, mock_client(MockConfig::default()))
            .with_max_ticks(8)
            .run()
            .await
            .unwrap();

        let recording = report.recording.unwrap();
        assert_eq!(recording.frames, report.stats.render.rendered);
        assert_eq!(recording.frames, 8);
        assert_eq!((recording.width, recording.height), (WIDTH, HEIGHT));

        let len = std::fs::metadata(&recording.path).unwrap().len();
        assert_eq!(len, 8 * (WIDTH * HEIGHT * 3) as u64);

        let sidecar: serde_json::Value = serde_json::from_reader(
            std::fs::File::open(recording.path.with_extension("json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar["pixel_format"], "bgr24");
        assert_eq!(sidecar["frames"], 8);
        assert!(recording
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("lane_detection_"));
    }

    #[tokio::test]
    async fn test_threaded_camera_delivery() {
        let client = Arc::new(MockSimulationClient::with_config(MockConfig {
            camera: MockCameraConfig {
                width: WIDTH,
                height: HEIGHT,
                delivery: DeliveryMode::Threaded,
                corrupt_frames: vec![],
            },
            ..Default::default()
        }));
        let report = SessionController::new(session_config(), client.clone())
            .with_max_ticks(20)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.ticks, 20);
        assert_eq!(report.stats.callback_errors, 0);
        assert_eq!(
            report.stats.render.rendered + report.stats.render.skipped,
            20
        );
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_frame_is_dropped_not_fatal() {
        let client = Arc::new(MockSimulationClient::with_config(MockConfig {
            camera: MockCameraConfig {
                width: WIDTH,
                height: HEIGHT,
                delivery: DeliveryMode::Inline,
                corrupt_frames: vec![2, 3],
            },
            ..Default::default()
        }));
        let report = SessionController::new(session_config(), client)
            .with_max_ticks(5)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.callback_errors, 2);
        assert_eq!(report.stats.frames_published, 3);
        // Frame 1 stays in the slot and is shown again while 2 and 3 fail
        assert_eq!(report.stats.render.rendered, 5);
    }

    #[tokio::test]
    async fn test_render_failures_do_not_end_session() {
        let canvas = FlakyCanvas {
            inner: HeadlessCanvas::new(WIDTH, HEIGHT),
            presents: 0,
        };
        let report = SessionController::new(session_config(), mock_client(MockConfig::default()))
            .with_canvas(Box::new(canvas))
            .with_max_ticks(10)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.ticks, 10);
        assert_eq!(report.stats.render.failures, 5);
        assert_eq!(report.stats.render.rendered, 5);
        assert_eq!(report.stats.stop_reason, Some(StopReason::MaxTicks));
    }

    #[tokio::test]
    async fn test_injected_recorder_receives_rgb_frames() {
        let mut config = session_config();
        config.enable_recording = true;
        let recorder = MemoryRecorder::default();

        let report = SessionController::new(config, mock_client(MockConfig::default()))
            .with_recorder(Box::new(recorder.clone()))
            .with_max_ticks(6)
            .run()
            .await
            .unwrap();

        let frames = recorder.frames.lock().unwrap().clone();
        assert_eq!(frames.len(), 6);
        assert!(frames
            .iter()
            .all(|f| *f == ((WIDTH * HEIGHT * 3) as usize, WIDTH, HEIGHT)));
        assert_eq!(report.recording.unwrap().frames, 6);
    }

    /// Clock, camera ingestion and slot wired by hand: with inline delivery
    /// the slot holds the frame of the tick that just completed
    #[tokio::test]
    async fn test_slot_tracks_lockstep_ticks() {
        use ingestion::{BasicLaneDetector, CameraIngestion, FrameHandoffSlot};
        use lockstep::{ClockState, SimulationClockDriver, LOCKSTEP_DELTA_SECONDS};

        let client = mock_client(MockConfig::default());
        client
            .connect("localhost", 2000, std::time::Duration::from_secs(1))
            .await
            .unwrap();
        client.load_world("Town03").await.unwrap();

        let mut clock = SimulationClockDriver::new(client.clone());
        clock.enable_lockstep(LOCKSTEP_DELTA_SECONDS).await.unwrap();
        assert_eq!(
            clock.state(),
            ClockState::Lockstep {
                delta_seconds: LOCKSTEP_DELTA_SECONDS
            }
        );

        let mut manager = ActorLifecycleManager::new(client.clone());
        let vehicle = manager
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        let camera = manager
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::default(),
                &vehicle,
                &HashMap::new(),
            )
            .await
            .unwrap();

        let (writer, reader) = FrameHandoffSlot::new();
        let ingestion = CameraIngestion::new(
            client.sensor_source(camera.id).unwrap(),
            Arc::new(BasicLaneDetector::default()),
            writer,
            (WIDTH, HEIGHT),
        );
        assert!(reader.read().is_none());
        ingestion.start();

        for tick in 1..=5u64 {
            let sim_time = clock.advance().await.unwrap();
            assert!((sim_time - tick as f64 * LOCKSTEP_DELTA_SECONDS).abs() < 1e-9);
            let frame = reader.read().unwrap();
            assert_eq!(frame.frame(), tick);
        }
        assert_eq!(ingestion.metrics().snapshot().frames_published, 5);
        assert_eq!(ingestion.metrics().snapshot().frames_overwritten, 0);

        ingestion.stop();
        assert!(manager.teardown().await.is_clean());
        assert!(clock.restore_freerunning().await.is_empty());
        // Second restore is a no-op
        let applied = client.journal().len();
        assert!(clock.restore_freerunning().await.is_empty());
        assert_eq!(client.journal().len(), applied);
        assert_restored(&client);
    }
}
