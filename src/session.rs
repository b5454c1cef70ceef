//! Playback session: one track, one graph instance, one state machine.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builder::{release_nodes, GraphBuilder, GraphInstance};
use crate::error::PlaybackError;
use crate::graph::{lock_graph, AnalysisTap, AudioGraph, MediaSource, NodeId, SharedGraph, SourceNode};
use crate::io::{AudioBackend, DeviceFuture, OutputDevice};
use crate::recipe::ChainRecipe;
use crate::selector::{pick_track, AudioCatalog, SourceRef};
use crate::FFT_SIZE;

/*
Session Lifecycle
=================

  Idle ──start()──▶ Starting ──resume + play resolved──▶ Playing
   ▲                   │                                    │
   │                   └──────────── stop() ────────────────┤
   │                                                        ▼
   └──────────────────────── teardown ◀──────────────── Stopping

start() does its synchronous work before returning a future:

  1. pick a track (empty catalog: back to Idle, nothing created)
  2. make sure output state exists (graph + tap + device)
  3. load the source, build a graph instance, attach a source node

The returned future then resumes a suspended device and starts playback.
Both steps may take a while and stop() may run in between, so every
continuation compares the start's generation with the current one before it
touches anything. A stale continuation pauses its own source and reports
`Cancelled`; it never enters Playing.

Output state lifecycle
----------------------

Persistent   graph, tap and device are created on the first start and kept
             forever. Only session nodes come and go.
Rebuild      stop also closes the device and drops the graph and tap; the
             next start recreates all of it.
*/

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Playing,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Playing => "playing",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// What happens to output state when a session stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Persistent,
    Rebuild,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// The session entered Playing with this track.
    Playing(SourceRef),
    /// Another session was already active; nothing changed.
    Ignored,
    /// stop() ran before playback could start.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Already idle.
    Ignored,
}

/// Construction options for a [`PlaybackSession`].
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub recipe: ChainRecipe,
    pub lifecycle: Lifecycle,
    pub seed: Option<u64>,
    pub fft_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            recipe: ChainRecipe::default(),
            lifecycle: Lifecycle::default(),
            seed: None,
            fft_size: FFT_SIZE,
        }
    }
}

impl SessionOptions {
    pub fn recipe(mut self, recipe: ChainRecipe) -> Self {
        self.recipe = recipe;
        self
    }

    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }
}

/// Process-wide output: graph, analysis tap and the device rendering them.
struct OutputState<D> {
    graph: SharedGraph,
    tap: AnalysisTap,
    device: D,
}

impl<D: OutputDevice> OutputState<D> {
    fn create<B>(backend: &B, fft_size: usize) -> Result<Self, PlaybackError>
    where
        B: AudioBackend<Device = D>,
    {
        let mut graph = AudioGraph::new();
        let tap = AnalysisTap::install(&mut graph, fft_size)?;
        let destination = graph.destination();
        graph.connect(tap.node(), destination)?;

        let graph = graph.into_shared();
        let device = backend
            .open(graph.clone())
            .map_err(PlaybackError::DeviceUnavailable)?;

        info!(fft_size, sample_rate = device.sample_rate(), "created output state");
        Ok(Self { graph, tap, device })
    }
}

/// Everything one playing (or starting) session owns.
struct ActiveTrack {
    track: SourceRef,
    media: MediaSource,
    source_node: NodeId,
    instance: GraphInstance,
}

struct SessionCore<B: AudioBackend> {
    backend: B,
    catalog: AudioCatalog,
    recipe: ChainRecipe,
    builder: GraphBuilder,
    lifecycle: Lifecycle,
    fft_size: usize,
    state: SessionState,
    generation: u64,
    output: Option<OutputState<B::Device>>,
    active: Option<ActiveTrack>,
    frame_scheduled: bool,
}

impl<B: AudioBackend> SessionCore<B> {
    fn is_current(&self, generation: u64) -> bool {
        self.state == SessionState::Starting && self.generation == generation
    }

    /// Synchronous half of start. `None` when the request is ignored.
    fn begin_start(&mut self) -> Result<Option<(u64, Option<DeviceFuture>)>, PlaybackError> {
        if self.state != SessionState::Idle {
            debug!(state = %self.state, "start ignored, session busy");
            return Ok(None);
        }

        self.state = SessionState::Starting;
        self.generation += 1;
        debug!(generation = self.generation, "session starting");

        match self.prepare() {
            Ok(resume) => Ok(Some((self.generation, resume))),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn prepare(&mut self) -> Result<Option<DeviceFuture>, PlaybackError> {
        let track = pick_track(&self.catalog, self.builder.rng_mut())?;

        if self.output.is_none() {
            self.output = Some(OutputState::create(&self.backend, self.fft_size)?);
        }
        if let Some(output) = self.output.as_mut() {
            // Whatever the idle stream left in the feed belongs to no session
            output.tap.clear();
        }
        let Some(output) = self.output.as_ref() else {
            return Err(PlaybackError::SinkNotReady);
        };

        let media = self
            .backend
            .load(&track)
            .map_err(|error| PlaybackError::SourceUnavailable {
                source_ref: track.to_string(),
                error,
            })?;

        let mut graph = lock_graph(&output.graph);
        let instance = self
            .builder
            .build(&mut graph, &self.recipe, Some(&output.tap))?;
        let source_node = graph.add_node(SourceNode::new(media.clone()));
        if let Err(e) = graph.connect(source_node, instance.entry()) {
            release_nodes(&mut graph, &[source_node]);
            instance.teardown(&mut graph);
            return Err(e.into());
        }
        drop(graph);

        info!(track = %track, chain = %instance.describe(), "attached source");
        self.active = Some(ActiveTrack {
            track,
            media,
            source_node,
            instance,
        });

        Ok(output
            .device
            .is_suspended()
            .then(|| output.device.resume()))
    }

    fn play_future(&self) -> Option<DeviceFuture> {
        let output = self.output.as_ref()?;
        let active = self.active.as_ref()?;
        Some(output.device.play(&active.media))
    }

    fn finish_start(&mut self, generation: u64) -> StartOutcome {
        if !self.is_current(generation) {
            return StartOutcome::Cancelled;
        }
        let Some(active) = self.active.as_ref() else {
            return StartOutcome::Cancelled;
        };

        active.media.set_looping(true);
        self.state = SessionState::Playing;
        self.frame_scheduled = true;
        info!(track = %active.track, "session playing");
        StartOutcome::Playing(active.track.clone())
    }

    /// A start failed while still current: unwind to Idle.
    fn fail(&mut self, error: &PlaybackError) {
        warn!(error = %error, "start failed, returning to idle");
        self.teardown();
        self.state = SessionState::Idle;
    }

    fn stop(&mut self) -> StopOutcome {
        match self.state {
            SessionState::Idle | SessionState::Stopping => return StopOutcome::Ignored,
            SessionState::Starting | SessionState::Playing => {}
        }

        self.state = SessionState::Stopping;
        self.teardown();
        self.state = SessionState::Idle;
        info!("session stopped");
        StopOutcome::Stopped
    }

    /// Release every session resource. Safe to call with nothing active.
    fn teardown(&mut self) {
        self.frame_scheduled = false;

        if let Some(active) = self.active.take() {
            active.media.pause();
            active.media.seek(0.0);

            if let Some(output) = &self.output {
                let mut graph = lock_graph(&output.graph);
                let mut removed = release_nodes(&mut graph, &[active.source_node]);
                removed += active.instance.teardown(&mut graph);
                debug!(removed, remaining = graph.node_count(), "released session nodes");
            }
        }

        if self.lifecycle == Lifecycle::Rebuild {
            if let Some(mut output) = self.output.take() {
                output.device.close();
                debug!("dropped output state");
            }
        }
    }

    fn session_nodes(&self) -> Vec<NodeId> {
        self.active
            .as_ref()
            .map(|active| {
                let mut nodes = vec![active.source_node];
                nodes.extend_from_slice(active.instance.nodes());
                nodes
            })
            .unwrap_or_default()
    }
}

/// Handle to the single playback session.
///
/// Cloning shares the session; it is meant for one control thread.
pub struct PlaybackSession<B: AudioBackend> {
    core: Rc<RefCell<SessionCore<B>>>,
}

impl<B: AudioBackend> Clone for PlaybackSession<B> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<B: AudioBackend + 'static> PlaybackSession<B> {
    pub fn new(backend: B, catalog: AudioCatalog, options: SessionOptions) -> Self {
        let core = SessionCore {
            backend,
            catalog,
            recipe: options.recipe,
            builder: GraphBuilder::new(options.seed),
            lifecycle: options.lifecycle,
            fft_size: options.fft_size,
            state: SessionState::Idle,
            generation: 0,
            output: None,
            active: None,
            frame_scheduled: false,
        };
        Self {
            core: Rc::new(RefCell::new(core)),
        }
    }

    /// Begin playback of a random track.
    ///
    /// The synchronous part (track pick, graph build) runs before this
    /// returns, so a second call made right away is already `Ignored`. Await
    /// the future to finish the device resume and playback start.
    pub fn start(&self) -> impl Future<Output = Result<StartOutcome, PlaybackError>> + 'static {
        let begun = self.core.borrow_mut().begin_start();
        let core = Rc::clone(&self.core);

        async move {
            let (generation, resume) = match begun? {
                Some(pending) => pending,
                None => return Ok(StartOutcome::Ignored),
            };
            let media = core.borrow().active.as_ref().map(|a| a.media.clone());

            if let Some(resume) = resume {
                if let Err(e) = resume.await {
                    return settle_error(&core, generation, PlaybackError::DeviceResumeFailed(e));
                }
            }

            let play = {
                let core = core.borrow();
                if !core.is_current(generation) {
                    None
                } else {
                    core.play_future()
                }
            };
            let Some(play) = play else {
                return Ok(cancelled(media.as_ref()));
            };
            if let Err(e) = play.await {
                return settle_error(&core, generation, PlaybackError::PlaybackRejected(e));
            }

            let outcome = core.borrow_mut().finish_start(generation);
            if outcome == StartOutcome::Cancelled {
                return Ok(cancelled(media.as_ref()));
            }
            Ok(outcome)
        }
    }

    /// Tear the current session down. No-op when idle.
    pub fn stop(&self) -> StopOutcome {
        self.core.borrow_mut().stop()
    }

    pub fn state(&self) -> SessionState {
        self.core.borrow().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.core.borrow().lifecycle
    }

    pub fn current_track(&self) -> Option<SourceRef> {
        self.core.borrow().active.as_ref().map(|a| a.track.clone())
    }

    /// Realized chain of the current session, as text.
    pub fn current_chain(&self) -> Option<String> {
        self.core
            .borrow()
            .active
            .as_ref()
            .map(|a| a.instance.describe())
    }

    pub fn media(&self) -> Option<MediaSource> {
        self.core.borrow().active.as_ref().map(|a| a.media.clone())
    }

    /// Source node plus every graph instance node of the current session.
    pub fn session_nodes(&self) -> Vec<NodeId> {
        self.core.borrow().session_nodes()
    }

    /// Session nodes still present in the graph.
    pub fn live_nodes(&self) -> usize {
        let core = self.core.borrow();
        let Some(output) = &core.output else {
            return 0;
        };
        let graph = lock_graph(&output.graph);
        core.session_nodes()
            .into_iter()
            .filter(|&id| graph.contains(id))
            .count()
    }

    pub fn has_output(&self) -> bool {
        self.core.borrow().output.is_some()
    }

    pub fn catalog_len(&self) -> usize {
        self.core.borrow().catalog.len()
    }

    pub fn recipe(&self) -> ChainRecipe {
        self.core.borrow().recipe.clone()
    }

    /// Takes effect on the next start.
    pub fn set_recipe(&self, recipe: ChainRecipe) {
        self.core.borrow_mut().recipe = recipe;
    }

    /// Replace the catalog. Takes effect on the next start.
    pub fn set_catalog(&self, catalog: AudioCatalog) {
        self.core.borrow_mut().catalog = catalog;
    }

    /// Run `f` on the analysis tap, if output state exists.
    pub fn with_tap<T>(&self, f: impl FnOnce(&mut AnalysisTap) -> T) -> Option<T> {
        let mut core = self.core.borrow_mut();
        core.output.as_mut().map(|output| f(&mut output.tap))
    }

    /// Run `f` on the locked graph, if output state exists.
    pub fn with_graph<T>(&self, f: impl FnOnce(&mut AudioGraph) -> T) -> Option<T> {
        let core = self.core.borrow();
        core.output
            .as_ref()
            .map(|output| f(&mut lock_graph(&output.graph)))
    }

    /// Consume the pending display-frame request.
    pub fn take_frame_request(&self) -> bool {
        std::mem::take(&mut self.core.borrow_mut().frame_scheduled)
    }

    /// Ask for another display frame. Ignored unless playing.
    pub fn request_frame(&self) {
        let mut core = self.core.borrow_mut();
        if core.state == SessionState::Playing {
            core.frame_scheduled = true;
        }
    }
}

fn settle_error<B: AudioBackend>(
    core: &RefCell<SessionCore<B>>,
    generation: u64,
    error: PlaybackError,
) -> Result<StartOutcome, PlaybackError> {
    let mut core = core.borrow_mut();
    if core.is_current(generation) {
        core.fail(&error);
        Err(error)
    } else {
        // stop() already tore this start down
        debug!(error = %error, "stale start failed after stop");
        Ok(StartOutcome::Cancelled)
    }
}

fn cancelled(media: Option<&MediaSource>) -> StartOutcome {
    if let Some(media) = media {
        media.pause();
    }
    debug!("start cancelled by stop");
    StartOutcome::Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    type Gate = oneshot::Receiver<Result<(), BackendError>>;

    #[derive(Default)]
    struct Control {
        suspended_on_open: Cell<bool>,
        fail_open: Cell<bool>,
        opened: Cell<usize>,
        closed: Cell<usize>,
        loaded: RefCell<Vec<SourceRef>>,
        resume_gates: RefCell<VecDeque<Gate>>,
        play_gates: RefCell<VecDeque<Gate>>,
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        control: Rc<Control>,
    }

    struct MockDevice {
        control: Rc<Control>,
        suspended: Rc<Cell<bool>>,
    }

    fn gated(gate: Option<Gate>) -> DeviceFuture {
        match gate {
            Some(rx) => Box::pin(async move { rx.await.unwrap_or(Err(BackendError::Closed)) }),
            None => Box::pin(std::future::ready(Ok(()))),
        }
    }

    impl OutputDevice for MockDevice {
        fn sample_rate(&self) -> f32 {
            48_000.0
        }

        fn is_suspended(&self) -> bool {
            self.suspended.get()
        }

        fn resume(&self) -> DeviceFuture {
            let gate = self.control.resume_gates.borrow_mut().pop_front();
            let suspended = Rc::clone(&self.suspended);
            let inner = gated(gate);
            Box::pin(async move {
                inner.await?;
                suspended.set(false);
                Ok(())
            })
        }

        fn play(&self, source: &MediaSource) -> DeviceFuture {
            source.play();
            gated(self.control.play_gates.borrow_mut().pop_front())
        }

        fn close(&mut self) {
            self.control.closed.set(self.control.closed.get() + 1);
        }
    }

    impl AudioBackend for MockBackend {
        type Device = MockDevice;

        fn open(&self, _graph: SharedGraph) -> Result<MockDevice, BackendError> {
            if self.control.fail_open.get() {
                return Err(BackendError::NoDevice);
            }
            self.control.opened.set(self.control.opened.get() + 1);
            Ok(MockDevice {
                control: Rc::clone(&self.control),
                suspended: Rc::new(Cell::new(self.control.suspended_on_open.get())),
            })
        }

        fn load(&self, source: &SourceRef) -> Result<MediaSource, BackendError> {
            if source.as_str().contains("broken") {
                return Err(BackendError::UnsupportedFormat(source.to_string()));
            }
            self.control.loaded.borrow_mut().push(source.clone());
            Ok(MediaSource::new(vec![0.2; 4_800], 48_000.0))
        }
    }

    fn abc() -> AudioCatalog {
        ["a.wav", "b.wav", "c.wav"].into_iter().map(SourceRef::from).collect()
    }

    fn session(catalog: AudioCatalog, options: SessionOptions) -> (PlaybackSession<MockBackend>, Rc<Control>) {
        let backend = MockBackend::default();
        let control = Rc::clone(&backend.control);
        (PlaybackSession::new(backend, catalog, options.seed(17)), control)
    }

    fn gate(queue: &RefCell<VecDeque<Gate>>) -> oneshot::Sender<Result<(), BackendError>> {
        let (tx, rx) = oneshot::channel();
        queue.borrow_mut().push_back(rx);
        tx
    }

    #[tokio::test]
    async fn start_plays_a_catalog_track_with_looping() {
        let catalog = abc();
        let (session, _) = session(catalog.clone(), SessionOptions::default());

        let outcome = session.start().await.unwrap();

        let StartOutcome::Playing(track) = outcome else {
            panic!("expected playing, got {outcome:?}");
        };
        assert!(catalog.contains(&track));
        assert_eq!(session.state(), SessionState::Playing);
        let media = session.media().unwrap();
        assert!(media.is_looping());
        assert!(!media.is_paused());
    }

    #[tokio::test]
    async fn stop_rewinds_and_disconnects_everything() {
        let (session, _) = session(abc(), SessionOptions::default());
        session.start().await.unwrap();
        let media = session.media().unwrap();
        let nodes = session.session_nodes();
        session.with_graph(|graph| graph.render(&mut vec![0.0; 512], 48_000.0));
        assert!(media.position_seconds() > 0.0);

        assert_eq!(session.stop(), StopOutcome::Stopped);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(media.position_seconds(), 0.0);
        assert!(media.is_paused());
        assert_eq!(session.live_nodes(), 0);
        session
            .with_graph(|graph| {
                for id in &nodes {
                    assert!(!graph.is_connected(*id));
                    assert!(!graph.contains(*id));
                }
                // Tap and destination survive
                assert_eq!(graph.node_count(), 2);
            })
            .unwrap();
    }

    #[tokio::test]
    async fn second_start_is_ignored() {
        let (session, control) = session(abc(), SessionOptions::default());

        let first = session.start();
        let second = session.start();

        assert_eq!(second.await.unwrap(), StartOutcome::Ignored);
        assert!(matches!(first.await.unwrap(), StartOutcome::Playing(_)));
        assert_eq!(control.loaded.borrow().len(), 1);
        assert_eq!(session.start().await.unwrap(), StartOutcome::Ignored);
    }

    #[tokio::test]
    async fn stop_on_idle_is_noop() {
        let (session, _) = session(abc(), SessionOptions::default());

        assert_eq!(session.stop(), StopOutcome::Ignored);
        assert_eq!(session.stop(), StopOutcome::Ignored);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn empty_catalog_creates_nothing() {
        let (session, control) = session(AudioCatalog::empty(), SessionOptions::default());

        let result = session.start().await;

        assert!(matches!(result, Err(PlaybackError::EmptyCatalog)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_output());
        assert_eq!(control.opened.get(), 0);
    }

    #[tokio::test]
    async fn at_most_one_instance_across_restarts() {
        let (session, _) = session(abc(), SessionOptions::default());

        for _ in 0..10 {
            session.start().await.unwrap();
            let live = session.live_nodes();
            assert_eq!(live, session.session_nodes().len());
            let total = session.with_graph(|g| g.node_count()).unwrap();
            assert_eq!(total, live + 2);

            session.stop();
            assert_eq!(session.with_graph(|g| g.node_count()), Some(2));
        }
    }

    #[tokio::test]
    async fn output_state_persists_by_default() {
        let (session, control) = session(abc(), SessionOptions::default());

        session.start().await.unwrap();
        let tap_node = session.with_tap(|tap| tap.node()).unwrap();
        session.stop();
        session.start().await.unwrap();

        assert_eq!(control.opened.get(), 1);
        assert_eq!(control.closed.get(), 0);
        assert_eq!(session.with_tap(|tap| tap.node()), Some(tap_node));
    }

    #[tokio::test]
    async fn persistent_tap_starts_each_session_empty() {
        let options = SessionOptions::default().recipe(ChainRecipe::default_chain().with_probability(0.0));
        let (session, _) = session(abc(), options);

        session.start().await.unwrap();
        let mut block = vec![0.0; 512];
        // Nobody reads the tap, so the previous track backs up in its feed
        for _ in 0..40 {
            session.with_graph(|g| g.render(&mut block, 48_000.0)).unwrap();
        }
        session.stop();
        session.start().await.unwrap();

        let window = session.with_tap(|tap| tap.time_domain()).unwrap();
        assert!(window.iter().all(|&s| s == 0.0));
    }

    #[tokio::test]
    async fn rebuild_lifecycle_recreates_output() {
        let options = SessionOptions::default().lifecycle(Lifecycle::Rebuild);
        let (session, control) = session(abc(), options);

        session.start().await.unwrap();
        session.stop();

        assert!(!session.has_output());
        assert_eq!(control.closed.get(), 1);

        session.start().await.unwrap();
        assert_eq!(control.opened.get(), 2);
        assert!(session.with_tap(|tap| tap.bin_count()).is_some());
    }

    #[tokio::test]
    async fn suspended_device_is_resumed_before_playing() {
        let (session, control) = session(abc(), SessionOptions::default());
        control.suspended_on_open.set(true);
        let resume = gate(&control.resume_gates);

        let pending = session.start();
        assert_eq!(session.state(), SessionState::Starting);
        assert!(session.media().unwrap().is_paused());

        resume.send(Ok(())).unwrap();
        assert!(matches!(pending.await.unwrap(), StartOutcome::Playing(_)));
        assert!(session.is_playing());
    }

    #[tokio::test]
    async fn resume_rejection_falls_back_to_idle() {
        let (session, control) = session(abc(), SessionOptions::default());
        control.suspended_on_open.set(true);
        let resume = gate(&control.resume_gates);

        let pending = session.start();
        resume
            .send(Err(BackendError::Device("not allowed".into())))
            .unwrap();

        assert!(matches!(
            pending.await,
            Err(PlaybackError::DeviceResumeFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.live_nodes(), 0);
        assert_eq!(session.with_graph(|g| g.node_count()), Some(2));
    }

    #[tokio::test]
    async fn play_rejection_falls_back_to_idle() {
        let (session, control) = session(abc(), SessionOptions::default());
        let play = gate(&control.play_gates);

        let pending = session.start();
        drop(play);

        assert!(matches!(
            pending.await,
            Err(PlaybackError::PlaybackRejected(BackendError::Closed))
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.with_graph(|g| g.node_count()), Some(2));
    }

    #[tokio::test]
    async fn stop_during_pending_resume_wins() {
        let (session, control) = session(abc(), SessionOptions::default());
        control.suspended_on_open.set(true);
        let resume = gate(&control.resume_gates);

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let handle = tokio::task::spawn_local(session.start());
                tokio::task::yield_now().await;

                assert_eq!(session.stop(), StopOutcome::Stopped);
                resume.send(Ok(())).unwrap();

                assert_eq!(handle.await.unwrap().unwrap(), StartOutcome::Cancelled);
            })
            .await;

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.live_nodes(), 0);
        assert_eq!(session.with_graph(|g| g.node_count()), Some(2));
    }

    #[tokio::test]
    async fn stale_start_does_not_hijack_next_session() {
        let (session, control) = session(abc(), SessionOptions::default());
        let first_play = gate(&control.play_gates);

        let first = session.start();
        session.stop();
        let second = session.start();
        first_play.send(Ok(())).unwrap();

        assert_eq!(first.await.unwrap(), StartOutcome::Cancelled);
        assert!(matches!(second.await.unwrap(), StartOutcome::Playing(_)));
        assert!(session.is_playing());
    }

    #[tokio::test]
    async fn device_failure_leaves_idle() {
        let (session, control) = session(abc(), SessionOptions::default());
        control.fail_open.set(true);

        assert!(matches!(
            session.start().await,
            Err(PlaybackError::DeviceUnavailable(BackendError::NoDevice))
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_output());
    }

    #[tokio::test]
    async fn unloadable_source_unwinds() {
        let catalog = AudioCatalog::new(vec![SourceRef::from("broken.wav")]);
        let (session, _) = session(catalog, SessionOptions::default());

        assert!(matches!(
            session.start().await,
            Err(PlaybackError::SourceUnavailable { .. })
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.with_graph(|g| g.node_count()), Some(2));
    }

    #[tokio::test]
    async fn inverted_recipe_range_unwinds_to_idle() {
        use crate::recipe::{EffectStageSpec, ParamRange, RecipeStyle, StageKind};

        let recipe = ChainRecipe::new(
            RecipeStyle::Chain,
            vec![EffectStageSpec::new(
                1.0,
                StageKind::Gain {
                    level: ParamRange::new(2.0, 1.0),
                },
            )],
        );
        let (session, _) = session(abc(), SessionOptions::default().recipe(recipe));

        assert!(matches!(session.start().await, Err(PlaybackError::Recipe(_))));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.live_nodes(), 0);
        assert_eq!(session.with_graph(|g| g.node_count()), Some(2));
    }

    #[tokio::test]
    async fn frame_requests_follow_playing_state() {
        let (session, _) = session(abc(), SessionOptions::default());
        assert!(!session.take_frame_request());

        session.start().await.unwrap();
        assert!(session.take_frame_request());
        assert!(!session.take_frame_request());
        session.request_frame();

        session.stop();
        assert!(!session.take_frame_request());
        session.request_frame();
        assert!(!session.take_frame_request());
    }
}
