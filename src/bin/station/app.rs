//! Event loop: input, session control, display frames.

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::DefaultTerminal;
use tracing::{debug, info, warn};

use saavy_station::blog::{BlogLoader, BlogView};
use saavy_station::config::StationConfig;
use saavy_station::io::device::CpalBackend;
use saavy_station::io::{load_backgrounds, load_catalog};
use saavy_station::site::{Navigator, Page, PageAction};
use saavy_station::{BarPolicy, BarStyle, PlaybackSession, StartOutcome, VisualizerFeed};

use crate::ui;

/// Everything the UI draws from.
pub struct App {
    pub session: PlaybackSession<CpalBackend>,
    pub nav: Navigator,
    pub bars: Vec<BarStyle>,
    pub policy: BarPolicy,
    pub blog_view: Option<BlogView>,
    pub blog_scroll: u16,
    pub hold_to_play: bool,
    feed: VisualizerFeed,
    blog: BlogLoader,
    rng: StdRng,
    was_playing: bool,
    should_quit: bool,
}

impl App {
    fn new(config: &StationConfig, hold_to_play: bool) -> Self {
        let provider = config.catalog.provider();
        let catalog = load_catalog(&provider);
        let backgrounds = load_backgrounds(&provider);
        info!(
            tracks = catalog.len(),
            images = backgrounds.len(),
            dir = %config.catalog.audio_dir.display(),
            "loaded catalog"
        );

        let backend = match &config.playback.device {
            Some(name) => CpalBackend::new().with_device_name(name.clone()),
            None => CpalBackend::new(),
        };
        let session = PlaybackSession::new(backend, catalog, config.session_options());
        let policy = config.visualizer.policy;
        let mut rng = match config.playback.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let bars = policy.idle_bars(&mut rng, config.visualizer.bars);

        Self {
            session,
            nav: Navigator::new(config.start_page),
            bars,
            policy,
            blog_view: None,
            blog_scroll: 0,
            hold_to_play,
            feed: VisualizerFeed::new(policy, config.visualizer.bars),
            blog: BlogLoader::new(&config.blog.path, backgrounds),
            rng,
            was_playing: false,
            should_quit: false,
        }
    }

    fn trigger_down(&self) {
        let start = self.session.start();
        tokio::task::spawn_local(async move {
            match start.await {
                Ok(StartOutcome::Playing(track)) => info!(track = %track, "now playing"),
                Ok(outcome) => debug!(?outcome, "start settled"),
                // Nothing plays; the session is idle again
                Err(e) => warn!(error = %e, "start failed"),
            }
        });
    }

    fn trigger_up(&self) {
        self.session.stop();
    }

    fn toggle(&self) {
        if self.session.state() == saavy_station::SessionState::Idle {
            self.trigger_down();
        } else {
            self.trigger_up();
        }
    }

    fn activate(&mut self, page: Page) {
        if let Some(action) = self.nav.activate(page) {
            self.run_action(action);
        }
    }

    fn run_action(&mut self, action: PageAction) {
        match action {
            PageAction::LoadBlog => {
                self.blog_view = Some(self.blog.load(&mut self.rng));
                self.blog_scroll = 0;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let trigger = matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter);

        match key.kind {
            KeyEventKind::Repeat => {}
            KeyEventKind::Release => {
                if trigger && self.hold_to_play {
                    self.trigger_up();
                }
            }
            KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('1') => self.activate(Page::Top),
                KeyCode::Char('2') => self.activate(Page::Musics),
                KeyCode::Char('3') => self.activate(Page::Blog),
                KeyCode::Tab | KeyCode::Right => self.activate(self.nav.active().next()),
                KeyCode::BackTab | KeyCode::Left => self.activate(self.nav.active().previous()),
                KeyCode::Down | KeyCode::Char('j') => {
                    self.blog_scroll = self.blog_scroll.saturating_add(1)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.blog_scroll = self.blog_scroll.saturating_sub(1)
                }
                _ if trigger && self.nav.active() == Page::Musics => {
                    if self.hold_to_play {
                        self.trigger_down();
                    } else {
                        self.toggle();
                    }
                }
                _ => {}
            },
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            // Pointer-leave counterpart
            Event::FocusLost => self.trigger_up(),
            _ => {}
        }
    }

    fn display_frame(&mut self) {
        let bars = &mut self.bars;
        self.feed
            .on_display_frame(&self.session, |styles| *bars = styles.to_vec());

        let playing = self.session.is_playing();
        if self.was_playing && !playing {
            self.bars = self.policy.idle_bars(&mut self.rng, self.feed.bar_count());
        }
        self.was_playing = playing;
    }
}

/// Run until the user quits.
pub async fn run(config: StationConfig, terminal: &mut DefaultTerminal) -> EyreResult<()> {
    let hold_to_play = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
    if hold_to_play {
        execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    execute!(std::io::stdout(), event::EnableFocusChange)?;
    info!(hold_to_play, "terminal ready");

    let mut app = App::new(&config, hold_to_play);
    if let Some(action) = app.nav.initial_action() {
        app.run_action(action);
    }

    let frame = Duration::from_secs_f64(1.0 / config.visualizer.frame_rate as f64);
    let mut ticker = tokio::time::interval(frame);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        ticker.tick().await;

        let mut input = Ok(());
        while matches!(event::poll(Duration::ZERO), Ok(true)) {
            match event::read() {
                Ok(event) => app.handle_event(event),
                Err(e) => {
                    input = Err(e);
                    break;
                }
            }
        }
        if let Err(e) = input {
            break Err(e.into());
        }
        if app.should_quit {
            break Ok(());
        }

        app.display_frame();
        if let Err(e) = terminal.draw(|frame| ui::render(frame, &app)) {
            break Err(e.into());
        }
    };

    app.session.stop();
    execute!(std::io::stdout(), event::DisableFocusChange)?;
    if hold_to_play {
        execute!(std::io::stdout(), PopKeyboardEnhancementFlags)?;
    }
    result
}
