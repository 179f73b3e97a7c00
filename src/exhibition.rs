//! The application state machine.
//!
//! [`Exhibition`] owns the scenes, the overlay and the dialogue, and moves
//! through three asynchronous phases without ever blocking the frame loop:
//!
//! 1. boot: wait for the render surface to prepare the start scene;
//! 2. build: import the environment into the game scene on a loader thread;
//! 3. entry: once the visitor asked to play and the build finished, configure
//!    the game scene, wait for the surface again, then swap it in.
//!
//! The host calls [`Exhibition::tick`] then [`Exhibition::render`] once per
//! frame and forwards window events to [`Exhibition::resize`],
//! [`Exhibition::click`] and [`Exhibition::key_pressed`]. Rendering and model
//! import are reached only through [`RenderSurface`] and [`AssetImporter`].

use std::task::Poll;

use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::collision::Ray;
use crate::config::ExhibitConfig;
use crate::dialogue::{DialoguePresenter, texts};
use crate::environment::{Environment, EnvironmentLoad};
use crate::importer::AssetImporter;
use crate::input::{Input, Modifiers};
use crate::scene::{Scene, SceneKind, SceneRegistry};
use crate::state::ApplicationState;
use crate::surface::RenderSurface;
use crate::ui::{Color, ElementId, Overlay, UiError};
use crate::walk_camera::WalkCamera;

/// Progress of the game scene.
#[derive(Debug)]
enum GamePhase {
    /// The start scene is not ready yet.
    Booting,
    Building(EnvironmentLoad),
    Built,
    /// The environment failed to import; holds the reason.
    Failed(String),
    /// Waiting for the surface to prepare the game scene.
    Entering,
    Playing,
}

impl GamePhase {
    fn label(&self) -> &'static str {
        match self {
            GamePhase::Booting => "booting",
            GamePhase::Building(_) => "building",
            GamePhase::Built => "built",
            GamePhase::Failed(_) => "failed",
            GamePhase::Entering => "entering",
            GamePhase::Playing => "playing",
        }
    }
}

/// What happened to a play request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayRequest {
    /// The game scene is built; the transition starts on the next tick.
    Accepted,
    /// The game scene is still loading; the transition starts when it is done.
    Deferred,
    /// The game scene failed to load.
    Refused,
    /// Not in the start state, or play was already requested.
    Ignored,
}

pub struct Exhibition<S: RenderSurface, I: AssetImporter> {
    config: ExhibitConfig,
    surface: S,
    importer: I,
    scenes: SceneRegistry,
    state: Option<ApplicationState>,
    phase: GamePhase,
    overlay: Overlay,
    dialogue: DialoguePresenter,
    play_requested: bool,
    picked: Option<String>,
    fps: f32,
}

impl<S: RenderSurface, I: AssetImporter> Exhibition<S, I> {
    /// Build the start scene and overlay. Nothing renders until the surface
    /// has prepared the start scene.
    pub fn new(config: ExhibitConfig, surface: S, importer: I) -> Result<Self, UiError> {
        let mut overlay = Overlay::new(config.window.width as f32, config.window.height as f32);
        overlay.validate()?;
        overlay.loading = true;

        let dialogue = DialoguePresenter::new(texts::INTRODUCTION);
        dialogue.show(&mut overlay)?;

        let background = config
            .assets
            .background
            .as_ref()
            .map(|path| config.asset_path(path));
        let start = Scene::start(
            background,
            Color::from_array(config.atmosphere.start_clear_color),
        );

        let mut scenes = SceneRegistry::new();
        scenes.stage(start);
        tracing::info!("Booting exhibition");

        Ok(Self {
            config,
            surface,
            importer,
            scenes,
            state: None,
            phase: GamePhase::Booting,
            overlay,
            dialogue,
            play_requested: false,
            picked: None,
            fps: 0.0,
        })
    }

    pub fn state(&self) -> Option<ApplicationState> {
        self.state
    }

    /// Force the state read by [`render`](Self::render).
    #[cfg(test)]
    pub(crate) fn override_state(&mut self, state: Option<ApplicationState>) {
        self.state = state;
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.scenes.active()
    }

    pub fn dialogue(&self) -> &DialoguePresenter {
        &self.dialogue
    }

    pub fn is_game_built(&self) -> bool {
        matches!(
            self.phase,
            GamePhase::Built | GamePhase::Entering | GamePhase::Playing
        )
    }

    /// Reason the environment failed to load, if it did.
    pub fn failure(&self) -> Option<&str> {
        match &self.phase {
            GamePhase::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Name of the last node hit by a click in the game scene.
    pub fn picked(&self) -> Option<&str> {
        self.picked.as_deref()
    }

    /// Advance every pending phase. Called once per frame before rendering.
    pub fn tick(&mut self, dt: f32, input: &Input) {
        self.overlay.elapsed += dt;
        if dt > 0.0 {
            let instant = 1.0 / dt;
            self.fps = if self.fps == 0.0 {
                instant
            } else {
                self.fps * 0.9 + instant * 0.1
            };
        }

        // Several phases can complete within one frame
        while self.step() {}

        if matches!(self.phase, GamePhase::Playing) {
            self.update_game(dt, input);
        }

        if self.overlay.debug.is_some() {
            self.overlay.debug = Some(self.debug_lines());
        }
    }

    /// Run at most one phase transition. Returns `true` if one happened.
    fn step(&mut self) -> bool {
        match self.phase {
            GamePhase::Booting => self.enter_start(),
            GamePhase::Building(_) => self.poll_build(),
            GamePhase::Built if self.play_requested => {
                self.begin_game_entry();
                true
            }
            GamePhase::Entering => self.finish_game_entry(),
            _ => false,
        }
    }

    fn enter_start(&mut self) -> bool {
        let ready = match self.scenes.pending() {
            Some(start) => self.surface.prepare(start),
            None => false,
        };
        if !ready {
            return false;
        }

        self.overlay.loading = false;
        self.scenes.activate_pending(&mut self.surface);
        self.state = Some(ApplicationState::Start);
        if let Some(start) = self.scenes.active_mut() {
            start.attach_control();
        }
        tracing::info!("State {}", ApplicationState::Start);

        self.scenes.stage(Scene::new(SceneKind::Game));
        let environment = Environment::new(
            self.config.asset_path(&self.config.assets.environment_model),
            self.config.environment.flag_policy,
        );
        self.phase = GamePhase::Building(environment.begin_load(&self.importer));
        true
    }

    fn poll_build(&mut self) -> bool {
        let GamePhase::Building(load) = &mut self.phase else {
            return false;
        };
        let result = match load.poll() {
            Poll::Pending => return false,
            Poll::Ready(result) => result,
        };

        match result {
            Ok(asset) => {
                let count = match self.scenes.pending_mut() {
                    Some(game) => game.install_environment(&asset),
                    None => 0,
                };
                tracing::info!("Environment '{}' ready with {count} nodes", asset.root);
                self.phase = GamePhase::Built;
            }
            Err(err) => {
                tracing::error!("Failed to load the exhibition environment: {err}");
                self.phase = GamePhase::Failed(err.to_string());
                if self.play_requested {
                    self.refuse_play();
                }
            }
        }
        true
    }

    fn begin_game_entry(&mut self) {
        if let Some(start) = self.scenes.active_mut() {
            start.detach_control();
        }

        if let Some(game) = self.scenes.pending_mut() {
            game.apply_atmosphere(&self.config.atmosphere);
            game.set_lights(&self.config.lights.0);
            game.skybox = Some(self.config.asset_path(&self.config.assets.skybox));
        }

        self.overlay.loading = true;
        self.phase = GamePhase::Entering;
        tracing::info!("Entering the exhibition");
    }

    fn finish_game_entry(&mut self) -> bool {
        let ready = match self.scenes.pending() {
            Some(game) => self.surface.prepare(game),
            None => false,
        };
        if !ready {
            return false;
        }

        if let Some(game) = self.scenes.pending_mut() {
            let mut walker = WalkCamera::from_config(&self.config.camera, &self.config.physics);
            walker.apply_gravity = true;
            walker.check_collisions = self.config.physics.collisions;
            game.camera = walker.camera();
            game.walker = Some(walker);
        }

        self.scenes.activate_pending(&mut self.surface);
        self.state = Some(ApplicationState::Game);
        self.overlay.loading = false;
        self.overlay.dismiss();
        if let Some(game) = self.scenes.active_mut() {
            game.attach_control();
            game.follow_camera_lights();
        }
        self.phase = GamePhase::Playing;
        tracing::info!("State {}", ApplicationState::Game);
        true
    }

    fn update_game(&mut self, dt: f32, input: &Input) {
        let Some(scene) = self.scenes.active_mut() else {
            return;
        };
        if !scene.control_attached() {
            return;
        }

        scene.update_walker(input, dt);
        scene.follow_camera_lights();
    }

    fn refuse_play(&mut self) {
        self.play_requested = false;
        self.overlay.loading = false;
        let reason = self.failure().unwrap_or("unknown error").to_string();
        tracing::error!("Cannot start the exhibition: {reason}");
        self.overlay.notice = Some(format!("The exhibition could not be loaded: {reason}"));
    }

    /// Ask to leave the start scene for the exhibition.
    pub fn request_play(&mut self) -> PlayRequest {
        if self.state != Some(ApplicationState::Start) || self.play_requested {
            tracing::debug!("Ignoring play request");
            return PlayRequest::Ignored;
        }

        match self.phase {
            GamePhase::Failed(_) => {
                self.refuse_play();
                PlayRequest::Refused
            }
            GamePhase::Building(_) => {
                self.play_requested = true;
                self.overlay.loading = true;
                tracing::info!("Play requested while the environment is loading");
                PlayRequest::Deferred
            }
            GamePhase::Built => {
                self.play_requested = true;
                self.overlay.loading = true;
                PlayRequest::Accepted
            }
            _ => PlayRequest::Ignored,
        }
    }

    /// Render the active scene once, or nothing without a state.
    pub fn render(&mut self) {
        let Some(state) = self.state else {
            return;
        };
        if !state.renders() {
            return;
        }
        if let Some(scene) = self.scenes.active() {
            self.surface.render(scene, &self.overlay);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        if width > 0 && height > 0 {
            self.overlay.layout(width as f32, height as f32);
        }
    }

    /// Handle a left click at a window position.
    pub fn click(&mut self, position: Vec2) {
        match self.state {
            Some(ApplicationState::Start) => {
                if let Some(id) = self.overlay.hit_test(position) {
                    if let Err(err) = self.activate_element(id) {
                        tracing::warn!("Overlay action failed: {err}");
                    }
                }
            }
            Some(ApplicationState::Game) => self.pick(position),
            _ => {}
        }
    }

    fn activate_element(&mut self, id: ElementId) -> Result<(), UiError> {
        tracing::debug!("Clicked '{id}'");
        match id {
            ElementId::Start => {
                self.overlay.reveal_intro()?;
                self.dialogue.show(&mut self.overlay)?;
            }
            ElementId::NavigatorSx => {
                self.dialogue.previous(&mut self.overlay)?;
            }
            ElementId::NavigatorDx => {
                self.dialogue.next(&mut self.overlay)?;
            }
            ElementId::Play => {
                self.request_play();
            }
            ElementId::Intro | ElementId::Description => {}
        }
        Ok(())
    }

    fn pick(&mut self, position: Vec2) {
        let Some(scene) = self.scenes.active() else {
            return;
        };
        let (width, height) = (self.overlay.width(), self.overlay.height());
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        let camera = scene.camera;
        let ray = Ray::from_screen(
            position.x,
            position.y,
            width,
            height,
            camera.view_matrix(),
            camera.projection_matrix(width / height),
        );
        if let Some((hit, name)) = scene.pick(&ray) {
            tracing::info!("Picked '{name}' at {:.2} units", hit.distance);
            self.picked = Some(name);
        }
    }

    pub fn key_pressed(&mut self, key: KeyCode, modifiers: Modifiers) {
        if key == KeyCode::KeyI && modifiers.shift && modifiers.ctrl && modifiers.alt {
            self.toggle_debug();
            return;
        }

        if self.state != Some(ApplicationState::Start) || !self.overlay.intro_revealed() {
            return;
        }
        let result = match key {
            KeyCode::ArrowLeft => self.dialogue.previous(&mut self.overlay).map(|_| ()),
            KeyCode::ArrowRight => self.dialogue.next(&mut self.overlay).map(|_| ()),
            KeyCode::Enter | KeyCode::NumpadEnter => {
                self.request_play();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            tracing::warn!("Dialogue navigation failed: {err}");
        }
    }

    pub fn toggle_debug(&mut self) {
        self.overlay.debug = match self.overlay.debug {
            Some(_) => None,
            None => Some(self.debug_lines()),
        };
        tracing::debug!("Debug overlay {}", if self.overlay.debug.is_some() { "on" } else { "off" });
    }

    fn debug_lines(&self) -> Vec<String> {
        let state = self
            .state
            .map_or_else(|| "none".to_string(), |s| s.to_string());
        let mut lines = vec![
            format!("state: {state}"),
            format!("game: {}", self.phase.label()),
            format!("fps: {:.0}", self.fps),
        ];
        if let Some(scene) = self.scenes.active() {
            let p = scene.camera.position;
            lines.push(format!("scene: {} ({} nodes)", scene.id, scene.node_count()));
            lines.push(format!("camera: {:.2} {:.2} {:.2}", p.x, p.y, p.z));
        }
        if let Some(name) = &self.picked {
            lines.push(format!("picked: {name}"));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Material, RawGeometry};
    use crate::importer::{ImportError, ImportResult, ImportedMesh, ImportedModel, PendingImport};
    use crate::mesh::Vertex3d;
    use crate::scene::SceneId;
    use glam::{Mat4, Vec3};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::mpsc::Sender;

    struct RecordingSurface {
        ready: bool,
        renders: HashMap<String, usize>,
        resizes: Vec<(u32, u32)>,
        releases: Vec<SceneId>,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self {
                ready: true,
                renders: HashMap::new(),
                resizes: Vec::new(),
                releases: Vec::new(),
            }
        }

        fn render_count(&self, scene: &str) -> usize {
            self.renders.get(scene).copied().unwrap_or(0)
        }

        fn total_renders(&self) -> usize {
            self.renders.values().sum()
        }
    }

    impl RenderSurface for RecordingSurface {
        fn prepare(&mut self, _: &Scene) -> bool {
            self.ready
        }

        fn render(&mut self, scene: &Scene, _: &Overlay) {
            *self.renders.entry(scene.id.as_str().to_string()).or_default() += 1;
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn release(&mut self, id: &SceneId) {
            self.releases.push(id.clone());
        }
    }

    fn slab(name: &str, min: Vec3, max: Vec3) -> ImportedMesh {
        let vertices = vec![
            Vertex3d::new(min.into(), [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new(max.into(), [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([max.x, min.y, min.z], [0.0, 1.0, 0.0], [1.0, 0.0]),
        ];
        ImportedMesh {
            name: name.to_string(),
            transform: Mat4::IDENTITY,
            geometry: RawGeometry::new(vertices, vec![0, 1, 2]),
            material: Material::default(),
        }
    }

    fn gallery() -> ImportedModel {
        ImportedModel {
            root: "__root__".to_string(),
            meshes: vec![
                slab(
                    "floor_collision",
                    Vec3::new(-20.0, -1.0, -20.0),
                    Vec3::new(20.0, 0.0, 20.0),
                ),
                slab(
                    "curtain_cloth",
                    Vec3::new(-5.0, 0.0, -10.0),
                    Vec3::new(5.0, 4.0, -9.0),
                ),
                slab("floor_deco", Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.1, 1.0)),
            ],
            images: Vec::new(),
        }
    }

    struct Immediate;

    impl AssetImporter for Immediate {
        fn import(&self, path: &Path) -> PendingImport {
            PendingImport::resolved(path, Ok(gallery()))
        }
    }

    struct Failing;

    impl AssetImporter for Failing {
        fn import(&self, path: &Path) -> PendingImport {
            PendingImport::resolved(path, Err(ImportError::EmptyDocument(path.to_path_buf())))
        }
    }

    /// Hands out imports whose senders it keeps, so they resolve only when a
    /// test says so.
    #[derive(Default)]
    struct Manual {
        senders: RefCell<Vec<Sender<ImportResult>>>,
    }

    impl Manual {
        fn complete(&self, result: ImportResult) {
            let sender = self.senders.borrow_mut().pop().unwrap();
            sender.send(result).unwrap();
        }
    }

    impl AssetImporter for &Manual {
        fn import(&self, path: &Path) -> PendingImport {
            let (sender, pending) = PendingImport::channel(path);
            self.senders.borrow_mut().push(sender);
            pending
        }
    }

    fn exhibition<I: AssetImporter>(importer: I) -> Exhibition<RecordingSurface, I> {
        Exhibition::new(ExhibitConfig::default(), RecordingSurface::new(), importer).unwrap()
    }

    fn tick<I: AssetImporter>(ex: &mut Exhibition<RecordingSurface, I>) {
        ex.tick(1.0 / 60.0, &Input::new());
    }

    fn center_of(ex: &Exhibition<RecordingSurface, impl AssetImporter>, id: ElementId) -> Vec2 {
        let rect = ex.overlay().element(id).unwrap().rect;
        Vec2::new(rect.x + rect.width * 0.5, rect.y + rect.height * 0.5)
    }

    #[test]
    fn nothing_renders_before_start_is_ready() {
        let mut ex = exhibition(Immediate);
        ex.surface_mut().ready = false;

        tick(&mut ex);
        ex.render();
        assert_eq!(ex.state(), None);
        assert_eq!(ex.surface().total_renders(), 0);
        assert!(ex.overlay().loading);

        ex.surface_mut().ready = true;
        tick(&mut ex);
        ex.render();
        assert_eq!(ex.state(), Some(ApplicationState::Start));
        assert_eq!(ex.surface().render_count("start"), 1);
        assert!(!ex.overlay().loading);
        assert!(ex.surface().releases.is_empty());
    }

    #[test]
    fn every_state_renders_the_active_scene_once() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);

        for (i, state) in ApplicationState::ALL.into_iter().enumerate() {
            ex.override_state(Some(state));
            ex.render();
            assert_eq!(ex.surface().render_count("start"), i + 1, "{state}");
        }

        for raw in [4u8, 7, 255] {
            ex.override_state(ApplicationState::from_raw(raw));
            ex.render();
        }
        assert_eq!(ex.surface().total_renders(), ApplicationState::ALL.len());
    }

    #[test]
    fn start_to_game_releases_start_exactly_once() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);
        assert!(ex.is_game_built());

        assert_eq!(ex.request_play(), PlayRequest::Accepted);
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Game));

        for _ in 0..10 {
            tick(&mut ex);
            ex.render();
        }

        assert_eq!(ex.surface().releases, vec![SceneId::new("start")]);
        let game = ex.active_scene().unwrap();
        assert_eq!(game.id.as_str(), "game");
        assert_eq!(game.node_count(), 3);
        assert_eq!(game.root.as_deref(), Some("__root__"));
        assert!(game.control_attached());
        assert!(game.skybox.is_some());
        assert_eq!(ex.surface().render_count("game"), 10);
        assert!(!ex.overlay().loading);
    }

    #[test]
    fn game_scene_gets_walker_with_physics() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);
        ex.request_play();
        tick(&mut ex);

        let game = ex.active_scene().unwrap();
        let walker = game.walker.as_ref().unwrap();
        assert!(walker.apply_gravity);
        assert!(walker.check_collisions);
        assert_eq!(walker.ellipsoid, Vec3::new(1.0, 1.5, 1.0));

        let omni = game.lights.iter().find(|l| l.follow_camera).unwrap();
        assert_eq!(omni.position, game.camera.position);

        for _ in 0..60 {
            tick(&mut ex);
        }
        let game = ex.active_scene().unwrap();
        assert!((game.camera.position.y - 1.5).abs() < 1e-3, "lands on the floor");
    }

    #[test]
    fn game_entry_waits_for_the_surface() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);
        ex.surface_mut().ready = false;
        ex.request_play();

        for _ in 0..5 {
            tick(&mut ex);
        }
        assert_eq!(ex.state(), Some(ApplicationState::Start));
        assert!(ex.overlay().loading);
        assert!(!ex.active_scene().unwrap().control_attached());

        ex.surface_mut().ready = true;
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Game));
    }

    #[test]
    fn unresolved_import_keeps_game_unreachable() {
        let importer = Manual::default();
        let mut ex = exhibition(&importer);
        tick(&mut ex);

        assert_eq!(ex.request_play(), PlayRequest::Deferred);
        for _ in 0..300 {
            tick(&mut ex);
            ex.render();
        }

        assert_eq!(ex.state(), Some(ApplicationState::Start));
        assert!(ex.overlay().loading);
        assert!(ex.surface().releases.is_empty());
        assert_eq!(ex.surface().render_count("start"), 300);
        assert_eq!(ex.request_play(), PlayRequest::Ignored);
    }

    #[test]
    fn deferred_play_fires_when_build_completes() {
        let importer = Manual::default();
        let mut ex = exhibition(&importer);
        tick(&mut ex);
        ex.request_play();
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Start));

        importer.complete(Ok(gallery()));
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Game));
        assert_eq!(ex.surface().releases, vec![SceneId::new("start")]);
    }

    #[test]
    fn failed_build_refuses_play() {
        let mut ex = exhibition(Failing);
        tick(&mut ex);
        assert!(ex.failure().is_some());

        assert_eq!(ex.request_play(), PlayRequest::Refused);
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Start));
        assert!(!ex.overlay().loading);
        assert!(ex.overlay().notice.as_deref().unwrap().contains("no scene"));
    }

    #[test]
    fn failure_after_deferred_play_is_reported() {
        let importer = Manual::default();
        let mut ex = exhibition(&importer);
        tick(&mut ex);
        ex.request_play();

        importer.complete(Err(ImportError::Interrupted(Path::new("x").to_path_buf())));
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Start));
        assert!(ex.overlay().notice.is_some());
        assert!(!ex.overlay().loading);
    }

    #[test]
    fn play_outside_start_is_ignored() {
        let mut ex = exhibition(Immediate);
        ex.surface_mut().ready = false;
        tick(&mut ex);
        assert_eq!(ex.request_play(), PlayRequest::Ignored);

        ex.surface_mut().ready = true;
        tick(&mut ex);
        ex.request_play();
        tick(&mut ex);
        assert_eq!(ex.request_play(), PlayRequest::Ignored);
    }

    #[test]
    fn one_resize_per_notification_in_every_state() {
        let mut ex = exhibition(Immediate);
        ex.surface_mut().ready = false;

        ex.resize(800, 600);
        assert_eq!(ex.surface().resizes.len(), 1);

        ex.surface_mut().ready = true;
        tick(&mut ex);
        ex.resize(1024, 768);
        assert_eq!(ex.surface().resizes.len(), 2);

        ex.request_play();
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Game));
        ex.resize(1920, 1080);
        ex.resize(0, 0);
        assert_eq!(
            ex.surface().resizes,
            vec![(800, 600), (1024, 768), (1920, 1080), (0, 0)]
        );
        assert_eq!(ex.overlay().width(), 1920.0);
    }

    #[test]
    fn clicks_drive_the_introduction() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);

        ex.click(center_of(&ex, ElementId::Start));
        assert!(ex.overlay().intro_revealed());

        ex.click(center_of(&ex, ElementId::NavigatorDx));
        assert_eq!(ex.dialogue().cursor().page, 1);
        ex.click(center_of(&ex, ElementId::NavigatorSx));
        ex.click(center_of(&ex, ElementId::NavigatorSx));
        assert_eq!(ex.dialogue().cursor().page, 0);

        ex.click(center_of(&ex, ElementId::Play));
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Game));
    }

    #[test]
    fn arrow_keys_page_and_enter_plays() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);

        // Hidden introduction ignores navigation
        ex.key_pressed(KeyCode::ArrowRight, Modifiers::NONE);
        assert_eq!(ex.dialogue().cursor().page, 0);

        ex.click(center_of(&ex, ElementId::Start));
        for _ in 0..5 {
            ex.key_pressed(KeyCode::ArrowRight, Modifiers::NONE);
        }
        assert_eq!(ex.dialogue().cursor().page, 3);
        let next = ex.overlay().element(ElementId::NavigatorDx).unwrap();
        assert_eq!(next.opacity, 0.5);

        ex.key_pressed(KeyCode::Enter, Modifiers::NONE);
        tick(&mut ex);
        assert_eq!(ex.state(), Some(ApplicationState::Game));
    }

    #[test]
    fn debug_chord_toggles_overlay() {
        let mut ex = exhibition(Immediate);
        ex.key_pressed(KeyCode::KeyI, Modifiers::NONE);
        assert!(ex.overlay().debug.is_none());
        let partial = Modifiers {
            shift: true,
            ctrl: true,
            alt: false,
        };
        ex.key_pressed(KeyCode::KeyI, partial);
        assert!(ex.overlay().debug.is_none());

        ex.key_pressed(KeyCode::KeyI, Modifiers::ALL);
        assert!(ex.overlay().debug.is_some());
        tick(&mut ex);
        let lines = ex.overlay().debug.clone().unwrap();
        assert!(lines.iter().any(|l| l == "state: START"));

        ex.key_pressed(KeyCode::KeyI, Modifiers::ALL);
        assert!(ex.overlay().debug.is_none());
    }

    #[test]
    fn game_clicks_pick_the_nearest_node() {
        let mut ex = exhibition(Immediate);
        tick(&mut ex);
        ex.request_play();
        tick(&mut ex);

        // Initial view looks straight down at the floor
        let center = Vec2::new(ex.overlay().width() * 0.5, ex.overlay().height() * 0.5);
        ex.click(center);
        assert_eq!(ex.picked(), Some("floor_collision"));
    }
}
