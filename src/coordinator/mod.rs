//! Lifecycle coordinator - wires the pipeline together.
//!
//! ```text
//! registry ──events──┐
//!                    ├──> loop thread ──> stubs ──> items.pack
//! ChangeWatcher ─────┘         │
//!                              └─(debounced)─> compile rules ──> load ──> engine
//! ```
//!
//! All mutation goes through one lock on [`State`], so a registry update
//! and a rules reload never interleave. Initialization runs in order and
//! stops at the first phase that cannot complete.

mod batch;
mod items;
mod rules;
mod state;


pub use state::Phase;

use std::fs;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::archive::{PackWriter, Packager, runtime_pack};
use crate::compiler::{CompileError, Compiler, Toolchain, toolchain_for};
use crate::config::Config;
use crate::engine::{EventSubscriber, NoopSubscriber, RuleEngine};
use crate::entity::{EntityRegistry, RegistryEvent, StubGenerator, TomlStubGenerator};
use crate::unit::SOURCE_EXT;
use crate::watch::{ChangeWatcher, WatchNotification, WatcherHandle};
use crate::{debug, log};

use batch::PendingChanges;
use state::State;

/// Collaborators and state shared with the loop thread.
pub(crate) struct Shared {
    config: Arc<Config>,
    registry: Arc<dyn EntityRegistry>,
    engine: Arc<dyn RuleEngine>,
    subscriber: Arc<dyn EventSubscriber>,
    stubs: Arc<dyn StubGenerator>,
    packager: Arc<dyn Packager>,
    compiler: Compiler,
    state: Mutex<State>,
}

pub struct CoordinatorBuilder {
    config: Arc<Config>,
    registry: Arc<dyn EntityRegistry>,
    engine: Arc<dyn RuleEngine>,
    toolchain: Option<Arc<dyn Toolchain>>,
    subscriber: Arc<dyn EventSubscriber>,
    stubs: Arc<dyn StubGenerator>,
    packager: Arc<dyn Packager>,
    watch: bool,
}

impl CoordinatorBuilder {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<dyn EntityRegistry>,
        engine: Arc<dyn RuleEngine>,
    ) -> Self {
        let watch = config.watch.enabled;
        Self {
            config,
            registry,
            engine,
            toolchain: None,
            subscriber: Arc::new(NoopSubscriber),
            stubs: Arc::new(TomlStubGenerator),
            packager: Arc::new(PackWriter),
            watch,
        }
    }

    pub fn with_toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscriber = subscriber;
        self
    }

    pub fn with_stubs(mut self, stubs: Arc<dyn StubGenerator>) -> Self {
        self.stubs = stubs;
        self
    }

    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    /// Skip the source watcher regardless of `[watch] enabled`.
    pub fn without_watcher(mut self) -> Self {
        self.watch = false;
        self
    }

    pub fn build(self) -> Result<LifecycleCoordinator, CompileError> {
        let toolchain = match self.toolchain {
            Some(toolchain) => toolchain,
            None => toolchain_for(&self.config)?,
        };
        let compiler = Compiler::new(Arc::clone(&self.config), toolchain);
        let (registry_tx, registry_rx) = channel::unbounded();

        Ok(LifecycleCoordinator {
            shared: Arc::new(Shared {
                config: self.config,
                registry: self.registry,
                engine: self.engine,
                subscriber: self.subscriber,
                stubs: self.stubs,
                packager: self.packager,
                compiler,
                state: Mutex::new(State::default()),
            }),
            watch: self.watch,
            registry_tx,
            registry_rx,
            watcher: Mutex::new(None),
            event_loop: Mutex::new(None),
        })
    }
}

/// Owns the pipeline from folder bootstrap to disposal.
pub struct LifecycleCoordinator {
    shared: Arc<Shared>,
    watch: bool,
    registry_tx: Sender<RegistryEvent>,
    registry_rx: Receiver<RegistryEvent>,
    watcher: Mutex<Option<WatcherHandle>>,
    event_loop: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
}

impl LifecycleCoordinator {
    /// Run every initialization phase in order.
    ///
    /// Returns the phase reached. Failing to create the folders stops
    /// everything; a failed compilation still loads what it can so the
    /// next edit can fix it.
    pub fn initialize(&self) -> Phase {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        if state.phase != Phase::Uninitialized {
            debug!("init"; "already initialized ({})", state.phase);
            return state.phase;
        }

        if let Err(e) = shared.bootstrap() {
            log!("error"; "{:#}", e);
            return state.phase;
        }
        state.phase = Phase::FoldersReady;

        shared.generate_all_stubs(&mut state);
        state.phase = Phase::StubsGenerated;

        if !shared.rebuild_items(&mut state) {
            log!("error"; "items are stale, rules may not resolve them");
        }
        state.phase = Phase::ItemsCompiled;

        shared.compile_rules(&mut state);
        state.phase = Phase::RulesCompiled;

        let contexts = shared.load_instances(&mut state);
        shared.subscriber.start();
        state.phase = Phase::InstancesLoaded;
        log!("init"; "{} rule(s) active", contexts);

        let watch_rx = if self.watch {
            let mut watcher = ChangeWatcher::new(shared.config.rules_dir(), SOURCE_EXT);
            let rx = watcher.subscribe();
            let handle = watcher.start();
            if handle.is_running() {
                state.phase = Phase::Watching;
            }
            *self.watcher.lock() = Some(handle);
            Some(rx)
        } else {
            None
        };
        drop(state);

        self.spawn_loop(watch_rx);
        self.phase()
    }

    fn spawn_loop(&self, watch_rx: Option<Receiver<WatchNotification>>) {
        let (stop_tx, stop_rx) = channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let registry_rx = self.registry_rx.clone();

        let spawned = std::thread::Builder::new()
            .name("hotrules-coordinator".into())
            .spawn(move || shared.run(&stop_rx, &registry_rx, watch_rx));
        match spawned {
            Ok(thread) => *self.event_loop.lock() = Some((stop_tx, thread)),
            Err(e) => log!("error"; "failed to spawn coordinator thread: {}", e),
        }
    }

    /// Sender for registry notifications, processed on the loop thread.
    pub fn registry_sender(&self) -> Sender<RegistryEvent> {
        self.registry_tx.clone()
    }

    /// Apply a registry notification synchronously.
    pub fn handle_registry_event(&self, event: &RegistryEvent) {
        let mut state = self.shared.state.lock();
        if state.phase == Phase::Disposed {
            return;
        }
        self.shared.apply_registry_event(&mut state, event);
        self.shared.rebuild_items(&mut state);
    }

    /// React to one change in the rules folder.
    pub fn handle_watch_notification(&self, notification: &WatchNotification) {
        log!(
            "watch";
            "{}: {}",
            notification.kind.label(),
            notification.path.display()
        );
        self.reload_rules();
    }

    /// Recompile and reload every rule.
    pub fn reload_rules(&self) {
        let mut state = self.shared.state.lock();
        if state.phase == Phase::Disposed {
            return;
        }
        self.shared.reload_rules(&mut state);
    }

    /// Stop the threads and clear the engine. Idempotent.
    pub fn dispose(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.phase == Phase::Disposed {
                return;
            }
            self.shared.engine.reset();
            state.phase = Phase::Disposed;
        }

        if let Some(mut watcher) = self.watcher.lock().take() {
            let exit = watcher.stop();
            debug!("dispose"; "watcher exit: {:?}", exit);
        }
        self.stop_loop();
        self.shared.subscriber.stop();
        log!("dispose"; "rules disposed");
    }

    fn stop_loop(&self) {
        if let Some((stop_tx, thread)) = self.event_loop.lock().take() {
            let _ = stop_tx.try_send(());
            let _ = thread.join();
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    pub fn items_stale(&self) -> bool {
        self.shared.state.lock().items_stale
    }

    pub fn rules_compiled_ok(&self) -> bool {
        self.shared.state.lock().rules_ok
    }

    /// Id of the last generation handed to the engine.
    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    pub fn watcher_running(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .is_some_and(WatcherHandle::is_running)
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        if let Some(mut watcher) = self.watcher.lock().take() {
            let _ = watcher.stop();
        }
        self.stop_loop();
    }
}

impl Shared {
    /// Create the folder layout and install the runtime archive.
    fn bootstrap(&self) -> Result<()> {
        let config = &self.config;
        let dirs = [
            config.working_dir().to_path_buf(),
            config.items_namespace_dir(),
            config.rules_dir().to_path_buf(),
            config.rule_classes_dir().to_path_buf(),
            config.extlib_dir().to_path_buf(),
            config.jar_dir().to_path_buf(),
        ];
        for dir in &dirs {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }

        let runtime = config.runtime_pack();
        runtime_pack()
            .save(&runtime)
            .with_context(|| format!("failed to install {}", runtime.display()))?;
        debug!("init"; "folders ready below {}", config.working_dir().display());
        Ok(())
    }

    /// Loop thread: registry events are applied as they come, watch
    /// notifications are debounced into a single reload.
    fn run(
        &self,
        stop_rx: &Receiver<()>,
        registry_rx: &Receiver<RegistryEvent>,
        mut watch_rx: Option<Receiver<WatchNotification>>,
    ) {
        let mut pending = PendingChanges::new(self.config.debounce());

        loop {
            let watch = watch_rx.clone().unwrap_or_else(channel::never);
            let timer = pending
                .deadline()
                .map(channel::at)
                .unwrap_or_else(channel::never);

            channel::select! {
                recv(stop_rx) -> _ => break,
                recv(registry_rx) -> msg => {
                    let Ok(first) = msg else { break };
                    let batch: Vec<_> = std::iter::once(first)
                        .chain(registry_rx.try_iter())
                        .collect();
                    self.on_registry_events(&batch);
                }
                recv(watch) -> msg => {
                    match msg {
                        Ok(notification) => pending.add(notification),
                        Err(_) => {
                            log!("watch"; "watcher stopped, rules are no longer reloaded on change");
                            watch_rx = None;
                        }
                    }
                }
                recv(timer) -> _ => {
                    if let Some(changes) = pending.take_if_ready() {
                        self.on_rule_changes(&changes);
                    }
                }
            }
        }
        debug!("coordinator"; "loop stopped");
    }

    fn on_registry_events(&self, events: &[RegistryEvent]) {
        let mut state = self.state.lock();
        if state.phase == Phase::Disposed {
            return;
        }
        for event in events {
            self.apply_registry_event(&mut state, event);
        }
        self.rebuild_items(&mut state);
    }

    fn on_rule_changes(&self, changes: &[WatchNotification]) {
        for change in changes {
            log!("watch"; "{}: {}", change.kind.label(), change.path.display());
        }
        let mut state = self.state.lock();
        if state.phase == Phase::Disposed {
            return;
        }
        self.reload_rules(&mut state);
    }
}
