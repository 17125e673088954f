//! Watch mode: recompile when the article directory changes.
//!
//! # Architecture
//!
//! ```text
//! FileSystem::watch ──filter──► mpsc ──► run_scheduler ──spawn_blocking──► rebuild
//!                                          │    ▲                              │
//!                                          │    └──────────── done ◄───────────┘
//!                                          ▼
//!                                      Automaton (Idle → Casting → Cooldown)
//! ```
//!
//! The scheduler runs on its own thread with a current-thread tokio
//! runtime. It owns the only timer, feeds events into the [`Automaton`]
//! and carries out the actions it returns.

mod automaton;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

use crate::compiler::CompilerContext;
use crate::fs::FsWatcher;
use crate::options::{CompileOptions, ResolvedOptions, resolve_or_exit};
use crate::utils::is_hidden;
use crate::{build, debug, log, logger};

pub use automaton::{Action, Automaton, CAST_DELAY, COOLDOWN_DELAY, WatchState};

/// One compile, run on a blocking thread.
pub(crate) type RebuildFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A running watch session. Dropping it stops the session.
#[derive(Debug)]
pub struct WatchHandle {
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    watcher: Mutex<Option<FsWatcher>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Close the listener and cancel pending timers.
    ///
    /// A compile already running finishes; no new one starts. Calling this
    /// more than once is harmless.
    pub fn stop(&self) {
        drop(self.watcher.lock().take());
        if let Some(tx) = self.stop_tx.lock().take() {
            tx.send(()).ok();
            log!("watch"; "stopped");
        }
    }

    /// Block until the session ends, including any in-flight compile.
    ///
    /// Returns only after [`WatchHandle::stop`] was called.
    pub fn wait(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow!("watch thread panicked")),
            None => Ok(()),
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start watching `options.input_dir`, compiling once immediately.
///
/// Invalid options are reported and terminate the process, like [`crate::build`].
pub fn watch(options: CompileOptions) -> Result<WatchHandle> {
    logger::set_silent(options.silent);
    let options = Arc::new(resolve_or_exit(options));

    let compiler = Arc::new(Mutex::new(CompilerContext::new()));
    let rebuild: RebuildFn = {
        let options = Arc::clone(&options);
        Arc::new(move || build::rebuild(&options, &mut compiler.lock()))
    };

    options
        .input_fs
        .create_dir_all(&options.input_dir)
        .with_context(|| format!("cannot access input directory `{}`", options.input_dir.display()))?;

    let (changes_tx, changes_rx) = mpsc::unbounded_channel();
    let watcher = {
        let filter = Arc::clone(&options);
        options
            .input_fs
            .watch(
                &options.input_dir,
                Box::new(move |path| {
                    if is_relevant(&filter, &path) {
                        debug!("watch"; "changed: {}", path.display());
                        changes_tx.send(path).ok();
                    }
                }),
            )
            .with_context(|| format!("cannot watch `{}`", options.input_dir.display()))?
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("cannot start watch runtime")?;
    let (stop_tx, stop_rx) = oneshot::channel();
    let thread = std::thread::Builder::new()
        .name("justmark-watch".into())
        .spawn(move || runtime.block_on(run_scheduler(changes_rx, stop_rx, rebuild, true)))
        .context("cannot spawn watch thread")?;

    log!("watch"; "watching {}", options.input_dir.display());

    Ok(WatchHandle {
        stop_tx: Mutex::new(Some(stop_tx)),
        watcher: Mutex::new(Some(watcher)),
        thread: Some(thread),
    })
}

/// Drive the automaton until `stop` fires or the change source closes.
///
/// With `initial`, one compile is launched before any change arrives.
pub(crate) async fn run_scheduler(
    mut changes: mpsc::UnboundedReceiver<PathBuf>,
    mut stop: oneshot::Receiver<()>,
    rebuild: RebuildFn,
    initial: bool,
) {
    let mut automaton = Automaton::default();
    let mut deadline: Option<Instant> = None;
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();

    if initial {
        let action = automaton.cast();
        apply(action, &mut deadline, &rebuild, &done_tx);
    }

    loop {
        let action = tokio::select! {
            biased;
            _ = &mut stop => break,
            change = changes.recv() => match change {
                Some(_) => automaton.on_change(),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                automaton.on_timer()
            }
            Some(()) = done_rx.recv() => {
                logger::separator();
                automaton.on_build_finished()
            }
        };
        apply(action, &mut deadline, &rebuild, &done_tx);
    }

    debug!("watch"; "scheduler exited in state {:?}", automaton.state());
}

fn apply(
    action: Action,
    deadline: &mut Option<Instant>,
    rebuild: &RebuildFn,
    done: &mpsc::UnboundedSender<()>,
) {
    match action {
        Action::None => {}
        Action::StartTimer(delay) => *deadline = Some(Instant::now() + delay),
        Action::LaunchCompile(delay) => {
            launch(rebuild, done);
            *deadline = Some(Instant::now() + delay);
        }
    }
}

fn launch(rebuild: &RebuildFn, done: &mpsc::UnboundedSender<()>) {
    let rebuild = Arc::clone(rebuild);
    let done = BuildDone(done.clone());
    tokio::task::spawn_blocking(move || {
        let _done = done;
        if let Err(e) = rebuild() {
            logger::error_chain("error", &e);
        }
    });
}

/// Reports the end of a compile when dropped, including by a panic.
struct BuildDone(mpsc::UnboundedSender<()>);

impl Drop for BuildDone {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log!("error"; "compile panicked");
        }
        self.0.send(()).ok();
    }
}

/// Whether a reported path should wake the scheduler.
fn is_relevant(options: &ResolvedOptions, path: &Path) -> bool {
    !(is_hidden(&options.input_dir, path)
        || is_temp_file(path)
        || path.starts_with(&options.output_dir))
}

/// Editor swap and backup files.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || (name.starts_with('#') && name.ends_with('#'))
}
