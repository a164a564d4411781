//! Scripting engine boundary.
//!
//! Movable objects never talk to a scripting language directly. They go through
//! [`ScriptEngine`], which deals in typed [`NamespaceHandle`]s; how a namespace is
//! represented inside the engine is the engine's business. [`LuaEngine`] is the
//! production implementation.

mod lua;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::console::Console;
use crate::registry::UniqueId;
use crate::time::SimClock;

pub use self::lua::LuaEngine;

/// Callbacks a script may define. Each one is captured per preset and per script path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptCallback {
    Create,
    Destroy,
    Update,
    OnPieMenu,
    OnEnableScript,
    OnDisableScript,
}

impl ScriptCallback {
    pub const ALL: [Self; 6] = [
        Self::Create,
        Self::Destroy,
        Self::Update,
        Self::OnPieMenu,
        Self::OnEnableScript,
        Self::OnDisableScript,
    ];

    /// Name of the global function a script file declares for this callback.
    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Destroy => "Destroy",
            Self::Update => "Update",
            Self::OnPieMenu => "OnPieMenu",
            Self::OnEnableScript => "OnEnableScript",
            Self::OnDisableScript => "OnDisableScript",
        }
    }
}

impl fmt::Display for ScriptCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Shared by every instance created from the same preset. Holds captured callbacks.
    Preset,
    /// One per live object. Holds the script-side representation of that object.
    Instance,
}

/// Opaque reference to a namespace declared inside the scripting engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NamespaceHandle {
    kind: NamespaceKind,
    class_name: &'static str,
    id: u64,
}

impl NamespaceHandle {
    pub fn new(kind: NamespaceKind, class_name: &'static str, id: u64) -> Self {
        Self {
            kind,
            class_name,
            id,
        }
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for NamespaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NamespaceKind::Preset => "preset",
            NamespaceKind::Instance => "instance",
        };
        write!(f, "{}:{kind}:{}", self.class_name, self.id)
    }
}

/// What the scripting engine is told about a native object when it is bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeHandle {
    pub unique_id: UniqueId,
    pub class_name: &'static str,
    pub preset_name: String,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Lua(#[from] mlua::Error),
    #[error("namespace {0} is not defined")]
    MissingNamespace(NamespaceHandle),
    #[error("{0}")]
    Rejected(String),
}

/// Interface the simulation core consumes from the scripting engine.
pub trait ScriptEngine {
    /// Execute a script file, letting it declare its callbacks as globals.
    fn run_script_file(&mut self, path: &str) -> Result<(), EngineError>;

    fn run_script_string(&mut self, code: &str) -> Result<(), EngineError>;

    /// Evaluate `expr` and report whether it is truthy. Evaluation errors count as false.
    fn expression_is_true(&self, expr: &str) -> bool;

    /// Forget every global callback slot so a script file that omits a callback
    /// does not inherit the previous file's definition.
    fn clear_callback_slots(&mut self) -> Result<(), EngineError>;

    /// Make sure the table shared by every preset and instance of `class_name` exists.
    fn ensure_class_table(&mut self, class_name: &str) -> Result<(), EngineError>;

    fn declare_namespace(
        &mut self,
        class_name: &'static str,
        kind: NamespaceKind,
    ) -> Result<NamespaceHandle, EngineError>;

    /// Whether `namespace` still exists. False after an engine reset.
    fn namespace_is_live(&self, namespace: &NamespaceHandle) -> bool;

    /// Move the callbacks the last executed file declared into `preset`, keyed by
    /// callback name and `script_path`.
    fn capture_callbacks(
        &mut self,
        preset: &NamespaceHandle,
        script_path: &str,
    ) -> Result<(), EngineError>;

    /// Give the scripting side a representation of `object` under `instance`.
    fn bind(&mut self, instance: &NamespaceHandle, object: &NativeHandle) -> Result<(), EngineError>;

    /// Run `callback` as captured from `script_path` in `preset`, against `instance`.
    /// A callback the script never declared is a successful no-op.
    fn invoke(
        &mut self,
        callback: ScriptCallback,
        script_path: &str,
        preset: &NamespaceHandle,
        instance: &NamespaceHandle,
    ) -> Result<(), EngineError>;

    /// Drop the scripting-side representation held by `instance`.
    fn release(&mut self, instance: &NamespaceHandle) -> Result<(), EngineError>;
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("the script path was empty")]
    EmptyPath,
    #[error("the script path {0} is already loaded onto this object")]
    DuplicatePath(String),
    #[error("failed to set up the scripting engine while adding {path}: {source}")]
    EngineSetup {
        path: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to execute script {path}: {source}")]
    Execution {
        path: String,
        #[source]
        source: EngineError,
    },
    #[error("object has no scripts")]
    NoScripts,
    #[error("object has no preset namespace")]
    NoPresetNamespace,
    #[error("object has no instance namespace")]
    NoInstanceNamespace,
    #[error("no actor supplied")]
    NoActor,
    #[error("failed to bind object {object} to the scripting engine: {source}")]
    Bind {
        object: UniqueId,
        #[source]
        source: EngineError,
    },
    #[error("{callback} failed in {path}: {source}")]
    Callback {
        callback: ScriptCallback,
        path: String,
        #[source]
        source: EngineError,
    },
    #[error("script recovery limit reached for this second of simulated time")]
    RecoveryLimit,
}

impl ScriptError {
    /// Negative status code, as reported to the operator console.
    pub fn code(&self) -> i32 {
        match self {
            Self::EmptyPath => -1,
            Self::DuplicatePath(_) => -2,
            Self::EngineSetup { .. } => -3,
            Self::Execution { .. } => -4,
            Self::NoScripts
            | Self::NoPresetNamespace
            | Self::NoInstanceNamespace
            | Self::NoActor
            | Self::RecoveryLimit => -1,
            Self::Bind { .. } => -2,
            Self::Callback { .. } => -3,
        }
    }
}

/// Recovery reloads one object has spent in the current second of simulated time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RecoveryWindow {
    start: Duration,
    used: u32,
}

/// Owns the scripting engine and the operator console scripts report to.
pub struct ScriptRuntime {
    engine: Box<dyn ScriptEngine>,
    console: Console,
    recovery_limit: u32,
    now: Duration,
}

impl ScriptRuntime {
    pub fn new(engine: impl ScriptEngine + 'static) -> Self {
        Self {
            engine: Box::new(engine),
            console: Console::new(),
            recovery_limit: 4,
            now: Duration::ZERO,
        }
    }

    /// Runtime backed by a fresh Lua state.
    pub fn lua() -> anyhow::Result<Self> {
        Ok(Self::new(LuaEngine::new()?))
    }

    /// Limit each object's recovery reloads per second of simulated time.
    #[must_use]
    pub fn with_recovery_limit(mut self, per_second: u32) -> Self {
        self.recovery_limit = per_second;
        self
    }

    pub fn engine(&self) -> &dyn ScriptEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn ScriptEngine {
        self.engine.as_mut()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Called once per tick so recovery windows roll over with simulated time.
    pub fn begin_frame(&mut self, clock: &SimClock) {
        self.now = clock.now();
    }

    /// Spend one recovery reload from `window`. False when that object has used
    /// up its budget for the current second.
    pub(crate) fn try_recover(&self, window: &mut RecoveryWindow) -> bool {
        if self.now.saturating_sub(window.start) >= Duration::from_secs(1) {
            window.start = self.now;
            window.used = 0;
        }
        if window.used >= self.recovery_limit {
            return false;
        }
        window.used += 1;
        true
    }
}
