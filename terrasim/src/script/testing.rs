//! In-memory [`ScriptEngine`] that records what the simulation asks of it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{EngineError, NamespaceHandle, NamespaceKind, NativeHandle, ScriptCallback, ScriptEngine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Call {
    pub callback: ScriptCallback,
    pub path: String,
    pub instance: NamespaceHandle,
}

#[derive(Default)]
pub(crate) struct FakeState {
    /// Script files that exist, with the callbacks each one declares.
    pub files: HashMap<String, Vec<ScriptCallback>>,
    /// Callbacks that raise an error when invoked.
    pub failing: HashSet<(String, ScriptCallback)>,
    /// When set, every setup call fails.
    pub fail_setup: bool,
    pub live: HashSet<NamespaceHandle>,
    pub captured: HashSet<(NamespaceHandle, ScriptCallback, String)>,
    pub bound: HashMap<NamespaceHandle, NativeHandle>,
    pub calls: Vec<Call>,
    pub files_run: Vec<String>,
    declared: Vec<ScriptCallback>,
    next_id: u64,
}

impl FakeState {
    /// Forget every namespace, as if the scripting state was torn down and rebuilt.
    pub fn reset(&mut self) {
        self.live.clear();
        self.captured.clear();
        self.bound.clear();
        self.declared.clear();
    }

    pub fn count(&self, callback: ScriptCallback) -> usize {
        self.calls.iter().filter(|c| c.callback == callback).count()
    }

    pub fn count_for(&self, callback: ScriptCallback, path: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| c.callback == callback && c.path == path)
            .count()
    }

    fn setup(&self) -> Result<(), EngineError> {
        if self.fail_setup {
            Err(EngineError::Rejected("setup disabled".into()))
        } else {
            Ok(())
        }
    }
}

pub(crate) type Shared = Rc<RefCell<FakeState>>;

pub(crate) struct RecordingEngine {
    state: Shared,
}

impl RecordingEngine {
    pub fn new() -> (Self, Shared) {
        let state = Shared::default();
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }

    /// Engine with one file declaring every callback.
    pub fn with_script(path: &str) -> (Self, Shared) {
        let (engine, state) = Self::new();
        state
            .borrow_mut()
            .files
            .insert(path.to_string(), ScriptCallback::ALL.to_vec());
        (engine, state)
    }
}

impl ScriptEngine for RecordingEngine {
    fn run_script_file(&mut self, path: &str) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        let declared = state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::Rejected(format!("no such script {path}")))?;
        state.declared = declared;
        state.files_run.push(path.to_string());
        Ok(())
    }

    fn run_script_string(&mut self, _code: &str) -> Result<(), EngineError> {
        self.state.borrow().setup()
    }

    fn expression_is_true(&self, _expr: &str) -> bool {
        false
    }

    fn clear_callback_slots(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.setup()?;
        state.declared.clear();
        Ok(())
    }

    fn ensure_class_table(&mut self, _class_name: &str) -> Result<(), EngineError> {
        self.state.borrow().setup()
    }

    fn declare_namespace(
        &mut self,
        class_name: &'static str,
        kind: NamespaceKind,
    ) -> Result<NamespaceHandle, EngineError> {
        let mut state = self.state.borrow_mut();
        state.setup()?;
        state.next_id += 1;
        let handle = NamespaceHandle::new(kind, class_name, state.next_id);
        state.live.insert(handle);
        Ok(handle)
    }

    fn namespace_is_live(&self, namespace: &NamespaceHandle) -> bool {
        self.state.borrow().live.contains(namespace)
    }

    fn capture_callbacks(
        &mut self,
        preset: &NamespaceHandle,
        script_path: &str,
    ) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains(preset) {
            return Err(EngineError::MissingNamespace(*preset));
        }
        let declared = state.declared.clone();
        for callback in declared {
            state
                .captured
                .insert((*preset, callback, script_path.to_string()));
        }
        Ok(())
    }

    fn bind(&mut self, instance: &NamespaceHandle, object: &NativeHandle) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.setup()?;
        state.live.insert(*instance);
        state.bound.insert(*instance, object.clone());
        Ok(())
    }

    fn invoke(
        &mut self,
        callback: ScriptCallback,
        script_path: &str,
        preset: &NamespaceHandle,
        instance: &NamespaceHandle,
    ) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains(preset) {
            return Err(EngineError::MissingNamespace(*preset));
        }
        if !state
            .captured
            .contains(&(*preset, callback, script_path.to_string()))
        {
            return Ok(());
        }
        if !state.live.contains(instance) {
            return Err(EngineError::MissingNamespace(*instance));
        }
        state.calls.push(Call {
            callback,
            path: script_path.to_string(),
            instance: *instance,
        });
        if state.failing.contains(&(script_path.to_string(), callback)) {
            return Err(EngineError::Rejected(format!("{callback} raised")));
        }
        Ok(())
    }

    fn release(&mut self, instance: &NamespaceHandle) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.live.remove(instance);
        state.bound.remove(instance);
        Ok(())
    }
}
