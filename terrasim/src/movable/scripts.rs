use super::MovableObject;
use crate::preset::PresetStore;
use crate::registry::UniqueId;
use crate::script::{
    NamespaceHandle, NamespaceKind, NativeHandle, RecoveryWindow, ScriptCallback, ScriptError,
    ScriptRuntime,
};

/// A script attached to an object, in load order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptEntry {
    pub path: String,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub(super) struct ScriptBindings {
    entries: Vec<ScriptEntry>,
    /// Shared by every object copied from the same preset.
    preset_ns: Option<NamespaceHandle>,
    /// Declared on the first script update of this object.
    instance_ns: Option<NamespaceHandle>,
    recovery: RecoveryWindow,
}

impl ScriptBindings {
    /// Bindings for a copy: same scripts and preset namespace, no instance yet.
    pub(super) fn for_copy(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            preset_ns: self.preset_ns,
            instance_ns: None,
            recovery: RecoveryWindow::default(),
        }
    }
}

fn run_enabled(
    entries: &[ScriptEntry],
    rt: &mut ScriptRuntime,
    callback: ScriptCallback,
    preset: NamespaceHandle,
    instance: NamespaceHandle,
) -> Result<(), ScriptError> {
    for entry in entries.iter().filter(|entry| entry.enabled) {
        rt.engine_mut()
            .invoke(callback, &entry.path, &preset, &instance)
            .map_err(|source| ScriptError::Callback {
                callback,
                path: entry.path.clone(),
                source,
            })?;
    }
    Ok(())
}

impl MovableObject {
    pub fn scripts(&self) -> &[ScriptEntry] {
        &self.scripts.entries
    }

    pub fn has_script(&self, path: &str) -> bool {
        self.scripts.entries.iter().any(|entry| entry.path == path)
    }

    /// Whether the script at `path` is enabled, or `None` if it is not loaded.
    pub fn script_enabled(&self, path: &str) -> Option<bool> {
        self.scripts
            .entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.enabled)
    }

    pub fn preset_namespace(&self) -> Option<NamespaceHandle> {
        self.scripts.preset_ns
    }

    pub fn instance_namespace(&self) -> Option<NamespaceHandle> {
        self.scripts.instance_ns
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle {
            unique_id: self.unique_id,
            class_name: self.class_name(),
            preset_name: self.preset_name.clone(),
        }
    }

    /// Run the script file at `path` and capture the callbacks it declares into
    /// this object's preset namespace. The entry is only added if every step succeeds.
    pub fn load_script(
        &mut self,
        rt: &mut ScriptRuntime,
        path: &str,
        enabled: bool,
    ) -> Result<(), ScriptError> {
        if path.is_empty() {
            return Err(ScriptError::EmptyPath);
        }
        if self.has_script(path) {
            return Err(ScriptError::DuplicatePath(path.to_string()));
        }

        let class_name = self.class_name();
        let setup = |source| ScriptError::EngineSetup {
            path: path.to_string(),
            source,
        };
        let engine = rt.engine_mut();

        engine.clear_callback_slots().map_err(setup)?;
        engine.ensure_class_table(class_name).map_err(setup)?;
        engine
            .run_script_file(path)
            .map_err(|source| ScriptError::Execution {
                path: path.to_string(),
                source,
            })?;

        let preset = match self.scripts.preset_ns {
            Some(preset) => preset,
            None => {
                let preset = engine
                    .declare_namespace(class_name, NamespaceKind::Preset)
                    .map_err(setup)?;
                self.scripts.preset_ns = Some(preset);
                preset
            }
        };
        engine.capture_callbacks(&preset, path).map_err(setup)?;

        self.scripts.entries.push(ScriptEntry {
            path: path.to_string(),
            enabled,
        });
        log::debug!("loaded {path} onto {} {}", self.class_name(), self.unique_id);
        Ok(())
    }

    fn replay_scripts(&mut self, rt: &mut ScriptRuntime) -> Result<(), ScriptError> {
        let entries = std::mem::take(&mut self.scripts.entries);
        self.scripts.preset_ns = None;

        let mut remaining = entries.into_iter();
        while let Some(entry) = remaining.next() {
            if let Err(err) = self.load_script(rt, &entry.path, entry.enabled) {
                // Keep what could not be replayed so the next reload retries it.
                self.scripts.entries.push(entry);
                self.scripts.entries.extend(remaining);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Load every script again from scratch, keeping each one's enabled flag.
    ///
    /// If `presets` holds this object's preset and that preset's namespace no
    /// longer exists, the preset is reloaded too. The first error is returned.
    pub fn reload_scripts(
        &mut self,
        rt: &mut ScriptRuntime,
        presets: Option<&mut PresetStore>,
    ) -> Result<(), ScriptError> {
        if self.scripts.entries.is_empty() {
            return Ok(());
        }

        let result = self.replay_scripts(rt);

        let class_name = self.class_name();
        let preset = presets.and_then(|store| store.get_mut(class_name, &self.preset_name));
        if let Some(preset) = preset {
            let preset_live = preset
                .scripts
                .preset_ns
                .map_or(false, |ns| rt.engine().namespace_is_live(&ns));
            if preset.unique_id != self.unique_id && !preset_live {
                log::info!("reloading scripts of preset {}", preset.preset_name);
                return result.and(preset.replay_scripts(rt));
            }
        }
        result
    }

    fn bind_instance(&mut self, rt: &mut ScriptRuntime) -> Result<NamespaceHandle, ScriptError> {
        let object = self.unique_id;
        let bind_failed = |source| ScriptError::Bind { object, source };

        let instance = rt
            .engine_mut()
            .declare_namespace(self.class_name(), NamespaceKind::Instance)
            .map_err(bind_failed)?;
        rt.engine_mut()
            .bind(&instance, &self.native_handle())
            .map_err(bind_failed)?;
        self.scripts.instance_ns = Some(instance);
        Ok(instance)
    }

    /// Run one tick of this object's scripts.
    ///
    /// Declares and binds the instance namespace on first use, running `Create`
    /// for every enabled script. If the engine lost the preset namespace the
    /// scripts are reloaded first, within this object's recovery budget, and the
    /// object is rebound without running `Create` again. Then `Update` runs for
    /// every enabled script in order; the first failure ends the tick.
    pub fn update_scripts(
        &mut self,
        rt: &mut ScriptRuntime,
        presets: Option<&mut PresetStore>,
    ) -> Result<(), ScriptError> {
        if self.scripts.entries.is_empty() {
            return Err(ScriptError::NoScripts);
        }
        let Some(preset) = self.scripts.preset_ns else {
            return Err(ScriptError::NoPresetNamespace);
        };

        if !rt.engine().namespace_is_live(&preset) {
            if !rt.try_recover(&mut self.scripts.recovery) {
                return Err(ScriptError::RecoveryLimit);
            }
            log::warn!(
                "script namespace of {} {} is gone, reloading its scripts",
                self.class_name(),
                self.unique_id
            );
            self.reload_scripts(rt, presets)?;
        }
        let preset = self
            .scripts
            .preset_ns
            .ok_or(ScriptError::NoPresetNamespace)?;

        let current = self.scripts.instance_ns;
        let instance = match current {
            None => {
                let instance = self.bind_instance(rt)?;
                run_enabled(&self.scripts.entries, rt, ScriptCallback::Create, preset, instance)?;
                instance
            }
            Some(instance) if !rt.engine().namespace_is_live(&instance) => self.bind_instance(rt)?,
            Some(instance) => instance,
        };

        run_enabled(&self.scripts.entries, rt, ScriptCallback::Update, preset, instance)
    }

    /// Tell the scripts `actor` opened a pie menu with this object in context.
    pub fn on_pie_menu(
        &mut self,
        rt: &mut ScriptRuntime,
        actor: Option<UniqueId>,
    ) -> Result<(), ScriptError> {
        let actor = actor.ok_or(ScriptError::NoActor)?;
        if self.scripts.entries.is_empty() {
            return Err(ScriptError::NoScripts);
        }
        let preset = self
            .scripts
            .preset_ns
            .ok_or(ScriptError::NoPresetNamespace)?;
        let instance = self
            .scripts
            .instance_ns
            .ok_or(ScriptError::NoInstanceNamespace)?;

        self.pie_menu_actor = Some(actor);
        run_enabled(&self.scripts.entries, rt, ScriptCallback::OnPieMenu, preset, instance)
    }

    /// Enable a loaded, disabled script. Returns false if nothing changed or the
    /// script's `OnEnableScript` failed.
    pub fn enable_script(&mut self, rt: &mut ScriptRuntime, path: &str) -> bool {
        self.toggle_script(rt, path, true)
    }

    /// Disable a loaded, enabled script. Returns false if nothing changed or the
    /// script's `OnDisableScript` failed.
    pub fn disable_script(&mut self, rt: &mut ScriptRuntime, path: &str) -> bool {
        self.toggle_script(rt, path, false)
    }

    fn toggle_script(&mut self, rt: &mut ScriptRuntime, path: &str, enable: bool) -> bool {
        let Some(entry) = self
            .scripts
            .entries
            .iter_mut()
            .find(|entry| entry.path == path && entry.enabled != enable)
        else {
            return false;
        };
        entry.enabled = enable;

        let (callback, verb) = if enable {
            (ScriptCallback::OnEnableScript, "enabled")
        } else {
            (ScriptCallback::OnDisableScript, "disabled")
        };
        if let (Some(preset), Some(instance)) = (self.scripts.preset_ns, self.scripts.instance_ns) {
            if let Err(source) = rt.engine_mut().invoke(callback, path, &preset, &instance) {
                rt.console().error(format!(
                    "Failed to run {callback} function for newly {verb} script with path {path}: {source}"
                ));
                return false;
            }
        }
        true
    }

    /// Load an enabled script at runtime. If the object's scripts already ran
    /// `Create`, the new script's `Create` runs right away. Failures go to the
    /// console.
    pub fn add_script(&mut self, rt: &mut ScriptRuntime, path: &str) -> bool {
        if let Err(err) = self.load_script(rt, path, true) {
            rt.console().error(err.to_string());
            return false;
        }

        if let (Some(preset), Some(instance)) = (self.scripts.preset_ns, self.scripts.instance_ns) {
            if let Err(source) =
                rt.engine_mut()
                    .invoke(ScriptCallback::Create, path, &preset, &instance)
            {
                rt.console().error(format!(
                    "Failed to run Create function for newly added script with path {path}: {source}"
                ));
                return false;
            }
        }
        true
    }

    /// Drop a script. Its `Destroy` callback does not run.
    pub fn remove_script(&mut self, path: &str) -> bool {
        match self.scripts.entries.iter().position(|entry| entry.path == path) {
            Some(index) => {
                self.scripts.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(super) fn run_destroy_scripts(&mut self, rt: &mut ScriptRuntime) {
        let Some(instance) = self.scripts.instance_ns.take() else {
            return;
        };

        if let Some(preset) = self.scripts.preset_ns {
            for entry in self.scripts.entries.iter().filter(|entry| entry.enabled) {
                if let Err(source) =
                    rt.engine_mut()
                        .invoke(ScriptCallback::Destroy, &entry.path, &preset, &instance)
                {
                    rt.console().error(format!(
                        "Destroy failed in {} for {} {}: {source}",
                        entry.path,
                        self.class_name(),
                        self.unique_id
                    ));
                }
            }
        }

        if let Err(err) = rt.engine_mut().release(&instance) {
            log::warn!("failed to release script namespace {instance}: {err}");
        }
    }
}
