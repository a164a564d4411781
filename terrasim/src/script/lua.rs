use std::fs;

use mlua::{Function, Lua, Table, Value};

use super::{EngineError, NamespaceHandle, NamespaceKind, NativeHandle, ScriptCallback, ScriptEngine};

/// [`ScriptEngine`] backed by an embedded Lua 5.4 state.
///
/// Every class gets a global table named after it (`Particles`, `Actors`, ...).
/// Preset and instance namespaces are sub-tables of their class table. A preset
/// table maps each callback name to a table of functions keyed by script path.
pub struct LuaEngine {
    lua: Lua,
    next_preset: u64,
    next_object: u64,
}

impl LuaEngine {
    pub fn new() -> anyhow::Result<Self> {
        let lua = Lua::new();

        let print_func = lua.create_function(|_, msg: String| {
            log::info!(target: "lua", "{msg}");
            Ok(())
        })?;
        lua.globals().set("print", print_func)?;

        Ok(Self {
            lua,
            next_preset: 1,
            next_object: 1,
        })
    }

    /// Direct access to the Lua state, for hosts that expose their own APIs.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    fn class_table_name(class_name: &str) -> String {
        format!("{class_name}s")
    }

    fn namespace_key(namespace: &NamespaceHandle) -> String {
        match namespace.kind() {
            NamespaceKind::Preset => format!("Preset{}", namespace.id()),
            NamespaceKind::Instance => format!("Object{}", namespace.id()),
        }
    }

    fn class_table(&self, class_name: &str) -> mlua::Result<Option<Table<'_>>> {
        self.lua.globals().get(Self::class_table_name(class_name))
    }

    fn namespace_table(&self, namespace: &NamespaceHandle) -> mlua::Result<Option<Table<'_>>> {
        match self.class_table(namespace.class_name())? {
            Some(classes) => classes.get(Self::namespace_key(namespace)),
            None => Ok(None),
        }
    }
}

impl ScriptEngine for LuaEngine {
    fn run_script_file(&mut self, path: &str) -> Result<(), EngineError> {
        let source = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_string(),
            source,
        })?;
        self.lua.load(source.as_str()).set_name(path).exec()?;
        Ok(())
    }

    fn run_script_string(&mut self, code: &str) -> Result<(), EngineError> {
        self.lua.load(code).exec()?;
        Ok(())
    }

    fn expression_is_true(&self, expr: &str) -> bool {
        match self.lua.load(format!("return {expr}")).eval::<Value>() {
            Ok(Value::Nil) | Ok(Value::Boolean(false)) => false,
            Ok(_) => true,
            Err(err) => {
                log::debug!("expression `{expr}` failed to evaluate: {err}");
                false
            }
        }
    }

    fn clear_callback_slots(&mut self) -> Result<(), EngineError> {
        let globals = self.lua.globals();
        for callback in ScriptCallback::ALL {
            globals.set(callback.name(), Value::Nil)?;
        }
        Ok(())
    }

    fn ensure_class_table(&mut self, class_name: &str) -> Result<(), EngineError> {
        if self.class_table(class_name)?.is_none() {
            let table = self.lua.create_table()?;
            self.lua
                .globals()
                .set(Self::class_table_name(class_name), table)?;
        }
        Ok(())
    }

    fn declare_namespace(
        &mut self,
        class_name: &'static str,
        kind: NamespaceKind,
    ) -> Result<NamespaceHandle, EngineError> {
        self.ensure_class_table(class_name)?;

        let counter = match kind {
            NamespaceKind::Preset => &mut self.next_preset,
            NamespaceKind::Instance => &mut self.next_object,
        };
        let id = *counter;
        *counter += 1;

        let handle = NamespaceHandle::new(kind, class_name, id);
        let classes = self
            .class_table(class_name)?
            .ok_or(EngineError::MissingNamespace(handle))?;
        classes.set(Self::namespace_key(&handle), self.lua.create_table()?)?;
        Ok(handle)
    }

    fn namespace_is_live(&self, namespace: &NamespaceHandle) -> bool {
        matches!(self.namespace_table(namespace), Ok(Some(_)))
    }

    fn capture_callbacks(
        &mut self,
        preset: &NamespaceHandle,
        script_path: &str,
    ) -> Result<(), EngineError> {
        let preset_table = self
            .namespace_table(preset)?
            .ok_or(EngineError::MissingNamespace(*preset))?;
        let globals = self.lua.globals();

        for callback in ScriptCallback::ALL {
            let Some(function) = globals.get::<_, Option<Function>>(callback.name())? else {
                continue;
            };
            let slots = match preset_table.get::<_, Option<Table>>(callback.name())? {
                Some(slots) => slots,
                None => {
                    let slots = self.lua.create_table()?;
                    preset_table.set(callback.name(), slots.clone())?;
                    slots
                }
            };
            slots.set(script_path, function)?;
        }
        Ok(())
    }

    fn bind(&mut self, instance: &NamespaceHandle, object: &NativeHandle) -> Result<(), EngineError> {
        self.ensure_class_table(instance.class_name())?;
        let classes = self
            .class_table(instance.class_name())?
            .ok_or(EngineError::MissingNamespace(*instance))?;

        let table = self.lua.create_table()?;
        table.set("UniqueID", object.unique_id.to_u64())?;
        table.set("ClassName", object.class_name)?;
        table.set("PresetName", object.preset_name.as_str())?;
        classes.set(Self::namespace_key(instance), table)?;
        Ok(())
    }

    fn invoke(
        &mut self,
        callback: ScriptCallback,
        script_path: &str,
        preset: &NamespaceHandle,
        instance: &NamespaceHandle,
    ) -> Result<(), EngineError> {
        let preset_table = self
            .namespace_table(preset)?
            .ok_or(EngineError::MissingNamespace(*preset))?;
        let Some(slots) = preset_table.get::<_, Option<Table>>(callback.name())? else {
            return Ok(());
        };
        let Some(function) = slots.get::<_, Option<Function>>(script_path)? else {
            return Ok(());
        };
        let instance_table = self
            .namespace_table(instance)?
            .ok_or(EngineError::MissingNamespace(*instance))?;

        function.call::<_, ()>(instance_table)?;
        Ok(())
    }

    fn release(&mut self, instance: &NamespaceHandle) -> Result<(), EngineError> {
        if let Some(classes) = self.class_table(instance.class_name())? {
            classes.set(Self::namespace_key(instance), Value::Nil)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::registry::UniqueIdCounter;

    fn write_script(dir: &TempDir, name: &str, source: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, source).expect("write script");
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn captured_callbacks_survive_slot_clearing() {
        let temp = TempDir::new().expect("temp");
        let path = write_script(
            &temp,
            "counter.lua",
            "function Update(self) self.ticks = (self.ticks or 0) + 1; ticks_seen = self.ticks end",
        );
        let mut engine = LuaEngine::new().expect("lua");
        let mut ids = UniqueIdCounter::new();

        engine.clear_callback_slots().expect("clear");
        engine.run_script_file(&path).expect("run");
        let preset = engine
            .declare_namespace("Particle", NamespaceKind::Preset)
            .expect("preset");
        engine.capture_callbacks(&preset, &path).expect("capture");
        engine.clear_callback_slots().expect("clear again");

        let instance = engine
            .declare_namespace("Particle", NamespaceKind::Instance)
            .expect("instance");
        let native = NativeHandle {
            unique_id: ids.next_id(),
            class_name: "Particle",
            preset_name: "Spark".to_string(),
        };
        engine.bind(&instance, &native).expect("bind");

        engine
            .invoke(ScriptCallback::Update, &path, &preset, &instance)
            .expect("update");
        engine
            .invoke(ScriptCallback::Update, &path, &preset, &instance)
            .expect("update");
        assert!(engine.expression_is_true("ticks_seen == 2"));
        assert!(engine.expression_is_true("Particles.Object1.UniqueID == 1"));
    }

    #[test]
    fn undeclared_callback_is_a_no_op() {
        let temp = TempDir::new().expect("temp");
        let path = write_script(&temp, "empty.lua", "local x = 1");
        let mut engine = LuaEngine::new().expect("lua");

        engine.run_script_file(&path).expect("run");
        let preset = engine
            .declare_namespace("Actor", NamespaceKind::Preset)
            .expect("preset");
        engine.capture_callbacks(&preset, &path).expect("capture");
        let instance = engine
            .declare_namespace("Actor", NamespaceKind::Instance)
            .expect("instance");

        engine
            .invoke(ScriptCallback::Create, &path, &preset, &instance)
            .expect("missing callback is fine");
    }

    #[test]
    fn namespaces_die_with_their_class_table() {
        let mut engine = LuaEngine::new().expect("lua");
        let preset = engine
            .declare_namespace("Device", NamespaceKind::Preset)
            .expect("preset");
        assert!(engine.namespace_is_live(&preset));

        engine.run_script_string("Devices = nil").expect("reset");
        assert!(!engine.namespace_is_live(&preset));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut engine = LuaEngine::new().expect("lua");
        let err = engine
            .run_script_file("/definitely/not/here.lua")
            .expect_err("missing file");
        assert!(matches!(err, EngineError::Io { .. }));
    }

    #[test]
    fn runtime_errors_surface_from_invoke() {
        let temp = TempDir::new().expect("temp");
        let path = write_script(&temp, "bad.lua", "function Create(self) error('nope') end");
        let mut engine = LuaEngine::new().expect("lua");

        engine.run_script_file(&path).expect("run");
        let preset = engine
            .declare_namespace("Sprite", NamespaceKind::Preset)
            .expect("preset");
        engine.capture_callbacks(&preset, &path).expect("capture");
        let instance = engine
            .declare_namespace("Sprite", NamespaceKind::Instance)
            .expect("instance");

        let err = engine
            .invoke(ScriptCallback::Create, &path, &preset, &instance)
            .expect_err("script error");
        assert!(matches!(err, EngineError::Lua(_)));
    }
}
