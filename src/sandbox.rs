//! Sandboxed Evaluation
//!
//! Executes a resolved script against an explicitly enumerated binding set
//! instead of the interpreter's ambient globals: the script sees its own
//! `require`, a fresh `module`/`exports` pair, its file identity, and a
//! fixed subset of the Lua standard library. Caches, lookup state and other
//! components' bindings are unreachable.

use std::path::Path;

use mlua::{Lua, LuaSerdeExt, Table, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::paths;

/// Lua standard globals exposed inside every evaluation environment.
/// Anything absent from this list does not exist for component scripts.
const STDLIB_BINDINGS: &[&str] = &[
    "assert",
    "error",
    "getmetatable",
    "ipairs",
    "next",
    "pairs",
    "pcall",
    "print",
    "select",
    "setmetatable",
    "tonumber",
    "tostring",
    "type",
    "xpcall",
    "string",
    "table",
    "math",
];

/// Parse a data script (JSON) into an interpreter value. No evaluation
/// context is involved and no further requires are possible from it.
pub(crate) fn load_data(lua: &Lua, path: &Path, source: &str) -> Result<Value> {
    let data: serde_json::Value =
        serde_json::from_str(source).map_err(|source| Error::DataParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(lua.to_value(&data)?)
}

/// Execute one script and return its exported value: the chunk's own return
/// value when non-nil, otherwise whatever `module.exports` holds afterwards.
pub(crate) fn evaluate(loader: &Loader, script: &str, path: &Path, source: &str) -> Result<Value> {
    let env = environment(loader, script, path)?;
    let module: Table = env.get("module")?;

    debug!("evaluating {}", path.display());
    let returned: Value = loader
        .lua()
        .load(source)
        .set_name(format!("@{}", path.display()))
        .set_environment(env)
        .eval()?;

    if returned.is_nil() {
        Ok(module.get("exports")?)
    } else {
        Ok(returned)
    }
}

/// Build the binding set for one script.
fn environment(loader: &Loader, script: &str, path: &Path) -> Result<Table> {
    let lua = loader.lua();
    let env = lua.create_table()?;

    let globals = lua.globals();
    for name in STDLIB_BINDINGS {
        env.set(*name, globals.get::<Value>(*name)?)?;
    }

    let module = lua.create_table()?;
    let exports = lua.create_table()?;
    module.set("exports", &exports)?;
    env.set("module", &module)?;
    env.set("exports", exports)?;

    env.set("__filename", path.display().to_string())?;
    env.set(
        "__dirname",
        path.parent().unwrap_or(Path::new("")).display().to_string(),
    )?;

    // The require closure holds a weak handle; the interpreter must not
    // keep the loader tree alive through its own registry.
    let from_dir = paths::parent(script);
    let weak = loader.downgrade();
    let require = lua.create_function(move |_, request: String| {
        let Some(loader) = weak.upgrade() else {
            return Err(mlua::Error::runtime("component loader released"));
        };
        Ok(loader.require_from(&from_dir, &request)?)
    })?;
    env.set("require", require)?;

    Ok(env)
}
