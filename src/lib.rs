//! Comhla
//!
//! Manifest-driven component loader with sandboxed Lua evaluation.
//!
//! A component is a directory carrying a `component.json` manifest that
//! declares its scripts and named dependencies. A [`Loader`] resolves a
//! tree of such components from lookup directories, executes each declared
//! script at most once inside an isolated environment, and hands back the
//! script's exported value. Hooks can rewrite a component's declared file
//! set before resolution, which is how build-time transforms (template
//! compilation and the like) plug in without touching the disk.
//!
//! ```no_run
//! let component = comhla::load_component_with("apps/greeter", |loader| {
//!     loader.add_lookup("vendor");
//!     Ok(())
//! })?;
//! println!("{:?}", component.exports());
//! # comhla::Result::Ok(())
//! ```

pub mod error;
pub mod hooks;
pub mod loader;
pub mod lookup;
pub mod manifest;

mod paths;
mod sandbox;

pub use error::{Error, Result};
pub use hooks::{HookCallback, HookPoint, HookRegistry};
pub use loader::{Loader, NativeAdapter};
pub use lookup::Lookup;
pub use manifest::Manifest;

// Exported values are interpreter values; consumers convert them with the
// re-exported interpreter types.
pub use mlua;
pub use mlua::Value;

use std::path::Path;

/// A fully loaded component: its exported value together with the loader
/// tree that produced it. Exported values are interpreter-bound and stay
/// valid only while the tree is alive, so the two travel together.
pub struct Component {
    loader: Loader,
    exports: Value,
}

impl Component {
    /// The value exported by the component's entry script.
    pub fn exports(&self) -> Value {
        self.exports.clone()
    }

    /// The root loader behind this component.
    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("dir", &self.loader.dir())
            .field("exports", &self.exports)
            .finish()
    }
}

/// Load the component at `dir` with default configuration.
pub fn load_component(dir: impl AsRef<Path>) -> Result<Component> {
    load_component_with(dir, |_| Ok(()))
}

/// Load the component at `dir`, running `setup` against the root loader
/// before the entry script is resolved.
///
/// The component's own `components` directory and any manifest `paths`
/// entries join the lookup automatically.
pub fn load_component_with<F>(dir: impl AsRef<Path>, setup: F) -> Result<Component>
where
    F: FnOnce(&Loader) -> Result<()>,
{
    let loader = Loader::new(dir);
    loader.add_relative_lookup("components");
    loader.include_manifest_paths()?;
    setup(&loader)?;
    let exports = loader.load()?;
    Ok(Component { loader, exports })
}

/// Create a persistent require function over one loader tree.
///
/// Unlike [`load_component`], every component resolved through the returned
/// handle stays cached, so repeated requires of the same name return the
/// identical exported value without re-executing anything.
pub fn create_require<F>(setup: F) -> Result<ComponentRequire>
where
    F: FnOnce(&Loader) -> Result<()>,
{
    let loader = Loader::new(".");
    setup(&loader)?;
    Ok(ComponentRequire { loader })
}

/// Cached, repeated-call require built from one persistent root loader.
pub struct ComponentRequire {
    loader: Loader,
}

impl ComponentRequire {
    /// Require `component`: a qualified name with an optional sub-path,
    /// e.g. `"vendor-bar"` or `"vendor-bar/lib/util"`.
    pub fn require(&self, component: &str) -> Result<Value> {
        let (name, file) = match component.split_once('/') {
            Some((name, file)) if !file.is_empty() => (name, Some(file)),
            Some((name, _)) => (name, None),
            None => (component, None),
        };
        self.loader.require_component(name, file)
    }

    /// The loader backing this require function.
    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}
