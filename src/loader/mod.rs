//! Component Loader
//!
//! Owns one component instance: its directory, manifest, lookup paths and
//! caches. Loaders form a tree mirroring the dependency graph, constructed
//! lazily and deduplicated by qualified name. The whole tree shares one
//! interpreter and one hook registry, reached through the root.
//!
//! The tree is an arena: [`Loader`] is a cheap handle (shared state plus a
//! node index), so nested instances can point back at their root without
//! reference cycles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use mlua::{Lua, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::hooks::{HookPoint, HookRegistry};
use crate::lookup::Lookup;
use crate::manifest::{load_manifest, Manifest, DEFAULT_MAIN};
use crate::paths;
use crate::sandbox;

mod require;

use require::RequireRequest;

/// Native adapter signature installed via [`Loader::register`]: bridges a
/// host-provided module into the component graph, bypassing lookup and
/// sandboxed evaluation entirely.
pub type NativeAdapter = dyn Fn(&Lua, Option<&str>) -> Result<Value>;

/// Index of a loader node within its tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

/// State shared by every loader of one tree.
struct Shared {
    lua: Lua,
    hooks: RefCell<HookRegistry>,
    nodes: RefCell<Vec<Node>>,
}

/// Per-component state.
struct Node {
    dir: PathBuf,
    dev: bool,
    lookup: Lookup,
    manifest: Option<Rc<Manifest>>,
    deps: Option<Rc<HashMap<String, String>>>,
    scripts: ScriptState,
    /// Declared script path -> substitute source text injected by hooks.
    overrides: HashMap<String, String>,
    /// Resolved script path -> exported value. At most one execution per
    /// script per instance.
    modules: HashMap<String, Value>,
    /// Registered adapters and resolved child instances, by name.
    components: HashMap<String, Entry>,
}

impl Node {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            dev: false,
            lookup: Lookup::new(),
            manifest: None,
            deps: None,
            scripts: ScriptState::Unresolved,
            overrides: HashMap::new(),
            modules: HashMap::new(),
            components: HashMap::new(),
        }
    }
}

/// Lifecycle of the declared-script allow-list.
enum ScriptState {
    /// Manifest not consulted yet.
    Unresolved,
    /// List computed; before-scripts hooks currently firing may edit it.
    Staging(Vec<String>),
    /// Frozen allow-list, immutable from here on.
    Frozen(Vec<String>),
}

/// A resolved component entry as stored in a node's cache.
#[derive(Clone)]
enum Entry {
    Instance(NodeId),
    Native(Rc<NativeAdapter>),
}

/// A resolved component ready to load files from.
enum Resolved {
    Instance(Loader),
    Native(Rc<NativeAdapter>),
}

impl Resolved {
    fn load(&self, file: Option<&str>, lua: &Lua) -> Result<Value> {
        match self {
            Resolved::Instance(loader) => match file {
                Some(file) => loader.load_file(file),
                None => loader.load(),
            },
            Resolved::Native(adapter) => adapter(lua, file),
        }
    }
}

/// Handle to one component instance within a loader tree.
///
/// Cloning a `Loader` clones the handle, not the component state.
#[derive(Clone)]
pub struct Loader {
    shared: Rc<Shared>,
    id: NodeId,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("dir", &self.dir())
            .finish_non_exhaustive()
    }
}

impl Loader {
    /// Create a root loader for the component at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Loader {
        let dir = paths::absolutize(dir.as_ref());
        let shared = Rc::new(Shared {
            lua: Lua::new(),
            hooks: RefCell::new(HookRegistry::new()),
            nodes: RefCell::new(vec![Node::new(dir)]),
        });
        Loader { shared, id: ROOT }
    }

    /// Directory this instance is rooted at.
    pub fn dir(&self) -> PathBuf {
        self.with_node(|n| n.dir.clone())
    }

    /// Resolve `rel` against the component directory.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir().join(rel)
    }

    /// The interpreter shared by this loader tree.
    pub fn lua(&self) -> &Lua {
        &self.shared.lua
    }

    // --- configuration ---

    /// Enable development-dependency resolution for this instance.
    pub fn development(&self) -> &Self {
        self.with_node_mut(|n| n.dev = true);
        self
    }

    /// Append a lookup directory, resolved against the working directory if
    /// relative.
    pub fn add_lookup(&self, path: impl AsRef<Path>) -> &Self {
        let path = paths::absolutize(path.as_ref());
        self.with_node_mut(|n| n.lookup.add(path));
        self
    }

    /// Append a lookup directory relative to the component directory.
    pub fn add_relative_lookup(&self, rel: impl AsRef<Path>) -> &Self {
        let path = self.path(rel);
        self.with_node_mut(|n| n.lookup.add(path));
        self
    }

    /// Add the manifest's `paths` entries as relative lookups.
    pub fn include_manifest_paths(&self) -> Result<&Self> {
        let manifest = self.manifest()?;
        for path in &manifest.paths {
            self.add_relative_lookup(path);
        }
        Ok(self)
    }

    /// Install a native adapter for `name`.
    ///
    /// Registered names take precedence over lookup-based resolution and
    /// over an already-cached resolution of the same name.
    pub fn register<F>(&self, name: impl Into<String>, adapter: F) -> &Self
    where
        F: Fn(&Lua, Option<&str>) -> Result<Value> + 'static,
    {
        let name = name.into();
        self.with_node_mut(|n| {
            n.components.insert(name, Entry::Native(Rc::new(adapter)));
        });
        self
    }

    /// Register `callback` for `point`, tree-wide.
    pub fn hook<F>(&self, point: HookPoint, callback: F) -> &Self
    where
        F: Fn(&Loader) -> Result<()> + 'static,
    {
        self.shared.hooks.borrow_mut().add(point, Rc::new(callback));
        self
    }

    /// Invoke every callback registered for `point`, in registration order,
    /// passing this loader. Side effects only; the first error aborts.
    pub fn perform_hook(&self, point: HookPoint) -> Result<()> {
        let callbacks = self.shared.hooks.borrow().snapshot(point);
        for callback in callbacks {
            callback(self)?;
        }
        Ok(())
    }

    /// Run `setup` against this loader immediately.
    pub fn apply<F>(&self, setup: F) -> Result<&Self>
    where
        F: FnOnce(&Loader) -> Result<()>,
    {
        setup(self)?;
        Ok(self)
    }

    // --- manifest & declared scripts ---

    /// Parsed manifest of this component. Read and parsed at most once per
    /// instance.
    pub fn manifest(&self) -> Result<Rc<Manifest>> {
        if let Some(manifest) = self.with_node(|n| n.manifest.clone()) {
            return Ok(manifest);
        }
        let manifest = Rc::new(load_manifest(&self.dir())?);
        self.with_node_mut(|n| n.manifest = Some(Rc::clone(&manifest)));
        Ok(manifest)
    }

    /// Inject `name` into the staged script list with substitute `contents`
    /// consumed in place of on-disk text.
    ///
    /// Only callable while the before-scripts hooks are firing; the list is
    /// immutable once frozen.
    pub fn add_file(&self, name: impl Into<String>, contents: impl Into<String>) -> Result<()> {
        let name = paths::normalize(&name.into());
        let contents = contents.into();
        self.with_node_mut(|n| match &mut n.scripts {
            ScriptState::Staging(list) => {
                if !list.contains(&name) {
                    list.push(name.clone());
                }
                n.overrides.insert(name, contents);
                Ok(())
            }
            _ => Err(Error::Configuration(
                "scripts can only be added from a before-scripts hook".into(),
            )),
        })
    }

    /// Remove `name` from the staged script list, along with any override.
    ///
    /// Only callable while the before-scripts hooks are firing.
    pub fn remove_file(&self, name: &str) -> Result<()> {
        let name = paths::normalize(name);
        self.with_node_mut(|n| match &mut n.scripts {
            ScriptState::Staging(list) => {
                list.retain(|script| *script != name);
                n.overrides.remove(&name);
                Ok(())
            }
            _ => Err(Error::Configuration(
                "scripts can only be removed from a before-scripts hook".into(),
            )),
        })
    }

    /// The script allow-list, computing it (and firing the before-scripts
    /// hooks) on first use.
    fn scripts(&self) -> Result<Vec<String>> {
        enum State {
            Known(Vec<String>),
            Unresolved,
        }
        let state = self.with_node(|n| match &n.scripts {
            ScriptState::Frozen(list) | ScriptState::Staging(list) => State::Known(list.clone()),
            ScriptState::Unresolved => State::Unresolved,
        });
        if let State::Known(list) = state {
            return Ok(list);
        }

        let manifest = self.manifest()?;
        let staged: Vec<String> = manifest.scripts.iter().map(|s| paths::normalize(s)).collect();
        self.with_node_mut(|n| n.scripts = ScriptState::Staging(staged));

        if let Err(err) = self.perform_hook(HookPoint::BeforeScripts) {
            self.with_node_mut(|n| n.scripts = ScriptState::Unresolved);
            return Err(err);
        }

        let frozen = self.with_node_mut(|n| {
            let list = match std::mem::replace(&mut n.scripts, ScriptState::Unresolved) {
                ScriptState::Staging(list) | ScriptState::Frozen(list) => list,
                ScriptState::Unresolved => Vec::new(),
            };
            n.scripts = ScriptState::Frozen(list.clone());
            list
        });
        Ok(frozen)
    }

    /// Resolve a logical file name against the allow-list: the name
    /// verbatim, then with the script extension, the data extension, and
    /// the two `init` forms. First declared candidate wins.
    fn resolve_script(&self, file: &str) -> Result<Option<String>> {
        let scripts = self.scripts()?;
        let file = paths::normalize(file);
        let candidates = [
            file.clone(),
            format!("{file}.lua"),
            format!("{file}.json"),
            format!("{file}/init.lua"),
            format!("{file}/init.json"),
        ];
        Ok(candidates
            .into_iter()
            .find(|candidate| scripts.iter().any(|script| script == candidate)))
    }

    // --- loading ---

    /// Load the component's entry script and return its exported value.
    pub fn load(&self) -> Result<Value> {
        self.load_entry(None)
    }

    /// Load a specific declared file of this component.
    pub fn load_file(&self, file: &str) -> Result<Value> {
        self.load_entry(Some(file))
    }

    fn load_entry(&self, file: Option<&str>) -> Result<Value> {
        let main;
        let file = match file {
            Some(file) => file,
            None => {
                main = self
                    .manifest()?
                    .main
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MAIN.to_string());
                &main
            }
        };

        let script = self
            .resolve_script(file)?
            .ok_or_else(|| Error::ScriptResolution {
                file: file.to_string(),
                dir: self.dir(),
            })?;
        self.load_script(&script)
    }

    fn load_script(&self, script: &str) -> Result<Value> {
        if let Some(value) = self.with_node(|n| n.modules.get(script).cloned()) {
            debug!("module cache hit for {script}");
            return Ok(value);
        }

        let path = self.path(script);
        let source = match self.with_node(|n| n.overrides.get(script).cloned()) {
            Some(text) => text,
            None => std::fs::read_to_string(&path).map_err(|source| Error::ScriptRead {
                path: path.clone(),
                source,
            })?,
        };

        let value = if script.ends_with(".json") {
            sandbox::load_data(&self.shared.lua, &path, &source)?
        } else {
            sandbox::evaluate(self, script, &path, &source)?
        };

        self.with_node_mut(|n| n.modules.insert(script.to_string(), value.clone()));
        Ok(value)
    }

    // --- dependency resolution ---

    /// Resolve a `require` issued by a script of this component. `from_dir`
    /// is the requesting script's directory relative to the component root.
    pub(crate) fn require_from(&self, from_dir: &str, request: &str) -> Result<Value> {
        match RequireRequest::parse(request) {
            RequireRequest::Relative(rel) => {
                let target = paths::join_relative(from_dir, &rel);
                self.load_entry(Some(&target))
            }
            RequireRequest::Named { name, file } => self
                .resolve_component(&name)?
                .load(file.as_deref(), &self.shared.lua),
        }
    }

    /// Resolve `qualified` directly (component cache, lookup paths, root
    /// fallback) and load `file` or the entry script from it. This is the
    /// dependency-style entry used by the persistent require wrapper; it
    /// does not consult this component's declared dependency map.
    pub(crate) fn require_component(&self, qualified: &str, file: Option<&str>) -> Result<Value> {
        self.resolve_qualified(qualified)?
            .load(file, &self.shared.lua)
    }

    /// Resolve a dependency short name to a loadable component.
    fn resolve_component(&self, name: &str) -> Result<Resolved> {
        // Registered adapters and already-resolved names win outright.
        if let Some(entry) = self.with_node(|n| n.components.get(name).cloned()) {
            return Ok(self.materialize(entry));
        }

        let deps = self.dependency_map()?;
        let Some(qualified) = deps.get(name).cloned() else {
            return Err(Error::UndeclaredDependency {
                name: name.to_string(),
                dir: self.dir(),
            });
        };

        self.resolve_qualified(&qualified)
    }

    /// Resolve a qualified on-disk name via this instance's lookup paths.
    /// When this instance is not the root, an unresolved name is delegated
    /// to the root: its cache first, then its own lookup paths. A sibling's
    /// private lookup paths never participate.
    fn resolve_qualified(&self, qualified: &str) -> Result<Resolved> {
        if let Some(entry) = self.with_node(|n| n.components.get(qualified).cloned()) {
            return Ok(self.materialize(entry));
        }

        let found = self.with_node_mut(|n| n.lookup.find(qualified));
        if let Some(dir) = found {
            debug!("located component {qualified} at {}", dir.display());
            let child = self.new_child(dir);
            self.with_node_mut(|n| {
                n.components
                    .insert(qualified.to_string(), Entry::Instance(child.id));
            });
            return Ok(Resolved::Instance(child));
        }

        if !self.is_root() {
            debug!("component {qualified} not in local lookup, delegating to root");
            return self.root().resolve_qualified(qualified);
        }

        Err(Error::ComponentLookup {
            name: qualified.to_string(),
        })
    }

    fn dependency_map(&self) -> Result<Rc<HashMap<String, String>>> {
        if let Some(deps) = self.with_node(|n| n.deps.clone()) {
            return Ok(deps);
        }
        let manifest = self.manifest()?;
        let dev = self.with_node(|n| n.dev);
        let deps = Rc::new(manifest.dependency_map(dev));
        self.with_node_mut(|n| n.deps = Some(Rc::clone(&deps)));
        Ok(deps)
    }

    fn materialize(&self, entry: Entry) -> Resolved {
        match entry {
            Entry::Instance(id) => Resolved::Instance(self.handle(id)),
            Entry::Native(adapter) => Resolved::Native(adapter),
        }
    }

    /// Construct a child instance rooted at a located dependency directory.
    /// Its nested `components` directory joins the lookup by convention.
    fn new_child(&self, dir: PathBuf) -> Loader {
        let id = {
            let mut nodes = self.shared.nodes.borrow_mut();
            let id = NodeId(nodes.len());
            nodes.push(Node::new(dir));
            id
        };
        let child = self.handle(id);
        child.add_relative_lookup("components");
        child
    }

    // --- handles ---

    fn handle(&self, id: NodeId) -> Loader {
        Loader {
            shared: Rc::clone(&self.shared),
            id,
        }
    }

    fn root(&self) -> Loader {
        self.handle(ROOT)
    }

    fn is_root(&self) -> bool {
        self.id == ROOT
    }

    pub(crate) fn downgrade(&self) -> WeakLoader {
        WeakLoader {
            shared: Rc::downgrade(&self.shared),
            id: self.id,
        }
    }

    fn with_node<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.shared.nodes.borrow()[self.id.0])
    }

    fn with_node_mut<R>(&self, f: impl FnOnce(&mut Node) -> R) -> R {
        f(&mut self.shared.nodes.borrow_mut()[self.id.0])
    }
}

/// Non-owning loader handle captured by `require` closures living inside
/// the interpreter, so the interpreter and the tree do not keep each other
/// alive.
pub(crate) struct WeakLoader {
    shared: Weak<Shared>,
    id: NodeId,
}

impl WeakLoader {
    pub(crate) fn upgrade(&self) -> Option<Loader> {
        self.shared.upgrade().map(|shared| Loader {
            shared,
            id: self.id,
        })
    }
}
