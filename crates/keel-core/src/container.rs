//! Dependency injection container.
//!
//! The container maps [`Key`]s (a type identity or a string name) to
//! producers and resolves object graphs on demand:
//!
//! - **Factories** are closures that receive a [`Resolver`] and build a value.
//! - **Concrete keys** point at another key that is auto-constructed.
//! - **Instances** are literal values handed out as-is.
//!
//! Any binding can be a *singleton*: its first resolution is cached and every
//! later resolution returns the identical `Arc`.
//!
//! Auto-construction does not use reflection. A type opts in by implementing
//! [`Injectable`], whose `construct` asks the [`Resolver`] for each constructor
//! parameter in order. Injectable dependencies that nothing is bound to are
//! constructed directly, so a whole graph can be built without registering
//! anything.
//!
//! # Example
//!
//! ```rust
//! use keel_core::container::{Container, Injectable, Resolver};
//! use keel_core::KeelResult;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! impl Injectable for Clock {
//!     fn construct(_: &mut Resolver<'_>) -> KeelResult<Self> {
//!         Ok(Self)
//!     }
//! }
//!
//! struct Greeter {
//!     clock: Arc<Clock>,
//!     greeting: String,
//! }
//!
//! impl Injectable for Greeter {
//!     fn construct(deps: &mut Resolver<'_>) -> KeelResult<Self> {
//!         Ok(Self {
//!             clock: deps.dep("clock")?,
//!             greeting: deps.value("greeting", Some("hello".to_string()))?,
//!         })
//!     }
//! }
//!
//! let container = Container::new();
//! let greeter = container.make::<Greeter>().unwrap();
//! assert_eq!(greeter.greeting, "hello");
//! ```
//!
//! # Scopes
//!
//! [`Container::scope`] creates a child container that delegates to a shared
//! parent. The kernel creates one scope per request so request-scoped
//! bindings never leak between requests, while singletons bound on the root
//! stay shared.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::handler::Controller;
use crate::{KeelError, KeelResult};

/// A type-erased resolved value.
///
/// The erased value is always an `Arc<T>`, which lets trait objects be
/// stored and lets singletons be compared with `Arc::ptr_eq`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A type-erased factory.
pub type Factory = Arc<dyn Fn(&mut Resolver<'_>) -> KeelResult<Instance> + Send + Sync>;

/// Identifies a binding.
#[derive(Clone)]
pub enum Key {
    /// A Rust type, possibly a trait object.
    Type {
        /// Type identity.
        id: TypeId,
        /// Type name, for diagnostics only.
        name: &'static str,
    },
    /// A string name such as `"PostController"` or `"auth"`.
    Name(Arc<str>),
}

impl Key {
    /// Returns the key for type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns a named key.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(Arc::from(name.into()))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type { id: a, .. }, Self::Type { id: b, .. }) => a == b,
            (Self::Name(a), Self::Name(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            Self::Name(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name, .. } => f.write_str(name),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name, .. } => write!(f, "Key::Type({name})"),
            Self::Name(name) => write!(f, "Key::Name({name})"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::name(name)
    }
}

/// How a binding produces its value.
#[derive(Clone)]
pub enum Producer {
    /// Invoke a factory.
    Factory(Factory),
    /// Auto-construct another key.
    Concrete(Key),
    /// Hand out a literal value.
    Instance(Instance),
}

impl Producer {
    /// Wraps a typed factory.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> KeelResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |resolver: &mut Resolver<'_>| {
            factory(resolver).map(erase)
        }))
    }

    /// Wraps a literal value.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::Instance(erase(value))
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Producer::Factory"),
            Self::Concrete(key) => write!(f, "Producer::Concrete({key})"),
            Self::Instance(_) => f.write_str("Producer::Instance"),
        }
    }
}

/// A type that can be constructed by the container.
///
/// `construct` requests each constructor parameter from the [`Resolver`] in
/// declaration order; see the [module documentation](self) for an example.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Builds the value, resolving dependencies through `deps`.
    fn construct(deps: &mut Resolver<'_>) -> KeelResult<Self>;
}

struct Binding {
    producer: Producer,
    shared: bool,
}

/// A dependency injection container.
///
/// # Thread Safety
///
/// The container is `Send + Sync`. Bindings are registered through `&mut self`
/// during setup; resolution only needs `&self`, and the singleton cache is
/// guarded by a mutex.
#[derive(Default)]
pub struct Container {
    bindings: HashMap<Key, Binding>,
    constructors: HashMap<Key, Factory>,
    resolved: Mutex<HashMap<Key, Instance>>,
    parent: Option<Arc<Container>>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child container that delegates to this one.
    ///
    /// Bindings registered on the child are invisible to the parent and to
    /// sibling scopes. Singletons bound on the parent are cached on the
    /// parent and therefore shared by every scope.
    #[must_use]
    pub fn scope(self: &Arc<Self>) -> Self {
        Self {
            parent: Some(Arc::clone(self)),
            ..Self::default()
        }
    }

    /// Registers a producer for `key`, replacing any previous binding.
    ///
    /// Rebinding a key always drops its cached singleton instance.
    pub fn register(&mut self, key: Key, producer: Producer, shared: bool) {
        if self.resolved.get_mut().remove(&key).is_some() {
            debug!(key = %key, "rebinding cleared cached singleton");
        }
        debug!(key = %key, producer = ?producer, shared, "registering binding");
        self.bindings.insert(key, Binding { producer, shared });
    }

    /// Binds a non-cached factory for type `T`.
    pub fn bind<T, F>(&mut self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> KeelResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(Key::of::<T>(), Producer::factory(factory), false);
    }

    /// Binds a cached factory for type `T`.
    pub fn singleton<T, F>(&mut self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> KeelResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(Key::of::<T>(), Producer::factory(factory), true);
    }

    /// Binds an existing value for type `T`.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.register(Key::of::<T>(), Producer::instance(value), true);
    }

    /// Binds a non-cached factory under a string name.
    pub fn bind_named<T, F>(&mut self, name: &str, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> KeelResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(Key::name(name), Producer::factory(factory), false);
    }

    /// Binds a cached factory under a string name.
    pub fn singleton_named<T, F>(&mut self, name: &str, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> KeelResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(Key::name(name), Producer::factory(factory), true);
    }

    /// Binds an existing value under a string name.
    pub fn instance_named<T: ?Sized + Send + Sync + 'static>(&mut self, name: &str, value: Arc<T>) {
        self.register(Key::name(name), Producer::instance(value), true);
    }

    /// Binds `key` to another key that is auto-constructed on resolution.
    pub fn alias(&mut self, key: impl Into<Key>, concrete: Key) {
        self.register(key.into(), Producer::Concrete(concrete), false);
    }

    /// Like [`Container::alias`], but the constructed value is cached.
    pub fn alias_singleton(&mut self, key: impl Into<Key>, concrete: Key) {
        self.register(key.into(), Producer::Concrete(concrete), true);
    }

    /// Registers `T` as directly constructible by key.
    ///
    /// Typed resolution through [`Container::make`] and [`Resolver::dep`]
    /// does not need this; it is what makes `T` reachable from a plain
    /// [`Key`], e.g. through [`Container::alias`].
    pub fn autowire<T: Injectable>(&mut self) {
        let key = Key::of::<T>();
        debug!(key = %key, "registering constructor");
        self.constructors.insert(
            key,
            Arc::new(|deps: &mut Resolver<'_>| {
                T::construct(deps).map(|value| erase(Arc::new(value)))
            }),
        );
    }

    /// Registers `T` as directly constructible through `Default`.
    pub fn autowire_default<T: Default + Send + Sync + 'static>(&mut self) {
        self.constructors.insert(
            Key::of::<T>(),
            Arc::new(|_: &mut Resolver<'_>| Ok(erase(Arc::new(T::default())))),
        );
    }

    /// Registers controller `C` under `name` for `"name@action"` handlers.
    ///
    /// A fresh controller is constructed for every resolution.
    pub fn controller<C: Controller + Injectable>(&mut self, name: &str) {
        self.bind_named::<dyn Controller, _>(name, |deps| {
            let controller: Arc<dyn Controller> = deps.construct::<C>()?;
            Ok(controller)
        });
    }

    /// Returns true if `key` is bound here or in a parent, or is directly
    /// constructible.
    ///
    /// A type counts as directly constructible only once its constructor is
    /// registered with [`Container::autowire`], [`Container::autowire_default`]
    /// or [`Container::controller`]. An [`Injectable`] type that was never
    /// registered reports `false` here even though [`Container::make`] and
    /// [`Resolver::dep`] still construct it, since a key alone cannot name its
    /// constructor.
    #[must_use]
    pub fn has(&self, key: &Key) -> bool {
        self.lookup(key).is_some() || self.constructor(key).is_some()
    }

    /// Returns true if type `T` is bound or directly constructible.
    ///
    /// Same rules as [`Container::has`]: unregistered [`Injectable`] types
    /// are not reported.
    #[must_use]
    pub fn has_type<T: ?Sized + 'static>(&self) -> bool {
        self.has(&Key::of::<T>())
    }

    /// Resolves `key` to a type-erased instance.
    pub fn resolve(&self, key: &Key) -> KeelResult<Instance> {
        let mut path = Vec::new();
        self.resolve_in(key, &mut path)
    }

    /// Resolves `key` and downcasts the result to `Arc<T>`.
    pub fn resolve_as<T: ?Sized + Send + Sync + 'static>(&self, key: &Key) -> KeelResult<Arc<T>> {
        let instance = self.resolve(key)?;
        downcast(key, &instance)
    }

    /// Resolves the binding for type `T`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> KeelResult<Arc<T>> {
        self.resolve_as(&Key::of::<T>())
    }

    /// Resolves the binding registered under `name`.
    pub fn named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> KeelResult<Arc<T>> {
        self.resolve_as(&Key::name(name))
    }

    /// Resolves `T`, constructing it directly if nothing is bound to it.
    pub fn make<T: Injectable>(&self) -> KeelResult<Arc<T>> {
        let mut path = Vec::new();
        let mut resolver = Resolver::new(self, &mut path, Key::of::<T>());
        resolver.resolve_typed::<T>()
    }

    /// Returns the number of bindings registered on this container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no bindings are registered on this container.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn lookup(&self, key: &Key) -> Option<(&Self, &Binding)> {
        let mut current = Some(self);
        while let Some(container) = current {
            if let Some(binding) = container.bindings.get(key) {
                return Some((container, binding));
            }
            current = container.parent.as_deref();
        }
        None
    }

    fn constructor(&self, key: &Key) -> Option<&Factory> {
        let mut current = Some(self);
        while let Some(container) = current {
            if let Some(factory) = container.constructors.get(key) {
                return Some(factory);
            }
            current = container.parent.as_deref();
        }
        None
    }

    fn resolve_in(&self, key: &Key, path: &mut Vec<Key>) -> KeelResult<Instance> {
        if path.contains(key) {
            return Err(cycle(path, key));
        }

        if let Some((owner, binding)) = self.lookup(key) {
            if binding.shared {
                // Singletons resolve against the container that owns them.
                return owner.resolve_shared(key, &binding.producer, path);
            }
            return self.produce(key, &binding.producer, path);
        }

        if let Some(constructor) = self.constructor(key) {
            return self.build(key, constructor, path);
        }

        Err(KeelError::unbound(key))
    }

    fn resolve_shared(
        &self,
        key: &Key,
        producer: &Producer,
        path: &mut Vec<Key>,
    ) -> KeelResult<Instance> {
        let cached = self.resolved.lock().get(key).cloned();
        if let Some(instance) = cached {
            trace!(key = %key, "singleton cache hit");
            return Ok(instance);
        }

        let instance = self.produce(key, producer, path)?;
        let mut resolved = self.resolved.lock();
        Ok(Arc::clone(resolved.entry(key.clone()).or_insert(instance)))
    }

    fn produce(&self, key: &Key, producer: &Producer, path: &mut Vec<Key>) -> KeelResult<Instance> {
        path.push(key.clone());
        let result = match producer {
            Producer::Instance(instance) => Ok(Arc::clone(instance)),
            Producer::Factory(factory) => factory(&mut Resolver::new(self, path, key.clone())),
            Producer::Concrete(target) if target == key => match self.constructor(key) {
                Some(constructor) => constructor(&mut Resolver::new(self, path, key.clone())),
                None => Err(KeelError::not_instantiable(key)),
            },
            Producer::Concrete(target) => {
                if self.has(target) {
                    self.resolve_in(target, path)
                } else {
                    Err(KeelError::not_instantiable(target))
                }
            }
        };
        path.pop();
        result
    }

    fn build(&self, key: &Key, constructor: &Factory, path: &mut Vec<Key>) -> KeelResult<Instance> {
        trace!(key = %key, "auto-constructing");
        path.push(key.clone());
        let result = constructor(&mut Resolver::new(self, path, key.clone()));
        path.pop();
        result
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("binding_count", &self.bindings.len())
            .field("constructor_count", &self.constructors.len())
            .field("scoped", &self.parent.is_some())
            .finish()
    }
}

/// Resolution handle passed to factories and [`Injectable::construct`].
///
/// It carries the current resolution path, so dependencies resolved through
/// it take part in cycle detection, and the owning type, so failures can name
/// the parameter and the type being constructed.
pub struct Resolver<'a> {
    container: &'a Container,
    path: &'a mut Vec<Key>,
    owner: Key,
}

impl<'a> Resolver<'a> {
    fn new(container: &'a Container, path: &'a mut Vec<Key>, owner: Key) -> Self {
        Self {
            container,
            path,
            owner,
        }
    }

    /// Returns the container resolution runs against.
    #[must_use]
    pub fn container(&self) -> &Container {
        self.container
    }

    /// Returns the key currently being produced.
    #[must_use]
    pub fn owner(&self) -> &Key {
        &self.owner
    }

    /// Resolves `key` as part of the current resolution.
    pub fn resolve(&mut self, key: &Key) -> KeelResult<Instance> {
        self.container.resolve_in(key, self.path)
    }

    /// Resolves `key` and downcasts the result.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&mut self, key: &Key) -> KeelResult<Arc<T>> {
        let instance = self.resolve(key)?;
        downcast(key, &instance)
    }

    /// Constructs `T` directly, ignoring any binding for it.
    pub fn construct<T: Injectable>(&mut self) -> KeelResult<Arc<T>> {
        let key = Key::of::<T>();
        if self.path.contains(&key) {
            return Err(cycle(self.path, &key));
        }

        trace!(key = %key, "auto-constructing");
        self.path.push(key.clone());
        let result = T::construct(&mut Resolver::new(self.container, self.path, key));
        self.path.pop();
        result.map(Arc::new)
    }

    /// Resolves a typed constructor parameter.
    ///
    /// A binding for `T` wins; otherwise `T` is constructed directly.
    pub fn dep<T: Injectable>(&mut self, param: &str) -> KeelResult<Arc<T>> {
        let key = Key::of::<T>();
        self.resolve_typed::<T>()
            .map_err(|err| self.parameter_error(param, &key, err))
    }

    /// Resolves a typed constructor parameter, falling back to `default`
    /// when resolution misses.
    pub fn dep_or<T: Injectable>(
        &mut self,
        param: &str,
        default: impl FnOnce() -> T,
    ) -> KeelResult<Arc<T>> {
        match self.dep::<T>(param) {
            Err(err) if err.is_resolution_miss() => {
                trace!(param, owner = %self.owner, "using parameter default");
                Ok(Arc::new(default()))
            }
            other => other,
        }
    }

    /// Resolves a typed constructor parameter that must come from a binding,
    /// such as a trait object.
    pub fn bound<T: ?Sized + Send + Sync + 'static>(&mut self, param: &str) -> KeelResult<Arc<T>> {
        let key = Key::of::<T>();
        self.get::<T>(&key)
            .map_err(|err| self.parameter_error(param, &key, err))
    }

    /// Like [`Resolver::bound`], falling back to `default` when resolution
    /// misses.
    pub fn bound_or<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        param: &str,
        default: impl FnOnce() -> Arc<T>,
    ) -> KeelResult<Arc<T>> {
        match self.bound::<T>(param) {
            Err(err) if err.is_resolution_miss() => Ok(default()),
            other => other,
        }
    }

    /// Resolves a constructor parameter from the binding named `name`.
    pub fn named<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        param: &str,
        name: &str,
    ) -> KeelResult<Arc<T>> {
        let key = Key::name(name);
        self.get::<T>(&key)
            .map_err(|err| self.parameter_error(param, &key, err))
    }

    /// Resolves an untyped constructor parameter.
    ///
    /// The container has nothing to look up for such a parameter, so it only
    /// resolves through its default.
    pub fn value<V>(&mut self, param: &str, default: Option<V>) -> KeelResult<V> {
        default.ok_or_else(|| KeelError::unresolvable(param, self.owner.to_string()))
    }

    fn resolve_typed<T: Injectable>(&mut self) -> KeelResult<Arc<T>> {
        let key = Key::of::<T>();
        if self.container.has(&key) {
            self.get::<T>(&key)
        } else {
            self.construct::<T>()
        }
    }

    fn parameter_error(&self, param: &str, key: &Key, err: KeelError) -> KeelError {
        match err {
            KeelError::UnboundKey { key: missing } if missing == key.to_string() => {
                KeelError::unresolvable(param, self.owner.to_string())
            }
            other => other,
        }
    }
}

fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Instance {
    Arc::new(value)
}

fn downcast<T: ?Sized + Send + Sync + 'static>(key: &Key, instance: &Instance) -> KeelResult<Arc<T>> {
    instance.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
        KeelError::configuration(format!(
            "binding '{key}' does not produce a {}",
            type_name::<T>()
        ))
    })
}

fn cycle(path: &[Key], key: &Key) -> KeelError {
    let start = path.iter().position(|k| k == key).unwrap_or(0);
    let mut names: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
    names.push(key.to_string());
    KeelError::CircularDependency { path: names }
}
