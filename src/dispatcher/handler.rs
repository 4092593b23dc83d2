use super::context::RequestContext;
use super::core::Dispatcher;
use serde_json::Value;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a handler hands back: an optional result value for the result hook,
/// or any error for the error classifier.
pub type HandlerResult = anyhow::Result<Option<Value>>;

/// A directly invocable handler.
pub type Callable = Arc<dyn Fn(&mut RequestContext) -> HandlerResult + Send + Sync>;

/// The `run` capability of handler objects.
pub trait RequestHandler: Send + Sync {
    fn run(&self, ctx: &mut RequestContext) -> HandlerResult;
}

/// The product of constructing a class reference.
pub enum Instance {
    /// Exposes `run`.
    Handler(Box<dyn RequestHandler>),
    /// A nested dispatcher to delegate to.
    Dispatcher(Box<Dispatcher>),
    /// A type without the `run` capability; only reachable through named
    /// methods.
    Inert(&'static str),
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::Handler(_) => f.write_str("Instance::Handler"),
            Instance::Dispatcher(d) => write!(f, "Instance::Dispatcher({})", d.name()),
            Instance::Inert(name) => write!(f, "Instance::Inert({name})"),
        }
    }
}

/// Zero-argument constructor for a class reference.
pub type Constructor = Arc<dyn Fn() -> Instance + Send + Sync>;

/// A type to instantiate afresh every time its route matches.
#[derive(Clone)]
pub struct ClassRef {
    pub name: String,
    pub construct: Constructor,
}

/// The user-supplied, not yet resolved handler of a route.
#[derive(Clone)]
pub enum Descriptor {
    /// Invoked as is.
    Callable(Callable),
    /// Instantiated per request.
    Class(ClassRef),
    /// A constructed handler object, shared across requests.
    Instance(Arc<dyn RequestHandler>),
    /// A constructed nested dispatcher, shared across requests.
    Dispatcher(Arc<Dispatcher>),
    /// A name resolved through the dispatcher's [`HandlerCatalog`] and any
    /// installed descriptor resolvers (e.g. `"Handler::other"`).
    Named(String),
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Callable(_) => f.write_str("Callable"),
            Descriptor::Class(class) => write!(f, "Class({})", class.name),
            Descriptor::Instance(_) => f.write_str("Instance"),
            Descriptor::Dispatcher(d) => write!(f, "Dispatcher({})", d.name()),
            Descriptor::Named(name) => write!(f, "Named({name})"),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Descriptor {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        Descriptor::Callable(Arc::new(f))
    }

    pub fn handler<H: RequestHandler + 'static>(handler: H) -> Self {
        Descriptor::Instance(Arc::new(handler))
    }

    /// Class reference constructing `T::default()` on every match.
    #[must_use]
    pub fn class<T: RequestHandler + Default + 'static>() -> Self {
        Descriptor::Class(ClassRef {
            name: type_name::<T>().to_string(),
            construct: Arc::new(|| Instance::Handler(Box::new(T::default()))),
        })
    }

    /// Class reference constructing a fresh nested dispatcher on every match.
    pub fn dispatcher_class<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn() -> Dispatcher + Send + Sync + 'static,
    {
        Descriptor::Class(ClassRef {
            name: name.into(),
            construct: Arc::new(move || Instance::Dispatcher(Box::new(construct()))),
        })
    }

    pub fn nested(dispatcher: Dispatcher) -> Self {
        Descriptor::Dispatcher(Arc::new(dispatcher))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Descriptor::Named(name.into())
    }

    /// Handler that does nothing.
    #[must_use]
    pub fn nop() -> Self {
        Descriptor::callable(nop)
    }
}

/// The no-op handler.
pub fn nop(_ctx: &mut RequestContext) -> HandlerResult {
    Ok(None)
}

impl From<&str> for Descriptor {
    fn from(name: &str) -> Self {
        Descriptor::Named(name.to_string())
    }
}

impl From<String> for Descriptor {
    fn from(name: String) -> Self {
        Descriptor::Named(name)
    }
}

impl From<Dispatcher> for Descriptor {
    fn from(dispatcher: Dispatcher) -> Self {
        Descriptor::nested(dispatcher)
    }
}

impl From<Callable> for Descriptor {
    fn from(callable: Callable) -> Self {
        Descriptor::Callable(callable)
    }
}

struct CatalogEntry {
    construct: Constructor,
    methods: HashMap<String, Callable>,
    statics: HashMap<String, Callable>,
}

/// Named types string descriptors can refer to: the class-reference registry.
///
/// Each entry has a zero-argument constructor plus optional named instance
/// methods (called on a fresh instance) and static methods.
#[derive(Default)]
pub struct HandlerCatalog {
    types: HashMap<String, CatalogEntry>,
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("HandlerCatalog")
            .field("types", &names)
            .finish()
    }
}

impl HandlerCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler type; its instances expose `run`.
    pub fn register_handler<T, F>(&mut self, name: &str, construct: F) -> ClassBuilder<'_, T>
    where
        T: RequestHandler + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let construct = Arc::new(construct);
        let erased = Arc::clone(&construct);
        self.insert(
            name,
            Arc::new(move || Instance::Handler(Box::new(erased()))),
            construct,
        )
    }

    /// Register a type without the `run` capability. Naming it alone as a
    /// route handler is a configuration fault; its methods are still
    /// reachable through `Type::method` descriptors.
    pub fn register_type<T, F>(&mut self, name: &str, construct: F) -> ClassBuilder<'_, T>
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let erased: Constructor = Arc::new(|| Instance::Inert(type_name::<T>()));
        self.insert(name, erased, Arc::new(construct))
    }

    /// Register a nested dispatcher type, constructed afresh per request.
    pub fn register_dispatcher<F>(&mut self, name: &str, construct: F) -> &mut Self
    where
        F: Fn() -> Dispatcher + Send + Sync + 'static,
    {
        self.types.insert(
            name.to_string(),
            CatalogEntry {
                construct: Arc::new(move || Instance::Dispatcher(Box::new(construct()))),
                methods: HashMap::new(),
                statics: HashMap::new(),
            },
        );
        self
    }

    fn insert<T: 'static>(
        &mut self,
        name: &str,
        erased: Constructor,
        construct: Arc<dyn Fn() -> T + Send + Sync>,
    ) -> ClassBuilder<'_, T> {
        let entry = self
            .types
            .entry(name.to_string())
            .or_insert_with(|| CatalogEntry {
                construct: Arc::clone(&erased),
                methods: HashMap::new(),
                statics: HashMap::new(),
            });
        entry.construct = erased;
        ClassBuilder { entry, construct }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Construct a fresh instance of the named type.
    #[must_use]
    pub fn instantiate(&self, name: &str) -> Option<Instance> {
        self.types.get(name).map(|entry| (entry.construct)())
    }

    /// Instance method of the named type; each call constructs a fresh
    /// instance.
    #[must_use]
    pub fn method(&self, type_name: &str, method: &str) -> Option<Callable> {
        self.types
            .get(type_name)
            .and_then(|entry| entry.methods.get(method))
            .map(Arc::clone)
    }

    #[must_use]
    pub fn static_method(&self, type_name: &str, method: &str) -> Option<Callable> {
        self.types
            .get(type_name)
            .and_then(|entry| entry.statics.get(method))
            .map(Arc::clone)
    }
}

/// Adds named methods to a catalog entry.
pub struct ClassBuilder<'a, T> {
    entry: &'a mut CatalogEntry,
    construct: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T: 'static> ClassBuilder<'_, T> {
    /// Instance method, invoked on a freshly constructed `T`.
    #[must_use]
    pub fn method<M>(self, name: &str, method: M) -> Self
    where
        M: Fn(&T, &mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        let construct = Arc::clone(&self.construct);
        let callable: Callable = Arc::new(move |ctx: &mut RequestContext| {
            let instance = construct();
            method(&instance, ctx)
        });
        self.entry.methods.insert(name.to_string(), callable);
        self
    }

    /// Static method, invoked without constructing.
    #[must_use]
    pub fn static_method<M>(self, name: &str, method: M) -> Self
    where
        M: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.entry
            .statics
            .insert(name.to_string(), Arc::new(method));
        self
    }
}
