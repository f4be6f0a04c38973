//! Scopes and symbol tables
//!
//! All scopes of a program live in one `ScopeTree` arena and refer to
//! each other by `ScopeId`. The global scope is always `ScopeId(0)`; module
//! scopes hang directly under it and are also registered by name.

use crate::diagnostics::Span;
use crate::memory::StaticMemoryAnalyzer;
use crate::types::Type;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Struct,
    /// Enum type; members are separate `Enum.Member` symbols
    Enum { members: Vec<String> },
    EnumMember,
    /// `alloc`, `free`
    Builtin,
}

/// A named binding
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    pub is_public: bool,
    pub is_mutable: bool,
    pub scope_depth: usize,
    pub returns_ownership: bool,
    pub takes_ownership: bool,
    /// Per-parameter `#takes_ownership` marks, for functions
    pub owned_params: Vec<bool>,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: Type, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            is_public: false,
            is_mutable: false,
            scope_depth: 0,
            returns_ownership: false,
            takes_ownership: false,
            owned_params: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn variable(name: impl Into<String>, ty: Type, is_mutable: bool) -> Self {
        Self {
            is_mutable,
            ..Self::new(name, ty, SymbolKind::Variable)
        }
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Does the callee take ownership of argument `index`
    pub fn consumes_arg(&self, index: usize) -> bool {
        self.takes_ownership || self.owned_params.get(index).copied().unwrap_or(false)
    }

    /// A declared type, as opposed to a value
    pub fn is_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Struct | SymbolKind::Enum { .. })
    }
}

/// A `use` edge visible from a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImport {
    pub module_name: String,
    pub alias: String,
    pub module_scope: ScopeId,
}

/// What a scope belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOwner {
    Global,
    Module(String),
    Function(String),
    Block,
}

/// A `defer free(x);` waiting for its scope to end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredFree {
    pub variable: String,
    pub span: Span,
}

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub depth: usize,
    symbols: HashMap<String, Symbol>,
    pub children: Vec<ScopeId>,
    pub imported_modules: Vec<ModuleImport>,
    pub is_function_scope: bool,
    pub is_module_scope: bool,
    pub associated_node: ScopeOwner,
    pub deferred_frees: Vec<DeferredFree>,
    pub memory_analyzer: Option<StaticMemoryAnalyzer>,
}

impl Scope {
    fn new(name: &str, parent: Option<ScopeId>, depth: usize, owner: ScopeOwner) -> Self {
        Self {
            name: name.to_string(),
            parent,
            depth,
            symbols: HashMap::new(),
            children: Vec::new(),
            imported_modules: Vec::new(),
            is_function_scope: false,
            is_module_scope: false,
            associated_node: owner,
            deferred_frees: Vec::new(),
            memory_analyzer: None,
        }
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// Outcome of a qualified `alias::name` lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualifiedLookup<'a> {
    Found(&'a Symbol),
    /// Exists but is not public
    Private(&'a Symbol),
    UnknownModule,
    NotFound,
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    modules: HashMap<String, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub const GLOBAL: ScopeId = ScopeId(0);

    /// A tree holding the global scope and its builtins
    pub fn new() -> Self {
        let mut tree = Self {
            scopes: vec![Scope::new("global", None, 0, ScopeOwner::Global)],
            modules: HashMap::new(),
        };

        let void_ptr = Type::pointer(Type::void());
        let mut alloc = Symbol::new(
            "alloc",
            Type::function(vec![Type::int()], void_ptr.clone()),
            SymbolKind::Builtin,
        )
        .public(true);
        alloc.returns_ownership = true;
        let free = Symbol::new(
            "free",
            Type::function(vec![void_ptr], Type::void()),
            SymbolKind::Builtin,
        )
        .public(true);

        tree.insert(Self::GLOBAL, alloc);
        tree.insert(Self::GLOBAL, free);
        tree
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn push(&mut self, parent: ScopeId, name: &str, owner: ScopeOwner) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let depth = self.get(parent).depth + 1;
        self.scopes.push(Scope::new(name, Some(parent), depth, owner));
        self.get_mut(parent).children.push(id);
        id
    }

    /// A plain lexical block under `parent`
    pub fn create_child_scope(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        self.push(parent, name, ScopeOwner::Block)
    }

    /// A function body scope with its own memory analyzer
    pub fn create_function_scope(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let id = self.push(parent, name, ScopeOwner::Function(name.to_string()));
        let scope = self.get_mut(id);
        scope.is_function_scope = true;
        scope.memory_analyzer = Some(StaticMemoryAnalyzer::new());
        id
    }

    /// Register a module namespace under the global scope
    ///
    /// Returns `None` if a module of that name already exists.
    pub fn create_module_scope(&mut self, name: &str) -> Option<ScopeId> {
        if self.modules.contains_key(name) {
            return None;
        }
        let id = self.push(Self::GLOBAL, name, ScopeOwner::Module(name.to_string()));
        let scope = self.get_mut(id);
        scope.is_module_scope = true;
        scope.memory_analyzer = Some(StaticMemoryAnalyzer::new());
        self.modules.insert(name.to_string(), id);
        trace!(module = name, "registered module scope");
        Some(id)
    }

    pub fn module_scope(&self, name: &str) -> Option<ScopeId> {
        self.modules.get(name).copied()
    }

    /// Insert a symbol; fails if `name` already exists in this scope
    pub fn insert(&mut self, scope: ScopeId, mut symbol: Symbol) -> bool {
        let depth = self.get(scope).depth;
        let target = self.get_mut(scope);
        if target.symbols.contains_key(&symbol.name) {
            return false;
        }
        symbol.scope_depth = depth;
        target.symbols.insert(symbol.name.clone(), symbol);
        true
    }

    /// Insert a variable-like symbol
    pub fn add_symbol(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: Type,
        is_public: bool,
        is_mutable: bool,
    ) -> bool {
        self.insert(scope, Symbol::variable(name, ty, is_mutable).public(is_public))
    }

    /// Parent chain starting at `scope`
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |id| self.get(*id).parent)
    }

    /// Innermost binding of `name`, walking outwards
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.lookup_with_scope(scope, name).map(|(_, sym)| sym)
    }

    /// Like `lookup`, also returning the scope that holds the symbol
    pub fn lookup_with_scope(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Symbol)> {
        self.ancestors(scope)
            .find_map(|id| self.get(id).symbol(name).map(|sym| (id, sym)))
    }

    pub fn lookup_current_only(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.get(scope).symbol(name)
    }

    /// Look up `name` directly in `target`, honoring module privacy
    pub fn lookup_current_only_with_visibility(
        &self,
        target: ScopeId,
        name: &str,
        requesting_module: &str,
    ) -> Option<&Symbol> {
        let symbol = self.lookup_current_only(target, name)?;
        if symbol.is_public || self.owning_module(target) == Some(requesting_module) {
            Some(symbol)
        } else {
            None
        }
    }

    /// Name of the module that `scope` is nested in
    pub fn owning_module(&self, scope: ScopeId) -> Option<&str> {
        self.ancestors(scope).find_map(|id| match &self.get(id).associated_node {
            ScopeOwner::Module(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Innermost enclosing function name
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<&str> {
        for id in self.ancestors(scope) {
            match &self.get(id).associated_node {
                ScopeOwner::Function(name) => return Some(name),
                ScopeOwner::Module(_) | ScopeOwner::Global => return None,
                ScopeOwner::Block => {}
            }
        }
        None
    }

    /// Make `module_name` reachable from `scope` as `alias::`
    ///
    /// Returns false if no such module is registered.
    pub fn add_module_import(&mut self, scope: ScopeId, module_name: &str, alias: &str) -> bool {
        let Some(module_scope) = self.module_scope(module_name) else {
            return false;
        };
        self.get_mut(scope).imported_modules.push(ModuleImport {
            module_name: module_name.to_string(),
            alias: alias.to_string(),
            module_scope,
        });
        true
    }

    /// The import bound to `alias`, searching outwards from `scope`
    pub fn find_import(&self, scope: ScopeId, alias: &str) -> Option<&ModuleImport> {
        self.ancestors(scope).find_map(|id| {
            self.get(id)
                .imported_modules
                .iter()
                .find(|import| import.alias == alias)
        })
    }

    /// Resolve `alias::name` from `scope`
    pub fn qualified_lookup(&self, scope: ScopeId, alias: &str, name: &str) -> QualifiedLookup<'_> {
        let Some(import) = self.find_import(scope, alias) else {
            return QualifiedLookup::UnknownModule;
        };
        let requesting = self.owning_module(scope).unwrap_or_default();
        match self.lookup_current_only_with_visibility(import.module_scope, name, requesting) {
            Some(symbol) => QualifiedLookup::Found(symbol),
            None => match self.lookup_current_only(import.module_scope, name) {
                Some(symbol) => QualifiedLookup::Private(symbol),
                None => QualifiedLookup::NotFound,
            },
        }
    }

    /// Visible `alias::name`, or nothing
    pub fn lookup_qualified_symbol(&self, scope: ScopeId, alias: &str, name: &str) -> Option<&Symbol> {
        match self.qualified_lookup(scope, alias, name) {
            QualifiedLookup::Found(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Nearest scope (from `scope` outwards) that owns a memory analyzer
    pub fn analyzer_owner(&self, scope: ScopeId) -> Option<ScopeId> {
        self.ancestors(scope)
            .find(|id| self.get(*id).memory_analyzer.is_some())
    }

    /// Analyzer that tracks `var`, or the nearest one if none does
    ///
    /// When `var` resolves to a binding, analyzers outside the declaring
    /// scope's owner are skipped unless they hold `var` as an alias, so a
    /// shadowing name never reaches the allocation it hides.
    pub fn analyzer_for(&self, scope: ScopeId, var: &str) -> Option<ScopeId> {
        let Some((declared, _)) = self.lookup_with_scope(scope, var) else {
            return self
                .ancestors(scope)
                .find(|id| self.analyzer_knows(*id, var))
                .or_else(|| self.analyzer_owner(scope));
        };

        let home = self.analyzer_owner(declared);
        let mut within = true;
        for id in self.ancestors(scope) {
            if let Some(analyzer) = self.get(id).memory_analyzer.as_ref() {
                if (within && analyzer.knows(var)) || (!within && analyzer.tracks_alias(var)) {
                    return Some(id);
                }
            }
            if Some(id) == home {
                within = false;
            }
        }
        home.or_else(|| self.analyzer_owner(scope))
    }

    fn analyzer_knows(&self, scope: ScopeId, var: &str) -> bool {
        self.get(scope)
            .memory_analyzer
            .as_ref()
            .is_some_and(|a| a.knows(var))
    }

    pub fn analyzer(&self, scope: ScopeId) -> Option<&StaticMemoryAnalyzer> {
        let owner = self.analyzer_owner(scope)?;
        self.get(owner).memory_analyzer.as_ref()
    }

    pub fn analyzer_mut(&mut self, scope: ScopeId) -> Option<&mut StaticMemoryAnalyzer> {
        let owner = self.analyzer_owner(scope)?;
        self.get_mut(owner).memory_analyzer.as_mut()
    }

    /// Queue a `defer free(var)` on `scope`
    pub fn defer_free(&mut self, scope: ScopeId, variable: &str, span: Span) {
        self.get_mut(scope).deferred_frees.push(DeferredFree {
            variable: variable.to_string(),
            span,
        });
    }

    /// Drain the deferred frees of `scope`, in queue order
    pub fn take_deferred_frees(&mut self, scope: ScopeId) -> Vec<DeferredFree> {
        std::mem::take(&mut self.get_mut(scope).deferred_frees)
    }
}
