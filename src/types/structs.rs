//! Struct definitions
//!
//! A struct is built in two steps. `reserve` hands out a `StructId` for an
//! empty shell, so field and method types can mention the struct before it
//! exists. `finalize` installs the member list once; after that the
//! definition never changes.

use super::Type;
use serde::{Deserialize, Serialize};

/// Interned struct identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method {
        /// First parameter is named `self`
        has_self: bool,
        returns_ownership: bool,
        takes_ownership: bool,
        /// `#takes_ownership` per declared parameter, `self` included
        owned_params: Vec<bool>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    pub is_public: bool,
    pub kind: MemberKind,
}

impl StructMember {
    pub fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method { .. })
    }

    /// Whether the method consumes its declared parameter `index`
    pub fn consumes_param(&self, index: usize) -> bool {
        match &self.kind {
            MemberKind::Method {
                takes_ownership,
                owned_params,
                ..
            } => *takes_ownership || owned_params.get(index).copied().unwrap_or(false),
            MemberKind::Field => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub id: StructId,
    pub name: String,
    /// Module the struct was declared in
    pub module: String,
    pub is_public: bool,
    members: Vec<StructMember>,
    finalized: bool,
}

impl StructDef {
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members(&self) -> &[StructMember] {
        &self.members
    }

    /// Data fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &StructMember> {
        self.members.iter().filter(|m| !m.is_method())
    }

    pub fn methods(&self) -> impl Iterator<Item = &StructMember> {
        self.members.iter().filter(|m| m.is_method())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The value type of this struct
    pub fn ty(&self) -> Type {
        Type::Struct {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Arena of every struct in a program
#[derive(Debug, Clone, Default)]
pub struct StructTable {
    defs: Vec<StructDef>,
}

impl StructTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty shell and return its id
    pub fn reserve(&mut self, name: &str, module: &str, is_public: bool) -> StructId {
        let id = StructId(self.defs.len() as u32);
        self.defs.push(StructDef {
            id,
            name: name.to_string(),
            module: module.to_string(),
            is_public,
            members: Vec::new(),
            finalized: false,
        });
        id
    }

    pub fn get(&self, id: StructId) -> Option<&StructDef> {
        self.defs.get(id.0 as usize)
    }

    /// Install the members collected by `builder`
    ///
    /// Returns false if the struct was already finalized.
    pub fn finalize(&mut self, builder: StructBuilder) -> bool {
        match self.defs.get_mut(builder.id.0 as usize) {
            Some(def) if !def.finalized => {
                def.members = builder.fields;
                def.members.extend(builder.methods);
                def.finalized = true;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructDef> {
        self.defs.iter()
    }
}

/// Collects members for a reserved struct
#[derive(Debug, Clone)]
pub struct StructBuilder {
    id: StructId,
    fields: Vec<StructMember>,
    methods: Vec<StructMember>,
}

impl StructBuilder {
    pub fn new(id: StructId) -> Self {
        Self {
            id,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn id(&self) -> StructId {
        self.id
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields
            .iter()
            .chain(self.methods.iter())
            .any(|m| m.name == name)
    }

    /// Add a data field. Returns false on a duplicate name.
    pub fn field(&mut self, name: &str, ty: Type, is_public: bool) -> bool {
        if self.contains(name) {
            return false;
        }
        self.fields.push(StructMember {
            name: name.to_string(),
            ty,
            is_public,
            kind: MemberKind::Field,
        });
        true
    }

    /// Add a method signature. Returns false on a duplicate name.
    pub fn method(&mut self, name: &str, ty: Type, is_public: bool, kind: MemberKind) -> bool {
        if self.contains(name) {
            return false;
        }
        self.methods.push(StructMember {
            name: name.to_string(),
            ty,
            is_public,
            kind,
        });
        true
    }
}
