//! In-memory ABI graph.
//!
//! The graph is a closed sum type (`Node`) stored in an arena (`AbiArena`)
//! and addressed by `NodeId` handles. Every edge between nodes is a handle,
//! so structural sharing (many declarations pointing at the same type) and
//! cycles (a class whose members point back at the class) need no reference
//! counting.
//!
//! Design notes:
//! - Owning edges (namespace members, class members, template parameters,
//!   function parameters) and non-owning edges (pointed-to types, base
//!   classes, variable types, `earlier_declaration`) are both handles. Which
//!   one an edge is only matters to the writer: owned children are emitted in
//!   full, referenced nodes are emitted by id.
//! - The arena hands out slots that can be reserved and filled later. The
//!   reader uses this for forward `type-id` references.

use crate::model::location::Location;
use bitflags::bitflags;
use std::fmt;

/// Handle of a node inside an `AbiArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena owning every node of a translation unit.
#[derive(Debug, Clone, Default)]
pub struct AbiArena {
    nodes: Vec<Option<Node>>,
}

impl AbiArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: impl Into<Node>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node.into()));
        id
    }

    /// Reserve a slot whose node is not known yet.
    pub(crate) fn reserve(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(None);
        id
    }

    pub(crate) fn fill(&mut self, id: NodeId, node: impl Into<Node>) {
        self.nodes[id.index()] = Some(node.into());
    }

    pub(crate) fn is_filled(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()), Some(Some(_)))
    }

    /// Returns the node for `id`, or `None` for foreign or unfilled handles.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    None,
    Default,
    Protected,
    Hidden,
    Internal,
}

impl Visibility {
    /// Attribute text, `None` for `Visibility::None`.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Visibility::None => None,
            Visibility::Default => Some("default"),
            Visibility::Protected => Some("protected"),
            Visibility::Hidden => Some("hidden"),
            Visibility::Internal => Some("internal"),
        }
    }

    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Visibility::Default),
            "protected" => Some(Visibility::Protected),
            "hidden" => Some(Visibility::Hidden),
            "internal" => Some(Visibility::Internal),
            _ => None,
        }
    }
}

/// Symbol binding. Only meaningful for variables and functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    None,
    Local,
    Global,
    Weak,
}

impl Binding {
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Binding::None => None,
            Binding::Local => Some("local"),
            Binding::Global => Some("global"),
            Binding::Weak => Some("weak"),
        }
    }

    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Binding::Local),
            "global" => Some(Binding::Global),
            "weak" => Some(Binding::Weak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessSpecifier {
    #[default]
    Private,
    Protected,
    Public,
}

impl AccessSpecifier {
    pub fn as_attr(self) -> &'static str {
        match self {
            AccessSpecifier::Private => "private",
            AccessSpecifier::Protected => "protected",
            AccessSpecifier::Public => "public",
        }
    }

    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "private" => Some(AccessSpecifier::Private),
            "protected" => Some(AccessSpecifier::Protected),
            "public" => Some(AccessSpecifier::Public),
            _ => None,
        }
    }
}

bitflags! {
    /// cv-qualifiers of a `QualifiedType`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CvQualifiers: u8 {
        const CONST = 0b001;
        const VOLATILE = 0b010;
        const RESTRICT = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceKind {
    #[default]
    LValue,
    RValue,
}

impl ReferenceKind {
    pub fn as_attr(self) -> &'static str {
        match self {
            ReferenceKind::LValue => "lvalue",
            ReferenceKind::RValue => "rvalue",
        }
    }

    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "lvalue" => Some(ReferenceKind::LValue),
            "rvalue" => Some(ReferenceKind::RValue),
            _ => None,
        }
    }
}

/// A basic (built-in) type such as `int`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasicType {
    pub name: String,
    pub size_in_bits: u64,
    pub alignment_in_bits: u64,
    pub location: Location,
}

impl BasicType {
    pub fn new(name: impl Into<String>, size_in_bits: u64) -> Self {
        BasicType {
            name: name.into(),
            size_in_bits,
            alignment_in_bits: 0,
            location: Location::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceDecl {
    pub name: String,
    pub location: Location,
    pub members: Vec<NodeId>,
}

impl NamespaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        NamespaceDecl {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedType {
    pub underlying: NodeId,
    pub cv: CvQualifiers,
    pub location: Location,
}

impl QualifiedType {
    pub fn new(underlying: NodeId, cv: CvQualifiers) -> Self {
        QualifiedType {
            underlying,
            cv,
            location: Location::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerType {
    pub pointed_to: NodeId,
    pub size_in_bits: u64,
    pub alignment_in_bits: u64,
    pub location: Location,
}

impl PointerType {
    pub fn new(pointed_to: NodeId, size_in_bits: u64) -> Self {
        PointerType {
            pointed_to,
            size_in_bits,
            alignment_in_bits: 0,
            location: Location::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceType {
    pub pointed_to: NodeId,
    pub kind: ReferenceKind,
    pub size_in_bits: u64,
    pub alignment_in_bits: u64,
    pub location: Location,
}

impl ReferenceType {
    pub fn new(pointed_to: NodeId, kind: ReferenceKind, size_in_bits: u64) -> Self {
        ReferenceType {
            pointed_to,
            kind,
            size_in_bits,
            alignment_in_bits: 0,
            location: Location::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub location: Location,
    pub underlying: NodeId,
    pub enumerators: Vec<Enumerator>,
}

impl EnumDecl {
    pub fn new(name: impl Into<String>, underlying: NodeId) -> Self {
        EnumDecl {
            name: name.into(),
            location: Location::NONE,
            underlying,
            enumerators: Vec::new(),
        }
    }

    pub fn with_enumerator(mut self, name: impl Into<String>, value: i64) -> Self {
        self.enumerators.push(Enumerator {
            name: name.into(),
            value,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefDecl {
    pub name: String,
    pub underlying: NodeId,
    pub location: Location,
}

impl TypedefDecl {
    pub fn new(name: impl Into<String>, underlying: NodeId) -> Self {
        TypedefDecl {
            name: name.into(),
            underlying,
            location: Location::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub name: String,
    pub ty: NodeId,
    pub mangled_name: Option<String>,
    pub location: Location,
    pub visibility: Visibility,
    pub binding: Binding,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: NodeId) -> Self {
        VarDecl {
            name: name.into(),
            ty,
            mangled_name: None,
            location: Location::NONE,
            visibility: Visibility::None,
            binding: Binding::None,
        }
    }
}

/// A function parameter. A variadic parameter (`...`) has no type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parameter {
    pub ty: Option<NodeId>,
    pub name: Option<String>,
    pub location: Location,
    pub variadic: bool,
}

impl Parameter {
    pub fn new(ty: NodeId) -> Self {
        Parameter {
            ty: Some(ty),
            ..Default::default()
        }
    }

    pub fn named(ty: NodeId, name: impl Into<String>) -> Self {
        Parameter {
            ty: Some(ty),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn variadic() -> Self {
        Parameter {
            variadic: true,
            ..Default::default()
        }
    }
}

/// A function or method declaration.
///
/// For methods (`is_method`), the first entry of `parameters` is the implicit
/// `this` parameter and is never written out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionDecl {
    pub name: String,
    pub mangled_name: Option<String>,
    pub location: Location,
    pub declared_inline: bool,
    pub visibility: Visibility,
    pub binding: Binding,
    pub size_in_bits: u64,
    pub alignment_in_bits: u64,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<NodeId>,
    pub is_method: bool,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionDecl {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSpec {
    pub base: NodeId,
    pub access: AccessSpecifier,
    /// `None` when the base has no known layout offset.
    pub offset_in_bits: Option<u64>,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberType {
    pub access: AccessSpecifier,
    pub decl: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMember {
    pub access: AccessSpecifier,
    pub is_static: bool,
    /// `None` for members that are not laid out (static members).
    pub offset_in_bits: Option<u64>,
    pub var: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFunction {
    pub access: AccessSpecifier,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub vtable_offset: Option<u64>,
    pub function: NodeId,
}

impl MemberFunction {
    pub fn new(access: AccessSpecifier, function: NodeId) -> Self {
        MemberFunction {
            access,
            is_constructor: false,
            is_destructor: false,
            is_const: false,
            is_static: false,
            vtable_offset: None,
            function,
        }
    }
}

/// A member function template or member class template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTemplate {
    pub access: AccessSpecifier,
    pub is_constructor: bool,
    pub is_static: bool,
    pub template: NodeId,
}

/// A class or struct, either a full definition or a declaration only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassDecl {
    pub name: String,
    pub size_in_bits: u64,
    pub alignment_in_bits: u64,
    pub location: Location,
    pub visibility: Visibility,
    pub is_struct: bool,
    pub declaration_only: bool,
    /// For a definition, the declaration-only node it completes.
    pub earlier_declaration: Option<NodeId>,
    pub bases: Vec<BaseSpec>,
    pub member_types: Vec<MemberType>,
    pub data_members: Vec<DataMember>,
    pub member_functions: Vec<MemberFunction>,
    pub member_function_templates: Vec<MemberTemplate>,
    pub member_class_templates: Vec<MemberTemplate>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, size_in_bits: u64) -> Self {
        ClassDecl {
            name: name.into(),
            size_in_bits,
            ..Default::default()
        }
    }

    pub fn declaration(name: impl Into<String>) -> Self {
        ClassDecl {
            name: name.into(),
            declaration_only: true,
            ..Default::default()
        }
    }

    pub fn has_members(&self) -> bool {
        !(self.member_types.is_empty()
            && self.data_members.is_empty()
            && self.member_functions.is_empty()
            && self.member_function_templates.is_empty()
            && self.member_class_templates.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeTemplateParameter {
    pub name: String,
    pub location: Location,
}

impl TypeTemplateParameter {
    pub fn new(name: impl Into<String>) -> Self {
        TypeTemplateParameter {
            name: name.into(),
            location: Location::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTypeTemplateParameter {
    pub name: String,
    pub ty: NodeId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateTemplateParameter {
    pub name: String,
    pub location: Location,
    pub parameters: Vec<NodeId>,
}

/// A template parameter whose use is a pointer, reference or qualified
/// composition of another parameter (e.g. `T*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeComposition {
    pub composed: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTemplate {
    pub location: Location,
    pub visibility: Visibility,
    pub binding: Binding,
    pub parameters: Vec<NodeId>,
    /// The generalized `FunctionDecl`.
    pub pattern: NodeId,
}

impl FunctionTemplate {
    pub fn new(parameters: Vec<NodeId>, pattern: NodeId) -> Self {
        FunctionTemplate {
            location: Location::NONE,
            visibility: Visibility::None,
            binding: Binding::None,
            parameters,
            pattern,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTemplate {
    pub location: Location,
    pub visibility: Visibility,
    pub parameters: Vec<NodeId>,
    /// The generalized `ClassDecl`.
    pub pattern: NodeId,
}

impl ClassTemplate {
    pub fn new(parameters: Vec<NodeId>, pattern: NodeId) -> Self {
        ClassTemplate {
            location: Location::NONE,
            visibility: Visibility::None,
            parameters,
            pattern,
        }
    }
}

/// A single type or declaration of the ABI graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    BasicType(BasicType),
    Namespace(NamespaceDecl),
    Qualified(QualifiedType),
    Pointer(PointerType),
    Reference(ReferenceType),
    Enum(EnumDecl),
    Typedef(TypedefDecl),
    Variable(VarDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    TemplateTypeParameter(TypeTemplateParameter),
    TemplateNonTypeParameter(NonTypeTemplateParameter),
    TemplateTemplateParameter(TemplateTemplateParameter),
    TypeComposition(TypeComposition),
    FunctionTemplate(FunctionTemplate),
    ClassTemplate(ClassTemplate),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::BasicType(_) => NodeKind::BasicType,
            Node::Namespace(_) => NodeKind::Namespace,
            Node::Qualified(_) => NodeKind::Qualified,
            Node::Pointer(_) => NodeKind::Pointer,
            Node::Reference(_) => NodeKind::Reference,
            Node::Enum(_) => NodeKind::Enum,
            Node::Typedef(_) => NodeKind::Typedef,
            Node::Variable(_) => NodeKind::Variable,
            Node::Function(_) => NodeKind::Function,
            Node::Class(_) => NodeKind::Class,
            Node::TemplateTypeParameter(_) => NodeKind::TemplateTypeParameter,
            Node::TemplateNonTypeParameter(_) => NodeKind::TemplateNonTypeParameter,
            Node::TemplateTemplateParameter(_) => NodeKind::TemplateTemplateParameter,
            Node::TypeComposition(_) => NodeKind::TypeComposition,
            Node::FunctionTemplate(_) => NodeKind::FunctionTemplate,
            Node::ClassTemplate(_) => NodeKind::ClassTemplate,
        }
    }
}

impl_node_from!(
    BasicType => BasicType,
    NamespaceDecl => Namespace,
    QualifiedType => Qualified,
    PointerType => Pointer,
    ReferenceType => Reference,
    EnumDecl => Enum,
    TypedefDecl => Typedef,
    VarDecl => Variable,
    FunctionDecl => Function,
    ClassDecl => Class,
    TypeTemplateParameter => TemplateTypeParameter,
    NonTypeTemplateParameter => TemplateNonTypeParameter,
    TemplateTemplateParameter => TemplateTemplateParameter,
    TypeComposition => TypeComposition,
    FunctionTemplate => FunctionTemplate,
    ClassTemplate => ClassTemplate,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    BasicType,
    Namespace,
    Qualified,
    Pointer,
    Reference,
    Enum,
    Typedef,
    Variable,
    Function,
    Class,
    TemplateTypeParameter,
    TemplateNonTypeParameter,
    TemplateTemplateParameter,
    TypeComposition,
    FunctionTemplate,
    ClassTemplate,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::BasicType => "basic type",
            NodeKind::Namespace => "namespace",
            NodeKind::Qualified => "qualified type",
            NodeKind::Pointer => "pointer type",
            NodeKind::Reference => "reference type",
            NodeKind::Enum => "enum",
            NodeKind::Typedef => "typedef",
            NodeKind::Variable => "variable",
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::TemplateTypeParameter => "template type parameter",
            NodeKind::TemplateNonTypeParameter => "template non-type parameter",
            NodeKind::TemplateTemplateParameter => "template template parameter",
            NodeKind::TypeComposition => "template parameter type composition",
            NodeKind::FunctionTemplate => "function template",
            NodeKind::ClassTemplate => "class template",
        };
        f.write_str(name)
    }
}
