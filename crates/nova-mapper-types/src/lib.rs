//! Semantic type model consumed by the mapping engine.
//!
//! The engine never talks to a compiler directly. Everything it knows about a type comes from a
//! [`TypeEnv`]: member lists, constructors, implemented collection interfaces, nullability and
//! value/reference semantics. [`TypeStore`] is the in-memory implementation used by the CLI and
//! by tests; it knows the shapes of the common .NET collection types (see [`KnownType`]) and can
//! load user types from declarative [`TypeDecl`]s.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod declare;
pub mod helpers;
mod library;
mod store;
mod type_expr;

pub use declare::{
    ConstructorDecl, EnumDecl, EnumMemberDecl, MemberDecl, MethodDecl, ObjectDecl, ParamDecl,
    TypeDecl,
};
pub use store::TypeStore;
pub use type_expr::TypeExprError;

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: &'static str,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self::new(Severity::Error, code, message, span)
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self::new(Severity::Warning, code, message, span)
    }

    pub fn info(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self::new(Severity::Info, code, message, span)
    }
}

/// Handle of a type inside a [`TypeEnv`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A use of a type together with its nullability annotation.
///
/// For value types `nullable` stands for the `Nullable<T>` wrapper, for reference types it is the
/// `?` annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    pub id: TypeId,
    pub nullable: bool,
}

impl TypeRef {
    pub fn new(id: TypeId) -> Self {
        Self {
            id,
            nullable: false,
        }
    }

    pub fn nullable(id: TypeId) -> Self {
        Self { id, nullable: true }
    }

    pub fn with_nullable(self, nullable: bool) -> Self {
        Self { nullable, ..self }
    }

    pub fn non_nullable(self) -> Self {
        self.with_nullable(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Bool,
    Char,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    String,
    Object,
    DateTime,
    DateTimeOffset,
    DateOnly,
    TimeOnly,
    TimeSpan,
    Guid,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 21] = [
        PrimitiveType::Bool,
        PrimitiveType::Char,
        PrimitiveType::SByte,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::UShort,
        PrimitiveType::Int,
        PrimitiveType::UInt,
        PrimitiveType::Long,
        PrimitiveType::ULong,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::Decimal,
        PrimitiveType::String,
        PrimitiveType::Object,
        PrimitiveType::DateTime,
        PrimitiveType::DateTimeOffset,
        PrimitiveType::DateOnly,
        PrimitiveType::TimeOnly,
        PrimitiveType::TimeSpan,
        PrimitiveType::Guid,
    ];

    /// The language keyword, if the type has one.
    pub fn keyword(self) -> Option<&'static str> {
        Some(match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::SByte => "sbyte",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::UShort => "ushort",
            PrimitiveType::Int => "int",
            PrimitiveType::UInt => "uint",
            PrimitiveType::Long => "long",
            PrimitiveType::ULong => "ulong",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Decimal => "decimal",
            PrimitiveType::String => "string",
            PrimitiveType::Object => "object",
            _ => return None,
        })
    }

    /// The runtime (`System.*`) name.
    pub fn clr_name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "Boolean",
            PrimitiveType::Char => "Char",
            PrimitiveType::SByte => "SByte",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Short => "Int16",
            PrimitiveType::UShort => "UInt16",
            PrimitiveType::Int => "Int32",
            PrimitiveType::UInt => "UInt32",
            PrimitiveType::Long => "Int64",
            PrimitiveType::ULong => "UInt64",
            PrimitiveType::Float => "Single",
            PrimitiveType::Double => "Double",
            PrimitiveType::Decimal => "Decimal",
            PrimitiveType::String => "String",
            PrimitiveType::Object => "Object",
            PrimitiveType::DateTime => "DateTime",
            PrimitiveType::DateTimeOffset => "DateTimeOffset",
            PrimitiveType::DateOnly => "DateOnly",
            PrimitiveType::TimeOnly => "TimeOnly",
            PrimitiveType::TimeSpan => "TimeSpan",
            PrimitiveType::Guid => "Guid",
        }
    }

    pub fn display_name(self) -> &'static str {
        self.keyword().unwrap_or_else(|| self.clr_name())
    }

    pub fn from_keyword(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keyword() == Some(name))
    }

    pub fn is_value_type(self) -> bool {
        !matches!(self, PrimitiveType::String | PrimitiveType::Object)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::SByte
                | PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::UShort
                | PrimitiveType::Int
                | PrimitiveType::UInt
                | PrimitiveType::Long
                | PrimitiveType::ULong
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral()
            || matches!(
                self,
                PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::Decimal
            )
    }

    /// Whether the type exposes a static `Parse(string)` method.
    pub fn has_parse_method(self) -> bool {
        self.is_value_type()
    }

    /// Implicit (non-narrowing) conversions between distinct primitives.
    pub fn implicitly_converts_to(self, target: PrimitiveType) -> bool {
        use PrimitiveType::*;

        if self == target || target == Object {
            return true;
        }
        let widening: &[PrimitiveType] = match self {
            SByte => &[Short, Int, Long, Float, Double, Decimal],
            Byte => &[Short, UShort, Int, UInt, Long, ULong, Float, Double, Decimal],
            Short => &[Int, Long, Float, Double, Decimal],
            UShort => &[Int, UInt, Long, ULong, Float, Double, Decimal],
            Int => &[Long, Float, Double, Decimal],
            UInt => &[Long, ULong, Float, Double, Decimal],
            Long | ULong => &[Float, Double, Decimal],
            Char => &[UShort, Int, UInt, Long, ULong, Float, Double, Decimal],
            Float => &[Double],
            DateTime => &[DateTimeOffset],
            _ => &[],
        };
        widening.contains(&target)
    }

    /// Explicit casts between distinct primitives (numeric narrowing, char <-> numeric).
    pub fn explicitly_converts_to(self, target: PrimitiveType) -> bool {
        let numeric_like = |p: PrimitiveType| p.is_numeric() || p == PrimitiveType::Char;
        numeric_like(self) && numeric_like(target)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Declared accessibility of a member, constructor or accessor.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    Public,
    ProtectedInternal,
    Internal,
    Protected,
    PrivateProtected,
    Private,
}

impl Accessibility {
    pub const ALL: [Accessibility; 6] = [
        Accessibility::Public,
        Accessibility::ProtectedInternal,
        Accessibility::Internal,
        Accessibility::Protected,
        Accessibility::PrivateProtected,
        Accessibility::Private,
    ];

    /// Accessibility visible to generated code living in the same assembly, without any
    /// special accessors.
    pub fn is_directly_accessible(self) -> bool {
        matches!(
            self,
            Accessibility::Public | Accessibility::Internal | Accessibility::ProtectedInternal
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumMemberDef {
    pub name: String,
    pub value: i64,
    /// Value of a `[Description]` attribute.
    pub description: Option<String>,
    /// Value of an `[EnumMember(Value = ..)]` attribute.
    pub serialization_name: Option<String>,
}

impl EnumMemberDef {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
            serialization_name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumDef {
    pub underlying: PrimitiveType,
    pub members: Vec<EnumMemberDef>,
}

impl EnumDef {
    pub fn member(&self, name: &str) -> Option<&EnumMemberDef> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_defined(&self, value: i64) -> bool {
        self.members.iter().any(|m| m.value == value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleElementDef {
    pub name: Option<String>,
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    Enum(EnumDef),
    Array { element: TypeRef },
    Tuple(Vec<TupleElementDef>),
    Class,
    Struct,
    Interface,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    Field,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SetterDef {
    pub accessibility: Accessibility,
    pub init_only: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberDef {
    pub name: String,
    pub ty: TypeRef,
    pub kind: MemberKind,
    pub is_static: bool,
    pub is_indexer: bool,
    pub getter: Option<Accessibility>,
    pub setter: Option<SetterDef>,
    pub required: bool,
}

impl MemberDef {
    /// A public `{ get; set; }` property.
    pub fn property(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: MemberKind::Property,
            is_static: false,
            is_indexer: false,
            getter: Some(Accessibility::Public),
            setter: Some(SetterDef {
                accessibility: Accessibility::Public,
                init_only: false,
            }),
            required: false,
        }
    }

    /// A public mutable field.
    pub fn field(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            kind: MemberKind::Field,
            ..Self::property(name, ty)
        }
    }

    /// A public get-only property.
    pub fn read_only(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            setter: None,
            ..Self::property(name, ty)
        }
    }

    pub fn init_only(mut self) -> Self {
        let accessibility = self
            .setter
            .map(|s| s.accessibility)
            .unwrap_or(Accessibility::Public);
        self.setter = Some(SetterDef {
            accessibility,
            init_only: true,
        });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_setter(mut self, accessibility: Accessibility) -> Self {
        self.setter = Some(SetterDef {
            accessibility,
            init_only: false,
        });
        self
    }

    pub fn write_only(mut self) -> Self {
        self.getter = None;
        self
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn is_init_only(&self) -> bool {
        self.setter.is_some_and(|s| s.init_only)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub ty: TypeRef,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorDef {
    pub accessibility: Accessibility,
    pub params: Vec<ParamDef>,
}

impl ConstructorDef {
    pub fn public(params: Vec<ParamDef>) -> Self {
        Self {
            accessibility: Accessibility::Public,
            params,
        }
    }

    pub fn is_parameterless(&self) -> bool {
        self.params.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<ParamDef>,
    /// `None` for `void`.
    pub return_type: Option<TypeRef>,
    pub is_static: bool,
    pub accessibility: Accessibility,
}

impl MethodDef {
    pub fn instance(name: impl Into<String>, params: Vec<ParamDef>, ret: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            params,
            return_type: ret,
            is_static: false,
            accessibility: Accessibility::Public,
        }
    }
}

/// Collection interface capabilities recognised by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceShape {
    Enumerable,
    Collection,
    List,
    ReadOnlyCollection,
    ReadOnlyList,
    Set,
    ReadOnlySet,
    Dictionary,
    ReadOnlyDictionary,
}

/// Library types whose shape the store knows how to synthesise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KnownType {
    List,
    HashSet,
    SortedSet,
    Stack,
    Queue,
    LinkedList,
    Dictionary,
    SortedDictionary,
    ReadOnlyCollection,
    ReadOnlyDictionary,
    ImmutableArray,
    ImmutableList,
    ImmutableHashSet,
    ImmutableDictionary,
    Span,
    ReadOnlySpan,
    Memory,
    ReadOnlyMemory,
    KeyValuePair,
    IEnumerable,
    ICollection,
    IList,
    IReadOnlyCollection,
    IReadOnlyList,
    ISet,
    IReadOnlySet,
    IDictionary,
    IReadOnlyDictionary,
}

impl KnownType {
    pub const ALL: [KnownType; 28] = [
        KnownType::List,
        KnownType::HashSet,
        KnownType::SortedSet,
        KnownType::Stack,
        KnownType::Queue,
        KnownType::LinkedList,
        KnownType::Dictionary,
        KnownType::SortedDictionary,
        KnownType::ReadOnlyCollection,
        KnownType::ReadOnlyDictionary,
        KnownType::ImmutableArray,
        KnownType::ImmutableList,
        KnownType::ImmutableHashSet,
        KnownType::ImmutableDictionary,
        KnownType::Span,
        KnownType::ReadOnlySpan,
        KnownType::Memory,
        KnownType::ReadOnlyMemory,
        KnownType::KeyValuePair,
        KnownType::IEnumerable,
        KnownType::ICollection,
        KnownType::IList,
        KnownType::IReadOnlyCollection,
        KnownType::IReadOnlyList,
        KnownType::ISet,
        KnownType::IReadOnlySet,
        KnownType::IDictionary,
        KnownType::IReadOnlyDictionary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KnownType::List => "List",
            KnownType::HashSet => "HashSet",
            KnownType::SortedSet => "SortedSet",
            KnownType::Stack => "Stack",
            KnownType::Queue => "Queue",
            KnownType::LinkedList => "LinkedList",
            KnownType::Dictionary => "Dictionary",
            KnownType::SortedDictionary => "SortedDictionary",
            KnownType::ReadOnlyCollection => "ReadOnlyCollection",
            KnownType::ReadOnlyDictionary => "ReadOnlyDictionary",
            KnownType::ImmutableArray => "ImmutableArray",
            KnownType::ImmutableList => "ImmutableList",
            KnownType::ImmutableHashSet => "ImmutableHashSet",
            KnownType::ImmutableDictionary => "ImmutableDictionary",
            KnownType::Span => "Span",
            KnownType::ReadOnlySpan => "ReadOnlySpan",
            KnownType::Memory => "Memory",
            KnownType::ReadOnlyMemory => "ReadOnlyMemory",
            KnownType::KeyValuePair => "KeyValuePair",
            KnownType::IEnumerable => "IEnumerable",
            KnownType::ICollection => "ICollection",
            KnownType::IList => "IList",
            KnownType::IReadOnlyCollection => "IReadOnlyCollection",
            KnownType::IReadOnlyList => "IReadOnlyList",
            KnownType::ISet => "ISet",
            KnownType::IReadOnlySet => "IReadOnlySet",
            KnownType::IDictionary => "IDictionary",
            KnownType::IReadOnlyDictionary => "IReadOnlyDictionary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn arity(self) -> usize {
        match self {
            KnownType::Dictionary
            | KnownType::SortedDictionary
            | KnownType::ReadOnlyDictionary
            | KnownType::ImmutableDictionary
            | KnownType::KeyValuePair
            | KnownType::IDictionary
            | KnownType::IReadOnlyDictionary => 2,
            _ => 1,
        }
    }

    pub fn is_interface(self) -> bool {
        self.interface_shape().is_some()
    }

    pub fn is_value_type(self) -> bool {
        matches!(
            self,
            KnownType::ImmutableArray
                | KnownType::Span
                | KnownType::ReadOnlySpan
                | KnownType::Memory
                | KnownType::ReadOnlyMemory
                | KnownType::KeyValuePair
        )
    }

    /// The capability this type represents, when it is one of the collection interfaces.
    pub fn interface_shape(self) -> Option<InterfaceShape> {
        Some(match self {
            KnownType::IEnumerable => InterfaceShape::Enumerable,
            KnownType::ICollection => InterfaceShape::Collection,
            KnownType::IList => InterfaceShape::List,
            KnownType::IReadOnlyCollection => InterfaceShape::ReadOnlyCollection,
            KnownType::IReadOnlyList => InterfaceShape::ReadOnlyList,
            KnownType::ISet => InterfaceShape::Set,
            KnownType::IReadOnlySet => InterfaceShape::ReadOnlySet,
            KnownType::IDictionary => InterfaceShape::Dictionary,
            KnownType::IReadOnlyDictionary => InterfaceShape::ReadOnlyDictionary,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    /// Display name, including generic arguments for instantiated library types.
    pub name: String,
    pub kind: TypeKind,
    pub known: Option<KnownType>,
    pub type_args: Vec<TypeRef>,
    /// Directly implemented interfaces. Each entry refers to an interface type.
    pub interfaces: Vec<TypeRef>,
    pub base: Option<TypeRef>,
    pub members: Vec<MemberDef>,
    pub constructors: Vec<ConstructorDef>,
    pub methods: Vec<MethodDef>,
    pub is_abstract: bool,
}

impl TypeDef {
    fn empty(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            known: None,
            type_args: Vec::new(),
            interfaces: Vec::new(),
            base: None,
            members: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::empty(name, TypeKind::Class)
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::empty(name, TypeKind::Struct)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut def = Self::empty(name, TypeKind::Interface);
        def.is_abstract = true;
        def
    }

    pub fn enumeration(name: impl Into<String>, def: EnumDef) -> Self {
        Self::empty(name, TypeKind::Enum(def))
    }

    pub(crate) fn primitive(prim: PrimitiveType) -> Self {
        Self::empty(prim.display_name(), TypeKind::Primitive(prim))
    }

    pub fn with_member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_property(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.with_member(MemberDef::property(name, ty))
    }

    pub fn with_constructor(mut self, ctor: ConstructorDef) -> Self {
        self.constructors.push(ctor);
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_interface(mut self, iface: TypeRef) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn enum_def(&self) -> Option<&EnumDef> {
        match &self.kind {
            TypeKind::Enum(def) => Some(def),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberDef> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Ids of types every store defines up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    primitives: Vec<TypeId>,
}

impl WellKnownTypes {
    pub(crate) fn new(primitives: Vec<TypeId>) -> Self {
        Self { primitives }
    }

    pub fn primitive(&self, prim: PrimitiveType) -> TypeId {
        self.primitives[prim as usize]
    }

    pub fn string(&self) -> TypeId {
        self.primitive(PrimitiveType::String)
    }

    pub fn object(&self) -> TypeId {
        self.primitive(PrimitiveType::Object)
    }

    pub fn int(&self) -> TypeId {
        self.primitive(PrimitiveType::Int)
    }

    pub fn bool(&self) -> TypeId {
        self.primitive(PrimitiveType::Bool)
    }
}

/// Read-only view of the type universe of one compilation.
pub trait TypeEnv: Send + Sync {
    fn type_def(&self, id: TypeId) -> Option<&TypeDef>;
    fn lookup_type(&self, name: &str) -> Option<TypeId>;
    fn well_known(&self) -> &WellKnownTypes;
}
