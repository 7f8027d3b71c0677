//! Rebuilds an ABI graph from a parsed element tree.
//!
//! Ids in the document become arena handles. A `type-id` may point at an
//! element that appears later, so unknown ids reserve an arena slot that the
//! defining element fills in. Once a unit is done, every reserved slot must
//! have been filled.

use crate::err::{DeserializationError, DeserializationResult as Result};
use crate::model::{
    AbiArena, AccessSpecifier, BaseSpec, BasicType, Binding, ClassDecl, ClassTemplate,
    CvQualifiers, DataMember, EnumDecl, Enumerator, FunctionDecl, FunctionTemplate, Location,
    LocationManager, MemberFunction, MemberTemplate, MemberType, NamespaceDecl, Node, NodeId,
    NonTypeTemplateParameter, Parameter, PointerType, QualifiedType, ReferenceKind,
    ReferenceType, TemplateTemplateParameter, TranslationUnit, TypeComposition,
    TypeTemplateParameter, TypedefDecl, VarDecl, Visibility,
};
use crate::reader::tree::XmlElement;
use ahash::RandomState;
use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

pub(crate) fn build_translation_unit(root: &XmlElement) -> Result<TranslationUnit> {
    check_version(root)?;

    let address_size = root.parse_attr::<u8>("address-size")?.unwrap_or(0);
    let path = root.attr("path").unwrap_or_default().to_owned();
    let language = root.attr("language").map(str::to_owned);

    let mut builder = UnitBuilder::default();
    let global_scope = builder.arena.alloc(NamespaceDecl::default());

    let mut decls = Vec::with_capacity(root.children.len());
    for child in &root.children {
        decls.push(builder.build_decl(root, child)?);
    }

    if let Some(Node::Namespace(scope)) = builder.arena.get_mut(global_scope) {
        scope.members = decls;
    }

    builder.check_resolved()?;
    debug!(
        "read translation unit `{}` ({} nodes)",
        path,
        builder.arena.len()
    );

    Ok(TranslationUnit::from_parts(
        path,
        language,
        address_size,
        builder.arena,
        builder.locations,
        global_scope,
    ))
}

/// Major format version this reader understands. Minor versions only add
/// optional attributes, so any minor version is accepted.
pub(crate) const SUPPORTED_MAJOR_VERSION: u8 = 1;

/// Validate a `version='MAJOR.MINOR'` attribute.
pub(crate) fn check_version(element: &XmlElement) -> Result<(u8, u8)> {
    let version = element.required_attr("version")?;
    let (major, minor): (u8, u8) = version
        .split_once('.')
        .and_then(|(major, minor)| Some((major.parse().ok()?, minor.parse().ok()?)))
        .ok_or_else(|| element.invalid("version", version))?;

    if major != SUPPORTED_MAJOR_VERSION {
        return Err(DeserializationError::UnsupportedVersion {
            element: element.name.clone(),
            version: version.to_owned(),
        });
    }
    Ok((major, minor))
}

#[derive(Default)]
struct UnitBuilder {
    arena: AbiArena,
    locations: LocationManager,
    ids: HashMap<String, NodeId, RandomState>,
    /// Slots an element has started (or finished) defining.
    claimed: HashSet<NodeId, RandomState>,
}

impl UnitBuilder {
    /// Handle for a referenced id, reserving a slot if it is not known yet.
    fn resolve(&mut self, id: &str) -> NodeId {
        if let Some(&node) = self.ids.get(id) {
            return node;
        }
        let node = self.arena.reserve();
        self.ids.insert(id.to_owned(), node);
        node
    }

    /// Handle for the element defining `id`.
    fn define(&mut self, id: &str) -> Result<NodeId> {
        let node = self.resolve(id);
        if !self.claimed.insert(node) {
            return Err(DeserializationError::DuplicateId { id: id.to_owned() });
        }
        Ok(node)
    }

    fn define_from(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = element.required_attr("id")?;
        self.define(id)
    }

    fn type_ref(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = element.required_attr("type-id")?;
        Ok(self.resolve(id))
    }

    fn check_resolved(&self) -> Result<()> {
        let mut unresolved: Vec<(&String, &NodeId)> = self
            .ids
            .iter()
            .filter(|(_, node)| !self.arena.is_filled(**node))
            .collect();
        unresolved.sort_by_key(|(_, node)| **node);

        match unresolved.first() {
            Some((id, _)) => Err(DeserializationError::UnresolvedId {
                id: (*id).clone(),
            }),
            None => Ok(()),
        }
    }

    fn location(&mut self, element: &XmlElement) -> Result<Location> {
        let Some(path) = element.attr("filepath") else {
            return Ok(Location::NONE);
        };
        let line = element.parse_attr("line")?.unwrap_or(0);
        let column = element.parse_attr("column")?.unwrap_or(0);
        Ok(self.locations.create_new_location(path, line, column))
    }

    fn build_decl(&mut self, parent: &XmlElement, element: &XmlElement) -> Result<NodeId> {
        trace!("build_decl: {}", element.name);
        match element.name.as_str() {
            "type-decl" => self.build_type_decl(element),
            "namespace-decl" => self.build_namespace_decl(element),
            "qualified-type-def" => self.build_qualified_type_def(element),
            "pointer-type-def" => self.build_pointer_type_def(element),
            "reference-type-def" => self.build_reference_type_def(element),
            "enum-decl" => self.build_enum_decl(element),
            "typedef-decl" => self.build_typedef_decl(element),
            "var-decl" => self.build_var_decl(element),
            "function-decl" => self.build_function_decl(element, None),
            "class-decl" => self.build_class_decl(element),
            "function-template-decl" => self.build_function_template_decl(element, None),
            "class-template-decl" => self.build_class_template_decl(element),
            _ => Err(parent.unexpected_child(element)),
        }
    }

    fn build_type_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = self.define_from(element)?;
        let decl = BasicType {
            name: element.required_attr("name")?.to_owned(),
            size_in_bits: element.parse_attr("size-in-bits")?.unwrap_or(0),
            alignment_in_bits: element.parse_attr("alignment-in-bits")?.unwrap_or(0),
            location: self.location(element)?,
        };
        self.arena.fill(id, decl);
        Ok(id)
    }

    fn build_namespace_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let mut decl = NamespaceDecl::new(element.required_attr("name")?);
        decl.location = self.location(element)?;
        for child in &element.children {
            decl.members.push(self.build_decl(element, child)?);
        }
        Ok(self.arena.alloc(decl))
    }

    fn build_qualified_type_def(&mut self, element: &XmlElement) -> Result<NodeId> {
        let underlying = self.type_ref(element)?;
        let mut cv = CvQualifiers::empty();
        cv.set(CvQualifiers::CONST, element.flag("const"));
        cv.set(CvQualifiers::VOLATILE, element.flag("volatile"));
        cv.set(CvQualifiers::RESTRICT, element.flag("restrict"));

        let decl = QualifiedType {
            underlying,
            cv,
            location: self.location(element)?,
        };
        let id = self.define_from(element)?;
        self.arena.fill(id, decl);
        Ok(id)
    }

    fn build_pointer_type_def(&mut self, element: &XmlElement) -> Result<NodeId> {
        let decl = PointerType {
            pointed_to: self.type_ref(element)?,
            size_in_bits: element.parse_attr("size-in-bits")?.unwrap_or(0),
            alignment_in_bits: element.parse_attr("alignment-in-bits")?.unwrap_or(0),
            location: self.location(element)?,
        };
        let id = self.define_from(element)?;
        self.arena.fill(id, decl);
        Ok(id)
    }

    fn build_reference_type_def(&mut self, element: &XmlElement) -> Result<NodeId> {
        let kind = match element.attr("kind") {
            None => ReferenceKind::LValue,
            Some(kind) => {
                ReferenceKind::from_attr(kind).ok_or_else(|| element.invalid("kind", kind))?
            }
        };
        let decl = ReferenceType {
            pointed_to: self.type_ref(element)?,
            kind,
            size_in_bits: element.parse_attr("size-in-bits")?.unwrap_or(0),
            alignment_in_bits: element.parse_attr("alignment-in-bits")?.unwrap_or(0),
            location: self.location(element)?,
        };
        let id = self.define_from(element)?;
        self.arena.fill(id, decl);
        Ok(id)
    }

    fn build_enum_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = self.define_from(element)?;
        let name = element.required_attr("name")?.to_owned();
        let location = self.location(element)?;

        let mut underlying = None;
        let mut enumerators = Vec::new();
        for child in &element.children {
            match child.name.as_str() {
                "underlying-type" if underlying.is_none() => {
                    underlying = Some(self.type_ref(child)?);
                }
                "enumerator" => enumerators.push(Enumerator {
                    name: child.required_attr("name")?.to_owned(),
                    value: child
                        .parse_attr("value")?
                        .ok_or_else(|| DeserializationError::MissingAttribute {
                            element: child.name.clone(),
                            attribute: "value",
                        })?,
                }),
                _ => return Err(element.unexpected_child(child)),
            }
        }

        let underlying = underlying.ok_or_else(|| DeserializationError::MissingChild {
            element: element.name.clone(),
            child: "underlying-type",
        })?;

        self.arena.fill(
            id,
            EnumDecl {
                name,
                location,
                underlying,
                enumerators,
            },
        );
        Ok(id)
    }

    fn build_typedef_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let decl = TypedefDecl {
            name: element.required_attr("name")?.to_owned(),
            underlying: self.type_ref(element)?,
            location: self.location(element)?,
        };
        let id = self.define_from(element)?;
        self.arena.fill(id, decl);
        Ok(id)
    }

    fn build_var_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let decl = VarDecl {
            name: element.required_attr("name")?.to_owned(),
            ty: self.type_ref(element)?,
            mangled_name: element.attr("mangled-name").map(str::to_owned),
            location: self.location(element)?,
            visibility: visibility(element)?,
            binding: binding(element)?,
        };
        Ok(self.arena.alloc(decl))
    }

    /// `method_of` is the enclosing class for member functions. Their implicit
    /// `this` parameter is not part of the document and is recreated here.
    fn build_function_decl(
        &mut self,
        element: &XmlElement,
        method_of: Option<NodeId>,
    ) -> Result<NodeId> {
        let mut decl = FunctionDecl {
            name: element.required_attr("name")?.to_owned(),
            mangled_name: element.attr("mangled-name").map(str::to_owned),
            location: self.location(element)?,
            declared_inline: element.flag("declared-inline"),
            visibility: visibility(element)?,
            binding: binding(element)?,
            size_in_bits: element.parse_attr("size-in-bits")?.unwrap_or(0),
            alignment_in_bits: element.parse_attr("alignment-in-bits")?.unwrap_or(0),
            ..Default::default()
        };

        if let Some(class) = method_of {
            let this = self.arena.alloc(PointerType::new(class, 0));
            decl.parameters.push(Parameter::new(this));
            decl.is_method = true;
        }

        for child in &element.children {
            match child.name.as_str() {
                "parameter" => {
                    let mut parameter = if child.flag("is-variadic") {
                        Parameter::variadic()
                    } else {
                        Parameter::new(self.type_ref(child)?)
                    };
                    parameter.name = child.attr("name").map(str::to_owned);
                    parameter.location = self.location(child)?;
                    decl.parameters.push(parameter);
                }
                "return" if decl.return_type.is_none() => {
                    decl.return_type = Some(self.type_ref(child)?);
                }
                _ => return Err(element.unexpected_child(child)),
            }
        }

        Ok(self.arena.alloc(decl))
    }

    fn build_class_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = self.define_from(element)?;
        let mut decl = ClassDecl {
            name: element.required_attr("name")?.to_owned(),
            size_in_bits: element.parse_attr("size-in-bits")?.unwrap_or(0),
            alignment_in_bits: element.parse_attr("alignment-in-bits")?.unwrap_or(0),
            location: self.location(element)?,
            visibility: visibility(element)?,
            is_struct: element.flag("is-struct"),
            declaration_only: element.flag("is-declaration-only"),
            earlier_declaration: element.attr("def-of-decl-id").map(|d| self.resolve(d)),
            ..Default::default()
        };

        for child in &element.children {
            match child.name.as_str() {
                "base-class" => decl.bases.push(BaseSpec {
                    access: access(child)?,
                    offset_in_bits: child.parse_attr("layout-offset-in-bits")?,
                    is_virtual: child.flag("is-virtual"),
                    base: self.type_ref(child)?,
                }),
                "member-type" => {
                    let inner = single_child(child)?;
                    decl.member_types.push(MemberType {
                        access: access(child)?,
                        decl: self.build_decl(child, inner)?,
                    });
                }
                "data-member" => {
                    let inner = single_child(child)?;
                    if inner.name != "var-decl" {
                        return Err(child.unexpected_child(inner));
                    }
                    decl.data_members.push(DataMember {
                        access: access(child)?,
                        is_static: child.flag("static"),
                        offset_in_bits: child.parse_attr("layout-offset-in-bits")?,
                        var: self.build_var_decl(inner)?,
                    });
                }
                "member-function" => {
                    let inner = single_child(child)?;
                    if inner.name != "function-decl" {
                        return Err(child.unexpected_child(inner));
                    }
                    decl.member_functions.push(MemberFunction {
                        access: access(child)?,
                        is_constructor: child.flag("constructor"),
                        is_destructor: child.flag("destructor"),
                        is_const: child.flag("const"),
                        is_static: child.flag("static"),
                        vtable_offset: child.parse_attr("vtable-offset")?,
                        function: self.build_function_decl(inner, Some(id))?,
                    });
                }
                "member-template" => {
                    let inner = single_child(child)?;
                    let template = MemberTemplate {
                        access: access(child)?,
                        is_constructor: child.flag("constructor"),
                        is_static: child.flag("static"),
                        template: match inner.name.as_str() {
                            "function-template-decl" => {
                                self.build_function_template_decl(inner, Some(id))?
                            }
                            "class-template-decl" => self.build_class_template_decl(inner)?,
                            _ => return Err(child.unexpected_child(inner)),
                        },
                    };
                    if inner.name == "function-template-decl" {
                        decl.member_function_templates.push(template);
                    } else {
                        decl.member_class_templates.push(template);
                    }
                }
                _ => return Err(element.unexpected_child(child)),
            }
        }

        self.arena.fill(id, decl);
        Ok(id)
    }

    fn build_function_template_decl(
        &mut self,
        element: &XmlElement,
        method_of: Option<NodeId>,
    ) -> Result<NodeId> {
        let id = self.define_from(element)?;
        let location = self.location(element)?;
        let (parameters, pattern) = self.split_template(element, "function-decl")?;
        let pattern = self.build_function_decl(pattern, method_of)?;

        let template = FunctionTemplate {
            location,
            visibility: visibility(element)?,
            binding: binding(element)?,
            parameters,
            pattern,
        };
        self.arena.fill(id, template);
        Ok(id)
    }

    fn build_class_template_decl(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = self.define_from(element)?;
        let location = self.location(element)?;
        let (parameters, pattern) = self.split_template(element, "class-decl")?;
        let pattern = self.build_class_decl(pattern)?;

        let template = ClassTemplate {
            location,
            visibility: visibility(element)?,
            parameters,
            pattern,
        };
        self.arena.fill(id, template);
        Ok(id)
    }

    /// Build the template parameters of `element` and return them together
    /// with the pattern element, which must be the last child.
    fn split_template<'e>(
        &mut self,
        element: &'e XmlElement,
        pattern: &'static str,
    ) -> Result<(Vec<NodeId>, &'e XmlElement)> {
        let (last, parameters) = element.children.split_last().ok_or_else(|| {
            DeserializationError::MissingChild {
                element: element.name.clone(),
                child: pattern,
            }
        })?;
        if last.name != pattern {
            return Err(DeserializationError::MissingChild {
                element: element.name.clone(),
                child: pattern,
            });
        }

        let parameters = self.build_template_parameters(element, parameters)?;
        Ok((parameters, last))
    }

    fn build_template_parameters(
        &mut self,
        parent: &XmlElement,
        elements: &[XmlElement],
    ) -> Result<Vec<NodeId>> {
        elements
            .iter()
            .map(|element| self.build_template_parameter(parent, element))
            .collect()
    }

    fn build_template_parameter(
        &mut self,
        parent: &XmlElement,
        element: &XmlElement,
    ) -> Result<NodeId> {
        match element.name.as_str() {
            "template-type-parameter" => {
                let Some(id) = self.parameter_identity(element)? else {
                    return self.existing(element);
                };
                let decl = TypeTemplateParameter {
                    name: element.attr("name").unwrap_or_default().to_owned(),
                    location: self.location(element)?,
                };
                self.arena.fill(id, decl);
                Ok(id)
            }
            "template-template-parameter" => {
                let Some(id) = self.parameter_identity(element)? else {
                    return self.existing(element);
                };
                let decl = TemplateTemplateParameter {
                    name: element.attr("name").unwrap_or_default().to_owned(),
                    location: self.location(element)?,
                    parameters: self.build_template_parameters(element, &element.children)?,
                };
                self.arena.fill(id, decl);
                Ok(id)
            }
            "template-non-type-parameter" => {
                let decl = NonTypeTemplateParameter {
                    name: element.attr("name").unwrap_or_default().to_owned(),
                    ty: self.type_ref(element)?,
                    location: self.location(element)?,
                };
                Ok(self.arena.alloc(decl))
            }
            "template-parameter-type-composition" => {
                let inner = single_child(element)?;
                let composed = match inner.name.as_str() {
                    "pointer-type-def" => self.build_pointer_type_def(inner)?,
                    "reference-type-def" => self.build_reference_type_def(inner)?,
                    "qualified-type-def" => self.build_qualified_type_def(inner)?,
                    _ => return Err(element.unexpected_child(inner)),
                };
                Ok(self.arena.alloc(TypeComposition { composed }))
            }
            _ => Err(parent.unexpected_child(element)),
        }
    }

    /// Decide whether a type or template template parameter defines its node
    /// here. Returns the slot to fill, or `None` for a plain re-reference.
    ///
    /// A `type-id` parameter whose node nothing defines yet was referenced
    /// before the template itself; this element is then its definition.
    fn parameter_identity(&mut self, element: &XmlElement) -> Result<Option<NodeId>> {
        if element.attr("id").is_some() {
            return self.define_from(element).map(Some);
        }

        let id = element.required_attr("type-id")?;
        let node = self.resolve(id);
        if self.claimed.contains(&node) {
            return Ok(None);
        }
        self.claimed.insert(node);
        Ok(Some(node))
    }

    fn existing(&mut self, element: &XmlElement) -> Result<NodeId> {
        let id = element.required_attr("type-id")?;
        let node = self.resolve(id);
        match self.arena.get(node) {
            Some(Node::TemplateTypeParameter(_)) | Some(Node::TemplateTemplateParameter(_)) | None => {
                Ok(node)
            }
            Some(other) => Err(DeserializationError::IdKindMismatch {
                id: id.to_owned(),
                expected: "template parameter",
                found: other.kind(),
            }),
        }
    }
}

fn single_child(element: &XmlElement) -> Result<&XmlElement> {
    match element.children.as_slice() {
        [child] => Ok(child),
        [] => Err(DeserializationError::MissingChild {
            element: element.name.clone(),
            child: "declaration",
        }),
        [_, extra, ..] => Err(element.unexpected_child(extra)),
    }
}

fn access(element: &XmlElement) -> Result<AccessSpecifier> {
    match element.attr("access") {
        None => Ok(AccessSpecifier::default()),
        Some(value) => {
            AccessSpecifier::from_attr(value).ok_or_else(|| element.invalid("access", value))
        }
    }
}

fn visibility(element: &XmlElement) -> Result<Visibility> {
    match element.attr("visibility") {
        None => Ok(Visibility::None),
        Some(value) => {
            Visibility::from_attr(value).ok_or_else(|| element.invalid("visibility", value))
        }
    }
}

fn binding(element: &XmlElement) -> Result<Binding> {
    match element.attr("binding") {
        None => Ok(Binding::None),
        Some(value) => Binding::from_attr(value).ok_or_else(|| element.invalid("binding", value)),
    }
}
