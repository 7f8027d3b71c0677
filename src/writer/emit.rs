//! Node emitters and the declaration dispatcher.
//!
//! `UnitEmitter` walks one translation unit depth first. Owned children are
//! written in full; everything else is written as a reference to an id from
//! the session's `IdRegistry`, so a shared node is emitted once and only
//! referenced afterwards.
//!
//! Layout rules:
//! - Every element starts on its own line at the current indent and ends with
//!   a newline.
//! - Leaf elements self-close. Elements with children write `>`, their
//!   children at `indent + step`, then the close tag at `indent`.
//! - Attribute order is fixed per element kind.

use crate::err::{SerializationError, SerializationResult as Result};
use crate::model::{
    BasicType, ClassDecl, ClassTemplate, EnumDecl, FunctionDecl, FunctionTemplate, Location,
    NamespaceDecl, Node, NodeId, NonTypeTemplateParameter, PointerType, QualifiedType, ReferenceType,
    TemplateTemplateParameter, TranslationUnit, TypeComposition, TypeTemplateParameter,
    TypedefDecl, VarDecl,
};
use crate::writer::attrs::*;
use crate::writer::ids::{IdNamespace, NodeKey};
use crate::writer::WriteContext;
use log::trace;
use std::io::Write;

pub(crate) struct UnitEmitter<'a, 'c, W: Write> {
    ctx: &'a mut WriteContext<'c, W>,
    unit: &'a TranslationUnit,
    unit_key: u32,
    step: usize,
}

impl<'a, 'c, W: Write> UnitEmitter<'a, 'c, W> {
    pub(crate) fn new(ctx: &'a mut WriteContext<'c, W>, unit: &'a TranslationUnit, unit_key: u32) -> Self {
        let step = ctx.config().get_xml_element_indent();
        UnitEmitter {
            ctx,
            unit,
            unit_key,
            step,
        }
    }

    fn node(&self, id: NodeId) -> Result<&'a Node> {
        let unit: &'a TranslationUnit = self.unit;
        Ok(try_get_node!(unit.arena(), id))
    }

    fn key(&self, id: NodeId) -> NodeKey {
        NodeKey::new(self.unit_key, id)
    }

    /// Write ` key='<id of node>'`, allocating the id if needed.
    fn write_id_attr(&mut self, key: &str, node: NodeId, namespace: IdNamespace) -> Result<()> {
        let node_key = self.key(node);
        let ctx = &mut *self.ctx;
        let id = ctx.ids.id_for(node_key, namespace);
        write!(ctx.out, " {}='{}'", key, id)?;
        Ok(())
    }

    fn write_type_ref(&mut self, node: NodeId) -> Result<()> {
        self.write_id_attr("type-id", node, IdNamespace::Type)
    }

    fn write_type_id(&mut self, node: NodeId) -> Result<()> {
        self.write_id_attr("id", node, IdNamespace::Type)
    }

    fn open(&mut self, indent: usize, tag: &str) -> Result<()> {
        write_indent(&mut self.ctx.out, indent)?;
        write!(self.ctx.out, "<{}", tag)?;
        Ok(())
    }

    fn self_close(&mut self) -> Result<()> {
        self.ctx.out.write_all(b"/>\n")?;
        Ok(())
    }

    fn end_open(&mut self) -> Result<()> {
        self.ctx.out.write_all(b">\n")?;
        Ok(())
    }

    fn close(&mut self, indent: usize, tag: &str) -> Result<()> {
        write_indent(&mut self.ctx.out, indent)?;
        writeln!(self.ctx.out, "</{}>", tag)?;
        Ok(())
    }

    fn location(&mut self, location: Location) -> Result<()> {
        write_location(&mut self.ctx.out, self.unit.locations(), location)?;
        Ok(())
    }

    /// Write a declaration, choosing the emitter from the node kind.
    ///
    /// Template parameters and type compositions only exist inside templates;
    /// meeting one here means the graph is malformed.
    pub(crate) fn write_decl(&mut self, id: NodeId, indent: usize) -> Result<()> {
        let node = self.node(id)?;
        match node {
            Node::BasicType(d) => self.write_type_decl(id, d, indent),
            Node::Namespace(d) => self.write_namespace_decl(d, indent),
            Node::Qualified(d) => self.write_qualified_type_def(id, d, indent),
            Node::Pointer(d) => self.write_pointer_type_def(id, d, indent),
            Node::Reference(d) => self.write_reference_type_def(id, d, indent),
            Node::Enum(d) => self.write_enum_type_decl(id, d, indent),
            Node::Typedef(d) => self.write_typedef_decl(id, d, indent),
            Node::Variable(d) => self.write_var_decl(d, indent),
            Node::Function(d) => self.write_function_decl(d, d.is_method, indent),
            Node::Class(d) => self.write_class_decl(id, d, indent),
            Node::FunctionTemplate(d) => self.write_function_template_decl(id, d, indent),
            Node::ClassTemplate(d) => self.write_class_template_decl(id, d, indent),
            Node::TemplateTypeParameter(_)
            | Node::TemplateNonTypeParameter(_)
            | Node::TemplateTemplateParameter(_)
            | Node::TypeComposition(_) => Err(SerializationError::UnrecognizedNode {
                node: id,
                kind: node.kind(),
            }),
        }
    }

    fn write_type_decl(
        &mut self,
        id: NodeId,
        d: &BasicType,
        indent: usize,
    ) -> Result<()> {
        trace!("write_type_decl: {}", d.name);
        self.open(indent, "type-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        write_size_and_alignment(&mut self.ctx.out, d.size_in_bits, d.alignment_in_bits)?;
        self.location(d.location)?;
        self.write_type_id(id)?;
        self.self_close()
    }

    fn write_namespace_decl(&mut self, d: &NamespaceDecl, indent: usize) -> Result<()> {
        trace!("write_namespace_decl: {}", d.name);
        self.open(indent, "namespace-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        self.location(d.location)?;

        if d.members.is_empty() {
            return self.self_close();
        }

        self.end_open()?;
        for &member in &d.members {
            self.write_decl(member, indent + self.step)?;
        }
        self.close(indent, "namespace-decl")
    }

    fn write_qualified_type_def(&mut self, id: NodeId, d: &QualifiedType, indent: usize) -> Result<()> {
        trace!("write_qualified_type_def: {:?}", id);
        self.open(indent, "qualified-type-def")?;
        self.write_type_ref(d.underlying)?;
        write_cv_qualifiers(&mut self.ctx.out, d.cv)?;
        self.location(d.location)?;
        self.write_type_id(id)?;
        self.self_close()
    }

    fn write_pointer_type_def(&mut self, id: NodeId, d: &PointerType, indent: usize) -> Result<()> {
        trace!("write_pointer_type_def: {:?}", id);
        self.open(indent, "pointer-type-def")?;
        self.write_type_ref(d.pointed_to)?;
        write_size_and_alignment(&mut self.ctx.out, d.size_in_bits, d.alignment_in_bits)?;
        self.location(d.location)?;
        self.write_type_id(id)?;
        self.self_close()
    }

    fn write_reference_type_def(&mut self, id: NodeId, d: &ReferenceType, indent: usize) -> Result<()> {
        trace!("write_reference_type_def: {:?}", id);
        self.open(indent, "reference-type-def")?;
        write_attr(&mut self.ctx.out, "kind", d.kind.as_attr())?;
        self.write_type_ref(d.pointed_to)?;
        write_size_and_alignment(&mut self.ctx.out, d.size_in_bits, d.alignment_in_bits)?;
        self.location(d.location)?;
        self.write_type_id(id)?;
        self.self_close()
    }

    fn write_enum_type_decl(&mut self, id: NodeId, d: &EnumDecl, indent: usize) -> Result<()> {
        trace!("write_enum_type_decl: {}", d.name);
        self.open(indent, "enum-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        self.location(d.location)?;
        self.write_type_id(id)?;
        self.end_open()?;

        let nested = indent + self.step;
        self.open(nested, "underlying-type")?;
        self.write_type_ref(d.underlying)?;
        self.self_close()?;

        for enumerator in &d.enumerators {
            self.open(nested, "enumerator")?;
            write_attr(&mut self.ctx.out, "name", &enumerator.name)?;
            write!(self.ctx.out, " value='{}'", enumerator.value)?;
            self.self_close()?;
        }

        self.close(indent, "enum-decl")
    }

    fn write_typedef_decl(&mut self, id: NodeId, d: &TypedefDecl, indent: usize) -> Result<()> {
        trace!("write_typedef_decl: {}", d.name);
        self.open(indent, "typedef-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        self.write_type_ref(d.underlying)?;
        self.location(d.location)?;
        self.write_type_id(id)?;
        self.self_close()
    }

    fn write_var_decl(&mut self, d: &VarDecl, indent: usize) -> Result<()> {
        trace!("write_var_decl: {}", d.name);
        self.open(indent, "var-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        self.write_type_ref(d.ty)?;
        write_optional_attr(&mut self.ctx.out, "mangled-name", d.mangled_name.as_deref())?;
        self.location(d.location)?;
        write_visibility(&mut self.ctx.out, d.visibility)?;
        write_binding(&mut self.ctx.out, d.binding)?;
        self.self_close()
    }

    /// `skip_first_parameter` drops the implicit `this` parameter of methods.
    fn write_function_decl(
        &mut self,
        d: &FunctionDecl,
        skip_first_parameter: bool,
        indent: usize,
    ) -> Result<()> {
        trace!("write_function_decl: {}", d.name);
        self.open(indent, "function-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        write_optional_attr(&mut self.ctx.out, "mangled-name", d.mangled_name.as_deref())?;
        self.location(d.location)?;
        write_flag(&mut self.ctx.out, "declared-inline", d.declared_inline)?;
        write_visibility(&mut self.ctx.out, d.visibility)?;
        write_binding(&mut self.ctx.out, d.binding)?;
        write_size_and_alignment(&mut self.ctx.out, d.size_in_bits, d.alignment_in_bits)?;

        let skip = usize::from(skip_first_parameter);
        let parameters = d.parameters.get(skip..).unwrap_or_default();
        if parameters.is_empty() && d.return_type.is_none() {
            return self.self_close();
        }

        self.end_open()?;
        let nested = indent + self.step;
        for parameter in parameters {
            self.open(nested, "parameter")?;
            match parameter.ty {
                Some(ty) if !parameter.variadic => self.write_type_ref(ty)?,
                _ => write_flag(&mut self.ctx.out, "is-variadic", true)?,
            }
            write_optional_attr(&mut self.ctx.out, "name", parameter.name.as_deref())?;
            self.location(parameter.location)?;
            self.self_close()?;
        }

        if let Some(return_type) = d.return_type {
            self.open(nested, "return")?;
            self.write_type_ref(return_type)?;
            self.self_close()?;
        }

        self.close(indent, "function-decl")
    }

    fn write_class_decl(&mut self, id: NodeId, d: &ClassDecl, indent: usize) -> Result<()> {
        trace!("write_class_decl: {}", d.name);
        self.open(indent, "class-decl")?;
        write_attr(&mut self.ctx.out, "name", &d.name)?;
        write_size_and_alignment(&mut self.ctx.out, d.size_in_bits, d.alignment_in_bits)?;
        self.location(d.location)?;
        write_visibility(&mut self.ctx.out, d.visibility)?;
        write_flag(&mut self.ctx.out, "is-struct", d.is_struct)?;
        write_flag(&mut self.ctx.out, "is-declaration-only", d.declaration_only)?;
        if let Some(declaration) = d.earlier_declaration {
            self.write_id_attr("def-of-decl-id", declaration, IdNamespace::Type)?;
        }
        self.write_type_id(id)?;

        if d.declaration_only || (d.bases.is_empty() && !d.has_members()) {
            return self.self_close();
        }

        self.end_open()?;
        let nested = indent + self.step;
        let member = nested + self.step;

        for base in &d.bases {
            self.open(nested, "base-class")?;
            write_access(&mut self.ctx.out, base.access)?;
            write_layout_offset(&mut self.ctx.out, base.offset_in_bits)?;
            write_flag(&mut self.ctx.out, "is-virtual", base.is_virtual)?;
            self.write_type_ref(base.base)?;
            self.self_close()?;
        }

        for member_type in &d.member_types {
            self.open(nested, "member-type")?;
            write_access(&mut self.ctx.out, member_type.access)?;
            self.end_open()?;
            self.write_decl(member_type.decl, member)?;
            self.close(nested, "member-type")?;
        }

        for data_member in &d.data_members {
            let var = match self.node(data_member.var)? {
                Node::Variable(var) => var,
                other => return Err(self.unexpected(data_member.var, "variable", other)),
            };
            self.open(nested, "data-member")?;
            write_access(&mut self.ctx.out, data_member.access)?;
            write_flag(&mut self.ctx.out, "static", data_member.is_static)?;
            write_layout_offset(&mut self.ctx.out, data_member.offset_in_bits)?;
            self.end_open()?;
            self.write_var_decl(var, member)?;
            self.close(nested, "data-member")?;
        }

        for member_function in &d.member_functions {
            let function = match self.node(member_function.function)? {
                Node::Function(function) => function,
                other => return Err(self.unexpected(member_function.function, "function", other)),
            };
            self.open(nested, "member-function")?;
            write_access(&mut self.ctx.out, member_function.access)?;
            write_flag(&mut self.ctx.out, "constructor", member_function.is_constructor)?;
            write_flag(&mut self.ctx.out, "destructor", member_function.is_destructor)?;
            write_flag(&mut self.ctx.out, "const", member_function.is_const)?;
            write_flag(&mut self.ctx.out, "static", member_function.is_static)?;
            if let Some(offset) = member_function.vtable_offset {
                write!(self.ctx.out, " vtable-offset='{}'", offset)?;
            }
            self.end_open()?;
            self.write_function_decl(function, true, member)?;
            self.close(nested, "member-function")?;
        }

        for template in &d.member_function_templates {
            let decl = match self.node(template.template)? {
                Node::FunctionTemplate(decl) => decl,
                other => return Err(self.unexpected(template.template, "function template", other)),
            };
            self.open(nested, "member-template")?;
            write_access(&mut self.ctx.out, template.access)?;
            write_flag(&mut self.ctx.out, "constructor", template.is_constructor)?;
            write_flag(&mut self.ctx.out, "static", template.is_static)?;
            self.end_open()?;
            self.write_function_template_decl(template.template, decl, member)?;
            self.close(nested, "member-template")?;
        }

        for template in &d.member_class_templates {
            let decl = match self.node(template.template)? {
                Node::ClassTemplate(decl) => decl,
                other => return Err(self.unexpected(template.template, "class template", other)),
            };
            self.open(nested, "member-template")?;
            write_access(&mut self.ctx.out, template.access)?;
            write_flag(&mut self.ctx.out, "constructor", template.is_constructor)?;
            write_flag(&mut self.ctx.out, "static", template.is_static)?;
            self.end_open()?;
            self.write_class_template_decl(template.template, decl, member)?;
            self.close(nested, "member-template")?;
        }

        self.close(indent, "class-decl")
    }

    fn write_function_template_decl(
        &mut self,
        id: NodeId,
        d: &FunctionTemplate,
        indent: usize,
    ) -> Result<()> {
        trace!("write_function_template_decl: {:?}", id);
        let pattern = match self.node(d.pattern)? {
            Node::Function(pattern) => pattern,
            other => return Err(self.unexpected(d.pattern, "function", other)),
        };

        self.open(indent, "function-template-decl")?;
        self.write_id_attr("id", id, IdNamespace::FunctionTemplate)?;
        self.location(d.location)?;
        write_visibility(&mut self.ctx.out, d.visibility)?;
        write_binding(&mut self.ctx.out, d.binding)?;
        self.end_open()?;

        let nested = indent + self.step;
        self.write_template_parameters(&d.parameters, nested)?;
        self.write_function_decl(pattern, pattern.is_method, nested)?;
        self.close(indent, "function-template-decl")
    }

    fn write_class_template_decl(
        &mut self,
        id: NodeId,
        d: &ClassTemplate,
        indent: usize,
    ) -> Result<()> {
        trace!("write_class_template_decl: {:?}", id);
        let pattern = match self.node(d.pattern)? {
            Node::Class(pattern) => pattern,
            other => return Err(self.unexpected(d.pattern, "class", other)),
        };

        self.open(indent, "class-template-decl")?;
        self.write_id_attr("id", id, IdNamespace::ClassTemplate)?;
        self.location(d.location)?;
        write_visibility(&mut self.ctx.out, d.visibility)?;
        self.end_open()?;

        let nested = indent + self.step;
        self.write_template_parameters(&d.parameters, nested)?;
        self.write_class_decl(d.pattern, pattern, nested)?;
        self.close(indent, "class-template-decl")
    }

    fn write_template_parameters(&mut self, parameters: &[NodeId], indent: usize) -> Result<()> {
        for &parameter in parameters {
            self.write_template_parameter(parameter, indent)?;
        }
        Ok(())
    }

    fn write_template_parameter(&mut self, id: NodeId, indent: usize) -> Result<()> {
        match self.node(id)? {
            Node::TemplateTypeParameter(d) => self.write_template_type_parameter(id, d, indent),
            Node::TemplateNonTypeParameter(d) => self.write_template_non_type_parameter(d, indent),
            Node::TemplateTemplateParameter(d) => {
                self.write_template_template_parameter(id, d, indent)
            }
            Node::TypeComposition(d) => self.write_type_composition(d, indent),
            other => Err(self.unexpected(id, "template parameter", other)),
        }
    }

    /// Parameters that already have an id were referenced earlier in the
    /// walk; they are written as a `type-id` reference instead of a
    /// definition.
    fn write_parameter_identity(&mut self, id: NodeId) -> Result<()> {
        if self.ctx.ids.has_id(self.key(id)) {
            self.write_type_ref(id)
        } else {
            self.write_type_id(id)
        }
    }

    fn write_template_type_parameter(
        &mut self,
        id: NodeId,
        d: &TypeTemplateParameter,
        indent: usize,
    ) -> Result<()> {
        trace!("write_template_type_parameter: {}", d.name);
        self.open(indent, "template-type-parameter")?;
        self.write_parameter_identity(id)?;
        if !d.name.is_empty() {
            write_attr(&mut self.ctx.out, "name", &d.name)?;
        }
        self.location(d.location)?;
        self.self_close()
    }

    fn write_template_non_type_parameter(
        &mut self,
        d: &NonTypeTemplateParameter,
        indent: usize,
    ) -> Result<()> {
        trace!("write_template_non_type_parameter: {}", d.name);
        self.open(indent, "template-non-type-parameter")?;
        self.write_type_ref(d.ty)?;
        if !d.name.is_empty() {
            write_attr(&mut self.ctx.out, "name", &d.name)?;
        }
        self.location(d.location)?;
        self.self_close()
    }

    fn write_template_template_parameter(
        &mut self,
        id: NodeId,
        d: &TemplateTemplateParameter,
        indent: usize,
    ) -> Result<()> {
        trace!("write_template_template_parameter: {}", d.name);
        self.open(indent, "template-template-parameter")?;
        self.write_parameter_identity(id)?;
        if !d.name.is_empty() {
            write_attr(&mut self.ctx.out, "name", &d.name)?;
        }
        self.location(d.location)?;

        if d.parameters.is_empty() {
            return self.self_close();
        }

        self.end_open()?;
        self.write_template_parameters(&d.parameters, indent + self.step)?;
        self.close(indent, "template-template-parameter")
    }

    fn write_type_composition(&mut self, d: &TypeComposition, indent: usize) -> Result<()> {
        trace!("write_type_composition: {:?}", d.composed);
        self.open(indent, "template-parameter-type-composition")?;
        self.end_open()?;

        let nested = indent + self.step;
        match self.node(d.composed)? {
            Node::Pointer(p) => self.write_pointer_type_def(d.composed, p, nested)?,
            Node::Reference(r) => self.write_reference_type_def(d.composed, r, nested)?,
            Node::Qualified(q) => self.write_qualified_type_def(d.composed, q, nested)?,
            other => {
                return Err(self.unexpected(
                    d.composed,
                    "pointer, reference or qualified type",
                    other,
                ));
            }
        }

        self.close(indent, "template-parameter-type-composition")
    }

    fn unexpected(&self, node: NodeId, expected: &'static str, found: &Node) -> SerializationError {
        SerializationError::UnexpectedKind {
            node,
            expected,
            found: found.kind(),
        }
    }
}
