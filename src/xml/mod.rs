// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The declarative XML type-definition loader (spec §4.4).
//!
//! Grounded on `hdds`'s `dds::qos::loaders::fastdds::FastDdsLoader`: parse
//! with `roxmltree`, walk `descendants()`/`children()` by tag name, convert
//! attribute text with small `and_then`/`map` chains, reject the whole
//! document on the first structural error rather than partially applying it
//! (spec §4.4's "Recovery" policy mirrors the teacher's "malformed XML
//! rejects the whole profile" behavior, just applied to type declarations
//! instead of QoS policies).

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::type_model::{Extensibility, Kind, TypeBuilder, TypeDescriptor};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Parse `path` and register every declared type into `registry`.
/// Returns the types in document order.
pub fn load_file<P: AsRef<Path>>(path: P, registry: &Registry) -> Result<Vec<Arc<TypeDescriptor>>> {
    let xml = fs::read_to_string(path).map_err(|e| Error::BadParameter(format!("failed to read XML file: {}", e)))?;
    load_str(&xml, registry)
}

/// Parse `xml` and register every declared type into `registry`. All
/// declarations are built against a per-document scratch scope before any
/// of them touch `registry`, so a failure partway through leaves `registry`
/// untouched (spec §4.4: "the document is rejected as a whole").
pub fn load_str(xml: &str, registry: &Registry) -> Result<Vec<Arc<TypeDescriptor>>> {
    let doc = Document::parse(xml).map_err(|e| Error::BadParameter(format!("malformed XML: {}", e)))?;
    let root = doc.root_element();

    let mut scope = Scope { scratch: HashMap::new(), registry };
    let mut ordered_names = Vec::new();

    for type_node in root.children().filter(|n| n.is_element() && n.tag_name().name() == "type") {
        for decl in type_node.children().filter(|n| n.is_element()) {
            let built = build_declaration(&decl, &scope)?;
            let name = built.get_name().to_string();
            if scope.scratch.contains_key(&name) || registry.contains(&name) {
                return Err(Error::BadParameter(format!("type '{}' is already defined", name)));
            }
            scope.scratch.insert(name.clone(), built);
            ordered_names.push(name);
        }
    }

    let mut out = Vec::with_capacity(ordered_names.len());
    for name in ordered_names {
        let t = scope.scratch.get(&name).unwrap().clone();
        registry.register_as(name, t.clone())?;
        out.push(t);
    }
    Ok(out)
}

/// Per-document resolution scope: earlier declarations in the same document
/// resolve before falling back to the shared registry (supplemental
/// behavior recovered from `XMLDynamicParser.cpp`'s `nonBasicTypeName`
/// lookup order — see SPEC_FULL.md item 4).
struct Scope<'a> {
    scratch: HashMap<String, Arc<TypeDescriptor>>,
    registry: &'a Registry,
}

impl Scope<'_> {
    fn resolve_named(&self, name: &str) -> Result<Arc<TypeDescriptor>> {
        if let Some(t) = self.scratch.get(name) {
            return Ok(t.clone());
        }
        self.registry.lookup(name).ok_or_else(|| Error::BadParameter(format!("unknown non-basic type '{}'", name)))
    }
}

fn build_declaration(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    match node.tag_name().name() {
        "struct" => build_struct(node, scope),
        "union" => build_union(node, scope),
        "enum" => build_enum(node, scope),
        "typedef" => build_typedef(node, scope),
        "bitset" => build_bitset(node, scope),
        "bitmask" => build_bitmask(node, scope),
        other => Err(Error::BadParameter(format!("unrecognized type declaration element '<{}>'", other))),
    }
}

fn attr<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

fn required_attr<'a>(node: &'a Node, name: &str) -> Result<&'a str> {
    attr(node, name).ok_or_else(|| {
        Error::BadParameter(format!("<{}> is missing required attribute '{}'", node.tag_name().name(), name))
    })
}

fn required_name(node: &Node) -> Result<String> {
    Ok(required_attr(node, "name")?.to_string())
}

fn parse_u32_attr(node: &Node, name: &str) -> Result<Option<u32>> {
    match attr(node, name) {
        Some(v) => v.trim().parse::<u32>().map(Some).map_err(|_| {
            Error::BadParameter(format!("<{}> attribute '{}' is not an unsigned integer: '{}'", node.tag_name().name(), name, v))
        }),
        None => Ok(None),
    }
}

fn parse_extensibility(node: &Node) -> Extensibility {
    match attr(node, "extensibility") {
        Some("APPENDABLE") => Extensibility::Appendable,
        Some("MUTABLE") => Extensibility::Mutable,
        _ => Extensibility::Final,
    }
}

/// Resolve the `type`/`nonBasicTypeName`/`arrayDimensions`/`sequenceMaxLength`/
/// `mapMaxLength` attribute family on any typed element (spec §4.4's
/// grammar applies uniformly to `member`, `typedef`, union `case` members,
/// and map `key_type`).
fn resolve_typed(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let base = resolve_base_type(node, scope)?;
    let with_collection = if let Some(map_bound) = parse_u32_attr(node, "mapMaxLength")? {
        let key_type_name = required_attr(node, "key_type")?;
        let key_type = primitive_or_named(key_type_name, scope)?;
        TypeBuilder::new_map(anon_name("map"), key_type, base, map_bound).build()?
    } else if let Some(seq_bound) = parse_u32_attr(node, "sequenceMaxLength")? {
        TypeBuilder::new_sequence(anon_name("sequence"), base, seq_bound).build()?
    } else {
        base
    };
    if let Some(dims_text) = attr(node, "arrayDimensions") {
        let dims = parse_dims(node, dims_text)?;
        TypeBuilder::new_array(anon_name("array"), with_collection, dims).build()
    } else {
        Ok(with_collection)
    }
}

fn parse_dims(node: &Node, text: &str) -> Result<Vec<u32>> {
    text.split(',')
        .map(|d| {
            d.trim().parse::<u32>().map_err(|_| {
                Error::BadParameter(format!("<{}> arrayDimensions entry '{}' is not a positive integer", node.tag_name().name(), d))
            })
        })
        .collect()
}

fn anon_name(kind: &str) -> String {
    format!("<anonymous {}>", kind)
}

fn resolve_base_type(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let type_name = required_attr(node, "type")?;
    if type_name == "nonBasic" {
        let referenced = required_attr(node, "nonBasicTypeName")?;
        return scope.resolve_named(referenced);
    }
    primitive_or_named(type_name, scope)
}

fn primitive_or_named(type_name: &str, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    if let Some(kind) = primitive_kind(type_name) {
        return Ok(TypeDescriptor::primitive(kind));
    }
    match type_name {
        "string" => Ok(TypeDescriptor::string(false, 0)),
        "wstring" => Ok(TypeDescriptor::string(true, 0)),
        other => scope.resolve_named(other),
    }
}

fn primitive_kind(name: &str) -> Option<Kind> {
    Some(match name {
        "boolean" => Kind::Bool,
        "char8" => Kind::Char8,
        "char16" => Kind::Char16,
        "byte" | "octet" => Kind::Byte,
        "int8" => Kind::Int8,
        "uint8" => Kind::Uint8,
        "int16" => Kind::Int16,
        "uint16" => Kind::Uint16,
        "int32" => Kind::Int32,
        "uint32" => Kind::Uint32,
        "int64" => Kind::Int64,
        "uint64" => Kind::Uint64,
        "float32" => Kind::Float32,
        "float64" => Kind::Float64,
        "float128" => Kind::Float128,
        _ => return None,
    })
}

/// A `<member>`'s type, honoring `stringMaxLength` in addition to the
/// generic typed-attribute family.
fn resolve_member_type(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let type_name = required_attr(node, "type")?;
    if matches!(type_name, "string" | "wstring") {
        let bound = parse_u32_attr(node, "stringMaxLength")?.unwrap_or(0);
        let wide = type_name == "wstring";
        let base = TypeDescriptor::string(wide, bound);
        return wrap_collections(node, scope, base);
    }
    resolve_typed(node, scope)
}

fn wrap_collections(node: &Node, scope: &Scope, base: Arc<TypeDescriptor>) -> Result<Arc<TypeDescriptor>> {
    let with_collection = if let Some(map_bound) = parse_u32_attr(node, "mapMaxLength")? {
        let key_type_name = required_attr(node, "key_type")?;
        let key_type = primitive_or_named(key_type_name, scope)?;
        TypeBuilder::new_map(anon_name("map"), key_type, base, map_bound).build()?
    } else if let Some(seq_bound) = parse_u32_attr(node, "sequenceMaxLength")? {
        TypeBuilder::new_sequence(anon_name("sequence"), base, seq_bound).build()?
    } else {
        base
    };
    if let Some(dims_text) = attr(node, "arrayDimensions") {
        let dims = parse_dims(node, dims_text)?;
        TypeBuilder::new_array(anon_name("array"), with_collection, dims).build()
    } else {
        Ok(with_collection)
    }
}

fn bool_attr(node: &Node, name: &str) -> bool {
    attr(node, name).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn apply_member(mut builder: TypeBuilder, node: &Node, scope: &Scope) -> Result<TypeBuilder> {
    let name = required_name(node)?;
    let type_ = resolve_member_type(node, scope)?;
    if bool_attr(node, "key") {
        builder = builder.key_field(name, type_);
    } else if bool_attr(node, "non_serialized") {
        builder = builder.field_non_serialized(name, type_);
    } else {
        builder = builder.field(name, type_);
    }
    Ok(builder)
}

fn build_struct(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let name = required_name(node)?;
    let mut builder = TypeBuilder::new_struct(name).extensibility(parse_extensibility(node));
    if let Some(base_name) = attr(node, "baseType") {
        builder = builder.base(scope.resolve_named(base_name)?);
    }
    for member in node.children().filter(|n| n.is_element() && n.tag_name().name() == "member") {
        builder = apply_member(builder, &member, scope)?;
    }
    builder.build()
}

fn build_union(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let name = required_name(node)?;
    let disc_node = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "discriminator")
        .ok_or_else(|| Error::BadParameter(format!("<union name=\"{}\"> is missing a <discriminator>", name)))?;
    let disc_type = resolve_base_type(&disc_node, scope)?;
    let mut builder = TypeBuilder::new_union(name, disc_type).extensibility(parse_extensibility(node));

    for case_node in node.children().filter(|n| n.is_element() && n.tag_name().name() == "case") {
        let member_node = case_node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "member")
            .ok_or_else(|| Error::BadParameter("<case> is missing its <member>".into()))?;
        let member_name = required_name(&member_node)?;
        let member_type = resolve_member_type(&member_node, scope)?;

        let mut labels = Vec::new();
        let mut is_default = false;
        for disc in case_node.children().filter(|n| n.is_element() && n.tag_name().name() == "caseDiscriminator") {
            let value = required_attr(&disc, "value")?;
            if value.eq_ignore_ascii_case("default") {
                is_default = true;
            } else {
                let v = value.trim().parse::<i64>().map_err(|_| {
                    Error::BadParameter(format!("caseDiscriminator value '{}' is not an integer or 'default'", value))
                })?;
                labels.push(v);
            }
        }
        builder = if is_default { builder.default_case(member_name, member_type) } else { builder.case(member_name, labels, member_type) };
    }
    builder.build()
}

fn build_enum(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let _ = scope;
    let name = required_name(node)?;
    let underlying = TypeDescriptor::primitive(Kind::Int32);
    let mut builder = TypeBuilder::new_enum(name, underlying);
    let mut next_value = 0i64;
    for lit in node.children().filter(|n| n.is_element() && n.tag_name().name() == "enumerator") {
        let lit_name = required_name(&lit)?;
        let value = match attr(&lit, "value") {
            Some(v) => v.trim().parse::<i64>().map_err(|_| Error::BadParameter(format!("enumerator '{}' has a non-integer value '{}'", lit_name, v)))?,
            None => next_value,
        };
        next_value = value + 1;
        builder = builder.variant(lit_name, value);
    }
    builder.build()
}

fn build_typedef(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let name = required_name(node)?;
    let aliased = resolve_member_type(node, scope)?;
    TypeBuilder::new_alias(name, aliased).build()
}

fn build_bitset(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let name = required_name(node)?;
    let mut builder = TypeBuilder::new_bitset(name);
    if let Some(base_name) = attr(node, "baseType") {
        builder = builder.base(scope.resolve_named(base_name)?);
    }
    for field in node.children().filter(|n| n.is_element() && n.tag_name().name() == "bitfield") {
        let width = parse_u32_attr(&field, "bit_bound")?.ok_or_else(|| Error::BadParameter("<bitfield> is missing 'bit_bound'".into()))?;
        let field_name = attr(&field, "name");
        builder = builder.bitfield(field_name, width);
    }
    builder.build()
}

fn build_bitmask(node: &Node, scope: &Scope) -> Result<Arc<TypeDescriptor>> {
    let _ = scope;
    let name = required_name(node)?;
    let bit_bound = parse_u32_attr(node, "bit_bound")?.unwrap_or(32);
    let mut builder = TypeBuilder::new_bitmask(name, bit_bound);
    let mut next_position = 0u32;
    for bit in node.children().filter(|n| n.is_element() && n.tag_name().name() == "bit_value") {
        let bit_name = required_name(&bit)?;
        let position = match parse_u32_attr(&bit, "position")? {
            Some(p) => p,
            None => next_position,
        };
        next_position = position + 1;
        builder = builder.flag(bit_name, position);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_struct_with_members() {
        let xml = r#"<types>
          <type>
            <struct name="Point">
              <member name="x" type="int32"/>
              <member name="y" type="int32"/>
            </struct>
          </type>
        </types>"#;
        let registry = Registry::new();
        let types = load_str(xml, &registry).unwrap();
        assert_eq!(types.len(), 1);
        let point = registry.lookup("Point").unwrap();
        assert_eq!(point.members.len(), 2);
        assert_eq!(point.get_member_by_name("x").unwrap().type_.get_kind(), Kind::Int32);
    }

    #[test]
    fn test_nonbasic_type_resolves_against_same_document_first() {
        let xml = r#"<types>
          <type>
            <struct name="Point">
              <member name="x" type="int32"/>
            </struct>
          </type>
          <type>
            <struct name="Line">
              <member name="a" type="nonBasic" nonBasicTypeName="Point"/>
              <member name="b" type="nonBasic" nonBasicTypeName="Point"/>
            </struct>
          </type>
        </types>"#;
        let registry = Registry::new();
        let types = load_str(xml, &registry).unwrap();
        assert_eq!(types.len(), 2);
        let line = registry.lookup("Line").unwrap();
        assert_eq!(line.get_member_by_name("a").unwrap().type_.get_name(), "Point");
    }

    #[test]
    fn test_duplicate_name_rejected_and_document_rolled_back() {
        let xml = r#"<types>
          <type><struct name="A"><member name="x" type="int32"/></struct></type>
          <type><struct name="A"><member name="y" type="int32"/></struct></type>
        </types>"#;
        let registry = Registry::new();
        let err = load_str(xml, &registry).unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)));
        assert!(!registry.contains("A"));
    }

    #[test]
    fn test_union_with_default_case() {
        let xml = r#"<types>
          <type>
            <union name="U">
              <discriminator type="int32"/>
              <case><caseDiscriminator value="1"/><member name="a" type="int32"/></case>
              <case><caseDiscriminator value="default"/><member name="c" type="boolean"/></case>
            </union>
          </type>
        </types>"#;
        let registry = Registry::new();
        load_str(xml, &registry).unwrap();
        let u = registry.lookup("U").unwrap();
        assert_eq!(u.case_by_discriminator(1).unwrap().name, "a");
        assert_eq!(u.case_by_discriminator(999).unwrap().name, "c");
    }

    #[test]
    fn test_enum_with_explicit_and_implicit_values() {
        let xml = r#"<types>
          <type>
            <enum name="Color">
              <enumerator name="RED" value="5"/>
              <enumerator name="GREEN"/>
              <enumerator name="BLUE"/>
            </enum>
          </type>
        </types>"#;
        let registry = Registry::new();
        load_str(xml, &registry).unwrap();
        let color = registry.lookup("Color").unwrap();
        assert_eq!(color.enum_literal_by_value(5).unwrap().name, "RED");
        assert_eq!(color.enum_literal_by_value(6).unwrap().name, "GREEN");
        assert_eq!(color.enum_literal_by_value(7).unwrap().name, "BLUE");
    }

    #[test]
    fn test_bitmask_with_positions() {
        let xml = r#"<types>
          <type>
            <bitmask name="Flags" bit_bound="8">
              <bit_value name="A"/>
              <bit_value name="B" position="4"/>
            </bitmask>
          </type>
        </types>"#;
        let registry = Registry::new();
        load_str(xml, &registry).unwrap();
        let flags = registry.lookup("Flags").unwrap();
        assert_eq!(flags.bitmask_storage_bytes(), 1);
    }

    #[test]
    fn test_array_and_sequence_members() {
        let xml = r#"<types>
          <type>
            <struct name="Grid">
              <member name="cells" type="int32" arrayDimensions="2,3"/>
              <member name="tags" type="int32" sequenceMaxLength="4"/>
            </struct>
          </type>
        </types>"#;
        let registry = Registry::new();
        load_str(xml, &registry).unwrap();
        let grid = registry.lookup("Grid").unwrap();
        let cells = grid.get_member_by_name("cells").unwrap();
        assert_eq!(cells.type_.get_kind(), Kind::Array);
        assert_eq!(cells.type_.array_total_bound(), 6);
        let tags = grid.get_member_by_name("tags").unwrap();
        assert_eq!(tags.type_.get_kind(), Kind::Sequence);
    }

    #[test]
    fn test_unknown_nonbasic_type_rejected() {
        let xml = r#"<types>
          <type>
            <struct name="Bad">
              <member name="x" type="nonBasic" nonBasicTypeName="Missing"/>
            </struct>
          </type>
        </types>"#;
        let registry = Registry::new();
        let err = load_str(xml, &registry).unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)));
    }

    #[test]
    fn test_key_member_marked() {
        let xml = r#"<types>
          <type>
            <struct name="K">
              <member name="id" type="int32" key="true"/>
              <member name="name" type="string" stringMaxLength="64"/>
            </struct>
          </type>
        </types>"#;
        let registry = Registry::new();
        load_str(xml, &registry).unwrap();
        let k = registry.lookup("K").unwrap();
        assert!(k.get_member_by_name("id").unwrap().is_key);
        assert!(!k.get_member_by_name("name").unwrap().is_key);
    }
}
