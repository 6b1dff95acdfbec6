//! Kotlin class model extraction (tree-sitter-kotlin-ng grammar).
//!
//! The grammar exposes few field names below the declaration level, so
//! parameters and properties are read from their source text.

use crate::classes::{constructor_call, relate_field, relate_usage, supertype_name};
use crate::languages::Language;
use crate::treesitter::{child_of_kind, children_of_kind, has_modifier, parse_file, text};
use crate::types::{resolve, split_top_level, type_parameter_names};
use anyhow::Result;
use relgraph_core::config::ExtractionConfig;
use relgraph_core::model::{ClassKind, ClassModel, FieldModel, MethodModel, Parameter, Visibility};
use std::path::Path;
use tree_sitter::Node;

pub(crate) fn extract(path: &Path, source: &str, config: &ExtractionConfig) -> Result<Vec<ClassModel>> {
    let tree = parse_file(path, source.as_bytes(), Language::Kotlin.ts_language())?;
    let root = tree.root_node();

    let package = child_of_kind(&root, "package_header")
        .map(|pkg| {
            text(&pkg, source)
                .trim()
                .trim_start_matches("package")
                .trim_end_matches(';')
                .trim()
                .to_string()
        })
        .filter(|p| !p.is_empty());

    let mut extractor = KotlinExtractor {
        source,
        config,
        package,
        classes: Vec::new(),
    };
    extractor.walk(&root, &[]);
    Ok(extractor.classes)
}

/// Kotlin members are public unless stated otherwise.
fn visibility(modifiers: &str) -> Visibility {
    if has_modifier(modifiers, "private") {
        Visibility::Private
    } else if has_modifier(modifiers, "protected") {
        Visibility::Protected
    } else if has_modifier(modifiers, "internal") {
        Visibility::Package
    } else {
        Visibility::Public
    }
}

/// A `val`/`var` declaration read from source text.
#[derive(Debug, PartialEq, Eq)]
struct PropertyText<'s> {
    modifiers: Vec<&'s str>,
    mutable: bool,
    name: &'s str,
    type_text: Option<&'s str>,
    initializer: Option<&'s str>,
}

/// Parse `private val core: WarpCore = WarpCore()` and similar.
///
/// Returns `None` when there is no `val`/`var` keyword (plain constructor
/// parameters) or the declaration is an extension property.
fn property_text(raw: &str) -> Option<PropertyText<'_>> {
    let (head, initializer) = match split_top_level_once(raw, '=') {
        Some((head, init)) => (head, Some(init.trim())),
        None => (raw, None),
    };
    // Delegated properties: `val x by lazy { … }`.
    let head = head.split(" by ").next().unwrap_or(head);
    // A getter or setter may follow on the next line.
    let head = head.lines().next().unwrap_or(head);

    let (decl, type_text) = match split_top_level_once(head, ':') {
        Some((decl, ty)) => (decl, Some(ty.trim()).filter(|t| !t.is_empty())),
        None => (head, None),
    };
    let words: Vec<&str> = decl
        .split_whitespace()
        .filter(|w| !w.starts_with('@'))
        .collect();
    let keyword = words.iter().position(|w| matches!(*w, "val" | "var"))?;
    let name = words.get(keyword + 1)?;
    if name.contains('.') {
        return None;
    }
    Some(PropertyText {
        modifiers: words[..keyword].to_vec(),
        mutable: words[keyword] == "var",
        name,
        type_text,
        initializer,
    })
}

fn split_top_level_once(text: &str, sep: char) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut prev = None;
    for (i, c) in text.char_indices() {
        let arrow = c == '>' && prev == Some('-');
        prev = Some(c);
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' if arrow => {}
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                // `->` in function types, `==`/`>=`/`<=`/`!=` in expressions
                let before = text[..i].chars().next_back();
                let next = text[i + c.len_utf8()..].chars().next();
                if sep == '=' && (matches!(before, Some('!' | '<' | '>' | '=')) || next == Some('=')) {
                    continue;
                }
                return Some((&text[..i], &text[i + c.len_utf8()..]));
            }
            _ => {}
        }
    }
    None
}

/// Type of an untyped property, inferred from its initializer.
fn inferred_type(initializer: Option<&str>) -> String {
    let Some(init) = initializer else {
        return "Any".to_string();
    };
    if let Some(name) = constructor_call(init) {
        return name.to_string();
    }
    let literal = if init.starts_with('"') {
        "String"
    } else if matches!(init, "true" | "false") {
        "Boolean"
    } else if init.starts_with(|c: char| c.is_ascii_digit()) {
        if init.contains('.') { "Double" } else { "Int" }
    } else {
        "Any"
    };
    literal.to_string()
}

struct KotlinExtractor<'a> {
    source: &'a str,
    config: &'a ExtractionConfig,
    package: Option<String>,
    classes: Vec<ClassModel>,
}

impl KotlinExtractor<'_> {
    fn walk(&mut self, node: &Node, outer_params: &[String]) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !matches!(
                child.kind(),
                "class_declaration" | "object_declaration" | "interface_declaration"
            ) {
                self.walk(&child, outer_params);
                continue;
            }
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };

            let mut type_params = outer_params.to_vec();
            if let Some(params) = child_of_kind(&child, "type_parameters") {
                type_params.extend(type_parameter_names(text(&params, self.source)));
            }

            let model = self.class_model(&child, text(&name_node, self.source), &type_params);
            self.classes.push(model);

            if let Some(body) = class_body(&child) {
                self.walk(&body, &type_params);
            }
        }
    }

    fn class_model(&self, node: &Node, name: &str, type_params: &[String]) -> ClassModel {
        let modifiers = child_of_kind(node, "modifiers").map_or("", |m| text(&m, self.source));
        let kind = if node.kind() == "object_declaration" {
            ClassKind::Object
        } else if node.kind() == "interface_declaration" || has_keyword(node, "interface") {
            ClassKind::Interface
        } else if has_modifier(modifiers, "enum") {
            ClassKind::Enum
        } else if has_modifier(modifiers, "annotation") {
            ClassKind::Annotation
        } else {
            ClassKind::Class
        };

        let mut model = ClassModel::new(name, kind);
        model.visibility = visibility(modifiers);
        model.is_abstract = has_modifier(modifiers, "abstract") || has_modifier(modifiers, "sealed");
        model.package.clone_from(&self.package);

        for spec in delegation_specifiers(node) {
            let spec_text = text(&spec, self.source).trim();
            let Some(parent) = supertype_name(spec_text) else {
                continue;
            };
            // A constructor call marks the superclass; bare types are interfaces.
            if spec_text.contains('(') && kind != ClassKind::Interface && model.extends.is_none() {
                model.extends = Some(parent);
            } else {
                model.implements.push(parent);
            }
        }

        if let Some(params) = child_of_kind(node, "primary_constructor")
            .and_then(|ctor| child_of_kind(&ctor, "class_parameters"))
        {
            for param in children_of_kind(&params, "class_parameter") {
                self.constructor_property(&param, &mut model, type_params);
            }
        }

        if let Some(body) = class_body(node) {
            let mut cursor = body.walk();
            for member in body.children(&mut cursor) {
                match member.kind() {
                    "property_declaration" => self.property(&member, &mut model, type_params),
                    "function_declaration" => self.function(&member, &mut model, type_params),
                    "enum_entry" => {
                        let entry = text(&member, self.source).trim();
                        let end = entry
                            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                            .unwrap_or(entry.len());
                        if end > 0 {
                            model.fields.push(FieldModel {
                                name: entry[..end].to_string(),
                                type_name: String::new(),
                                visibility: Visibility::Public,
                                is_static: false,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        model
    }

    /// `val`/`var` primary-constructor parameters declare properties.
    fn constructor_property(&self, node: &Node, model: &mut ClassModel, type_params: &[String]) {
        let Some(prop) = property_text(text(node, self.source)) else {
            return;
        };
        let Some(type_text) = prop.type_text else {
            return;
        };
        let ty = resolve(type_text, Language::Kotlin, self.config, type_params);
        // A private val handed in at construction is owned by this object.
        let owned = prop.modifiers.contains(&"private") && !prop.mutable;
        relate_field(model, prop.name, &ty, owned);
        model.fields.push(FieldModel {
            name: prop.name.to_string(),
            type_name: ty.display,
            visibility: visibility(&prop.modifiers.join(" ")),
            is_static: false,
        });
    }

    fn property(&self, node: &Node, model: &mut ClassModel, type_params: &[String]) {
        let Some(prop) = property_text(text(node, self.source)) else {
            return;
        };
        let declared = prop.type_text.map(str::to_string);
        let type_text = declared.unwrap_or_else(|| inferred_type(prop.initializer));
        let ty = resolve(&type_text, Language::Kotlin, self.config, type_params);

        // Initialized by a constructor call: the object builds and owns it.
        let owned = prop
            .initializer
            .and_then(constructor_call)
            .is_some_and(|created| ty.target.as_deref() == Some(created));
        relate_field(model, prop.name, &ty, owned);
        model.fields.push(FieldModel {
            name: prop.name.to_string(),
            type_name: ty.display,
            visibility: visibility(&prop.modifiers.join(" ")),
            is_static: false,
        });
    }

    fn function(&self, node: &Node, model: &mut ClassModel, outer_params: &[String]) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(&name, self.source).to_string();
        let modifiers = child_of_kind(node, "modifiers").map_or("", |m| text(&m, self.source));

        let mut type_params = outer_params.to_vec();
        if let Some(params) = child_of_kind(node, "type_parameters") {
            type_params.extend(type_parameter_names(text(&params, self.source)));
        }

        let body = {
            let mut cursor = node.walk();
            node.children(&mut cursor)
                .find(|c| matches!(c.kind(), "function_body" | "block" | "="))
        };

        let mut parameters = Vec::new();
        let value_params = child_of_kind(node, "function_value_parameters");
        if let Some(value_params) = value_params {
            let raw = text(&value_params, self.source).trim();
            let inner = raw
                .strip_prefix('(')
                .and_then(|t| t.strip_suffix(')'))
                .unwrap_or(raw);
            for raw in split_top_level(inner, ',') {
                let raw = raw.split_once('=').map_or(raw, |(head, _)| head);
                let Some((param_name, param_type)) = raw.split_once(':') else {
                    continue;
                };
                let words: Vec<&str> = param_name
                    .split_whitespace()
                    .filter(|w| !w.starts_with('@'))
                    .collect();
                let param_name = words.last().copied().unwrap_or("");
                // `vararg xs: T` arrives in the body as `Array<T>`.
                let param_type = if words.contains(&"vararg") {
                    format!("Array<{}>", param_type.trim())
                } else {
                    param_type.to_string()
                };
                let ty = resolve(&param_type, Language::Kotlin, self.config, &type_params);
                relate_usage(model, &name, &ty);
                parameters.push(Parameter {
                    name: param_name.to_string(),
                    type_name: ty.display,
                });
            }
        }

        // Return type: whatever follows `:` between the parameters and the body.
        let after_params = value_params.map_or(node.end_byte(), |p| p.end_byte());
        let before_body = body.map_or(node.end_byte(), |b| b.start_byte());
        let return_text = self
            .source
            .get(after_params..before_body.max(after_params))
            .unwrap_or("")
            .trim();
        let return_text = return_text
            .strip_prefix(':')
            .map(|t| t.split(" where ").next().unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .unwrap_or("Unit");
        let return_type = resolve(return_text, Language::Kotlin, self.config, &type_params);
        relate_usage(model, &name, &return_type);

        model.methods.push(MethodModel {
            name,
            return_type: return_type.display,
            parameters,
            visibility: visibility(modifiers),
            is_static: false,
            is_abstract: body.is_none(),
        });
    }
}

/// Supertype entries, whether or not the grammar groups them.
fn delegation_specifiers<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut specs = children_of_kind(node, "delegation_specifier");
    for group in children_of_kind(node, "delegation_specifiers") {
        specs.extend(children_of_kind(&group, "delegation_specifier"));
    }
    specs
}

fn class_body<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("body").or_else(|| {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .find(|n| n.kind() == "class_body" || n.kind() == "enum_class_body")
    })
}

/// Whether an anonymous keyword token is a direct child.
fn has_keyword(node: &Node, keyword: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == keyword)
}
