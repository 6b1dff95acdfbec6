//! Java class model extraction.

use crate::classes::{relate_field, relate_usage, supertype_name};
use crate::languages::Language;
use crate::treesitter::{child_of_kind, children_of_kind, has_modifier, parse_file, text};
use crate::types::{resolve, split_top_level, type_parameter_names};
use anyhow::Result;
use relgraph_core::config::ExtractionConfig;
use relgraph_core::model::{ClassKind, ClassModel, FieldModel, MethodModel, Parameter, Visibility};
use std::path::Path;
use tree_sitter::Node;

pub(crate) fn extract(path: &Path, source: &str, config: &ExtractionConfig) -> Result<Vec<ClassModel>> {
    let tree = parse_file(path, source.as_bytes(), Language::Java.ts_language())?;
    let root = tree.root_node();

    let package = child_of_kind(&root, "package_declaration").map(|pkg| {
        text(&pkg, source)
            .trim()
            .trim_start_matches("package")
            .trim_end_matches(';')
            .trim()
            .to_string()
    });

    let mut extractor = JavaExtractor {
        source,
        config,
        package,
        classes: Vec::new(),
    };
    extractor.walk(&root, &[]);
    Ok(extractor.classes)
}

struct JavaExtractor<'a> {
    source: &'a str,
    config: &'a ExtractionConfig,
    package: Option<String>,
    classes: Vec<ClassModel>,
}

impl JavaExtractor<'_> {
    fn walk(&mut self, node: &Node, outer_params: &[String]) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let kind = match child.kind() {
                "class_declaration" => ClassKind::Class,
                "interface_declaration" => ClassKind::Interface,
                "enum_declaration" => ClassKind::Enum,
                "record_declaration" => ClassKind::Record,
                "annotation_type_declaration" => ClassKind::Annotation,
                _ => {
                    self.walk(&child, outer_params);
                    continue;
                }
            };
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };

            let mut type_params = outer_params.to_vec();
            if let Some(params) = child_of_kind(&child, "type_parameters") {
                type_params.extend(type_parameter_names(text(&params, self.source)));
            }

            let model = self.class_model(&child, text(&name_node, self.source), kind, &type_params);
            self.classes.push(model);

            // Nested declarations become classes of their own.
            if let Some(body) = child.child_by_field_name("body") {
                self.walk(&body, &type_params);
            }
        }
    }

    fn class_model(&self, node: &Node, name: &str, kind: ClassKind, type_params: &[String]) -> ClassModel {
        let modifiers = modifiers_of(node, self.source);
        let mut model = ClassModel::new(name, kind);
        model.visibility = Visibility::from_modifiers(modifiers);
        model.is_abstract = has_modifier(modifiers, "abstract");
        model.package.clone_from(&self.package);

        if let Some(superclass) = node.child_by_field_name("superclass") {
            let base = text(&superclass, self.source).trim().trim_start_matches("extends");
            model.extends = supertype_name(base.trim());
        }
        let interfaces = node
            .child_by_field_name("interfaces")
            .or_else(|| child_of_kind(node, "extends_interfaces"));
        if let Some(interfaces) = interfaces {
            let list = text(&interfaces, self.source)
                .trim()
                .trim_start_matches("implements")
                .trim_start_matches("extends");
            model.implements = split_top_level(list, ',')
                .into_iter()
                .filter_map(supertype_name)
                .collect();
        }

        // Record components are private final fields with public accessors.
        let mut accessors = Vec::new();
        if let Some(components) = node.child_by_field_name("parameters") {
            for component in children_of_kind(&components, "formal_parameter") {
                let Some(param) = self.parameter(&component) else {
                    continue;
                };
                let ty = resolve(&param.type_name, Language::Java, self.config, type_params);
                relate_field(&mut model, &param.name, &ty, false);
                accessors.push(MethodModel {
                    name: param.name.clone(),
                    return_type: ty.display.clone(),
                    parameters: Vec::new(),
                    visibility: Visibility::Public,
                    is_static: false,
                    is_abstract: false,
                });
                model.fields.push(FieldModel {
                    name: param.name,
                    type_name: ty.display,
                    visibility: Visibility::Private,
                    is_static: false,
                });
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.members(&body, &mut model, type_params);
        }
        // An explicit accessor in the body replaces the implicit one.
        accessors.retain(|a: &MethodModel| {
            !model
                .methods
                .iter()
                .any(|m| m.name == a.name && m.parameters.is_empty())
        });
        model.methods.extend(accessors);
        model
    }

    fn members(&self, body: &Node, model: &mut ClassModel, type_params: &[String]) {
        let in_interface = model.kind == ClassKind::Interface;
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    self.field(&member, model, type_params, in_interface);
                }
                "method_declaration" => {
                    self.method(&member, model, type_params, in_interface);
                }
                "enum_constant" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        model.fields.push(FieldModel {
                            name: text(&name, self.source).to_string(),
                            type_name: String::new(),
                            visibility: Visibility::Public,
                            is_static: false,
                        });
                    }
                }
                "enum_body_declarations" => self.members(&member, model, type_params),
                _ => {}
            }
        }
    }

    fn field(&self, node: &Node, model: &mut ClassModel, type_params: &[String], in_interface: bool) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let modifiers = modifiers_of(node, self.source);
        let is_static = in_interface || has_modifier(modifiers, "static");
        let visibility = if in_interface {
            Visibility::Public
        } else {
            Visibility::from_modifiers(modifiers)
        };
        let type_text = text(&type_node, self.source);

        for declarator in children_of_kind(node, "variable_declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let name = text(&name, self.source);
            // C-style `Starship ships[]` puts the dimensions on the declarator.
            let dimensions = declarator
                .child_by_field_name("dimensions")
                .map_or("", |d| text(&d, self.source));
            let ty = resolve(
                &format!("{type_text}{dimensions}"),
                Language::Java,
                self.config,
                type_params,
            );
            // `new T(...)` on an instance field: the object owns what it creates.
            let owned = !is_static
                && declarator
                    .child_by_field_name("value")
                    .is_some_and(|v| v.kind() == "object_creation_expression");
            relate_field(model, name, &ty, owned);
            model.fields.push(FieldModel {
                name: name.to_string(),
                type_name: ty.display,
                visibility,
                is_static,
            });
        }
    }

    fn method(&self, node: &Node, model: &mut ClassModel, outer_params: &[String], in_interface: bool) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(&name, self.source).to_string();
        let modifiers = modifiers_of(node, self.source);

        let mut type_params = outer_params.to_vec();
        if let Some(params) = child_of_kind(node, "type_parameters") {
            type_params.extend(type_parameter_names(text(&params, self.source)));
        }

        let return_type = node
            .child_by_field_name("type")
            .map_or("void", |t| text(&t, self.source));
        let return_type = resolve(return_type, Language::Java, self.config, &type_params);
        relate_usage(model, &name, &return_type);

        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                let Some(param) = self.parameter(&param) else {
                    continue;
                };
                let ty = resolve(&param.type_name, Language::Java, self.config, &type_params);
                relate_usage(model, &name, &ty);
                parameters.push(Parameter {
                    name: param.name,
                    type_name: ty.display,
                });
            }
        }

        let has_body = node.child_by_field_name("body").is_some();
        model.methods.push(MethodModel {
            name,
            return_type: return_type.display,
            parameters,
            visibility: if in_interface && !has_modifier(modifiers, "private") {
                Visibility::Public
            } else {
                Visibility::from_modifiers(modifiers)
            },
            is_static: has_modifier(modifiers, "static"),
            is_abstract: !has_body,
        });
    }

    /// Name and raw type text of a `formal_parameter` or `spread_parameter`.
    fn parameter(&self, node: &Node) -> Option<Parameter> {
        match node.kind() {
            "formal_parameter" => {
                let type_node = node.child_by_field_name("type")?;
                let name = node.child_by_field_name("name")?;
                let dimensions = node
                    .child_by_field_name("dimensions")
                    .map_or("", |d| text(&d, self.source));
                Some(Parameter {
                    name: text(&name, self.source).to_string(),
                    type_name: format!("{}{}", text(&type_node, self.source), dimensions),
                })
            }
            "spread_parameter" => {
                let raw = text(node, self.source);
                let (ty, name) = raw.split_once("...")?;
                let ty = ty
                    .split_whitespace()
                    .filter(|w| *w != "final" && !w.starts_with('@'))
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(Parameter {
                    name: name.trim().to_string(),
                    type_name: format!("{ty}..."),
                })
            }
            _ => None,
        }
    }
}

fn modifiers_of<'s>(node: &Node, source: &'s str) -> &'s str {
    child_of_kind(node, "modifiers").map_or("", |m| text(&m, source))
}
