//! Type-text resolution: decide which declared type, if any, a field,
//! parameter or return type refers to.
//!
//! Works on source text rather than grammar nodes so that Java and Kotlin
//! share one implementation.

use crate::languages::Language;
use relgraph_core::config::ExtractionConfig;

const JAVA_PRIMITIVES: &[&str] = &[
    "int", "long", "short", "byte", "float", "double", "boolean", "char", "void", "var",
    "String", "Object", "Integer", "Long", "Short", "Byte", "Boolean", "Double", "Float",
    "Character", "Void",
];

const KOTLIN_PRIMITIVES: &[&str] = &[
    "Int", "Long", "Short", "Byte", "Float", "Double", "Boolean", "Char", "String", "Any",
    "Unit", "Nothing",
];

const COLLECTIONS: &[&str] = &[
    "List",
    "Set",
    "Collection",
    "Map",
    "ArrayList",
    "HashSet",
    "LinkedList",
    "HashMap",
    "Array",
    "MutableList",
    "MutableSet",
    "MutableMap",
    "Iterable",
];

/// A type reference resolved for relationship inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Type text as written, whitespace-normalized and without annotations.
    pub display: String,
    /// The declared type this reference points at; `None` for primitives,
    /// type parameters, function types and unresolvable text.
    pub target: Option<String>,
    /// Array or container type: the target is the element type.
    pub is_collection: bool,
}

/// Value types that never produce a relationship.
pub fn is_primitive(name: &str, language: Language, config: &ExtractionConfig) -> bool {
    let builtin = match language {
        Language::Java => JAVA_PRIMITIVES,
        Language::Kotlin => KOTLIN_PRIMITIVES,
    };
    builtin.contains(&name) || config.is_extra_primitive(name)
}

/// Container types whose element type is aggregated.
pub fn is_collection(name: &str, config: &ExtractionConfig) -> bool {
    COLLECTIONS.contains(&name) || config.is_extra_collection(name)
}

/// Resolve type text such as `List<Starship>`, `Captain?` or `Module[]`.
///
/// `type_params` are the generic parameter names in scope; references to
/// them resolve to nothing.
pub fn resolve(
    raw: &str,
    language: Language,
    config: &ExtractionConfig,
    type_params: &[String],
) -> ResolvedType {
    let display = normalize_whitespace(strip_annotations(raw));
    let (target, is_collection) = resolve_target(&display, language, config, type_params);
    ResolvedType {
        display,
        target,
        is_collection,
    }
}

fn resolve_target(
    text: &str,
    language: Language,
    config: &ExtractionConfig,
    type_params: &[String],
) -> (Option<String>, bool) {
    let mut text = text.trim();
    // Wildcards and variance: `? extends Foo`, `out Foo`, `in Foo`.
    for prefix in ["? extends ", "? super ", "out ", "in "] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim_start();
        }
    }
    let text = text.trim_end_matches('?').trim();
    let text = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .filter(|inner| !inner.contains("->"))
        .unwrap_or(text)
        .trim();

    if text.is_empty() || matches!(text, "?" | "*") || text.contains("->") {
        return (None, false);
    }

    if let Some(element) = text
        .strip_suffix("[]")
        .or_else(|| text.strip_suffix("..."))
    {
        let (target, _) = resolve_target(element, language, config, type_params);
        return (target, true);
    }

    let (base, args) = split_generic(text);
    let simple = base.rsplit('.').next().unwrap_or(base).trim();

    if is_collection(simple, config) {
        let target = args
            .first()
            .and_then(|first| resolve_target(first, language, config, type_params).0);
        return (target, true);
    }
    if is_primitive(simple, language, config)
        || type_params.iter().any(|p| p == simple)
        || !simple.starts_with(|c: char| c.is_alphabetic() || c == '_')
    {
        return (None, false);
    }
    (Some(simple.to_string()), false)
}

/// Split `Base<A, B<C>>` into `Base` and its top-level arguments.
pub(crate) fn split_generic(text: &str) -> (&str, Vec<&str>) {
    let Some(open) = text.find('<') else {
        return (text, Vec::new());
    };
    let close = text.rfind('>').filter(|&c| c > open).unwrap_or(text.len());
    (&text[..open], split_top_level(&text[open + 1..close], ','))
}

/// Split on `sep` outside of `<>`, `()` and `[]` nesting.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = None;
    for (i, c) in text.char_indices() {
        let arrow = c == '>' && prev == Some('-');
        prev = Some(c);
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' if arrow => {}
            '>' | ')' | ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Names declared by a type parameter list such as `<T extends Foo, U>`.
pub(crate) fn type_parameter_names(text: &str) -> Vec<String> {
    let inner = text.trim().trim_start_matches('<').trim_end_matches('>');
    split_top_level(inner, ',')
        .into_iter()
        .filter_map(|param| {
            strip_annotations(param)
                .split_whitespace()
                .find(|w| !matches!(*w, "in" | "out" | "reified"))
                .map(|w| w.trim_end_matches(':').to_string())
        })
        .collect()
}

fn strip_annotations(text: &str) -> &str {
    let mut rest = text.trim_start();
    while let Some(after_at) = rest.strip_prefix('@') {
        let name_end = after_at
            .find(|c: char| !(c.is_alphanumeric() || c == '.' || c == '_' || c == ':'))
            .unwrap_or(after_at.len());
        let mut tail = &after_at[name_end..];
        if tail.starts_with('(') {
            let mut depth = 0i32;
            let mut end = tail.len();
            for (i, c) in tail.char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            end = i + 1;
                            break;
                        }
                    }
                    _ => {}
                }
            }
            tail = &tail[end..];
        }
        rest = tail.trim_start();
    }
    rest
}

fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() && !out.ends_with(['<', ',', '(']) && !word.starts_with(['>', ',', ')']) {
            out.push(' ');
        } else if out.ends_with(',') {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java(raw: &str) -> ResolvedType {
        resolve(raw, Language::Java, &ExtractionConfig::default(), &[])
    }

    fn kotlin(raw: &str) -> ResolvedType {
        resolve(raw, Language::Kotlin, &ExtractionConfig::default(), &[])
    }

    #[test]
    fn test_plain_and_primitive() {
        assert_eq!(java("Pilot").target.as_deref(), Some("Pilot"));
        assert_eq!(java("int").target, None);
        assert_eq!(java("String").target, None);
        assert_eq!(kotlin("Int").target, None);
        // `Int` is only primitive in Kotlin.
        assert_eq!(java("Int").target.as_deref(), Some("Int"));
    }

    #[test]
    fn test_collections_resolve_to_element() {
        let docked = java("List<Starship>");
        assert_eq!(docked.target.as_deref(), Some("Starship"));
        assert!(docked.is_collection);
        assert_eq!(docked.display, "List<Starship>");

        assert_eq!(java("java.util.List<Pilot>").target.as_deref(), Some("Pilot"));
        assert_eq!(java("List<List<Pilot>>").target.as_deref(), Some("Pilot"));
        assert_eq!(java("Map<String, Pilot>").target, None);
        assert_eq!(java("List<String>").target, None);
        assert!(java("List<String>").is_collection);
    }

    #[test]
    fn test_arrays_nullables_and_wildcards() {
        let bays = java("DockingBay[]");
        assert_eq!(bays.target.as_deref(), Some("DockingBay"));
        assert!(bays.is_collection);
        assert_eq!(kotlin("Captain?").target.as_deref(), Some("Captain"));
        assert_eq!(kotlin("List<out Drone>").target.as_deref(), Some("Drone"));
        assert_eq!(java("List<? extends Drone>").target.as_deref(), Some("Drone"));
        assert_eq!(kotlin("(Int) -> Unit").target, None);
        assert_eq!(kotlin("List<*>").target, None);
    }

    #[test]
    fn test_generic_non_collection_relates_to_base() {
        let opt = java("Optional<Pilot>");
        assert_eq!(opt.target.as_deref(), Some("Optional"));
        assert!(!opt.is_collection);
    }

    #[test]
    fn test_type_parameters_and_config_extras() {
        let params = type_parameter_names("<T extends Comparable<T>, U>");
        assert_eq!(params, vec!["T", "U"]);
        let config = ExtractionConfig {
            extra_primitive_types: vec!["UUID".to_string()],
            extra_collection_types: vec!["Roster".to_string()],
            ..ExtractionConfig::default()
        };
        assert_eq!(resolve("T", Language::Java, &config, &params).target, None);
        assert_eq!(resolve("UUID", Language::Java, &config, &[]).target, None);
        let roster = resolve("Roster<Pilot>", Language::Java, &config, &[]);
        assert!(roster.is_collection);
        assert_eq!(roster.target.as_deref(), Some("Pilot"));
    }

    #[test]
    fn test_annotations_stripped() {
        let t = java("@NonNull Pilot");
        assert_eq!(t.display, "Pilot");
        assert_eq!(t.target.as_deref(), Some("Pilot"));
        assert_eq!(java("@Size(max = 3) List<Pilot>").target.as_deref(), Some("Pilot"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("Map< String ,  Pilot >"), "Map<String, Pilot>");
    }
}
