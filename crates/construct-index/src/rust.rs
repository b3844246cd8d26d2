use crate::error::Result;
use crate::fingerprint::collapse_whitespace;
use crate::indexer::{new_parser, node_text, parse_source, qualify, ConstructIndexer, ConstructSpec};
use crate::language::Language;
use crate::types::{Construct, ConstructKind, IndexedFile, ROLE_CONST};
use tree_sitter::{Node, Parser};

/// Construct indexer for Rust sources.
///
/// Structs, enums, unions and traits are classes; `impl` and trait members are methods
/// of the implementing type; inline `mod` blocks add a scope segment.
pub struct RustIndexer {
    parser: Parser,
}

impl RustIndexer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: new_parser(Language::Rust)?,
        })
    }
}

impl ConstructIndexer for RustIndexer {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn index_file(&mut self, source: &str, path: &str) -> Result<IndexedFile> {
        let tree = parse_source(&mut self.parser, source)?;
        let root = tree.root_node();

        let mut walker = Walker {
            source,
            path,
            constructs: Vec::new(),
        };
        walker.walk_items(root, &mut Vec::new());

        Ok(IndexedFile {
            path: path.to_string(),
            language: Language::Rust,
            constructs: walker.constructs,
            has_parse_error: root.has_error(),
        })
    }
}

struct Walker<'s> {
    source: &'s str,
    path: &'s str,
    constructs: Vec<Construct>,
}

impl Walker<'_> {
    /// Visit the items of a source file or `mod { ... }` body
    fn walk_items(&mut self, container: Node<'_>, scope: &mut Vec<String>) {
        let mut cursor = container.walk();
        let children: Vec<_> = container.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "function_item" => self.visit_function(child, scope, ConstructKind::Function),
                "const_item" | "static_item" => {
                    self.visit_value_item(child, scope, ConstructKind::Variable);
                }
                "struct_item" | "union_item" => {
                    if let Some(name) = self.visit_type(child, scope) {
                        self.visit_fields(child, scope, name);
                    }
                }
                "enum_item" => {
                    self.visit_type(child, scope);
                }
                "trait_item" => {
                    if let Some(name) = self.visit_type(child, scope) {
                        self.visit_members(child, scope, name);
                    }
                }
                "impl_item" => {
                    if let Some(target) = self.impl_target(child) {
                        self.visit_members(child, scope, target);
                    }
                }
                "mod_item" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.source).to_string());
                    if let (Some(name), Some(body)) = (name, child.child_by_field_name("body")) {
                        scope.push(name);
                        self.walk_items(body, scope);
                        scope.pop();
                    }
                }
                _ => {}
            }
        }
    }

    /// Methods and associated consts of an `impl` or `trait` body
    fn visit_members(&mut self, node: Node<'_>, scope: &mut Vec<String>, owner: String) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };

        scope.push(owner);
        let mut cursor = body.walk();
        let members: Vec<_> = body.named_children(&mut cursor).collect();
        for member in members {
            match member.kind() {
                "function_item" | "function_signature_item" => {
                    self.visit_function(member, scope, ConstructKind::Method);
                }
                "const_item" => self.visit_value_item(member, scope, ConstructKind::Field),
                _ => {}
            }
        }
        scope.pop();
    }

    fn visit_function(&mut self, node: Node<'_>, scope: &[String], kind: ConstructKind) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };

        let mut signature = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "function_modifiers" {
                signature.push_str(node_text(child, self.source));
                signature.push(' ');
            }
        }
        for field in ["type_parameters", "parameters"] {
            if let Some(part) = node.child_by_field_name(field) {
                signature.push_str(node_text(part, self.source));
            }
        }
        if let Some(where_clause) = child_of_kind(node, "where_clause") {
            signature.push(' ');
            signature.push_str(node_text(where_clause, self.source));
        }

        let mut spec = self.spec(node, scope, name, kind);
        spec.annotation = node
            .child_by_field_name("return_type")
            .map(|t| node_text(t, self.source).to_string());
        spec.params = Some(signature);
        spec.body = node.child_by_field_name("body");
        self.push(spec);
    }

    /// `const`, `static` and associated `const` items
    fn visit_value_item(&mut self, node: Node<'_>, scope: &[String], kind: ConstructKind) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };

        let mut annotation = node
            .child_by_field_name("type")
            .map(|t| node_text(t, self.source).to_string())
            .unwrap_or_default();
        if child_of_kind(node, "mutable_specifier").is_some() {
            annotation = format!("mut {annotation}");
        }

        let mut spec = self.spec(node, scope, name, kind);
        spec.role = (node.kind() == "const_item").then_some(ROLE_CONST);
        spec.annotation = Some(annotation);
        spec.body = node.child_by_field_name("value");
        self.push(spec);
    }

    /// Struct/enum/union/trait as a class construct; returns its name
    fn visit_type(&mut self, node: Node<'_>, scope: &[String]) -> Option<String> {
        let name = node.child_by_field_name("name")?;
        let name_text = node_text(name, self.source).to_string();

        let mut spec = self.spec(node, scope, name, ConstructKind::Class);
        // the item keyword keeps `struct X` and `enum X` apart
        let mut annotation = node.kind().trim_end_matches("_item").to_string();
        if let Some(generics) = node.child_by_field_name("type_parameters") {
            annotation.push_str(node_text(generics, self.source));
        }
        if let Some(bounds) = node.child_by_field_name("bounds") {
            annotation.push_str(": ");
            annotation.push_str(node_text(bounds, self.source));
        }
        spec.annotation = Some(annotation);
        spec.body = node.child_by_field_name("body");
        self.push(spec);

        Some(name_text)
    }

    /// Named fields of a struct or union
    fn visit_fields(&mut self, node: Node<'_>, scope: &mut Vec<String>, owner: String) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        if body.kind() != "field_declaration_list" {
            return;
        }

        scope.push(owner);
        let mut cursor = body.walk();
        let fields: Vec<_> = body.named_children(&mut cursor).collect();
        for field in fields {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(name) = field.child_by_field_name("name") else {
                continue;
            };
            let mut spec = self.spec(field, scope, name, ConstructKind::Field);
            spec.annotation = field
                .child_by_field_name("type")
                .map(|t| node_text(t, self.source).to_string());
            self.push(spec);
        }
        scope.pop();
    }

    /// Base type name of `impl [Trait for] Type`
    fn impl_target(&self, node: Node<'_>) -> Option<String> {
        let mut ty = node.child_by_field_name("type")?;
        loop {
            match ty.kind() {
                "type_identifier" => return Some(node_text(ty, self.source).to_string()),
                "generic_type" => ty = ty.child_by_field_name("type")?,
                "scoped_type_identifier" => ty = ty.child_by_field_name("name")?,
                "reference_type" | "pointer_type" => ty = ty.child_by_field_name("type")?,
                _ => return Some(collapse_whitespace(node_text(ty, self.source))),
            }
        }
    }

    /// Common parts of every construct: qualname, outer attributes, visibility
    fn spec<'t>(
        &self,
        node: Node<'t>,
        scope: &[String],
        name: Node<'_>,
        kind: ConstructKind,
    ) -> ConstructSpec<'t> {
        let mut spec = ConstructSpec::new(kind, qualify(scope, node_text(name, self.source)), node);

        let mut attributes = Vec::new();
        let mut prev = node.prev_sibling();
        while let Some(sibling) = prev {
            match sibling.kind() {
                "attribute_item" => {
                    attributes.push(collapse_whitespace(node_text(sibling, self.source)));
                    spec.start_row = Some(sibling.start_position().row);
                }
                "line_comment" | "block_comment" => {}
                _ => break,
            }
            prev = sibling.prev_sibling();
        }
        attributes.reverse();

        if let Some(visibility) = child_of_kind(node, "visibility_modifier") {
            attributes.push(format!("vis:{}", node_text(visibility, self.source)));
        }
        spec.decorators = attributes;
        spec
    }

    fn push(&mut self, spec: ConstructSpec<'_>) {
        self.constructs
            .push(spec.finish(self.path, self.source, Language::Rust));
    }
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index(code: &str) -> IndexedFile {
        let mut indexer = RustIndexer::new().unwrap();
        indexer.index_file(code, "lib.rs").unwrap()
    }

    fn summary(file: &IndexedFile) -> Vec<(String, ConstructKind)> {
        file.constructs
            .iter()
            .map(|c| (c.qualname.clone(), c.kind))
            .collect()
    }

    #[test]
    fn test_extracts_items() {
        let code = r#"
pub const MAX: usize = 10;
static mut COUNTER: u32 = 0;

#[derive(Debug)]
pub struct Point {
    pub x: i32,
    y: i32,
}

impl Point {
    const ORIGIN: (i32, i32) = (0, 0);

    pub fn norm(&self) -> f64 {
        ((self.x * self.x + self.y * self.y) as f64).sqrt()
    }
}

trait Shape {
    fn area(&self) -> f64;
}

fn main() {}
"#;
        let file = index(code);
        assert!(!file.has_parse_error);
        assert_eq!(
            summary(&file),
            vec![
                ("MAX".to_string(), ConstructKind::Variable),
                ("COUNTER".to_string(), ConstructKind::Variable),
                ("Point".to_string(), ConstructKind::Class),
                ("Point.x".to_string(), ConstructKind::Field),
                ("Point.y".to_string(), ConstructKind::Field),
                ("Point.ORIGIN".to_string(), ConstructKind::Field),
                ("Point.norm".to_string(), ConstructKind::Method),
                ("Shape".to_string(), ConstructKind::Class),
                ("Shape.area".to_string(), ConstructKind::Method),
                ("main".to_string(), ConstructKind::Function),
            ]
        );

        assert_eq!(file.constructs[0].role.as_deref(), Some(ROLE_CONST));
        assert_eq!(file.constructs[1].role, None);

        // #[derive(Debug)] sits on line 5, the struct keyword on line 6
        let point = file.find_unique("Point", None).unwrap();
        assert_eq!((point.start_line, point.end_line), (5, 9));
    }

    #[test]
    fn test_methods_inside_module_impl() {
        let code = r"
mod api {
    pub struct Car;

    impl Car {
        pub fn drive(&self) {}
        fn stop(&self) {}
    }
}
";
        let file = index(code);
        assert!(file.find_unique("api.Car.drive", Some(ConstructKind::Method)).is_some());
        assert!(file.find_unique("api.Car.stop", Some(ConstructKind::Method)).is_some());
        assert!(file.find_unique("api.Car", Some(ConstructKind::Class)).is_some());
    }

    #[test]
    fn test_generic_impl_target() {
        let file = index("impl<T: Clone> Wrapper<T> {\n    fn get(&self) -> T { self.0.clone() }\n}\n");
        assert!(file.find_unique("Wrapper.get", None).is_some());
    }

    #[test]
    fn test_visibility_and_attributes_are_interface() {
        let private = index("fn f() -> u8 { 1 }\n");
        let public = index("pub fn f() -> u8 { 1 }\n");
        let inlined = index("#[inline]\nfn f() -> u8 { 1 }\n");
        let a = &private.constructs[0];
        let b = &public.constructs[0];
        let c = &inlined.constructs[0];
        assert_ne!(a.interface_hash, b.interface_hash);
        assert_ne!(a.interface_hash, c.interface_hash);
        assert_eq!(a.body_hash, b.body_hash);
        assert_eq!(a.body_hash, c.body_hash);
    }

    #[test]
    fn test_doc_comments_do_not_change_hashes() {
        let bare = index("fn f() -> u8 {\n    1\n}\n");
        let documented = index("/// Returns one.\nfn f() -> u8 {\n    // literal\n    1\n}\n");
        assert_eq!(bare.constructs[0].interface_hash, documented.constructs[0].interface_hash);
        assert_eq!(bare.constructs[0].body_hash, documented.constructs[0].body_hash);
    }

    #[test]
    fn test_rename_keeps_fingerprint() {
        let before = index("impl S {\n    fn old(&self, n: u32) -> u32 { n + 1 }\n}\n");
        let after = index("impl S {\n    fn new_name(&self, n: u32) -> u32 { n + 1 }\n}\n");
        let a = before.find_unique("S.old", None).unwrap();
        let b = after.find_unique("S.new_name", None).unwrap();
        assert_eq!(a.interface_hash, b.interface_hash);
        assert_eq!(a.body_hash, b.body_hash);
    }

    #[test]
    fn test_struct_and_enum_with_same_body_differ() {
        let file = index("struct A {}\nenum B {}\n");
        assert_ne!(file.constructs[0].interface_hash, file.constructs[1].interface_hash);
    }

    #[test]
    fn test_trait_impls_with_same_method_name_are_ambiguous() {
        let code = "impl A for S { fn go(&self) {} }\nimpl B for S { fn go(&self) {} }\n";
        let file = index(code);
        assert_eq!(file.lookup("S.go", Some(ConstructKind::Method)).len(), 2);
        assert!(file.find_unique("S.go", Some(ConstructKind::Method)).is_none());
    }

    #[test]
    fn test_broken_source_sets_parse_error() {
        let file = index("fn ok() -> u8 { 1 }\nfn broken( { \n");
        assert!(file.has_parse_error);
        assert!(file.find_unique("ok", None).is_some_and(|c| !c.has_parse_error));
    }
}
