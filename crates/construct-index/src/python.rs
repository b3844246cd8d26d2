use crate::error::Result;
use crate::fingerprint::collapse_whitespace;
use crate::indexer::{
    is_constant_name, new_parser, node_text, parse_source, qualify, ConstructIndexer,
    ConstructSpec,
};
use crate::language::Language;
use crate::types::{Construct, ConstructKind, IndexedFile, ROLE_CONST};
use tree_sitter::{Node, Parser};

/// Construct indexer for Python sources
pub struct PythonIndexer {
    parser: Parser,
}

impl PythonIndexer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: new_parser(Language::Python)?,
        })
    }
}

impl ConstructIndexer for PythonIndexer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn index_file(&mut self, source: &str, path: &str) -> Result<IndexedFile> {
        let tree = parse_source(&mut self.parser, source)?;
        let root = tree.root_node();

        let mut walker = Walker {
            source,
            path,
            constructs: Vec::new(),
        };
        walker.walk_block(root, &mut Vec::new(), false);

        Ok(IndexedFile {
            path: path.to_string(),
            language: Language::Python,
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
    /// Visit the statements of a module (`in_class == false`) or class body
    fn walk_block(&mut self, block: Node<'_>, scope: &mut Vec<String>, in_class: bool) {
        let mut cursor = block.walk();
        let children: Vec<_> = block.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "expression_statement" => self.visit_assignment(child, scope, in_class),
                "function_definition" => self.visit_function(child, child, &[], scope, in_class),
                "class_definition" => self.visit_class(child, child, &[], scope),
                "decorated_definition" => self.visit_decorated(child, scope, in_class),
                "if_statement" | "try_statement" | "with_statement" => {
                    self.walk_compound(child, scope, in_class);
                }
                _ => {}
            }
        }
    }

    /// Definitions under `if`/`try`/`with` belong to the enclosing scope
    fn walk_compound(&mut self, node: Node<'_>, scope: &mut Vec<String>, in_class: bool) {
        let mut cursor = node.walk();
        let parts: Vec<_> = node.named_children(&mut cursor).collect();

        for part in parts {
            match part.kind() {
                "block" => self.walk_block(part, scope, in_class),
                "elif_clause" | "else_clause" | "except_clause" | "except_group_clause"
                | "finally_clause" => self.walk_compound(part, scope, in_class),
                _ => {}
            }
        }
    }

    fn visit_decorated(&mut self, node: Node<'_>, scope: &mut Vec<String>, in_class: bool) {
        let mut cursor = node.walk();
        let decorators: Vec<String> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .map(|c| collapse_whitespace(node_text(c, self.source)))
            .collect();

        let Some(definition) = node.child_by_field_name("definition") else {
            return;
        };
        match definition.kind() {
            "function_definition" => {
                self.visit_function(definition, node, &decorators, scope, in_class);
            }
            "class_definition" => self.visit_class(definition, node, &decorators, scope),
            _ => {}
        }
    }

    fn visit_assignment(&mut self, statement: Node<'_>, scope: &[String], in_class: bool) {
        let Some(assignment) = statement.named_child(0) else {
            return;
        };
        if assignment.kind() != "assignment" {
            return;
        }
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            // tuple unpacking, attribute and subscript targets are not tracked
            return;
        }

        let name = node_text(left, self.source);
        let kind = if in_class {
            ConstructKind::Field
        } else {
            ConstructKind::Variable
        };

        let mut spec = ConstructSpec::new(kind, qualify(scope, name), statement);
        spec.role = is_constant_name(name).then_some(ROLE_CONST);
        spec.annotation = assignment
            .child_by_field_name("type")
            .map(|t| node_text(t, self.source).to_string());
        spec.body = assignment.child_by_field_name("right");

        self.constructs
            .push(spec.finish(self.path, self.source, Language::Python));
    }

    fn visit_function(
        &mut self,
        node: Node<'_>,
        span: Node<'_>,
        decorators: &[String],
        scope: &[String],
        in_class: bool,
    ) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let kind = if in_class {
            ConstructKind::Method
        } else {
            ConstructKind::Function
        };

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| node_text(p, self.source))
            .unwrap_or_default();
        let is_async = node
            .child(0)
            .is_some_and(|first| first.kind() == "async");

        let mut spec = ConstructSpec::new(kind, qualify(scope, node_text(name, self.source)), span);
        spec.annotation = node
            .child_by_field_name("return_type")
            .map(|t| node_text(t, self.source).to_string());
        spec.decorators = decorators.to_vec();
        spec.params = Some(if is_async {
            format!("async {parameters}")
        } else {
            parameters.to_string()
        });
        spec.body = node.child_by_field_name("body");

        self.constructs
            .push(spec.finish(self.path, self.source, Language::Python));
    }

    fn visit_class(
        &mut self,
        node: Node<'_>,
        span: Node<'_>,
        decorators: &[String],
        scope: &mut Vec<String>,
    ) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name, self.source).to_string();
        let body = node.child_by_field_name("body");

        let mut spec = ConstructSpec::new(ConstructKind::Class, qualify(scope, &name), span);
        spec.annotation = node
            .child_by_field_name("superclasses")
            .map(|s| node_text(s, self.source).to_string());
        spec.decorators = decorators.to_vec();
        spec.params = node
            .child_by_field_name("type_parameters")
            .map(|t| node_text(t, self.source).to_string());
        spec.body = body;
        self.constructs
            .push(spec.finish(self.path, self.source, Language::Python));

        if let Some(body) = body {
            scope.push(name);
            self.walk_block(body, scope, true);
            scope.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index(code: &str) -> IndexedFile {
        let mut indexer = PythonIndexer::new().unwrap();
        indexer.index_file(code, "mod.py").unwrap()
    }

    fn summary(file: &IndexedFile) -> Vec<(String, ConstructKind)> {
        file.constructs
            .iter()
            .map(|c| (c.qualname.clone(), c.kind))
            .collect()
    }

    #[test]
    fn test_extracts_module_and_class_members() {
        let code = r#"
import os

MAX_RETRIES = 3
timeout: float = 1.5

def helper(a, b=2):
    return a + b

@dataclass
class Config:
    name: str
    port: int = 8080

    def url(self) -> str:
        return f"http://{self.name}:{self.port}"

    @staticmethod
    def default():
        return Config("localhost")

    class Inner:
        flag = True
"#;
        let file = index(code);
        assert!(!file.has_parse_error);
        assert_eq!(
            summary(&file),
            vec![
                ("MAX_RETRIES".to_string(), ConstructKind::Variable),
                ("timeout".to_string(), ConstructKind::Variable),
                ("helper".to_string(), ConstructKind::Function),
                ("Config".to_string(), ConstructKind::Class),
                ("Config.name".to_string(), ConstructKind::Field),
                ("Config.port".to_string(), ConstructKind::Field),
                ("Config.url".to_string(), ConstructKind::Method),
                ("Config.default".to_string(), ConstructKind::Method),
                ("Config.Inner".to_string(), ConstructKind::Class),
                ("Config.Inner.flag".to_string(), ConstructKind::Field),
            ]
        );

        let max = &file.constructs[0];
        assert_eq!(max.role.as_deref(), Some(ROLE_CONST));
        assert_eq!((max.start_line, max.end_line), (4, 4));
        assert_eq!(file.constructs[1].role, None);

        // the decorator line is part of the decorated construct
        let config = &file.constructs[3];
        assert_eq!(config.start_line, 10);
        let default = file.find_unique("Config.default", None).unwrap();
        assert_eq!(default.start_line, 18);
    }

    #[test]
    fn test_rename_keeps_fingerprint() {
        let before = index("class Foo:\n    def bar(self, x):\n        return x * 2\n");
        let after = index("class Foo:\n    def baz(self, x):\n        return x * 2\n");
        let bar = before.find_unique("Foo.bar", Some(ConstructKind::Method)).unwrap();
        let baz = after.find_unique("Foo.baz", Some(ConstructKind::Method)).unwrap();
        assert_eq!(bar.interface_hash, baz.interface_hash);
        assert_eq!(bar.body_hash, baz.body_hash);
    }

    #[test]
    fn test_return_annotation_is_interface() {
        let before = index("class Foo:\n    def bar(self) -> int:\n        return 1\n");
        let after = index("class Foo:\n    def bar(self) -> str:\n        return 1\n");
        let a = before.find_unique("Foo.bar", None).unwrap();
        let b = after.find_unique("Foo.bar", None).unwrap();
        assert_ne!(a.interface_hash, b.interface_hash);
        assert_eq!(a.body_hash, b.body_hash);
    }

    #[test]
    fn test_comment_only_edit_keeps_body_hash() {
        let before = index("def f():\n    return 1\n");
        let after = index("def f():\n    # explain\n    return 1  # one\n");
        assert_eq!(
            before.constructs[0].body_hash,
            after.constructs[0].body_hash
        );
    }

    #[test]
    fn test_decorators_are_interface() {
        let plain = index("def f():\n    pass\n");
        let cached = index("@cache\ndef f():\n    pass\n");
        assert_ne!(
            plain.constructs[0].interface_hash,
            cached.constructs[0].interface_hash
        );
        assert_eq!(plain.constructs[0].body_hash, cached.constructs[0].body_hash);
    }

    #[test]
    fn test_async_is_interface() {
        let sync = index("def f():\n    pass\n");
        let asynchronous = index("async def f():\n    pass\n");
        assert_ne!(
            sync.constructs[0].interface_hash,
            asynchronous.constructs[0].interface_hash
        );
    }

    #[test]
    fn test_annotation_without_value_differs_from_value() {
        let file = index("class A:\n    x: int\n    y: int = None\n");
        let x = file.find_unique("A.x", None).unwrap();
        let y = file.find_unique("A.y", None).unwrap();
        assert_eq!(x.interface_hash, y.interface_hash);
        assert_ne!(x.body_hash, y.body_hash);
    }

    #[test]
    fn test_unsupported_targets_are_skipped() {
        let file = index("a, b = 1, 2\nobj.attr = 3\nitems[0] = 4\nx += 1\n");
        assert!(file.constructs.is_empty());
    }

    #[test]
    fn test_conditional_definitions_keep_their_scope() {
        let code = r#"
try:
    import ujson as json
    FAST_JSON = True
except ImportError:
    FAST_JSON = False

if TYPE_CHECKING:
    from typing import Any

    def typed(x: Any) -> Any:
        return x
else:
    def untyped(x):
        return x

with open("seed.txt") as f:
    SEED = f.read()

class Settings:
    if DEBUG:
        level = "debug"
"#;
        let file = index(code);
        assert_eq!(
            summary(&file),
            vec![
                ("FAST_JSON".to_string(), ConstructKind::Variable),
                ("FAST_JSON".to_string(), ConstructKind::Variable),
                ("typed".to_string(), ConstructKind::Function),
                ("untyped".to_string(), ConstructKind::Function),
                ("SEED".to_string(), ConstructKind::Variable),
                ("Settings".to_string(), ConstructKind::Class),
                ("Settings.level".to_string(), ConstructKind::Field),
            ]
        );
        assert!(file.find_unique("FAST_JSON", None).is_none());
    }

    #[test]
    fn test_nested_functions_are_not_constructs() {
        let file = index("def outer():\n    def inner():\n        pass\n    return inner\n");
        assert_eq!(
            summary(&file),
            vec![("outer".to_string(), ConstructKind::Function)]
        );
    }

    #[test]
    fn test_broken_source_sets_parse_error() {
        let file = index("def ok():\n    return 1\n\ndef broken(:\n    return\n");
        assert!(file.has_parse_error);
        let ok = file.find_unique("ok", Some(ConstructKind::Function));
        assert!(ok.is_some_and(|c| !c.has_parse_error));
    }

    #[test]
    fn test_find_construct_duplicate_returns_none() {
        let mut indexer = PythonIndexer::new().unwrap();
        let code = "def f():\n    return 1\n\ndef f():\n    return 2\n";
        assert!(indexer
            .find_construct(code, "dup.py", "f", Some(ConstructKind::Function))
            .unwrap()
            .is_none());
        assert!(indexer
            .find_construct(code, "dup.py", "g", None)
            .unwrap()
            .is_none());
    }
}
