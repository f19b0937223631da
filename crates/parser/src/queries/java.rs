//! Java tree-sitter queries

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for Java
const IMPORTS_QUERY: &str = r#"
; import foo.bar.Baz;
(import_declaration
  (scoped_identifier) @import)

; import static foo.Bar.baz;
(import_declaration
  (identifier) @import)
"#;

/// Call extraction query for Java
const CALLS_QUERY: &str = r#"
; Direct method calls: foo()
(method_invocation
  name: (identifier) @call)

; Constructor calls: new Foo()
(object_creation_expression
  type: (type_identifier) @call)
"#;

/// Definition extraction query for Java
const DEFINITIONS_QUERY: &str = r#"
; Methods
(method_declaration
  name: (identifier) @name) @definition.method

; Classes
(class_declaration
  name: (identifier) @name) @definition.class

; Interfaces
(interface_declaration
  name: (identifier) @name) @definition.interface

; Enums
(enum_declaration
  name: (identifier) @name) @definition.enum
"#;

pub fn queries(grammar: &TsLanguage) -> LanguageQueries {
  LanguageQueries {
    imports: compile_query(grammar, IMPORTS_QUERY),
    calls: compile_query(grammar, CALLS_QUERY),
    definitions: compile_query(grammar, DEFINITIONS_QUERY),
  }
}

#[cfg(test)]
mod tests {

  use crate::TreeSitterParser;
  use amanmcp_core::Language;

  #[test]
  fn test_java_imports() {
    let content = r#"
import java.util.List;
import static java.lang.Math.max;
"#;
    let mut parser = TreeSitterParser::new();
    let imports = parser.extract_imports(content, Language::Java);

    assert!(imports.contains(&"java.util.List".to_string()), "imports: {:?}", imports);
  }

  #[test]
  fn test_java_calls() {
    let content = r#"
class Example {
  void run() {
    helperFn();
    Foo thing = new Foo();
  }
}
"#;
    let mut parser = TreeSitterParser::new();
    let calls = parser.extract_calls(content, Language::Java);

    assert!(calls.contains(&"helperFn".to_string()), "calls: {:?}", calls);
    assert!(calls.contains(&"Foo".to_string()), "calls: {:?}", calls);
  }

  #[test]
  fn test_java_definitions() {
    let content = r#"
class MyClass {
  void method() {}
}

interface MyInterface {
  void doThing();
}

enum MyEnum {
  A, B
}
"#;
    let mut parser = TreeSitterParser::new();
    let defs = parser.extract_definitions(content, Language::Java);

    let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
    assert!(names.contains(&"MyClass"), "defs: {:?}", names);
    assert!(names.contains(&"method"), "defs: {:?}", names);
    assert!(names.contains(&"MyInterface"), "defs: {:?}", names);
    assert!(names.contains(&"MyEnum"), "defs: {:?}", names);
  }
}
