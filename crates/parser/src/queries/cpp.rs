//! C++ tree-sitter queries

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for C++
const IMPORTS_QUERY: &str = r#"
; #include <foo>
(preproc_include
  path: (system_lib_string) @import)

; #include "foo.h"
(preproc_include
  path: (string_literal) @import)

; using namespace foo;
(using_declaration
  (identifier) @import)
"#;

/// Call extraction query for C++
const CALLS_QUERY: &str = r#"
; Direct function calls: foo()
(call_expression
  function: (identifier) @call)

; Member calls: obj.method(), obj->method()
(call_expression
  function: (field_expression
    field: (field_identifier) @call))

; Scoped/templated calls: ns::foo(), Template<T>::foo()
(call_expression
  function: (qualified_identifier
    name: (identifier) @call))
"#;

/// Definition extraction query for C++
const DEFINITIONS_QUERY: &str = r#"
; Function definitions
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name)) @definition.function

; Methods defined out-of-line: Type::method() {}
(function_definition
  declarator: (function_declarator
    declarator: (qualified_identifier
      name: (identifier) @name))) @definition.method

; Classes
(class_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @definition.class

; Structs
(struct_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @definition.struct

; Namespaces
(namespace_definition
  name: (namespace_identifier) @name) @definition.module
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
  fn test_cpp_imports() {
    let content = r#"
#include <vector>
#include "local.h"
using namespace std;
"#;
    let mut parser = TreeSitterParser::new();
    let imports = parser.extract_imports(content, Language::Cpp);

    assert!(imports.contains(&"vector".to_string()), "imports: {:?}", imports);
    assert!(imports.contains(&"local.h".to_string()), "imports: {:?}", imports);
    assert!(imports.contains(&"std".to_string()), "imports: {:?}", imports);
  }

  #[test]
  fn test_cpp_calls() {
    let content = r#"
void example() {
  helper_fn();
  obj.method();
  ns::scoped_call();
}
"#;
    let mut parser = TreeSitterParser::new();
    let calls = parser.extract_calls(content, Language::Cpp);

    assert!(calls.contains(&"helper_fn".to_string()), "calls: {:?}", calls);
    assert!(calls.contains(&"method".to_string()), "calls: {:?}", calls);
    assert!(calls.contains(&"scoped_call".to_string()), "calls: {:?}", calls);
  }

  #[test]
  fn test_cpp_definitions() {
    let content = r#"
void my_function() {}

class MyClass {
  void method();
};

struct MyStruct {
  int field;
};

namespace my_namespace {}
"#;
    let mut parser = TreeSitterParser::new();
    let defs = parser.extract_definitions(content, Language::Cpp);

    let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
    assert!(names.contains(&"my_function"), "defs: {:?}", names);
    assert!(names.contains(&"MyClass"), "defs: {:?}", names);
    assert!(names.contains(&"MyStruct"), "defs: {:?}", names);
    assert!(names.contains(&"my_namespace"), "defs: {:?}", names);
  }
}
