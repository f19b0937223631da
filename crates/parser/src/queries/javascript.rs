//! JavaScript tree-sitter queries (also used for JSX)

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for JavaScript
const IMPORTS_QUERY: &str = r#"
; import foo from "bar"
(import_statement
  source: (string (string_fragment) @import))

; require("foo")
(call_expression
  function: (identifier) @_require
  arguments: (arguments (string (string_fragment) @import))
  (#eq? @_require "require"))

; dynamic import("foo")
(call_expression
  function: (import)
  arguments: (arguments (string (string_fragment) @import)))
"#;

/// Call extraction query for JavaScript
const CALLS_QUERY: &str = r#"
; Direct function calls: foo()
(call_expression
  function: (identifier) @call)

; Member calls: obj.method(), obj?.method()
(call_expression
  function: (member_expression
    property: (property_identifier) @call))
"#;

/// Definition extraction query for JavaScript
const DEFINITIONS_QUERY: &str = r#"
; function foo() {}
(function_declaration
  name: (identifier) @name) @definition.function

; const foo = function() {} / const foo = () => {}
(variable_declarator
  name: (identifier) @name
  value: [(function_expression) (arrow_function)]) @definition.function

; Classes
(class_declaration
  name: (identifier) @name) @definition.class

; Methods (inside class body)
(class_body
  (method_definition
    name: (property_identifier) @name) @definition.method)
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
  fn test_javascript_imports() {
    let content = r#"
import React from "react";
import { useState } from "react";
const fs = require("fs");
"#;
    let mut parser = TreeSitterParser::new();
    let imports = parser.extract_imports(content, Language::JavaScript);

    assert!(imports.contains(&"react".to_string()), "imports: {:?}", imports);
    assert!(imports.contains(&"fs".to_string()), "imports: {:?}", imports);
  }

  #[test]
  fn test_javascript_calls() {
    let content = r#"
function example() {
  helperFn();
  obj.method();
  obj?.optionalMethod();
}
"#;
    let mut parser = TreeSitterParser::new();
    let calls = parser.extract_calls(content, Language::JavaScript);

    assert!(calls.contains(&"helperFn".to_string()), "calls: {:?}", calls);
    assert!(calls.contains(&"method".to_string()), "calls: {:?}", calls);
  }

  #[test]
  fn test_javascript_definitions() {
    let content = r#"
function myFunction() {}

const myArrow = () => {};

class MyClass {
  method() {}
}
"#;
    let mut parser = TreeSitterParser::new();
    let defs = parser.extract_definitions(content, Language::JavaScript);

    let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
    assert!(names.contains(&"myFunction"), "defs: {:?}", names);
    assert!(names.contains(&"myArrow"), "defs: {:?}", names);
    assert!(names.contains(&"MyClass"), "defs: {:?}", names);
    assert!(names.contains(&"method"), "defs: {:?}", names);
  }
}
