//! TypeScript tree-sitter queries (also used for Tsx)

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for TypeScript
const IMPORTS_QUERY: &str = r#"
; import foo from "bar"
(import_statement
  source: (string (string_fragment) @import))

; import type foo from "bar"
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

/// Call extraction query for TypeScript
const CALLS_QUERY: &str = r#"
; Direct function calls: foo()
(call_expression
  function: (identifier) @call)

; Member calls: obj.method(), obj?.method()
(call_expression
  function: (member_expression
    property: (property_identifier) @call))
"#;

/// Definition extraction query for TypeScript
const DEFINITIONS_QUERY: &str = r#"
; function foo() {}
(function_declaration
  name: (identifier) @name) @definition.function

; const foo = () => {}
(variable_declarator
  name: (identifier) @name
  value: [(function_expression) (arrow_function)]) @definition.function

; Classes
(class_declaration
  name: (type_identifier) @name) @definition.class

; Methods (inside class body)
(class_body
  (method_definition
    name: (property_identifier) @name) @definition.method)

; Interfaces
(interface_declaration
  name: (type_identifier) @name) @definition.interface

; Type aliases
(type_alias_declaration
  name: (type_identifier) @name) @definition.type
"#;

pub fn queries(grammar: &TsLanguage) -> LanguageQueries {
  LanguageQueries {
    imports: compile_query(grammar, IMPORTS_QUERY),
    calls: compile_query(grammar, CALLS_QUERY),
    definitions: compile_query(grammar, DEFINITIONS_QUERY),
  }
}
