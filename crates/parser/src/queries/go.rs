//! Go tree-sitter queries

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for Go
const IMPORTS_QUERY: &str = r#"
; import "foo/bar"
(import_spec
  path: (interpreted_string_literal) @import)

; import f "foo/bar" (aliased, including blank _ and dot .)
(import_spec
  name: (_)
  path: (interpreted_string_literal) @import)
"#;

/// Call extraction query for Go
const CALLS_QUERY: &str = r#"
; Direct function calls: foo()
(call_expression
  function: (identifier) @call)

; Selector calls: obj.Method(), pkg.Function()
(call_expression
  function: (selector_expression
    field: (field_identifier) @call))
"#;

/// Definition extraction query for Go
const DEFINITIONS_QUERY: &str = r#"
; Functions
(function_declaration
  name: (identifier) @name) @definition.function

; Methods (with receiver)
(method_declaration
  name: (field_identifier) @name) @definition.method

; Struct types
(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (struct_type))) @definition.struct

; Interface types
(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (interface_type))) @definition.interface

; Other named types
(type_declaration
  (type_spec
    name: (type_identifier) @name)) @definition.type

; Top-level const declarations
(const_declaration
  (const_spec
    name: (identifier) @name)) @definition.const
"#;

pub fn queries(grammar: &TsLanguage) -> LanguageQueries {
  LanguageQueries {
    imports: compile_query(grammar, IMPORTS_QUERY),
    calls: compile_query(grammar, CALLS_QUERY),
    definitions: compile_query(grammar, DEFINITIONS_QUERY),
  }
}
