//! Rust tree-sitter queries

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for Rust
const IMPORTS_QUERY: &str = r#"
; Simple use statements: use foo;
(use_declaration
  argument: (identifier) @import)

; Scoped use: use foo::bar;
(use_declaration
  argument: (scoped_identifier) @import)

; Use list: use foo::{bar, baz}; - capture each item in the list
(use_declaration
  argument: (use_list
    (identifier) @import))
(use_declaration
  argument: (use_list
    (scoped_identifier) @import))

; Scoped use list: use foo::bar::{baz, qux}; - capture items inside the list
(scoped_use_list
  list: (use_list
    (identifier) @import))
(scoped_use_list
  list: (use_list
    (scoped_identifier) @import))

; Also capture aliased items in use lists: use foo::{bar as b, baz};
(scoped_use_list
  list: (use_list
    (use_as_clause
      path: (identifier) @import)))

; Use wildcard: use foo::*;
(use_declaration
  argument: (use_wildcard) @import)

; Aliased use: use foo as bar;
(use_declaration
  argument: (use_as_clause
    path: (identifier) @import))
(use_declaration
  argument: (use_as_clause
    path: (scoped_identifier) @import))
"#;

/// Call extraction query for Rust
const CALLS_QUERY: &str = r#"
; Direct function calls: foo()
(call_expression
  function: (identifier) @call)

; Method calls: obj.method()
(call_expression
  function: (field_expression
    field: (field_identifier) @call))

; Scoped calls: Module::function()
(call_expression
  function: (scoped_identifier
    name: (identifier) @call))

; Generic/turbofish function calls: parse::<Type>(data)
(call_expression
  function: (generic_function
    function: (identifier) @call))

; Generic scoped calls: Vec::<u8>::with_capacity(100)
(call_expression
  function: (generic_function
    function: (scoped_identifier
      name: (identifier) @call)))

; Macro invocations: println!()
(macro_invocation
  macro: (identifier) @call)

; Scoped macro invocations: std::println!()
(macro_invocation
  macro: (scoped_identifier
    name: (identifier) @call))
"#;

/// Definition extraction query for Rust
const DEFINITIONS_QUERY: &str = r#"
; Functions
(function_item
  name: (identifier) @name) @definition.function

; Methods (inside impl blocks)
(impl_item
  body: (declaration_list
    (function_item
      name: (identifier) @name) @definition.method))

; Structs
(struct_item
  name: (type_identifier) @name) @definition.struct

; Enums
(enum_item
  name: (type_identifier) @name) @definition.enum

; Traits
(trait_item
  name: (type_identifier) @name) @definition.trait

; Type aliases
(type_item
  name: (type_identifier) @name) @definition.type

; Modules
(mod_item
  name: (identifier) @name) @definition.module

; Constants
(const_item
  name: (identifier) @name) @definition.const
"#;

pub fn queries(grammar: &TsLanguage) -> LanguageQueries {
  LanguageQueries {
    imports: compile_query(grammar, IMPORTS_QUERY),
    calls: compile_query(grammar, CALLS_QUERY),
    definitions: compile_query(grammar, DEFINITIONS_QUERY),
  }
}
