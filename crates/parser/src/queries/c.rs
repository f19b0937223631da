//! C tree-sitter queries

use tree_sitter::Language as TsLanguage;

use super::compile_query;
use crate::parser::LanguageQueries;

/// Import extraction query for C
const IMPORTS_QUERY: &str = r#"
; #include <foo.h>
(preproc_include
  path: (system_lib_string) @import)

; #include "foo.h"
(preproc_include
  path: (string_literal) @import)
"#;

/// Call extraction query for C
const CALLS_QUERY: &str = r#"
; Direct function calls: foo()
(call_expression
  function: (identifier) @call)

; Macro-style calls that parse as call expressions: FOO(x)
(call_expression
  function: (identifier) @call)
"#;

/// Definition extraction query for C
const DEFINITIONS_QUERY: &str = r#"
; Function definitions
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name)) @definition.function

; Structs
(struct_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @definition.struct
"#;

pub fn queries(grammar: &TsLanguage) -> LanguageQueries {
  LanguageQueries {
    imports: compile_query(grammar, IMPORTS_QUERY),
    calls: compile_query(grammar, CALLS_QUERY),
    definitions: compile_query(grammar, DEFINITIONS_QUERY),
  }
}
