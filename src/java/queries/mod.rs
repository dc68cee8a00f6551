//! Tree-sitter query strings used to lift Java declarations into the entity
//! model.

/// Tree-sitter query that returns name of the package
/// * `name`: name of the package
pub const PACKAGE_QUERY: &str = include_str!("package.scm");

/// Tree-sitter query that returns class declarations
/// * `modifiers`: class modifiers, if any
/// * `name`: class name
/// * `superclass`: `extends Base` clause, if any
/// * `interfaces`: `implements A, B` clause, if any
/// * `body`: class body (used for member containment)
/// * `decl`: the entire declaration
pub const CLASS_DECLARATION_QUERY: &str = include_str!("class_declaration.scm");

/// Tree-sitter query that returns interface declarations
/// * `modifiers`: interface modifiers, if any
/// * `name`: interface name
/// * `extends`: `extends A, B` clause, if any
/// * `body`: interface body (used for member containment)
/// * `decl`: the entire declaration
pub const INTERFACE_DECLARATION_QUERY: &str = include_str!("interface_declaration.scm");

/// Tree-sitter query that returns declarations the entity model does not
/// support (enums, records, annotation types)
/// * `name`: declared name
/// * `decl`: the entire declaration
pub const UNSUPPORTED_DECLARATION_QUERY: &str = include_str!("unsupported_declaration.scm");

/// Tree-sitter query that returns field declarations
/// * `modifiers`: field modifiers, if any
/// * `type`: declared field type
/// * `name`: field name
/// * `init`: initializer expression, if any
/// * `decl`: the entire declaration
pub const FIELD_DECLARATION_QUERY: &str = include_str!("field_declaration.scm");

/// Tree-sitter query that returns method declarations
/// * `modifiers`: method modifiers, if any
/// * `type`: declared return type
/// * `name`: method name
/// * `params`: formal parameter list
/// * `body`: method body, if any
/// * `decl`: the entire declaration
pub const METHOD_DECLARATION_QUERY: &str = include_str!("method_declaration.scm");

/// Tree-sitter query that returns constructor declarations
/// * `modifiers`: constructor modifiers, if any
/// * `name`: constructor name
/// * `params`: formal parameter list
/// * `body`: constructor body
/// * `decl`: the entire declaration
pub const CONSTRUCTOR_DECLARATION_QUERY: &str = include_str!("constructor_declaration.scm");

/// Tree-sitter query that returns formal parameters
/// * `type`: declared parameter type
/// * `name`: parameter name
/// * `param`: the entire parameter
pub const FORMAL_PARAMETER_QUERY: &str = include_str!("formal_parameter.scm");

/// Tree-sitter query that returns object creation expressions
/// * `type`: the created type
/// * `expr`: the entire expression
pub const OBJECT_CREATION_QUERY: &str = include_str!("object_creation.scm");

/// Tree-sitter query that returns every identifier and type identifier
/// * `name`: the identifier text
pub const IDENTIFIER_USE_QUERY: &str = include_str!("identifier_use.scm");
