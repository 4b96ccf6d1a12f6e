//! Template compiler: HTML tokenizer, AST builder, optimizer and render
//! source generator, plus the single-file component splitter.

pub mod create_compiler;
pub mod directives;
pub mod error_detector;
pub mod html_parser;
pub mod modules;
pub mod optimizer;
pub mod options;
pub mod sfc;
pub mod template_ast;
pub mod template_codegen;
pub mod template_parse;


pub use create_compiler::{
    BaseCompile, CompiledFunctions, CompiledResult, CompiledTemplate, Compiler, base_compile,
    create_compiler, create_compiler_creator,
};
pub use directives::{DirectiveCode, DirectiveHandler};
pub use html_parser::{
    Attr, EventRecorder, HtmlParser, ParseEvent, ParseHandler, ParseWarning, ParserOptions,
    parse_html,
};
pub use modules::CompilerModule;
pub use options::{CompileOptions, CompilerOptions, WarnFn, base_options};
pub use sfc::{Block, Sfc, SfcError, parse_sfc};
pub use template_ast::{AttrKind, Element, Node, TemplateAttr};
pub use template_parse::{TemplateError, parse, parse_template_to_ast};

/// Compiles `template` with the web platform defaults.
pub fn compile(template: &str) -> CompiledResult {
    create_compiler(base_options()).compile(template, None)
}
