//! Compiler pipeline: per-call option layering, call-scoped diagnostics,
//! and a render-source cache.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error_detector::detect_errors;
use crate::optimizer::optimize;
use crate::options::{CompileOptions, CompilerOptions};
use crate::template_ast::Node;
use crate::template_codegen::generate;
use crate::template_parse::parse;

/// Output of the template-to-source stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledTemplate {
    pub ast: Vec<Node>,
    pub render: String,
    pub static_render_fns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledResult {
    pub ast: Vec<Node>,
    pub render: String,
    pub static_render_fns: Vec<String>,
    pub errors: Vec<String>,
    pub tips: Vec<String>,
}

/// Render source ready to hand to a function builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledFunctions {
    pub render: String,
    pub static_render_fns: Vec<String>,
}

pub type BaseCompile = fn(&str, &CompilerOptions, &mut dyn FnMut(String, bool)) -> CompiledTemplate;

/// Parse, optimize and generate.
pub fn base_compile(
    template: &str,
    options: &CompilerOptions,
    warn: &mut dyn FnMut(String, bool),
) -> CompiledTemplate {
    let mut ast = parse(template.trim(), options, warn);
    optimize(&mut ast, options);
    let code = generate(&ast, options, warn);
    CompiledTemplate {
        ast,
        render: code.render,
        static_render_fns: code.static_render_fns,
    }
}

pub struct Compiler {
    base_options: CompilerOptions,
    base_compile: BaseCompile,
    cache: RefCell<HashMap<String, Rc<CompiledFunctions>>>,
}

/// A compiler factory around an arbitrary template-to-source stage.
pub fn create_compiler_creator(base_compile: BaseCompile) -> impl Fn(CompilerOptions) -> Compiler {
    move |base_options| Compiler {
        base_options,
        base_compile,
        cache: RefCell::new(HashMap::new()),
    }
}

pub fn create_compiler(base_options: CompilerOptions) -> Compiler {
    create_compiler_creator(base_compile)(base_options)
}

impl Compiler {
    pub fn base_options(&self) -> &CompilerOptions {
        &self.base_options
    }

    pub fn compile(&self, template: &str, options: Option<&CompileOptions>) -> CompiledResult {
        self.compile_with(template, self.final_options(options))
    }

    fn final_options(&self, options: Option<&CompileOptions>) -> CompilerOptions {
        match options {
            Some(layer) => self.base_options.with_overrides(layer),
            None => self.base_options.clone(),
        }
    }

    fn compile_with(&self, template: &str, final_options: CompilerOptions) -> CompiledResult {
        let mut errors = Vec::new();
        let mut tips = Vec::new();
        let custom_warn = final_options.warn.clone();
        let mut collect = |msg: String, tip: bool| match &custom_warn {
            Some(warn) => warn(&msg, tip),
            None if tip => tips.push(msg),
            None => errors.push(msg),
        };

        let compiled = (self.base_compile)(template, &final_options, &mut collect);
        // detector findings bypass a custom `warn`
        if cfg!(debug_assertions) {
            errors.extend(detect_errors(&compiled.ast));
        }

        debug!(
            errors = errors.len(),
            tips = tips.len(),
            static_roots = compiled.static_render_fns.len(),
            "compiled template"
        );
        CompiledResult {
            ast: compiled.ast,
            render: compiled.render,
            static_render_fns: compiled.static_render_fns,
            errors,
            tips,
        }
    }

    /// Compiles once per template and delimiter pair, reporting diagnostics
    /// through the options' `warn` or the log.
    pub fn compile_to_functions(
        &self,
        template: &str,
        options: Option<&CompileOptions>,
    ) -> Rc<CompiledFunctions> {
        let mut final_options = self.final_options(options);
        let key = match &final_options.delimiters {
            Some((open, close)) => format!("{open},{close}{template}"),
            None => template.to_string(),
        };
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Rc::clone(hit);
        }

        let report = final_options.warn.take();
        let compiled = self.compile_with(template, final_options);

        if cfg!(debug_assertions) {
            if !compiled.errors.is_empty() {
                let list = compiled
                    .errors
                    .iter()
                    .map(|e| format!("- {e}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let msg = format!("Error compiling template:\n\n{template}\n\n{list}\n");
                match &report {
                    Some(report) => report(&msg, false),
                    None => warn!("{msg}"),
                }
            }
            for tip in &compiled.tips {
                match &report {
                    Some(report) => report(tip, true),
                    None => info!("{tip}"),
                }
            }
        }

        let functions = Rc::new(CompiledFunctions {
            render: compiled.render,
            static_render_fns: compiled.static_render_fns,
        });
        self.cache.borrow_mut().insert(key, Rc::clone(&functions));
        functions
    }
}
