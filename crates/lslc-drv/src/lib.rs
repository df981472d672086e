//! lslc-drv - Compiler driver
//!
//! Orchestrates the pipeline: forward pre-scan and parse, constant
//! folding with the library-call rewrites, dead code removal, the last
//! pass, the optional renamer, and emission. Each compilation is an
//! independent session; passes within a session run strictly in this
//! order because each depends on the annotations of the previous one.
//! The first error aborts the session.

use lslc_lang::{builtin_library, Library};
use lslc_opt::OptimizerInfo;
use lslc_par::{Parser, Script};
use lslc_util::{CompileError, Options};
use tracing::debug;

/// Everything a compilation produces beyond the output source.
#[derive(Debug)]
pub struct Compilation {
    pub output: String,
    pub script: Script,
    pub info: OptimizerInfo,
    /// Options as they stand after inline pragmas.
    pub opts: Options,
}

/// Compile LSL source to optimized LSL source using the builtin
/// library tables.
pub fn compile(src: &str, opts: Options, filename: &str) -> Result<Compilation, CompileError> {
    compile_with_library(src, opts, filename, builtin_library())
}

/// Compile against caller-provided library metadata.
pub fn compile_with_library(
    src: &str,
    opts: Options,
    filename: &str,
    lib: &Library,
) -> Result<Compilation, CompileError> {
    let (mut script, opts) = Parser::parse(src, opts, lib, filename)?;
    debug!(
        items = script.tree.len(),
        scopes = script.symtab.scopes.len(),
        "parse complete"
    );

    let info = lslc_opt::optimize(&mut script, &opts, lib);
    debug!(
        items = script.tree.len(),
        used_lib_funcs = info.used_lib_funcs.len(),
        "optimization complete"
    );

    let output = lslc_out::emit_script(&script);
    debug!(bytes = output.len(), "emission complete");

    Ok(Compilation {
        output,
        script,
        info,
        opts,
    })
}
