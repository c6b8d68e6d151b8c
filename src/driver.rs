//! Driver orchestrating the compilation pipeline.

use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::codegen::{CEmitter, DumpWriter, ImportEmitter};
use crate::diagnostics::{BuildError, Failure, Severity};
use crate::parser;
use crate::semantic;

/// Compilation options, mirroring the command line surface
#[derive(Debug, Clone)]
pub struct Options {
    pub source: PathBuf,
    pub output_file: Option<PathBuf>,
    pub output_import_file: Option<PathBuf>,
    pub verbose: bool,
    pub dump_ast: bool,
    pub warn_error: bool,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Arg(String),
    #[error("{}", .error.summary())]
    Build {
        error: BuildError,
        /// Failures rendered with resolved source positions
        rendered: Vec<String>,
    },
    #[error("{0}")]
    Io(String),
}

/// Validate the source path and fill in default output locations.
pub fn check_arguments(opts: &mut Options) -> Result<(), DriverError> {
    if opts.source.extension().map_or(true, |ext| ext != "eh") {
        return Err(DriverError::Arg(format!(
            "{}: not an ehlit source file",
            opts.source.display()
        )));
    }
    if !opts.source.is_file() {
        return Err(DriverError::Arg(format!(
            "{}: no such file or directory",
            opts.source.display()
        )));
    }
    let stem = opts.source.file_stem().unwrap_or_default().to_string_lossy().to_string();
    if opts.output_file.is_none() {
        opts.output_file = Some(PathBuf::from(format!("out/src/{}.c", stem)));
    }
    if opts.output_import_file.is_none() {
        opts.output_import_file = Some(PathBuf::from(format!("out/include/{}.eh", stem)));
    }
    for out in [&opts.output_file, &opts.output_import_file].into_iter().flatten() {
        if out.as_os_str() != "-" {
            if let Some(dir) = out.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)
                        .map_err(|e| DriverError::Io(format!("{}: {}", dir.display(), e)))?;
                }
            }
        }
    }
    Ok(())
}

/// Build a source file to its C and import outputs.
pub fn build(opts: &mut Options) -> Result<(), DriverError> {
    check_arguments(opts)?;
    let output_file = opts.output_file.clone().expect("defaulted");
    let output_import_file = opts.output_import_file.clone().expect("defaulted");
    debug!("building {} to {}", opts.source.display(), output_file.display());

    let mut ast = parser::parse_file(&opts.source).map_err(|error| DriverError::Build {
        rendered: error.failures.iter().map(|f| format!("{}", f.severity_line())).collect(),
        error,
    })?;

    let import_paths = compute_import_paths(&opts.source, &output_import_file);
    let build_result = semantic::build_ast(&mut ast, import_paths);

    if opts.dump_ast || opts.verbose {
        let dump = DumpWriter::new(&ast).dump();
        if opts.dump_ast {
            eprintln!("{}", dump);
        } else {
            for line in dump.lines() {
                debug!("{}", line);
            }
        }
    }

    if let Err(error) = &build_result {
        let max = error.max_severity();
        let blocking = max > Severity::Warning || (opts.warn_error && max == Severity::Warning);
        if blocking {
            let rendered = render_failures(&ast, &error.failures);
            return Err(DriverError::Build { error: BuildError::new(error.failures.clone()), rendered });
        }
    }

    let c_source = CEmitter::new(&ast).emit();
    write_output(&output_file, &c_source)?;
    let import_source = ImportEmitter::new(&ast).emit();
    write_output(&output_import_file, &import_source)?;

    if let Err(error) = build_result {
        let rendered = render_failures(&ast, &error.failures);
        return Err(DriverError::Build { error, rendered });
    }
    Ok(())
}

fn compute_import_paths(source: &Path, output_import_file: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let src_dir = source.parent().map(Path::to_path_buf).unwrap_or_default();
    paths.push(if src_dir.as_os_str().is_empty() { PathBuf::from(".") } else { src_dir });
    paths.push(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    if let Some(dir) = output_import_file.parent() {
        if !dir.as_os_str().is_empty() {
            paths.push(dir.to_path_buf());
        }
    }
    paths
}

fn render_failures(ast: &parser::ast::Ast, failures: &[Failure]) -> Vec<String> {
    failures.iter().map(|f| f.display(&ast.sources)).collect()
}

fn write_output(path: &Path, contents: &str) -> Result<(), DriverError> {
    if path.as_os_str() == "-" {
        print!("{}", contents);
        return Ok(());
    }
    std::fs::write(path, contents).map_err(|e| DriverError::Io(format!("{}: {}", path.display(), e)))
}

impl Failure {
    fn severity_line(&self) -> String {
        format!("{}:@{}: {}: {}", self.file, self.pos, self.severity, self.msg)
    }
}

/// Everything one compilation produced
#[derive(Debug)]
pub struct CompileOutput {
    pub c_source: String,
    pub import_source: String,
    pub dump: String,
    /// Non-blocking failures recorded during the build
    pub failures: Vec<Failure>,
}

/// In-memory compilation front, used by tests and embedders.
pub struct Driver {
    file: String,
    source: String,
    import_paths: Vec<PathBuf>,
}

impl Driver {
    pub fn new(file: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            source: source.into(),
            import_paths: vec![PathBuf::from(".")],
        }
    }

    /// Additional directories searched by import statements
    pub fn with_import_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.import_paths.insert(0, path.into());
        self
    }

    /// Run the pipeline; errors abort, warnings are carried in the output.
    pub fn compile(&self) -> Result<CompileOutput, BuildError> {
        let mut ast = parser::parse_source(&self.file, &self.source)?;
        let result = semantic::build_ast(&mut ast, self.import_paths.clone());
        if let Err(error) = result {
            if error.max_severity() > Severity::Warning {
                return Err(error);
            }
        }
        let failures = ast.failures.clone();
        Ok(CompileOutput {
            c_source: CEmitter::new(&ast).emit(),
            import_source: ImportEmitter::new(&ast).emit(),
            dump: DumpWriter::new(&ast).dump(),
            failures,
        })
    }
}
