//! Repo-local lint guarding the storefront's layer boundaries.
//!
//! The backend is one crate split into layers by top-level module: `domain`
//! (rules and ports), `inbound` and `outbound` (adapters), plus the
//! `middleware` and `config` support modules. Each layer has a fixed list of
//! sibling modules and external crates it may not reach. On top of the
//! import rules, every driven port trait under `domain/ports` must take the
//! caller's `&OrganizationId` as its first argument, so an adapter can never
//! be asked for data without a tenant.
//!
//! Run it with `cargo run -p architecture-lint [BACKEND_DIR]`.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Library name of the linted crate, as written in absolute paths.
const CRATE_NAME: &str = "storefront";

/// Type every driven port method must take first.
const TENANT_ARGUMENT: &str = "OrganizationId";

/// Trait name suffixes that mark a driven port.
const DRIVEN_PORT_SUFFIXES: [&str; 3] = ["Repository", "Catalogue", "Dispatcher"];

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: PathBuf,
    /// What the file did wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Ways the lint can fail.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// Reading the source tree failed.
    Io(io::Error),
    /// A file is unparseable or sits outside every known layer.
    Parse {
        /// Offending file, relative to `backend/src`.
        file: PathBuf,
        /// Parser or layer-inference message.
        message: String,
    },
    /// The tree breaks one or more rules.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read backend sources: {err}"),
            Self::Parse { file, message } => {
                write!(f, "cannot lint {}: {message}", file.display())
            }
            Self::Violations(violations) => {
                writeln!(f, "{} layer rule violation(s):", violations.len())?;
                for violation in violations {
                    writeln!(f, "  {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse { .. } | Self::Violations(_) => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust source file to lint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    /// File contents.
    pub contents: String,
}

/// Top-level module a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
    Middleware,
    Config,
}

/// Modules and crates one layer must stay away from.
struct LayerRule {
    name: &'static str,
    forbidden_modules: &'static [&'static str],
    forbidden_crates: &'static [&'static str],
}

const RULES: [LayerRule; 5] = [
    LayerRule {
        name: "domain",
        forbidden_modules: &["inbound", "outbound", "middleware", "config"],
        forbidden_crates: &[
            "actix",
            "actix_service",
            "actix_session",
            "actix_web",
            "actix_web_prom",
            "prometheus",
            "utoipa",
            "utoipa_swagger_ui",
            "ortho_config",
            "tracing_subscriber",
        ],
    },
    LayerRule {
        name: "inbound",
        forbidden_modules: &["outbound", "config"],
        forbidden_crates: &[
            "actix_web_prom",
            "prometheus",
            "ortho_config",
            "tracing_subscriber",
        ],
    },
    LayerRule {
        name: "outbound",
        forbidden_modules: &["inbound", "middleware", "config"],
        forbidden_crates: &[
            "actix",
            "actix_service",
            "actix_session",
            "actix_web",
            "utoipa",
            "ortho_config",
        ],
    },
    LayerRule {
        name: "middleware",
        forbidden_modules: &["inbound", "outbound", "config"],
        forbidden_crates: &["utoipa", "prometheus", "ortho_config"],
    },
    LayerRule {
        name: "config",
        forbidden_modules: &["inbound", "outbound", "middleware"],
        forbidden_crates: &["actix_session", "utoipa", "prometheus"],
    },
];

/// Modules that count as internal roots when written without a prefix.
const LAYER_MODULES: [&str; 5] = ["domain", "inbound", "outbound", "middleware", "config"];

impl Layer {
    /// Layer of a path such as `domain/loyalty/mod.rs` or `config.rs`.
    fn of(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?.as_os_str().to_str()?;
        let module = first.strip_suffix(".rs").unwrap_or(first);
        match module {
            "domain" => Some(Self::Domain),
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            "middleware" => Some(Self::Middleware),
            "config" => Some(Self::Config),
            _ => None,
        }
    }

    fn rule(self) -> &'static LayerRule {
        match self {
            Self::Domain => &RULES[0],
            Self::Inbound => &RULES[1],
            Self::Outbound => &RULES[2],
            Self::Middleware => &RULES[3],
            Self::Config => &RULES[4],
        }
    }
}

/// Lint every layer under `backend_dir/src`.
///
/// Files outside the layers (`lib.rs`, `main.rs`, `server/`, `bin/`) wire
/// everything together and are not checked.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = backend_dir.join("src");
    let mut sources = Vec::new();
    for module in LAYER_MODULES {
        let dir = src_dir.join(module);
        if dir.is_dir() {
            read_tree(&src_dir, &dir, &mut sources)?;
        }
        let file = src_dir.join(format!("{module}.rs"));
        if file.is_file() {
            sources.push(read_source(&src_dir, &file)?);
        }
    }
    sources.sort_by(|a, b| a.file.cmp(&b.file));
    lint_sources(&sources)
}

/// Lint already-loaded sources. Every file must sit inside a layer.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is not inside a known layer".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        let mut messages = import_violations(layer.rule(), &parsed);
        if is_port_file(&source.file) {
            messages.extend(tenant_scoping_violations(&parsed));
        }
        violations.extend(messages.into_iter().map(|message| Violation {
            file: source.file.clone(),
            message,
        }));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

fn is_port_file(file: &Path) -> bool {
    file.starts_with(Path::new("domain").join("ports"))
}

fn import_violations(rule: &LayerRule, parsed: &syn::File) -> BTreeSet<String> {
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        match classify(segments) {
            Some(PathRoot::Module(module)) if rule.forbidden_modules.contains(&module) => {
                messages.insert(format!("{} must not reach crate::{module}", rule.name));
            }
            Some(PathRoot::Crate(name)) if rule.forbidden_crates.contains(&name) => {
                messages.insert(format!("{} must not use crate `{name}`", rule.name));
            }
            _ => {}
        }
    }
    messages
}

/// What a path starts from.
enum PathRoot<'a> {
    /// A top-level module of the linted crate.
    Module(&'a str),
    /// An external crate.
    Crate(&'a str),
}

fn classify(segments: &[String]) -> Option<PathRoot<'_>> {
    let first = segments.first()?.as_str();
    if segments.len() > 1 && LAYER_MODULES.contains(&first) {
        return Some(PathRoot::Module(first));
    }
    match first {
        "crate" | "self" | "super" => segments
            .iter()
            .map(String::as_str)
            .find(|segment| !matches!(*segment, "crate" | "self" | "super"))
            .map(PathRoot::Module),
        CRATE_NAME => segments.get(1).map(|segment| PathRoot::Module(segment.as_str())),
        _ => Some(PathRoot::Crate(first)),
    }
}

fn tenant_scoping_violations(parsed: &syn::File) -> BTreeSet<String> {
    let mut messages = BTreeSet::new();
    for item in &parsed.items {
        let syn::Item::Trait(port) = item else {
            continue;
        };
        let name = port.ident.to_string();
        if !DRIVEN_PORT_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
        {
            continue;
        }
        for member in &port.items {
            let syn::TraitItem::Fn(method) = member else {
                continue;
            };
            if !takes_tenant_first(&method.sig) {
                messages.insert(format!(
                    "driven port `{name}::{}` must take `&{TENANT_ARGUMENT}` first",
                    method.sig.ident
                ));
            }
        }
    }
    messages
}

fn takes_tenant_first(sig: &syn::Signature) -> bool {
    let first = sig.inputs.iter().find_map(|input| match input {
        syn::FnArg::Typed(typed) => Some(typed.ty.as_ref()),
        syn::FnArg::Receiver(_) => None,
    });
    let Some(syn::Type::Reference(reference)) = first else {
        return false;
    };
    let syn::Type::Path(path) = reference.elem.as_ref() else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == TENANT_ARGUMENT)
}

/// Every path a file mentions, through `use` trees or inline.
#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn walk_use(&mut self, tree: &syn::UseTree, prefix: &mut Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.walk_use(&path.tree, prefix);
                prefix.pop();
            }
            syn::UseTree::Name(syn::UseName { ident })
            | syn::UseTree::Rename(syn::UseRename { ident, .. }) => {
                let mut full = prefix.clone();
                full.push(ident.to_string());
                self.paths.insert(full);
            }
            syn::UseTree::Glob(_) => {
                let mut full = prefix.clone();
                full.push("*".to_owned());
                self.paths.insert(full);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.walk_use(item, prefix);
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.walk_use(&node.tree, &mut Vec::new());
    }
}

fn read_tree(
    src_root: &Path,
    dir: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            read_tree(src_root, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            sources.push(read_source(src_root, &path)?);
        }
    }
    Ok(())
}

fn read_source(src_root: &Path, path: &Path) -> Result<LintSource, ArchitectureLintError> {
    let file = path
        .strip_prefix(src_root)
        .map_err(|err| ArchitectureLintError::Parse {
            file: path.to_path_buf(),
            message: err.to_string(),
        })?
        .to_path_buf();
    Ok(LintSource {
        file,
        contents: fs::read_to_string(path)?,
    })
}
