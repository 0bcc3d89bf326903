//! Loading and parsing Go packages.
//!
//! A package is given either as a directory or as an import path resolved with `go list`. Each
//! source file is parsed with [tree-sitter](https://tree-sitter.github.io) into [ast](crate::ast)
//! types.

use crate::ast::ChanDir;
use crate::ast::Decl;
use crate::ast::Field;
use crate::ast::FuncDecl;
use crate::ast::GenDecl;
use crate::ast::GenKind;
use crate::ast::Import;
use crate::ast::InterfaceElem;
use crate::ast::Package;
use crate::ast::SourceFile;
use crate::ast::StructField;
use crate::ast::TypeExpr;
use crate::Error;
use crate::ErrorSource;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use tree_sitter::Node;
use tree_sitter::Parser;
use tree_sitter::Tree;

const GO_MOD: &str = "go.mod";

impl Package {
    /// Loads a package from a directory, or from a Go import path if no such directory exists.
    pub fn load(path: &str) -> Result<Self, Error> {
        let dir = Path::new(path);
        if dir.is_dir() {
            Self::load_dir(dir)
        } else {
            Self::load_import_path(path)
        }
    }

    /// Loads all non-test Go files in a directory.
    ///
    /// The import path is derived from the nearest `go.mod`.
    pub fn load_dir(dir: &Path) -> Result<Self, Error> {
        let import_path = find_import_path(dir)?;
        let paths = list_go_files(dir)?;
        Self::load_files(import_path, dir.to_owned(), paths)
    }

    fn load_import_path(import_path: &str) -> Result<Self, Error> {
        let listed = go_list(import_path)?;
        if let Some(err) = listed.error {
            return Err(Error::new(&listed.dir, ErrorSource::Locate(err.err)));
        }
        let paths = listed.source_paths();
        let package = Self::load_files(listed.import_path, listed.dir, paths)?;
        if package.name != listed.name {
            return Err(Error::new(
                &package.dir,
                ErrorSource::PackageMismatch {
                    expected: listed.name,
                    found: package.name,
                },
            ));
        }
        Ok(package)
    }

    fn load_files(import_path: String, dir: PathBuf, paths: Vec<PathBuf>) -> Result<Self, Error> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            log::debug!("Reading `{}`", path.display());
            let source = std::fs::read_to_string(&path)
                .map_err(|err| Error::new(&path, ErrorSource::ReadSource(err)))?;
            sources.push((path, source));
        }
        Self::parse(import_path, dir, sources)
    }

    /// Parses in-memory source files as one package.
    ///
    /// Files are kept in the given order. All of them must declare the same package name.
    pub fn parse(
        import_path: String,
        dir: PathBuf,
        sources: impl IntoIterator<Item = (PathBuf, String)>,
    ) -> Result<Self, Error> {
        let mut parser = go_parser().map_err(|err| Error::new(&dir, err))?;
        let mut name = Option::<String>::None;
        let mut files = Vec::new();
        for (path, source) in sources {
            let (package_name, file) = parse_file(&mut parser, path, &source)?;
            match &name {
                Some(expected) if expected != &package_name => {
                    return Err(Error::new(
                        &file.path,
                        ErrorSource::PackageMismatch {
                            expected: expected.clone(),
                            found: package_name,
                        },
                    ));
                }
                Some(_) => {}
                None => name = Some(package_name),
            }
            files.push(file);
        }

        let name = name.ok_or_else(|| {
            Error::new(&dir, ErrorSource::Locate("No Go source files".into()))
        })?;
        Ok(Self {
            name,
            import_path,
            dir,
            files,
        })
    }
}

pub(crate) fn go_parser() -> Result<Parser, ErrorSource> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(ErrorSource::Grammar)?;
    Ok(parser)
}

/// Line and column (both 1-based) of the first syntax error in a tree.
pub(crate) fn syntax_error(tree: &Tree) -> Option<(usize, usize)> {
    fn find(node: Node) -> Option<Node> {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            return None;
        }
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).find_map(find);
        found.or(Some(node))
    }
    find(tree.root_node()).map(|node| {
        let position = node.start_position();
        (position.row + 1, position.column + 1)
    })
}

/// Parses a source file, returning the package name in its package clause.
fn parse_file(
    parser: &mut Parser,
    path: PathBuf,
    source: &str,
) -> Result<(String, SourceFile), Error> {
    let tree = parser
        .parse(source, None)
        .ok_or(ErrorSource::Parse { line: 1, column: 1 })
        .map_err(|err| Error::new(&path, err))?;
    if let Some((line, column)) = syntax_error(&tree) {
        return Err(Error::new(&path, ErrorSource::Parse { line, column }));
    }

    let mut package = Option::<String>::None;
    let mut imports = Vec::<Import>::new();
    let mut decls = Vec::<Decl>::new();
    let mut aliases = BTreeMap::<String, TypeExpr>::new();

    let mut comments = Vec::<Node>::new();
    let mut previous_end = Option::<usize>::None;

    let root = tree.root_node();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        let line = node.start_position().row + 1;
        if node.kind() == "comment" {
            // Trailing comments belong to the previous declaration.
            if previous_end != Some(node.start_position().row) {
                if let Some(last) = comments.last() {
                    if node.start_position().row > last.end_position().row + 1 {
                        comments.clear();
                    }
                }
                comments.push(node);
            }
            continue;
        }

        let doc = doc_comment(&comments, node, source);
        comments.clear();
        previous_end = Some(node.end_position().row);

        match node.kind() {
            "package_clause" => {
                package = node
                    .named_child(0)
                    .map(|name| text(name, source).to_owned());
            }
            "import_declaration" => {
                parse_imports(node, source, &mut imports);
                decls.push(Decl::Gen(GenDecl {
                    kind: GenKind::Import,
                    line,
                }));
            }
            "function_declaration" | "method_declaration" => {
                let func = parse_func(node, source, doc, &imports).map_err(|err| {
                    let name = node
                        .child_by_field_name("name")
                        .map(|name| text(name, source))
                        .unwrap_or_default();
                    Error::new(&path, err).with_decl(name)
                })?;
                decls.push(Decl::Func(func));
            }
            "type_declaration" => {
                parse_aliases(node, source, &imports, &mut aliases)
                    .map_err(|err| Error::new(&path, err))?;
                decls.push(Decl::Gen(GenDecl {
                    kind: GenKind::Type,
                    line,
                }));
            }
            "const_declaration" => decls.push(Decl::Gen(GenDecl {
                kind: GenKind::Const,
                line,
            })),
            "var_declaration" => decls.push(Decl::Gen(GenDecl {
                kind: GenKind::Var,
                line,
            })),
            kind => decls.push(Decl::Unsupported {
                kind: kind.to_owned(),
                line,
            }),
        }
    }

    let package = package
        .ok_or(ErrorSource::Parse { line: 1, column: 1 })
        .map_err(|err| Error::new(&path, err))?;
    Ok((
        package,
        SourceFile {
            path,
            imports,
            decls,
            aliases,
        },
    ))
}

/// The comments directly above `node`, without a blank line in between.
fn doc_comment(comments: &[Node], node: Node, source: &str) -> Option<Vec<String>> {
    let last = comments.last()?;
    if last.end_position().row + 1 != node.start_position().row {
        return None;
    }
    Some(
        comments
            .iter()
            .map(|comment| text(*comment, source).to_owned())
            .collect(),
    )
}

fn parse_imports(node: Node, source: &str, imports: &mut Vec<Import>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => imports.extend(parse_import_spec(child, source)),
            "import_spec_list" => parse_imports(child, source, imports),
            _ => {}
        }
    }
}

fn parse_import_spec(node: Node, source: &str) -> Option<Import> {
    let path = text(node.child_by_field_name("path")?, source)
        .trim_matches(|c| c == '"' || c == '`')
        .to_owned();
    let name = match node.child_by_field_name("name") {
        Some(name) => text(name, source).to_owned(),
        None => guess_package_name(&path),
    };
    Some(Import { name, path })
}

/// The package name of an import without an explicit name.
///
/// The real name is only known after loading the imported package. The convention of naming a
/// package after the last element of its path is assumed, skipping major version suffixes and a
/// `go-` prefix.
pub fn guess_package_name(import_path: &str) -> String {
    let mut elements = import_path.rsplit('/');
    let mut last = elements.next().unwrap_or_default();
    if is_major_version(last) {
        if let Some(previous) = elements.next() {
            last = previous;
        }
    }
    let last = match last.rsplit_once('.') {
        Some((base, version)) if is_major_version(version) => base,
        _ => last,
    };
    last.trim_start_matches("go-").replace(['-', '.'], "_")
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn parse_aliases(
    node: Node,
    source: &str,
    imports: &[Import],
    aliases: &mut BTreeMap<String, TypeExpr>,
) -> Result<(), ErrorSource> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "type_alias" {
            let name = text(field(child, "name")?, source).to_owned();
            let ty = type_expr(field(child, "type")?, source, imports)?;
            aliases.insert(name, ty);
        }
    }
    Ok(())
}

fn parse_func(
    node: Node,
    source: &str,
    doc: Option<Vec<String>>,
    imports: &[Import],
) -> Result<FuncDecl, ErrorSource> {
    let receiver = match node.child_by_field_name("receiver") {
        Some(list) => Some(parse_fields(list, source, imports)?),
        None => None,
    };
    let results = parse_results(node, source, imports)?;
    Ok(FuncDecl {
        name: text(field(node, "name")?, source).to_owned(),
        receiver,
        type_params: node
            .child_by_field_name("type_parameters")
            .map(|params| text(params, source).to_owned()),
        params: parse_fields(field(node, "parameters")?, source, imports)?,
        results,
        doc,
        line: node.start_position().row + 1,
    })
}

/// Results of a function, function type or interface method.
fn parse_results(node: Node, source: &str, imports: &[Import]) -> Result<Vec<Field>, ErrorSource> {
    match node.child_by_field_name("result") {
        None => Ok(Vec::new()),
        Some(list) if list.kind() == "parameter_list" => parse_fields(list, source, imports),
        Some(ty) => Ok(vec![Field {
            names: Vec::new(),
            ty: type_expr(ty, source, imports)?,
            variadic: false,
        }]),
    }
}

fn parse_fields(list: Node, source: &str, imports: &[Import]) -> Result<Vec<Field>, ErrorSource> {
    let mut fields = Vec::new();
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        let variadic = match child.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let mut names_cursor = child.walk();
        let names = child
            .children_by_field_name("name", &mut names_cursor)
            .map(|name| text(name, source).to_owned())
            .collect();
        fields.push(Field {
            names,
            ty: type_expr(field(child, "type")?, source, imports)?,
            variadic,
        });
    }
    Ok(fields)
}

fn type_expr(node: Node, source: &str, imports: &[Import]) -> Result<TypeExpr, ErrorSource> {
    let boxed = |node: Node| type_expr(node, source, imports).map(Box::new);
    let ty = match node.kind() {
        "type_identifier" => TypeExpr::Name(text(node, source).to_owned()),
        "qualified_type" => {
            let package = text(field(node, "package")?, source).to_owned();
            if !imports.iter().any(|i| i.name == package) {
                return Err(ErrorSource::UnresolvedImport(package));
            }
            TypeExpr::Qualified {
                package,
                name: text(field(node, "name")?, source).to_owned(),
            }
        }
        "pointer_type" => TypeExpr::Pointer(boxed(
            node.named_child(0).ok_or_else(|| malformed(node))?,
        )?),
        "slice_type" => TypeExpr::Slice(boxed(field(node, "element")?)?),
        "array_type" => TypeExpr::Array {
            len: text(field(node, "length")?, source).to_owned(),
            elem: boxed(field(node, "element")?)?,
        },
        "map_type" => TypeExpr::Map {
            key: boxed(field(node, "key")?)?,
            value: boxed(field(node, "value")?)?,
        },
        "channel_type" => {
            let dir = match (node.child(0).map(|n| n.kind()), node.child(1).map(|n| n.kind())) {
                (Some("<-"), _) => ChanDir::Recv,
                (_, Some("<-")) => ChanDir::Send,
                _ => ChanDir::Both,
            };
            TypeExpr::Chan {
                dir,
                elem: boxed(field(node, "value")?)?,
            }
        }
        "function_type" => TypeExpr::Func {
            params: parse_fields(field(node, "parameters")?, source, imports)?,
            results: parse_results(node, source, imports)?,
        },
        "struct_type" => {
            let list = node.named_child(0).ok_or_else(|| malformed(node))?;
            TypeExpr::Struct(parse_struct_fields(list, source, imports)?)
        }
        "interface_type" => {
            let mut elems = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "method_elem" => elems.push(InterfaceElem::Method {
                        name: text(field(child, "name")?, source).to_owned(),
                        params: parse_fields(field(child, "parameters")?, source, imports)?,
                        results: parse_results(child, source, imports)?,
                    }),
                    "type_elem" => elems.push(InterfaceElem::Type(type_elem(child, source, imports)?)),
                    _ => {}
                }
            }
            TypeExpr::Interface(elems)
        }
        "generic_type" => {
            let arguments = field(node, "type_arguments")?;
            let mut cursor = arguments.walk();
            let args = arguments
                .named_children(&mut cursor)
                .filter(|child| child.kind() == "type_elem")
                .map(|child| type_elem(child, source, imports))
                .collect::<Result<_, _>>()?;
            TypeExpr::Generic {
                base: boxed(field(node, "type")?)?,
                args,
            }
        }
        "negated_type" => TypeExpr::Underlying(boxed(
            node.named_child(0).ok_or_else(|| malformed(node))?,
        )?),
        "parenthesized_type" => {
            return type_expr(
                node.named_child(0).ok_or_else(|| malformed(node))?,
                source,
                imports,
            )
        }
        _ => TypeExpr::Verbatim(text(node, source).to_owned()),
    };
    Ok(ty)
}

/// A type argument or interface element: one type or a union of several.
fn type_elem(node: Node, source: &str, imports: &[Import]) -> Result<TypeExpr, ErrorSource> {
    let mut cursor = node.walk();
    let mut terms = node
        .named_children(&mut cursor)
        .map(|term| type_expr(term, source, imports))
        .collect::<Result<Vec<_>, _>>()?;
    match terms.len() {
        0 => Err(malformed(node)),
        1 => Ok(terms.remove(0)),
        _ => Ok(TypeExpr::Union(terms)),
    }
}

fn parse_struct_fields(
    list: Node,
    source: &str,
    imports: &[Import],
) -> Result<Vec<StructField>, ErrorSource> {
    let mut fields = Vec::new();
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        if child.kind() != "field_declaration" {
            continue;
        }
        let mut names_cursor = child.walk();
        let names = child
            .children_by_field_name("name", &mut names_cursor)
            .map(|name| text(name, source).to_owned())
            .collect::<Vec<_>>();
        let mut ty = type_expr(field(child, "type")?, source, imports)?;

        // Embedded `*T` keeps the star outside of the type node.
        let mut tokens = child.walk();
        let embedded_pointer =
            names.is_empty() && child.children(&mut tokens).any(|token| token.kind() == "*");
        if embedded_pointer {
            ty = TypeExpr::Pointer(Box::new(ty));
        }

        fields.push(StructField {
            names,
            ty,
            tag: child
                .child_by_field_name("tag")
                .map(|tag| text(tag, source).to_owned()),
        });
    }
    Ok(fields)
}

fn field<'t>(node: Node<'t>, name: &str) -> Result<Node<'t>, ErrorSource> {
    node.child_by_field_name(name)
        .ok_or_else(|| malformed(node))
}

fn malformed(node: Node) -> ErrorSource {
    let position = node.start_position();
    ErrorSource::Parse {
        line: position.row + 1,
        column: position.column + 1,
    }
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Output of `go list -json`.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListPackage {
    dir: PathBuf,
    import_path: String,
    name: String,

    #[serde(default)]
    go_files: Vec<String>,

    /// Files importing `"C"`.
    #[serde(default)]
    cgo_files: Vec<String>,

    error: Option<GoListError>,
}

impl GoListPackage {
    /// Every file making up the package, cgo files last.
    fn source_paths(&self) -> Vec<PathBuf> {
        self.go_files
            .iter()
            .chain(self.cgo_files.iter())
            .map(|file| self.dir.join(file))
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListError {
    err: String,
}

fn go_list(import_path: &str) -> Result<GoListPackage, Error> {
    log::info!("Locating package `{}`", import_path);
    let path = Path::new(import_path);
    let output = Command::new("go")
        .args(["list", "-json", "--", import_path])
        .output()
        .map_err(|err| Error::new(path, ErrorSource::GoList(err)))?;
    if !output.status.success() {
        let message = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        return Err(Error::new(path, ErrorSource::Locate(message)));
    }
    serde_json::from_slice(&output.stdout)
        .map_err(|err| Error::new(path, ErrorSource::GoListOutput(err)))
}

/// Derives the import path of a package directory from the nearest `go.mod`.
fn find_import_path(dir: &Path) -> Result<String, Error> {
    let dir = dir
        .canonicalize()
        .map_err(|err| Error::new(dir, ErrorSource::ReadSource(err)))?;
    for root in dir.ancestors() {
        let go_mod = root.join(GO_MOD);
        if !go_mod.is_file() {
            continue;
        }
        let raw = std::fs::read_to_string(&go_mod)
            .map_err(|err| Error::new(&go_mod, ErrorSource::ReadSource(err)))?;
        let module = module_path(&raw).ok_or_else(|| {
            Error::new(
                &go_mod,
                ErrorSource::Locate("No module directive".into()),
            )
        })?;
        let relative = dir
            .strip_prefix(root)
            .unwrap_or_else(|_| Path::new(""))
            .iter()
            .map(|element| element.to_string_lossy());
        return Ok(std::iter::once(module.into())
            .chain(relative)
            .collect::<Vec<_>>()
            .join("/"));
    }
    Err(Error::new(
        &dir,
        ErrorSource::Locate(format!("No `{}` found", GO_MOD)),
    ))
}

/// The module path in the `module` directive of a `go.mod`.
fn module_path(go_mod: &str) -> Option<&str> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.split("//").next()?.trim().trim_matches('"');
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

/// Non-test Go files of a directory, sorted by file name.
fn list_go_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries =
        std::fs::read_dir(dir).map_err(|err| Error::new(dir, ErrorSource::ReadSource(err)))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| Error::new(dir, ErrorSource::ReadSource(err)))?
            .path();
        let is_source = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(".go") && !name.ends_with("_test.go"))
            .unwrap_or(false);
        if is_source && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
