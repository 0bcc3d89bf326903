//! Declarations of a Go package.
//!
//! These types are built once by [load](crate::load) and never mutated afterwards. Synthesized
//! methods borrow parts of them instead of copying.

#[cfg(test)]
pub(crate) mod sample;

use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;
use std::path::PathBuf;
use strum_macros::AsRefStr;

/// Package.
///
/// This is the root of a declaration tree.
#[derive(Debug)]
pub struct Package {
    /// Name in the package clause.
    pub name: String,

    /// Fully qualified import path, used to qualify package-local type names.
    pub import_path: String,

    pub dir: PathBuf,

    /// Source files in visitation order.
    pub files: Vec<SourceFile>,
}

/// Source file.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,

    /// Type aliases (`type A = B`) declared in this file.
    pub aliases: BTreeMap<String, TypeExpr>,
}

impl SourceFile {
    /// Finds the import a package qualifier refers to.
    pub fn import(&self, name: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.name == name)
    }
}

/// Import spec.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Import {
    /// Name the package is referred to in this file: the explicit alias, or the name guessed
    /// from the import path.
    pub name: String,
    pub path: String,
}

/// Top-level declaration.
#[derive(Debug)]
pub enum Decl {
    Func(FuncDecl),
    Gen(GenDecl),

    /// A top-level node that is not a declaration, e.g. a statement.
    Unsupported { kind: String, line: usize },
}

/// Import, constant, variable or type declaration.
#[derive(Debug)]
pub struct GenDecl {
    pub kind: GenKind,
    pub line: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GenKind {
    Import,
    Const,
    Var,
    Type,
}

/// Function or method declaration.
#[derive(Debug, PartialEq)]
pub struct FuncDecl {
    pub name: String,

    /// Receiver list. Absent for free-standing functions.
    pub receiver: Option<Vec<Field>>,

    /// Type parameter list as written, e.g. `[T any]`.
    pub type_params: Option<String>,

    pub params: Vec<Field>,
    pub results: Vec<Field>,

    /// Lines of the doc comment, each including its comment markers.
    pub doc: Option<Vec<String>>,

    pub line: usize,
}

/// Parameter or result slot.
///
/// Several names share one type in a grouped slot (`a, b int`). No names at all means an
/// anonymous slot.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: TypeExpr,

    /// `...T`. [ty](Field::ty) holds `T`.
    pub variadic: bool,
}

impl Field {
    fn write(&self, out: &mut dyn Write, indent: usize) -> fmt::Result {
        if !self.names.is_empty() {
            write!(out, "{} ", self.names.iter().join(", "))?;
        }
        if self.variadic {
            write!(out, "...")?;
        }
        self.ty.write(out, indent)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write(f, 0)
    }
}

/// Type expression.
///
/// [Display] prints it the way gofmt does, regardless of how it was written in the source.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TypeExpr {
    /// `Window`, `int`.
    Name(String),

    /// `unsafe.Pointer`.
    Qualified { package: String, name: String },

    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { len: String, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },

    /// `func(int) bool`.
    Func { params: Vec<Field>, results: Vec<Field> },

    Struct(Vec<StructField>),
    Interface(Vec<InterfaceElem>),

    /// Instantiated generic type, e.g. `List[int]`.
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },

    /// Union of a type set, e.g. `~int | string`.
    Union(Vec<TypeExpr>),

    /// `~int`.
    Underlying(Box<TypeExpr>),

    /// Anything else, kept as written.
    Verbatim(String),
}

impl TypeExpr {
    /// Writes the type starting at the current column of a line indented by `indent` tabs.
    fn write(&self, out: &mut dyn Write, indent: usize) -> fmt::Result {
        match self {
            Self::Name(name) => write!(out, "{}", name),
            Self::Qualified { package, name } => write!(out, "{}.{}", package, name),
            Self::Pointer(elem) => {
                write!(out, "*")?;
                elem.write(out, indent)
            }
            Self::Slice(elem) => {
                write!(out, "[]")?;
                elem.write(out, indent)
            }
            Self::Array { len, elem } => {
                write!(out, "[{}]", len)?;
                elem.write(out, indent)
            }
            Self::Map { key, value } => {
                write!(out, "map[")?;
                key.write(out, indent)?;
                write!(out, "]")?;
                value.write(out, indent)
            }
            Self::Chan { dir, elem } => {
                write!(out, "{}", dir.keyword())?;
                // `chan <-chan T` would parse as `chan<- chan T`.
                let nested_recv = *dir == ChanDir::Both
                    && matches!(**elem, Self::Chan { dir: ChanDir::Recv, .. });
                if nested_recv {
                    write!(out, "(")?;
                    elem.write(out, indent)?;
                    write!(out, ")")
                } else {
                    elem.write(out, indent)
                }
            }
            Self::Func { params, results } => {
                write!(out, "func")?;
                write_signature(out, params, results, indent)
            }
            Self::Struct(fields) => write_struct(out, fields, indent),
            Self::Interface(elems) => write_interface(out, elems, indent),
            Self::Generic { base, args } => {
                base.write(out, indent)?;
                write!(out, "[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(out, ", ")?;
                    }
                    arg.write(out, indent)?;
                }
                write!(out, "]")
            }
            Self::Union(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(out, " | ")?;
                    }
                    term.write(out, indent)?;
                }
                Ok(())
            }
            Self::Underlying(ty) => {
                write!(out, "~")?;
                ty.write(out, indent)
            }
            Self::Verbatim(text) => write!(out, "{}", text),
        }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write(f, 0)
    }
}

/// Field of a struct type. No names means an embedded field.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StructField {
    pub names: Vec<String>,
    pub ty: TypeExpr,

    /// Tag literal as written, including quotes.
    pub tag: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InterfaceElem {
    Method {
        name: String,
        params: Vec<Field>,
        results: Vec<Field>,
    },

    /// Embedded interface or type set, e.g. `fmt.Stringer` or `~int | ~uint`.
    Type(TypeExpr),
}

impl InterfaceElem {
    fn write(&self, out: &mut dyn Write, indent: usize) -> fmt::Result {
        match self {
            Self::Method {
                name,
                params,
                results,
            } => {
                write!(out, "{}", name)?;
                write_signature(out, params, results, indent)
            }
            Self::Type(ty) => ty.write(out, indent),
        }
    }
}

/// Writes a parameter list followed by results, e.g. `(w *int32, h *int32) bool`.
///
/// A single anonymous result goes without parentheses.
pub(crate) fn write_signature(
    out: &mut dyn Write,
    params: &[Field],
    results: &[Field],
    indent: usize,
) -> fmt::Result {
    write!(out, "(")?;
    write_fields(out, params, indent)?;
    write!(out, ")")?;
    match results {
        [] => Ok(()),
        [result] if result.names.is_empty() => {
            write!(out, " ")?;
            result.write(out, indent)
        }
        results => {
            write!(out, " (")?;
            write_fields(out, results, indent)?;
            write!(out, ")")
        }
    }
}

fn write_fields(out: &mut dyn Write, fields: &[Field], indent: usize) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(out, ", ")?;
        }
        field.write(out, indent)?;
    }
    Ok(())
}

/// gofmt keeps a struct or interface with a single short element on one line.
fn one_line(inline: &str) -> bool {
    !inline.contains('\n') && inline.chars().count() < ONE_LINE_MAX
}

const ONE_LINE_MAX: usize = 100;

fn write_struct(out: &mut dyn Write, fields: &[StructField], indent: usize) -> fmt::Result {
    if let [field] = fields {
        if field.tag.is_none() {
            let mut inline = String::new();
            if !field.names.is_empty() {
                write!(inline, "{} ", field.names.iter().join(", "))?;
            }
            field.ty.write(&mut inline, indent)?;
            if one_line(&inline) {
                return write!(out, "struct{{ {} }}", inline);
            }
        }
    } else if fields.is_empty() {
        return write!(out, "struct{{}}");
    }

    let mut lines = Vec::with_capacity(fields.len());
    for field in fields {
        let mut cells = Vec::new();
        if !field.names.is_empty() {
            cells.push(field.names.iter().join(", "));
        }
        let mut ty = String::new();
        field.ty.write(&mut ty, indent + 1)?;
        cells.push(ty);
        cells.extend(field.tag.clone());
        lines.push(cells);
    }
    writeln!(out, "struct {{")?;
    for line in align(&lines) {
        writeln!(out, "{}{}", tabs(indent + 1), line)?;
    }
    write!(out, "{}}}", tabs(indent))
}

fn write_interface(out: &mut dyn Write, elems: &[InterfaceElem], indent: usize) -> fmt::Result {
    match elems {
        [] => return write!(out, "interface{{}}"),
        [elem] => {
            let mut inline = String::new();
            elem.write(&mut inline, indent)?;
            if one_line(&inline) {
                return write!(out, "interface{{ {} }}", inline);
            }
        }
        _ => {}
    }
    writeln!(out, "interface {{")?;
    for elem in elems {
        write!(out, "{}", tabs(indent + 1))?;
        elem.write(out, indent + 1)?;
        writeln!(out)?;
    }
    write!(out, "{}}}", tabs(indent))
}

fn tabs(indent: usize) -> String {
    "\t".repeat(indent)
}

/// Lays out cells in columns padded with spaces, like gofmt does with struct fields.
///
/// The last cell of a line is never padded. A column only spans consecutive lines that have a
/// cell after it.
fn align(lines: &[Vec<String>]) -> Vec<String> {
    let mut widths = lines
        .iter()
        .map(|cells| vec![0; cells.len()])
        .collect::<Vec<_>>();
    align_column(lines, &mut widths, 0..lines.len(), 0);
    lines
        .iter()
        .zip(widths)
        .map(|(cells, widths)| {
            let mut line = String::new();
            for (cell, width) in cells.iter().zip(widths) {
                line.push_str(cell);
                let padding = width.saturating_sub(cell_width(cell));
                line.extend(std::iter::repeat(' ').take(padding));
            }
            line.truncate(line.trim_end().len());
            line
        })
        .collect()
}

fn align_column(
    lines: &[Vec<String>],
    widths: &mut [Vec<usize>],
    range: std::ops::Range<usize>,
    column: usize,
) {
    let mut start = range.start;
    while start < range.end {
        if lines[start].len() <= column + 1 {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < range.end && lines[end].len() > column + 1 {
            end += 1;
        }
        let width = lines[start..end]
            .iter()
            .map(|cells| cell_width(&cells[column]))
            .max()
            .unwrap_or_default()
            + 1;
        for row in widths[start..end].iter_mut() {
            row[column] = width;
        }
        align_column(lines, widths, start..end, column + 1);
        start = end;
    }
}

/// Width of the first line of a cell.
fn cell_width(cell: &str) -> usize {
    cell.lines().next().unwrap_or_default().chars().count()
}

/// Direction of a channel type.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

impl ChanDir {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Both => "chan ",
            Self::Send => "chan<- ",
            Self::Recv => "<-chan ",
        }
    }
}
