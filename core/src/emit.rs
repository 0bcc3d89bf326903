//! Rendering and writing generated code.

use crate::ast;
use crate::load;
use crate::synth::MethodDecl;
use crate::synth::Stmt;
use crate::Error;
use crate::ErrorSource;
use itertools::Itertools;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// First line of every generated file.
pub const HEADER: &str = r#"// Code generated by "genmethods"; DO NOT EDIT."#;

static KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Everything generated for one package.
pub struct OutputUnit<'a> {
    /// Package name for the package clause.
    pub package: String,

    /// Directory of the package, for error reports.
    pub dir: PathBuf,

    pub methods: Vec<MethodDecl<'a>>,
}

/// Renders an [OutputUnit] as a gofmt-formatted Go source file.
///
/// The result is parsed again to make sure it is valid Go.
pub fn render(unit: &OutputUnit) -> Result<String, Error> {
    let mut output = String::new();
    writeln!(output, "{}", HEADER)
        .and_then(|_| writeln!(output))
        .and_then(|_| writeln!(output, "package {}", unit.package))
        .map_err(|err| Error::new(&unit.dir, ErrorSource::Render(err.to_string())))?;
    for method in unit.methods.iter() {
        output.push('\n');
        write_method(&mut output, method)
            .map_err(|err| Error::new(&unit.dir, err).with_decl(&method.name))?;
    }
    verify(&output).map_err(|err| Error::new(&unit.dir, err))?;
    Ok(output)
}

fn write_method(output: &mut String, method: &MethodDecl) -> Result<(), ErrorSource> {
    let call = method.body.call();
    for ident in [method.receiver.name, method.name.as_str(), call.callee]
        .into_iter()
        .chain(call.args.iter().copied())
    {
        check_identifier(ident)?;
    }

    let ellipsis = if call.ellipsis { "..." } else { "" };
    let call = format!("{}({}{})", call.callee, call.args.iter().join(", "), ellipsis);
    let stmt = match &method.body {
        Stmt::Return(_) => format!("return {}", call),
        Stmt::Expr(_) => call,
    };

    let render_err = |err: std::fmt::Error| ErrorSource::Render(err.to_string());
    for line in method.doc.iter() {
        writeln!(output, "{}", line).map_err(render_err)?;
    }
    write!(
        output,
        "func ({} {}) {}",
        method.receiver.name, method.receiver.ty, method.name
    )
    .and_then(|_| ast::write_signature(&mut *output, method.params, method.results, 0))
    .and_then(|_| writeln!(output, " {{"))
    .map_err(render_err)?;
    writeln!(output, "\t{}", stmt).map_err(render_err)?;
    writeln!(output, "}}").map_err(render_err)
}

fn check_identifier(ident: &str) -> Result<(), ErrorSource> {
    let mut chars = ident.chars();
    let valid = chars
        .next()
        .map(|c| c == '_' || c.is_alphabetic())
        .unwrap_or(false)
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && !KEYWORDS.contains(&ident);
    if valid {
        Ok(())
    } else {
        Err(ErrorSource::Render(format!(
            "`{}` is not a valid identifier",
            ident
        )))
    }
}

fn verify(output: &str) -> Result<(), ErrorSource> {
    let tree = load::go_parser()?
        .parse(output, None)
        .ok_or(ErrorSource::Format { line: 1, column: 1 })?;
    match load::syntax_error(&tree) {
        Some((line, column)) => Err(ErrorSource::Format { line, column }),
        None => Ok(()),
    }
}

/// Writes generated code to a file, replacing it as a whole.
///
/// The content goes to a temporary file next to `path` first, which is then renamed to `path`.
pub fn persist(path: &Path, content: &str) -> Result<(), Error> {
    log::debug!("writing to `{}`", path.display());
    let to_err = |err| Error::new(path, ErrorSource::Write(err));

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(to_err)?;
    file.write_all(content.as_bytes()).map_err(to_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(to_err)?;
    }
    file.persist(path).map_err(|err| to_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::sample;
    use crate::ast::TypeExpr;
    use crate::synth::CallExpr;
    use crate::synth::Receiver;
    use crate::synth::Synthesizer;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn unit<'a>(methods: Vec<MethodDecl<'a>>) -> OutputUnit<'a> {
        OutputUnit {
            package: "sdl".into(),
            dir: PathBuf::from("sdl"),
            methods,
        }
    }

    #[test]
    fn methods() {
        let package = sample::package(indoc! {r#"
            package sdl

            // DestroyWindow destroys a window.
            /* It must not be used afterwards. */
            func DestroyWindow(win *Window) {}

            func GetWindowSize(win *Window, w *int32, h *int32) bool {
                return false
            }

            func GetWindowPosition(win *Window) (x, y int32, err error) {
                return 0, 0, nil
            }

            func Logf(win *Window, format string, args ...any) {}
        "#});
        let config = sample::config();
        let synthesizer = Synthesizer::new(&config.rename);
        let methods = ["DestroyWindow", "GetWindowSize", "GetWindowPosition", "Logf"]
            .iter()
            .map(|name| sample::accept(&package, sample::func(&package, name)))
            .map(|candidate| synthesizer.synthesize(candidate))
            .collect();

        let expected = indoc! {r#"
            // Code generated by "genmethods"; DO NOT EDIT.

            package sdl

            // DestroyWindow destroys a window.
            /* It must not be used afterwards. */
            func (win *Window) Destroy() {
            	DestroyWindow(win)
            }

            func (win *Window) GetSize(w *int32, h *int32) bool {
            	return GetWindowSize(win, w, h)
            }

            func (win *Window) GetWindowPosition() (x, y int32, err error) {
            	return GetWindowPosition(win)
            }

            func (win *Window) Logf(format string, args ...any) {
            	Logf(win, format, args...)
            }
        "#};
        assert_eq!(expected, render(&unit(methods)).unwrap());
    }

    #[test]
    fn composite_types_are_formatted() {
        let package = sample::package(indoc! {r#"
            package sdl

            func SetCallback(win *Window, cb func(int)bool, s struct{X int;Y int}) (  int ,error) {
                return 0, nil
            }

            func SetHook(win *Window, hook interface{Run(  ) }, opts  List[ *Option ]) {}
        "#});
        let config = sample::config();
        let synthesizer = Synthesizer::new(&config.rename);
        let methods = ["SetCallback", "SetHook"]
            .iter()
            .map(|name| sample::accept(&package, sample::func(&package, name)))
            .map(|candidate| synthesizer.synthesize(candidate))
            .collect();

        let expected = indoc! {r#"
            // Code generated by "genmethods"; DO NOT EDIT.

            package sdl

            func (win *Window) SetCallback(cb func(int) bool, s struct {
            	X int
            	Y int
            }) (int, error) {
            	return SetCallback(win, cb, s)
            }

            func (win *Window) SetHook(hook interface{ Run() }, opts List[*Option]) {
            	SetHook(win, hook, opts)
            }
        "#};
        assert_eq!(expected, render(&unit(methods)).unwrap());
    }

    #[test]
    fn header_and_package_only() {
        let actual = render(&unit(vec![])).unwrap();
        assert_eq!(
            crate::normalize_source_code(&format!("{} package sdl", HEADER)),
            crate::normalize_source_code(&actual)
        );
        assert!(actual.starts_with(&format!("{}\n\npackage sdl\n", HEADER)));
    }

    #[test]
    fn invalid_identifier() {
        let ty = TypeExpr::Name("Window".into());
        let method = MethodDecl {
            doc: vec![],
            receiver: Receiver {
                name: "win",
                ty: &ty,
            },
            name: "Get Size".into(),
            params: &[],
            results: &[],
            body: Stmt::Expr(CallExpr {
                callee: "GetWindowSize",
                args: vec!["win"],
                ellipsis: false,
            }),
        };
        let err = render(&unit(vec![method])).unwrap_err();
        assert!(matches!(err.source, ErrorSource::Render(_)));
        assert_eq!(Some("Get Size"), err.decl.as_deref());
        check_identifier("func").unwrap_err();
        check_identifier("_win2").unwrap();
    }

    #[test]
    fn invalid_syntax() {
        let ty = TypeExpr::Verbatim("[*Window".into());
        let method = MethodDecl {
            doc: vec![],
            receiver: Receiver {
                name: "win",
                ty: &ty,
            },
            name: "Destroy".into(),
            params: &[],
            results: &[],
            body: Stmt::Expr(CallExpr {
                callee: "DestroyWindow",
                args: vec!["win"],
                ellipsis: false,
            }),
        };
        let err = render(&unit(vec![method])).unwrap_err();
        assert!(matches!(err.source, ErrorSource::Format { line: 5, .. }));
    }

    #[test]
    fn persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("methods.go");
        std::fs::write(&path, "stale").unwrap();

        super::persist(&path, "package sdl\n").unwrap();
        assert_eq!("package sdl\n", std::fs::read_to_string(&path).unwrap());
        assert_eq!(1, std::fs::read_dir(dir.path()).unwrap().count());
    }

    #[test]
    fn persist_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("methods.go");
        let err = super::persist(&path, "package sdl\n").unwrap_err();
        assert!(matches!(err.source, ErrorSource::Write(_)));
        assert_eq!(path, err.file);
    }
}
