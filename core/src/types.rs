//! Static type resolution.
//!
//! Resolves type expressions to the canonical form the Go type checker prints, e.g.
//! `*github.com/jupiterrider/purego-sdl3/sdl.Window`.

use crate::ast::Field;
use crate::ast::InterfaceElem;
use crate::ast::Package;
use crate::ast::SourceFile;
use crate::ast::TypeExpr;
use itertools::Itertools;

static PREDECLARED: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex128",
    "complex64",
    "error",
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "rune",
    "string",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

impl Package {
    /// Canonical identity of a type expression appearing in `file`.
    pub fn type_of(&self, file: &SourceFile, ty: &TypeExpr) -> String {
        self.resolve(file, ty, &mut Vec::new())
    }

    /// Canonical identity of the type of a parameter, `[]T` for `...T`.
    pub fn type_of_field(&self, file: &SourceFile, field: &Field) -> String {
        let ty = self.type_of(file, &field.ty);
        if field.variadic {
            format!("[]{}", ty)
        } else {
            ty
        }
    }

    /// Finds a type alias and the file declaring it.
    fn alias(&self, name: &str) -> Option<(&SourceFile, &TypeExpr)> {
        self.files
            .iter()
            .find_map(|file| file.aliases.get(name).map(|target| (file, target)))
    }

    fn resolve(&self, file: &SourceFile, ty: &TypeExpr, aliases_seen: &mut Vec<String>) -> String {
        match ty {
            TypeExpr::Name(name) if PREDECLARED.contains(&name.as_str()) => name.clone(),
            TypeExpr::Name(name) => match self.alias(name) {
                Some((alias_file, target)) if !aliases_seen.contains(name) => {
                    aliases_seen.push(name.clone());
                    let resolved = self.resolve(alias_file, target, aliases_seen);
                    aliases_seen.pop();
                    resolved
                }
                _ => format!("{}.{}", self.import_path, name),
            },
            TypeExpr::Qualified { package, name } => match file.import(package) {
                Some(import) => format!("{}.{}", import.path, name),
                None => format!("{}.{}", package, name),
            },
            TypeExpr::Pointer(elem) => format!("*{}", self.resolve(file, elem, aliases_seen)),
            TypeExpr::Slice(elem) => format!("[]{}", self.resolve(file, elem, aliases_seen)),
            TypeExpr::Array { len, elem } => {
                format!("[{}]{}", len, self.resolve(file, elem, aliases_seen))
            }
            TypeExpr::Map { key, value } => format!(
                "map[{}]{}",
                self.resolve(file, key, aliases_seen),
                self.resolve(file, value, aliases_seen)
            ),
            TypeExpr::Chan { dir, elem } => {
                format!("{}{}", dir.keyword(), self.resolve(file, elem, aliases_seen))
            }
            TypeExpr::Func { params, results } => {
                format!("func{}", self.signature(file, params, results, aliases_seen))
            }
            TypeExpr::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|field| {
                        let ty = self.resolve(file, &field.ty, aliases_seen);
                        let mut resolved = if field.names.is_empty() {
                            ty
                        } else {
                            field.names.iter().map(|name| format!("{} {}", name, ty)).join("; ")
                        };
                        if let Some(tag) = &field.tag {
                            resolved.push(' ');
                            resolved.push_str(&quote_tag(tag));
                        }
                        resolved
                    })
                    .collect::<Vec<_>>();
                format!("struct{{{}}}", fields.join("; "))
            }
            TypeExpr::Interface(elems) => {
                let elems = elems
                    .iter()
                    .map(|elem| match elem {
                        InterfaceElem::Method {
                            name,
                            params,
                            results,
                        } => format!(
                            "{}{}",
                            name,
                            self.signature(file, params, results, aliases_seen)
                        ),
                        InterfaceElem::Type(ty) => self.resolve(file, ty, aliases_seen),
                    })
                    .collect::<Vec<_>>();
                format!("interface{{{}}}", elems.join("; "))
            }
            TypeExpr::Generic { base, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.resolve(file, arg, aliases_seen))
                    .collect::<Vec<_>>();
                format!("{}[{}]", self.resolve(file, base, aliases_seen), args.join(", "))
            }
            TypeExpr::Union(terms) => terms
                .iter()
                .map(|term| self.resolve(file, term, aliases_seen))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeExpr::Underlying(ty) => format!("~{}", self.resolve(file, ty, aliases_seen)),
            TypeExpr::Verbatim(text) => text.clone(),
        }
    }

    /// Parameters and results, one entry per name: `(a int, b int) bool`.
    fn signature(
        &self,
        file: &SourceFile,
        params: &[Field],
        results: &[Field],
        aliases_seen: &mut Vec<String>,
    ) -> String {
        let params = self.tuple(file, params, aliases_seen);
        match results {
            [] => format!("({})", params),
            [result] if result.names.is_empty() => format!(
                "({}) {}",
                params,
                self.resolve(file, &result.ty, aliases_seen)
            ),
            results => format!("({}) ({})", params, self.tuple(file, results, aliases_seen)),
        }
    }

    fn tuple(&self, file: &SourceFile, fields: &[Field], aliases_seen: &mut Vec<String>) -> String {
        let mut entries = Vec::new();
        for field in fields {
            let ty = self.resolve(file, &field.ty, aliases_seen);
            let ty = if field.variadic {
                format!("...{}", ty)
            } else {
                ty
            };
            if field.names.is_empty() {
                entries.push(ty);
            } else {
                entries.extend(field.names.iter().map(|name| format!("{} {}", name, ty)));
            }
        }
        entries.join(", ")
    }
}

/// A struct tag as a double-quoted string literal.
fn quote_tag(tag: &str) -> String {
    match tag.strip_prefix('`').and_then(|raw| raw.strip_suffix('`')) {
        Some(raw) => format!("{:?}", raw),
        None => tag.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::sample;
    use crate::ast::Package;
    use std::path::PathBuf;

    fn first_param_type(package: &Package, func: &str) -> String {
        let func = sample::func(package, func);
        package.type_of_field(&package.files[0], &func.params[0])
    }

    #[test]
    fn package_local() {
        let package = sample::package(
            r#"
            package sdl

            func DestroyWindow(win *Window) {}
            func GetRects(rects []Rect, n int) {}
            "#,
        );
        assert_eq!(
            "*github.com/jupiterrider/purego-sdl3/sdl.Window",
            first_param_type(&package, "DestroyWindow")
        );
        assert_eq!(
            "[]github.com/jupiterrider/purego-sdl3/sdl.Rect",
            first_param_type(&package, "GetRects")
        );
    }

    #[test]
    fn predeclared_and_composite() {
        let package = sample::package(
            r#"
            package sdl

            func A(n int) {}
            func B(m map[string][4]*byte) {}
            func C(c <-chan error) {}
            func D(values ...uint8) {}
            func E(f func(int) bool) {}
            "#,
        );
        assert_eq!("int", first_param_type(&package, "A"));
        assert_eq!("map[string][4]*byte", first_param_type(&package, "B"));
        assert_eq!("<-chan error", first_param_type(&package, "C"));
        assert_eq!("[]uint8", first_param_type(&package, "D"));
        assert_eq!("func(int) bool", first_param_type(&package, "E"));
    }

    #[test]
    fn func_struct_and_generic() {
        let package = sample::package(
            r#"
            package sdl

            import "unsafe"

            func A(f func(a, b int, rest ...*Window) (unsafe.Pointer, error)) {}
            func B(s struct{ X, Y int32 `json:"xy"` }) {}
            func C(l List[*Window]) {}
            func D(r interface{ Render(*Renderer) bool }) {}
            func E(w (*Window)) {}
            "#,
        );
        assert_eq!(
            "func(a int, b int, rest ...*github.com/jupiterrider/purego-sdl3/sdl.Window) (unsafe.Pointer, error)",
            first_param_type(&package, "A")
        );
        assert_eq!(
            r#"struct{X int32 "json:\"xy\""; Y int32 "json:\"xy\""}"#,
            first_param_type(&package, "B")
        );
        assert_eq!(
            "github.com/jupiterrider/purego-sdl3/sdl.List[*github.com/jupiterrider/purego-sdl3/sdl.Window]",
            first_param_type(&package, "C")
        );
        assert_eq!(
            "interface{Render(*github.com/jupiterrider/purego-sdl3/sdl.Renderer) bool}",
            first_param_type(&package, "D")
        );
        assert_eq!(
            "*github.com/jupiterrider/purego-sdl3/sdl.Window",
            first_param_type(&package, "E")
        );
    }

    #[test]
    fn qualified() {
        let package = sample::package(
            r#"
            package sdl

            import (
                "unsafe"
                img "image"
            )

            func A(p unsafe.Pointer) {}
            func B(i *img.RGBA) {}
            "#,
        );
        assert_eq!("unsafe.Pointer", first_param_type(&package, "A"));
        assert_eq!("*image.RGBA", first_param_type(&package, "B"));
    }

    #[test]
    fn aliases() {
        let package = Package::parse(
            sample::IMPORT_PATH.into(),
            PathBuf::from("sdl"),
            vec![
                (
                    PathBuf::from("sdl/a.go"),
                    "package sdl\n\nfunc Show(win WindowHandle) {}\n".to_owned(),
                ),
                (
                    PathBuf::from("sdl/b.go"),
                    "package sdl\n\ntype (\n\tWindowHandle = *Window\n\tLoop = Loop\n)\n"
                        .to_owned(),
                ),
            ],
        )
        .unwrap();
        let func = sample::func(&package, "Show");
        assert_eq!(
            "*github.com/jupiterrider/purego-sdl3/sdl.Window",
            package.type_of(&package.files[0], &func.params[0].ty)
        );
        assert_eq!(
            "github.com/jupiterrider/purego-sdl3/sdl.Loop",
            package.type_of(
                &package.files[1],
                &crate::ast::TypeExpr::Name("Loop".into())
            )
        );
    }
}
